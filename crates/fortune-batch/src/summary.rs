//! Package summary over successful types

use fortune_core::{spec_for, FortuneRecord, FortuneType};
use fortune_engine::tables::outlook;
use fortune_engine::Grade;
use serde::{Deserialize, Serialize};

/// Aggregate view of a package's successful readings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSummary {
    /// Rounded mean of `overall_luck`
    pub average_overall_luck: i32,
    /// Highest `overall_luck`; earliest in package order on ties
    pub best_type: FortuneType,
    /// Lowest `overall_luck`; earliest in package order on ties
    pub weakest_type: FortuneType,
    /// Grade of the average
    pub grade: Grade,
    /// One-line reading
    pub headline: String,
    /// Types the summary was computed from, in package order
    pub included_types: Vec<FortuneType>,
}

impl PackageSummary {
    /// Summarize successful records; `None` for an empty input
    #[must_use]
    pub fn from_records<'a>(
        records: impl IntoIterator<Item = (FortuneType, &'a FortuneRecord)>,
    ) -> Option<Self> {
        let entries: Vec<(FortuneType, i32)> = records
            .into_iter()
            .map(|(t, record)| (t, record.payload.overall_luck()))
            .collect();

        let (&(first_type, first_luck), rest) = entries.split_first()?;
        let (mut best, mut weakest) = ((first_type, first_luck), (first_type, first_luck));
        for &(t, luck) in rest {
            if luck > best.1 {
                best = (t, luck);
            }
            if luck < weakest.1 {
                weakest = (t, luck);
            }
        }

        let total: i64 = entries.iter().map(|&(_, luck)| i64::from(luck)).sum();
        let count = i64::try_from(entries.len()).unwrap_or(i64::MAX);
        let average = i32::try_from((total * 2 + count) / (count * 2)).unwrap_or(i32::MAX);
        let grade = Grade::of(average);

        let headline = format!(
            "{}의 기운이 가장 좋습니다. 평균 {}점, {}",
            spec_for(best.0).title,
            average,
            outlook(grade).first().copied().unwrap_or_default()
        );

        Some(Self {
            average_overall_luck: average,
            best_type: best.0,
            weakest_type: weakest.0,
            grade,
            headline,
            included_types: entries.into_iter().map(|(t, _)| t).collect(),
        })
    }
}
