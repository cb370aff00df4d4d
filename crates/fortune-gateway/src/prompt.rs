//! Prompt rendering
//!
//! Fills the fortune type's template from request attributes and appends a
//! response schema derived from the catalog.

use crate::provider::Prompt;
use fortune_core::{spec_for, Attributes, FieldKind, FortuneRequest};
use std::fmt::Write as _;

/// Default system instructions
pub const DEFAULT_SYSTEM: &str = "당신은 한국 전통 역학과 현대 심리학에 밝은 운세 전문가입니다. \
                                  따뜻하고 구체적인 문장으로 답하세요.";

/// Placeholder text for attributes the user did not provide
pub const UNKNOWN_VALUE: &str = "미상";

/// Builds provider prompts
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system: String,
}

impl PromptBuilder {
    /// Create builder with default system instructions
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            system: DEFAULT_SYSTEM.to_string(),
        }
    }

    /// With system instructions
    #[inline]
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    /// Render a prompt for `request` at `attempt`
    #[must_use]
    pub fn build(&self, request: &FortuneRequest, attempt: u32) -> Prompt {
        let spec = spec_for(request.fortune_type);
        let attributes = request.attributes.with_derived(request.date);
        let mut user = render(spec.prompt_template, request, &attributes);
        if attempt > 0 {
            let _ = write!(
                user,
                "\n이전 결과와 다른 관점으로 새롭게 풀이해주세요. (재생성 {attempt}회차)"
            );
        }

        let mut system = self.system.clone();
        system.push_str("\n\n다음 필드를 모두 포함한 JSON 객체 하나만 출력하세요:\n");
        for field in spec.fields {
            let shape = match field.kind {
                FieldKind::Score(bound) => format!("정수 ({}~{})", bound.min, bound.max),
                FieldKind::Insight | FieldKind::LuckyItem => "문자열".to_string(),
                FieldKind::LuckyList => "문자열 배열".to_string(),
            };
            let _ = writeln!(system, "- {}: {shape}", field.name);
        }

        Prompt {
            fortune_type: request.fortune_type,
            attempt,
            system,
            user,
        }
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn placeholder(name: &str, request: &FortuneRequest, attributes: &Attributes) -> String {
    if name == "date" {
        return request.date.format("%Y-%m-%d").to_string();
    }
    attributes
        .get_str(name)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_VALUE.to_string())
}

fn render(template: &str, request: &FortuneRequest, attributes: &Attributes) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            // Unterminated placeholder is kept verbatim.
            out.push_str(&rest[start..]);
            return out;
        };
        out.push_str(&placeholder(after[..end].trim(), request, attributes));
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fortune_core::FortuneType;

    fn request() -> FortuneRequest {
        FortuneRequest::new(
            "u1",
            FortuneType::BloodType,
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        )
        .with_attributes(Attributes::new().with("blood_type", "a"))
    }

    #[test]
    fn template_is_filled() {
        let prompt = PromptBuilder::new().build(&request(), 0);
        assert!(prompt.user.contains("혈액형 A형"));
        assert!(prompt.user.contains("2024-01-10"));
        assert!(prompt.user.contains(UNKNOWN_VALUE));
        assert!(!prompt.user.contains("{{"));
    }

    #[test]
    fn schema_lists_every_field() {
        let prompt = PromptBuilder::new().build(&request(), 0);
        for field in spec_for(FortuneType::BloodType).fields {
            assert!(prompt.system.contains(field.name), "missing {}", field.name);
        }
        assert!(prompt.system.contains("personality_match: 정수 (45~100)"));
    }

    #[test]
    fn regeneration_asks_for_a_new_angle() {
        let first = PromptBuilder::new().build(&request(), 0);
        let again = PromptBuilder::new().build(&request(), 2);
        assert_ne!(first.user, again.user);
        assert!(again.user.contains("2회차"));
        assert_eq!(again.attempt, 2);
    }

    #[test]
    fn unterminated_placeholder_is_kept() {
        let out = render("a {{b", &request(), &Attributes::new());
        assert_eq!(out, "a {{b");
    }
}
