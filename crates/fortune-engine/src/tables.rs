//! Static content tables for fallback composition
//!
//! Fixed trait tables (blood type compatibility, sal remedies, dream symbols)
//! are looked up directly; pools are sampled with a seeded stream.

use crate::score::Grade;

/// Lucky colors
pub const COLORS: &[&str] = &[
    "빨간색", "주황색", "노란색", "초록색", "파란색", "남색", "보라색", "흰색", "검은색", "금색",
];

/// Compass directions
pub const DIRECTIONS: &[&str] = &[
    "동쪽", "서쪽", "남쪽", "북쪽", "동남쪽", "동북쪽", "서남쪽", "서북쪽",
];

/// Five elements
pub const ELEMENTS: &[&str] = &["목(木)", "화(火)", "토(土)", "금(金)", "수(水)"];

/// Ten heavenly stems as day masters
pub const DAY_MASTERS: &[&str] = &[
    "갑목(甲木)", "을목(乙木)", "병화(丙火)", "정화(丁火)", "무토(戊土)",
    "기토(己土)", "경금(庚金)", "신금(辛金)", "임수(壬水)", "계수(癸水)",
];

/// Everyday lucky items
pub const LUCKY_ITEMS: &[&str] = &[
    "손수건", "만년필", "은반지", "작은 화분", "향초", "열쇠고리", "머그컵", "수첩",
];

/// Talisman colors
pub const TALISMAN_COLORS: &[&str] = &["붉은색", "황색", "흰색", "검은색"];

/// Ritual items for warding off sal
pub const RITUAL_ITEMS: &[&str] = &[
    "팥", "굵은 소금", "향", "붉은 실", "복숭아 나뭇가지", "쑥", "부적", "맑은 물",
];

/// Past-life identities
pub const PAST_IDENTITIES: &[&str] = &[
    "궁중 악사", "떠돌이 상인", "서원의 선비", "산사의 승려", "도공", "의원", "무관", "약초꾼",
];

/// Past-life eras
pub const ERAS: &[&str] = &[
    "신라 시대", "백제 시대", "고구려 시대", "고려 시대", "조선 초기", "조선 후기",
];

/// Lessons carried from a past life
pub const LESSONS: &[&str] = &[
    "베풀었던 마음이 지금의 인연으로 돌아옵니다.",
    "끝맺지 못한 약속을 이번 생에 지키게 됩니다.",
    "혼자 감당하던 짐을 나누는 법을 배우는 생입니다.",
    "지나친 욕심을 내려놓을 때 길이 열립니다.",
];

/// Guardian symbols
pub const GUARDIAN_SYMBOLS: &[&str] = &[
    "백호", "청룡", "주작", "현무", "봉황", "학", "거북", "소나무",
];

/// Skills recommended for career growth
pub const SKILLS: &[&str] = &[
    "데이터 분석", "협상", "글쓰기", "발표", "프로젝트 관리", "외국어", "코칭", "재무 이해",
];

/// Career openings
pub const OPPORTUNITIES: &[&str] = &[
    "새로운 프로젝트 제안이 들어올 수 있습니다.",
    "윗사람의 추천으로 기회가 생깁니다.",
    "오래 준비한 일이 평가받는 시기입니다.",
    "다른 부서와의 협업에서 길이 열립니다.",
];

/// Tojeong monthly highlights
pub const MONTHLY_NOTES: &[&str] = &[
    "귀인이 나타나 도움을 줍니다",
    "재물이 조금씩 쌓입니다",
    "이동이나 변화가 생깁니다",
    "건강 관리에 신경 쓰면 좋습니다",
];

/// A sal (misfortune) with its remedy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sal {
    /// Name
    pub name: &'static str,
    /// Remedy advice
    pub remedy: &'static str,
}

/// Known sal
pub const SALS: &[Sal] = &[
    Sal {
        name: "역마살",
        remedy: "먼 길을 나서기 전 현관에 굵은 소금을 놓아두세요.",
    },
    Sal {
        name: "도화살",
        remedy: "붉은 실을 손목에 감아 인연을 가려 받으세요.",
    },
    Sal {
        name: "백호살",
        remedy: "날카로운 물건을 멀리하고 쑥을 태워 기운을 맑게 하세요.",
    },
    Sal {
        name: "원진살",
        remedy: "다툼이 있던 사람에게 먼저 안부를 전하세요.",
    },
    Sal {
        name: "상문살",
        remedy: "문상 후에는 팥을 뿌려 기운을 털어내세요.",
    },
    Sal {
        name: "화개살",
        remedy: "조용한 곳에서 향을 피우고 마음을 정리하세요.",
    },
];

/// Dream symbol meanings, matched against the dream description
pub const DREAM_SYMBOLS: &[(&str, &str)] = &[
    ("돼지", "재물이 들어올 징조입니다."),
    ("용", "큰 성공과 승진을 암시합니다."),
    ("뱀", "지혜와 재물운이 함께 옵니다."),
    ("물", "감정이 정화되고 막힌 일이 풀립니다."),
    ("불", "열정이 커지고 일이 번창합니다."),
    ("이빨", "가까운 사람의 변화에 마음을 쓰게 됩니다."),
    ("하늘", "목표가 높아지고 시야가 넓어집니다."),
    ("돈", "뜻밖의 지출과 수입이 교차합니다."),
];

/// Meaning used when no symbol matches
pub const GENERIC_DREAM_MEANINGS: &[&str] = &[
    "마음속 바람이 꿈으로 드러났습니다.",
    "잠재된 불안이 정리되는 과정입니다.",
    "새로운 시작을 준비하라는 신호입니다.",
];

/// Fixed blood type traits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BloodTypeTraits {
    /// Canonical blood type
    pub blood_type: &'static str,
    /// Personality description
    pub personality: &'static str,
    /// Most compatible blood types
    pub compatible: [&'static str; 2],
}

const BLOOD_TYPE_TRAITS: [BloodTypeTraits; 4] = [
    BloodTypeTraits {
        blood_type: "A형",
        personality: "꼼꼼하고 신중하며 책임감이 강합니다.",
        compatible: ["O형", "AB형"],
    },
    BloodTypeTraits {
        blood_type: "B형",
        personality: "자유롭고 호기심이 많으며 솔직합니다.",
        compatible: ["O형", "AB형"],
    },
    BloodTypeTraits {
        blood_type: "O형",
        personality: "사교적이고 추진력이 있으며 너그럽습니다.",
        compatible: ["A형", "B형"],
    },
    BloodTypeTraits {
        blood_type: "AB형",
        personality: "합리적이고 독창적이며 균형 감각이 뛰어납니다.",
        compatible: ["A형", "B형"],
    },
];

/// Traits for a canonical blood type
#[must_use]
pub fn blood_type_traits(canonical: &str) -> Option<&'static BloodTypeTraits> {
    BLOOD_TYPE_TRAITS.iter().find(|t| t.blood_type == canonical)
}

/// Outlook sentences by grade
#[must_use]
pub fn outlook(grade: Grade) -> &'static [&'static str] {
    match grade {
        Grade::Excellent => &[
            "막힘없이 일이 풀리는 하루입니다.",
            "원하던 일이 뜻대로 이루어집니다.",
            "주변의 도움까지 더해지는 좋은 흐름입니다.",
        ],
        Grade::Good => &[
            "차근차근 나아가면 좋은 결과가 있습니다.",
            "작은 기쁨이 이어지는 흐름입니다.",
            "노력한 만큼 보답받는 시기입니다.",
        ],
        Grade::Fair => &[
            "무난하지만 방심은 금물입니다.",
            "큰 변화 없이 평온한 흐름입니다.",
            "조급함을 내려놓으면 길이 보입니다.",
        ],
        Grade::Caution => &[
            "한 걸음 물러서서 상황을 살피세요.",
            "예상치 못한 변수에 대비가 필요합니다.",
            "무리한 결정은 미루는 것이 좋습니다.",
        ],
    }
}

/// Advice sentences by grade
#[must_use]
pub fn advice(grade: Grade) -> &'static [&'static str] {
    match grade {
        Grade::Excellent | Grade::Good => &[
            "자신감을 갖고 먼저 제안해 보세요.",
            "고마운 사람에게 마음을 표현하세요.",
            "새로운 일에 도전하기 좋은 때입니다.",
        ],
        Grade::Fair => &[
            "계획을 다시 점검해 보세요.",
            "가까운 사람의 조언에 귀 기울이세요.",
            "충분히 쉬며 컨디션을 관리하세요.",
        ],
        Grade::Caution => &[
            "말을 아끼고 행동을 신중히 하세요.",
            "지출을 줄이고 기본에 충실하세요.",
            "건강 검진이나 휴식을 우선하세요.",
        ],
    }
}

/// Caution sentences
pub const CAUTIONS: &[&str] = &[
    "오후에는 서두르다 실수할 수 있으니 주의하세요.",
    "충동적인 소비를 조심하세요.",
    "감정적인 대화는 피하는 것이 좋습니다.",
    "약속 시간을 다시 확인하세요.",
];

#[cfg(test)]
mod tests {
    use super::*;
    use fortune_core::attributes::BLOOD_TYPES;

    #[test]
    fn every_blood_type_has_traits() {
        for bt in BLOOD_TYPES {
            let traits = blood_type_traits(bt).unwrap();
            assert!(traits.compatible.iter().all(|c| BLOOD_TYPES.contains(c)));
        }
        assert!(blood_type_traits("Z형").is_none());
    }

    #[test]
    fn compatibility_table_is_fixed() {
        assert_eq!(blood_type_traits("A형").unwrap().compatible, ["O형", "AB형"]);
        assert_eq!(blood_type_traits("B형").unwrap().compatible, ["O형", "AB형"]);
        assert_eq!(blood_type_traits("O형").unwrap().compatible, ["A형", "B형"]);
        assert_eq!(blood_type_traits("AB형").unwrap().compatible, ["A형", "B형"]);
    }

    #[test]
    fn every_grade_has_text() {
        for g in [Grade::Caution, Grade::Fair, Grade::Good, Grade::Excellent] {
            assert!(!outlook(g).is_empty());
            assert!(!advice(g).is_empty());
        }
    }
}
