//! Patient-facing summary paragraph
//!
//! High-alert days (Orange, Red) list worsening findings only; other days
//! list both directions.

use crate::category::Category;
use crate::symptoms::{Symptom, SymptomLevels};

const SIMILAR: &str = "Your reported symptoms were similar to your usual pattern.";
const OTHERS_SIMILAR: &str = "All other findings were similar to your baseline.";

/// Findings that moved against the baseline, in display order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Findings {
    pub worsening: Vec<&'static str>,
    pub improving: Vec<&'static str>,
}

/// Compare today's levels with the baseline
///
/// Orthopnea is folded into shortness of breath: it is only listed on its
/// own when shortness of breath did not already move the same way.
pub fn findings(levels: &SymptomLevels, baseline: &SymptomLevels) -> Findings {
    let mut out = Findings::default();
    for symptom in [
        Symptom::ShortnessOfBreath,
        Symptom::Orthopnea,
        Symptom::Edema,
        Symptom::Fatigue,
    ] {
        let now = levels.get(symptom);
        let base = baseline.get(symptom);
        let sob_listed = |list: &Vec<&'static str>| list.contains(&Symptom::ShortnessOfBreath.label());
        if now > base {
            if symptom == Symptom::Orthopnea && sob_listed(&out.worsening) {
                continue;
            }
            out.worsening.push(symptom.label());
        } else if now < base {
            if symptom == Symptom::Orthopnea && sob_listed(&out.improving) {
                continue;
            }
            out.improving.push(symptom.label());
        }
    }
    out
}

/// Join as "a", "a and b", "a, b, and c"
pub fn join_list(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => (*only).to_string(),
        [first, second] => format!("{} and {}", first, second),
        [init @ .., last] => format!("{}, and {}", init.join(", "), last),
    }
}

/// Upper-case the first character
pub fn sentence_case(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Build the summary paragraph for one day
pub fn summarize(levels: &SymptomLevels, baseline: &SymptomLevels, category: Category) -> String {
    let Findings {
        worsening,
        improving,
    } = findings(levels, baseline);

    let worse = || {
        format!(
            "You reported worsening {} compared with your usual pattern.",
            join_list(&worsening)
        )
    };
    let better = || {
        format!(
            "You reported improvement in {} compared with your baseline.",
            join_list(&improving)
        )
    };

    if category.is_elevated() {
        return if worsening.is_empty() {
            SIMILAR.to_string()
        } else {
            worse()
        };
    }

    match (worsening.is_empty(), improving.is_empty()) {
        (true, true) => SIMILAR.to_string(),
        (false, true) => format!("{} {}", worse(), OTHERS_SIMILAR),
        (true, false) => format!("{} {}", better(), OTHERS_SIMILAR),
        (false, false) => format!(
            "{} You also reported improvement in {} compared with your baseline. {}",
            worse(),
            join_list(&improving),
            OTHERS_SIMILAR
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(sob: u8, edema: u8, fatigue: u8, orthopnea: u8) -> SymptomLevels {
        SymptomLevels {
            shortness_of_breath: sob,
            edema,
            fatigue,
            orthopnea,
            palpitations: 0,
        }
    }

    #[test]
    fn test_join_list() {
        assert_eq!(join_list(&[]), "");
        assert_eq!(join_list(&["a"]), "a");
        assert_eq!(join_list(&["a", "b"]), "a and b");
        assert_eq!(join_list(&["a", "b", "c"]), "a, b, and c");
    }

    #[test]
    fn test_sentence_case() {
        assert_eq!(sentence_case("swelling"), "Swelling");
        assert_eq!(sentence_case("shortness of breath"), "Shortness of breath");
        assert_eq!(sentence_case(""), "");
    }

    #[test]
    fn test_no_change() {
        let s = summarize(&levels(1, 1, 1, 0), &levels(1, 1, 1, 0), Category::Green);
        assert_eq!(s, SIMILAR);
    }

    #[test]
    fn test_high_alert_lists_only_worsening() {
        let s = summarize(&levels(3, 0, 2, 0), &levels(1, 1, 1, 0), Category::Red);
        assert_eq!(
            s,
            "You reported worsening shortness of breath and fatigue compared with your usual pattern."
        );
    }

    #[test]
    fn test_mixed_findings() {
        let s = summarize(&levels(2, 0, 1, 0), &levels(1, 1, 1, 0), Category::Yellow);
        assert_eq!(
            s,
            "You reported worsening shortness of breath compared with your usual pattern. \
             You also reported improvement in swelling compared with your baseline. \
             All other findings were similar to your baseline."
        );
    }

    #[test]
    fn test_improvement_only() {
        let s = summarize(&levels(0, 0, 0, 0), &levels(0, 2, 1, 0), Category::Green);
        assert_eq!(
            s,
            "You reported improvement in swelling and fatigue compared with your baseline. \
             All other findings were similar to your baseline."
        );
    }

    #[test]
    fn test_orthopnea_folded_into_sob() {
        let f = findings(&levels(2, 0, 0, 2), &levels(0, 0, 0, 0));
        assert_eq!(f.worsening, vec!["shortness of breath"]);
        let f = findings(&levels(0, 0, 0, 2), &levels(0, 0, 0, 0));
        assert_eq!(f.worsening, vec!["shortness of breath when lying flat"]);
    }
}
