//! Patient-scoped rolling history
//!
//! The engine never owns history. Callers pass it in read-only and append
//! the new day with [`History::push`] after each classification returns.
//!
//! Global invariants enforced:
//! - `categories`, `normalized_scores` and `weighted_symptom_pressures` have equal length
//! - Per-symptom level series are either empty (untracked) or match that length
//! - Scores and pressures are finite

use crate::category::Category;
use crate::engine::ClassificationResult;
use crate::error::{ClassifyError, Result};
use crate::symptoms::{Symptom, SymptomLevels};
use serde::{Deserialize, Serialize};

/// Prior daily results, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub normalized_scores: Vec<f64>,
    #[serde(default, alias = "wsSeries")]
    pub weighted_symptom_pressures: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptom_levels: Option<LevelSeries>,
}

/// Per-symptom ordinal levels, parallel to the history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelSeries {
    #[serde(default, rename = "sob", alias = "shortnessOfBreath")]
    pub shortness_of_breath: Vec<u8>,
    #[serde(default)]
    pub edema: Vec<u8>,
    #[serde(default)]
    pub fatigue: Vec<u8>,
    #[serde(default)]
    pub orthopnea: Vec<u8>,
    #[serde(default)]
    pub palpitations: Vec<u8>,
}

impl LevelSeries {
    pub fn get(&self, symptom: Symptom) -> &[u8] {
        match symptom {
            Symptom::ShortnessOfBreath => &self.shortness_of_breath,
            Symptom::Edema => &self.edema,
            Symptom::Fatigue => &self.fatigue,
            Symptom::Orthopnea => &self.orthopnea,
            Symptom::Palpitations => &self.palpitations,
        }
    }

    fn get_mut(&mut self, symptom: Symptom) -> &mut Vec<u8> {
        match symptom {
            Symptom::ShortnessOfBreath => &mut self.shortness_of_breath,
            Symptom::Edema => &mut self.edema,
            Symptom::Fatigue => &mut self.fatigue,
            Symptom::Orthopnea => &mut self.orthopnea,
            Symptom::Palpitations => &mut self.palpitations,
        }
    }

    /// Extend every series that is in step with a history of `days`
    fn push(&mut self, levels: &SymptomLevels, days: usize) {
        for symptom in Symptom::ALL {
            let series = self.get_mut(symptom);
            if series.len() == days {
                series.push(levels.get(symptom));
            }
        }
    }
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON history; `null` means empty
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        if value.is_null() {
            return Ok(History::new());
        }
        if !value.is_object() {
            return Err(ClassifyError::NotAnObject { what: "history" });
        }
        let history: History = serde_json::from_value(value.clone())?;
        history.validate()?;
        Ok(history)
    }

    /// Number of recorded days
    pub fn len(&self) -> usize {
        self.normalized_scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check structural invariants
    pub fn validate(&self) -> Result<()> {
        let categories = self.categories.len();
        let scores = self.normalized_scores.len();
        let pressures = self.weighted_symptom_pressures.len();
        if categories != scores || scores != pressures {
            return Err(ClassifyError::HistoryLengthMismatch {
                categories,
                scores,
                pressures,
            });
        }

        for (series, values) in [
            ("normalizedScores", &self.normalized_scores),
            ("weightedSymptomPressures", &self.weighted_symptom_pressures),
        ] {
            if let Some(index) = values.iter().position(|v| !v.is_finite()) {
                return Err(ClassifyError::NonFiniteHistoryValue { series, index });
            }
        }

        if let Some(levels) = &self.symptom_levels {
            for symptom in Symptom::ALL {
                let found = levels.get(symptom).len();
                if found != 0 && found != scores {
                    return Err(ClassifyError::HistorySymptomLengthMismatch {
                        symptom: symptom.as_str(),
                        expected: scores,
                        found,
                    });
                }
            }
        }

        Ok(())
    }

    /// Append one classified day
    ///
    /// Level series are started on an empty history and extended while in
    /// step; a history that began without them stays without them.
    pub fn push(&mut self, result: &ClassificationResult) {
        let days = self.len();
        if days == 0 && self.symptom_levels.is_none() {
            self.symptom_levels = Some(LevelSeries::default());
        }
        if let Some(levels) = self.symptom_levels.as_mut() {
            levels.push(&result.levels, days);
        }
        self.categories.push(result.category);
        self.normalized_scores.push(result.normalized_score);
        self.weighted_symptom_pressures
            .push(result.weighted_symptom_pressure);
    }

    /// Recorded levels of one symptom, if tracked
    pub fn levels_of(&self, symptom: Symptom) -> Option<&[u8]> {
        self.symptom_levels
            .as_ref()
            .map(|l| l.get(symptom))
            .filter(|series| !series.is_empty())
    }
}
