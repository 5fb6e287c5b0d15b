//! Symptom inputs and the level normalizer
//!
//! Check-in records arrive with whatever field names and value shapes the
//! capturing screen used. This module is the single adapter between those
//! records and the ordinal 0..=3 levels the rest of the pipeline works on.
//!
//! Accepted keys per symptom, in precedence order (first present, non-null
//! key wins). Baselines rank the `baseline*` alias ahead of the check-in
//! `*Level` alias:
//!
//! | symptom | check-in keys | baseline keys |
//! |---|---|---|
//! | shortness of breath | `sob`, `sobLevel`, `SOB`, `shortnessOfBreath`, `baselineSob` | `sob`, `baselineSob`, `sobLevel`, `SOB`, `shortnessOfBreath` |
//! | edema | `edema`, `edemaLevel`, `baselineEdema` | `edema`, `baselineEdema`, `edemaLevel` |
//! | fatigue | `fatigue`, `fatigueLevel`, `baselineFatigue` | `fatigue`, `baselineFatigue`, `fatigueLevel` |
//! | orthopnea | `orthopnea`, `orthopneaFlag`, `baselineOrthopnea` | `orthopnea`, `baselineOrthopnea`, `orthopneaFlag` |
//! | palpitations | `palpitations`, `palpitationsLevel`, `baselinePalpitations` | `palpitations`, `baselinePalpitations`, `palpitationsLevel` |
//!
//! Orthopnea is the one exception to first-wins: an unreadable orthopnea
//! value gives way to a readable one under a later key.
//!
//! A serialized set uses the first key of each row, so it reads back
//! unchanged through either adapter.
//!
//! Normalization never fails: anything unreadable becomes level 0.

use crate::error::{ClassifyError, Result};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Highest ordinal symptom level (severe)
pub const MAX_LEVEL: u8 = 3;

/// Level assigned to a `true` boolean symptom
const FLAG_LEVEL: u8 = 2;

/// Monitored symptoms
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symptom {
    ShortnessOfBreath,
    Edema,
    Fatigue,
    Orthopnea,
    Palpitations,
}

impl Symptom {
    pub const ALL: [Symptom; 5] = [
        Symptom::ShortnessOfBreath,
        Symptom::Edema,
        Symptom::Fatigue,
        Symptom::Orthopnea,
        Symptom::Palpitations,
    ];

    /// Symptoms that contribute to weighted symptom pressure
    pub const SCORED: [Symptom; 3] = [
        Symptom::ShortnessOfBreath,
        Symptom::Edema,
        Symptom::Fatigue,
    ];

    /// Symptoms counted by the acute escalation detector
    pub const CORE: [Symptom; 2] = [Symptom::ShortnessOfBreath, Symptom::Edema];

    /// Symptoms compared against the patient's recent average
    pub const CONTEXTUAL: [Symptom; 4] = [
        Symptom::ShortnessOfBreath,
        Symptom::Edema,
        Symptom::Fatigue,
        Symptom::Orthopnea,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Symptom::ShortnessOfBreath => "shortness_of_breath",
            Symptom::Edema => "edema",
            Symptom::Fatigue => "fatigue",
            Symptom::Orthopnea => "orthopnea",
            Symptom::Palpitations => "palpitations",
        }
    }

    /// Patient-facing name
    pub fn label(&self) -> &'static str {
        match self {
            Symptom::ShortnessOfBreath => "shortness of breath",
            Symptom::Edema => "swelling",
            Symptom::Fatigue => "fatigue",
            Symptom::Orthopnea => "shortness of breath when lying flat",
            Symptom::Palpitations => "palpitations",
        }
    }

    /// Record key written when a set is serialized
    pub fn key(&self) -> &'static str {
        self.keys(RecordKind::Checkin)[0]
    }

    fn keys(&self, kind: RecordKind) -> &'static [&'static str] {
        match (kind, self) {
            (RecordKind::Checkin, Symptom::ShortnessOfBreath) => &[
                "sob",
                "sobLevel",
                "SOB",
                "shortnessOfBreath",
                "baselineSob",
            ],
            (RecordKind::Baseline, Symptom::ShortnessOfBreath) => &[
                "sob",
                "baselineSob",
                "sobLevel",
                "SOB",
                "shortnessOfBreath",
            ],
            (RecordKind::Checkin, Symptom::Edema) => &["edema", "edemaLevel", "baselineEdema"],
            (RecordKind::Baseline, Symptom::Edema) => &["edema", "baselineEdema", "edemaLevel"],
            (RecordKind::Checkin, Symptom::Fatigue) => {
                &["fatigue", "fatigueLevel", "baselineFatigue"]
            }
            (RecordKind::Baseline, Symptom::Fatigue) => {
                &["fatigue", "baselineFatigue", "fatigueLevel"]
            }
            (RecordKind::Checkin, Symptom::Orthopnea) => {
                &["orthopnea", "orthopneaFlag", "baselineOrthopnea"]
            }
            (RecordKind::Baseline, Symptom::Orthopnea) => {
                &["orthopnea", "baselineOrthopnea", "orthopneaFlag"]
            }
            (RecordKind::Checkin, Symptom::Palpitations) => &[
                "palpitations",
                "palpitationsLevel",
                "baselinePalpitations",
            ],
            (RecordKind::Baseline, Symptom::Palpitations) => &[
                "palpitations",
                "baselinePalpitations",
                "palpitationsLevel",
            ],
        }
    }

    fn index(&self) -> usize {
        match self {
            Symptom::ShortnessOfBreath => 0,
            Symptom::Edema => 1,
            Symptom::Fatigue => 2,
            Symptom::Orthopnea => 3,
            Symptom::Palpitations => 4,
        }
    }
}

/// Which kind of record a symptom set is adapted from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordKind {
    Checkin,
    Baseline,
}

/// A raw symptom value as captured
#[derive(Debug, Clone, PartialEq)]
pub enum RawLevel {
    Flag(bool),
    Number(f64),
    Label(String),
    /// A JSON array or object where a scalar was expected
    Unsupported(String),
}

impl RawLevel {
    fn from_json(symptom: Symptom, value: &Value) -> Option<RawLevel> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(RawLevel::Flag(*b)),
            Value::Number(n) => Some(RawLevel::Number(n.as_f64().unwrap_or(f64::NAN))),
            Value::String(s) => {
                if symptom == Symptom::Orthopnea {
                    match s.trim().to_ascii_lowercase().as_str() {
                        "yes" => return Some(RawLevel::Flag(true)),
                        "no" => return Some(RawLevel::Flag(false)),
                        _ => {}
                    }
                }
                Some(RawLevel::Label(s.clone()))
            }
            Value::Array(_) => Some(RawLevel::Unsupported("array".to_string())),
            Value::Object(_) => Some(RawLevel::Unsupported("object".to_string())),
        }
    }
}

/// Written in the shape the adapter reads back; an unsupported value keeps
/// its JSON kind as an empty array or object.
impl Serialize for RawLevel {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            RawLevel::Flag(b) => serializer.serialize_bool(*b),
            RawLevel::Number(n) => serializer.serialize_f64(*n),
            RawLevel::Label(text) => serializer.serialize_str(text),
            RawLevel::Unsupported(kind) if kind == "object" => {
                serializer.serialize_map(Some(0))?.end()
            }
            RawLevel::Unsupported(_) => serializer.serialize_seq(Some(0))?.end(),
        }
    }
}

impl From<&str> for RawLevel {
    fn from(value: &str) -> Self {
        RawLevel::Label(value.to_string())
    }
}

/// Why a raw value could not be read as-is
#[derive(Debug, Clone, PartialEq)]
pub enum LevelIssue {
    NonFinite,
    UnrecognizedLabel(String),
    Unsupported(String),
}

/// Normalize one raw value to an ordinal level in 0..=3
///
/// - missing → 0
/// - boolean → 0 or 2
/// - finite number → rounded, clamped to 0..=3
/// - label → none/mild/moderate/severe (case-insensitive)
/// - anything else, numeric text included → 0
pub fn normalize_level(raw: Option<&RawLevel>) -> u8 {
    read_level(raw).0
}

/// Normalize a raw value and report any data-quality issue
pub fn read_level(raw: Option<&RawLevel>) -> (u8, Option<LevelIssue>) {
    match raw {
        None => (0, None),
        Some(RawLevel::Flag(true)) => (FLAG_LEVEL, None),
        Some(RawLevel::Flag(false)) => (0, None),
        Some(RawLevel::Number(n)) => level_from_number(*n),
        Some(RawLevel::Label(text)) => {
            let t = text.trim().to_ascii_lowercase();
            match t.as_str() {
                "none" | "" => (0, None),
                "mild" => (1, None),
                "moderate" => (2, None),
                "severe" => (3, None),
                _ => (0, Some(LevelIssue::UnrecognizedLabel(text.clone()))),
            }
        }
        Some(RawLevel::Unsupported(kind)) => (0, Some(LevelIssue::Unsupported(kind.clone()))),
    }
}

fn level_from_number(n: f64) -> (u8, Option<LevelIssue>) {
    if !n.is_finite() {
        return (0, Some(LevelIssue::NonFinite));
    }
    (n.round().clamp(0.0, f64::from(MAX_LEVEL)) as u8, None)
}

/// Raw symptom values for one check-in or baseline
///
/// Immutable once built; absent symptoms are simply not present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymptomSet {
    values: BTreeMap<Symptom, RawLevel>,
}

/// A patient's reference symptom set
pub type Baseline = SymptomSet;

impl SymptomSet {
    pub fn get(&self, symptom: Symptom) -> Option<&RawLevel> {
        self.values.get(&symptom)
    }

    pub fn is_present(&self, symptom: Symptom) -> bool {
        self.values.contains_key(&symptom)
    }

    /// Adapt a JSON check-in record
    pub fn from_value(value: &Value) -> Result<Self> {
        Self::adapt(value, RecordKind::Checkin)
    }

    /// Adapt a JSON baseline record
    pub fn baseline_from_value(value: &Value) -> Result<Baseline> {
        Self::adapt(value, RecordKind::Baseline)
    }

    fn adapt(value: &Value, kind: RecordKind) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or(ClassifyError::NotAnObject { what: "symptom record" })?;

        let mut values = BTreeMap::new();
        for symptom in Symptom::ALL {
            let mut candidates = symptom
                .keys(kind)
                .iter()
                .filter_map(|key| obj.get(*key))
                .filter_map(|v| RawLevel::from_json(symptom, v));
            let found = if symptom == Symptom::Orthopnea {
                let all: Vec<RawLevel> = candidates.collect();
                all.iter()
                    .find(|raw| read_level(Some(*raw)).1.is_none())
                    .or_else(|| all.first())
                    .cloned()
            } else {
                candidates.next()
            };
            if let Some(raw) = found {
                values.insert(symptom, raw);
            }
        }
        Ok(SymptomSet { values })
    }

    /// Normalized levels for every symptom (absent → 0)
    pub fn levels(&self) -> SymptomLevels {
        let mut levels = SymptomLevels::default();
        for symptom in Symptom::ALL {
            levels.set(symptom, normalize_level(self.get(symptom)));
        }
        levels
    }

    /// Data-quality issues found while normalizing, in symptom order
    pub fn issues(&self) -> Vec<(Symptom, LevelIssue)> {
        Symptom::ALL
            .iter()
            .filter_map(|s| read_level(self.get(*s)).1.map(|issue| (*s, issue)))
            .collect()
    }
}

impl Serialize for SymptomSet {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (symptom, raw) in &self.values {
            map.serialize_entry(symptom.key(), raw)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SymptomSet {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        SymptomSet::from_value(&value).map_err(serde::de::Error::custom)
    }
}

/// Ordinal levels for all monitored symptoms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomLevels {
    #[serde(rename = "sob")]
    pub shortness_of_breath: u8,
    pub edema: u8,
    pub fatigue: u8,
    pub orthopnea: u8,
    pub palpitations: u8,
}

impl SymptomLevels {
    pub fn get(&self, symptom: Symptom) -> u8 {
        self.as_array()[symptom.index()]
    }

    pub fn set(&mut self, symptom: Symptom, level: u8) {
        let level = level.min(MAX_LEVEL);
        match symptom {
            Symptom::ShortnessOfBreath => self.shortness_of_breath = level,
            Symptom::Edema => self.edema = level,
            Symptom::Fatigue => self.fatigue = level,
            Symptom::Orthopnea => self.orthopnea = level,
            Symptom::Palpitations => self.palpitations = level,
        }
    }

    fn as_array(&self) -> [u8; 5] {
        [
            self.shortness_of_breath,
            self.edema,
            self.fatigue,
            self.orthopnea,
            self.palpitations,
        ]
    }
}
