//! Severity categories and score-to-category mapping
//!
//! Global invariants enforced:
//! - Mapping is a total, monotone function of the score
//! - Cut points are half-open: a score equal to a cut point maps upward

use serde::{Deserialize, Serialize};

/// Severity category of one day
///
/// `Neutral` is reserved for incomplete check-ins and has no rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(alias = "green")]
    Green,
    #[serde(alias = "yellow")]
    Yellow,
    #[serde(alias = "orange")]
    Orange,
    #[serde(alias = "red")]
    Red,
    #[serde(alias = "neutral")]
    Neutral,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Green => "Green",
            Category::Yellow => "Yellow",
            Category::Orange => "Orange",
            Category::Red => "Red",
            Category::Neutral => "Neutral",
        }
    }

    /// Ordinal rank (Green 0 .. Red 3); `None` for Neutral
    pub fn rank(&self) -> Option<u8> {
        match self {
            Category::Green => Some(0),
            Category::Yellow => Some(1),
            Category::Orange => Some(2),
            Category::Red => Some(3),
            Category::Neutral => None,
        }
    }

    /// Category for a rank, saturating at Red
    pub fn from_rank(rank: u8) -> Category {
        match rank {
            0 => Category::Green,
            1 => Category::Yellow,
            2 => Category::Orange,
            _ => Category::Red,
        }
    }

    /// Raise to at least `rank`, never lowering
    pub fn at_least(self, rank: u8) -> Category {
        match self.rank() {
            Some(current) => Category::from_rank(current.max(rank)),
            None => self,
        }
    }

    /// Orange or Red
    pub fn is_elevated(&self) -> bool {
        matches!(self, Category::Orange | Category::Red)
    }

    /// Anything that should trigger clinical review
    pub fn is_alert(&self) -> bool {
        matches!(self, Category::Yellow | Category::Orange | Category::Red)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper bounds (exclusive) of the Green, Yellow and Orange bands
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryThresholds {
    pub green_max: f64,
    pub yellow_max: f64,
    pub orange_max: f64,
}

impl Default for CategoryThresholds {
    fn default() -> Self {
        CategoryThresholds {
            green_max: 2.0,
            yellow_max: 4.5,
            orange_max: 7.5,
        }
    }
}

impl CategoryThresholds {
    /// Cut points are positive and strictly increasing
    pub fn is_ordered(&self) -> bool {
        self.green_max > 0.0 && self.green_max < self.yellow_max && self.yellow_max < self.orange_max
    }
}

/// Map a normalized score with default cut points
pub fn map_category(score: f64) -> Category {
    map_category_with_thresholds(score, &CategoryThresholds::default())
}

/// Map a normalized score with custom cut points
pub fn map_category_with_thresholds(score: f64, thresholds: &CategoryThresholds) -> Category {
    if score < thresholds.green_max {
        Category::Green
    } else if score < thresholds.yellow_max {
        Category::Yellow
    } else if score < thresholds.orange_max {
        Category::Orange
    } else {
        Category::Red
    }
}
