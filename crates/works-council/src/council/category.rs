use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Election constituency an employee is seated in.
///
/// Declaration order is the listing order used when memberships of several categories are
/// returned together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElectionCategory {
    Workers,
    Clerks,
    Management,
    YoungWorkers,
}

impl ElectionCategory {
    pub const ALL: [ElectionCategory; 4] = [
        ElectionCategory::Workers,
        ElectionCategory::Clerks,
        ElectionCategory::Management,
        ElectionCategory::YoungWorkers,
    ];

    /// Canonical lowercase code used at the API boundary.
    pub fn code(self) -> &'static str {
        match self {
            ElectionCategory::Workers => "workers",
            ElectionCategory::Clerks => "clerks",
            ElectionCategory::Management => "management",
            ElectionCategory::YoungWorkers => "young_workers",
        }
    }

    /// Case-insensitive parse of a canonical code.
    pub fn parse(text: &str) -> Result<Self, CategoryError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(CategoryError::Missing);
        }

        Self::ALL
            .into_iter()
            .find(|category| category.code().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| CategoryError::Unknown(text.to_string()))
    }
}

impl fmt::Display for ElectionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ElectionCategory {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ElectionCategory {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for ElectionCategory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Raised when category text does not name one of the four constituencies.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CategoryError {
    #[error("category is required")]
    Missing,
    #[error("unknown election category '{0}'")]
    Unknown(String),
}
