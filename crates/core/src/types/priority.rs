//! Waitlist priority levels.

use serde::{Deserialize, Serialize};

use super::role::ParseEnumError;

/// Priority badge attached to a waitlist entry.
///
/// Priority is informational for operators; ordering within the waitlist is
/// governed by position alone.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    Low,
    #[default]
    Normal,
    High,
    Vip,
}

impl PriorityLevel {
    /// The directory spelling of this level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Vip => "vip",
        }
    }
}

impl std::fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PriorityLevel {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            "vip" => Ok(Self::Vip),
            _ => Err(ParseEnumError::new("priority level", s)),
        }
    }
}
