use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Coarse serving size used to scale nutrition estimates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PortionCategory {
    Small,
    Normal,
    Large,
}

impl PortionCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Normal => "normal",
            Self::Large => "large",
        }
    }

    /// Multiplier applied to a normal-portion estimate.
    pub fn scale(self) -> f64 {
        match self {
            Self::Small => 0.7,
            Self::Normal => 1.0,
            Self::Large => 1.5,
        }
    }
}

impl Default for PortionCategory {
    fn default() -> Self {
        Self::Normal
    }
}

impl fmt::Display for PortionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PortionCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "small" | "kecil" => Ok(Self::Small),
            "normal" => Ok(Self::Normal),
            "large" | "besar" => Ok(Self::Large),
            other => Err(AppError::validation(
                "portion",
                format!("unknown portion '{other}', expected small, normal or large"),
            )),
        }
    }
}
