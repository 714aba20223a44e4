//! Shared primitive types used across the scoring and analytics core.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier of a stored prediction (UUID v4 string).
pub type PredictionId = String;

/// Stable external customer key supplied by the caller.
pub type CustomerId = String;

/// Churn risk band derived from a probability via path-specific thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low    => "LOW",
            Self::Medium => "MEDIUM",
            Self::High   => "HIGH",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LOW"    => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH"   => Some(Self::High),
            _        => None,
        }
    }

    /// Fixed human-readable guidance attached to each band.
    pub fn message(&self) -> &'static str {
        match self {
            Self::High   => "High churn risk - immediate action recommended",
            Self::Medium => "Moderate churn risk - monitoring recommended",
            Self::Low    => "Low churn risk - loyal customer",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which scoring path produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    Model,
    Heuristic,
}

impl ScorerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model     => "model",
            Self::Heuristic => "heuristic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "model"     => Some(Self::Model),
            "heuristic" => Some(Self::Heuristic),
            _           => None,
        }
    }
}
