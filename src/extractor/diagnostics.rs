// Policy diagnostics - explains why a resource is gated
//
// Upstream platforms attach a policy flag to every track. Only a small set of
// values permits playback; everything else (including a missing flag) is gated.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::{ExtractionError, Result};

/// Reasons a resource may be withheld even though it exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnavailableReason {
    /// Blocked by rights holder or region (`BLOCK`)
    Blocked,

    /// Only a preview snippet is available to anonymous clients (`SNIP`)
    PreviewOnly,

    /// Policy flag absent or not one we know
    Unknown,
}

impl UnavailableReason {
    pub fn from_policy(policy: Option<&str>) -> Self {
        match policy.map(|p| p.trim().to_ascii_uppercase()).as_deref() {
            Some("BLOCK") => Self::Blocked,
            Some("SNIP") => Self::PreviewOnly,
            _ => Self::Unknown,
        }
    }

    /// Check if this is a permanent restriction (no workaround)
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Blocked)
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Blocked => "Blocked by the rights holder or in your region",
            Self::PreviewOnly => "Only a preview is available",
            Self::Unknown => "Unknown availability policy",
        }
    }

    /// Get user-friendly explanation for the UI
    pub fn user_explanation(&self) -> Option<&'static str> {
        match self {
            Self::Blocked => Some(
                "This track is blocked and cannot be played.\n\
                 It may be restricted in your country or withdrawn by the rights holder.",
            ),
            Self::PreviewOnly => Some(
                "Only a short preview of this track is offered.\n\
                 The full track requires a paid subscription on the platform.",
            ),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocked => write!(f, "blocked"),
            Self::PreviewOnly => write!(f, "preview-only"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Set of policy values that allow playback
#[derive(Debug, Clone)]
pub struct PolicyGate {
    permitted: Vec<String>,
}

impl PolicyGate {
    pub fn new<I, S>(permitted: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            permitted: permitted
                .into_iter()
                .map(|p| p.into().trim().to_ascii_uppercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn permits(&self, policy: Option<&str>) -> bool {
        match policy {
            Some(p) => {
                let p = p.trim().to_ascii_uppercase();
                self.permitted.iter().any(|allowed| *allowed == p)
            }
            None => false,
        }
    }

    /// Fail with `ContentUnavailable` unless the policy is permitted
    pub fn check(&self, policy: Option<&str>) -> Result<()> {
        if self.permits(policy) {
            return Ok(());
        }
        let reason = UnavailableReason::from_policy(policy);
        Err(ExtractionError::ContentUnavailable {
            reason,
            message: format!("Content not available: policy {}", policy.unwrap_or("<absent>")),
        })
    }
}

impl Default for PolicyGate {
    fn default() -> Self {
        Self::new(["ALLOW", "MONETIZE"])
    }
}
