//! Core domain types: leads, per-lead outcomes, and batch identifiers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{IcebreakerError, Result};

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for batch run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Lead
// ---------------------------------------------------------------------------

/// One prospect to enrich. Field names follow the camelCase lead-list format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Job title / headline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub email: String,
    /// Company website as supplied; may lack a scheme (`grioagency.com`).
    pub website: String,
}

impl Lead {
    /// Reject leads the pipeline cannot work with.
    ///
    /// First name, email and website must be non-blank.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("firstName", &self.first_name),
            ("email", &self.email),
            ("website", &self.website),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(IcebreakerError::validation(format!(
                "lead is missing required field(s): {}",
                missing.join(", ")
            )))
        }
    }

    /// Full display name, tolerating an empty last name.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why a lead could not be enriched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The homepage could not be fetched (or its URL was unusable).
    FetchFailed,
    /// No page produced a usable abstract.
    NoContent,
    /// The synthesizer returned nothing.
    SynthesisFailed,
    /// Processing was cancelled before it finished.
    Cancelled,
    /// The lead was rejected before entering the pipeline.
    InvalidLead(String),
}

impl FailureReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::FetchFailed => "fetch_failed",
            Self::NoContent => "no_content",
            Self::SynthesisFailed => "synthesis_failed",
            Self::Cancelled => "cancelled",
            Self::InvalidLead(_) => "invalid_lead",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FetchFailed => f.write_str("Failed to fetch website"),
            Self::NoContent => f.write_str("No content found on website"),
            Self::SynthesisFailed => f.write_str("Failed to generate icebreaker"),
            Self::Cancelled => f.write_str("Cancelled"),
            Self::InvalidLead(detail) => write!(f, "Invalid lead: {detail}"),
        }
    }
}

/// Terminal result of processing one lead.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "OutcomeRecord")]
pub enum LeadOutcome {
    Success {
        icebreaker: String,
        /// The lead with its website normalized to carry a scheme.
        lead: Lead,
        /// Number of page abstracts the icebreaker was built from.
        pages_used: usize,
    },
    Failure {
        reason: FailureReason,
        lead: Lead,
    },
}

impl LeadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn icebreaker(&self) -> Option<&str> {
        match self {
            Self::Success { icebreaker, .. } => Some(icebreaker),
            Self::Failure { .. } => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&FailureReason> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { reason, .. } => Some(reason),
        }
    }

    pub fn lead(&self) -> &Lead {
        match self {
            Self::Success { lead, .. } | Self::Failure { lead, .. } => lead,
        }
    }

    /// Flatten into the wire record shape.
    pub fn to_record(&self) -> OutcomeRecord {
        OutcomeRecord::from(self.clone())
    }
}

/// Wire shape of an outcome:
/// `{"success": true, "icebreaker": "...", "lead": {...}}` or
/// `{"success": false, "error": "...", "errorCode": "...", "lead": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeRecord {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icebreaker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages_used: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub lead: Lead,
}

impl From<LeadOutcome> for OutcomeRecord {
    fn from(outcome: LeadOutcome) -> Self {
        match outcome {
            LeadOutcome::Success {
                icebreaker,
                lead,
                pages_used,
            } => Self {
                success: true,
                icebreaker: Some(icebreaker),
                pages_used: Some(pages_used),
                error: None,
                error_code: None,
                lead,
            },
            LeadOutcome::Failure { reason, lead } => Self {
                success: false,
                icebreaker: None,
                pages_used: None,
                error: Some(reason.to_string()),
                error_code: Some(reason.code().to_string()),
                lead,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn junior() -> Lead {
        Lead {
            first_name: "Junior".into(),
            last_name: "Nyemb".into(),
            title: None,
            company_name: None,
            email: "junior@grioagency.com".into(),
            website: "grioagency.com".into(),
        }
    }

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let parsed: RunId = id.to_string().parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn lead_deserializes_from_camel_case() {
        let json = r#"{
            "firstName": "Junior",
            "lastName": "Nyemb",
            "companyName": "Grio Agency",
            "email": "junior@grioagency.com",
            "website": "grioagency.com"
        }"#;
        let lead: Lead = serde_json::from_str(json).expect("deserialize lead");
        assert_eq!(lead.first_name, "Junior");
        assert_eq!(lead.company_name.as_deref(), Some("Grio Agency"));
        assert!(lead.title.is_none());
    }

    #[test]
    fn validate_accepts_complete_lead() {
        assert!(junior().validate().is_ok());
    }

    #[test]
    fn validate_lists_missing_fields() {
        let mut lead = junior();
        lead.website = "   ".into();
        lead.email = String::new();
        let err = lead.validate().unwrap_err().to_string();
        assert!(err.contains("email"));
        assert!(err.contains("website"));
        assert!(!err.contains("firstName"));
    }

    #[test]
    fn full_name_without_last_name() {
        let mut lead = junior();
        lead.last_name = String::new();
        assert_eq!(lead.full_name(), "Junior");
    }

    #[test]
    fn failure_reason_messages() {
        assert_eq!(FailureReason::FetchFailed.to_string(), "Failed to fetch website");
        assert_eq!(FailureReason::NoContent.to_string(), "No content found on website");
        assert_eq!(
            FailureReason::SynthesisFailed.to_string(),
            "Failed to generate icebreaker"
        );
        assert_eq!(FailureReason::NoContent.code(), "no_content");
    }

    #[test]
    fn success_outcome_serializes_with_flag() {
        let outcome = LeadOutcome::Success {
            icebreaker: "Hey Junior".into(),
            lead: junior(),
            pages_used: 2,
        };
        let json = serde_json::to_value(&outcome).expect("serialize");
        assert_eq!(json["success"], true);
        assert_eq!(json["icebreaker"], "Hey Junior");
        assert_eq!(json["lead"]["firstName"], "Junior");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn failure_outcome_serializes_reason() {
        let outcome = LeadOutcome::Failure {
            reason: FailureReason::FetchFailed,
            lead: junior(),
        };
        let json = serde_json::to_value(&outcome).expect("serialize");
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Failed to fetch website");
        assert_eq!(json["errorCode"], "fetch_failed");
        assert!(json.get("icebreaker").is_none());
    }
}
