use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use validator::ValidateEmail;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestedAction {
    CreateMatter,
    CreateInvoice,
}

impl RequestedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateMatter => "create_matter",
            Self::CreateInvoice => "create_invoice",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "create_matter" => Some(Self::CreateMatter),
            "create_invoice" => Some(Self::CreateInvoice),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Submitted,
    Processed,
    Declined,
    /// Derived at read time from `expires_at_ms`; never stored.
    Expired,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Submitted => "submitted",
            Self::Processed => "processed",
            Self::Declined => "declined",
            Self::Expired => "expired",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "submitted" => Some(Self::Submitted),
            "processed" => Some(Self::Processed),
            "declined" => Some(Self::Declined),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    /// `processed` and `declined` are absorbing.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed | Self::Declined)
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Submitted)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntakeCompleteness {
    /// Owner prefilled the full intake at issuance; resolvable from `pending`.
    Complete,
    /// Intake stays blank until the external party submits.
    AwaitingClient,
}

impl IntakeCompleteness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::AwaitingClient => "awaiting_client",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "complete" => Some(Self::Complete),
            "awaiting_client" => Some(Self::AwaitingClient),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
    Urgent,
}

impl UrgencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct IntakeDetails {
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub matter_description: Option<String>,
    pub matter_type: Option<String>,
    pub urgency_level: Option<UrgencyLevel>,
    pub notes: Option<String>,
}

impl IntakeDetails {
    pub fn has_contact_channel(&self) -> bool {
        non_empty(&self.client_email) || non_empty(&self.client_phone)
    }
}

fn non_empty(value: &Option<String>) -> bool {
    value
        .as_ref()
        .is_some_and(|inner| !inner.trim().is_empty())
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Matter,
    Invoice,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matter => "matter",
            Self::Invoice => "invoice",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "matter" => Some(Self::Matter),
            "invoice" => Some(Self::Invoice),
            _ => None,
        }
    }
}

/// Back-reference to the downstream entity a request resolved into.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub entity_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProFormaRequest {
    pub request_id: String,
    pub token: String,
    pub owner_id: String,
    pub requested_action: RequestedAction,
    pub status: RequestStatus,
    pub intake: IntakeDetails,
    pub intake_completeness: IntakeCompleteness,
    pub created_at_ms: i64,
    pub submitted_at_ms: Option<i64>,
    pub expires_at_ms: i64,
    pub processed_at_ms: Option<i64>,
    pub processed_by: Option<String>,
    pub created_entity: Option<EntityRef>,
    pub rejection_reason: Option<String>,
}

impl ProFormaRequest {
    /// Read-time status shared by the public path and the owner worklist.
    /// Expiry never relabels a terminal request.
    pub fn effective_status(&self, now_ms: i64) -> RequestStatus {
        if self.status.is_open() && now_ms > self.expires_at_ms {
            return RequestStatus::Expired;
        }
        self.status.clone()
    }
}

pub(crate) fn ensure_email(field: &'static str, value: &str) -> DomainResult<()> {
    if !value.validate_email() {
        return Err(DomainError::validation(field, "must be a valid email"));
    }
    Ok(())
}

pub(crate) fn trimmed(value: &Option<String>) -> Option<String> {
    value.as_ref().and_then(|inner| {
        let inner = inner.trim();
        if inner.is_empty() {
            None
        } else {
            Some(inner.to_string())
        }
    })
}

/// Normalizes every free-text intake field; emptiness checks downstream see
/// trimmed values only.
pub(crate) fn sanitize_intake(intake: &IntakeDetails) -> IntakeDetails {
    IntakeDetails {
        client_name: trimmed(&intake.client_name),
        client_email: trimmed(&intake.client_email),
        client_phone: trimmed(&intake.client_phone),
        matter_description: trimmed(&intake.matter_description),
        matter_type: trimmed(&intake.matter_type),
        urgency_level: intake.urgency_level.clone(),
        notes: trimmed(&intake.notes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(status: RequestStatus, expires_at_ms: i64) -> ProFormaRequest {
        ProFormaRequest {
            request_id: "pfr-1".to_string(),
            token: "token-1".to_string(),
            owner_id: "practitioner-1".to_string(),
            requested_action: RequestedAction::CreateMatter,
            status,
            intake: IntakeDetails::default(),
            intake_completeness: IntakeCompleteness::AwaitingClient,
            created_at_ms: 1_000,
            submitted_at_ms: None,
            expires_at_ms,
            processed_at_ms: None,
            processed_by: None,
            created_entity: None,
            rejection_reason: None,
        }
    }

    #[test]
    fn open_request_past_horizon_reads_as_expired() {
        let request = request_with(RequestStatus::Pending, 5_000);
        assert_eq!(request.effective_status(5_001), RequestStatus::Expired);
        assert_eq!(request.effective_status(5_000), RequestStatus::Pending);
    }

    #[test]
    fn submitted_request_also_expires_at_read_time() {
        let request = request_with(RequestStatus::Submitted, 5_000);
        assert_eq!(request.effective_status(9_000), RequestStatus::Expired);
    }

    #[test]
    fn terminal_statuses_are_never_relabelled() {
        let processed = request_with(RequestStatus::Processed, 5_000);
        assert_eq!(processed.effective_status(9_000), RequestStatus::Processed);
        let declined = request_with(RequestStatus::Declined, 5_000);
        assert_eq!(declined.effective_status(9_000), RequestStatus::Declined);
    }

    #[test]
    fn status_round_trips_through_wire_names() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::Submitted,
            RequestStatus::Processed,
            RequestStatus::Declined,
            RequestStatus::Expired,
        ] {
            assert_eq!(RequestStatus::from_str(status.as_str()), Some(status));
        }
    }

    #[test]
    fn contact_channel_requires_a_non_blank_value() {
        let mut intake = IntakeDetails::default();
        assert!(!intake.has_contact_channel());
        intake.client_phone = Some("   ".to_string());
        assert!(!intake.has_contact_channel());
        intake.client_email = Some("client@example.com".to_string());
        assert!(intake.has_contact_channel());
    }
}
