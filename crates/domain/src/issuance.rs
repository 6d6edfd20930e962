use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::identity::PractitionerIdentity;
use crate::ports::pro_forma::ProFormaRequestRepository;
use crate::pro_forma::{
    IntakeCompleteness, IntakeDetails, ProFormaRequest, RequestStatus, RequestedAction,
    ensure_email, sanitize_intake,
};
use crate::token::ShareToken;
use crate::util::now_ms;

pub const DEFAULT_EXPIRY_DAYS: i64 = 7;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1_000;

#[derive(Clone, Debug)]
pub struct IssuancePolicy {
    /// Origin the public link is built against, e.g. `https://app.lexohub.co.za`.
    pub public_base_url: String,
    pub expiry_days: i64,
}

impl IssuancePolicy {
    pub fn new(public_base_url: impl Into<String>, expiry_days: i64) -> Self {
        Self {
            public_base_url: public_base_url.into(),
            expiry_days,
        }
    }

    fn horizon_ms(&self) -> i64 {
        self.expiry_days * MS_PER_DAY
    }
}

#[derive(Clone, Debug)]
pub struct IssueInput {
    pub requested_action: RequestedAction,
    pub intake: IntakeDetails,
    pub intake_completeness: IntakeCompleteness,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IssuedLink {
    pub request: ProFormaRequest,
    pub public_url: String,
}

#[derive(Clone)]
pub struct IssuanceService {
    repository: Arc<dyn ProFormaRequestRepository>,
    policy: IssuancePolicy,
}

impl IssuanceService {
    pub fn new(repository: Arc<dyn ProFormaRequestRepository>, policy: IssuancePolicy) -> Self {
        Self { repository, policy }
    }

    /// Creates a request and returns the shareable public URL. Every call
    /// issues a distinct token; nothing here deduplicates repeated intents.
    pub async fn issue(
        &self,
        owner: PractitionerIdentity,
        input: IssueInput,
    ) -> DomainResult<IssuedLink> {
        let intake = validate_issue_input(&input)?;
        let now = now_ms();
        let request = ProFormaRequest {
            request_id: crate::util::uuid_v7_without_dashes(),
            token: ShareToken::generate().into_string(),
            owner_id: owner.practitioner_id,
            requested_action: input.requested_action,
            status: RequestStatus::Pending,
            intake,
            intake_completeness: input.intake_completeness,
            created_at_ms: now,
            submitted_at_ms: None,
            expires_at_ms: now + self.policy.horizon_ms(),
            processed_at_ms: None,
            processed_by: None,
            created_entity: None,
            rejection_reason: None,
        };
        let request = self.repository.create(&request).await?;
        let public_url = public_request_url(&self.policy.public_base_url, &request.token);
        tracing::info!(
            request_id = %request.request_id,
            owner_id = %request.owner_id,
            requested_action = request.requested_action.as_str(),
            "pro forma request issued"
        );
        Ok(IssuedLink {
            request,
            public_url,
        })
    }
}

/// The internal id is never embedded; the token is the whole credential.
pub fn public_request_url(base_url: &str, token: &str) -> String {
    format!(
        "{}/pro-forma-request/{token}",
        base_url.trim_end_matches('/')
    )
}

fn validate_issue_input(input: &IssueInput) -> DomainResult<IntakeDetails> {
    let intake = sanitize_intake(&input.intake);

    if !intake.has_contact_channel() {
        return Err(DomainError::validation(
            "client_email",
            "a contact channel (client_email or client_phone) is required",
        ));
    }
    if intake.matter_description.is_none() {
        return Err(DomainError::validation(
            "matter_description",
            "is required",
        ));
    }
    if let Some(email) = &intake.client_email {
        ensure_email("client_email", email)?;
    }

    if input.intake_completeness == IntakeCompleteness::Complete {
        if intake.client_name.is_none() {
            return Err(DomainError::validation(
                "client_name",
                "is required when intake is prefilled as complete",
            ));
        }
        if intake.client_email.is_none() {
            return Err(DomainError::validation(
                "client_email",
                "is required when intake is prefilled as complete",
            ));
        }
    }

    Ok(intake)
}
