use std::sync::Arc;

use crate::DomainResult;
use crate::error::DomainError;
use crate::identity::PractitionerIdentity;
use crate::ports::collaborators::{InvoiceGeneration, MatterCreation, MatterLike, MatterPrefill};
use crate::ports::pro_forma::{ProFormaRequestRepository, StatusWrite};
use crate::pro_forma::{
    EntityRef, IntakeCompleteness, ProFormaRequest, RequestStatus, RequestedAction,
};
use crate::util::now_ms;

/// Converts a request into its downstream entity and closes it. Resolution is
/// user-initiated: a collaborator failure surfaces to the caller with status
/// untouched, and retry is manual.
#[derive(Clone)]
pub struct DispatchService {
    repository: Arc<dyn ProFormaRequestRepository>,
    matters: Arc<dyn MatterCreation>,
    invoices: Arc<dyn InvoiceGeneration>,
}

impl DispatchService {
    pub fn new(
        repository: Arc<dyn ProFormaRequestRepository>,
        matters: Arc<dyn MatterCreation>,
        invoices: Arc<dyn InvoiceGeneration>,
    ) -> Self {
        Self {
            repository,
            matters,
            invoices,
        }
    }

    pub async fn resolve(
        &self,
        request_id: &str,
        actor: &PractitionerIdentity,
    ) -> DomainResult<EntityRef> {
        let request = self.guarded_request(request_id, actor).await?;
        ensure_resolvable(&request)?;

        let entity = match request.requested_action {
            RequestedAction::CreateMatter => {
                self.matters.create_matter(&matter_prefill(&request)).await
            }
            RequestedAction::CreateInvoice => {
                self.invoices
                    .create_invoice(&invoice_carrier(&request), true)
                    .await
            }
        }
        .map_err(|err| {
            tracing::warn!(
                request_id = %request.request_id,
                requested_action = request.requested_action.as_str(),
                error = %err,
                "collaborator call failed; request left unchanged"
            );
            DomainError::Collaborator(err.to_string())
        })?;

        let write = StatusWrite::Processed {
            entity: entity.clone(),
            processed_by: actor.practitioner_id.clone(),
            processed_at_ms: now_ms(),
        };
        let updated = self
            .repository
            .transition_status(
                &request.request_id,
                &[RequestStatus::Pending, RequestStatus::Submitted],
                &write,
            )
            .await?;
        match updated {
            Some(updated) => {
                tracing::info!(
                    request_id = %updated.request_id,
                    entity_kind = entity.kind.as_str(),
                    "pro forma request processed"
                );
                Ok(entity)
            }
            None => Err(DomainError::AlreadyActed),
        }
    }

    pub async fn decline(
        &self,
        request_id: &str,
        actor: &PractitionerIdentity,
        reason: &str,
    ) -> DomainResult<ProFormaRequest> {
        let request = self.guarded_request(request_id, actor).await?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DomainError::validation("reason", "is required"));
        }

        let write = StatusWrite::Declined {
            reason: reason.to_string(),
            processed_by: actor.practitioner_id.clone(),
            processed_at_ms: now_ms(),
        };
        let updated = self
            .repository
            .transition_status(
                &request.request_id,
                &[RequestStatus::Pending, RequestStatus::Submitted],
                &write,
            )
            .await?;
        match updated {
            Some(updated) => {
                tracing::info!(request_id = %updated.request_id, "pro forma request declined");
                Ok(updated)
            }
            None => Err(DomainError::AlreadyActed),
        }
    }

    /// Shared authorization and idempotency guard: the request must exist,
    /// belong to the acting practitioner, and not already be terminal.
    async fn guarded_request(
        &self,
        request_id: &str,
        actor: &PractitionerIdentity,
    ) -> DomainResult<ProFormaRequest> {
        let request = self
            .repository
            .find_by_id(request_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        if request.owner_id != actor.practitioner_id {
            return Err(DomainError::Forbidden);
        }
        if request.status.is_terminal() {
            return Err(DomainError::AlreadyActed);
        }
        Ok(request)
    }
}

/// Resolution is eligible from `submitted`, or from `pending` only in the
/// owner-prefilled variant.
fn ensure_resolvable(request: &ProFormaRequest) -> DomainResult<()> {
    match request.status {
        RequestStatus::Submitted => Ok(()),
        RequestStatus::Pending
            if request.intake_completeness == IntakeCompleteness::Complete =>
        {
            Ok(())
        }
        RequestStatus::Pending => Err(DomainError::validation(
            "intake_completeness",
            "request is still awaiting client intake",
        )),
        _ => Err(DomainError::AlreadyActed),
    }
}

fn matter_prefill(request: &ProFormaRequest) -> MatterPrefill {
    MatterPrefill {
        client_name: request.intake.client_name.clone(),
        client_email: request.intake.client_email.clone(),
        client_phone: request.intake.client_phone.clone(),
        title: request.intake.matter_description.clone().unwrap_or_default(),
        matter_type: request.intake.matter_type.clone(),
        urgency_level: request.intake.urgency_level.clone(),
        notes: request.intake.notes.clone(),
        instructing_ref: request.request_id.clone(),
    }
}

/// Synthetic matter-shaped carrier: no persisted matter exists yet, so
/// `matter_id` stays empty.
fn invoice_carrier(request: &ProFormaRequest) -> MatterLike {
    MatterLike {
        matter_id: None,
        client_name: request.intake.client_name.clone(),
        client_email: request.intake.client_email.clone(),
        client_phone: request.intake.client_phone.clone(),
        description: request.intake.matter_description.clone().unwrap_or_default(),
        matter_type: request.intake.matter_type.clone(),
    }
}
