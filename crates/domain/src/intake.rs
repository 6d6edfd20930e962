use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::ports::collaborators::{OwnerContact, OwnerDirectory};
use crate::ports::pro_forma::{ProFormaRequestRepository, StatusWrite};
use crate::pro_forma::{
    IntakeDetails, RequestStatus, RequestedAction, UrgencyLevel, ensure_email, trimmed,
};
use crate::util::now_ms;

/// The fixed set of outcomes the public party can observe. Expired tokens
/// render as `NotFound`: the public path never reveals whether a token ever
/// existed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum IntakeView {
    NotFound,
    AwaitingSubmission {
        requested_action: RequestedAction,
        expires_at_ms: i64,
    },
    SubmissionReceived,
    Processed {
        owner_contact: Option<OwnerContact>,
    },
    Declined {
        owner_contact: Option<OwnerContact>,
    },
}

#[derive(Clone, Debug, Deserialize)]
pub struct IntakeSubmission {
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub matter_description: String,
    pub matter_type: Option<String>,
    pub urgency_level: Option<UrgencyLevel>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SubmissionAck {
    pub submitted_at_ms: i64,
}

#[derive(Clone)]
pub struct IntakeService {
    repository: Arc<dyn ProFormaRequestRepository>,
    directory: Arc<dyn OwnerDirectory>,
}

impl IntakeService {
    pub fn new(
        repository: Arc<dyn ProFormaRequestRepository>,
        directory: Arc<dyn OwnerDirectory>,
    ) -> Self {
        Self {
            repository,
            directory,
        }
    }

    pub async fn resolve(&self, token: &str) -> DomainResult<IntakeView> {
        let Some(request) = self.repository.find_by_token(token).await? else {
            return Ok(IntakeView::NotFound);
        };
        let view = match request.effective_status(now_ms()) {
            RequestStatus::Expired => IntakeView::NotFound,
            RequestStatus::Pending => IntakeView::AwaitingSubmission {
                requested_action: request.requested_action.clone(),
                expires_at_ms: request.expires_at_ms,
            },
            RequestStatus::Submitted => IntakeView::SubmissionReceived,
            RequestStatus::Processed => IntakeView::Processed {
                owner_contact: self.owner_contact(&request.owner_id).await,
            },
            RequestStatus::Declined => IntakeView::Declined {
                owner_contact: self.owner_contact(&request.owner_id).await,
            },
        };
        Ok(view)
    }

    /// Accepts the external party's intake. Re-resolves the token because the
    /// page load and the submission are not atomic from the caller's side;
    /// the compare-and-set on `pending` is what actually decides a race.
    pub async fn submit(
        &self,
        token: &str,
        submission: IntakeSubmission,
    ) -> DomainResult<SubmissionAck> {
        let Some(request) = self.repository.find_by_token(token).await? else {
            return Err(DomainError::NotFound);
        };
        match request.effective_status(now_ms()) {
            RequestStatus::Expired => return Err(DomainError::NotFound),
            RequestStatus::Pending => {}
            _ => return Err(DomainError::AlreadyActed),
        }

        let intake = validate_submission(&submission)?;
        let submitted_at_ms = now_ms();
        let write = StatusWrite::Submitted {
            intake,
            submitted_at_ms,
        };
        let updated = self
            .repository
            .transition_status(&request.request_id, &[RequestStatus::Pending], &write)
            .await?;
        match updated {
            Some(updated) => {
                tracing::info!(
                    request_id = %updated.request_id,
                    "public intake submitted"
                );
                Ok(SubmissionAck { submitted_at_ms })
            }
            // A concurrent submission won the compare-and-set.
            None => Err(DomainError::AlreadyActed),
        }
    }

    /// Best-effort enrichment; a directory fault must not block the view.
    async fn owner_contact(&self, owner_id: &str) -> Option<OwnerContact> {
        match self.directory.owner_contact(owner_id).await {
            Ok(contact) => contact,
            Err(err) => {
                tracing::debug!(owner_id, error = %err, "owner directory lookup failed");
                None
            }
        }
    }
}

fn validate_submission(submission: &IntakeSubmission) -> DomainResult<IntakeDetails> {
    let client_name = submission.client_name.trim();
    if client_name.is_empty() {
        return Err(DomainError::validation("client_name", "is required"));
    }
    let client_email = submission.client_email.trim();
    if client_email.is_empty() {
        return Err(DomainError::validation("client_email", "is required"));
    }
    ensure_email("client_email", client_email)?;
    let matter_description = submission.matter_description.trim();
    if matter_description.is_empty() {
        return Err(DomainError::validation("matter_description", "is required"));
    }

    Ok(IntakeDetails {
        client_name: Some(client_name.to_string()),
        client_email: Some(client_email.to_string()),
        client_phone: trimmed(&submission.client_phone),
        matter_description: Some(matter_description.to_string()),
        matter_type: trimmed(&submission.matter_type),
        urgency_level: submission.urgency_level.clone(),
        notes: trimmed(&submission.notes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::BoxFuture;
    use crate::ports::collaborators::CollaboratorError;
    use crate::pro_forma::{IntakeCompleteness, ProFormaRequest};
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    #[derive(Default)]
    struct MockRepository {
        items: RwLock<HashMap<String, ProFormaRequest>>,
    }

    impl ProFormaRequestRepository for MockRepository {
        fn create(
            &self,
            request: &ProFormaRequest,
        ) -> BoxFuture<'_, DomainResult<ProFormaRequest>> {
            let request = request.clone();
            Box::pin(async move {
                self.items
                    .write()
                    .await
                    .insert(request.request_id.clone(), request.clone());
                Ok(request)
            })
        }

        fn find_by_token(
            &self,
            token: &str,
        ) -> BoxFuture<'_, DomainResult<Option<ProFormaRequest>>> {
            let token = token.to_string();
            Box::pin(async move {
                let items = self.items.read().await;
                Ok(items.values().find(|item| item.token == token).cloned())
            })
        }

        fn find_by_id(
            &self,
            request_id: &str,
        ) -> BoxFuture<'_, DomainResult<Option<ProFormaRequest>>> {
            let request_id = request_id.to_string();
            Box::pin(async move { Ok(self.items.read().await.get(&request_id).cloned()) })
        }

        fn find_open_for_owner(
            &self,
            owner_id: &str,
        ) -> BoxFuture<'_, DomainResult<Vec<ProFormaRequest>>> {
            let owner_id = owner_id.to_string();
            Box::pin(async move {
                let items = self.items.read().await;
                Ok(items
                    .values()
                    .filter(|item| item.owner_id == owner_id && item.status.is_open())
                    .cloned()
                    .collect())
            })
        }

        fn transition_status(
            &self,
            request_id: &str,
            expected: &[RequestStatus],
            write: &StatusWrite,
        ) -> BoxFuture<'_, DomainResult<Option<ProFormaRequest>>> {
            let request_id = request_id.to_string();
            let expected = expected.to_vec();
            let write = write.clone();
            Box::pin(async move {
                let mut items = self.items.write().await;
                let Some(found) = items.get_mut(&request_id) else {
                    return Ok(None);
                };
                if !expected.contains(&found.status) {
                    return Ok(None);
                }
                write.apply_to(found);
                Ok(Some(found.clone()))
            })
        }
    }

    /// Serves a stale `pending` snapshot from `find_by_token` while the
    /// underlying store has already moved on: the deterministic shape of a
    /// submission race.
    struct StaleReadRepository {
        inner: Arc<MockRepository>,
        stale: ProFormaRequest,
    }

    impl ProFormaRequestRepository for StaleReadRepository {
        fn create(
            &self,
            request: &ProFormaRequest,
        ) -> BoxFuture<'_, DomainResult<ProFormaRequest>> {
            self.inner.create(request)
        }

        fn find_by_token(
            &self,
            _token: &str,
        ) -> BoxFuture<'_, DomainResult<Option<ProFormaRequest>>> {
            let stale = self.stale.clone();
            Box::pin(async move { Ok(Some(stale)) })
        }

        fn find_by_id(
            &self,
            request_id: &str,
        ) -> BoxFuture<'_, DomainResult<Option<ProFormaRequest>>> {
            self.inner.find_by_id(request_id)
        }

        fn find_open_for_owner(
            &self,
            owner_id: &str,
        ) -> BoxFuture<'_, DomainResult<Vec<ProFormaRequest>>> {
            self.inner.find_open_for_owner(owner_id)
        }

        fn transition_status(
            &self,
            request_id: &str,
            expected: &[RequestStatus],
            write: &StatusWrite,
        ) -> BoxFuture<'_, DomainResult<Option<ProFormaRequest>>> {
            self.inner.transition_status(request_id, expected, write)
        }
    }

    struct StaticDirectory {
        contact: Option<OwnerContact>,
    }

    impl OwnerDirectory for StaticDirectory {
        fn owner_contact(
            &self,
            _owner_id: &str,
        ) -> BoxFuture<'_, Result<Option<OwnerContact>, CollaboratorError>> {
            let contact = self.contact.clone();
            Box::pin(async move { Ok(contact) })
        }
    }

    struct FailingDirectory;

    impl OwnerDirectory for FailingDirectory {
        fn owner_contact(
            &self,
            _owner_id: &str,
        ) -> BoxFuture<'_, Result<Option<OwnerContact>, CollaboratorError>> {
            Box::pin(async move {
                Err(CollaboratorError::Unavailable(
                    "directory offline".to_string(),
                ))
            })
        }
    }

    fn pending_request(token: &str, expires_at_ms: i64) -> ProFormaRequest {
        ProFormaRequest {
            request_id: format!("pfr-{token}"),
            token: token.to_string(),
            owner_id: "practitioner-1".to_string(),
            requested_action: RequestedAction::CreateMatter,
            status: RequestStatus::Pending,
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

    fn far_future_ms() -> i64 {
        now_ms() + 7 * 24 * 60 * 60 * 1_000
    }

    fn valid_submission() -> IntakeSubmission {
        IntakeSubmission {
            client_name: "Thandi Nkosi".to_string(),
            client_email: "thandi@example.com".to_string(),
            client_phone: Some("+27 82 000 0000".to_string()),
            matter_description: "Commercial lease dispute".to_string(),
            matter_type: Some("commercial".to_string()),
            urgency_level: Some(UrgencyLevel::High),
            notes: None,
        }
    }

    async fn service_with(
        requests: Vec<ProFormaRequest>,
    ) -> (Arc<MockRepository>, IntakeService) {
        let repo = Arc::new(MockRepository::default());
        for request in requests {
            repo.create(&request).await.expect("seed request");
        }
        let service = IntakeService::new(
            repo.clone(),
            Arc::new(StaticDirectory {
                contact: Some(OwnerContact {
                    name: "Adv. Dlamini".to_string(),
                    email: "dlamini@chambers.example".to_string(),
                }),
            }),
        );
        (repo, service)
    }

    #[tokio::test]
    async fn unknown_token_resolves_to_not_found() {
        let (_, service) = service_with(vec![]).await;
        let view = service.resolve("missing").await.expect("resolve");
        assert_eq!(view, IntakeView::NotFound);
    }

    #[tokio::test]
    async fn expired_token_is_indistinguishable_from_absence() {
        let (_, service) = service_with(vec![pending_request("tok-expired", 2_000)]).await;
        let expired = service.resolve("tok-expired").await.expect("resolve");
        let missing = service.resolve("tok-never-issued").await.expect("resolve");
        assert_eq!(expired, missing);
        assert_eq!(expired, IntakeView::NotFound);
    }

    #[tokio::test]
    async fn pending_request_shows_the_form() {
        let expires = far_future_ms();
        let (_, service) = service_with(vec![pending_request("tok-1", expires)]).await;
        let view = service.resolve("tok-1").await.expect("resolve");
        assert_eq!(
            view,
            IntakeView::AwaitingSubmission {
                requested_action: RequestedAction::CreateMatter,
                expires_at_ms: expires,
            }
        );
    }

    #[tokio::test]
    async fn submitted_request_shows_confirmation_pending() {
        let mut request = pending_request("tok-1", far_future_ms());
        request.status = RequestStatus::Submitted;
        let (_, service) = service_with(vec![request]).await;
        let view = service.resolve("tok-1").await.expect("resolve");
        assert_eq!(view, IntakeView::SubmissionReceived);
    }

    #[tokio::test]
    async fn terminal_view_is_enriched_with_owner_contact() {
        let mut request = pending_request("tok-1", far_future_ms());
        request.status = RequestStatus::Processed;
        let (_, service) = service_with(vec![request]).await;
        let view = service.resolve("tok-1").await.expect("resolve");
        match view {
            IntakeView::Processed { owner_contact } => {
                assert_eq!(
                    owner_contact.map(|contact| contact.name),
                    Some("Adv. Dlamini".to_string())
                );
            }
            other => panic!("unexpected view: {other:?}"),
        }
    }

    #[tokio::test]
    async fn directory_failure_does_not_block_terminal_view() {
        let mut request = pending_request("tok-1", far_future_ms());
        request.status = RequestStatus::Declined;
        let repo = Arc::new(MockRepository::default());
        repo.create(&request).await.expect("seed");
        let service = IntakeService::new(repo, Arc::new(FailingDirectory));

        let view = service.resolve("tok-1").await.expect("resolve");
        assert_eq!(view, IntakeView::Declined { owner_contact: None });
    }

    #[tokio::test]
    async fn submit_flips_pending_to_submitted_and_stores_intake() {
        let (repo, service) = service_with(vec![pending_request("tok-1", far_future_ms())]).await;
        let ack = service
            .submit("tok-1", valid_submission())
            .await
            .expect("submit");

        let stored = repo
            .find_by_token("tok-1")
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(stored.status, RequestStatus::Submitted);
        assert_eq!(stored.submitted_at_ms, Some(ack.submitted_at_ms));
        assert_eq!(
            stored.intake.client_email,
            Some("thandi@example.com".to_string())
        );
    }

    #[tokio::test]
    async fn invalid_email_names_the_field_and_leaves_request_pending() {
        let (repo, service) = service_with(vec![pending_request("tok-1", far_future_ms())]).await;
        let mut submission = valid_submission();
        submission.client_email = "not-an-email".to_string();

        let err = service.submit("tok-1", submission).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation { field, .. } if field == "client_email"
        ));

        let stored = repo
            .find_by_token("tok-1")
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(stored.status, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn second_submission_reports_already_acted_and_keeps_the_winner() {
        let (repo, service) = service_with(vec![pending_request("tok-1", far_future_ms())]).await;
        service
            .submit("tok-1", valid_submission())
            .await
            .expect("first submit");

        let mut second = valid_submission();
        second.client_name = "Someone Else".to_string();
        let err = service.submit("tok-1", second).await.unwrap_err();
        assert!(matches!(err, DomainError::AlreadyActed));

        let stored = repo
            .find_by_token("tok-1")
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(stored.intake.client_name, Some("Thandi Nkosi".to_string()));
    }

    #[tokio::test]
    async fn losing_the_compare_and_set_reports_already_acted() {
        let request = pending_request("tok-1", far_future_ms());
        let inner = Arc::new(MockRepository::default());
        inner.create(&request).await.expect("seed");
        // The underlying row is already submitted; the service still sees a
        // stale pending snapshot on its re-read.
        inner
            .transition_status(
                &request.request_id,
                &[RequestStatus::Pending],
                &StatusWrite::Submitted {
                    intake: IntakeDetails::default(),
                    submitted_at_ms: 9_000,
                },
            )
            .await
            .expect("concurrent winner");

        let service = IntakeService::new(
            Arc::new(StaleReadRepository {
                inner,
                stale: request,
            }),
            Arc::new(StaticDirectory { contact: None }),
        );

        let err = service.submit("tok-1", valid_submission()).await.unwrap_err();
        assert!(matches!(err, DomainError::AlreadyActed));
    }

    #[tokio::test]
    async fn submit_after_expiry_is_not_found() {
        let (_, service) = service_with(vec![pending_request("tok-1", 2_000)]).await;
        let err = service.submit("tok-1", valid_submission()).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound));
    }
}
