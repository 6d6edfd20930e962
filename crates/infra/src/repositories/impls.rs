use std::collections::HashMap;
use std::sync::Arc;

use lexohub_domain::DomainResult;
use lexohub_domain::error::DomainError;
use lexohub_domain::ports::BoxFuture;
use lexohub_domain::ports::pro_forma::{ProFormaRequestRepository, StatusWrite};
use lexohub_domain::pro_forma::{
    EntityKind, EntityRef, IntakeCompleteness, IntakeDetails, ProFormaRequest, RequestStatus,
    RequestedAction, UrgencyLevel,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json, to_value};
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::Client;
use tokio::sync::RwLock;

const TABLE: &str = "pro_forma_request";

#[derive(Default)]
pub struct InMemoryProFormaRequestRepository {
    items: Arc<RwLock<HashMap<String, ProFormaRequest>>>,
    by_token: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryProFormaRequestRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProFormaRequestRepository for InMemoryProFormaRequestRepository {
    fn create(&self, request: &ProFormaRequest) -> BoxFuture<'_, DomainResult<ProFormaRequest>> {
        let request = request.clone();
        let items = self.items.clone();
        let by_token = self.by_token.clone();
        Box::pin(async move {
            let mut items = items.write().await;
            let mut by_token = by_token.write().await;
            if items.contains_key(&request.request_id) {
                return Err(DomainError::Storage(
                    "duplicate request id on insert".to_string(),
                ));
            }
            if by_token.contains_key(&request.token) {
                return Err(DomainError::Storage("duplicate token on insert".to_string()));
            }
            by_token.insert(request.token.clone(), request.request_id.clone());
            items.insert(request.request_id.clone(), request.clone());
            Ok(request)
        })
    }

    fn find_by_token(&self, token: &str) -> BoxFuture<'_, DomainResult<Option<ProFormaRequest>>> {
        let token = token.to_string();
        let items = self.items.clone();
        let by_token = self.by_token.clone();
        Box::pin(async move {
            let by_token = by_token.read().await;
            let Some(request_id) = by_token.get(&token) else {
                return Ok(None);
            };
            let items = items.read().await;
            Ok(items.get(request_id).cloned())
        })
    }

    fn find_by_id(
        &self,
        request_id: &str,
    ) -> BoxFuture<'_, DomainResult<Option<ProFormaRequest>>> {
        let request_id = request_id.to_string();
        let items = self.items.clone();
        Box::pin(async move { Ok(items.read().await.get(&request_id).cloned()) })
    }

    fn find_open_for_owner(
        &self,
        owner_id: &str,
    ) -> BoxFuture<'_, DomainResult<Vec<ProFormaRequest>>> {
        let owner_id = owner_id.to_string();
        let items = self.items.clone();
        Box::pin(async move {
            let items = items.read().await;
            let mut requests: Vec<_> = items
                .values()
                .filter(|item| item.owner_id == owner_id && item.status.is_open())
                .cloned()
                .collect();
            requests.sort_by(|a, b| {
                b.created_at_ms
                    .cmp(&a.created_at_ms)
                    .then_with(|| b.request_id.cmp(&a.request_id))
            });
            Ok(requests)
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
        let items = self.items.clone();
        Box::pin(async move {
            // Precondition check and write happen under one write guard, so
            // the transition is atomic within the process.
            let mut items = items.write().await;
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

/// SurrealDB-backed store. Token bijectivity is backed by a unique index on
/// `token`; the conditional transitions are single `UPDATE ... WHERE` calls
/// so the precondition and the write cannot be split.
#[derive(Clone)]
pub struct SurrealProFormaRequestRepository {
    client: Surreal<Client>,
}

impl SurrealProFormaRequestRepository {
    pub fn with_client(client: Surreal<Client>) -> Self {
        Self { client }
    }

    fn build_payload(request: &ProFormaRequest) -> SurrealRequestRow {
        SurrealRequestRow {
            request_id: request.request_id.clone(),
            token: request.token.clone(),
            owner_id: request.owner_id.clone(),
            requested_action: request.requested_action.as_str().to_string(),
            status: request.status.as_str().to_string(),
            client_name: request.intake.client_name.clone(),
            client_email: request.intake.client_email.clone(),
            client_phone: request.intake.client_phone.clone(),
            matter_description: request.intake.matter_description.clone(),
            matter_type: request.intake.matter_type.clone(),
            urgency_level: request
                .intake
                .urgency_level
                .as_ref()
                .map(|level| level.as_str().to_string()),
            notes: request.intake.notes.clone(),
            intake_completeness: request.intake_completeness.as_str().to_string(),
            created_at_ms: request.created_at_ms,
            submitted_at_ms: request.submitted_at_ms,
            expires_at_ms: request.expires_at_ms,
            processed_at_ms: request.processed_at_ms,
            processed_by: request.processed_by.clone(),
            created_entity_kind: request
                .created_entity
                .as_ref()
                .map(|entity| entity.kind.as_str().to_string()),
            created_entity_id: request
                .created_entity
                .as_ref()
                .map(|entity| entity.entity_id.clone()),
            rejection_reason: request.rejection_reason.clone(),
        }
    }

    fn decode_rows(rows: Vec<Value>) -> DomainResult<Vec<ProFormaRequest>> {
        rows.into_iter().map(Self::decode_row).collect()
    }

    fn decode_row(value: Value) -> DomainResult<ProFormaRequest> {
        let row: SurrealRequestRow = serde_json::from_value(value)
            .map_err(|err| DomainError::Storage(format!("invalid stored row: {err}")))?;

        let requested_action = RequestedAction::from_str(&row.requested_action).ok_or_else(|| {
            DomainError::Storage(format!(
                "invalid requested_action '{}' in stored row",
                row.requested_action
            ))
        })?;
        let status = RequestStatus::from_str(&row.status).ok_or_else(|| {
            DomainError::Storage(format!("invalid status '{}' in stored row", row.status))
        })?;
        let intake_completeness = IntakeCompleteness::from_str(&row.intake_completeness)
            .ok_or_else(|| {
                DomainError::Storage(format!(
                    "invalid intake_completeness '{}' in stored row",
                    row.intake_completeness
                ))
            })?;
        let urgency_level = row
            .urgency_level
            .as_deref()
            .map(|value| {
                UrgencyLevel::from_str(value).ok_or_else(|| {
                    DomainError::Storage(format!("invalid urgency_level '{value}' in stored row"))
                })
            })
            .transpose()?;
        let created_entity = match (&row.created_entity_kind, &row.created_entity_id) {
            (Some(kind), Some(entity_id)) => {
                let kind = EntityKind::from_str(kind).ok_or_else(|| {
                    DomainError::Storage(format!("invalid entity kind '{kind}' in stored row"))
                })?;
                Some(EntityRef {
                    kind,
                    entity_id: entity_id.clone(),
                })
            }
            _ => None,
        };

        Ok(ProFormaRequest {
            request_id: row.request_id,
            token: row.token,
            owner_id: row.owner_id,
            requested_action,
            status,
            intake: IntakeDetails {
                client_name: row.client_name,
                client_email: row.client_email,
                client_phone: row.client_phone,
                matter_description: row.matter_description,
                matter_type: row.matter_type,
                urgency_level,
                notes: row.notes,
            },
            intake_completeness,
            created_at_ms: row.created_at_ms,
            submitted_at_ms: row.submitted_at_ms,
            expires_at_ms: row.expires_at_ms,
            processed_at_ms: row.processed_at_ms,
            processed_by: row.processed_by,
            created_entity,
            rejection_reason: row.rejection_reason,
        })
    }

    fn map_surreal_error(err: surrealdb::Error) -> DomainError {
        DomainError::Storage(err.to_string())
    }

    fn expected_statuses(expected: &[RequestStatus]) -> Vec<String> {
        expected
            .iter()
            .map(|status| status.as_str().to_string())
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SurrealRequestRow {
    request_id: String,
    token: String,
    owner_id: String,
    requested_action: String,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    matter_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    matter_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    urgency_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    intake_completeness: String,
    created_at_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    submitted_at_ms: Option<i64>,
    expires_at_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    processed_at_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    processed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_entity_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_entity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rejection_reason: Option<String>,
}

impl ProFormaRequestRepository for SurrealProFormaRequestRepository {
    fn create(&self, request: &ProFormaRequest) -> BoxFuture<'_, DomainResult<ProFormaRequest>> {
        let payload = Self::build_payload(request);
        let request_id = request.request_id.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let payload = to_value(payload)
                .map_err(|err| DomainError::Storage(format!("invalid payload: {err}")))?;
            let mut response = client
                .query(format!(
                    "CREATE type::record('{TABLE}', $request_id) CONTENT $payload; \
                     SELECT * FROM {TABLE} WHERE request_id = $request_id LIMIT 1"
                ))
                .bind(("request_id", request_id))
                .bind(("payload", payload))
                .await
                .map_err(Self::map_surreal_error)?;
            let rows: Vec<Value> = response
                .take(1)
                .map_err(|err| DomainError::Storage(format!("invalid query result: {err}")))?;
            Self::decode_rows(rows)?
                .pop()
                .ok_or_else(|| DomainError::Storage("create returned no row".to_string()))
        })
    }

    fn find_by_token(&self, token: &str) -> BoxFuture<'_, DomainResult<Option<ProFormaRequest>>> {
        let token = token.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(format!("SELECT * FROM {TABLE} WHERE token = $token LIMIT 1"))
                .bind(("token", token))
                .await
                .map_err(Self::map_surreal_error)?;
            let rows: Vec<Value> = response
                .take(0)
                .map_err(|err| DomainError::Storage(format!("invalid query result: {err}")))?;
            Ok(Self::decode_rows(rows)?.pop())
        })
    }

    fn find_by_id(
        &self,
        request_id: &str,
    ) -> BoxFuture<'_, DomainResult<Option<ProFormaRequest>>> {
        let request_id = request_id.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(format!(
                    "SELECT * FROM {TABLE} WHERE request_id = $request_id LIMIT 1"
                ))
                .bind(("request_id", request_id))
                .await
                .map_err(Self::map_surreal_error)?;
            let rows: Vec<Value> = response
                .take(0)
                .map_err(|err| DomainError::Storage(format!("invalid query result: {err}")))?;
            Ok(Self::decode_rows(rows)?.pop())
        })
    }

    fn find_open_for_owner(
        &self,
        owner_id: &str,
    ) -> BoxFuture<'_, DomainResult<Vec<ProFormaRequest>>> {
        let owner_id = owner_id.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(format!(
                    "SELECT * FROM {TABLE} \
                     WHERE owner_id = $owner_id AND status IN ['pending', 'submitted'] \
                     ORDER BY created_at_ms DESC, request_id DESC"
                ))
                .bind(("owner_id", owner_id))
                .await
                .map_err(Self::map_surreal_error)?;
            let rows: Vec<Value> = response
                .take(0)
                .map_err(|err| DomainError::Storage(format!("invalid query result: {err}")))?;
            Self::decode_rows(rows)
        })
    }

    fn transition_status(
        &self,
        request_id: &str,
        expected: &[RequestStatus],
        write: &StatusWrite,
    ) -> BoxFuture<'_, DomainResult<Option<ProFormaRequest>>> {
        let request_id = request_id.to_string();
        let expected = Self::expected_statuses(expected);
        let write = write.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let (query, params) = match &write {
                StatusWrite::Submitted {
                    intake,
                    submitted_at_ms,
                } => (
                    format!(
                        "UPDATE {TABLE} SET \
                            status = $to_status, \
                            client_name = $intake.client_name, \
                            client_email = $intake.client_email, \
                            client_phone = $intake.client_phone, \
                            matter_description = $intake.matter_description, \
                            matter_type = $intake.matter_type, \
                            urgency_level = $intake.urgency_level, \
                            notes = $intake.notes, \
                            submitted_at_ms = $submitted_at_ms \
                         WHERE request_id = $request_id AND status IN $expected \
                         RETURN AFTER"
                    ),
                    json!({
                        "intake": {
                            "client_name": intake.client_name,
                            "client_email": intake.client_email,
                            "client_phone": intake.client_phone,
                            "matter_description": intake.matter_description,
                            "matter_type": intake.matter_type,
                            "urgency_level": intake
                                .urgency_level
                                .as_ref()
                                .map(UrgencyLevel::as_str),
                            "notes": intake.notes,
                        },
                        "submitted_at_ms": submitted_at_ms,
                    }),
                ),
                StatusWrite::Processed {
                    entity,
                    processed_by,
                    processed_at_ms,
                } => (
                    format!(
                        "UPDATE {TABLE} SET \
                            status = $to_status, \
                            processed_at_ms = $processed_at_ms, \
                            processed_by = $processed_by, \
                            created_entity_kind = $entity_kind, \
                            created_entity_id = $entity_id \
                         WHERE request_id = $request_id AND status IN $expected \
                         RETURN AFTER"
                    ),
                    json!({
                        "processed_at_ms": processed_at_ms,
                        "processed_by": processed_by,
                        "entity_kind": entity.kind.as_str(),
                        "entity_id": entity.entity_id,
                    }),
                ),
                StatusWrite::Declined {
                    reason,
                    processed_by,
                    processed_at_ms,
                } => (
                    format!(
                        "UPDATE {TABLE} SET \
                            status = $to_status, \
                            processed_at_ms = $processed_at_ms, \
                            processed_by = $processed_by, \
                            rejection_reason = $reason \
                         WHERE request_id = $request_id AND status IN $expected \
                         RETURN AFTER"
                    ),
                    json!({
                        "processed_at_ms": processed_at_ms,
                        "processed_by": processed_by,
                        "reason": reason,
                    }),
                ),
            };

            let mut builder = client
                .query(query)
                .bind(("request_id", request_id))
                .bind(("expected", expected))
                .bind(("to_status", write.target_status().as_str().to_string()));
            if let Value::Object(params) = params {
                for (key, value) in params {
                    builder = builder.bind((key, value));
                }
            }
            let mut response = builder.await.map_err(Self::map_surreal_error)?;
            let rows: Vec<Value> = response
                .take(0)
                .map_err(|err| DomainError::Storage(format!("invalid query result: {err}")))?;
            Ok(Self::decode_rows(rows)?.pop())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(request_id: &str, owner_id: &str, created_at_ms: i64) -> ProFormaRequest {
        ProFormaRequest {
            request_id: request_id.to_string(),
            token: format!("tok-{request_id}"),
            owner_id: owner_id.to_string(),
            requested_action: RequestedAction::CreateMatter,
            status: RequestStatus::Pending,
            intake: IntakeDetails::default(),
            intake_completeness: IntakeCompleteness::AwaitingClient,
            created_at_ms,
            submitted_at_ms: None,
            expires_at_ms: created_at_ms + 1_000,
            processed_at_ms: None,
            processed_by: None,
            created_entity: None,
            rejection_reason: None,
        }
    }

    #[tokio::test]
    async fn create_then_lookup_by_token_and_id() {
        let repo = InMemoryProFormaRequestRepository::new();
        repo.create(&request("pfr-1", "owner-a", 1_000))
            .await
            .expect("create");

        let by_token = repo.find_by_token("tok-pfr-1").await.expect("by token");
        assert_eq!(
            by_token.map(|found| found.request_id),
            Some("pfr-1".to_string())
        );
        let by_id = repo.find_by_id("pfr-1").await.expect("by id");
        assert_eq!(by_id.map(|found| found.token), Some("tok-pfr-1".to_string()));
    }

    #[tokio::test]
    async fn duplicate_token_insert_is_rejected() {
        let repo = InMemoryProFormaRequestRepository::new();
        repo.create(&request("pfr-1", "owner-a", 1_000))
            .await
            .expect("create");

        let mut duplicate = request("pfr-2", "owner-a", 2_000);
        duplicate.token = "tok-pfr-1".to_string();
        let err = repo.create(&duplicate).await.unwrap_err();
        assert!(matches!(err, DomainError::Storage(_)));
    }

    #[tokio::test]
    async fn compare_and_set_admits_exactly_one_writer() {
        let repo = InMemoryProFormaRequestRepository::new();
        repo.create(&request("pfr-1", "owner-a", 1_000))
            .await
            .expect("create");

        let write = StatusWrite::Submitted {
            intake: IntakeDetails {
                client_name: Some("Thandi Nkosi".to_string()),
                ..IntakeDetails::default()
            },
            submitted_at_ms: 2_000,
        };
        let first = repo
            .transition_status("pfr-1", &[RequestStatus::Pending], &write)
            .await
            .expect("first");
        assert!(first.is_some());

        let second = repo
            .transition_status("pfr-1", &[RequestStatus::Pending], &write)
            .await
            .expect("second");
        assert!(second.is_none());

        let stored = repo.find_by_id("pfr-1").await.expect("lookup").expect("row");
        assert_eq!(stored.status, RequestStatus::Submitted);
        assert_eq!(stored.submitted_at_ms, Some(2_000));
    }

    #[tokio::test]
    async fn transition_on_missing_request_reports_no_match() {
        let repo = InMemoryProFormaRequestRepository::new();
        let result = repo
            .transition_status(
                "pfr-missing",
                &[RequestStatus::Pending],
                &StatusWrite::Declined {
                    reason: "unknown".to_string(),
                    processed_by: "owner-a".to_string(),
                    processed_at_ms: 1_000,
                },
            )
            .await
            .expect("transition");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn open_worklist_is_scoped_and_newest_first() {
        let repo = InMemoryProFormaRequestRepository::new();
        repo.create(&request("pfr-1", "owner-a", 1_000))
            .await
            .expect("create");
        repo.create(&request("pfr-2", "owner-a", 3_000))
            .await
            .expect("create");
        repo.create(&request("pfr-3", "owner-b", 2_000))
            .await
            .expect("create");
        repo.transition_status(
            "pfr-2",
            &[RequestStatus::Pending],
            &StatusWrite::Declined {
                reason: "withdrawn".to_string(),
                processed_by: "owner-a".to_string(),
                processed_at_ms: 4_000,
            },
        )
        .await
        .expect("decline");
        repo.create(&request("pfr-4", "owner-a", 5_000))
            .await
            .expect("create");

        let open = repo.find_open_for_owner("owner-a").await.expect("list");
        let ids: Vec<_> = open.iter().map(|item| item.request_id.as_str()).collect();
        assert_eq!(ids, vec!["pfr-4", "pfr-1"]);
    }

    #[test]
    fn surreal_row_round_trips_through_decode() {
        let mut original = request("pfr-1", "owner-a", 1_000);
        original.status = RequestStatus::Processed;
        original.intake.urgency_level = Some(UrgencyLevel::Urgent);
        original.created_entity = Some(EntityRef {
            kind: EntityKind::Matter,
            entity_id: "matter-9".to_string(),
        });
        original.processed_by = Some("owner-a".to_string());
        original.processed_at_ms = Some(6_000);

        let payload = SurrealProFormaRequestRepository::build_payload(&original);
        let value = to_value(payload).expect("serialize");
        let decoded = SurrealProFormaRequestRepository::decode_row(value).expect("decode");
        assert_eq!(decoded, original);
    }

    #[test]
    fn decode_rejects_unknown_status() {
        let payload = SurrealProFormaRequestRepository::build_payload(&request(
            "pfr-1", "owner-a", 1_000,
        ));
        let mut value = to_value(payload).expect("serialize");
        value["status"] = Value::String("archived".to_string());
        let err = SurrealProFormaRequestRepository::decode_row(value).unwrap_err();
        assert!(matches!(err, DomainError::Storage(_)));
    }
}
