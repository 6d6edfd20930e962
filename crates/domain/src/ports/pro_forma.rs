use crate::DomainResult;
use crate::ports::BoxFuture;
use crate::pro_forma::{EntityRef, IntakeDetails, ProFormaRequest, RequestStatus};

/// Terminal payload of a status transition. The variant fixes the target
/// status, so a write can never carry fields that do not belong to its edge.
#[derive(Clone, Debug, PartialEq)]
pub enum StatusWrite {
    Submitted {
        intake: IntakeDetails,
        submitted_at_ms: i64,
    },
    Processed {
        entity: EntityRef,
        processed_by: String,
        processed_at_ms: i64,
    },
    Declined {
        reason: String,
        processed_by: String,
        processed_at_ms: i64,
    },
}

impl StatusWrite {
    pub fn target_status(&self) -> RequestStatus {
        match self {
            Self::Submitted { .. } => RequestStatus::Submitted,
            Self::Processed { .. } => RequestStatus::Processed,
            Self::Declined { .. } => RequestStatus::Declined,
        }
    }

    /// Field semantics of each edge. Store implementations apply this after
    /// their precondition check so every backend writes the same shape.
    pub fn apply_to(&self, request: &mut ProFormaRequest) {
        request.status = self.target_status();
        match self {
            Self::Submitted {
                intake,
                submitted_at_ms,
            } => {
                request.intake = intake.clone();
                request.submitted_at_ms = Some(*submitted_at_ms);
            }
            Self::Processed {
                entity,
                processed_by,
                processed_at_ms,
            } => {
                request.created_entity = Some(entity.clone());
                request.processed_by = Some(processed_by.clone());
                request.processed_at_ms = Some(*processed_at_ms);
            }
            Self::Declined {
                reason,
                processed_by,
                processed_at_ms,
            } => {
                request.rejection_reason = Some(reason.clone());
                request.processed_by = Some(processed_by.clone());
                request.processed_at_ms = Some(*processed_at_ms);
            }
        }
    }
}

#[allow(clippy::needless_pass_by_value)]
pub trait ProFormaRequestRepository: Send + Sync {
    /// Inserts a new request. Token uniqueness is enforced here; a duplicate
    /// token or request id fails with a storage error.
    fn create(&self, request: &ProFormaRequest) -> BoxFuture<'_, DomainResult<ProFormaRequest>>;

    fn find_by_token(&self, token: &str)
    -> BoxFuture<'_, DomainResult<Option<ProFormaRequest>>>;

    fn find_by_id(
        &self,
        request_id: &str,
    ) -> BoxFuture<'_, DomainResult<Option<ProFormaRequest>>>;

    /// Stored status in {pending, submitted}, scoped to `owner_id`,
    /// newest first.
    fn find_open_for_owner(
        &self,
        owner_id: &str,
    ) -> BoxFuture<'_, DomainResult<Vec<ProFormaRequest>>>;

    /// Single compare-and-set: applies `write` only while the stored status
    /// is one of `expected`. Returns the updated row, or `None` when the
    /// precondition no longer holds. This is the only concurrency guard in
    /// the subsystem; implementations must not split it into a read followed
    /// by a write.
    fn transition_status(
        &self,
        request_id: &str,
        expected: &[RequestStatus],
        write: &StatusWrite,
    ) -> BoxFuture<'_, DomainResult<Option<ProFormaRequest>>>;
}
