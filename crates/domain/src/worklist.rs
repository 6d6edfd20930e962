use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::ports::pro_forma::ProFormaRequestRepository;
use crate::pro_forma::{ProFormaRequest, RequestStatus};
use crate::util::now_ms;

/// Open request plus its read-time status. Requests past the horizon stay
/// visible to their owner (annotated `expired`), unlike on the public path.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorklistEntry {
    pub request: ProFormaRequest,
    pub effective_status: RequestStatus,
}

#[derive(Clone)]
pub struct WorklistService {
    repository: Arc<dyn ProFormaRequestRepository>,
}

impl WorklistService {
    pub fn new(repository: Arc<dyn ProFormaRequestRepository>) -> Self {
        Self { repository }
    }

    /// Open means stored status in {pending, submitted}. Scoping to the
    /// calling owner is mandatory; cross-owner visibility is a security
    /// defect.
    pub async fn list_open(&self, owner_id: &str) -> DomainResult<Vec<WorklistEntry>> {
        let requests = self.repository.find_open_for_owner(owner_id).await?;
        let now = now_ms();
        Ok(requests
            .into_iter()
            .map(|request| WorklistEntry {
                effective_status: request.effective_status(now),
                request,
            })
            .collect())
    }
}
