use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ports::BoxFuture;
use crate::pro_forma::{EntityRef, UrgencyLevel};

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
    #[error("collaborator rejected the request: {0}")]
    Rejected(String),
}

/// Prefill handed to the matter-creation form, mapped from the request's
/// intake fields.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MatterPrefill {
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub title: String,
    pub matter_type: Option<String>,
    pub urgency_level: Option<UrgencyLevel>,
    pub notes: Option<String>,
    /// Reference to the instructing request, for the audit trail on the
    /// created matter.
    pub instructing_ref: String,
}

/// Matter-shaped carrier for invoice generation. `matter_id` is `None` when
/// no persisted matter exists; the invoice collaborator's contract does not
/// require one.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MatterLike {
    pub matter_id: Option<String>,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub description: String,
    pub matter_type: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct OwnerContact {
    pub name: String,
    pub email: String,
}

pub trait MatterCreation: Send + Sync {
    fn create_matter(
        &self,
        prefill: &MatterPrefill,
    ) -> BoxFuture<'_, Result<EntityRef, CollaboratorError>>;
}

pub trait InvoiceGeneration: Send + Sync {
    fn create_invoice(
        &self,
        carrier: &MatterLike,
        default_to_pro_forma: bool,
    ) -> BoxFuture<'_, Result<EntityRef, CollaboratorError>>;
}

/// Cosmetic enrichment of terminal public views; never authoritative.
pub trait OwnerDirectory: Send + Sync {
    fn owner_contact(
        &self,
        owner_id: &str,
    ) -> BoxFuture<'_, Result<Option<OwnerContact>, CollaboratorError>>;
}
