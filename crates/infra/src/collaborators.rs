use std::time::Duration;

use lexohub_domain::ports::BoxFuture;
use lexohub_domain::ports::collaborators::{
    CollaboratorError, InvoiceGeneration, MatterCreation, MatterLike, MatterPrefill, OwnerContact,
    OwnerDirectory,
};
use lexohub_domain::pro_forma::{EntityKind, EntityRef};
use serde_json::{Value, json};

use crate::config::AppConfig;

/// HTTP client for the matter-creation, invoice-generation and
/// owner-directory endpoints of the main application. One bounded request
/// per call, no retry: resolution is user-initiated and the caller decides
/// whether to try again.
#[derive(Clone)]
pub struct HttpCollaboratorClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpCollaboratorClient {
    pub fn from_app_config(config: &AppConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.collaborator_timeout_ms))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: config.collaborator_base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post_for_entity(
        &self,
        path: &str,
        body: Value,
        id_field: &str,
        kind: EntityKind,
    ) -> Result<EntityRef, CollaboratorError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| CollaboratorError::Unavailable(err.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(CollaboratorError::Unavailable(format!(
                "{path} answered {status}"
            )));
        }
        if !status.is_success() {
            return Err(CollaboratorError::Rejected(format!(
                "{path} answered {status}"
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|err| CollaboratorError::Rejected(format!("invalid response body: {err}")))?;
        let entity_id = payload
            .get(id_field)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                CollaboratorError::Rejected(format!("response is missing '{id_field}'"))
            })?;
        Ok(EntityRef {
            kind,
            entity_id: entity_id.to_string(),
        })
    }
}

impl MatterCreation for HttpCollaboratorClient {
    fn create_matter(
        &self,
        prefill: &MatterPrefill,
    ) -> BoxFuture<'_, Result<EntityRef, CollaboratorError>> {
        let body = json!(prefill);
        Box::pin(async move {
            self.post_for_entity("/matters", body, "matter_id", EntityKind::Matter)
                .await
        })
    }
}

impl InvoiceGeneration for HttpCollaboratorClient {
    fn create_invoice(
        &self,
        carrier: &MatterLike,
        default_to_pro_forma: bool,
    ) -> BoxFuture<'_, Result<EntityRef, CollaboratorError>> {
        let body = json!({
            "matter": carrier,
            "default_to_pro_forma": default_to_pro_forma,
        });
        Box::pin(async move {
            self.post_for_entity("/invoices", body, "invoice_id", EntityKind::Invoice)
                .await
        })
    }
}

impl OwnerDirectory for HttpCollaboratorClient {
    fn owner_contact(
        &self,
        owner_id: &str,
    ) -> BoxFuture<'_, Result<Option<OwnerContact>, CollaboratorError>> {
        let url = format!("{}/practitioners/{owner_id}/contact", self.base_url);
        Box::pin(async move {
            let response = self
                .http
                .get(&url)
                .send()
                .await
                .map_err(|err| CollaboratorError::Unavailable(err.to_string()))?;

            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !response.status().is_success() {
                return Err(CollaboratorError::Unavailable(format!(
                    "practitioner directory answered {}",
                    response.status()
                )));
            }
            let contact: OwnerContact = response.json().await.map_err(|err| {
                CollaboratorError::Rejected(format!("invalid response body: {err}"))
            })?;
            Ok(Some(contact))
        })
    }
}
