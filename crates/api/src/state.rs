use std::sync::Arc;

use lexohub_domain::dispatch::DispatchService;
use lexohub_domain::intake::IntakeService;
use lexohub_domain::issuance::{IssuancePolicy, IssuanceService};
use lexohub_domain::ports::collaborators::{InvoiceGeneration, MatterCreation, OwnerDirectory};
use lexohub_domain::ports::pro_forma::ProFormaRequestRepository;
use lexohub_domain::worklist::WorklistService;
use lexohub_infra::collaborators::HttpCollaboratorClient;
use lexohub_infra::config::AppConfig;
use lexohub_infra::db::{self, DbConfig};
use lexohub_infra::repositories::{
    InMemoryProFormaRequestRepository, SurrealProFormaRequestRepository,
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub issuance: IssuanceService,
    pub intake: IntakeService,
    pub worklist: WorklistService,
    pub dispatch: DispatchService,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let repository: Arc<dyn ProFormaRequestRepository> =
            if config.data_backend.eq_ignore_ascii_case("surreal") {
                let client = db::connect(&DbConfig::from_app_config(&config)).await?;
                Arc::new(SurrealProFormaRequestRepository::with_client(client))
            } else {
                Arc::new(InMemoryProFormaRequestRepository::new())
            };
        let collaborators = Arc::new(HttpCollaboratorClient::from_app_config(&config));
        Ok(Self::with_components(
            config,
            repository,
            collaborators.clone(),
            collaborators.clone(),
            collaborators,
        ))
    }

    pub fn with_components(
        config: AppConfig,
        repository: Arc<dyn ProFormaRequestRepository>,
        matters: Arc<dyn MatterCreation>,
        invoices: Arc<dyn InvoiceGeneration>,
        directory: Arc<dyn OwnerDirectory>,
    ) -> Self {
        let policy = IssuancePolicy::new(config.public_base_url.clone(), config.request_expiry_days);
        Self {
            issuance: IssuanceService::new(repository.clone(), policy),
            intake: IntakeService::new(repository.clone(), directory),
            worklist: WorklistService::new(repository.clone()),
            dispatch: DispatchService::new(repository, matters, invoices),
            config,
        }
    }
}
