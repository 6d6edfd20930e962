use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use thiserror::Error;

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("db unavailable: {0}")]
    Unavailable(String),
    #[error("db operation failed: {0}")]
    Operation(String),
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub endpoint: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl DbConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            endpoint: config.surreal_endpoint.clone(),
            namespace: config.surreal_ns.clone(),
            database: config.surreal_db.clone(),
            username: config.surreal_user.clone(),
            password: config.surreal_pass.clone(),
        }
    }
}

pub async fn connect(config: &DbConfig) -> Result<Surreal<Client>, DbError> {
    let endpoint = config
        .endpoint
        .trim_start_matches("ws://")
        .trim_start_matches("wss://")
        .to_string();
    let client = Surreal::new::<Ws>(endpoint)
        .await
        .map_err(|err| DbError::Unavailable(format!("surreal connect failed: {err}")))?;
    client
        .signin(Root {
            username: &config.username,
            password: &config.password,
        })
        .await
        .map_err(|err| DbError::Unavailable(format!("surreal signin failed: {err}")))?;
    client
        .use_ns(&config.namespace)
        .use_db(&config.database)
        .await
        .map_err(|err| DbError::Unavailable(format!("surreal ns/db selection failed: {err}")))?;

    tracing::debug!(
        namespace = config.namespace,
        database = config.database,
        "surreal connection established"
    );
    Ok(client)
}
