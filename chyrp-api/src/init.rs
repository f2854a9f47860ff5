use chyrp_common::snowflake::{ProcessId, WorkerId};
use chyrp_db::{DbClient, DbError};
use serde::{Deserialize, de::DeserializeOwned};
use sqlx::postgres::PgPoolOptions;
use std::{net::IpAddr, path::PathBuf};
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
pub enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Worker id {0} is out of range")]
    WorkerId(u8),
    #[error("Process id {0} is out of range")]
    ProcessId(u8),
    #[error("Error connecting to the database: {0}")]
    DatabaseConnect(sqlx::Error),
    #[error("Error migrating the database: {0}")]
    Migrate(DbError),
    #[error("Error seeding categories: {0}")]
    Seed(DbError),
    #[error("Error preparing the upload directory: {0}")]
    UploadDir(std::io::Error),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct ServerEnv {
    pub server_address: IpAddr,
    pub server_port: u16,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_media_url")]
    pub media_url: String,
    /// `0` disables expiry.
    #[serde(default = "default_session_lifetime_seconds")]
    pub session_lifetime_seconds: u64,
    #[serde(default)]
    pub secure_cookies: bool,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct DatabaseEnv {
    pub database_url: String,
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,
    #[serde(default)]
    pub worker_id: u8,
    #[serde(default)]
    pub process_id: u8,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_media_url() -> String {
    "/media/".to_owned()
}

fn default_session_lifetime_seconds() -> u64 {
    60 * 60 * 24 * 14
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_database_max_connections() -> u32 {
    10
}

pub fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "chyrp_api=debug,\
                chyrp_db=debug,\
                chyrp_common=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=warn"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub fn get_env<T: DeserializeOwned>() -> Result<T, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

/// Connects to the database and brings its schema up to date.
pub async fn connect_database(env: &DatabaseEnv) -> Result<DbClient, InitError> {
    let worker_id = WorkerId::new(env.worker_id).ok_or(InitError::WorkerId(env.worker_id))?;
    let process_id =
        ProcessId::new(env.process_id).ok_or(InitError::ProcessId(env.process_id))?;

    let pool = PgPoolOptions::new()
        .max_connections(env.database_max_connections)
        .connect(&env.database_url)
        .await
        .map_err(InitError::DatabaseConnect)?;

    let db_client = DbClient::new(pool, worker_id, process_id);
    db_client.migrate().await.map_err(InitError::Migrate)?;

    Ok(db_client)
}
