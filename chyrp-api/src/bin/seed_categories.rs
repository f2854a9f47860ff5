//! Makes sure the default categories exist. Safe to run any number of times.

use chyrp_api::init::{DatabaseEnv, InitError, connect_database, get_env, install_tracing};
use chyrp_common::model::{
    ModelValidationError,
    category::{CategoryName, DEFAULT_CATEGORIES},
};
use chyrp_db::DbError;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let database_env: DatabaseEnv = get_env()?;
    let db_client = connect_database(&database_env).await?;

    let names = DEFAULT_CATEGORIES
        .iter()
        .map(|name| CategoryName::new((*name).to_owned()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| InitError::Seed(DbError::Data(ModelValidationError::from(err))))?;

    let report = db_client
        .seed_categories(&names)
        .await
        .map_err(InitError::Seed)?;

    for name in &report.created {
        info!(name = name.get(), "Created category");
    }
    for name in &report.existing {
        warn!(name = name.get(), "Category already exists");
    }
    info!(
        created = report.created.len(),
        existing = report.existing.len(),
        "Seeding finished"
    );

    Ok(())
}
