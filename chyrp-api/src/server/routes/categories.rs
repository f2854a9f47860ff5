use crate::server::{Result, ServerError, ServerRouter, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use chyrp_common::model::category::Category;
use chyrp_db::DbClient;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(list_categories)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/categories/", rejection(ServerError))]
struct CategoriesPath();

async fn list_categories(
    CategoriesPath(): CategoriesPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Vec<Category>>> {
    let categories = db.fetch_categories().await?;

    Ok(Json(categories))
}
