//! Handlers for `/factions`.

use std::sync::Arc;

use axum::{Json, extract::State};
use muster_core::{model::Faction, store::DatasetStore};

use crate::error::ApiError;

/// `GET /factions`: every faction, ordered by name.
pub async fn list<S>(State(store): State<Arc<S>>) -> Result<Json<Vec<Faction>>, ApiError>
where
  S: DatasetStore,
{
  let factions = store.list_factions().await.map_err(ApiError::store)?;
  Ok(Json(factions))
}
