//! Handlers for service metadata: liveness and dataset freshness.

use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use muster_core::store::DatasetStore;
use serde::Serialize;

use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct Health {
  pub status:    &'static str,
  pub timestamp: DateTime<Utc>,
}

/// `GET /health`
pub async fn health() -> Json<Health> { Json(Health { status: "ok", timestamp: Utc::now() }) }

#[derive(Debug, Serialize)]
pub struct LastUpdate {
  pub last_update: DateTime<Utc>,
}

/// `GET /last-update` returns 404 until a population has recorded a marker.
pub async fn last_update<S>(State(store): State<Arc<S>>) -> Result<Json<LastUpdate>, ApiError>
where
  S: DatasetStore,
{
  store
    .last_update()
    .await
    .map_err(ApiError::store)?
    .map(|last_update| Json(LastUpdate { last_update }))
    .ok_or_else(|| ApiError::NotFound("no dataset has been loaded".to_owned()))
}
