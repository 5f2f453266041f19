//! Handlers for `/datasheets`.
//!
//! The row is returned as stored. Assembling models, wargear and keywords
//! into one nested document is not done here.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use muster_core::{model::Row, store::DatasetStore, tables::Table};
use serde::Serialize;

use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct DatasheetResponse {
  pub message: &'static str,
  pub data:    Row,
}

/// `GET /datasheets/{id}`; 404 if not found.
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<Json<DatasheetResponse>, ApiError>
where
  S: DatasetStore,
{
  let row = store
    .get_by_id(Table::Datasheets, &id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("datasheet {id} not found")))?;
  Ok(Json(DatasheetResponse { message: "datasheet found", data: row }))
}
