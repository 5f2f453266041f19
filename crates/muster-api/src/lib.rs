//! Read-only JSON API over the loaded rules dataset.
//!
//! Exposes an axum [`Router`] backed by any
//! [`muster_core::store::DatasetStore`].
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", muster_api::api_router(store.clone()))
//! ```

pub mod datasheets;
pub mod error;
pub mod factions;
pub mod meta;

use std::sync::Arc;

use axum::{Router, routing::get};
use muster_core::store::DatasetStore;

pub use error::ApiError;

/// Build the API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: DatasetStore + 'static,
{
  Router::new()
    .route("/health", get(meta::health))
    .route("/last-update", get(meta::last_update::<S>))
    .route("/factions", get(factions::list::<S>))
    .route("/datasheets/{id}", get(datasheets::get_one::<S>))
    .with_state(store)
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use chrono::{TimeZone as _, Utc};
  use muster_core::tables::{DATASHEETS, FACTIONS};
  use muster_store_sqlite::{SCHEMA, SqliteStore};
  use serde_json::Value;
  use tower::ServiceExt as _;

  async fn make_store() -> Arc<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store.apply_schema(SCHEMA).await.unwrap();
    let factions = muster_csv::parse("id|name|link|\nSM|Space Marines||\nAE|Aeldari||\n").unwrap();
    store.populate_table(&FACTIONS, factions).await.unwrap();
    let datasheets = muster_csv::parse("id|name|faction_id|virtual|\n100|Captain|SM|false|\n").unwrap();
    store.populate_table(&DATASHEETS, datasheets).await.unwrap();
    Arc::new(store)
  }

  async fn get_json(store: Arc<SqliteStore>, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = api_router(store).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  #[tokio::test]
  async fn health_is_ok() {
    let (status, body) = get_json(make_store().await, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
  }

  #[tokio::test]
  async fn factions_are_ordered_by_name() {
    let (status, body) = get_json(make_store().await, "/factions").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<_> = body.as_array().unwrap().iter().map(|f| f["id"].as_str().unwrap()).collect();
    assert_eq!(ids, ["AE", "SM"]);
  }

  #[tokio::test]
  async fn datasheet_is_wrapped() {
    let (status, body) = get_json(make_store().await, "/datasheets/100").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Captain");
    assert_eq!(body["data"]["virtual"], 0);
    assert!(body["message"].is_string());
  }

  #[tokio::test]
  async fn missing_datasheet_is_404() {
    for uri in ["/datasheets/999", "/datasheets/abc"] {
      let (status, body) = get_json(make_store().await, uri).await;
      assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
      assert!(body["error"].is_string());
    }
  }

  #[tokio::test]
  async fn last_update_is_404_until_recorded() {
    let store = make_store().await;
    let (status, _) = get_json(store.clone(), "/last-update").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    store
      .record_last_update(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
      .await
      .unwrap();
    let (status, body) = get_json(store, "/last-update").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["last_update"], "2024-05-01T00:00:00Z");
  }
}
