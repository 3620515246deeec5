use std::collections::BTreeMap;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;

use crate::admin::AdminState;
use crate::snapshot::ResourceKind;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub node_id: Option<String>,
    pub snapshot_version: Option<String>,
    pub published_at: Option<u64>,
    pub sources: usize,
    pub resources: BTreeMap<ResourceKind, usize>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let status = match state.snapshots.load() {
        Some(snapshot) => SystemStatus {
            version: env!("CARGO_PKG_VERSION"),
            status: "serving",
            node_id: Some(snapshot.node_id.clone()),
            snapshot_version: Some(snapshot.version.clone()),
            published_at: Some(snapshot.published_at),
            sources: snapshot.sources.len(),
            resources: snapshot.resource_counts(),
        },
        None => SystemStatus {
            version: env!("CARGO_PKG_VERSION"),
            status: "waiting",
            node_id: None,
            snapshot_version: None,
            published_at: None,
            sources: 0,
            resources: BTreeMap::new(),
        },
    };
    Json(status)
}

/// The full snapshot currently served.
pub async fn get_snapshot(State(state): State<AdminState>) -> Result<Json<Value>, StatusCode> {
    let snapshot = state.snapshots.load().ok_or(StatusCode::NOT_FOUND)?;
    serde_json::to_value(snapshot.as_ref())
        .map(Json)
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to serialize snapshot");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

/// The merged configuration behind the current snapshot.
pub async fn get_config(State(state): State<AdminState>) -> Result<Json<Value>, StatusCode> {
    let snapshot = state.snapshots.load().ok_or(StatusCode::NOT_FOUND)?;
    serde_json::to_value(&snapshot.config)
        .map(Json)
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to serialize config");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}
