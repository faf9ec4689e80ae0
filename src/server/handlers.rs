//! HTTP API handlers

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::lsl::info::StreamInfo;
use crate::relay::StreamDiscovery;
use crate::server::AppState;

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Liveness report
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub uptime_seconds: u64,
    pub stream_count: usize,
}

/// One advertised stream as listed over HTTP
#[derive(Debug, Serialize)]
pub struct StreamSummary {
    pub name: String,
    pub stream_type: String,
    pub source_id: String,
    pub sample_rate: f64,
    pub channels: Vec<String>,
}

impl From<StreamInfo> for StreamSummary {
    fn from(info: StreamInfo) -> Self {
        Self {
            name: info.name,
            stream_type: info.stream_type,
            source_id: info.source_id,
            sample_rate: info.sample_rate,
            channels: info.channel_names,
        }
    }
}

pub async fn health<D: StreamDiscovery>(
    State(state): State<Arc<AppState<D>>>,
) -> Json<ApiResponse<HealthStatus>> {
    Json(ApiResponse::ok(HealthStatus {
        status: "ok",
        uptime_seconds: state.started.elapsed().as_secs(),
        stream_count: state.relay.discovery().resolve_streams().len(),
    }))
}

pub async fn list_streams<D: StreamDiscovery>(
    State(state): State<Arc<AppState<D>>>,
) -> Json<ApiResponse<Vec<StreamSummary>>> {
    let streams = state
        .relay
        .discovery()
        .resolve_streams()
        .into_iter()
        .map(StreamSummary::from)
        .collect();
    Json(ApiResponse::ok(streams))
}
