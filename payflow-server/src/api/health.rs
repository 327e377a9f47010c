//! `GET /health`: liveness plus a host resource summary.

use axum::{Json, extract::State};
use serde::Serialize;
use time::OffsetDateTime;

use crate::resources::{CpuUsage, DiskUsage, MemoryUsage, ResourceSnapshot};
use crate::state::AppState;

/// CPU or memory usage above this percentage turns the status to `warning`.
pub const WARNING_THRESHOLD: f64 = 95.0;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub telemetry: Telemetry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Telemetry {
    pub uptime_seconds: u64,
    pub cpu: CpuUsage,
    pub memory: MemoryUsage,
    pub disk: DiskUsage,
}

fn assess(resources: &ResourceSnapshot) -> (&'static str, Option<String>) {
    let mut alerts = Vec::new();
    if resources.cpu.percent > WARNING_THRESHOLD {
        alerts.push(format!("CPU usage at {:.1}%", resources.cpu.percent));
    }
    if resources.memory.percent > WARNING_THRESHOLD {
        alerts.push(format!("memory usage at {:.1}%", resources.memory.percent));
    }
    if alerts.is_empty() {
        ("ok", None)
    } else {
        ("warning", Some(alerts.join(", ")))
    }
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let resources = *state.resources.borrow();
    let (status, message) = assess(&resources);
    if let Some(message) = &message {
        tracing::warn!(%message, "Host resources under pressure");
    }

    Json(HealthResponse {
        status,
        timestamp: OffsetDateTime::now_utc(),
        telemetry: Telemetry {
            uptime_seconds: state.started_at.elapsed().as_secs(),
            cpu: resources.cpu,
            memory: resources.memory,
            disk: resources.disk,
        },
        message,
    })
}
