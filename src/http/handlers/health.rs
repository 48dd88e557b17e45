//! Liveness report with basic process statistics.
//!
//! Memory and CPU figures come from `/proc/self`; on platforms without procfs
//! they are reported as zero.

use std::fs;

use axum::extract::State;
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;

use crate::http::server::AppState;

/// Assumed page size for `statm`.
const PAGE_SIZE: u64 = 4096;
/// Assumed `CLK_TCK` for `stat`.
const CLOCK_TICKS_PER_SEC: u64 = 100;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub uptime: f64,
    pub timestamp: String,
    pub memory: MemoryUsage,
    pub cpu: CpuUsage,
    pub service: String,
    pub version: &'static str,
}

#[derive(Debug, Default, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    pub rss_bytes: u64,
    pub virtual_bytes: u64,
}

#[derive(Debug, Default, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CpuUsage {
    pub user_micros: u64,
    pub system_micros: u64,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let report = HealthReport {
        status: "healthy",
        uptime: state.started.elapsed().as_secs_f64(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        memory: fs::read_to_string("/proc/self/statm")
            .ok()
            .and_then(|s| parse_statm(&s))
            .unwrap_or_default(),
        cpu: fs::read_to_string("/proc/self/stat")
            .ok()
            .and_then(|s| parse_stat(&s))
            .unwrap_or_default(),
        service: state.service_name.to_string(),
        version: env!("CARGO_PKG_VERSION"),
    };

    state.events.debug(
        "HEALTH_CHECK",
        "Health check performed",
        json!({ "uptime": report.uptime, "memory": report.memory }),
    );

    Json(report)
}

fn parse_statm(statm: &str) -> Option<MemoryUsage> {
    let mut fields = statm.split_whitespace();
    let size: u64 = fields.next()?.parse().ok()?;
    let resident: u64 = fields.next()?.parse().ok()?;
    Some(MemoryUsage {
        rss_bytes: resident * PAGE_SIZE,
        virtual_bytes: size * PAGE_SIZE,
    })
}

fn parse_stat(stat: &str) -> Option<CpuUsage> {
    // The command name may contain spaces; fields resume after the last ')'.
    let (_, rest) = stat.rsplit_once(')')?;
    let fields: Vec<&str> = rest.split_whitespace().collect();
    let utime: u64 = fields.get(11)?.parse().ok()?;
    let stime: u64 = fields.get(12)?.parse().ok()?;
    let micros = |ticks: u64| ticks * 1_000_000 / CLOCK_TICKS_PER_SEC;
    Some(CpuUsage {
        user_micros: micros(utime),
        system_micros: micros(stime),
    })
}
