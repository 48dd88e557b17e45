//! Synthetic workloads that produce interesting spans and timings.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use axum::extract::{Path, State};
use axum::Json;
use futures_util::future::join_all;
use serde_json::{json, Value};
use tracing::Instrument;

use crate::http::handlers::invalid;
use crate::http::response::{ApiError, Fault};
use crate::http::server::AppState;
use crate::observability::RequestContext;

const CPU_ITERATIONS: u64 = 1_000_000;
const MEMORY_ITEMS: usize = 100_000;
const ASYNC_OPERATIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    CpuIntensive,
    MemoryIntensive,
    AsyncOperations,
}

impl Scenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::CpuIntensive => "cpu-intensive",
            Scenario::MemoryIntensive => "memory-intensive",
            Scenario::AsyncOperations => "async-operations",
        }
    }

    async fn run(self) -> Result<Value, ApiError> {
        match self {
            Scenario::CpuIntensive => {
                let span = tracing::Span::current();
                let sum = tokio::task::spawn_blocking(move || span.in_scope(|| cpu_work(CPU_ITERATIONS)))
                    .await
                    .map_err(|e| ApiError::Internal(Fault::capture(e.to_string())))?;
                Ok(json!({ "iterations": CPU_ITERATIONS, "result": sum }))
            }
            Scenario::MemoryIntensive => {
                let span = tracing::Span::current();
                let (items, bytes) = tokio::task::spawn_blocking(move || span.in_scope(|| memory_work(MEMORY_ITEMS)))
                    .await
                    .map_err(|e| ApiError::Internal(Fault::capture(e.to_string())))?;
                Ok(json!({ "items": items, "approxBytes": bytes }))
            }
            Scenario::AsyncOperations => {
                let delays: Vec<u64> = join_all((0..ASYNC_OPERATIONS).map(|index| {
                    let delay = fastrand::u64(10..=100);
                    async move {
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        delay
                    }
                    .instrument(tracing::info_span!("performance.async_operation", index, delay_ms = delay))
                }))
                .await;
                Ok(json!({
                    "operations": delays.len(),
                    "delaysMs": delays,
                    "maxDelayMs": delays.iter().max(),
                }))
            }
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu-intensive" => Ok(Scenario::CpuIntensive),
            "memory-intensive" => Ok(Scenario::MemoryIntensive),
            "async-operations" => Ok(Scenario::AsyncOperations),
            other => Err(format!("Unknown scenario: {other}")),
        }
    }
}

fn cpu_work(iterations: u64) -> f64 {
    (0..iterations).map(|i| (i as f64).sqrt()).sum()
}

const CHUNK_BYTES: usize = 64;

fn memory_work(count: usize) -> (usize, usize) {
    let chunks: Vec<Vec<u8>> = (0..count).map(|i| vec![(i % 256) as u8; CHUNK_BYTES]).collect();
    let bytes = chunks.iter().map(Vec::len).sum();
    (chunks.len(), bytes)
}

pub async fn performance_test(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let scenario: Scenario = name
        .parse()
        .map_err(|message| invalid(&state.events, &format!("/performance-test/{name}"), message))?;

    state.events.info(
        "PERFORMANCE_TEST_STARTED",
        format!("Performance test {scenario} started"),
        json!({ "scenario": scenario.as_str() }),
    );

    let started = Instant::now();
    let span = tracing::info_span!("performance.scenario", scenario = scenario.as_str());
    let result = scenario.run().instrument(span.clone()).await?;
    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

    span.in_scope(|| {
        state.events.info(
            "PERFORMANCE_TEST_COMPLETED",
            format!("Performance test {scenario} completed"),
            json!({ "scenario": scenario.as_str(), "durationMs": duration_ms }),
        )
    });

    Ok(Json(json!({
        "scenario": scenario.as_str(),
        "result": result,
        "durationMs": duration_ms,
        "requestId": ctx.correlation_id(),
    })))
}
