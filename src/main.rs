//! tracelog-demo
//!
//! A small CRUD API whose requests are traced end to end.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ lifecycle middleware ──▶ handlers ──▶ store
//!                          │  (request ID,        │
//!                          │   span, events)      │ domain events
//!                          ▼                      ▼
//!                     ┌──────────────────────────────────┐
//!                     │           EventEmitter           │
//!                     │  timestamp · requestId · trace   │
//!                     └───────┬──────────────────┬───────┘
//!                             ▼                  ▼
//!                       console (stdout)    HTTP log sink
//!
//!     tracing spans ──▶ OpenTelemetry ──▶ OTLP (optional)
//! ```

use std::path::PathBuf;

use clap::Parser;

use tracelog_demo::config::load_config;
use tracelog_demo::lifecycle;

#[derive(Parser, Debug)]
#[command(name = "tracelog-demo", version, about = "Demo API with correlated structured events")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    lifecycle::run(config).await?;
    Ok(())
}
