//! tally-engine
//!
//! Boots one engine generation from a YAML config: persistent storage
//! recovery, region initialization, then prints the counter collection and
//! performs the shutdown write.

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use tally_engine::{config, Engine, ProcessState};

fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "tally.yaml".into());

    let cfg = match config::load_from_file(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(path = %path, code = e.class().as_str(), "{e}");
            return ExitCode::FAILURE;
        }
    };

    let process = Arc::new(ProcessState::new());
    let engine = match Engine::new(cfg, process) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!(code = e.class().as_str(), "{e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(config = %path, "tally-engine started");
    println!("{}", engine.collection());

    if let Err(e) = engine.flush() {
        tracing::error!(code = e.class().as_str(), "{e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
