mod assign;
mod config;
mod context;
mod db;
mod error;
mod ipc;
mod model;
mod projects;
mod propagate;
mod records;
mod reports;
mod sessions;
mod students;
mod validate;

use std::io::{self, BufRead, Write};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    let cfg = config::Config::parse();

    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&cfg.log))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let mut state = ipc::AppState::new(cfg.coordinator_roles.clone());
    if let Some(path) = &cfg.workspace {
        let conn = db::open_db(path)
            .with_context(|| format!("failed to open workspace {}", path.display()))?;
        tracing::info!(workspace = %path.display(), "workspace opened");
        state.workspace = Some(path.clone());
        state.db = Some(conn);
    }
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        coordinator_roles = ?cfg.coordinator_roles,
        "outreachd ready"
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                tracing::debug!(error = %e, "unparseable request line");
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() },
                });
                writeln!(stdout, "{}", resp)?;
                stdout.flush()?;
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        writeln!(stdout, "{}", resp)?;
        stdout.flush()?;
    }
    Ok(())
}
