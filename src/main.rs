use clap::Parser;
use lpassistd::catalog::Catalog;
use lpassistd::config::CliConfig;
use lpassistd::{ipc, logging};
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cfg = CliConfig::parse();
    logging::init_logger(cfg.verbose);

    if let Err(msg) = cfg.validate() {
        tracing::error!("{msg}");
        return ExitCode::FAILURE;
    }

    let catalog = match cfg.catalog.as_deref() {
        Some(path) => Catalog::load(path),
        None => Catalog::builtin(),
    };
    let catalog = match catalog {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        fingerprint = catalog.fingerprint(),
        diagnoses = catalog.diagnoses.len(),
        barriers = catalog.barriers.len(),
        "catalog loaded"
    );
    for issue in catalog.validate() {
        tracing::warn!("catalog: {issue}");
    }

    let mut state = ipc::AppState::new(catalog);
    if let Some(ws) = cfg.workspace.as_deref() {
        if let Err(e) = state.select_workspace(ws) {
            tracing::error!("cannot open workspace: {e:#}");
            return ExitCode::FAILURE;
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{resp}");
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    ExitCode::SUCCESS
}
