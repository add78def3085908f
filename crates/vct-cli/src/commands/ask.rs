use anyhow::Result;
use serde_json::json;
use std::path::Path;
use std::process::ExitCode;
use std::sync::mpsc;
use vct_errors::{FAILURE_MESSAGE, GatewayError};
use vct_session::{RequestController, SessionEvent};

use crate::Cli;
use crate::context::{build_gateway, build_observer, load_config};
use crate::output::{print_json, render_team};

/// One submission through the same controller the TUI uses.
pub(crate) fn run_ask(cwd: &Path, cli: &Cli, prompt: &str) -> Result<ExitCode> {
    let cfg = load_config(cwd, cli)?;
    let gateway = build_gateway(&cfg, cli)?;
    let observer = build_observer(cwd, cli)?;
    let (tx, rx) = mpsc::channel();
    let controller = RequestController::new(gateway)
        .with_observer(observer.clone())
        .with_events(tx);
    observer.verbose_log(&format!("gateway: {}", controller.gateway_label()));

    let Some(worker) = controller.submit(prompt) else {
        return Err(GatewayError::EmptyPrompt
            .to_enhanced(&cfg.gateway.resolved_endpoint())
            .into_error());
    };
    // A panicked worker has already settled through its guard.
    let _ = worker.join();

    let error = rx.try_iter().find_map(|event| match event {
        SessionEvent::Settled { error, .. } => Some(error),
        SessionEvent::Started { .. } => None,
    });
    let error = error.flatten();
    let snapshot = controller.snapshot();

    if cli.json {
        print_json(&json!({
            "prompt": prompt,
            "success": error.is_none(),
            "turns": snapshot.turns,
            "result": snapshot.result.as_deref(),
            "view": snapshot.view,
            "error": error.as_ref().map(|err| json!({
                "kind": err.kind(),
                "detail": err.to_string(),
            })),
            "session_id": observer.session_id(),
        }))?;
    } else if let Some(result) = snapshot.result.as_deref() {
        print!("{}", render_team(result));
    } else {
        println!("{FAILURE_MESSAGE}");
    }

    match error {
        None => Ok(ExitCode::SUCCESS),
        Some(err) => {
            if !cli.json {
                let report = err.to_enhanced(&cfg.gateway.resolved_endpoint());
                eprintln!("{}", report.format(cli.verbose));
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
