// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use std::env;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use the_dfe_client::backends::simulated::{SimulatedConfig, SimulatedEngine};
use the_dfe_client::backends::tcp::EngineServer;
use the_dfe_client::config::consts::{DEFAULT_ADDRESS, LOG_ENV};
use the_dfe_client::config::{load_and_validate_config, RuntimeBuilder};
use the_dfe_client::session::ActionMode;
use the_dfe_client::traits::RpcChannel;
use the_dfe_client::workloads::{run_session, SessionReport, SessionRequest, WorkloadKind};

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn usage(program: &str) {
    eprintln!("Usage: {} <config.yaml|config.toml> [more configs ...]", program);
    eprintln!("       {} --demo", program);
    eprintln!("       {} --serve [address]", program);
    eprintln!("Example: {} sessions.yaml", program);
    eprintln!("Serve:   {} --serve {}", program, DEFAULT_ADDRESS);
    eprintln!("Log filter is read from {} (default: info)", LOG_ENV);
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("dfe-client");

    let all_passed = match args.get(1).map(String::as_str) {
        None | Some("-h") | Some("--help") => {
            usage(program);
            std::process::exit(1);
        }
        Some("--serve") => {
            let address = args.get(2).map(String::as_str).unwrap_or(DEFAULT_ADDRESS);
            serve(address).await?;
            true
        }
        Some("--demo") => run_demo().await,
        Some(_) => run_configs(&args[1..]).await?,
    };

    if !all_passed {
        std::process::exit(1);
    }
    Ok(())
}

/// Hosts the simulated engine over TCP until Ctrl-C.
async fn serve(address: &str) -> Result<()> {
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    let engine = Arc::new(SimulatedEngine::new(SimulatedConfig::default()));
    let server = EngineServer::new(engine);

    let shutdown = server.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    server.serve(listener).await?;
    Ok(())
}

/// Runs every workload in both action modes against an in-process engine.
async fn run_demo() -> bool {
    println!("DFE Client Demo");
    println!("═══════════════");

    let engine = SimulatedEngine::new(SimulatedConfig::default());
    let mut all_passed = true;
    for kind in WorkloadKind::ALL {
        for mode in [ActionMode::Inline, ActionMode::Compiled] {
            let request = SessionRequest::for_workload(kind).mode(mode);
            all_passed &= run_and_print(&engine, kind, &request).await;
        }
    }

    let leaked = engine.live_resources().await;
    if leaked > 0 {
        eprintln!("❌ {} remote resources still live after the demo", leaked);
        all_passed = false;
    }
    all_passed
}

async fn run_configs(paths: &[String]) -> Result<bool> {
    let mut all_passed = true;
    for (i, path) in paths.iter().enumerate() {
        if i > 0 {
            println!("\n{}", "─".repeat(60));
        }
        println!("Config: {}", path);

        let cfg = load_and_validate_config(path)
            .with_context(|| format!("failed to load config '{}'", path))?;
        let (channel, sessions) = RuntimeBuilder::from_config(&cfg)
            .await
            .with_context(|| format!("failed to open channel for '{}'", path))?;

        for (kind, request) in &sessions {
            all_passed &= run_and_print(&channel, *kind, request).await;
        }
    }
    Ok(all_passed)
}

async fn run_and_print<C: RpcChannel + ?Sized>(
    channel: &C,
    kind: WorkloadKind,
    request: &SessionRequest,
) -> bool {
    println!(
        "\n▶ {} ({} elements, {} mode, over {})",
        kind,
        request.size,
        request.mode,
        channel.name()
    );
    match run_session(channel, kind, request).await {
        Ok(report) => {
            print_report(&report);
            report.passed()
        }
        Err(e) => {
            println!("  ❌ session failed: {}", e);
            false
        }
    }
}

fn print_report(report: &SessionReport) {
    for timing in &report.timings {
        println!("  {}", timing);
    }
    let mark = if report.passed() { "✅" } else { "❌" };
    println!("  {} {} [{}]", mark, report.verdict, report.element_type);
}
