//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

mod config;
mod render;

use std::sync::Arc;

use clap::{App, Arg};
use config::{Config, LoggingFileRotation, LoggingFmtStyle};
use nix::unistd::Uid;
use render::Renderer;
use routegen_optimizer::probe::IcmpProber;
use routegen_optimizer::{ExitReason, Optimizer, alert};
use routegen_policy::Policy;
use routegen_utils::task::Task;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::Layer;
use tracing_subscriber::prelude::*;

const EXIT_CONFIG_ERROR: i32 = 1;
const EXIT_CACHE_FULL: i32 = 3;

fn init_tracing(config: &config::Logging) {
    // Enable logging to a file.
    let file = config.file.enabled.then(|| {
        let file_appender = match config.file.rotation {
            LoggingFileRotation::Never => {
                rolling::never(&config.file.dir, &config.file.name)
            }
            LoggingFileRotation::Hourly => {
                rolling::hourly(&config.file.dir, &config.file.name)
            }
            LoggingFileRotation::Daily => {
                rolling::daily(&config.file.dir, &config.file.name)
            }
        };

        let layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(false)
            .with_thread_ids(config.file.fmt.show_thread_id)
            .with_file(config.file.fmt.show_source)
            .with_line_number(config.file.fmt.show_source)
            .with_ansi(config.file.fmt.colors);
        let layer = match config.file.fmt.style {
            LoggingFmtStyle::Compact => layer.compact().boxed(),
            LoggingFmtStyle::Full => layer.boxed(),
            LoggingFmtStyle::Json => layer.json().boxed(),
            LoggingFmtStyle::Pretty => layer.pretty().boxed(),
        };
        layer.with_filter(LevelFilter::TRACE)
    });

    // Enable logging to stdout.
    let stdout = config.stdout.enabled.then(|| {
        let layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(config.stdout.fmt.show_thread_id)
            .with_file(config.stdout.fmt.show_source)
            .with_line_number(config.stdout.fmt.show_source)
            .with_ansi(config.stdout.fmt.colors);
        let layer = match config.stdout.fmt.style {
            LoggingFmtStyle::Compact => layer.compact().boxed(),
            LoggingFmtStyle::Full => layer.boxed(),
            LoggingFmtStyle::Json => layer.json().boxed(),
            LoggingFmtStyle::Pretty => layer.pretty().boxed(),
        };
        layer.with_filter(LevelFilter::TRACE)
    });

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("routegen=debug"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(file)
        .with(stdout)
        .init();
}

fn signal_listener() -> mpsc::Receiver<()> {
    let (signal_tx, signal_rx) = mpsc::channel(1);

    tokio::task::spawn(async move {
        let (mut sigint, mut sigterm) = match (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
        ) {
            (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
            (Err(error), _) | (_, Err(error)) => {
                error!(%error, "failed to install signal handlers");
                return;
            }
        };

        tokio::select! {
            _ = sigint.recv() => {
                info!("received SIGINT");
                let _ = signal_tx.send(()).await;
            },
            _ = sigterm.recv() => {
                info!("received SIGTERM");
                let _ = signal_tx.send(()).await;
            }
        }
    });

    signal_rx
}

fn build_version() -> String {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    match rustc_tools_util::get_version_info!().commit_hash {
        Some(hash) => format!("{VERSION} ({hash})"),
        None => VERSION.to_owned(),
    }
}

fn load_policy(path: &str) -> Option<Policy> {
    let document = match std::fs::read_to_string(path) {
        Ok(document) => document,
        Err(error) => {
            error!(%path, %error, "failed to read policy file");
            return None;
        }
    };

    match routegen_policy::load(&document) {
        Ok(policy) => Some(policy),
        Err(error) => {
            error.log();
            None
        }
    }
}

// Runs the route optimizer and re-renders the view on every preference
// transition until a stop signal arrives or the optimizer gives up.
async fn run(policy: Policy, mut renderer: Renderer) -> i32 {
    let settings = &policy.global.optimizer;
    if !settings.probe_udp && !Uid::effective().is_root() {
        warn!("raw ICMP sockets usually need privileges, consider probe-udp");
    }

    let prober = Arc::new(IcmpProber::new(settings.probe_udp));
    let notifier = alert::notifier(settings);
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let optimizer = Optimizer::new(&policy, prober, notifier, events_tx);
    let preferences = optimizer.preferences();
    info!(
        peers = policy.optimized_peers().count(),
        targets = optimizer.feed().targets.len(),
        "starting route optimizer"
    );

    // Initial render, before any measurement.
    if let Err(error) = renderer.render(&policy, &preferences) {
        error.log();
    }

    let (stop_tx, stop_rx) = mpsc::channel(1);
    let mut optimizer = Task::spawn(optimizer.run(stop_rx));
    let mut signal_rx = signal_listener();
    let mut stopping = false;

    loop {
        tokio::select! {
            Some(alert) = events_rx.recv() => {
                // Events are sent only after their snapshot is published, so
                // this render covers every queued transition.
                let mut transitions = 1;
                while events_rx.try_recv().is_ok() {
                    transitions += 1;
                }
                info!(peer = %alert.peer, %transitions, "re-rendering");
                if let Err(error) = renderer.render(&policy, &preferences) {
                    error.log();
                }
            }
            Some(()) = signal_rx.recv(), if !stopping => {
                stopping = true;
                let _ = stop_tx.send(()).await;
            }
            result = &mut optimizer => {
                // Pick up whatever the last decision step published.
                if let Err(error) = renderer.render(&policy, &preferences) {
                    error.log();
                }
                return match result {
                    Ok(ExitReason::Cancelled) => {
                        info!(renders = renderer.renders(), "route optimizer stopped");
                        0
                    }
                    Ok(ExitReason::CacheFull { target }) => {
                        error!(path = %target, "measurement cache full, exiting");
                        EXIT_CACHE_FULL
                    }
                    Err(error) => {
                        error!(%error, "route optimizer task failed");
                        1
                    }
                };
            }
        }
    }
}

// ===== main =====

fn main() {
    // Parse command-line parameters.
    let matches = App::new("Routegen daemon")
        .version(build_version().as_str())
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("file")
                .help("Specify an alternative configuration file."),
        )
        .arg(
            Arg::with_name("policy")
                .short("p")
                .long("policy")
                .value_name("file")
                .help("Specify an alternative policy file."),
        )
        .arg(
            Arg::with_name("check")
                .long("check")
                .help("Resolve the policy, report errors and exit."),
        )
        .arg(
            Arg::with_name("dump")
                .long("dump")
                .help("Print the resolved policy as JSON and exit."),
        )
        .arg(
            Arg::with_name("docs")
                .long("docs")
                .help("Print the policy option reference as Markdown and exit."),
        )
        .get_matches();

    if matches.is_present("docs") {
        print!("{}", routegen_policy::config::document());
        return;
    }

    // Read configuration file.
    let config = match Config::load(matches.value_of("config")) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Failed to parse configuration file: {error}");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    // Initialize tracing.
    init_tracing(&config.logging);

    // Resolve the policy.
    let policy_file = matches.value_of("policy").unwrap_or(&config.policy_file);
    let Some(policy) = load_policy(policy_file) else {
        std::process::exit(EXIT_CONFIG_ERROR);
    };

    if matches.is_present("check") {
        info!(
            path = %policy_file,
            peers = policy.peers.len(),
            optimized = policy.optimized_peers().count(),
            "policy is valid"
        );
        return;
    }
    if matches.is_present("dump") {
        match serde_json::to_string_pretty(&policy) {
            Ok(data) => println!("{data}"),
            Err(error) => {
                error!(%error, "failed to serialize policy");
                std::process::exit(EXIT_CONFIG_ERROR);
            }
        }
        return;
    }

    // We're ready to go!
    info!("starting up");

    let renderer = Renderer::new(config.render.output.clone());
    let code = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create async runtime")
        .block_on(run(policy, renderer));

    info!("exiting");
    std::process::exit(code);
}
