// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fakesense

//! FakeSense - synthetic periodic sensor sources
//!
//! Runs the fake barometer and mocap magnetometer drivers behind a small
//! command shell: `<driver> <start|stop|reset|info|status|test>`.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use fakesense::sensors::{DriverManager, EXIT_OK};
use fakesense::{Config, Context, VERSION};

/// FakeSense - synthetic periodic sensor sources
#[derive(Parser, Debug)]
#[command(name = "fakesense")]
#[command(version = VERSION)]
#[command(about = "Fake barometer and mocap magnetometer drivers")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Run the given commands and exit instead of opening the shell
    #[arg(long)]
    batch: bool,

    /// Commands to run at startup, e.g. "fakebaro start"
    commands: Vec<String>,
}

enum LineOutcome {
    Quit,
    Code(i32),
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_create(&config_path)?;

    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        config.log_level.parse().unwrap_or(Level::INFO)
    };

    let builder = FmtSubscriber::builder()
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true);
    if std::env::var_os("RUST_LOG").is_some() {
        tracing::subscriber::set_global_default(
            builder.with_env_filter(EnvFilter::from_default_env()).finish(),
        )?;
    } else {
        tracing::subscriber::set_global_default(builder.with_max_level(log_level).finish())?;
    }

    info!("FakeSense v{}", VERSION);
    info!("Configuration loaded from {:?}", config_path);

    let rt = tokio::runtime::Runtime::new()?;
    let code = rt.block_on(run(config, args.commands, args.batch))?;
    // stdin reads block a runtime thread; don't wait on them
    rt.shutdown_timeout(Duration::from_millis(100));

    if code != EXIT_OK {
        std::process::exit(code);
    }
    Ok(())
}

async fn run(config: Config, commands: Vec<String>, batch: bool) -> Result<i32> {
    let ctx = Context::new(&config, Handle::current());
    let mut manager = DriverManager::with_builtin_drivers(ctx, &config);

    let mut code = EXIT_OK;
    for line in config.autostart.iter().chain(commands.iter()) {
        match run_line(&mut manager, line) {
            LineOutcome::Quit => return Ok(code),
            LineOutcome::Code(c) => code = c,
        }
    }

    if batch {
        manager.shutdown();
        return Ok(code);
    }

    info!("{}", manager.usage());
    info!("Type 'help' for commands, 'exit' or Ctrl+C to quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        if let LineOutcome::Quit = run_line(&mut manager, &line) {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    manager.shutdown();
    info!("FakeSense shutdown complete");
    Ok(EXIT_OK)
}

fn run_line(manager: &mut DriverManager, line: &str) -> LineOutcome {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        [] => LineOutcome::Code(EXIT_OK),
        ["exit"] | ["quit"] => LineOutcome::Quit,
        ["help"] => {
            info!("{}", manager.usage());
            info!("other commands: devices, help, exit");
            LineOutcome::Code(EXIT_OK)
        }
        ["devices"] => {
            let nodes = manager.context().registry.nodes();
            if nodes.is_empty() {
                warn!("no device nodes registered");
            }
            for node in nodes {
                info!("{}", node);
            }
            LineOutcome::Code(EXIT_OK)
        }
        _ => LineOutcome::Code(manager.execute(&words)),
    }
}
