#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod cli;
mod error_fmt;
mod fit;
mod replay;

use std::path::Path;

use clap::Parser;
use eyre::WrapErr;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error reporter: {e}");
    }

    if let Err(err) = run(cli) {
        tracing::error!(error = %format!("{err:#}"), "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn run(cli: Cli) -> eyre::Result<()> {
    let cfg = if cli.needs_config() {
        Some(load_config(&cli.config)?)
    } else {
        None
    };
    init_tracing(&cli, cfg.as_ref().map(|c| &c.logging))?;

    match cli.cmd {
        Commands::CheckConfig => {
            let cfg = cfg.ok_or_else(|| eyre::eyre!("read config: not loaded"))?;
            check_config(&cfg, cli.json)
        }
        Commands::Fit { points, linear, at } => fit::run_fit(&points, linear, at, cli.json),
        Commands::Replay {
            demands,
            follow_after,
            tail,
            realtime,
            records,
        } => {
            let cfg = cfg.ok_or_else(|| eyre::eyre!("read config: not loaded"))?;
            let opts = mcs_core::ReplayOptions {
                follow_after,
                tail,
                scan_period: None,
                record: records,
            };
            replay::run_replay(&cfg, &demands, &opts, realtime, cli.json)
        }
    }
}

fn load_config(path: &Path) -> eyre::Result<mcs_config::Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = mcs_config::load_toml(&text)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Console logs go to stderr so stdout stays machine readable; an optional
/// JSON file sink comes from the `[logging]` section.
fn init_tracing(cli: &Cli, logging: Option<&mcs_config::Logging>) -> eyre::Result<()> {
    let level = logging
        .and_then(|l| l.level.as_deref())
        .filter(|_| cli.log_level == "info")
        .unwrap_or(cli.log_level.as_str());
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level '{level}'"))?;

    let json_console = cli
        .json
        .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr));
    let pretty_console =
        (!cli.json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    let file_layer = match logging.and_then(|l| l.file.as_deref()) {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file must name a file, got '{file}'"))?;
            let appender = match logging.and_then(|l| l.rotation.as_deref()) {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_console)
        .with(pretty_console)
        .with(file_layer)
        .try_init()
        .map_err(|e| eyre::eyre!("init tracing: {e}"))
}

fn check_config(cfg: &mcs_config::Config, json: bool) -> eyre::Result<()> {
    let lc = mcs_core::LoopCfg::from(cfg);
    // Building the loop runs the core validation too.
    mcs_core::MountLoop::builder()
        .with_config(lc.clone())
        .with_time_source(mcs_traits::ManualTimeSource::new(0.0))
        .build()?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "status": "ok",
                "time_int": lc.tracking.time_int,
                "lookahead_len": lc.tracking.lookahead_len,
                "buffer_period": lc.tracking.buffer_period(),
                "trigger_latency": lc.tracking.trigger_latency,
                "limiter": lc.limiter.enabled,
                "diagnostics": lc.diagnostics.bits(),
            })
        );
    } else {
        println!(
            "config ok: time_int={}s lookahead_len={} (buffer {:.3}s) trigger_latency={}s limiter={}",
            lc.tracking.time_int,
            lc.tracking.lookahead_len,
            lc.tracking.buffer_period(),
            lc.tracking.trigger_latency,
            if lc.limiter.enabled { "on" } else { "off" },
        );
    }
    Ok(())
}
