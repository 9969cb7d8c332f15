//! `embody` – runs a live body model from the command line.
//!
//! 1. Loads the model from `~/.embody/config.toml` (or `--config <path>`);
//!    without a file it runs a demo model watched by a simulated sensor.
//! 2. Starts every sensor and ticks the model at its frame rate.
//! 3. Prints a status line every second.
//! 4. On **Ctrl-C** stops the ticker, terminates every sensor, and exits.
//!
//! `embody --init` writes the demo model to the config path and exits.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use colored::Colorize;
use tracing::warn;

use embody_fusion::PluginRegistry;
use embody_hal::SensorRegistry;
use embody_middleware::{Frame, FrameBus};
use embody_runtime::{ModelConfig, SceneController, SensorState, Ticker, init_tracing};

const STATUS_INTERVAL: Duration = Duration::from_secs(1);

struct Options {
    config: PathBuf,
    init: bool,
}

fn main() -> ExitCode {
    let options = match parse_args(std::env::args().skip(1)) {
        Ok(Some(options)) => options,
        Ok(None) => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("{}: {}", "Argument error".red(), e);
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    // Created before the Tokio runtime; see telemetry.
    let _guard = init_tracing("embody");

    print_banner();

    if options.init {
        return match config::save_to(&ModelConfig::demo(), &options.config) {
            Ok(()) => {
                println!(
                    "  {} Demo model written to {}\n",
                    "✓".green().bold(),
                    options.config.display().to_string().bold()
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}: {}", "Error saving config".red(), e);
                ExitCode::FAILURE
            }
        };
    }

    // ── Model ─────────────────────────────────────────────────────────────
    let cfg = match config::load_from(&options.config) {
        Ok(Some(cfg)) => {
            println!(
                "  Model loaded from {}",
                options.config.display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            println!(
                "  No model at {}; running the demo model.",
                options.config.display().to_string().dimmed()
            );
            let mut cfg = ModelConfig::demo();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            eprintln!("{}: {}", "Config error".red(), e);
            return ExitCode::FAILURE;
        }
    };

    let model = match cfg.build(&SensorRegistry::new(), &PluginRegistry::new()) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("{}: {}", "Model error".red(), e);
            return ExitCode::FAILURE;
        }
    };

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – shutting down …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; stop the process another way");
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {}", "Failed to start Tokio runtime".red(), e);
            return ExitCode::FAILURE;
        }
    };

    let controller = Arc::new(model.launch(FrameBus::default()));
    print_sensors(&controller);

    runtime.block_on(run(controller.clone(), shutdown));

    controller.terminate();
    println!("{}", "  ✓ Sensors stopped. Bye.".green());
    ExitCode::SUCCESS
}

/// Tick the model until `shutdown` is set, printing a status line.
async fn run(controller: Arc<SceneController>, shutdown: Arc<AtomicBool>) {
    let mut frames = controller.subscribe();
    let ticker = Ticker::start(controller.clone());
    println!(
        "  Running at {} fps. Press {} to stop.\n",
        controller.config().update_frequency,
        "Ctrl-C".bold()
    );

    let mut status = tokio::time::interval(STATUS_INTERVAL);
    status.tick().await;
    while !shutdown.load(Ordering::SeqCst) {
        status.tick().await;
        let mut latest = None;
        while let Some(frame) = frames.try_recv() {
            latest = Some(frame);
        }
        if let Some(frame) = latest {
            println!("  {}", status_line(&controller, &frame));
        }
    }

    let ticks = ticker.stop().await;
    println!("\n  {} frames computed.", ticks.to_string().bold());
}

fn status_line(controller: &SceneController, frame: &Frame) -> String {
    let tracked = frame
        .scene
        .joints()
        .filter(|j| j.position_tracked || j.orientation_tracked)
        .count();
    format!(
        "frame {:>6}  {} joints ({} tracked)  history {}",
        frame.sequence,
        frame.scene.joint_count(),
        tracked,
        controller.history_len()
    )
}

fn print_sensors(controller: &SceneController) {
    let states = controller.sensor_states();
    if states.is_empty() {
        println!("  {}", "No sensors configured.".dimmed());
        return;
    }
    println!("  Sensors:");
    for (id, state) in states {
        let label = match state {
            SensorState::Running => "running".green(),
            SensorState::Ignored => "ignored".yellow(),
            other => format!("{other:?}").to_lowercase().normal(),
        };
        println!("    • {} {}", id.bold(), label);
    }
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// Arguments
// ─────────────────────────────────────────────────────────────────────────────

/// `Ok(None)` means help was requested.
fn parse_args(args: impl Iterator<Item = String>) -> Result<Option<Options>, String> {
    let mut options = Options {
        config: config::config_path(),
        init: false,
    };
    let mut args = args;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| format!("{arg} expects a path"))?;
                options.config = PathBuf::from(path);
            }
            "--init" => options.init = true,
            "-h" | "--help" => return Ok(None),
            other => return Err(format!("unknown argument '{other}'")),
        }
    }
    Ok(Some(options))
}

fn print_usage() {
    println!("Usage: embody [--config <path>] [--init]");
    println!();
    println!("  -c, --config <path>  model file (default ~/.embody/config.toml)");
    println!("      --init           write the demo model to the model file and exit");
    println!("  -h, --help           show this message");
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   ___        __          __    "#.bold().cyan());
    println!("{}", r#"  / _ \__ _  / /  ___ ___/ /_ __"#.bold().cyan());
    println!("{}", r#" /  __/  ' \/ _ \/ _ / _  / // /"#.bold().cyan());
    println!("{}", r#" \___/_/_/_/_.__/\___\_,_/\_, / "#.bold().cyan());
    println!("{}", r#"                         /___/  "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "embody".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Live human body pose model");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn parses_config_and_init() {
        let options = parse_args(args(&["--config", "/tmp/body.toml", "--init"]))
            .unwrap()
            .unwrap();
        assert_eq!(options.config, PathBuf::from("/tmp/body.toml"));
        assert!(options.init);
    }

    #[test]
    fn help_and_bad_arguments() {
        assert!(parse_args(args(&["-h"])).unwrap().is_none());
        assert!(parse_args(args(&["--config"])).is_err());
        assert!(parse_args(args(&["--fast"])).is_err());
    }

    #[test]
    fn status_line_counts_tracked_joints() {
        let model = ModelConfig::default()
            .build(&SensorRegistry::new(), &PluginRegistry::new())
            .unwrap();
        let controller = model.launch(FrameBus::default());
        let frame = controller.tick().unwrap();
        let line = status_line(&controller, &frame);
        assert!(line.contains("19 joints (0 tracked)"), "unexpected line: {line}");
    }
}
