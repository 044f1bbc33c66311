//! The harness binary: loads a configuration file, resolves and runs the
//! configured plugins, and exits with a status reflecting how shutdown
//! went (§6).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use harness_core::config::Config;
use harness_core::config_file;
use harness_core::engine::Engine;
use harness_core::error::HarnessError;
use harness_core::loader::Loader;

/// A pluggable, config-driven connection router.
#[derive(Parser)]
#[command(name = "harness-router", version, about)]
struct Cli {
    /// Path to the harness's configuration file.
    config: PathBuf,
}

const DEFAULT_PLUGINS: &[&str] = &["fabric_cache", "routing", "logger"];

fn load_config(path: &std::path::Path) -> Result<Config, HarnessError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        harness_core::error::ConfigError::InvalidArgument {
            option: "config".to_owned(),
            reason: format!("failed to read '{}': {e}", path.display()),
        }
    })?;

    let program_name = "harness-router";
    let mut config = Config::new(program_name);
    config_file::parse_into(&mut config, &text)?;
    config.apply_env_overlay(std::env::vars());
    Ok(config)
}

fn plugin_names(config: &Config) -> Vec<String> {
    let section = harness_core::config::SectionId::new("harness", "");
    match config.get_value(&section, "plugins") {
        Ok(raw) => raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned).collect(),
        Err(_) => DEFAULT_PLUGINS.iter().map(|s| (*s).to_owned()).collect(),
    }
}

fn run(cli: Cli) -> Result<(), HarnessError> {
    if harness_core::tracing_boot::install_bootstrap().is_err() {
        tracing::warn!(target: "harness::router", "a global tracing subscriber was already installed");
    }

    let config = load_config(&cli.config)?;
    let extension_dir = config.extension_dir.clone();
    let names = plugin_names(&config);
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();

    let mut loader = Loader::new(extension_dir);
    harness_plugins::register_all(&mut loader);

    let mut engine = Engine::load(&loader, &name_refs, config)?;
    engine.initialize()?;
    engine.start()?;

    if let Err(e) = engine.wait_for_shutdown_signal() {
        tracing::warn!(target: "harness::engine", error = %e, "failed to wait on shutdown signal");
    }

    // `stop()` may report a panicked or stuck worker, but `deinit` must
    // still run for every plugin regardless, so its result is not allowed
    // to short-circuit that call via `?`.
    let stop_result = engine.stop();
    engine.deinit()?;
    stop_result?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::from(0),
        Err(e @ HarnessError::Lifecycle(harness_core::error::LifecycleError::WorkerPanicked(_))) => {
            tracing::error!(target: "harness::engine", error = %e, "engine exiting after worker panic");
            // The bootstrap subscriber already logged this, but print it
            // unconditionally too in case bootstrap itself failed to
            // install, so a startup failure is never silent.
            #[expect(clippy::print_stderr, reason = "last-resort channel for pre-logger fatal errors")]
            {
                eprintln!("{e}");
            }
            ExitCode::from(2)
        }
        Err(e) => {
            tracing::error!(target: "harness::engine", error = %e, "fatal startup error");
            #[expect(clippy::print_stderr, reason = "last-resort channel for pre-logger fatal errors")]
            {
                eprintln!("{e}");
            }
            ExitCode::from(1)
        }
    }
}
