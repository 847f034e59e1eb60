use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::path::Path;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use scan_snapshot::cli::{Cli, Commands};
use scan_snapshot::commands;
use scan_snapshot::config::{self, AppConfig, CONFIG_PATH};
use scan_snapshot::logger::{RunLogger, VerbosityLevel};

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn create_config(path: &Path) {
    match AppConfig::create_default_config_at(path) {
        Ok(path) => {
            println!("✅ Created default configuration file at: {}", path.display());
            println!("   Edit this file to customize settings, then run scan-snapshot again.");
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("❌ Failed to create configuration file: {}", e);
            std::process::exit(1);
        }
    }
}

fn load_config(cli: &Cli) -> AppConfig {
    let loaded = match &cli.config {
        Some(path) => AppConfig::load_from_path(path),
        None => AppConfig::load(),
    };

    match loaded {
        Ok(cfg) => cfg,
        Err(config::ConfigError::FileNotFound(path)) => {
            // Only the default location is offered for creation
            let prompt = if cli.config.is_none() {
                AppConfig::prompt_create_config()
            } else {
                Ok(None)
            };
            match prompt {
                Ok(Some(created_path)) => {
                    println!("✅ Created default configuration file at: {}", created_path.display());
                    println!("   Edit this file to customize settings, then run scan-snapshot again.");
                    std::process::exit(0);
                }
                Ok(None) => {
                    eprintln!("❌ Configuration file not found at: {}", path.display());
                    eprintln!("   Run with --init to create a default configuration file.");
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("❌ Failed to create configuration file: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            std::process::exit(1);
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle --init first (before any other processing)
    if cli.init {
        let path = cli.config.clone().unwrap_or_else(|| CONFIG_PATH.into());
        create_config(&path);
    }

    if let Err(e) = cli.validate() {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    init_tracing(cli.verbose);
    let app_config = load_config(&cli);

    let verbosity = VerbosityLevel::from_verbose_count(cli.verbose);
    let logger = match &cli.log_file {
        Some(path) => RunLogger::with_log_file(verbosity, path.clone()),
        None => RunLogger::new(verbosity),
    };

    let outcome = match &cli.command {
        Some(Commands::Load { kind, results, skip_exports }) => commands::run_load(
            &app_config,
            &logger,
            *kind,
            results.as_deref(),
            *skip_exports,
            Utc::now(),
        )
        .map(|_| true),
        Some(Commands::Domains) => commands::run_domains(&app_config, &logger, Utc::now()).map(|_| true),
        Some(Commands::Latest { kind, domain }) => {
            commands::run_latest(&app_config, *kind, domain.as_deref(), std::io::stdout().lock())
                .map(|count| {
                    logger.debug(&format!("Printed {} latest {} documents", count, kind));
                    false
                })
        }
        None => Ok(false),
    };

    let print_summary = match outcome {
        Ok(print_summary) => print_summary,
        Err(e) => {
            logger.error(&format!("{:#}", e));
            if let Err(export_err) = logger.export_logs() {
                eprintln!("⚠️ Warning: Failed to export logs: {}", export_err);
            }
            std::process::exit(1);
        }
    };

    if print_summary {
        logger.print_final_summary();
    }

    if logger.is_log_export_enabled() {
        match logger.export_logs() {
            Ok(()) => {
                if let Some(log_file) = &cli.log_file {
                    eprintln!("📄 Execution logs exported to: {}", log_file.display());
                    eprintln!("   Total log entries: {}", logger.get_log_count());
                }
            }
            Err(e) => {
                eprintln!("⚠️ Warning: Failed to export logs: {}", e);
            }
        }
    }

    Ok(())
}
