//! CLI smoke entry point.
//!
//! # Responsibility
//! - Bootstrap instances from a settings file against the demo SDK.
//! - Print each instance's configure outcome and ECID for quick sanity checks.

mod demo;

use alloyext_core::{
    core_version, default_log_level, init_logging, resolve_ecid, EcidSettings, ExtensionSettings,
    InstanceManager, InstanceNamespace, LoggingConfig,
};
use clap::Parser;
use demo::DemoSource;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "alloyext", version, about = "Bootstrap SDK instances from extension settings")]
struct Cli {
    /// Extension settings JSON (`{"accounts":[...]}`).
    #[arg(long)]
    settings: PathBuf,

    /// Log level (trace|debug|info|warn|error).
    #[arg(long, default_value = default_log_level())]
    log_level: String,

    /// Absolute directory for rotated log files; stderr when omitted.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Simulate a failed SDK library load.
    #[arg(long)]
    fail_load: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(&LoggingConfig {
        level: cli.log_level.clone(),
        log_dir: cli.log_dir.clone(),
    }) {
        eprintln!("logging disabled: {err}");
    }
    info!(
        "event=cli_start module=cli status=start core_version={}",
        core_version()
    );
    println!("alloyext_core version={}", core_version());

    let settings = match ExtensionSettings::from_path(&cli.settings) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let startup = match InstanceManager::start(Arc::new(InstanceNamespace::new()), &settings) {
        Ok(startup) => startup,
        Err(err) => {
            error!(
                "event=cli_start module=cli status=error error_code={}",
                err.code()
            );
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    let manager = startup.manager;

    let source = DemoSource {
        fail_with: cli.fail_load.then(|| "simulated library load failure".to_string()),
    };
    let load_failed = match manager.load(&source).await {
        Ok(report) => {
            println!(
                "library loaded: upgraded={} replayed={}",
                report.upgraded.len(),
                report.replayed
            );
            false
        }
        Err(err) => {
            eprintln!("{err}");
            true
        }
    };

    for instance in startup.configured {
        match instance.configure.await {
            Ok(_) => {
                let ecid = resolve_ecid(
                    &manager,
                    &EcidSettings {
                        instance_name: instance.instance_name.clone(),
                    },
                )
                .await;
                println!(
                    "instance={} property_id={} configure=ok ecid={}",
                    instance.instance_name,
                    instance.property_id,
                    ecid.map(|value| value.to_string())
                        .unwrap_or_else(|| "-".to_string())
                );
            }
            Err(err) => println!(
                "instance={} property_id={} configure=error error={err}",
                instance.instance_name, instance.property_id
            ),
        }
    }

    if load_failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
