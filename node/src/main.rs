// Copyright (C) 2015-2025 The Neo Project.
//
// main.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The node binary: configuration, wiring and lifecycle.

mod p2p_shell;
mod system;

use clap::Parser;
use neo3_config::{ApplicationConfig, NetworkType};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// A Neo N3 blockchain node.
#[derive(Debug, Parser)]
#[command(name = "neo3-node", version)]
struct Cli {
    /// Path to a JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Data directory for chain storage.
    #[arg(long)]
    datadir: Option<PathBuf>,

    /// Network preset when no config file is given.
    #[arg(long, default_value = "privnet")]
    network: NetworkType,

    /// Hex-encoded validator private key; enables consensus.
    #[arg(long, env = "NEO3_VALIDATOR_KEY")]
    validator_key: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => match ApplicationConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!(error = %e, "cannot load configuration");
                return ExitCode::from(1);
            }
        },
        None => ApplicationConfig::preset(cli.network),
    };
    if let Some(datadir) = &cli.datadir {
        config.application_configuration.storage.path = datadir.join("chain");
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "cannot start the async runtime");
            return ExitCode::from(1);
        }
    };

    let system = match system::NeoSystem::start(&runtime, config, cli.validator_key.as_deref()) {
        Ok(system) => system,
        Err(e) => {
            error!(error = %e, "node failed to start");
            return ExitCode::from(1);
        }
    };
    info!(height = system.blockchain().height(), "node started");

    // Run until interrupted.
    let outcome = runtime.block_on(async {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| anyhow::anyhow!("signal handler failed: {e}"))
    });

    match outcome {
        Ok(()) => {
            info!("shutting down");
            system.shutdown();
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "fatal error while running");
            ExitCode::from(2)
        }
    }
}
