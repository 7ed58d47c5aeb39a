// Copyright 2025 arbiter contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Supervisor daemon entry point (spec.md section 4.2).

use std::{path::PathBuf, process::ExitCode};

use arbiter_supervisor::{Supervisor, SupervisorConfig};
use clap::Parser;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "arbiter-supervisord", about = "Lifecycle manager for the arbiter backend fleet")]
struct Cli {
    /// Path to the supervisor's own TOML config (spec.md section 3
    /// `InstanceDescriptor`/`SupervisorConfig`).
    #[arg(long)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    arbiter_telemetry::init_default_ut_logging();

    let cli = Cli::parse();
    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            error!(path = %cli.config.display(), %err, "failed to load config");
            return ExitCode::from(1);
        }
    };

    if let Some(parent) = config.pid_file.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(err) = std::fs::write(&config.pid_file, std::process::id().to_string()) {
        error!(%err, "failed to write supervisor pid file");
        return ExitCode::from(1);
    }

    let supervisor = Supervisor::bootstrap(&config);

    // Give the control socket a moment to come up before anything can race
    // an operator's `start` call in against it; mirrors the 100ms grace
    // period the source gives its own control listener before autostarting.
    let autostart = {
        let supervisor = supervisor.clone();
        let names = supervisor.all_instance_names_including_aliases();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            for name in names {
                info!(instance = %name, "autostarting");
                supervisor.start(&name, &[]).await;
            }
        })
    };

    let control = {
        let config = config.clone();
        let supervisor = supervisor.clone();
        tokio::spawn(async move {
            if let Err(err) = arbiter_supervisor::serve_control_plane(&config, supervisor).await {
                error!(%err, "control plane exited");
            }
        })
    };

    wait_for_stop_signal().await;
    info!("stop signal received, shutting down fleet");

    control.abort();
    autostart.abort();
    supervisor.shutdown().await;
    let _ = std::fs::remove_file(&config.control_socket);

    ExitCode::SUCCESS
}

fn load_config(path: &PathBuf) -> std::io::Result<SupervisorConfig> {
    let text = std::fs::read_to_string(path)?;
    toml::from_str(&text).map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
}

async fn wait_for_stop_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("install SIGINT handler");
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigint.recv() => info!("received SIGINT"),
    }
}

