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

//! Control client for the supervisor's control RPC (spec.md section 6).
//! Fixed grammar:
//!
//! ```text
//! arbiterctl list
//! arbiterctl status   <instance>
//! arbiterctl start    <instance> [service ...]
//! arbiterctl stop     <instance> [service ...]
//! arbiterctl restart  <instance> [service ...]   # stop then start
//! ```
//!
//! Exit code 0 on success, 127 on a missing argument or `--help` (clap's
//! default), non-zero on RPC failure.

use std::{path::PathBuf, process::ExitCode};

use arbiter_api::{
    Empty, StartRequest, StatusRequest, StatusResponse, StopRequest, supervisor_client::SupervisorClient,
};
use clap::{Parser, Subcommand};
use tonic::transport::Channel;

#[derive(Parser)]
#[command(name = "arbiterctl", about = "Control client for the arbiter supervisor")]
struct Cli {
    /// Path to the supervisor's control-plane Unix-domain socket.
    #[arg(long, default_value = "/var/run/arbiter/supervisor.sock")]
    socket: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List configured instances and the supervisor's own PID.
    List,
    /// Show per-service status for an instance.
    Status { instance: String },
    /// Start some or all of an instance's services. With no service names,
    /// starts every auto-start service.
    Start { instance: String, services: Vec<String> },
    /// Stop some or all of an instance's services. With no service names,
    /// stops every running service.
    Stop { instance: String, services: Vec<String> },
    /// Stop then start (spec.md section 6: `restart = stop then start`).
    Restart { instance: String, services: Vec<String> },
}

#[tokio::main]
async fn main() -> ExitCode {
    arbiter_telemetry::init_default_ut_logging();

    let cli = Cli::parse();

    let channel = match arbiter_server::grpc::connect_uds(cli.socket.clone()).await {
        Ok(channel) => channel,
        Err(err) => {
            eprintln!("cannot connect to supervisor at {}: {err}", cli.socket.display());
            return ExitCode::from(1);
        }
    };
    let mut client = SupervisorClient::new(channel);

    let result = match cli.command {
        Command::List => run_list(&mut client).await,
        Command::Status { instance } => run_status(&mut client, instance).await,
        Command::Start { instance, services } => run_start(&mut client, instance, services).await,
        Command::Stop { instance, services } => run_stop(&mut client, instance, services).await,
        Command::Restart { instance, services } => {
            match run_stop(&mut client, instance.clone(), services.clone()).await {
                Ok(()) => run_start(&mut client, instance, services).await,
                err => err,
            }
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(status) => {
            eprintln!("rpc failed: {status}");
            ExitCode::from(1)
        }
    }
}

type CliResult = std::result::Result<(), tonic::Status>;

async fn run_list(client: &mut SupervisorClient<Channel>) -> CliResult {
    let response = client.get_supervisor_status(Empty {}).await?.into_inner();
    println!("supervisor pid: {}", response.supervisor_pid);
    for name in response.instance_names {
        println!("  {name}");
    }
    Ok(())
}

async fn run_status(client: &mut SupervisorClient<Channel>, instance: String) -> CliResult {
    let response = client
        .get_status(StatusRequest { instance_name: instance })
        .await?
        .into_inner();
    print_status(&response);
    Ok(())
}

async fn run_start(client: &mut SupervisorClient<Channel>, instance: String, services: Vec<String>) -> CliResult {
    let response = client
        .start(StartRequest { instance_name: instance, service_names: services })
        .await?
        .into_inner();
    print_status(&response);
    Ok(())
}

async fn run_stop(client: &mut SupervisorClient<Channel>, instance: String, services: Vec<String>) -> CliResult {
    let response = client
        .stop(StopRequest { instance_name: instance, service_names: services })
        .await?
        .into_inner();
    print_status(&response);
    Ok(())
}

fn print_status(response: &StatusResponse) {
    println!("instance: {}", response.instance_name);
    for service in &response.service_statuses {
        println!(
            "  {:<24} {:?} pid={} uptime={}s crashes={} {}",
            service.name,
            service.status(),
            service.pid,
            service.uptime_seconds,
            service.crashes_since_start,
            service.fail_reason,
        );
    }
}
