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

use std::time::{Duration, Instant};

use nix::{
    sys::signal::{self, Signal},
    unistd::Pid,
};
use tokio::{process::Child, process::Command as ProcessCommand, sync::mpsc, sync::watch, task::JoinHandle};
use tracing::{error, info, warn};

use crate::{
    bridge_notify::BridgeNotifier,
    config::ServiceConfig,
    descriptor::{ServiceSnapshot, ServiceStatus},
    event::Command,
};

/// A live handle to a service's owner task: send it `Command`s, read its
/// published snapshot, or wait for it to exit.
pub struct ServiceHandle {
    pub name: String,
    cmd_tx: mpsc::Sender<Command>,
    pub status_rx: watch::Receiver<ServiceSnapshot>,
    join: JoinHandle<()>,
}

impl ServiceHandle {
    pub async fn start(&self) { let _ = self.cmd_tx.send(Command::Start).await; }

    pub async fn stop(&self) { let _ = self.cmd_tx.send(Command::Stop).await; }

    #[must_use]
    pub fn snapshot(&self) -> ServiceSnapshot { self.status_rx.borrow().clone() }

    /// Blocks the caller until the owner task exits (used by the
    /// supervisor's final shutdown sequence).
    pub async fn join(self) { let _ = self.join.await; }
}

/// Spawns the owner task for one `ServiceDescriptor` and returns a handle
/// to it. The task owns every mutation of the descriptor's state (spec.md
/// section 5: "All mutations of a `ServiceDescriptor` go through that
/// descriptor's own lock"); here the "lock" is simply exclusive ownership
/// by this task, with a `watch` channel for readers.
pub fn spawn(config: ServiceConfig, bridge: BridgeNotifier) -> ServiceHandle {
    let name = config.name.clone();
    let mut snapshot = ServiceSnapshot::new(name.clone());
    if !config.enabled {
        snapshot.status = ServiceStatus::Disabled;
    }
    let (status_tx, status_rx) = watch::channel(snapshot);
    let (cmd_tx, cmd_rx) = mpsc::channel(8);

    let join = tokio::spawn(run(config, cmd_rx, status_tx, bridge));

    ServiceHandle { name, cmd_tx, status_rx, join }
}

async fn wait_child(child: &mut Option<Child>) -> std::process::ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    match child {
        Some(child) => child
            .wait()
            .await
            .unwrap_or_else(|_| std::process::ExitStatus::from_raw(-1)),
        None => std::future::pending().await,
    }
}

async fn run(
    config: ServiceConfig,
    mut cmd_rx: mpsc::Receiver<Command>,
    status_tx: watch::Sender<ServiceSnapshot>,
    bridge: BridgeNotifier,
) {
    let mut crashes_since_start: u32 = 0;
    let mut last_start: Option<Instant> = None;
    let mut child: Option<Child> = None;

    loop {
        let status = status_tx.borrow().status;
        match status {
            ServiceStatus::Disabled => {
                // Disabled services never transition on their own; bringing
                // one into service requires a config reload that rebuilds
                // the descriptor, which is handled at the instance level,
                // not inside this loop.
                if cmd_rx.recv().await.is_none() {
                    return;
                }
            }
            ServiceStatus::Stopped | ServiceStatus::Failed => {
                match cmd_rx.recv().await {
                    Some(Command::Start) => {
                        child = handle_start(&config, &status_tx, &mut last_start).await;
                    }
                    Some(Command::Stop) => {} // already stopped: idempotent no-op
                    None => return,
                }
            }
            ServiceStatus::Dead => {
                // spec.md section 4.2: "do not attempt further respawns
                // until the operator issues `start`" — a fresh `start`
                // gives the service a clean budget, same as any other
                // terminal state.
                match cmd_rx.recv().await {
                    Some(Command::Start) => {
                        crashes_since_start = 0;
                        child = handle_start(&config, &status_tx, &mut last_start).await;
                    }
                    Some(Command::Stop) => {}
                    None => return,
                }
            }
            ServiceStatus::Running => {
                let pid = status_tx.borrow().pid;
                tokio::select! {
                    cmd = cmd_rx.recv() => match cmd {
                        Some(Command::Stop) => handle_stop_requested(&config, pid, &status_tx),
                        Some(Command::Start) => {} // idempotent: already running
                        None => {
                            send_signal(pid, Signal::SIGTERM);
                            return;
                        }
                    },
                    exit = wait_child(&mut child) => {
                        handle_unexpected_exit(&config, exit, &status_tx, &mut crashes_since_start, last_start, &bridge).await;
                        child = None;
                    }
                }
            }
            ServiceStatus::Shutdown => {
                let timeout = Duration::from_secs(config.restart_policy.shutdown_timeout_sec);
                tokio::select! {
                    _ = wait_child(&mut child) => {}
                    () = tokio::time::sleep(timeout) => {
                        let pid = status_tx.borrow().pid;
                        warn!(service = %config.name, pid, "graceful stop timed out, sending SIGKILL");
                        send_signal(pid, Signal::SIGKILL);
                        wait_child(&mut child).await;
                    }
                }
                child = None;
                cleanup_files(&config);
                status_tx.send_modify(|s| {
                    s.status = ServiceStatus::Stopped;
                    s.pid = 0;
                    s.started_at = None;
                });
            }
            ServiceStatus::Respawning => {
                tokio::time::sleep(Duration::from_millis(config.restart_policy.restart_interval_ms)).await;
                child = handle_start(&config, &status_tx, &mut last_start).await;
            }
        }
    }
}

async fn handle_start(
    config: &ServiceConfig,
    status_tx: &watch::Sender<ServiceSnapshot>,
    last_start: &mut Option<Instant>,
) -> Option<Child> {
    if let Some(parent) = config.log_file.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match ProcessCommand::new(&config.binary).args(&config.args).kill_on_drop(true).spawn() {
        Ok(child) => {
            let pid = child.id().map_or(0, |pid| pid as i32);
            info!(service = %config.name, pid, "service started");
            *last_start = Some(Instant::now());
            status_tx.send_modify(|s| {
                s.status = ServiceStatus::Running;
                s.pid = pid;
                s.started_at = Some(Instant::now());
                s.fail_reason.clear();
            });
            Some(child)
        }
        Err(err) => {
            error!(service = %config.name, %err, "spawn failed");
            status_tx.send_modify(|s| {
                s.status = ServiceStatus::Failed;
                s.fail_reason = err.to_string();
            });
            None
        }
    }
}

fn handle_stop_requested(config: &ServiceConfig, pid: i32, status_tx: &watch::Sender<ServiceSnapshot>) {
    info!(service = %config.name, pid, "stop requested, sending SIGTERM");
    send_signal(pid, Signal::SIGTERM);
    status_tx.send_modify(|s| s.status = ServiceStatus::Shutdown);
}

async fn handle_unexpected_exit(
    config: &ServiceConfig,
    exit: std::process::ExitStatus,
    status_tx: &watch::Sender<ServiceSnapshot>,
    crashes_since_start: &mut u32,
    last_start: Option<Instant>,
    bridge: &BridgeNotifier,
) {
    warn!(service = %config.name, code = exit.code(), "service exited unexpectedly");
    bridge.notify_refresh();

    // spec.md section 4.2: "if uptime since last start >= reset_after_sec,
    // the counter resets" — the sole reset condition (Design Notes section
    // 9 resolves the source's read-only-branch bug this way).
    let uptime = last_start.map_or(Duration::ZERO, |t| t.elapsed());
    if uptime.as_secs() >= config.restart_policy.reset_after_sec {
        *crashes_since_start = 0;
    }
    *crashes_since_start += 1;

    if *crashes_since_start > config.restart_policy.max_tries {
        error!(service = %config.name, crashes = *crashes_since_start, "crash budget exhausted");
        status_tx.send_modify(|s| {
            s.status = ServiceStatus::Dead;
            s.pid = 0;
            s.crashes_since_start = *crashes_since_start;
            s.fail_reason = format!("exceeded max_tries={}", config.restart_policy.max_tries);
        });
    } else {
        status_tx.send_modify(|s| {
            s.status = ServiceStatus::Respawning;
            s.pid = 0;
            s.crashes_since_start = *crashes_since_start;
        });
    }
}

fn send_signal(pid: i32, sig: Signal) {
    if pid <= 0 {
        return;
    }
    if let Err(err) = signal::kill(Pid::from_raw(pid), sig) {
        warn!(pid, ?sig, %err, "failed to signal child");
    }
}

fn cleanup_files(config: &ServiceConfig) {
    let _ = std::fs::remove_file(&config.pid_file);
    let _ = std::fs::remove_file(&config.socket_file);
}
