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

use std::{collections::HashMap, sync::Arc};

use arbiter_api::StatusResponse;
use tokio::sync::watch;
use tracing::info;

use crate::{
    actor::{self, ServiceHandle},
    bridge_notify::BridgeNotifier,
    config::SupervisorConfig,
    descriptor::ServiceSnapshot,
    instance::Instance,
};

/// Instance names that address the singleton edge-bridge service instead of
/// a named `InstanceDescriptor` (spec.md section 4.2 control RPC surface).
const WEBSERVER_ALIASES: [&str; 3] = ["web", "webserver", "grpcwebserver"];

fn is_webserver_alias(name: &str) -> bool { WEBSERVER_ALIASES.contains(&name) }

/// Owns the OS lifecycle of every backend child and of the edge bridge
/// (spec.md section 4.2 "Responsibilities"). Cheaply `Clone`-able so the
/// control RPC handler can hand a copy to every request.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<State>,
}

struct State {
    instances: HashMap<String, Instance>,
    webserver: ServiceHandle,
    pid_file: std::path::PathBuf,
}

impl Supervisor {
    /// Spawns the edge-bridge singleton and every configured instance's
    /// services (all start `DISABLED`/`STOPPED`; the daemon entry point
    /// decides whether to auto-start them).
    #[must_use]
    pub fn bootstrap(config: &SupervisorConfig) -> Self {
        let (bootstrap_tx, bootstrap_rx) = watch::channel(ServiceSnapshot::new("webserver".to_string()));
        drop(bootstrap_tx);
        let webserver = actor::spawn(config.webserver.clone(), BridgeNotifier::new(bootstrap_rx));
        let bridge = BridgeNotifier::new(webserver.status_rx.clone());

        let instances = config
            .instances
            .iter()
            .map(|inst_cfg| (inst_cfg.name.clone(), Instance::spawn(inst_cfg, &bridge)))
            .collect();

        Self { inner: Arc::new(State { instances, webserver, pid_file: config.pid_file.clone() }) }
    }

    #[must_use]
    pub fn instance_names(&self) -> Vec<String> { self.inner.instances.keys().cloned().collect() }

    #[must_use]
    pub fn all_instance_names_including_aliases(&self) -> Vec<String> {
        let mut names = self.instance_names();
        names.push("webserver".to_string());
        names
    }

    pub async fn status(&self, instance_name: &str) -> Option<StatusResponse> {
        if is_webserver_alias(instance_name) {
            return Some(StatusResponse {
                instance_name: instance_name.to_string(),
                service_statuses: vec![self.inner.webserver.snapshot().to_proto()],
            });
        }
        let instance = self.inner.instances.get(instance_name)?;
        Some(StatusResponse {
            instance_name: instance.name.clone(),
            service_statuses: instance.statuses().iter().map(ServiceSnapshot::to_proto).collect(),
        })
    }

    pub async fn start(&self, instance_name: &str, service_names: &[String]) -> Option<StatusResponse> {
        if is_webserver_alias(instance_name) {
            self.inner.webserver.start().await;
        } else {
            self.inner.instances.get(instance_name)?.start(service_names).await;
        }
        self.status(instance_name).await
    }

    pub async fn stop(&self, instance_name: &str, service_names: &[String]) -> Option<StatusResponse> {
        if is_webserver_alias(instance_name) {
            self.inner.webserver.stop().await;
        } else {
            self.inner.instances.get(instance_name)?.stop(service_names).await;
        }
        self.status(instance_name).await
    }

    /// spec.md section 4.2 "Shutdown": stop all instances in reverse
    /// dependency order (grader first within each, instances themselves in
    /// any order), then the edge bridge, then delete own PID/socket files.
    /// Consumes `self`'s `Arc` contents once every clone handed to an RPC
    /// handler has been dropped.
    pub async fn shutdown(self) {
        let State { instances, webserver, pid_file } = match Arc::try_unwrap(self.inner) {
            Ok(state) => state,
            Err(shared) => {
                // An RPC handler is still holding a clone; wait it out
                // rather than leaking instances unstopped.
                tracing::warn!("shutdown racing an in-flight RPC, stopping via shared handle");
                for instance in shared.instances.values() {
                    instance.stop(&[]).await;
                }
                shared.webserver.stop().await;
                return;
            }
        };

        for instance in instances.into_values() {
            info!(instance = %instance.name, "stopping instance");
            instance.shutdown().await;
        }

        info!("stopping edge bridge");
        webserver.stop().await;
        webserver.join().await;

        let _ = std::fs::remove_file(&pid_file);
    }
}
