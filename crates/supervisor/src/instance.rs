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

use std::{collections::HashMap, time::Duration};

use tracing::info;

use crate::{actor::ServiceHandle, bridge_notify::BridgeNotifier, config::InstanceConfig, descriptor::ServiceSnapshot};

/// One named group of backend services running together (spec.md section 3
/// `InstanceDescriptor`).
pub struct Instance {
    pub name: String,
    services: HashMap<String, ServiceHandle>,
    /// Order services were declared in, grader last — used so `start`/`stop`
    /// with an empty service list apply to "every auto-start service" in
    /// the right sequence (spec.md section 4.2).
    startup_order: Vec<String>,
    shutdown_order: Vec<String>,
    startup_delays: HashMap<String, Duration>,
}

impl Instance {
    pub fn spawn(config: &InstanceConfig, bridge: &BridgeNotifier) -> Self {
        let mut services = HashMap::new();
        let mut startup_delays = HashMap::new();
        for service in config.services_in_startup_order() {
            startup_delays.insert(
                service.name.clone(),
                Duration::from_millis(service.restart_policy.startup_delay_ms),
            );
            services.insert(service.name.clone(), crate::actor::spawn(service.clone(), bridge.clone()));
        }
        let startup_order = config.services_in_startup_order().iter().map(|s| s.name.clone()).collect();
        let shutdown_order = config.services_in_shutdown_order().iter().map(|s| s.name.clone()).collect();

        Self { name: config.name.clone(), services, startup_order, shutdown_order, startup_delays }
    }

    /// Starts `names` (or every service, in declared order, if empty),
    /// waiting each service's configured `startup_delay_ms` before moving
    /// to the next (spec.md section 4.2 "Startup ordering").
    pub async fn start(&self, names: &[String]) {
        let targets = self.resolve(names, &self.startup_order);
        for name in targets {
            if let Some(handle) = self.services.get(&name) {
                info!(instance = %self.name, service = %name, "starting");
                handle.start().await;
                if let Some(delay) = self.startup_delays.get(&name) {
                    tokio::time::sleep(*delay).await;
                }
            }
        }
    }

    /// Stops `names` (or every service in reverse-dependency order if
    /// empty: grader first, per spec.md section 4.2).
    pub async fn stop(&self, names: &[String]) {
        let targets = self.resolve(names, &self.shutdown_order);
        for name in targets {
            if let Some(handle) = self.services.get(&name) {
                handle.stop().await;
            }
        }
    }

    fn resolve(&self, names: &[String], default_order: &[String]) -> Vec<String> {
        if names.is_empty() { default_order.to_vec() } else { names.to_vec() }
    }

    #[must_use]
    pub fn statuses(&self) -> Vec<ServiceSnapshot> {
        self.startup_order
            .iter()
            .filter_map(|name| self.services.get(name).map(ServiceHandle::snapshot))
            .collect()
    }

    pub async fn shutdown(self) {
        self.stop(&[]).await;
        let Self { mut services, shutdown_order, .. } = self;
        for name in &shutdown_order {
            if let Some(handle) = services.remove(name) {
                handle.join().await;
            }
        }
    }
}
