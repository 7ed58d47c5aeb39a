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

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// Top-level supervisor config, loaded once at startup (spec.md section
/// 4.2). Per-instance config files are reread on every `start(instance)`
/// call, per the `InstanceDescriptor` invariant in spec.md section 3.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Unix-domain socket the control RPC listens on.
    pub control_socket: PathBuf,
    /// PID file for the supervisor process itself.
    pub pid_file: PathBuf,
    /// Restrict the control socket to this UID; `None` accepts any peer.
    #[serde(default)]
    pub control_uid: Option<u32>,
    /// Every configured instance, keyed by name.
    pub instances: Vec<InstanceConfig>,
    /// The singleton edge-bridge service, not bound to any instance
    /// (spec.md section 3: "Top-level supervisor additionally owns a
    /// single webserver ServiceDescriptor").
    pub webserver: ServiceConfig,
}

/// One named configuration of backend services running together.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InstanceConfig {
    pub name: String,
    /// Services started automatically when the instance starts, in the
    /// order listed (spec.md section 4.2 "Startup ordering").
    pub services: Vec<ServiceConfig>,
    /// Whether the grader is auto-started with this instance. The grader
    /// always starts last and stops first regardless of its position here.
    #[serde(default)]
    pub grader: Option<ServiceConfig>,
    /// Path to this instance's own config file; rereading it on every
    /// `start` lets operator edits take effect without a supervisor
    /// restart.
    pub config_path: PathBuf,
}

impl InstanceConfig {
    /// Services in startup order: regular services first (as configured),
    /// grader last (spec.md section 4.2: "Grader is always started last").
    pub fn services_in_startup_order(&self) -> Vec<&ServiceConfig> {
        let mut ordered: Vec<&ServiceConfig> = self.services.iter().collect();
        if let Some(grader) = &self.grader {
            ordered.push(grader);
        }
        ordered
    }

    /// Services in shutdown order: grader first (spec.md section 4.2:
    /// "it is stopped first for the same reason"), then the rest.
    pub fn services_in_shutdown_order(&self) -> Vec<&ServiceConfig> {
        let mut ordered = Vec::with_capacity(self.services.len() + 1);
        if let Some(grader) = &self.grader {
            ordered.push(grader);
        }
        ordered.extend(self.services.iter());
        ordered
    }
}

/// One backend child process (spec.md section 3 `ServiceDescriptor`,
/// config-sourced half).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub binary: PathBuf,
    pub args: Vec<String>,
    pub log_file: PathBuf,
    pub pid_file: PathBuf,
    pub socket_file: PathBuf,
    /// Desired state at supervisor startup: `false` means `DISABLED`.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub restart_policy: RestartPolicy,
}

const fn default_true() -> bool { true }

/// Crash-budget restart policy (spec.md section 4.2 "Restart policy").
#[derive(Clone, Copy, Debug, Serialize, Deserialize, SmartDefault, bon::Builder)]
pub struct RestartPolicy {
    /// At most this many restarts before the service goes `DEAD`.
    #[default = 3]
    pub max_tries: u32,
    /// Crash counter resets once the service has been up this long.
    #[default = 60]
    pub reset_after_sec: u64,
    /// Delay between an unexpected exit and the respawn attempt.
    #[default = 1000]
    pub restart_interval_ms: u64,
    /// Upper bound the supervisor waits for a graceful stop before
    /// escalating to SIGKILL (spec.md section 5 "Cancellation and
    /// timeouts").
    #[default = 10]
    pub shutdown_timeout_sec: u64,
    /// Inter-service delay applied after starting this service, before
    /// starting the next one in sequence (spec.md section 4.2 "Startup
    /// ordering": "separate values for microservices vs. grpcwebserver vs.
    /// grader" — carried per-service rather than globally so each class
    /// can set its own).
    #[default = 200]
    pub startup_delay_ms: u64,
}
