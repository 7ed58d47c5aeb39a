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

use nix::{
    sys::signal::{self, Signal},
    unistd::Pid,
};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::descriptor::ServiceSnapshot;

/// Tells the edge bridge to drop its cached upstream connections. The
/// source signals this with a hangup; we do the same (Design Notes section
/// 9: "Some backends also accept a hangup signal as 'reload upstream
/// connections' — the bridge uses this to invalidate caches when notified
/// by the supervisor"). Used on every microservice's unexpected exit
/// (spec.md section 4.2 "Failure notification") and when a service goes
/// `DEAD` (spec.md section 4.2 "Restart policy").
#[derive(Clone)]
pub struct BridgeNotifier {
    webserver: watch::Receiver<ServiceSnapshot>,
}

impl BridgeNotifier {
    #[must_use]
    pub const fn new(webserver: watch::Receiver<ServiceSnapshot>) -> Self { Self { webserver } }

    /// Best-effort: if the bridge isn't running there's nothing to
    /// invalidate.
    pub fn notify_refresh(&self) {
        let pid = self.webserver.borrow().pid;
        if pid <= 0 {
            debug!("bridge not running, skipping refresh-connections signal");
            return;
        }
        if let Err(err) = signal::kill(Pid::from_raw(pid), Signal::SIGHUP) {
            warn!(pid, %err, "failed to signal edge bridge to refresh connections");
        }
    }
}
