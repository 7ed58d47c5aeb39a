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

use std::collections::HashMap;

use arbiter_api::{Arch, GraderProperties, Os, Submission};
use tokio::sync::mpsc;

use crate::catalog::CapabilityRequirement;

/// One live grader's attach session (spec.md section 3 `GraderRegistration`).
/// The queue is a bounded producer/consumer channel for submissions
/// dispatched to this grader; the grader's own streaming RPC handler is
/// the consumer.
pub struct GraderRegistration {
    pub id:         u64,
    pub properties: GraderProperties,
    queue:          mpsc::Sender<Submission>,
}

impl GraderRegistration {
    /// Best-effort dispatch: a full or closed queue means this grader can't
    /// take the submission right now, so the dispatcher moves on to the
    /// next one rather than blocking (spec.md section 5: "a slow grader
    /// back-pressures the broker by filling its queue; the dispatcher then
    /// skips to the next grader").
    fn try_dispatch(&self, submission: Submission) -> Result<(), Submission> {
        self.queue.try_send(submission).map_err(|err| match err {
            mpsc::error::TrySendError::Full(s) | mpsc::error::TrySendError::Closed(s) => s,
        })
    }
}

/// Append-only list of attached graders plus a round-robin cursor
/// (spec.md section 4.5 "Registry"/"Dispatch").
#[derive(Default)]
pub struct Registry {
    graders:  HashMap<u64, GraderRegistration>,
    order:    Vec<u64>,
    next_id:  u64,
    cursor:   usize,
}

impl Registry {
    /// Returns the new grader's id, the receiving half of its dispatch
    /// queue, and a clone of the sending half so the caller can watch for
    /// the attach RPC's stream going away via `Sender::closed`.
    pub fn register(&mut self, properties: GraderProperties) -> (u64, mpsc::Receiver<Submission>, mpsc::Sender<Submission>) {
        let id = self.next_id;
        self.next_id += 1;
        let (tx, rx) = mpsc::channel(64);
        let watch_handle = tx.clone();
        self.graders.insert(id, GraderRegistration { id, properties, queue: tx });
        self.order.push(id);
        (id, rx, watch_handle)
    }

    pub fn deregister(&mut self, id: u64) -> Option<GraderRegistration> {
        self.order.retain(|&gid| gid != id);
        self.graders.remove(&id)
    }

    /// Walks the registry once starting from `(cursor + 1) mod N`, dispatching
    /// to the first capable grader (spec.md section 4.5 "Dispatch"). Returns
    /// the grader name the submission was sent to, or `None` if no attached
    /// grader currently qualifies.
    pub fn dispatch(&mut self, mut submission: Submission, requirement: &CapabilityRequirement) -> Option<String> {
        let n = self.order.len();
        if n == 0 {
            return None;
        }
        for step in 0..n {
            let idx = (self.cursor + 1 + step) % n;
            let id = self.order[idx];
            let Some(registration) = self.graders.get(&id) else { continue };
            if !requirement.satisfied_by(&registration.properties.platform) {
                continue;
            }
            let name = registration.properties.name.clone();
            match registration.try_dispatch(submission) {
                Ok(()) => {
                    self.cursor = idx;
                    return Some(name);
                }
                Err(returned) => {
                    submission = returned;
                }
            }
        }
        None
    }
}

impl CapabilityRequirement {
    /// spec.md section 4.5 dispatch predicate: platform arch (unless the
    /// problem specifies `ANY`), OS family (`POSIX` meaning "anything but
    /// Windows"), and every required runtime tag present in the grader's
    /// supported list.
    #[must_use]
    pub fn satisfied_by(&self, platform: &Option<arbiter_api::Platform>) -> bool {
        let Some(platform) = platform else { return false };
        if let Some(required_arch) = self.required_arch {
            if required_arch != Arch::Any && platform.arch() != required_arch {
                return false;
            }
        }
        if let Some(required_os) = self.required_os {
            let os_matches = match required_os {
                Os::Any => true,
                Os::Posix => platform.os() != Os::Windows,
                other => platform.os() == other,
            };
            if !os_matches {
                return false;
            }
        }
        self.required_runtimes
            .iter()
            .all(|tag| tag.starts_with("default") || platform.runtimes.iter().any(|r| r == tag))
    }
}
