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

/// Control-plane command sent to a service's owner task (spec.md section
/// 4.2, Design Notes section 9: "model each `ServiceDescriptor` as a small
/// state machine"). A single owner task per descriptor processes these over
/// an `mpsc` channel; exit and spawn-failure transitions are internal to
/// that task's own `tokio::select!` loop rather than routed back through
/// this channel, so the state machine has exactly one command type instead
/// of a full event enum mirroring every transition.
#[derive(Debug, Clone, Copy)]
pub enum Command {
    Start,
    Stop,
}
