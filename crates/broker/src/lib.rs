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

//! Submission broker (C6): matches submitted solutions to attached graders
//! by capability, round-robins dispatch among qualifying graders, and
//! rolls in-flight work back to `SUBMITTED` when a grader disconnects
//! (spec.md section 4.5).

mod catalog;
mod config;
mod ratelimit;
mod registry;
mod service;
mod store;

pub use catalog::{CapabilityRequirement, InMemoryCatalog, ProblemCatalog};
pub use config::BrokerConfig;
pub use service::BrokerService;
pub use store::{InMemoryStore, SubmissionStore};
