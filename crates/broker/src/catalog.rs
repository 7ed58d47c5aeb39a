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

use arbiter_api::{Arch, Os};

/// The subset of `ProblemGradingOptions` (spec.md section 3) the dispatcher
/// needs to pick a capable grader. Course-content ingestion is out of core
/// scope (spec.md section 1), so the broker only ever asks a `ProblemCatalog`
/// for this projection rather than owning the full problem definition.
#[derive(Clone, Debug, Default)]
pub struct CapabilityRequirement {
    pub required_arch:     Option<Arch>,
    pub required_os:       Option<Os>,
    pub required_runtimes: Vec<String>,
}

/// Resolves a problem id to its dispatch requirements. The master service
/// (out of core scope) owns the real course-content store; this trait is
/// the seam the broker consumes it through.
pub trait ProblemCatalog: Send + Sync {
    fn requirements(&self, problem_id: &str) -> CapabilityRequirement;
}

/// Test/standalone-deployment catalog: an explicit map, defaulting to "no
/// requirements" (any grader qualifies) for unknown problem ids.
#[derive(Default)]
pub struct InMemoryCatalog(HashMap<String, CapabilityRequirement>);

impl InMemoryCatalog {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, problem_id: impl Into<String>, requirement: CapabilityRequirement) {
        self.0.insert(problem_id.into(), requirement);
    }
}

impl ProblemCatalog for InMemoryCatalog {
    fn requirements(&self, problem_id: &str) -> CapabilityRequirement { self.0.get(problem_id).cloned().unwrap_or_default() }
}
