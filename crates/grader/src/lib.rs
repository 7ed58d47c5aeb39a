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

//! Grader worker (C5, spec.md section 4.4): attaches to the submission
//! broker over a long-lived streaming RPC, runs each received submission
//! through a fixed style/build/test pipeline, and reports the verdict back.

pub mod attach;
pub mod build;
pub mod checker;
pub mod config;
pub mod course_cache;
pub mod error;
pub mod pipeline;
pub mod style;
pub mod testrun;
pub mod workspace;

pub use attach::AttachWorker;
pub use config::GraderConfig;
pub use course_cache::CourseCache;
