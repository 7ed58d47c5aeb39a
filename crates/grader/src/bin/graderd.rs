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

//! Grader worker daemon entry point (spec.md section 4.4): a C1 process
//! with no listening socket of its own, started last within its instance
//! and stopped first (spec.md section 5 "Startup ordering").

use std::{process::ExitCode, sync::Arc, time::Duration};

use arbiter_grader::{AttachWorker, CourseCache, GraderConfig};
use arbiter_service::{ServiceArgs, ServiceSkeleton};
use clap::Parser;
use tracing::error;

const DRAIN_WINDOW: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> ExitCode {
    arbiter_telemetry::init_default_ut_logging();

    let args = ServiceArgs::parse();
    let skeleton = match ServiceSkeleton::bootstrap(args, DRAIN_WINDOW) {
        Ok(skeleton) => skeleton,
        Err(err) => {
            error!(%err, "failed to bootstrap grader");
            return ExitCode::from(1);
        }
    };

    let config = match load_config(skeleton.config_path()) {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "failed to load grader config");
            return ExitCode::from(1);
        }
    };

    let course_cache = Arc::new(CourseCache::new(config.course_content_socket.clone()));
    let worker = AttachWorker { config: Arc::new(config), course_cache };

    if let Err(err) = skeleton.serve_worker(worker, "grader-attach").await {
        error!(%err, "grader exited");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

fn load_config(path: &std::path::Path) -> std::io::Result<GraderConfig> {
    let text = std::fs::read_to_string(path)?;
    toml::from_str(&text).map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
}
