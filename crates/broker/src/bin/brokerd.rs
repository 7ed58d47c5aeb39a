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

//! Submission broker daemon entry point (spec.md sections 4.1, 4.5): a
//! regular C1 backend service, spawned and lifecycle-managed by the
//! supervisor like any other instance member.

use std::{process::ExitCode, sync::Arc, time::Duration};

use arbiter_broker::{BrokerConfig, BrokerService, InMemoryCatalog, InMemoryStore};
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
            error!(%err, "failed to bootstrap broker");
            return ExitCode::from(1);
        }
    };

    let config = match load_config(skeleton.config_path()) {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "failed to load broker config");
            return ExitCode::from(1);
        }
    };

    // Course-content ingestion is out of core scope (spec.md section 1):
    // capability requirements default to "no requirements" for every
    // problem id until a real catalog is wired in front of this service.
    let store = Arc::new(InMemoryStore::new());
    let catalog = Arc::new(InMemoryCatalog::new());
    let broker = Arc::new(BrokerService::new(store, catalog, config.max_submissions_per_hour));

    if let Err(err) = skeleton.serve(config.socket, vec![broker]).await {
        error!(%err, "broker exited");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

fn load_config(path: &std::path::Path) -> std::io::Result<BrokerConfig> {
    let text = std::fs::read_to_string(path)?;
    toml::from_str(&text).map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
}
