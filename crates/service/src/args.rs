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

use clap::Parser;

/// The fixed C1 command-line contract (spec.md section 4.1): config/log/pid
/// paths, plus an optional instance name. Every backend service binary
/// `#[derive(Parser)]`s this as a flattened field.
#[derive(Parser, Debug, Clone)]
pub struct ServiceArgs {
    /// Path to this service's own config file.
    #[arg(long)]
    pub config: PathBuf,

    /// Path to append this service's log output to.
    #[arg(long)]
    pub log: PathBuf,

    /// Path to write this service's PID to on startup.
    #[arg(long)]
    pub pid: PathBuf,

    /// Name of the instance this service belongs to, when instantiated by
    /// the supervisor as part of a named instance.
    #[arg(long)]
    pub instance: Option<String>,
}
