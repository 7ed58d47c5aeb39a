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

use lazy_static::lazy_static;
use prometheus::*;

pub const WORKER_LABEL: &str = "worker";

lazy_static! {
    pub static ref WORKER_STARTED: IntCounterVec = register_int_counter_vec!(
        "worker_started_total",
        "Total number of workers started",
        &[WORKER_LABEL]
    )
    .unwrap();
    pub static ref WORKER_STOPPED: IntCounterVec = register_int_counter_vec!(
        "worker_stopped_total",
        "Total number of workers stopped gracefully",
        &[WORKER_LABEL]
    )
    .unwrap();
    pub static ref WORKER_EXECUTIONS: IntCounterVec = register_int_counter_vec!(
        "worker_executions_total",
        "Total number of worker executions",
        &[WORKER_LABEL]
    )
    .unwrap();
    pub static ref WORKER_PAUSED: IntCounterVec = register_int_counter_vec!(
        "worker_paused_total",
        "Total number of times workers were paused",
        &[WORKER_LABEL]
    )
    .unwrap();
    pub static ref WORKER_RESUMED: IntCounterVec = register_int_counter_vec!(
        "worker_resumed_total",
        "Total number of times workers were resumed",
        &[WORKER_LABEL]
    )
    .unwrap();
    pub static ref WORKER_ACTIVE: IntGaugeVec = register_int_gauge_vec!(
        "worker_active",
        "Whether the worker is currently active (1) or not (0)",
        &[WORKER_LABEL]
    )
    .unwrap();
    pub static ref WORKER_EXECUTION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "worker_execution_duration_seconds",
        "Worker execution duration in seconds",
        &[WORKER_LABEL]
    )
    .unwrap();
}
