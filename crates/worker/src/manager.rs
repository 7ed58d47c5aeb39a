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

use std::{
    collections::HashMap,
    sync::{Arc, atomic::AtomicBool},
    time::Duration,
};

use tokio::{sync::Notify, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    builder::{SpawnResult, TriggerNotSet, WorkerBuilder},
    config::WorkerConfig,
    context::WorkerContext,
    driver::TriggerDriverEnum,
    id::WorkerId,
    metrics::{
        WORKER_ACTIVE, WORKER_EXECUTION_DURATION_SECONDS, WORKER_EXECUTIONS, WORKER_STARTED,
        WORKER_STOPPED,
    },
    trigger::{PauseMode, Trigger},
    worker::Worker,
};

struct WorkerEntry {
    name: &'static str,
    join: JoinHandle<()>,
}

/// Manages the lifecycle of background workers sharing state `S`.
///
/// Every worker spawned through [`Manager::worker`] receives a clone of `S`
/// in its [`WorkerContext`], plus a cancellation token scoped to this
/// manager's [`Manager::shutdown`].
pub struct Manager<S = ()> {
    state:            S,
    cancel_token:     CancellationToken,
    runtime:          Option<Arc<arbiter_runtime::Runtime>>,
    shutdown_timeout: Duration,
    workers:          HashMap<WorkerId, WorkerEntry>,
}

impl Manager<()> {
    /// Creates a manager with no shared state and default configuration.
    #[must_use]
    pub fn new() -> Self { Self::with_state(()) }
}

impl<S: Clone + Send + Sync + 'static> Manager<S> {
    /// Creates a manager carrying `state`, shared with every worker's
    /// [`WorkerContext`].
    #[must_use]
    pub fn with_state(state: S) -> Self { Self::with_config(state, WorkerConfig::builder().build()) }

    /// Creates a manager with explicit runtime/shutdown configuration.
    #[must_use]
    pub fn with_config(state: S, config: WorkerConfig) -> Self {
        Manager {
            state,
            cancel_token: CancellationToken::new(),
            runtime: config.runtime(),
            shutdown_timeout: config.shutdown_timeout(),
            workers: HashMap::new(),
        }
    }

    /// Begins configuring a new worker. Chain trigger/name/blocking methods
    /// on the returned builder, then call `spawn()`.
    pub fn worker<W: Worker>(&mut self, worker: W) -> WorkerBuilder<'_, S, W, TriggerNotSet> {
        WorkerBuilder::new(self, worker)
    }

    pub(crate) fn spawn_worker<W, H>(
        &mut self,
        mut worker: W,
        name: &'static str,
        blocking: bool,
        pause_mode: PauseMode,
        trigger: Trigger,
    ) -> H
    where
        W: Worker,
        H: SpawnResult,
    {
        let id = WorkerId::new();
        let notify = Arc::new(Notify::new());
        let paused = Arc::new(AtomicBool::new(false));
        let worker_cancel = self.cancel_token.child_token();
        let ctx = WorkerContext::new(name, self.state.clone(), worker_cancel, notify.clone());
        let mut driver: TriggerDriverEnum = trigger.into();
        let paused_for_task = paused.clone();

        let task = async move {
            info!(worker = name, "worker starting");
            WORKER_STARTED.with_label_values(&[name]).inc();
            WORKER_ACTIVE.with_label_values(&[name]).set(1);

            worker.on_start(ctx.clone()).await;

            loop {
                if pause_mode == PauseMode::Hard
                    && paused_for_task.load(std::sync::atomic::Ordering::Acquire)
                {
                    tokio::select! {
                        () = ctx.notified() => continue,
                        () = ctx.cancelled() => break,
                    }
                }
                if !driver.wait_next(&ctx).await {
                    break;
                }
                if paused_for_task.load(std::sync::atomic::Ordering::Acquire) {
                    continue;
                }
                let start = std::time::Instant::now();
                worker.work(ctx.clone()).await;
                WORKER_EXECUTIONS.with_label_values(&[name]).inc();
                WORKER_EXECUTION_DURATION_SECONDS
                    .with_label_values(&[name])
                    .observe(start.elapsed().as_secs_f64());
            }

            worker.on_shutdown(ctx.clone()).await;
            info!(worker = name, "worker stopped");
            WORKER_STOPPED.with_label_values(&[name]).inc();
            WORKER_ACTIVE.with_label_values(&[name]).set(0);
        };

        let runtime = self
            .runtime
            .clone()
            .unwrap_or_else(arbiter_runtime::background_runtime);

        let join = if blocking {
            let handle = runtime.handle().clone();
            runtime.handle().spawn_blocking(move || handle.block_on(task))
        } else {
            runtime.handle().spawn(task)
        };

        self.workers.insert(id, WorkerEntry { name, join });
        H::from_parts(id, name, notify, paused)
    }

    /// Number of workers currently registered.
    #[must_use]
    pub fn worker_count(&self) -> usize { self.workers.len() }

    /// Ids of every registered worker spawned with the given `name`.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Vec<WorkerId> {
        self.workers
            .iter()
            .filter(|(_, entry)| entry.name == name)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Aborts a worker's task without waiting for it to finish or removing it
    /// from the registry.
    ///
    /// Returns `true` if `id` is (or still was) registered. Unlike
    /// [`Manager::remove`], the registry entry is left in place, so the
    /// worker still counts towards [`Manager::worker_count`] and will be
    /// awaited normally by [`Manager::shutdown`].
    pub fn terminate(&self, id: WorkerId) -> bool {
        match self.workers.get(&id) {
            Some(entry) => {
                entry.join.abort();
                true
            }
            None => false,
        }
    }

    /// Cancels and waits for a single worker, removing it from the registry.
    ///
    /// Returns the worker's name, or `None` if `id` is not (or is no longer)
    /// registered.
    pub async fn remove(&mut self, id: WorkerId) -> Option<&'static str> {
        let entry = self.workers.remove(&id)?;
        let name = entry.name;
        entry.join.abort();
        let _ = entry.join.await;
        Some(name)
    }

    /// Gracefully shuts down every registered worker.
    ///
    /// Cancels all workers and waits for them to finish within the
    /// configured timeout. Workers not responding in time are aborted.
    pub async fn shutdown(mut self) {
        info!("shutting down worker manager");
        self.cancel_token.cancel();

        let deadline = tokio::time::Instant::now() + self.shutdown_timeout;
        let mut aborted = 0usize;
        let total = self.workers.len();

        for (_, entry) in self.workers.drain() {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let name = entry.name;
            if tokio::time::timeout(remaining, entry.join).await.is_err() {
                aborted += 1;
                error!(worker = name, "worker did not shut down within the timeout");
            }
        }

        if aborted > 0 {
            error!(stopped = total - aborted, aborted, "worker manager shutdown complete");
        } else {
            info!(stopped = total, "worker manager shutdown complete");
        }
    }
}
