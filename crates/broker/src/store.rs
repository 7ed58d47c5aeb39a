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
    sync::atomic::{AtomicI64, Ordering},
};

use arbiter_api::{SolutionStatus, Submission};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Persistence boundary (spec.md section 6 "Persisted state"): the
/// relational schema itself is out of core scope, so the broker only ever
/// needs these operations against whatever backs submission storage.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn insert_submitted(&self, submission: Submission) -> Submission;

    async fn get(&self, id: i64) -> Option<Submission>;

    /// Persists a wholesale replacement (grader output, dispatch-time
    /// status flips).
    async fn update(&self, submission: Submission) -> Submission;

    async fn fetch_submitted(&self) -> Vec<Submission>;

    /// spec.md section 4.5 "Deregistration ... bulk-updates any of its
    /// in-flight submissions back to SUBMITTED".
    async fn rollback_in_flight_for_grader(&self, grader_name: &str) -> Vec<Submission>;

    /// Timestamps of submissions by this `(user, course, problem)` since
    /// `since` (inclusive), for the rate limiter.
    async fn recent_timestamps(&self, user_id: i64, course_id: i64, problem_id: &str, since: i64) -> Vec<i64>;
}

/// In-process store for tests and standalone deployment. Not durable across
/// restarts, unlike the relational schema spec.md section 6 assumes.
#[derive(Default)]
pub struct InMemoryStore {
    submissions: Mutex<HashMap<i64, Submission>>,
    next_id:     AtomicI64,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl SubmissionStore for InMemoryStore {
    async fn insert_submitted(&self, mut submission: Submission) -> Submission {
        submission.id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        submission.status = SolutionStatus::Submitted.into();
        self.submissions.lock().await.insert(submission.id, submission.clone());
        submission
    }

    async fn get(&self, id: i64) -> Option<Submission> { self.submissions.lock().await.get(&id).cloned() }

    async fn update(&self, submission: Submission) -> Submission {
        self.submissions.lock().await.insert(submission.id, submission.clone());
        submission
    }

    async fn fetch_submitted(&self) -> Vec<Submission> {
        self.submissions
            .lock()
            .await
            .values()
            .filter(|s| s.status() == SolutionStatus::Submitted)
            .cloned()
            .collect()
    }

    async fn rollback_in_flight_for_grader(&self, grader_name: &str) -> Vec<Submission> {
        let mut guard = self.submissions.lock().await;
        let mut rolled_back = Vec::new();
        for submission in guard.values_mut() {
            let in_flight = matches!(
                submission.status(),
                SolutionStatus::GraderAssigned | SolutionStatus::GradeInProgress
            );
            if in_flight && submission.grader_name == grader_name {
                submission.status = SolutionStatus::Submitted.into();
                rolled_back.push(submission.clone());
            }
        }
        rolled_back
    }

    async fn recent_timestamps(&self, user_id: i64, course_id: i64, problem_id: &str, since: i64) -> Vec<i64> {
        self.submissions
            .lock()
            .await
            .values()
            .filter(|s| s.user_id == user_id && s.course_id == course_id && s.problem_id == problem_id && s.timestamp >= since)
            .map(|s| s.timestamp)
            .collect()
    }
}
