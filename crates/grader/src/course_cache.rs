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

//! spec.md section 4.4.2 "Course data caching": each grader caches full
//! course content keyed by `course_data_id` with a `last_modified` stamp;
//! each fetch sends the cached stamp and the server returns either a fresh
//! bundle or `changed = false`. `course_data_id` is the submission's
//! `course_id` rendered as a string — the wire contract only ever named
//! `course_id` on `Submission` and `course_data_id` on the cache-lookup
//! request, and nothing else in the corpus introduces a second identifier,
//! so this grader treats them as the same value (see DESIGN.md).

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use arbiter_api::{CourseContentBundle, course_content_client::CourseContentClient};
use prost::Message;
use tokio::sync::Mutex;
use tracing::debug;

use snafu::ResultExt;

use crate::error::{CourseContentDialSnafu, CourseContentRpcSnafu, CourseContentUnavailableSnafu, DecodeSnafu, PipelineResult};

struct CacheEntry {
    bundle:        Arc<CourseContentBundle>,
    last_modified: i64,
}

/// Dials `CourseContent` lazily and caches the decoded bundle per course.
pub struct CourseCache {
    socket:  Option<PathBuf>,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl CourseCache {
    #[must_use]
    pub fn new(socket: Option<PathBuf>) -> Self { Self { socket, entries: Mutex::new(HashMap::new()) } }

    /// Returns the cached bundle for `course_data_id`, refreshing it from
    /// `CourseContent` first if the socket is configured.
    pub async fn get(&self, course_data_id: &str) -> PipelineResult<Arc<CourseContentBundle>> {
        let Some(socket) = self.socket.clone() else {
            return CourseContentUnavailableSnafu { course_data_id }.fail();
        };

        let cached_timestamp = {
            let entries = self.entries.lock().await;
            entries.get(course_data_id).map(|entry| entry.last_modified).unwrap_or(0)
        };

        let channel = arbiter_server::grpc::connect_uds(socket).await.context(CourseContentDialSnafu)?;
        let mut client = CourseContentClient::new(channel);
        let request = arbiter_api::CourseContentRequest { course_data_id: course_data_id.to_string(), cached_timestamp };
        let response = client.get_course_full_content(request).await.context(CourseContentRpcSnafu)?.into_inner();

        if response.changed {
            let bundle = CourseContentBundle::decode(response.data.as_slice()).context(DecodeSnafu)?;
            debug!(course_data_id, last_modified = response.last_modified, "course content refreshed");
            let mut entries = self.entries.lock().await;
            let bundle = Arc::new(bundle);
            entries.insert(course_data_id.to_string(), CacheEntry { bundle: bundle.clone(), last_modified: response.last_modified });
            return Ok(bundle);
        }

        let entries = self.entries.lock().await;
        entries
            .get(course_data_id)
            .map(|entry| entry.bundle.clone())
            .ok_or_else(|| CourseContentUnavailableSnafu { course_data_id }.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_socket_fails_fast() {
        let cache = CourseCache::new(None);
        let err = cache.get("42").await.unwrap_err();
        assert!(matches!(err, crate::error::PipelineError::CourseContentUnavailable { .. }));
    }
}
