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

//! spec.md section 4.4.2 step 2: "for each solution file whose suffix
//! matches a configured code style, invoke the style tool; record the
//! first failing file."

use std::path::Path;

use arbiter_api::Submission;
use snafu::ResultExt;
use tokio::process::Command;

use crate::error::{PipelineResult, SpawnSnafu};

/// Returns the name of the first solution file that fails the style tool,
/// or `None` if every matching file passes (or no suffix is configured).
pub async fn check(style_tool: &str, code_style_suffix: &str, workspace: &Path, submission: &Submission) -> PipelineResult<Option<String>> {
    if code_style_suffix.is_empty() {
        return Ok(None);
    }

    for file in &submission.solution_files {
        if !file.name.ends_with(code_style_suffix) {
            continue;
        }
        let status = Command::new(style_tool)
            .arg(workspace.join(&file.name))
            .current_dir(workspace)
            .status()
            .await
            .context(SpawnSnafu { command: style_tool.to_string() })?;
        if !status.success() {
            return Ok(Some(file.name.clone()));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_suffix_skips_style_check() {
        let dir = tempfile::tempdir().unwrap();
        let submission = Submission { solution_files: vec![], ..Default::default() };
        let result = check("cpplint", "", dir.path(), &submission).await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn non_matching_suffix_is_never_invoked() {
        let dir = tempfile::tempdir().unwrap();
        let submission = Submission {
            solution_files: vec![arbiter_api::SolutionFile { name: "main.py".into(), content: vec![], description: None }],
            ..Default::default()
        };
        // "/nonexistent-style-tool" would fail to spawn if it were ever
        // invoked; since the only solution file doesn't end in ".cpp" it
        // never is.
        let result = check("/nonexistent-style-tool", ".cpp", dir.path(), &submission).await.unwrap();
        assert_eq!(result, None);
    }
}
