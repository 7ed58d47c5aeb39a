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

//! spec.md section 4.4.2 step 1: materialise a submission's workspace.

use std::path::{Path, PathBuf};

use arbiter_api::{CourseContentBundle, Submission};
use snafu::ResultExt;
use tokio::fs;

use crate::error::{PipelineResult, WorkspaceSnafu};

/// `<working_dir>/<submission-id>/`, with every course style-reference
/// file, grader-side helper file, and solution file written under it.
pub async fn materialize(working_dir: &Path, submission: &Submission, bundle: &CourseContentBundle) -> PipelineResult<PathBuf> {
    let root = working_dir.join(submission.id.to_string());
    fs::create_dir_all(&root).await.context(WorkspaceSnafu { path: root.clone() })?;

    for (relative, bytes) in &bundle.style_reference_files {
        write_under(&root, relative, bytes).await?;
    }
    for (relative, bytes) in &bundle.helper_files {
        write_under(&root, relative, bytes).await?;
    }
    for file in &submission.solution_files {
        write_under(&root, &file.name, &file.content).await?;
    }

    Ok(root)
}

async fn write_under(root: &Path, relative: &str, bytes: &[u8]) -> PipelineResult<()> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.context(WorkspaceSnafu { path: parent.to_path_buf() })?;
    }
    fs::write(&path, bytes).await.context(WorkspaceSnafu { path })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use arbiter_api::SolutionFile;

    use super::*;

    #[tokio::test]
    async fn writes_solution_style_and_helper_files_under_submission_root() {
        let dir = tempfile::tempdir().unwrap();
        let submission = Submission {
            id: 7,
            solution_files: vec![SolutionFile { name: "main.cpp".into(), content: b"int main(){}".to_vec(), description: None }],
            ..Default::default()
        };
        let bundle = CourseContentBundle {
            problems: HashMap::new(),
            style_reference_files: HashMap::from([(".clang-format".to_string(), b"BasedOnStyle: Google".to_vec())]),
            helper_files: HashMap::from([("helpers/io.h".to_string(), b"#pragma once".to_vec())]),
        };

        let root = materialize(dir.path(), &submission, &bundle).await.unwrap();
        assert_eq!(root, dir.path().join("7"));
        assert_eq!(fs::read(root.join("main.cpp")).await.unwrap(), b"int main(){}");
        assert_eq!(fs::read(root.join(".clang-format")).await.unwrap(), b"BasedOnStyle: Google");
        assert_eq!(fs::read(root.join("helpers/io.h")).await.unwrap(), b"#pragma once");
    }
}
