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

//! spec.md section 4.4.2: the five-step per-submission pipeline, run
//! strictly serially (spec.md section 5: "Grader worker: strictly serial
//! per worker").

use std::path::Path;

use arbiter_api::{Submission, SolutionStatus, TestResult};
use tracing::{info, warn};

use crate::{
    build::{self, BuildOutcome},
    checker,
    config::GraderConfig,
    course_cache::CourseCache,
    style, testrun, workspace,
};

/// Runs one submission through every stage, filling in `status`,
/// `build_report`, `style_failed_file`, and `test_results`. Never returns
/// an `Err`: a pipeline-internal failure (course content unreachable,
/// workspace I/O) is itself reported as `VERY_BAD` with the failure
/// recorded in `build_report`, since the broker has nowhere else to learn
/// that this submission can't be graded right now (spec.md section 4.4.3
/// "success, style fail, build fail, or internal error" are all terminal).
pub async fn run(config: &GraderConfig, course_cache: &CourseCache, mut submission: Submission) -> Submission {
    let course_data_id = submission.course_id.to_string();

    let bundle = match course_cache.get(&course_data_id).await {
        Ok(bundle) => bundle,
        Err(err) => {
            warn!(%err, submission_id = submission.id, "course content unavailable");
            submission.status = SolutionStatus::VeryBad.into();
            submission.build_report = format!("course content unavailable: {err}");
            return submission;
        }
    };

    let Some(options) = bundle.problems.get(&submission.problem_id).cloned() else {
        submission.status = SolutionStatus::VeryBad.into();
        submission.build_report = format!("unknown problem id {}", submission.problem_id);
        return submission;
    };

    let workspace_root = match workspace::materialize(&config.working_dir, &submission, &bundle).await {
        Ok(root) => root,
        Err(err) => {
            warn!(%err, submission_id = submission.id, "workspace materialisation failed");
            submission.status = SolutionStatus::VeryBad.into();
            submission.build_report = format!("workspace error: {err}");
            return submission;
        }
    };

    match style::check(&config.style_tool, &options.code_style_suffix, &workspace_root, &submission).await {
        Ok(Some(failing_file)) => {
            submission.status = SolutionStatus::StyleCheckError.into();
            submission.style_failed_file = failing_file;
            return submission;
        }
        Ok(None) => {}
        Err(err) => {
            submission.status = SolutionStatus::VeryBad.into();
            submission.build_report = format!("style check error: {err}");
            return submission;
        }
    }

    let targets = build::synthesize_targets(&options, &submission);
    match build::build_all(&targets, &workspace_root).await {
        Ok(BuildOutcome::Failed { report }) => {
            submission.status = SolutionStatus::CompilationError.into();
            submission.build_report = report;
            return submission;
        }
        Ok(BuildOutcome::Success) => {}
        Err(err) => {
            submission.status = SolutionStatus::CompilationError.into();
            submission.build_report = format!("build error: {err}");
            return submission;
        }
    }

    let results = match run_tests(&options, &workspace_root, &targets).await {
        Ok(results) => results,
        Err(err) => {
            submission.status = SolutionStatus::VeryBad.into();
            submission.build_report = format!("test run error: {err}");
            return submission;
        }
    };

    let any_failed = results.iter().any(|r| !r.matched_reference);
    submission.status = if any_failed { SolutionStatus::VeryBad.into() } else { SolutionStatus::PendingReview.into() };
    submission.test_results = results;
    info!(submission_id = submission.id, status = ?submission.status(), "pipeline finished");
    submission
}

async fn run_tests(options: &arbiter_api::ProblemGradingOptions, workspace_root: &Path, targets: &[arbiter_api::BuildTarget]) -> crate::error::PipelineResult<Vec<TestResult>> {
    let mut results = Vec::new();
    let Some(checker) = options.checker.clone() else { return Ok(results) };

    let limits = options.limits.clone().unwrap_or_default();

    for runtime in &options.required_runtimes {
        let target_name = format!("solution-{runtime}");
        if !targets.iter().any(|t| t.name == target_name) {
            continue;
        }
        let artifact = workspace_root.join(&target_name);

        for test_case in &options.test_cases {
            let test_dir = testrun::prepare_test_dir(workspace_root, test_case).await?;
            let (program, args) = testrun::resolve_invocation(runtime, &artifact, &limits);
            let outcome = testrun::run_test_case(&program, &args, test_case, &test_dir, &limits).await?;

            let matched = outcome.exited && checker::matches(&checker, &outcome.stdout, &test_case.expected_stdout, &test_dir).await?;
            results.push(TestResult {
                target: target_name.clone(),
                test_number: test_case.number,
                exited: outcome.exited,
                exit_status: outcome.exit_status,
                stdout: outcome.stdout,
                stderr: outcome.stderr,
                matched_reference: matched,
            });
        }
    }

    Ok(results)
}
