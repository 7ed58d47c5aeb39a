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

//! spec.md section 4.4.2 step 4: run each `(runtime, test-case)` pair under
//! a deadline and capture its output for the checker.

use std::{path::Path, process::Stdio, time::Duration};

use arbiter_api::{GradingLimits, TestCase};
use snafu::ResultExt;
use tokio::{io::AsyncWriteExt, process::Command};

use crate::error::{PipelineResult, SpawnSnafu};

pub struct RunOutcome {
    pub exited:      bool,
    pub exit_status: i32,
    pub stdout:      Vec<u8>,
    pub stderr:      Vec<u8>,
}

/// Builds the program invocation for one runtime (spec.md section 4.4.2
/// step 4): native runtimes invoke the built artifact directly; `valgrind`
/// and `qemu-arm` prefix the artifact with their own wrapper flags; `wine`
/// (or a Windows host) only needs argument path-separator conversion, which
/// has no effect on POSIX-style arguments this pipeline ever constructs, so
/// it is a no-op prefix.
pub fn resolve_invocation(runtime: &str, artifact: &Path, limits: &GradingLimits) -> (String, Vec<String>) {
    match runtime {
        "valgrind" => ("valgrind".into(), vec!["--tool=memcheck".into(), "--leak-check=full".into(), artifact.display().to_string()]),
        "qemu-arm" => {
            let stack_bytes = (limits.stack_mb.max(1) * 1024 * 1024).to_string();
            ("qemu-arm".into(), vec!["-s".into(), stack_bytes, artifact.display().to_string()])
        }
        _ => (artifact.display().to_string(), vec![]),
    }
}

/// Launches the resolved invocation in `test_dir`, writing `stdin` and
/// killing the process tree if `real_time_limit_sec` elapses first.
pub async fn run_test_case(program: &str, args: &[String], test_case: &TestCase, test_dir: &Path, limits: &GradingLimits) -> PipelineResult<RunOutcome> {
    let mut command = Command::new(program);
    command
        .args(args)
        .args(&test_case.command_line_arguments)
        .current_dir(test_dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().context(SpawnSnafu { command: program.to_string() })?;

    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.write_all(&test_case.stdin).await;
    }

    let deadline = Duration::from_secs(u64::from(limits.real_time_limit_sec.max(1)));
    match tokio::time::timeout(deadline, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(RunOutcome {
            exited:      output.status.code().is_some(),
            exit_status: output.status.code().unwrap_or(-1),
            stdout:      output.stdout,
            stderr:      output.stderr,
        }),
        Ok(Err(err)) => Err(err).context(SpawnSnafu { command: program.to_string() }),
        Err(_elapsed) => Ok(RunOutcome { exited: false, exit_status: -1, stdout: Vec::new(), stderr: Vec::new() }),
    }
}

/// Materialises the test case's extra input files under its own
/// subdirectory (spec.md section 4.4.2 step 4).
pub async fn prepare_test_dir(workspace: &Path, test_case: &TestCase) -> PipelineResult<std::path::PathBuf> {
    let dir = workspace.join(format!("test-{}", test_case.number));
    tokio::fs::create_dir_all(&dir).await.context(crate::error::WorkspaceSnafu { path: dir.clone() })?;
    for (name, bytes) in &test_case.extra_input_files {
        let path = dir.join(name);
        tokio::fs::write(&path, bytes).await.context(crate::error::WorkspaceSnafu { path })?;
    }
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valgrind_invocation_carries_memcheck_flags() {
        let (program, args) = resolve_invocation("valgrind", Path::new("/tmp/solution"), &GradingLimits::default());
        assert_eq!(program, "valgrind");
        assert_eq!(args, vec!["--tool=memcheck", "--leak-check=full", "/tmp/solution"]);
    }

    #[test]
    fn qemu_arm_invocation_carries_stack_size() {
        let limits = GradingLimits { stack_mb: 8, ..Default::default() };
        let (program, args) = resolve_invocation("qemu-arm", Path::new("/tmp/solution"), &limits);
        assert_eq!(program, "qemu-arm");
        assert_eq!(args, vec!["-s", &(8 * 1024 * 1024).to_string(), "/tmp/solution"]);
    }

    #[test]
    fn native_runtime_invokes_artifact_directly() {
        let (program, args) = resolve_invocation("default-linux", Path::new("/tmp/solution"), &GradingLimits::default());
        assert_eq!(program, "/tmp/solution");
        assert!(args.is_empty());
    }

    #[tokio::test]
    async fn timed_out_process_reports_not_exited() {
        let outcome = run_test_case(
            "sleep",
            &["5".to_string()],
            &TestCase::default(),
            &std::env::temp_dir(),
            &GradingLimits { real_time_limit_sec: 1, ..Default::default() },
        )
        .await
        .unwrap();
        assert!(!outcome.exited);
    }
}
