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

//! spec.md section 4.4.2 step 3: build-target synthesis and invocation.

use std::path::Path;

use arbiter_api::{BuildTarget, ProblemGradingOptions, Submission};
use snafu::ResultExt;
use tokio::process::Command;

use crate::error::{PipelineResult, SpawnSnafu};

/// Either every build target linked cleanly, or the first failing target's
/// combined stdout/stderr is returned as the build report (spec.md section
/// 4.4.2 step 3: "any non-zero exit short-circuits to `COMPILATION_ERROR`
/// with the captured combined output as the build report").
pub enum BuildOutcome {
    Success,
    Failed { report: String },
}

/// One source file per declared runtime when the problem specifies no
/// explicit targets (spec.md section 4.4.2 step 3).
pub fn synthesize_targets(options: &ProblemGradingOptions, submission: &Submission) -> Vec<BuildTarget> {
    if !options.targets.is_empty() {
        return options.targets.clone();
    }

    let sources: Vec<&str> = submission.solution_files.iter().map(|f| f.name.as_str()).collect();
    options
        .required_runtimes
        .iter()
        .map(|runtime| synthesize_one(runtime, &sources, options))
        .collect()
}

fn synthesize_one(runtime: &str, sources: &[&str], options: &ProblemGradingOptions) -> BuildTarget {
    let target_name = format!("solution-{runtime}");

    if sources.iter().any(|s| s.ends_with(".go")) {
        return BuildTarget {
            name:    target_name.clone(),
            command: vec!["sh".into(), "-c".into(), format!("go generate && go get && go build -o {target_name}")],
        };
    }

    let compiler = if sources.iter().any(|s| s.ends_with(".cpp") || s.ends_with(".cc")) { "g++" } else { "gcc" };
    let mut command = vec![compiler.to_string()];
    command.extend(sources.iter().map(|s| s.to_string()));
    command.extend(options.extra_compile_flags.iter().cloned());
    command.extend(sanitizer_flags(runtime));
    command.push("-o".into());
    command.push(target_name.clone());
    command.extend(options.extra_link_flags.iter().cloned());

    let command = toolchain_prefix(runtime, command);
    BuildTarget { name: target_name, command }
}

/// spec.md section 4.4.2 step 3: "for cross-runtimes (`wine`, `qemu-arm`),
/// prefix the toolchain accordingly and suppress sanitizers; for valgrind
/// runtime suppress the address sanitizer; otherwise attach
/// `-fsanitize=undefined` and `-fsanitize=address`."
fn sanitizer_flags(runtime: &str) -> Vec<String> {
    match runtime {
        "wine" | "qemu-arm" => vec![],
        "valgrind" => vec!["-fsanitize=undefined".into()],
        _ => vec!["-fsanitize=undefined".into(), "-fsanitize=address".into()],
    }
}

/// Cross-runtime toolchains compile with a runtime-specific cross compiler
/// rather than running under an emulator at build time, so `wine`/`qemu-arm`
/// prefix the *compiler* name; `valgrind` builds natively and only the test
/// run (see `testrun.rs`) is prefixed.
fn toolchain_prefix(runtime: &str, mut command: Vec<String>) -> Vec<String> {
    match runtime {
        "wine" => {
            command[0] = "i686-w64-mingw32-g++".into();
            command
        }
        "qemu-arm" => {
            command[0] = "arm-linux-gnueabihf-g++".into();
            command
        }
        _ => command,
    }
}

/// Runs every target to completion, stopping at the first non-zero exit.
pub async fn build_all(targets: &[BuildTarget], workspace: &Path) -> PipelineResult<BuildOutcome> {
    for target in targets {
        let Some((program, args)) = target.command.split_first() else { continue };
        let output = Command::new(program)
            .args(args)
            .current_dir(workspace)
            .output()
            .await
            .context(SpawnSnafu { command: target.command.join(" ") })?;
        if !output.status.success() {
            let mut report = String::from_utf8_lossy(&output.stdout).into_owned();
            report.push_str(&String::from_utf8_lossy(&output.stderr));
            return Ok(BuildOutcome::Failed { report });
        }
    }
    Ok(BuildOutcome::Success)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sanitizers_attached_for_native_runtime() {
        let flags = sanitizer_flags("default-linux");
        assert_eq!(flags, vec!["-fsanitize=undefined", "-fsanitize=address"]);
    }

    #[test]
    fn valgrind_suppresses_only_address_sanitizer() {
        let flags = sanitizer_flags("valgrind");
        assert_eq!(flags, vec!["-fsanitize=undefined"]);
    }

    #[test]
    fn cross_runtimes_suppress_all_sanitizers() {
        assert!(sanitizer_flags("wine").is_empty());
        assert!(sanitizer_flags("qemu-arm").is_empty());
    }

    #[test]
    fn explicit_targets_are_used_verbatim() {
        let options = ProblemGradingOptions { targets: vec![BuildTarget { name: "t".into(), command: vec!["make".into()] }], ..Default::default() };
        let submission = Submission::default();
        let targets = synthesize_targets(&options, &submission);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].name, "t");
    }

    #[test]
    fn go_sources_get_the_go_build_incantation() {
        let options = ProblemGradingOptions { required_runtimes: vec!["default-linux".into()], ..Default::default() };
        let submission = Submission {
            solution_files: vec![arbiter_api::SolutionFile { name: "main.go".into(), content: vec![], description: None }],
            ..Default::default()
        };
        let targets = synthesize_targets(&options, &submission);
        assert_eq!(targets.len(), 1);
        assert!(targets[0].command.iter().any(|arg| arg.contains("go build")));
    }
}
