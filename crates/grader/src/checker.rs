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

//! spec.md section 4.4.2 step 4: "the selected checker (standard int/float
//! /long/double, or a custom python checker invoked via a wrapper) matches
//! observed vs. reference."

use std::{path::Path, process::Stdio};

use arbiter_api::{Checker, CheckerKind};
use snafu::ResultExt;
use tokio::process::Command;

use crate::error::{PipelineResult, SpawnSnafu};

/// Compares `observed` against `expected` per the problem's configured
/// checker. A process exit that isn't itself a normal exit never reaches
/// this function (the pipeline treats it as a non-match directly).
pub async fn matches(checker: &Checker, observed: &[u8], expected: &[u8], workspace: &Path) -> PipelineResult<bool> {
    match checker.kind() {
        CheckerKind::Custom => run_custom(&checker.custom_source, observed, expected, workspace).await,
        CheckerKind::Standard => Ok(standard_matches(&checker.standard_name, observed, expected)),
    }
}

/// Tokenizes both streams on ASCII whitespace and compares token-by-token
/// using the requested numeric parser; a non-numeric checker name falls
/// back to exact token equality.
fn standard_matches(name: &str, observed: &[u8], expected: &[u8]) -> bool {
    let observed_tokens: Vec<&str> = std::str::from_utf8(observed).unwrap_or_default().split_ascii_whitespace().collect();
    let expected_tokens: Vec<&str> = std::str::from_utf8(expected).unwrap_or_default().split_ascii_whitespace().collect();
    if observed_tokens.len() != expected_tokens.len() {
        return false;
    }

    observed_tokens.iter().zip(expected_tokens.iter()).all(|(a, b)| token_matches(name, a, b))
}

fn token_matches(name: &str, a: &str, b: &str) -> bool {
    match name {
        "int" => a.parse::<i64>().ok() == b.parse::<i64>().ok(),
        "long" => a.parse::<i128>().ok() == b.parse::<i128>().ok(),
        "float" => floats_close(a.parse::<f32>().ok(), b.parse::<f32>().ok(), 1e-4),
        "double" => floats_close(a.parse::<f64>().ok(), b.parse::<f64>().ok(), 1e-9),
        _ => a == b,
    }
}

fn floats_close<T: Into<f64> + Copy>(a: Option<T>, b: Option<T>, epsilon: f64) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => (a.into() - b.into()).abs() <= epsilon,
        (None, None) => true,
        _ => false,
    }
}

/// Custom checkers are python scripts invoked via a wrapper that receives
/// the observed and expected bytes as temp files and is expected to exit
/// zero on a match.
async fn run_custom(source: &str, observed: &[u8], expected: &[u8], workspace: &Path) -> PipelineResult<bool> {
    let observed_path = workspace.join("checker-observed.txt");
    let expected_path = workspace.join("checker-expected.txt");
    let script_path = workspace.join("checker.py");
    tokio::fs::write(&observed_path, observed).await.context(crate::error::WorkspaceSnafu { path: observed_path.clone() })?;
    tokio::fs::write(&expected_path, expected).await.context(crate::error::WorkspaceSnafu { path: expected_path.clone() })?;
    tokio::fs::write(&script_path, source).await.context(crate::error::WorkspaceSnafu { path: script_path.clone() })?;

    let status = Command::new("python3")
        .arg(&script_path)
        .arg(&observed_path)
        .arg(&expected_path)
        .current_dir(workspace)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .context(SpawnSnafu { command: "python3".to_string() })?;

    Ok(status.success())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_checker_ignores_formatting_whitespace() {
        assert!(standard_matches("int", b"42\n", b" 42 "));
        assert!(!standard_matches("int", b"42", b"43"));
    }

    #[test]
    fn double_checker_tolerates_floating_point_noise() {
        assert!(standard_matches("double", b"3.14159265", b"3.141592650001"));
        assert!(!standard_matches("double", b"1.0", b"2.0"));
    }

    #[test]
    fn token_count_mismatch_never_matches() {
        assert!(!standard_matches("int", b"1 2 3", b"1 2"));
    }

    #[test]
    fn default_checker_name_falls_back_to_exact_text() {
        assert!(standard_matches("", b"hello world", b"hello world"));
        assert!(!standard_matches("", b"hello", b"world"));
    }
}
