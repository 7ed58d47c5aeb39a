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

use std::path::{Path, PathBuf};

use arbiter_server::{ApiResult, InternalSnafu};
use snafu::ResultExt;

/// Owns a PID file for the lifetime of the process; removed on drop so a
/// clean exit never leaves a stale PID behind (spec.md section 4.2
/// filesystem hygiene, mirrored here for the child's own file).
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Writes the current process id to `path`, creating parent directories
    /// as needed.
    pub fn write(path: &Path) -> ApiResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|_| InternalSnafu {
                reason: format!("creating pid dir {}", parent.display()),
            })?;
        }
        std::fs::write(path, std::process::id().to_string()).with_context(|_| InternalSnafu {
            reason: format!("writing pid file {}", path.display()),
        })?;
        Ok(Self { path: path.to_path_buf() })
    }
}

impl Drop for PidFile {
    fn drop(&mut self) { let _ = std::fs::remove_file(&self.path); }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_drop_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("service.pid");

        let pid = PidFile::write(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, std::process::id().to_string());

        drop(pid);
        assert!(!path.exists());
    }
}
