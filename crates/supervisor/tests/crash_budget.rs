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

//! Exercises the crash-budget restart policy against real child processes
//! (spec.md section 8, scenarios 1-2), not mocks.

use std::time::Duration;

use arbiter_supervisor::{InstanceConfig, RestartPolicy, ServiceConfig, SupervisorConfig};

fn service(name: &str, dir: &tempfile::TempDir, policy: RestartPolicy) -> ServiceConfig {
    ServiceConfig {
        name: name.to_string(),
        binary: "/bin/false".into(),
        args: vec![],
        log_file: dir.path().join(format!("{name}.log")),
        pid_file: dir.path().join(format!("{name}.pid")),
        socket_file: dir.path().join(format!("{name}.sock")),
        enabled: true,
        restart_policy: policy,
    }
}

fn config(dir: &tempfile::TempDir, max_tries: u32) -> SupervisorConfig {
    let policy = RestartPolicy::builder()
        .max_tries(max_tries)
        .reset_after_sec(3600)
        .restart_interval_ms(20)
        .shutdown_timeout_sec(2)
        .startup_delay_ms(0)
        .build();
    let flaky = service("flaky", dir, policy);
    let instance = InstanceConfig {
        name: "default".to_string(),
        services: vec![flaky],
        grader: None,
        config_path: dir.path().join("default.toml"),
    };
    let webserver = service("webserver", dir, RestartPolicy::default());
    SupervisorConfig {
        control_socket: dir.path().join("control.sock"),
        pid_file: dir.path().join("supervisor.pid"),
        control_uid: None,
        instances: vec![instance],
        webserver,
    }
}

#[tokio::test]
async fn repeated_crashes_exhaust_the_budget_and_the_service_goes_dead() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir, 2);
    let supervisor = arbiter_supervisor::Supervisor::bootstrap(&config);

    supervisor.start("default", &["flaky".to_string()]).await;

    let status = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let response = supervisor.status("default").await.unwrap();
            let flaky = response.service_statuses.iter().find(|s| s.name == "flaky").unwrap().clone();
            if flaky.status() == arbiter_api::ServiceState::Dead {
                return flaky;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("service should reach DEAD within the timeout");

    assert_eq!(status.status(), arbiter_api::ServiceState::Dead);
    assert!(status.crashes_since_start > 2);

    supervisor.shutdown().await;
}

#[tokio::test]
async fn starting_an_already_running_service_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&dir, 5);
    config.instances[0].services[0].binary = "/bin/sleep".into();
    config.instances[0].services[0].args = vec!["30".to_string()];

    let supervisor = arbiter_supervisor::Supervisor::bootstrap(&config);
    supervisor.start("default", &["flaky".to_string()]).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let first_pid = supervisor.status("default").await.unwrap().service_statuses[0].pid;

    supervisor.start("default", &["flaky".to_string()]).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second_pid = supervisor.status("default").await.unwrap().service_statuses[0].pid;

    assert_eq!(first_pid, second_pid, "a second start must not respawn an already-running service");
    supervisor.shutdown().await;
}
