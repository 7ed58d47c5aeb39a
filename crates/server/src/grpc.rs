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

use std::{path::PathBuf, sync::Arc};

use arbiter_error::{ParseAddressSnafu, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use snafu::ResultExt;
use tokio::{net::UnixListener, sync::oneshot};
use tokio_stream::wrappers::UnixListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::{service::RoutesBuilder, transport::Server};
use tonic_health::server::HealthReporter;
use tonic_reflection::server::v1::{ServerReflection, ServerReflectionServer};
use tonic_tracing_opentelemetry::middleware::server::OtelGrpcLayer;
use tracing::info;

use crate::ServiceHandler;

/// Default maximum gRPC receiving message size (512 MiB)
pub const DEFAULT_MAX_GRPC_RECV_MESSAGE_SIZE: usize = 512 * 1024 * 1024;
/// Default maximum gRPC sending message size (512 MiB)
pub const DEFAULT_MAX_GRPC_SEND_MESSAGE_SIZE: usize = 512 * 1024 * 1024;

/// Where a gRPC server binds. C1 backend services and C2's control RPC bind
/// a Unix-domain socket at a path the supervisor dictates (spec.md section
/// 4.1/6); the edge bridge proxies to upstreams over either kind (spec.md
/// section 3).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum GrpcBindTarget {
    Tcp(String),
    Unix(PathBuf),
}

impl Default for GrpcBindTarget {
    fn default() -> Self { Self::Tcp("127.0.0.1:50051".to_string()) }
}

/// Configuration options for a gRPC server
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, SmartDefault, bon::Builder)]
pub struct GrpcServerConfig {
    /// Where to bind: a TCP socket address, or a Unix-domain socket path.
    pub bind_target:           GrpcBindTarget,
    /// Maximum gRPC receiving (decoding) message size
    #[default(DEFAULT_MAX_GRPC_RECV_MESSAGE_SIZE)]
    #[builder(default = DEFAULT_MAX_GRPC_RECV_MESSAGE_SIZE)]
    pub max_recv_message_size: usize,
    /// Maximum gRPC sending (encoding) message size
    #[default(DEFAULT_MAX_GRPC_SEND_MESSAGE_SIZE)]
    #[builder(default = DEFAULT_MAX_GRPC_SEND_MESSAGE_SIZE)]
    pub max_send_message_size: usize,
}

/// Trait for gRPC service implementations that provides a standardized way to
/// register services with the gRPC server.
///
/// This trait abstracts the common patterns needed for gRPC services:
/// - Service registration with the tonic routes builder
/// - Reflection support through file descriptor sets
/// - Service identification for logging and monitoring
/// - Health status management
///
/// By implementing this trait, services can be easily integrated into the
/// GrpcServer framework, which handles server lifecycle, reflection setup,
/// health checking, and graceful shutdown automatically.
///
/// # Example
///
/// See `crates/server/src/grpc/hello.rs` for a complete implementation example.
#[async_trait]
pub trait GrpcServiceHandler: Send + Sync + 'static {
    /// The name of the service for logging and identification purposes
    fn service_name(&self) -> &'static str;
    /// The compiled protobuf file descriptor set used for gRPC reflection
    /// This should be generated using prost-build and included at compile time
    fn file_descriptor_set(&self) -> &'static [u8];
    /// Register the service implementation with the tonic routes builder
    /// This method should wrap the service in the appropriate tonic-generated
    /// server and add it to the builder
    fn register_service(self: &Arc<Self>, builder: &mut RoutesBuilder);
    /// readiness_reporting is called after the service is registered and
    /// allows the service to set its initial health status
    async fn readiness_reporting(
        self: &Arc<Self>,
        _cancellation_token: CancellationToken,
        health_reporter: HealthReporter,
    ) {
        // Default implementation does nothing - services can override this
        // to set their specific health status
        health_reporter
            .set_service_status("", tonic_health::ServingStatus::Serving)
            .await;
    }
}

/// Starts the gRPC server and returns a handle for managing its lifecycle.
///
/// This method:
/// 1. Sets up the gRPC reflection service using the service's file descriptor
///    set
/// 2. Sets up the health checking service if enabled
/// 3. Parses and binds to the configured address
/// 4. Spawns the server in a background task
/// 5. Returns a handle for lifecycle management
///
/// The server will automatically register the reflection service, health
/// service (if enabled), and the provided service implementation. It
/// supports graceful shutdown through the returned handle.
///
/// # Errors
/// Returns an error if the bind address cannot be parsed.
pub async fn start_grpc_server(
    config: GrpcServerConfig,
    services: Vec<Arc<impl GrpcServiceHandler>>,
) -> Result<ServiceHandler> {
    // Validate the bind target up front so a malformed address fails fast
    // instead of surfacing inside the spawned server task.
    if let GrpcBindTarget::Tcp(addr) = &config.bind_target {
        addr.parse::<std::net::SocketAddr>()
            .context(ParseAddressSnafu { addr: addr.clone() })?;
    }

    let reflection_service = {
        let mut file_descriptor_sets = Vec::new();
        for service in &services {
            file_descriptor_sets.push(service.file_descriptor_set());
        }
        file_descriptor_sets.push(tonic_reflection::pb::v1::FILE_DESCRIPTOR_SET);
        build_reflection_service(&file_descriptor_sets)
    };

    let (reporter, health_service) = tonic_health::server::health_reporter();
    let mut routes_builder = RoutesBuilder::default();
    routes_builder
        .add_service(health_service)
        .add_service(reflection_service);

    // register services
    for service in &services {
        let service = service.clone();
        service.register_service(&mut routes_builder);
    }

    // Spawn the server task
    let cancellation_token = CancellationToken::new();
    let bind_label = match &config.bind_target {
        GrpcBindTarget::Tcp(addr) => addr.clone(),
        GrpcBindTarget::Unix(path) => format!("unix:{}", path.display()),
    };
    let (join_handle, started_rx) = {
        let (started_tx, started_rx) = oneshot::channel::<()>();
        let cancellation_token_clone = cancellation_token.clone();
        let bind_target = config.bind_target.clone();
        let join_handle = tokio::spawn(async move {
            let server = Server::builder()
                .layer(OtelGrpcLayer::default())
                .accept_http1(true)
                .add_routes(routes_builder.routes());
            let shutdown_signal = async move {
                info!("gRPC server (on {}) starting", bind_label);
                let _ = started_tx.send(());
                info!("gRPC server (on {}) started", bind_label);
                cancellation_token_clone.cancelled().await;
                info!("gRPC server (on {}) received shutdown signal", bind_label);
            };
            let result = match bind_target {
                GrpcBindTarget::Tcp(addr) => {
                    let bind_addr = addr
                        .parse::<std::net::SocketAddr>()
                        .expect("validated before the server task was spawned");
                    server.serve_with_shutdown(bind_addr, shutdown_signal).await
                }
                GrpcBindTarget::Unix(path) => {
                    let _ = std::fs::remove_file(&path);
                    let listener = match UnixListener::bind(&path) {
                        Ok(listener) => listener,
                        Err(err) => {
                            tracing::error!("failed to bind unix socket {}: {err}", path.display());
                            return;
                        }
                    };
                    server
                        .serve_with_incoming_shutdown(UnixListenerStream::new(listener), shutdown_signal)
                        .await
                }
            };

            info!("gRPC server task completed: {:?}", result);
        });
        (join_handle, started_rx)
    };

    let reporter_handlers = {
        let mut handlers = Vec::new();
        for service in &services {
            info!(
                "spawning readiness reporting task for {}",
                service.service_name()
            );
            let service = service.clone();
            let reporter = reporter.clone();
            let cancellation_token_clone = cancellation_token.clone();
            let handle = tokio::spawn(async move {
                service
                    .readiness_reporting(cancellation_token_clone, reporter)
                    .await;
                info!(
                    "readiness reporting task for {} completed",
                    service.service_name()
                );
            });
            handlers.push(handle);
        }
        handlers
    };

    let handle = ServiceHandler {
        join_handle,
        cancellation_token,
        started_rx: Some(started_rx),
        reporter_handles: reporter_handlers,
    };
    Ok(handle)
}

fn build_reflection_service(
    file_descriptor_sets: &[&[u8]],
) -> ServerReflectionServer<impl ServerReflection> {
    let mut builder = tonic_reflection::server::Builder::configure();

    for file_descriptor_set in file_descriptor_sets {
        builder = builder.register_encoded_file_descriptor_set(file_descriptor_set);
    }
    builder
        .build_v1()
        .expect("failed to build reflection service")
}

/// Dials a local gRPC service over a Unix-domain socket. Shared by the
/// control CLI (C3), the supervisor's own health probes, and the edge
/// bridge's backend dialer (spec.md section 4.3.2/6): the target address in
/// the `http://` URI is never actually resolved since the connector always
/// redials the fixed socket path.
pub async fn connect_uds(path: PathBuf) -> std::result::Result<tonic::transport::Channel, tonic::transport::Error> {
    use tonic::transport::{Endpoint, Uri};
    use tower::service_fn;

    Endpoint::try_from("http://[::]:50051")
        .expect("static placeholder uri")
        .connect_with_connector(service_fn(move |_: Uri| {
            let path = path.clone();
            async move {
                let stream = tokio::net::UnixStream::connect(path).await?;
                Ok::<_, std::io::Error>(hyper_util::rt::TokioIo::new(stream))
            }
        }))
        .await
}
