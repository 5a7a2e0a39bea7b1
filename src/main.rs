// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use axum::Extension;
use axum::{
    routing::{get, post},
    Router,
};
use backoff::ExponentialBackoff;
use dashmap::DashSet;
use provisionrs::config::settings::Settings;
use provisionrs::domain::repositories::lock_repository::LockRepository;
use provisionrs::domain::repositories::runtime_repository::RuntimeRepository;
use provisionrs::domain::repositories::storage_repository::StorageRepository;
use provisionrs::domain::services::admission::AdmissionService;
use provisionrs::domain::services::proxy_pool::ProxyPoolService;
use provisionrs::infrastructure::cache::redis_client::RedisClient;
use provisionrs::infrastructure::runtime::docker_client::DockerRuntime;
use provisionrs::infrastructure::storage::R2Storage;
use provisionrs::presentation::handlers::{
    logs_handler, provision_handler, results_handler, status_handler,
};
use provisionrs::presentation::routes;
use provisionrs::workers::reaper::ShutdownReaper;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use provisionrs::application::usecases::provision_job::ProvisionJobUseCase;
use provisionrs::utils::telemetry;

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting provisionrs...");

    // Initialize Prometheus Metrics
    provisionrs::infrastructure::metrics::init_metrics();

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    // 3. Initialize Redis Client and verify the connection
    let redis_client = RedisClient::new(&settings.redis.url).await?;
    let ping_client = redis_client.clone();
    backoff::future::retry(ExponentialBackoff::default(), move || {
        let client = ping_client.clone();
        async move { client.ping().await.map_err(backoff::Error::transient) }
    })
    .await?;
    info!("Redis connection established");

    // 4. Connect to the container runtime
    let docker = DockerRuntime::connect()?;
    docker.ping().await?;
    info!("Container runtime reachable");

    let runtime: Arc<dyn RuntimeRepository> = Arc::new(docker);
    let locks: Arc<dyn LockRepository> = Arc::new(redis_client.clone());
    let storage: Arc<dyn StorageRepository> = Arc::new(R2Storage::new(
        settings.storage.account_id.clone(),
        settings.storage.bucket.clone(),
        settings.storage.access_key.clone(),
        settings.storage.secret_key.clone(),
    ));

    // 5. Pre-pull the worker image, guarded against concurrent controllers.
    // The held key is released by the shutdown sweep; the TTL is the
    // safety net if this process dies before that.
    let startup_locks = Arc::new(DashSet::new());
    let image_lock_key = format!("image-pull:{}", settings.provisioner.image);
    if locks
        .acquire(&image_lock_key, settings.provisioner.image_pull_lock_ttl)
        .await?
    {
        startup_locks.insert(image_lock_key);
        runtime.pull_image(&settings.provisioner.image).await?;
        info!(image = %settings.provisioner.image, "Worker image pulled");
    } else {
        info!("Another controller is pulling the worker image; skipping");
    }

    // 6. Prepare the local staging directory
    tokio::fs::create_dir_all(&settings.provisioner.staging_dir).await?;

    // 7. Initialize Components
    let admission = Arc::new(AdmissionService::new(
        runtime.clone(),
        settings.provisioner.max_active_jobs,
    ));
    let pool = Arc::new(ProxyPoolService::new(
        runtime.clone(),
        locks.clone(),
        settings.provisioner.proxy_lock_ttl,
    ));
    let usecase = Arc::new(ProvisionJobUseCase::new(
        runtime.clone(),
        locks.clone(),
        storage.clone(),
        pool,
        settings.provisioner.clone(),
    ));
    let reaper = ShutdownReaper::new(
        runtime.clone(),
        locks.clone(),
        startup_locks,
        settings.provisioner.cleanup_lock_ttl,
    );

    // 8. Start HTTP server
    let app = Router::new()
        .route("/health", get(routes::health_check))
        .route("/v1/version", get(routes::version))
        .route("/provision", post(provision_handler::provision))
        .route("/status", get(status_handler::list_status))
        .route("/logs/{id}", get(logs_handler::stream_logs))
        .route("/results", get(results_handler::list_results))
        .layer(Extension(admission))
        .layer(Extension(usecase))
        .layer(Extension(runtime))
        .layer(Extension(storage))
        .layer(Extension(locks))
        .layer(Extension(settings.clone()))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    // 9. Serve until a termination signal, then sweep and exit with the
    // signal's conventional code.
    let signal_code = Arc::new(AtomicI32::new(0));
    let signal_slot = signal_code.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let signo = shutdown_signal().await;
            signal_slot.store(signo, Ordering::SeqCst);
        })
        .await?;

    reaper.sweep().await;

    let signo = signal_code.load(Ordering::SeqCst);
    info!("Shutdown complete; exiting with code {}", 128 + signo);
    std::process::exit(128 + signo);
}

/// 等待终止信号，返回信号编号
async fn shutdown_signal() -> i32 {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm =
        signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {
            info!("SIGTERM received");
            15
        }
        _ = sigint.recv() => {
            info!("SIGINT received");
            2
        }
    }
}
