//! `loraflowd`: the LoRA generation control plane server binary.
//!
//! Wires together every component crate behind one HTTP/WebSocket API (spec
//! §6). Exit codes: `0` clean shutdown, `1` unrecoverable configuration
//! error, `2` the broker is configured, unreachable at startup, and the
//! operator has explicitly disabled the in-process fallback.

use clap::Parser;
use loraflow_adapters::AdapterCatalog;
use loraflow_broadcaster::{BroadcasterSettings, ProgressBroadcaster};
use loraflow_coordinator::{CacheSettings, CoordinatorSettings, GenerationCoordinator, RecommendationCache};
use loraflow_core::{Config, SystemClock};
use loraflow_generator::GeneratorClient;
use loraflow_queue::{BrokerBackend, QueueBackend, QueueOrchestrator};
use loraflow_server::similarity::CatalogSimilaritySource;
use loraflow_server::sink::BroadcastSink;
use loraflow_server::state::AppState;
use loraflow_server::worker_pool::spawn_workers;
use loraflow_server::build_router;
use loraflow_store::JobStore;
use loraflow_worker::{CancellationRegistry, WorkerSettings};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "loraflowd", about = "LoRA generation control plane server")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "loraflow.toml")]
    config: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(err) => {
            // Tracing isn't initialized yet since the log filter itself
            // comes from config; a config load failure is rare enough that
            // stderr is an acceptable fallback for it alone.
            eprintln!("invalid configuration: {err}");
            return ExitCode::from(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(%err, "failed to start async runtime");
            return ExitCode::from(1);
        }
    };

    let exit = runtime.block_on(run(config));
    runtime.shutdown_timeout(Duration::from_secs(5));
    exit
}

async fn run(config: Config) -> ExitCode {
    let broker: Option<Arc<dyn QueueBackend>> = match &config.broker_url {
        Some(url) => {
            let backend = BrokerBackend::new(url.clone());
            if config.disable_in_process_fallback {
                if let Err(err) = backend.healthcheck().await {
                    error!(%err, "broker unreachable at startup and in-process fallback is disabled");
                    return ExitCode::from(2);
                }
            }
            Some(Arc::new(backend))
        }
        None => None,
    };

    let catalog = match &config.adapter_catalog_path {
        Some(path) => match AdapterCatalog::load(std::path::Path::new(path)) {
            Ok(catalog) => catalog,
            Err(err) => {
                error!(%err, "failed to load adapter catalog");
                return ExitCode::from(1);
            }
        },
        None => AdapterCatalog::empty(),
    };

    let store = match &config.snapshot_dir {
        Some(dir) => match loraflow_store::load_snapshot(std::path::Path::new(dir)) {
            Ok(jobs) => {
                info!(count = jobs.len(), "restored jobs from snapshot");
                JobStore::from_jobs(jobs)
            }
            Err(err) => {
                error!(%err, "failed to load job store snapshot");
                return ExitCode::from(1);
            }
        },
        None => JobStore::new(),
    };

    let clock = SystemClock;
    let generator = Arc::new(GeneratorClient::new(
        config.generator_base_url.clone(),
        Duration::from_secs(config.generator_timeout_s),
    ));

    let (orchestrator, receiver) = match broker {
        Some(broker) => QueueOrchestrator::with_broker(broker, config.queue_capacity),
        None => QueueOrchestrator::in_process_only(config.queue_capacity),
    };
    let queue = Arc::new(orchestrator);

    let broadcaster = ProgressBroadcaster::new(
        BroadcasterSettings {
            buffer_size: config.ws_buffer_size,
            terminal_retain: Duration::from_secs(config.ws_terminal_retain_s),
            ..BroadcasterSettings::default()
        },
        clock.clone(),
    );
    let sink = Arc::new(BroadcastSink::new(broadcaster.clone()));
    let cancellations = CancellationRegistry::new();

    let worker_settings = WorkerSettings {
        poll_interval: Duration::from_millis(config.poll_interval_ms),
        max_job_duration: Duration::from_secs(config.max_job_duration_s),
    };
    let worker_handles = spawn_workers(
        config.worker_concurrency,
        store.clone(),
        generator,
        sink,
        clock.clone(),
        cancellations.clone(),
        worker_settings,
        receiver,
    );

    let healthcheck_queue = queue.clone();
    let healthcheck_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        loop {
            interval.tick().await;
            healthcheck_queue.healthcheck_tick().await;
        }
    });

    // Feeds jobs dispatched through a healthy broker into the same channel
    // `spawn_workers` drains; a no-op loop if no broker is configured.
    let broker_consumer_queue = queue.clone();
    let broker_consumer_task = tokio::spawn(async move {
        broker_consumer_queue.run_broker_consumer().await;
    });

    let coordinator = Arc::new(GenerationCoordinator::new(
        store.clone(),
        queue.clone(),
        catalog.clone(),
        clock.clone(),
        CoordinatorSettings { immediate_mode_deadline: Duration::from_millis(config.immediate_mode_deadline_ms) },
    ));

    let cache = RecommendationCache::new(
        CacheSettings {
            ttl: Duration::from_secs(config.cache_ttl_s),
            max_entries: config.cache_max_entries,
            max_bytes: config.cache_max_bytes,
        },
        clock.clone(),
    );
    let similarity = Arc::new(CatalogSimilaritySource::new(catalog.clone(), clock.clone()));

    let state = AppState {
        store: store.clone(),
        catalog,
        queue,
        coordinator,
        broadcaster: broadcaster.clone(),
        cache,
        similarity,
        cancellations,
    };

    let router = build_router(state);
    let listener = match TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(%err, bind_addr = %config.bind_addr, "failed to bind");
            return ExitCode::from(1);
        }
    };
    info!(bind_addr = %config.bind_addr, "loraflowd listening");

    let serve_result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    if let Err(err) = serve_result {
        error!(%err, "server loop exited with error");
    }

    broadcaster.broadcast_shutdown().await;
    healthcheck_task.abort();
    broker_consumer_task.abort();
    for handle in worker_handles {
        handle.abort();
    }

    if let Some(dir) = &config.snapshot_dir {
        if let Err(err) = loraflow_store::write_snapshot(std::path::Path::new(dir), store.snapshot()) {
            error!(%err, "failed to write shutdown snapshot");
        }
    }

    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(%err, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => error!(%err, "failed to install sigterm handler"),
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}
