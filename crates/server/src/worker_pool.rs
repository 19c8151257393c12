//! Spawns the configured number of Delivery Worker tasks draining one
//! shared queue receiver (spec §4.E, §6 `worker_concurrency`).

use loraflow_core::JobId;
use loraflow_generator::Generator;
use loraflow_store::JobStore;
use loraflow_worker::{CancellationRegistry, DeliveryWorker, ProgressSink, WorkerSettings};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::info;

#[allow(clippy::too_many_arguments)]
pub fn spawn_workers<G, S, C>(
    concurrency: usize,
    store: JobStore,
    generator: Arc<G>,
    sink: Arc<S>,
    clock: C,
    cancellations: CancellationRegistry,
    settings: WorkerSettings,
    receiver: mpsc::Receiver<JobId>,
) -> Vec<JoinHandle<()>>
where
    G: Generator,
    S: ProgressSink,
    C: loraflow_core::Clock,
{
    let worker = Arc::new(DeliveryWorker::new(store, generator, sink, clock, cancellations, settings));
    let receiver = Arc::new(Mutex::new(receiver));

    (0..concurrency.max(1))
        .map(|index| {
            let worker = worker.clone();
            let receiver = receiver.clone();
            tokio::spawn(async move {
                info!(worker_index = index, "delivery worker task started");
                loop {
                    let job_id = {
                        let mut guard = receiver.lock().await;
                        guard.recv().await
                    };
                    match job_id {
                        Some(job_id) => worker.run_job(job_id).await,
                        None => break,
                    }
                }
                info!(worker_index = index, "delivery worker task exiting: queue closed");
            })
        })
        .collect()
}
