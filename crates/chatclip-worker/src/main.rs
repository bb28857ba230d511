//! Chat video render worker binary.

use std::sync::Arc;

use tracing::{error, info};

use chatclip_queue::JobQueue;
use chatclip_worker::{init_tracing, JobExecutor, RenderPipeline, WorkerConfig};

#[tokio::main]
async fn main() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider already installed");
    }

    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting chatclip-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);
    if let Err(e) = config.validate() {
        error!("Invalid worker config: {}", e);
        std::process::exit(1);
    }

    let queue = match JobQueue::from_env() {
        Ok(q) => q,
        Err(e) => {
            error!("Failed to create job queue: {}", e);
            std::process::exit(1);
        }
    };

    let pipeline = match RenderPipeline::from_config(&config, &queue) {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to set up render pipeline: {}", e);
            std::process::exit(1);
        }
    };

    let executor = Arc::new(JobExecutor::new(config, queue, pipeline));

    let signal_executor = Arc::clone(&executor);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            signal_executor.shutdown();
        }
    });

    if let Err(e) = executor.run().await {
        error!("Executor error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}
