use std::path::Path;

use chatclip_media::{check_ffmpeg, check_ffprobe};
use chatclip_queue::JobQueue;
use chatclip_storage::R2Uploader;
use chatclip_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "worker-selfcheck: starting with work_dir={}",
        config.work_dir.display()
    );
    ensure_workdir(&config.work_dir).await?;

    let ffmpeg = check_ffmpeg()?;
    let ffprobe = check_ffprobe()?;
    println!("worker-selfcheck: ffmpeg={} ffprobe={}", ffmpeg.display(), ffprobe.display());

    ensure_env_present(&["REDIS_URL", "R2_ENDPOINT_URL", "R2_BUCKET_NAME"])?;

    JobQueue::from_env()?
        .ping()
        .await
        .map_err(|e| anyhow::anyhow!("redis not reachable: {}", e))?;

    R2Uploader::from_env()?
        .client()
        .check_connectivity()
        .await?;

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir(path: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(path).await?;
    let probe = path.join(".selfcheck");
    tokio::fs::write(&probe, b"ok").await?;
    tokio::fs::remove_file(&probe).await?;
    Ok(())
}

fn ensure_env_present(vars: &[&str]) -> anyhow::Result<()> {
    for var in vars {
        if std::env::var(var).is_err() {
            return Err(anyhow::anyhow!("missing required env var {}", var));
        }
    }
    Ok(())
}
