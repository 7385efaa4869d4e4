use std::path::Path;
use std::process::Command;

use reel_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = WorkerConfig::from_env();

    println!(
        "worker-selfcheck: starting with work_dir={}",
        config.work_dir.display()
    );
    ensure_dir(&config.work_dir).await?;
    ensure_dir(&config.output_dir).await?;
    ensure_ffmpeg()?;
    ensure_env_present(&["BLUEPRINT_DB_DATABASE", "BLUEPRINT_DB_USERNAME", "S3_BUCKET_NAME"])?;

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_dir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    Ok(())
}

fn ensure_ffmpeg() -> anyhow::Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map_err(|e| anyhow::anyhow!("ffmpeg not available: {}", e))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "ffmpeg -version failed: {:?}",
            output.status
        ));
    }
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
