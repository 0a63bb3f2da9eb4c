use std::path::Path;

use slidecast_media::{check_ffmpeg, check_ffprobe};
use slidecast_worker::PipelineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = PipelineConfig::from_env();

    println!(
        "slidecast-selfcheck: starting with work_dir={} output_dir={}",
        config.work_dir.display(),
        config.output_dir.display()
    );
    ensure_writable(&config.work_dir).await?;
    ensure_writable(&config.output_dir).await?;
    ensure_writable(&config.job_results_dir).await?;

    let ffmpeg = check_ffmpeg()?;
    let ffprobe = check_ffprobe()?;
    println!("slidecast-selfcheck: ffmpeg={} ffprobe={}", ffmpeg.display(), ffprobe.display());

    report_optional_env(&["OPENROUTER_API_KEY", "OPENAI_API_KEY"]);

    println!("slidecast-selfcheck: ok");
    Ok(())
}

async fn ensure_writable(path: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(path).await?;
    let probe = path.join(".selfcheck");
    tokio::fs::write(&probe, b"ok")
        .await
        .map_err(|e| anyhow::anyhow!("{} is not writable: {}", path.display(), e))?;
    tokio::fs::remove_file(&probe).await?;
    Ok(())
}

fn report_optional_env(vars: &[&str]) {
    for var in vars {
        let state = if std::env::var(var).is_ok() { "set" } else { "unset" };
        println!("slidecast-selfcheck: {} {}", var, state);
    }
}
