//! `vdq fetch <url>` and `vdq formats <source-id>`.

use anyhow::{bail, Result};
use uuid::Uuid;
use vdq_core::extractor::FetchOptions;
use vdq_core::policy::Requester;
use vdq_core::scheduler::TaskState;

use crate::cli::app::App;
use crate::cli::display::{human_bytes, human_duration, or_dash};

pub async fn run_fetch(app: &App, url: &str, requester: &Requester) -> Result<()> {
    let tasks = app.metadata_tasks();
    let handle = tasks.submit(url, FetchOptions::default())?;
    tracing::debug!(task = %handle, "metadata task submitted");

    match tasks.wait(handle).await {
        Some(TaskState::Succeeded { info, source_id }) => {
            println!("Source:   {source_id}");
            println!("Title:    {}", info.title.as_deref().unwrap_or("Untitled"));
            if let Some(channel) = info.channel.as_deref().or(info.uploader.as_deref()) {
                println!("Channel:  {channel}");
            }
            if let Some(d) = info.duration.filter(|d| d.is_finite() && *d >= 0.0) {
                println!("Duration: {}", human_duration(d.round() as u64));
            }
            if info.is_playlist() {
                println!("Playlist with {} entries; use `vdq playlist {url}` to queue them.", info.entries.len());
                return Ok(());
            }
            println!();
            run_formats(app, source_id, requester).await
        }
        Some(TaskState::Failed(reason)) => bail!("{reason}"),
        Some(TaskState::Pending) | None => bail!("metadata task {handle} disappeared"),
    }
}

pub async fn run_formats(app: &App, source_id: Uuid, requester: &Requester) -> Result<()> {
    let menu = app.queue().format_menu(requester, source_id).await?;
    println!("{:<3} {:<10} {:<14} {:<6} {:<22} {}", "", "FORMAT", "QUALITY", "EXT", "CODECS", "SIZE");
    for f in &menu.formats {
        let mark = if menu.default.as_deref() == Some(f.format_id.as_str()) {
            "*"
        } else if menu.allowed.contains(&f.format_id) {
            ""
        } else {
            "x"
        };
        let codecs = format!(
            "{}/{}",
            f.vcodec.as_deref().unwrap_or("-"),
            f.acodec.as_deref().unwrap_or("-")
        );
        println!(
            "{:<3} {:<10} {:<14} {:<6} {:<22} {}",
            mark,
            f.format_id,
            f.quality_label(),
            f.ext.as_deref().unwrap_or("-"),
            codecs,
            or_dash(f.approx_size().map(human_bytes)),
        );
    }
    println!("\n* default for {requester}   x not allowed on your plan");
    Ok(())
}
