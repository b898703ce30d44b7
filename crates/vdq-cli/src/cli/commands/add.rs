//! `vdq add <source-id> [format-id]` and `vdq playlist <url>`.

use anyhow::{anyhow, bail, Result};
use uuid::Uuid;
use vdq_core::extractor::FetchOptions;
use vdq_core::policy::Requester;
use vdq_core::scheduler::TaskState;

use crate::cli::app::App;

pub async fn run_add(
    app: &App,
    source_id: Uuid,
    format_id: Option<&str>,
    requester: &Requester,
) -> Result<()> {
    let queue = app.queue();
    let format_id = match format_id {
        Some(id) => id.to_string(),
        None => queue
            .format_menu(requester, source_id)
            .await?
            .default
            .ok_or_else(|| anyhow!("no format of this source is allowed on your plan"))?,
    };
    let id = match queue.enqueue_download(requester, source_id, &format_id).await {
        Ok(id) => id,
        Err(e) if e.is_policy_denial() => {
            bail!("{e} (see `vdq usage` and `vdq formats {source_id}` for what your plan allows)")
        }
        Err(e) => return Err(e.into()),
    };
    println!("Queued job {id} (format {format_id})");
    Ok(())
}

pub async fn run_playlist(
    app: &App,
    url: &str,
    format_id: Option<&str>,
    requester: &Requester,
) -> Result<()> {
    let tasks = app.metadata_tasks();
    let handle = tasks.submit(url, FetchOptions { fast: true })?;
    let info = match tasks.wait(handle).await {
        Some(TaskState::Succeeded { info, .. }) => info,
        Some(TaskState::Failed(reason)) => bail!("{reason}"),
        Some(TaskState::Pending) | None => bail!("metadata task {handle} disappeared"),
    };

    let report = app.queue().enqueue_playlist(requester, &info, format_id).await?;
    for id in &report.jobs {
        println!("Queued job {id}");
    }
    for s in &report.skipped {
        println!("Skipped {}: {}", s.url, s.reason);
    }
    println!(
        "{} queued, {} skipped",
        report.jobs.len(),
        report.skipped.len()
    );
    if let Some(e) = report.stopped {
        bail!("stopped early: {e}");
    }
    Ok(())
}
