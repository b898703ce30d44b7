//! `vdq run` – drain the queue with a bounded worker pool.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use vdq_core::scheduler;
use vdq_core::store::{JobStatus, JobStore};

use crate::cli::app::App;
use crate::cli::display::{human_speed, or_dash, progress_line, short_id};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(1000);

/// Print one line per downloading job until `stop` fires.
async fn print_progress(store: JobStore, mut stop: tokio::sync::oneshot::Receiver<()>) {
    let mut tick = tokio::time::interval(PROGRESS_INTERVAL);
    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = tick.tick() => {}
        }
        let Ok(jobs) = store.list_jobs().await else {
            continue;
        };
        for j in jobs.iter().filter(|j| j.status == JobStatus::Downloading) {
            println!(
                "  {}  {}  {}  ETA {}",
                short_id(&j.id),
                progress_line(j.progress_percent, j.bytes_downloaded, j.bytes_total),
                or_dash(j.speed_kibps.map(human_speed)),
                or_dash(j.eta_secs.map(|s| format!("{s}s"))),
            );
        }
    }
}

pub async fn run_scheduler(app: &App, jobs: Option<usize>) -> Result<()> {
    let recovered = app.store.recover_claimed_jobs().await?;
    if recovered > 0 {
        tracing::info!("recovered {} job(s) from previous run", recovered);
    }
    let workers = jobs.unwrap_or(app.cfg.workers).max(1);
    let download_dir = app.download_dir()?;
    tokio::fs::create_dir_all(&download_dir).await?;

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel();
    let printer = tokio::spawn(print_progress(app.store.clone(), stop_rx));

    let runner = Arc::new(app.runner()?);
    let summary = scheduler::run_jobs_parallel(runner, app.retry_policy(), workers).await;

    let _ = stop_tx.send(());
    let _ = printer.await;
    let summary = summary?;

    let total = summary.completed + summary.failed + summary.skipped;
    if total == 0 {
        println!("No queued jobs.");
    } else {
        println!(
            "{} completed, {} failed, {} skipped (files in {})",
            summary.completed,
            summary.failed,
            summary.skipped,
            download_dir.display()
        );
        tracing::info!(?summary, "run finished");
    }
    Ok(())
}
