//! `vdq status` and `vdq show <id>`.

use anyhow::Result;
use uuid::Uuid;

use crate::cli::app::App;
use crate::cli::display::{human_speed, or_dash, progress_line, short_id};

pub async fn run_status(app: &App) -> Result<()> {
    let jobs = app.store.list_jobs().await?;
    if jobs.is_empty() {
        println!("No jobs in database.");
        return Ok(());
    }
    println!("{:<9} {:<12} {:<5} {:<20} {}", "ID", "STATUS", "PCT", "REQUESTER", "FILE");
    for j in jobs {
        println!(
            "{:<9} {:<12} {:<5} {:<20} {}",
            short_id(&j.id),
            j.status,
            format!("{}%", j.progress_percent),
            j.requester.key(),
            or_dash(j.output_filename.as_deref()),
        );
    }
    Ok(())
}

pub async fn run_show(app: &App, id: Uuid) -> Result<()> {
    let job = app.queue().poll_job(id).await?;
    println!("Job:       {}", job.id);
    println!("Requester: {}", job.requester);
    println!("Status:    {}", job.status);
    println!(
        "Progress:  {}",
        progress_line(job.progress_percent, job.bytes_downloaded, job.bytes_total)
    );
    if job.status.is_active() {
        println!("Speed:     {}", or_dash(job.speed_kibps.map(human_speed)));
        println!("ETA:       {}", or_dash(job.eta_secs.map(|s| format!("{s}s"))));
    }
    println!("Attempts:  {}", job.attempts);
    println!("Day:       {}", job.created_day);
    if let Some(f) = &job.output_filename {
        println!("File:      {f}");
    }
    if let Some(r) = &job.failure_reason {
        println!("Reason:    {r}");
    }
    if let Some(source) = app.store.get_source(job.source_id).await? {
        println!("Title:     {}", source.title);
        println!("URL:       {}", source.canonical_url);
    }
    Ok(())
}
