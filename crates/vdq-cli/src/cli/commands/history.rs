//! `vdq history [id]` and `vdq usage`.

use anyhow::Result;
use uuid::Uuid;
use vdq_core::policy::Requester;

use crate::cli::app::App;
use crate::cli::display::{or_dash, short_id};

pub async fn run_history(app: &App, id: Option<Uuid>) -> Result<()> {
    let entries = app.store.list_history(id).await?;
    if entries.is_empty() {
        println!("No attempts recorded.");
        return Ok(());
    }
    println!("{:<9} {:<8} {:<8} {}", "JOB", "ATTEMPT", "RESULT", "REASON");
    for e in entries {
        println!(
            "{:<9} {:<8} {:<8} {}",
            short_id(&e.job_id),
            e.attempt,
            if e.success { "ok" } else { "failed" },
            or_dash(e.reason.as_deref()),
        );
    }
    Ok(())
}

pub async fn run_usage(app: &App, requester: &Requester) -> Result<()> {
    let usage = app.store.usage_today(requester).await?;
    let policy = app.policies().resolve(requester);
    let limit = if policy.unlimited {
        "unlimited".to_string()
    } else {
        or_dash(policy.daily_limit)
    };
    println!("Requester: {requester}");
    println!("Day (UTC): {}", usage.day);
    println!("Completed: {}", usage.success_count);
    println!("Active:    {}", usage.active_count);
    println!("Counted:   {} of {limit}", usage.downloads_today());
    println!("Max res:   {}", or_dash(policy.max_resolution.map(|h| format!("{h}p"))));
    Ok(())
}
