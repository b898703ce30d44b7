//! `vdq cancel <id>` and `vdq remove <id>`.

use anyhow::{bail, Result};
use uuid::Uuid;

use crate::cli::app::App;

pub async fn run_cancel(app: &App, id: Uuid) -> Result<()> {
    if app.queue().cancel(id).await? {
        println!("Cancelled job {id}");
        Ok(())
    } else {
        let job = app.queue().poll_job(id).await?;
        bail!("job {id} is {} and can no longer be cancelled", job.status)
    }
}

/// Removes the job row. With `delete_file`, also deletes the job's output
/// from the download directory.
pub async fn run_remove(app: &App, id: Uuid, delete_file: bool) -> Result<()> {
    let job = app.queue().poll_job(id).await?;
    if job.status.is_active() {
        bail!("job {id} is {}; cancel it or let it finish first", job.status);
    }
    if delete_file {
        if let Some(name) = &job.output_filename {
            let path = app.download_dir()?.join(name);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => tracing::debug!(path = %path.display(), "deleted file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(path = %path.display(), "could not delete file: {}", e),
            }
        }
    }
    app.store.remove_job(id).await?;
    println!("Removed job {id}");
    Ok(())
}
