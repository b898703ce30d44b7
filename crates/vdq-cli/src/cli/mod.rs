//! CLI for the VDQ video download queue.

mod app;
mod commands;
mod display;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use uuid::Uuid;
use vdq_core::policy::{Requester, Tier};

use app::App;
use commands::{
    run_add, run_cancel, run_fetch, run_formats, run_history, run_playlist, run_remove,
    run_scheduler, run_show, run_status, run_usage,
};

/// Top-level CLI for the VDQ download queue.
#[derive(Debug, Parser)]
#[command(name = "vdq")]
#[command(about = "VDQ: policy-gated video download queue", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Who is asking. Defaults to the local guest session.
#[derive(Debug, Clone, Args, PartialEq, Eq)]
pub struct RequesterArgs {
    /// Account id to submit as.
    #[arg(long, conflicts_with = "guest")]
    pub user: Option<String>,

    /// Tier of the account given with --user.
    #[arg(long, default_value = "free", requires = "user")]
    pub tier: Tier,

    /// Guest session id (quota is tracked per session).
    #[arg(long, value_name = "SESSION")]
    pub guest: Option<String>,
}

impl RequesterArgs {
    pub fn requester(&self) -> Requester {
        match (&self.user, &self.guest) {
            (Some(id), _) => Requester::account(id.clone(), self.tier),
            (None, Some(session)) => Requester::guest(session.clone()),
            (None, None) => Requester::guest("local"),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch metadata for a video URL and list the formats you may pick.
    Fetch {
        url: String,
        #[command(flatten)]
        who: RequesterArgs,
    },

    /// List formats of a previously fetched source.
    Formats {
        source_id: Uuid,
        #[command(flatten)]
        who: RequesterArgs,
    },

    /// Queue a download of one format of a fetched source.
    Add {
        source_id: Uuid,
        /// Format id; defaults to the best format you may pick.
        format_id: Option<String>,
        #[command(flatten)]
        who: RequesterArgs,
    },

    /// Fetch a playlist and queue one job per entry.
    Playlist {
        url: String,
        /// Use this format id for entries that offer it.
        #[arg(long, value_name = "FORMAT_ID")]
        format: Option<String>,
        #[command(flatten)]
        who: RequesterArgs,
    },

    /// Run the worker pool until the queue is empty.
    Run {
        /// Jobs run concurrently (default: `workers` from config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
    },

    /// Show status of all jobs.
    Status,

    /// Show one job in detail.
    Show { id: Uuid },

    /// Cancel a queued job.
    Cancel { id: Uuid },

    /// Remove a job and its attempt history.
    Remove {
        id: Uuid,
        /// Also delete the downloaded file.
        #[arg(long)]
        delete_file: bool,
    },

    /// Show execution attempts, newest first.
    History { id: Option<Uuid> },

    /// Show today's quota usage.
    Usage {
        #[command(flatten)]
        who: RequesterArgs,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let app = App::open().await?;

        match cli.command {
            CliCommand::Fetch { url, who } => run_fetch(&app, &url, &who.requester()).await?,
            CliCommand::Formats { source_id, who } => {
                run_formats(&app, source_id, &who.requester()).await?
            }
            CliCommand::Add {
                source_id,
                format_id,
                who,
            } => run_add(&app, source_id, format_id.as_deref(), &who.requester()).await?,
            CliCommand::Playlist { url, format, who } => {
                run_playlist(&app, &url, format.as_deref(), &who.requester()).await?
            }
            CliCommand::Run { jobs } => run_scheduler(&app, jobs).await?,
            CliCommand::Status => run_status(&app).await?,
            CliCommand::Show { id } => run_show(&app, id).await?,
            CliCommand::Cancel { id } => run_cancel(&app, id).await?,
            CliCommand::Remove { id, delete_file } => run_remove(&app, id, delete_file).await?,
            CliCommand::History { id } => run_history(&app, id).await?,
            CliCommand::Usage { who } => run_usage(&app, &who.requester()).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
