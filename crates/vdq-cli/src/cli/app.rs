//! Shared wiring for command handlers: config, store and extractor.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use vdq_core::config::{self, VdqConfig};
use vdq_core::extractor::{Extractor, YtDlp};
use vdq_core::policy::PolicyEngine;
use vdq_core::retry::RetryPolicy;
use vdq_core::runner::JobRunner;
use vdq_core::scheduler::{JobQueue, MetadataSettings, MetadataTasks};
use vdq_core::store::JobStore;

pub struct App {
    pub cfg: VdqConfig,
    pub store: JobStore,
    extractor: Arc<dyn Extractor>,
    cookies_configured: bool,
}

impl App {
    pub async fn open() -> Result<Self> {
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let store = JobStore::open_default().await?;
        let ytdlp = YtDlp::new(&cfg.extractor);
        let cookies_configured = ytdlp.cookies_enabled();
        Ok(Self {
            cfg,
            store,
            extractor: Arc::new(ytdlp),
            cookies_configured,
        })
    }

    pub fn policies(&self) -> PolicyEngine {
        PolicyEngine::new(self.cfg.policy.clone())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(self.cfg.retry_or_default())
    }

    pub fn queue(&self) -> JobQueue {
        JobQueue::new(self.store.clone(), self.policies(), Arc::clone(&self.extractor))
            .with_allowed_hosts(self.cfg.allowed_hosts.clone())
            .with_format_limits(self.cfg.formats)
    }

    pub fn metadata_tasks(&self) -> MetadataTasks {
        let settings = MetadataSettings {
            allowed_hosts: self.cfg.allowed_hosts.clone(),
            cookies_configured: self.cookies_configured,
            ..MetadataSettings::new(self.retry_policy())
        };
        MetadataTasks::new(self.store.clone(), Arc::clone(&self.extractor), settings)
    }

    pub fn download_dir(&self) -> Result<PathBuf> {
        self.cfg.resolve_download_dir()
    }

    pub fn runner(&self) -> Result<JobRunner> {
        Ok(JobRunner::new(
            self.store.clone(),
            Arc::clone(&self.extractor),
            self.policies(),
            self.download_dir()?,
        )
        .with_cookies_configured(self.cookies_configured))
    }
}
