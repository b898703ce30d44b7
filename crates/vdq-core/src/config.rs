use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::policy::Policy;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per job (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 1.0 = 1s).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
    /// Randomize each delay within [delay/2, delay].
    #[serde(default = "default_true")]
    pub jitter: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 1.0,
            max_delay_secs: 600,
            jitter: true,
        }
    }
}

/// Limits for one requester tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    /// Downloads per UTC day; missing = unbounded.
    #[serde(default)]
    pub daily_limit: Option<u32>,
    /// Highest allowed format height; missing = unbounded.
    #[serde(default)]
    pub max_resolution: Option<u32>,
    /// Skip every check (quota, resolution, premium).
    #[serde(default)]
    pub unlimited: bool,
}

impl From<TierLimits> for Policy {
    fn from(t: TierLimits) -> Self {
        Policy {
            daily_limit: t.daily_limit,
            max_resolution: t.max_resolution,
            unlimited: t.unlimited,
        }
    }
}

/// Per-tier limits. Guests get the `anonymous` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub anonymous: TierLimits,
    pub free: TierLimits,
    pub pro: TierLimits,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            anonymous: TierLimits {
                daily_limit: Some(3),
                max_resolution: Some(480),
                unlimited: false,
            },
            free: TierLimits {
                daily_limit: Some(5),
                max_resolution: Some(720),
                unlimited: false,
            },
            pro: TierLimits {
                daily_limit: None,
                max_resolution: Some(2160),
                unlimited: true,
            },
        }
    }
}

/// Settings for the `yt-dlp` extractor process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Binary name or absolute path.
    pub binary: String,
    pub socket_timeout_secs: u32,
    /// Per-fragment retries handed to the extractor.
    pub retries: u32,
    /// Netscape cookies file for providers that demand a signed-in session.
    #[serde(default)]
    pub cookies_file: Option<PathBuf>,
    /// Player clients passed as extractor args (e.g. ["android", "web"]).
    #[serde(default)]
    pub player_clients: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            socket_timeout_secs: 15,
            retries: 3,
            cookies_file: None,
            player_clients: vec!["android".to_string(), "web".to_string()],
        }
    }
}

/// Size caps for ranked format lists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FormatLimits {
    pub max_video: usize,
    pub max_audio: usize,
}

impl Default for FormatLimits {
    fn default() -> Self {
        Self {
            max_video: 60,
            max_audio: 12,
        }
    }
}

/// Global configuration loaded from `~/.config/vdq/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VdqConfig {
    /// Number of jobs executed concurrently by `vdq run`.
    pub workers: usize,
    /// Output directory; None = `$XDG_DATA_HOME/vdq/downloads`.
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    /// Hosts accepted for submission; empty = any host.
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub formats: FormatLimits,
}

impl Default for VdqConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            download_dir: None,
            allowed_hosts: Vec::new(),
            retry: None,
            policy: PolicyConfig::default(),
            extractor: ExtractorConfig::default(),
            formats: FormatLimits::default(),
        }
    }
}

impl VdqConfig {
    /// Effective output directory (configured or XDG data dir).
    pub fn resolve_download_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.download_dir {
            return Ok(dir.clone());
        }
        let xdg_dirs = xdg::BaseDirectories::with_prefix("vdq")?;
        Ok(xdg_dirs.get_data_home().join("downloads"))
    }

    /// Retry section or built-in defaults.
    pub fn retry_or_default(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("vdq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<VdqConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = VdqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: VdqConfig = toml::from_str(&data)?;
    Ok(cfg)
}
