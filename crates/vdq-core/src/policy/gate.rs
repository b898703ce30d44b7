use crate::config::PolicyConfig;
use crate::error::VdqError;
use crate::media::{FormatDescriptor, MediaFormat, NewMediaFormat};

use super::requester::{Requester, Tier};

/// Limits that apply to one requester. Derived from config, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub daily_limit: Option<u32>,
    pub max_resolution: Option<u32>,
    pub unlimited: bool,
}

/// The parts of a format the gate looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatCandidate {
    pub height: Option<u32>,
    pub premium_only: bool,
}

impl From<&MediaFormat> for FormatCandidate {
    fn from(f: &MediaFormat) -> Self {
        Self {
            height: f.height,
            premium_only: f.is_premium_only,
        }
    }
}

impl From<&NewMediaFormat> for FormatCandidate {
    fn from(f: &NewMediaFormat) -> Self {
        Self {
            height: f.height,
            premium_only: f.is_premium_only,
        }
    }
}

impl From<&FormatDescriptor> for FormatCandidate {
    fn from(f: &FormatDescriptor) -> Self {
        Self {
            height: f.height,
            premium_only: f.is_premium_only(),
        }
    }
}

impl Policy {
    /// Decide whether a requester who already has `downloads_today` counted
    /// downloads may take `candidate`. Has no side effects.
    pub fn evaluate(&self, downloads_today: u32, candidate: FormatCandidate) -> Result<(), VdqError> {
        if self.unlimited {
            return Ok(());
        }
        self.check_quota(downloads_today)?;
        self.check_format(candidate)
    }

    fn check_quota(&self, downloads_today: u32) -> Result<(), VdqError> {
        match self.daily_limit {
            Some(limit) if downloads_today >= limit => Err(VdqError::RateLimitExceeded {
                used: downloads_today,
                limit,
            }),
            _ => Ok(()),
        }
    }

    /// Resolution and premium checks only; used again before every retry.
    pub fn check_format(&self, candidate: FormatCandidate) -> Result<(), VdqError> {
        if self.unlimited {
            return Ok(());
        }
        if let (Some(h), Some(max)) = (candidate.height, self.max_resolution) {
            if h > max {
                return Err(VdqError::FormatNotAllowed(format!(
                    "{h}p exceeds your plan's maximum of {max}p"
                )));
            }
        }
        if candidate.premium_only {
            return Err(VdqError::FormatNotAllowed(
                "premium-only formats require an unlimited plan".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolves the effective `Policy` for a requester from configuration.
#[derive(Debug, Clone, Default)]
pub struct PolicyEngine {
    config: PolicyConfig,
}

impl PolicyEngine {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn resolve(&self, requester: &Requester) -> Policy {
        let limits = match requester {
            Requester::Guest { .. } => self.config.anonymous,
            Requester::Account { tier: Tier::Free, .. } => self.config.free,
            Requester::Account { tier: Tier::Pro, .. } => self.config.pro,
        };
        limits.into()
    }

    /// Resolve the requester's policy and evaluate one request against it.
    pub fn authorize(
        &self,
        requester: &Requester,
        downloads_today: u32,
        candidate: FormatCandidate,
    ) -> Result<(), VdqError> {
        self.resolve(requester).evaluate(downloads_today, candidate)
    }
}

/// Format ids from a ranked list that the policy lets the requester pick, and
/// the first of them as the default choice.
///
/// Uses the same checks as `check_format`: formats above the resolution cap
/// and premium-only formats are left out unless the policy is unlimited.
/// Formats with unknown height pass the resolution check.
pub fn allowed_format_ids(
    policy: &Policy,
    formats: &[FormatDescriptor],
) -> (Vec<String>, Option<String>) {
    let ids: Vec<String> = formats
        .iter()
        .filter(|f| policy.check_format(FormatCandidate::from(*f)).is_ok())
        .map(|f| f.format_id.clone())
        .collect();
    let default = ids.first().cloned();
    (ids, default)
}
