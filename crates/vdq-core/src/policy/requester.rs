use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Subscription tier of a signed-in account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Pro,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Pro => "pro",
        }
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "free" => Ok(Tier::Free),
            "pro" => Ok(Tier::Pro),
            other => Err(format!("unknown tier '{other}' (expected free or pro)")),
        }
    }
}

/// Who a job belongs to. Stored on the job as JSON so a retry can re-resolve
/// the policy that applied at submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Requester {
    Account { id: String, tier: Tier },
    /// Not signed in; quota is tracked per session.
    Guest { session: String },
}

impl Requester {
    pub fn account(id: impl Into<String>, tier: Tier) -> Self {
        Requester::Account {
            id: id.into(),
            tier,
        }
    }

    pub fn guest(session: impl Into<String>) -> Self {
        Requester::Guest {
            session: session.into(),
        }
    }

    /// Stable key used for usage counters and per-requester job counts.
    pub fn key(&self) -> String {
        match self {
            Requester::Account { id, .. } => format!("account:{id}"),
            Requester::Guest { session } => format!("guest:{session}"),
        }
    }
}

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requester::Account { id, tier } => write!(f, "{id} ({})", tier.as_str()),
            Requester::Guest { session } => write!(f, "guest {session}"),
        }
    }
}
