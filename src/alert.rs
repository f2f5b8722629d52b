//! data structures for deserializing incoming alert batches
use std::collections::HashMap;

use serde::Deserialize;

/// label marking an alert as eligible for automatic remediation
pub const SEVERITY_LABEL: &str = "severity";
/// `severity` value that qualifies an alert for a restart
pub const HEAL_SEVERITY: &str = "heal";
/// label naming the container to restart
pub const JOB_LABEL: &str = "job";

/// webhook payload received from alertmanager
///
/// Lives for one request only; alertmanager sends more fields than we
/// consume, serde drops the rest.
#[derive(Clone, Debug, Deserialize)]
pub struct AlertBatch {
    pub status: String,
    pub alerts: Vec<Alert>,
}

/// a single alert inside a batch
#[derive(Clone, Debug, Deserialize)]
pub struct Alert {
    pub labels: HashMap<String, String>,
}

impl Alert {
    /// true iff the `severity` label is exactly `"heal"` (case-sensitive)
    pub fn wants_heal(&self) -> bool {
        self.labels.get(SEVERITY_LABEL).map(String::as_str) == Some(HEAL_SEVERITY)
    }

    /// restart target from the `job` label, empty string if the label is absent
    pub fn job(&self) -> &str {
        self.labels.get(JOB_LABEL).map_or("", String::as_str)
    }
}
