use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Progress marker of the last successful sync of one entity family with
/// one provider. Only written after a complete download loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Checkpoint {
    pub last_sync: Option<DateTime<Utc>>,
    pub merged: bool,
}

impl Checkpoint {
    /// Whether a provider reporting `last_activity` has anything new for us.
    ///
    /// Families that were never merged always need a pass.
    pub fn needs_sync(&self, last_activity: Option<DateTime<Utc>>) -> bool {
        if !self.merged {
            return true;
        }
        match (last_activity, self.last_sync) {
            (Some(activity), Some(last)) => activity > last,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}
