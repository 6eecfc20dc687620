use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::Utc;
use uuid::Uuid;

/// Per-job identifier used to name the workspace directory and the archive.
///
/// The second-resolution timestamp keeps artifacts sortable and traceable; the
/// random suffix keeps two jobs started in the same second apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobTimestamp(String);

impl JobTimestamp {
    /// `YYYYMMDD_HHMMSS_<8 hex>` for the current instant.
    pub fn now() -> Self {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let suffix = Uuid::new_v4().simple().to_string();
        JobTimestamp(format!("{}_{}", stamp, &suffix[..8]))
    }

    /// Wrap a caller-supplied identifier. It is validated by the orchestrator
    /// before it is used to build any path.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        JobTimestamp(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for JobTimestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for JobTimestamp {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
