use crate::config::{default_upload_endpoint, default_upload_timeout_secs};

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Upload service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Endpoint receiving the multipart POST.
    #[serde(default = "default_upload_endpoint")]
    pub endpoint: String,
    /// Whole-request timeout in seconds.
    #[serde(default = "default_upload_timeout_secs")]
    pub timeout_secs: u64,
}

impl UploadConfig {
    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: default_upload_endpoint(),
            timeout_secs: default_upload_timeout_secs(),
        }
    }
}
