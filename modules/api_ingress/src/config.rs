use serde::{Deserialize, Serialize};

/// HTTP ingress settings, read from `modules.api_ingress`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct ApiIngressConfig {
    pub bind_addr: String,
    pub enable_docs: bool,
    pub cors_enabled: bool,
    /// Prefix for every route, e.g. `/api`. Empty means mounted at the root.
    pub base_path: String,
    pub body_limit_bytes: usize,
    pub request_timeout_secs: u64,
}

impl Default for ApiIngressConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            enable_docs: false,
            cors_enabled: false,
            base_path: String::new(),
            body_limit_bytes: 1024 * 1024,
            request_timeout_secs: 30,
        }
    }
}

impl ApiIngressConfig {
    /// `base_path` normalized to `/segment[/segment..]`, or `None` for the root.
    pub fn normalized_base_path(&self) -> Option<String> {
        let trimmed = self.base_path.trim().trim_matches('/');
        if trimmed.is_empty() {
            None
        } else {
            Some(format!("/{trimmed}"))
        }
    }
}
