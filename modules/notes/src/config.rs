use serde::{Deserialize, Serialize};

/// Configuration for the notes module
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotesConfig {
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
    #[serde(default = "default_max_username_length")]
    pub max_username_length: usize,
    /// Accept `Authorization: Basic` in addition to token auth.
    #[serde(default = "default_allow_basic_auth")]
    pub allow_basic_auth: bool,
    #[serde(default)]
    pub argon2: Argon2Config,
}

/// Argon2id cost parameters used for new password hashes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Argon2Config {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            min_password_length: default_min_password_length(),
            max_username_length: default_max_username_length(),
            allow_basic_auth: default_allow_basic_auth(),
            argon2: Argon2Config::default(),
        }
    }
}

// argon2 crate defaults (OWASP minimums)
impl Default for Argon2Config {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

fn default_min_password_length() -> usize {
    8
}

fn default_max_username_length() -> usize {
    150
}

fn default_allow_basic_auth() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_section_uses_defaults() {
        let cfg: NotesConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(cfg.min_password_length, 8);
        assert_eq!(cfg.max_username_length, 150);
        assert!(cfg.allow_basic_auth);
        assert_eq!(cfg.argon2.memory_kib, 19 * 1024);
    }

    #[test]
    fn argon2_section_is_partial() {
        let cfg: NotesConfig = serde_json::from_value(serde_json::json!({
            "allow_basic_auth": false,
            "argon2": { "memory_kib": 64 }
        }))
        .unwrap();
        assert!(!cfg.allow_basic_auth);
        assert_eq!(cfg.argon2.memory_kib, 64);
        assert_eq!(cfg.argon2.iterations, 2);
    }
}
