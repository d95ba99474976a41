//! core::config::schema
//!
//! Configuration file schema.
//!
//! # Location
//!
//! Searched in order:
//! 1. `--config <path>`
//! 2. `$GITHUBFILE_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/githubfile/config.toml`
//! 4. `~/.githubfile/config.toml`
//!
//! # Validation
//!
//! Values are validated after parsing. Every field is optional in the file;
//! required settings may come from the environment instead.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// The configuration file.
///
/// # Example
///
/// ```toml
/// github_token = "ghp_xxx"
/// github_email = "bot@example.com"
/// github_username = "infra-bot"
/// commit_message_prefix = "[infra]"
/// gpg_secret_key = "LS0tLS1CRUdJTi..."
/// gpg_passphrase = "secret"
/// api_base = "https://github.example.com/api/v3"
/// ```
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Token used against the GitHub API
    pub github_token: Option<String>,

    /// Email of the commit author and committer
    pub github_email: Option<String>,

    /// Name of the commit author and committer
    pub github_username: Option<String>,

    /// Prefix prepended to every commit message
    pub commit_message_prefix: Option<String>,

    /// Armored GPG secret key, optionally base64-encoded
    pub gpg_secret_key: Option<String>,

    /// Passphrase of the GPG secret key
    pub gpg_passphrase: Option<String>,

    /// GitHub API base URL
    pub api_base: Option<String>,
}

// Custom Debug to avoid exposing secrets
impl std::fmt::Debug for ConfigFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigFile")
            .field("has_github_token", &self.github_token.is_some())
            .field("github_email", &self.github_email)
            .field("github_username", &self.github_username)
            .field("commit_message_prefix", &self.commit_message_prefix)
            .field("has_gpg_secret_key", &self.gpg_secret_key.is_some())
            .field("has_gpg_passphrase", &self.gpg_passphrase.is_some())
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl ConfigFile {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid. Empty
    /// values are unset and never invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(api_base) = self.api_base.as_deref().filter(|v| !v.is_empty()) {
            validate_api_base(api_base)?;
        }
        Ok(())
    }
}

/// The API base must be an absolute http(s) URL.
pub(super) fn validate_api_base(api_base: &str) -> Result<(), ConfigError> {
    if api_base.starts_with("https://") || api_base.starts_with("http://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue(format!(
            "api_base '{}' must start with http:// or https://",
            api_base
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full() {
        let toml = r#"
            github_token = "t"
            github_email = "bot@example.com"
            github_username = "bot"
            commit_message_prefix = "[infra]"
            gpg_secret_key = "key"
            gpg_passphrase = "pass"
            api_base = "https://ghe.example.com/api/v3"
        "#;
        let config: ConfigFile = toml::from_str(toml).unwrap();
        assert_eq!(config.github_username.as_deref(), Some("bot"));
        assert_eq!(config.commit_message_prefix.as_deref(), Some("[infra]"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_empty() {
        let config: ConfigFile = toml::from_str("").unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn unknown_fields_rejected() {
        let result: Result<ConfigFile, _> = toml::from_str("github_tokn = \"t\"");
        assert!(result.is_err());
    }

    #[test]
    fn invalid_api_base() {
        let config = ConfigFile {
            api_base: Some("api.github.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn empty_api_base_is_unset() {
        let config: ConfigFile = toml::from_str("api_base = \"\"").unwrap();
        assert_eq!(config.api_base.as_deref(), Some(""));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = ConfigFile {
            github_token: Some("ghp_secret".into()),
            gpg_passphrase: Some("hunter2".into()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("ghp_secret"));
        assert!(!debug.contains("hunter2"));
    }
}
