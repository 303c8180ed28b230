//! Secret resolution for credentials the server holds itself.
//!
//! The only such credential is the identity provider's backend key, used to
//! look up user profiles. It may be given in three ways, highest priority
//! first:
//!
//! 1. **Direct value** in the config file (`secretKey`), for local testing
//! 2. **File** (`secretKeyFile`), for mounted container secrets
//! 3. **Environment variable** (`secretKeyEnvVar`), for hosted deployments

use secrecy::SecretString;

/// Error type for secret resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided (need one of: direct value, file path, or env var name)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// Resolves a secret from the first non-empty source. Values read from files
/// and environment variables are trimmed.
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString> {
    if let Some(value) = direct.filter(|v| !v.is_empty()) {
        return Ok(SecretString::from(value.to_string()));
    }

    if let Some(path) = file_path.filter(|p| !p.is_empty()) {
        let expanded = expand_home(path);
        return std::fs::read_to_string(&expanded)
            .map(|content| SecretString::from(content.trim().to_string()))
            .map_err(|e| SecretError::FileReadError {
                path: expanded,
                source: e,
            });
    }

    if let Some(name) = env_var.filter(|n| !n.is_empty()) {
        return match std::env::var(name) {
            Ok(value) => Ok(SecretString::from(value.trim().to_string())),
            Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                name: name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                name: name.to_string(),
            }),
        };
    }

    Err(SecretError::NoSourceProvided)
}

/// Like [`resolve_secret`], but an unconfigured secret is `Ok(None)`.
pub fn resolve_secret_optional(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<Option<SecretString>> {
    match resolve_secret(direct, file_path, env_var) {
        Ok(secret) => Ok(Some(secret)),
        Err(SecretError::NoSourceProvided) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Expands a leading `~` to the current user's home directory.
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    #[serial]
    fn test_direct_value_takes_priority() {
        std::env::set_var("TMP_TEST_SECRET_1", "env_value");
        let result = resolve_secret(Some("direct_value"), None, Some("TMP_TEST_SECRET_1")).unwrap();
        assert_eq!(result.expose_secret(), "direct_value");
        std::env::remove_var("TMP_TEST_SECRET_1");
    }

    #[test]
    #[serial]
    fn test_file_takes_priority_over_env() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "  file_value  ").unwrap();

        std::env::set_var("TMP_TEST_SECRET_2", "env_value");
        let result = resolve_secret(
            None,
            Some(file.path().to_str().unwrap()),
            Some("TMP_TEST_SECRET_2"),
        )
        .unwrap();
        assert_eq!(result.expose_secret(), "file_value");
        std::env::remove_var("TMP_TEST_SECRET_2");
    }

    #[test]
    #[serial]
    fn test_env_var_fallback_ignores_empty_sources() {
        std::env::set_var("TMP_TEST_SECRET_3", "sk_test_123\n");
        let result = resolve_secret(Some(""), Some(""), Some("TMP_TEST_SECRET_3")).unwrap();
        assert_eq!(result.expose_secret(), "sk_test_123");
        std::env::remove_var("TMP_TEST_SECRET_3");
    }

    #[test]
    fn test_missing_sources() {
        assert!(matches!(
            resolve_secret(None, None, None),
            Err(SecretError::NoSourceProvided)
        ));
        assert!(resolve_secret_optional(None, None, None).unwrap().is_none());
        assert!(matches!(
            resolve_secret(None, Some("/nonexistent/path/to/secret"), None),
            Err(SecretError::FileReadError { .. })
        ));
        assert!(matches!(
            resolve_secret_optional(None, None, Some("TMP_DEFINITELY_NOT_SET_12345")),
            Err(SecretError::EnvVarNotSet { .. })
        ));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/path"), "/abs/path");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_home("~/secret"),
                format!("{}/secret", home.to_string_lossy())
            );
        }
    }
}
