//! Environment variable substitution for configuration text
//!
//! Variables are referenced with `${VAR_NAME}`, which keeps secrets such as
//! inline service account keys out of checked-in configuration files.

use std::env;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::config::ConfigError;

/// Matches `${VAR_NAME}` references
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// Replace every `${VAR_NAME}` in `input` with the variable's value.
///
/// Fails with a `ValidationError` naming every unset variable, each once.
///
/// ```ignore
/// use gcs_flysystem::env::substitute_env_vars;
///
/// std::env::set_var("GCS_BUCKET", "assets");
/// assert_eq!(substitute_env_vars("bucket: ${GCS_BUCKET}").unwrap(), "bucket: assets");
/// ```
pub fn substitute_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut missing: Vec<String> = Vec::new();

    let output = ENV_VAR_PATTERN.replace_all(input, |caps: &Captures<'_>| {
        let name = &caps[1];
        match env::var(name) {
            Ok(value) => value,
            Err(_) => {
                if !missing.iter().any(|m| m == name) {
                    missing.push(name.to_string());
                }
                String::new()
            }
        }
    });

    if !missing.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "Missing environment variables: {}",
            missing.join(", ")
        )));
    }

    Ok(output.into_owned())
}
