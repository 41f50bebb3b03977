//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::{Ini, Properties};
use std::path::PathBuf;
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [storage] section
    if let Some(section) = ini.section(Some("storage")) {
        if let Some(v) = non_empty(section, "directory") {
            config.storage.directory = expand_tilde(v);
        }
    }

    // [source] section
    if let Some(section) = ini.section(Some("source")) {
        if let Some(v) = non_empty(section, "url_template") {
            if !(v.starts_with("http://") || v.starts_with("https://")) {
                return Err(invalid(
                    "source",
                    "url_template",
                    v,
                    "must start with http:// or https://",
                ));
            }
            config.source.url_template = v.to_string();
        }
        if let Some(v) = non_empty(section, "user_agent") {
            config.source.user_agent = v.to_string();
        }
    }

    // [download] section
    if let Some(section) = ini.section(Some("download")) {
        if let Some(v) = section.get("parallel_downloads") {
            config.download.parallel_downloads =
                parse_positive(v, "download", "parallel_downloads", "a positive integer")?;
        }
        if let Some(v) = section.get("max_retries") {
            config.download.max_retries = parse_number(
                v,
                "download",
                "max_retries",
                "must be a non-negative integer",
            )?;
        }
        if let Some(v) = section.get("timeout") {
            config.download.timeout =
                parse_positive(v, "download", "timeout", "a positive integer (seconds)")?;
        }
        if let Some(v) = section.get("retry_base_delay_ms") {
            config.download.retry_base_delay_ms = parse_number(
                v,
                "download",
                "retry_base_delay_ms",
                "must be a non-negative integer (milliseconds)",
            )?;
        }
    }

    // [resolver] section
    if let Some(section) = ini.section(Some("resolver")) {
        if let Some(v) = section.get("live_timeout") {
            config.resolver.live_timeout =
                parse_positive(v, "resolver", "live_timeout", "a positive integer (seconds)")?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section, "file") {
            config.logging.file = expand_tilde(v);
        }
    }

    Ok(config)
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number<T: FromStr>(
    value: &str,
    section: &str,
    key: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

/// Parses an integer that must be at least 1.
fn parse_positive<T>(value: &str, section: &str, key: &str, what: &str) -> Result<T, ConfigFileError>
where
    T: FromStr + PartialOrd + From<u8>,
{
    let reason = format!("must be {}", what);
    let parsed: T = parse_number(value, section, key, &reason)?;
    if parsed < T::from(1) {
        return Err(invalid(section, key, value, &reason));
    }
    Ok(parsed)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
