//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[storage]
; Directory holding regions.json and one tile tree per region
directory = {}

[source]
; Live tile server. Use {{z}}, {{x}} and {{y}} placeholders; a bare base URL
; gets /{{z}}/{{x}}/{{y}}.png appended.
url_template = {}
; User-Agent sent with every tile request
user_agent = {}

[download]
; Concurrent tile fetches during a region download (minimum 1)
parallel_downloads = {}
; Retries per tile after the first attempt
max_retries = {}
; Per-tile fetch timeout in seconds
timeout = {}
; Backoff base in milliseconds; retry n waits base * 2^n
retry_base_delay_ms = {}

[resolver]
; Seconds to wait for the live server when a tile is not cached
live_timeout = {}

[logging]
; Log file path
file = {}
"#,
        path_to_string(&config.storage.directory),
        config.source.url_template,
        config.source.user_agent,
        config.download.parallel_downloads,
        config.download.max_retries,
        config.download.timeout,
        config.download.retry_base_delay_ms,
        config.resolver.live_timeout,
        path_to_string(&config.logging.file),
    )
}

/// Render a path, abbreviating the home directory to `~`.
pub(super) fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
