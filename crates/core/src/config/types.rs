use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub origin: OriginConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub gc: GcConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
///
/// The index and the file tree live in separate SQLite files so the tree
/// can be swapped for another backend without touching the index.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,
    #[serde(default = "default_tree_path")]
    pub tree_path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            tree_path: default_tree_path(),
        }
    }
}

fn default_index_path() -> PathBuf {
    PathBuf::from("debridfs.db")
}

fn default_tree_path() -> PathBuf {
    PathBuf::from("filesystem.db")
}

/// Remote origin (Real-Debrid compatible API) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OriginConfig {
    /// REST base URL (e.g., "https://api.real-debrid.com/rest/1.0")
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Bearer token for the origin API
    pub api_token: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_api_url() -> String {
    "https://api.real-debrid.com/rest/1.0".to_string()
}

fn default_timeout() -> u32 {
    30
}

/// How container directories are named under the library root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryNaming {
    /// Remote entry id.
    #[default]
    Id,
    /// Display name of the entry.
    Name,
    /// Display name with the remote id appended, e.g. "Movie [abc123]".
    NameWithId,
}

/// Library layout configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryConfig {
    /// Name of the directory under the tree root holding all synced content.
    #[serde(default = "default_root_dir")]
    pub root_dir: String,
    #[serde(default)]
    pub naming: DirectoryNaming,
    /// Content type tag marking files whose bytes live on the origin.
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            naming: DirectoryNaming::default(),
            content_type: default_content_type(),
        }
    }
}

fn default_root_dir() -> String {
    "debrid".to_string()
}

fn default_content_type() -> String {
    "application/x-debrid-stream".to_string()
}

/// Reconciliation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Entries requested per catalog page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Run one reconciliation pass right after startup.
    #[serde(default = "default_true")]
    pub sync_on_startup: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            sync_on_startup: true,
        }
    }
}

fn default_page_size() -> u32 {
    5000
}

fn default_true() -> bool {
    true
}

/// Change detection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollerConfig {
    /// Page watched by the content-hash poller. No hash poller runs when unset.
    #[serde(default)]
    pub poll_url: Option<String>,
    /// CSS selector of the fragment that is hashed.
    #[serde(default = "default_element")]
    pub element: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Period of the unconditional fallback poller.
    #[serde(default = "default_fallback_interval")]
    pub fallback_interval_secs: u64,
    /// Request timeout for fetching the watched page.
    #[serde(default = "default_poll_timeout")]
    pub timeout_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_url: None,
            element: default_element(),
            poll_interval_secs: default_poll_interval(),
            fallback_interval_secs: default_fallback_interval(),
            timeout_secs: default_poll_timeout(),
        }
    }
}

fn default_element() -> String {
    "table".to_string()
}

fn default_poll_interval() -> u64 {
    60
}

fn default_fallback_interval() -> u64 {
    600
}

fn default_poll_timeout() -> u64 {
    30
}

/// Garbage collector configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GcConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_gc_interval")]
    pub interval_secs: u64,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_gc_interval(),
        }
    }
}

fn default_gc_interval() -> u64 {
    600
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub origin: SanitizedOriginConfig,
    pub library: LibraryConfig,
    pub sync: SyncConfig,
    pub poller: PollerConfig,
    pub gc: GcConfig,
}

/// Sanitized origin config (token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedOriginConfig {
    pub api_url: String,
    pub api_token_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            origin: SanitizedOriginConfig {
                api_url: config.origin.api_url.clone(),
                api_token_configured: !config.origin.api_token.is_empty(),
                timeout_secs: config.origin.timeout_secs,
            },
            library: config.library.clone(),
            sync: config.sync.clone(),
            poller: config.poller.clone(),
            gc: config.gc.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_toml() {
        let config: Config = toml::from_str(
            r#"
[origin]
api_token = "secret"
"#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.origin.api_url, "https://api.real-debrid.com/rest/1.0");
        assert_eq!(config.origin.timeout_secs, 30);
        assert_eq!(config.library.root_dir, "debrid");
        assert_eq!(config.library.naming, DirectoryNaming::Id);
        assert_eq!(config.sync.page_size, 5000);
        assert!(config.sync.sync_on_startup);
        assert!(config.poller.poll_url.is_none());
        assert_eq!(config.poller.element, "table");
        assert_eq!(config.poller.poll_interval_secs, 60);
        assert_eq!(config.poller.timeout_secs, 30);
        assert_eq!(config.gc.interval_secs, 600);
    }

    #[test]
    fn test_naming_policy_parsing() {
        let config: Config = toml::from_str(
            r#"
[origin]
api_token = "secret"

[library]
naming = "name_with_id"
"#,
        )
        .unwrap();

        assert_eq!(config.library.naming, DirectoryNaming::NameWithId);
    }

    #[test]
    fn test_sanitized_config_hides_token() {
        let config: Config = toml::from_str(
            r#"
[origin]
api_token = "super-secret"
"#,
        )
        .unwrap();

        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.origin.api_token_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("super-secret"));
    }
}
