//! # Configuration
//!
//! `tablegrid.json`: where to listen, where the data lives and which grid
//! views to serve.
//!
//! ```json
//! {
//!   "server": { "port": 8080 },
//!   "data": "./data.json",
//!   "views": [
//!     {
//!       "resource": "people",
//!       "fields": { "name": "{first} {last}", "team": "team__name" },
//!       "download_access": [3]
//!     }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::access::{AccessList, AccessPolicy};
use crate::grid::errors::GridError;
use crate::grid::filters::{FilterOptions, DEFAULT_HASH_SUFFIX};
use crate::grid::mapping::FieldMapping;
use crate::grid::schema::Schema;
use crate::grid::view::{GridView, ViewOptions, DEFAULT_FILTER_KEY, DEFAULT_OWNER_FIELD, DEFAULT_SCOPE_KEY};

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Invalid config JSON: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Invalid view {resource:?}: {source}")]
    View {
        resource: String,
        #[source]
        source: GridError,
    },
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 8080)
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// One grid view as declared in the config file
#[derive(Debug, Clone, Deserialize)]
pub struct ViewConfig {
    /// Name the view is served under
    pub resource: String,

    /// Backing collection (default: the resource name)
    #[serde(default)]
    pub collection: Option<String>,

    /// Output column → field path or template
    pub fields: FieldMapping,

    #[serde(default)]
    pub schema: Schema,

    #[serde(default = "default_view_access")]
    pub view_access: AccessList,

    #[serde(default = "default_download_access")]
    pub download_access: AccessList,

    #[serde(default)]
    pub export_headers: Option<Vec<String>>,

    #[serde(default = "default_filter_key")]
    pub filter_key: String,

    #[serde(default = "default_scope_key")]
    pub scope_key: String,

    #[serde(default = "default_owner_field")]
    pub owner_field: String,

    /// UTC offset of timestamps typed into filters, in minutes
    #[serde(default)]
    pub source_utc_offset_minutes: i32,

    #[serde(default = "default_hash_suffix")]
    pub hash_suffix: String,
}

fn default_view_access() -> AccessList {
    AccessList::Open(true)
}

fn default_download_access() -> AccessList {
    AccessList::Open(false)
}

fn default_filter_key() -> String {
    DEFAULT_FILTER_KEY.to_string()
}

fn default_scope_key() -> String {
    DEFAULT_SCOPE_KEY.to_string()
}

fn default_owner_field() -> String {
    DEFAULT_OWNER_FIELD.to_string()
}

fn default_hash_suffix() -> String {
    DEFAULT_HASH_SUFFIX.to_string()
}

impl ViewConfig {
    fn view_error(&self, source: GridError) -> ConfigError {
        ConfigError::View {
            resource: self.resource.clone(),
            source,
        }
    }

    /// Build the runtime view, checking the mapping against the schema
    pub fn build(&self) -> ConfigResult<GridView> {
        let source_offset = FixedOffset::east_opt(self.source_utc_offset_minutes * 60).ok_or_else(|| {
            self.view_error(GridError::Config(format!(
                "source_utc_offset_minutes out of range: {}",
                self.source_utc_offset_minutes
            )))
        })?;

        let options = ViewOptions {
            filter_key: self.filter_key.clone(),
            scope_key: self.scope_key.clone(),
            owner_field: self.owner_field.clone(),
            filter_options: FilterOptions {
                source_offset,
                hash_suffix: self.hash_suffix.clone(),
            },
            export_headers: self.export_headers.clone(),
        };

        let mut builder = GridView::builder(self.resource.clone(), self.fields.clone())
            .schema(Arc::new(self.schema.clone()))
            .authorizer(Arc::new(AccessPolicy::new(
                self.view_access.clone(),
                self.download_access.clone(),
            )))
            .options(options);
        if let Some(collection) = &self.collection {
            builder = builder.collection(collection.clone());
        }

        builder.build().map_err(|e| self.view_error(e))
    }
}

/// Whole config file
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// JSON data file loaded into the in-memory store
    #[serde(default = "default_data_path")]
    pub data: PathBuf,

    #[serde(default)]
    pub views: Vec<ViewConfig>,
}

fn default_data_path() -> PathBuf {
    PathBuf::from("./data.json")
}

impl AppConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut config = Self::from_json(&content)?;

        // A relative data path is relative to the config file
        if config.data.is_relative() {
            if let Some(dir) = path.parent() {
                config.data = dir.join(&config.data);
            }
        }
        Ok(config)
    }

    pub fn from_json(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Build every view, keyed by resource name
    pub fn build_views(&self) -> ConfigResult<HashMap<String, Arc<GridView>>> {
        let mut views = HashMap::new();
        for view_config in &self.views {
            let view = view_config.build()?;
            if views.insert(view_config.resource.clone(), Arc::new(view)).is_some() {
                return Err(ConfigError::Invalid(format!(
                    "duplicate view resource {:?}",
                    view_config.resource
                )));
            }
        }
        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "server": {"port": 9000},
        "data": "rows.json",
        "views": [
            {
                "resource": "people",
                "collection": "person",
                "fields": {"name": "{first} {last}", "team": "team__name"},
                "schema": {"fields": {
                    "first": {"type": "string"},
                    "last": {"type": "string"},
                    "team": {"type": "relation", "fields": {"name": {"type": "string"}}}
                }},
                "download_access": [3],
                "export_headers": ["Name", "Team"],
                "source_utc_offset_minutes": -300
            },
            {"resource": "teams", "fields": ["id", "name"]}
        ]
    }"#;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config.server.socket_addr(), "0.0.0.0:8080");
        assert!(config.server.cors_origins.is_empty());
        assert_eq!(config.data, PathBuf::from("./data.json"));
        assert!(config.views.is_empty());
    }

    #[test]
    fn test_view_defaults() {
        let config = AppConfig::from_json(SAMPLE).unwrap();
        let teams = &config.views[1];
        assert_eq!(teams.filter_key, "sFilters");
        assert_eq!(teams.scope_key, "mSearch");
        assert_eq!(teams.owner_field, "user__id");
        assert_eq!(teams.hash_suffix, "sha256");
        assert_eq!(teams.view_access, AccessList::Open(true));
        assert_eq!(teams.download_access, AccessList::Open(false));
        assert!(!teams.fields.is_keyed());
    }

    #[test]
    fn test_build_views() {
        let config = AppConfig::from_json(SAMPLE).unwrap();
        let views = config.build_views().unwrap();
        assert_eq!(views.len(), 2);

        let people = &views["people"];
        assert_eq!(people.collection(), "person");
        assert_eq!(
            people.options().filter_options.source_offset,
            FixedOffset::west_opt(5 * 3600).unwrap()
        );
        assert_eq!(views["teams"].collection(), "teams");
    }

    #[test]
    fn test_unresolved_field_is_view_error() {
        let config = AppConfig::from_json(
            r#"{"views": [{
                "resource": "people",
                "fields": ["name", "age"],
                "schema": {"fields": {"name": {"type": "string"}}}
            }]}"#,
        )
        .unwrap();
        assert!(matches!(
            config.build_views(),
            Err(ConfigError::View { source: GridError::Config(_), .. })
        ));
    }

    #[test]
    fn test_duplicate_resource() {
        let config = AppConfig::from_json(
            r#"{"views": [{"resource": "a", "fields": ["id"]}, {"resource": "a", "fields": ["id"]}]}"#,
        )
        .unwrap();
        assert!(matches!(config.build_views(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_resolves_data_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tablegrid.json");
        fs::write(&path, SAMPLE).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.data, dir.path().join("rows.json"));

        assert!(matches!(
            AppConfig::load(&dir.path().join("missing.json")),
            Err(ConfigError::Read { .. })
        ));
    }
}
