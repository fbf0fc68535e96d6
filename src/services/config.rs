use crate::services::logger::Logger;
use crate::services::platform::Platform;
use crate::services::region::Region;
use crate::utils::user_paths::{exe_dir, expand_home_path};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "clio-config.json";
const HOST_OVERRIDE_ENV: &str = "CLAUDE_DESKTOP_CONFIG";
const HOST_OVERRIDE_KEY: &str = "clio";

/// One source of configuration. Every key is optional; absent keys leave the
/// lower-priority value in place when layers are overlaid.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigLayer {
    #[serde(default, alias = "client_id")]
    pub client_id: Option<String>,
    #[serde(default, alias = "client_secret")]
    pub client_secret: Option<String>,
    #[serde(default, alias = "access_token")]
    pub access_token: Option<String>,
    #[serde(default, alias = "refresh_token")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ConfigLayer {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            client_id: lookup("CLIO_CLIENT_ID"),
            client_secret: lookup("CLIO_CLIENT_SECRET"),
            access_token: lookup("CLIO_ACCESS_TOKEN"),
            refresh_token: lookup("CLIO_REFRESH_TOKEN"),
            region: lookup("CLIO_REGION"),
        }
        .normalized()
    }

    pub fn normalized(self) -> Self {
        Self {
            client_id: non_empty(self.client_id),
            client_secret: non_empty(self.client_secret),
            access_token: non_empty(self.access_token),
            refresh_token: non_empty(self.refresh_token),
            region: non_empty(self.region),
        }
    }

    pub fn overlay(&mut self, other: ConfigLayer) {
        let other = other.normalized();
        if other.client_id.is_some() {
            self.client_id = other.client_id;
        }
        if other.client_secret.is_some() {
            self.client_secret = other.client_secret;
        }
        if other.access_token.is_some() {
            self.access_token = other.access_token;
        }
        if other.refresh_token.is_some() {
            self.refresh_token = other.refresh_token;
        }
        if other.region.is_some() {
            self.region = other.region;
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigSourceError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid JSON in {}: {source}", .path.display())]
    InvalidFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid CLAUDE_DESKTOP_CONFIG: {0}")]
    InvalidHostOverride(#[source] serde_json::Error),
    #[error("CLAUDE_DESKTOP_CONFIG.clio must be an object")]
    HostOverrideShape,
}

/// Resolved configuration, immutable once built.
#[derive(Clone, PartialEq)]
pub struct EffectiveConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub region: Region,
    pub api_base: String,
    pub auth_base: String,
    pub grow_base: String,
    pub source_file: Option<PathBuf>,
}

impl EffectiveConfig {
    pub fn for_region(region: Region) -> Self {
        let endpoints = region.endpoints();
        Self {
            client_id: None,
            client_secret: None,
            access_token: None,
            refresh_token: None,
            region,
            api_base: endpoints.api_base.to_string(),
            auth_base: endpoints.auth_base.to_string(),
            grow_base: endpoints
                .grow_base
                .unwrap_or(endpoints.api_base)
                .to_string(),
            source_file: None,
        }
    }

    fn from_layer(layer: ConfigLayer, source_file: Option<PathBuf>) -> Self {
        let region = Region::from_name(layer.region.as_deref());
        Self {
            client_id: layer.client_id,
            client_secret: layer.client_secret,
            access_token: layer.access_token,
            refresh_token: layer.refresh_token,
            source_file,
            ..Self::for_region(region)
        }
    }
}

impl fmt::Debug for EffectiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |value: &Option<String>| value.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("EffectiveConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &mask(&self.client_secret))
            .field("access_token", &mask(&self.access_token))
            .field("refresh_token", &mask(&self.refresh_token))
            .field("region", &self.region)
            .field("api_base", &self.api_base)
            .field("auth_base", &self.auth_base)
            .field("grow_base", &self.grow_base)
            .field("source_file", &self.source_file)
            .finish()
    }
}

pub struct ConfigResolver {
    logger: Logger,
    env: HashMap<String, String>,
    candidates: Vec<PathBuf>,
    flags: ConfigLayer,
}

impl ConfigResolver {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger: logger.child("config"),
            env: HashMap::new(),
            candidates: Vec::new(),
            flags: ConfigLayer::default(),
        }
    }

    /// Resolver over the live process environment and the default file
    /// candidates for `platform`.
    pub fn from_process(logger: Logger, flags: ConfigLayer, platform: Platform) -> Self {
        let env = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect::<HashMap<_, _>>();
        Self::new(logger)
            .with_env(env)
            .with_candidates(Self::default_candidates(platform))
            .with_flags(flags)
    }

    pub fn default_candidates(platform: Platform) -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from(CONFIG_FILE_NAME),
            expand_home_path("~/.clio-mcp/config.json"),
        ];
        if let Some(dir) = exe_dir() {
            paths.push(dir.join(CONFIG_FILE_NAME));
        }
        for extra in platform.config_paths() {
            if !paths.contains(&extra) {
                paths.push(extra);
            }
        }
        paths
    }

    pub fn with_env(mut self, env: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env = env.into_iter().collect();
        self
    }

    pub fn with_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn with_flags(mut self, flags: ConfigLayer) -> Self {
        self.flags = flags;
        self
    }

    pub fn resolve(&self) -> EffectiveConfig {
        let mut layer = ConfigLayer::from_lookup(|key| self.env.get(key).cloned());

        let mut source_file = None;
        if let Some((path, file_layer)) = self.first_file_layer() {
            self.logger.debug(
                "Loaded config file",
                Some(&serde_json::json!({"path": path.display().to_string()})),
            );
            layer.overlay(file_layer);
            source_file = Some(path);
        }

        match self.host_override_layer() {
            Ok(Some(host)) => layer.overlay(host),
            Ok(None) => {}
            Err(err) => self.logger.warn(
                "Ignoring host config override",
                Some(&serde_json::json!({"error": err.to_string()})),
            ),
        }

        layer.overlay(self.flags.clone());

        let config = EffectiveConfig::from_layer(layer, source_file);
        if config.client_id.is_none() {
            self.logger.warn(
                "No Client ID configured. Set CLIO_CLIENT_ID or use --client-id",
                None,
            );
        }
        config
    }

    fn first_file_layer(&self) -> Option<(PathBuf, ConfigLayer)> {
        for path in &self.candidates {
            match read_layer_file(path) {
                Ok(Some(layer)) => return Some((path.clone(), layer)),
                Ok(None) => continue,
                Err(err @ ConfigSourceError::InvalidFile { .. }) => {
                    self.logger.warn(
                        "Skipping unparsable config file",
                        Some(&serde_json::json!({"error": err.to_string()})),
                    );
                }
                Err(err) => {
                    self.logger.debug(
                        "Config file not readable",
                        Some(&serde_json::json!({"error": err.to_string()})),
                    );
                }
            }
        }
        None
    }

    fn host_override_layer(&self) -> Result<Option<ConfigLayer>, ConfigSourceError> {
        let Some(raw) = self
            .env
            .get(HOST_OVERRIDE_ENV)
            .filter(|raw| !raw.trim().is_empty())
        else {
            return Ok(None);
        };
        let parsed: Value =
            serde_json::from_str(raw).map_err(ConfigSourceError::InvalidHostOverride)?;
        match parsed.get(HOST_OVERRIDE_KEY) {
            None | Some(Value::Null) => Ok(None),
            Some(section @ Value::Object(_)) => serde_json::from_value(section.clone())
                .map(Some)
                .map_err(ConfigSourceError::InvalidHostOverride),
            Some(_) => Err(ConfigSourceError::HostOverrideShape),
        }
    }
}

/// `Ok(None)` when the file does not exist.
fn read_layer_file(path: &Path) -> Result<Option<ConfigLayer>, ConfigSourceError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigSourceError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str::<ConfigLayer>(&raw)
        .map(|layer| Some(layer.normalized()))
        .map_err(|source| ConfigSourceError::InvalidFile {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::logger::LogLevel;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("clio-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn resolver() -> ConfigResolver {
        ConfigResolver::new(Logger::new("test").with_level(LogLevel::Error))
    }

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn flags_override_file_override_env() {
        let dir = temp_dir();
        let file = dir.join(CONFIG_FILE_NAME);
        std::fs::write(&file, r#"{"clientId":"file-id","region":"EU"}"#).expect("write");

        let config = resolver()
            .with_env(env(&[
                ("CLIO_CLIENT_ID", "env-id"),
                ("CLIO_CLIENT_SECRET", "env-secret"),
            ]))
            .with_candidates(vec![file.clone()])
            .with_flags(ConfigLayer {
                region: Some("ca".to_string()),
                ..Default::default()
            })
            .resolve();

        assert_eq!(config.client_id.as_deref(), Some("file-id"));
        assert_eq!(config.client_secret.as_deref(), Some("env-secret"));
        assert_eq!(config.region, Region::Ca);
        assert_eq!(config.api_base, "https://ca.app.clio.com/api/v4");
        assert_eq!(config.grow_base, config.api_base);
        assert_eq!(config.source_file.as_deref(), Some(file.as_path()));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn each_source_outranks_the_ones_below_it() {
        let dir = temp_dir();
        let file = dir.join(CONFIG_FILE_NAME);
        std::fs::write(
            &file,
            r#"{"clientId":"file-id","accessToken":"file-token","refreshToken":"file-refresh"}"#,
        )
        .expect("write");

        let config = resolver()
            .with_env(env(&[
                ("CLIO_CLIENT_ID", "env-id"),
                ("CLIO_ACCESS_TOKEN", "env-token"),
                ("CLIO_REFRESH_TOKEN", "env-refresh"),
                ("CLIO_CLIENT_SECRET", "env-secret"),
                (
                    HOST_OVERRIDE_ENV,
                    r#"{"clio":{"clientId":"host-id","accessToken":"host-token"}}"#,
                ),
            ]))
            .with_candidates(vec![file])
            .with_flags(ConfigLayer {
                client_id: Some("flag-id".to_string()),
                ..Default::default()
            })
            .resolve();

        assert_eq!(config.client_id.as_deref(), Some("flag-id"));
        assert_eq!(config.access_token.as_deref(), Some("host-token"));
        assert_eq!(config.refresh_token.as_deref(), Some("file-refresh"));
        assert_eq!(config.client_secret.as_deref(), Some("env-secret"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn unparsable_file_is_skipped_for_next_candidate() {
        let dir = temp_dir();
        let broken = dir.join("broken.json");
        let good = dir.join("good.json");
        std::fs::write(&broken, "{not json").expect("write");
        std::fs::write(&good, r#"{"client_id":"snake-id"}"#).expect("write");

        let config = resolver()
            .with_candidates(vec![dir.join("missing.json"), broken, good.clone()])
            .resolve();

        assert_eq!(config.client_id.as_deref(), Some("snake-id"));
        assert_eq!(config.source_file, Some(good));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn host_override_applies_clio_section() {
        let config = resolver()
            .with_env(env(&[
                ("CLIO_ACCESS_TOKEN", "env-token"),
                (
                    HOST_OVERRIDE_ENV,
                    r#"{"clio":{"accessToken":"host-token","region":"eu"}}"#,
                ),
            ]))
            .resolve();
        assert_eq!(config.access_token.as_deref(), Some("host-token"));
        assert_eq!(config.region, Region::Eu);
        assert_eq!(config.grow_base, "https://eu.grow.clio.com/api/v1");
    }

    #[test]
    fn malformed_host_override_is_ignored() {
        let config = resolver()
            .with_env(env(&[
                ("CLIO_CLIENT_ID", "env-id"),
                (HOST_OVERRIDE_ENV, "{oops"),
            ]))
            .resolve();
        assert_eq!(config.client_id.as_deref(), Some("env-id"));
    }

    #[test]
    fn empty_values_count_as_absent_and_region_defaults_to_us() {
        let config = resolver()
            .with_env(env(&[("CLIO_CLIENT_ID", "env-id"), ("CLIO_REGION", "mars")]))
            .with_flags(ConfigLayer {
                client_id: Some("  ".to_string()),
                ..Default::default()
            })
            .resolve();
        assert_eq!(config.client_id.as_deref(), Some("env-id"));
        assert_eq!(config.region, Region::Us);
        assert_eq!(config.auth_base, "https://app.clio.com");
    }

    #[test]
    fn debug_output_hides_secrets() {
        let mut config = EffectiveConfig::for_region(Region::Us);
        config.client_secret = Some("s3cr3t".to_string());
        config.access_token = Some("tok-123".to_string());
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("s3cr3t"));
        assert!(!rendered.contains("tok-123"));
    }
}
