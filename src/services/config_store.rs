use serde_json::{Map, Value};
use std::io;
use std::path::{Path, PathBuf};

use crate::errors::ToolError;
use crate::services::config::{EffectiveConfig, CONFIG_FILE_NAME};
use crate::services::credentials::Credential;
use crate::utils::fs_atomic::atomic_write_text_file;
use crate::utils::merge::merge_deep;

const CONFIG_FILE_MODE: u32 = 0o600;

pub fn default_config_path() -> PathBuf {
    PathBuf::from(CONFIG_FILE_NAME)
}

/// Merges the client settings and `credential` into the JSON object stored
/// at `path`, keeping any keys already there. An existing file that is not
/// a JSON object is left untouched and reported.
pub fn save_credential(
    path: &Path,
    config: &EffectiveConfig,
    credential: &Credential,
) -> Result<PathBuf, ToolError> {
    let existing = match std::fs::read_to_string(path) {
        Ok(raw) => {
            let parsed: Value = serde_json::from_str(&raw).map_err(|err| {
                ToolError::parse(format!("{}: {}", path.display(), err))
                    .with_hint("Fix or remove the file before saving credentials")
            })?;
            if !parsed.is_object() {
                return Err(ToolError::invalid_params(format!(
                    "{} does not contain a JSON object",
                    path.display()
                )));
            }
            parsed
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Value::Object(Map::new()),
        Err(err) => return Err(err.into()),
    };

    let mut patch = Map::new();
    if let Some(client_id) = &config.client_id {
        patch.insert("clientId".to_string(), Value::String(client_id.clone()));
    }
    if let Some(client_secret) = &config.client_secret {
        patch.insert(
            "clientSecret".to_string(),
            Value::String(client_secret.clone()),
        );
    }
    patch.insert(
        "region".to_string(),
        Value::String(config.region.as_str().to_string()),
    );
    patch.insert(
        "accessToken".to_string(),
        Value::String(credential.access_token.clone()),
    );
    if let Some(refresh_token) = &credential.refresh_token {
        patch.insert(
            "refreshToken".to_string(),
            Value::String(refresh_token.clone()),
        );
    }

    let merged = merge_deep(&existing, &Value::Object(patch));
    let rendered = serde_json::to_string_pretty(&merged)?;
    atomic_write_text_file(path, &format!("{}\n", rendered), CONFIG_FILE_MODE)?;
    Ok(path.to_path_buf())
}
