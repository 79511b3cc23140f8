use anyhow::{Context, Result};

use crate::db::Database;
use crate::models::Settings;

pub const ENV_API_BASE: &str = "CIVIL_BILLING_API_BASE";
pub const ENV_API_TOKEN: &str = "CIVIL_BILLING_API_TOKEN";

#[derive(Debug, Default)]
pub struct SettingsPayload {
    pub api_base: Option<String>,
    pub api_token: Option<String>,
}

/// Stored settings only, without environment overrides.
pub fn get_settings(db: &Database) -> Result<Settings> {
    let api_base = db.get_setting("api_base").context("Read api_base")?;
    let api_token = db.get_setting("api_token").context("Read api_token")?;
    Ok(Settings { api_base, api_token })
}

/// Settings the program runs with: stored values, overridden by the
/// environment when set.
pub fn load_settings(db: &Database) -> Settings {
    let mut settings = get_settings(db).unwrap_or_default();
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(base) = lookup(ENV_API_BASE).filter(|value| !value.trim().is_empty()) {
        settings.api_base = Some(base);
    }
    if let Some(token) = lookup(ENV_API_TOKEN).filter(|value| !value.trim().is_empty()) {
        settings.api_token = Some(token);
    }
}

/// Stores the given fields. An empty value clears the setting.
pub fn save_settings(db: &Database, payload: SettingsPayload) -> Result<Settings> {
    for (key, value) in [("api_base", payload.api_base), ("api_token", payload.api_token)] {
        match value.map(|value| value.trim().to_string()) {
            Some(value) if value.is_empty() => db.clear_setting(key).with_context(|| format!("Clear {}", key))?,
            Some(value) => db.set_setting(key, &value).with_context(|| format!("Save {}", key))?,
            None => {}
        }
    }
    get_settings(db)
}
