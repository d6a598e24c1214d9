//! Application configuration edited from the settings page

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::permissions::{Permission, PermissionSet, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    pub app_description: String,
    pub welcome_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    pub show_setup_guide: bool,
    pub enable_team_features: bool,
    pub default_user_role: Role,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "WorkLogs".to_string(),
            app_description: "Track your work efficiently".to_string(),
            welcome_message: "Welcome to your work logs tracking system".to_string(),
            company_logo_url: None,
            primary_color: None,
            show_setup_guide: true,
            enable_team_features: true,
            default_user_role: Role::Member,
        }
    }
}

/// Keys accepted by [`Settings::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    AppName,
    AppDescription,
    WelcomeMessage,
    ShowSetupGuide,
    EnableTeamFeatures,
    DefaultUserRole,
    CompanyLogoUrl,
    PrimaryColor,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 8] = [
        ConfigKey::AppName,
        ConfigKey::AppDescription,
        ConfigKey::WelcomeMessage,
        ConfigKey::ShowSetupGuide,
        ConfigKey::EnableTeamFeatures,
        ConfigKey::DefaultUserRole,
        ConfigKey::CompanyLogoUrl,
        ConfigKey::PrimaryColor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::AppName => "app_name",
            ConfigKey::AppDescription => "app_description",
            ConfigKey::WelcomeMessage => "welcome_message",
            ConfigKey::ShowSetupGuide => "show_setup_guide",
            ConfigKey::EnableTeamFeatures => "enable_team_features",
            ConfigKey::DefaultUserRole => "default_user_role",
            ConfigKey::CompanyLogoUrl => "company_logo_url",
            ConfigKey::PrimaryColor => "primary_color",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ConfigKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::validation(format!("Unknown setting: {}", s)))
    }
}

/// Holds the current [`AppConfig`] and applies permission-checked edits
#[derive(Debug, Clone, Default)]
pub struct Settings {
    config: AppConfig,
}

impl Settings {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Set one key from its text form.
    ///
    /// Booleans accept `true`/`false`; an empty value clears the optional
    /// logo and color settings.
    pub fn update(&mut self, permissions: &PermissionSet, key: &str, value: &str) -> Result<()> {
        permissions.require(
            Permission::ManageConfig,
            "You don't have permission to access application settings.",
        )?;
        let key: ConfigKey = key.parse()?;
        let optional = |v: &str| Some(v.trim().to_string()).filter(|v| !v.is_empty());

        match key {
            ConfigKey::AppName => self.config.app_name = value.to_string(),
            ConfigKey::AppDescription => self.config.app_description = value.to_string(),
            ConfigKey::WelcomeMessage => self.config.welcome_message = value.to_string(),
            ConfigKey::ShowSetupGuide => self.config.show_setup_guide = parse_bool(key, value)?,
            ConfigKey::EnableTeamFeatures => self.config.enable_team_features = parse_bool(key, value)?,
            ConfigKey::DefaultUserRole => self.config.default_user_role = value.parse()?,
            ConfigKey::CompanyLogoUrl => self.config.company_logo_url = optional(value),
            ConfigKey::PrimaryColor => self.config.primary_color = optional(value),
        }
        info!(key = %key, "setting updated");
        Ok(())
    }
}

fn parse_bool(key: ConfigKey, value: &str) -> Result<bool> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::validation(format!("{} expects true or false, got {:?}", key, value)))
}
