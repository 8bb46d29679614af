use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigBuilder, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;
use thiserror::Error;

use crate::pipeline::mobile::MobileOptions;
use crate::pipeline::sections::{Splitter, SECTION_MARKER};
use crate::pipeline::Pipeline;

const CONFIG_STEM: &str = "blog_view";
const ENV_PREFIX: &str = "BLOG_VIEW";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub section_marker: String,
    #[serde(default)]
    pub mobile: MobileOptions,
}

impl Settings {
    /// Defaults, then `./blog_view.{toml,json,…}` if present, then
    /// `BLOG_VIEW_*` variables (`BLOG_VIEW_MOBILE__MAX_LINE_WIDTH=32`).
    pub fn load() -> Result<Self, SettingsError> {
        let builder = defaults()?.add_source(File::with_name(CONFIG_STEM).required(false));
        finish(builder)
    }

    /// Like [`Settings::load`] but with an explicit config file.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let builder = defaults()?.add_source(File::from(path));
        finish(builder)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(Splitter::new(self.section_marker.clone()), self.mobile)
    }

    fn validate(self) -> Result<Self, SettingsError> {
        if self.api_base_url.trim().is_empty() {
            return Err(SettingsError::Invalid {
                key: "api_base_url",
                reason: "must not be empty".into(),
            });
        }
        if self.section_marker.trim().is_empty() {
            return Err(SettingsError::Invalid {
                key: "section_marker",
                reason: "must not be empty".into(),
            });
        }
        if self.mobile.max_line_width == 0 {
            return Err(SettingsError::Invalid {
                key: "mobile.max_line_width",
                reason: "must be at least 1".into(),
            });
        }
        if !(1..=6).contains(&self.mobile.heading_floor) {
            return Err(SettingsError::Invalid {
                key: "mobile.heading_floor",
                reason: format!("{} is not a heading level (1-6)", self.mobile.heading_floor),
            });
        }
        Ok(self)
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, SettingsError> {
    let mobile = MobileOptions::default();
    Ok(Config::builder()
        .set_default("api_base_url", "http://localhost:8000/api")?
        .set_default("request_timeout_secs", 15_i64)?
        .set_default("section_marker", SECTION_MARKER)?
        .set_default("mobile.max_line_width", mobile.max_line_width as i64)?
        .set_default("mobile.heading_floor", i64::from(mobile.heading_floor))?
        .set_default("mobile.max_blank_lines", mobile.max_blank_lines as i64)?)
}

fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Settings, SettingsError> {
    let settings: Settings = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;
    settings.validate()
}

// ── Tests ──
