use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{PhoneClawError, PhoneClawResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub device: DeviceConfig,
}

/// OpenAI-compatible inference endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default = "default_frequency_penalty")]
    pub frequency_penalty: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Sends `thinking: {type: enabled}` for models with native reasoning.
    #[serde(default = "default_true")]
    pub thinking: bool,
    #[serde(default)]
    pub stream: bool,
    /// Optional API key stored in config.toml (env vars take precedence).
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            frequency_penalty: default_frequency_penalty(),
            timeout_secs: default_timeout_secs(),
            thinking: true,
            stream: false,
            api_key: None,
        }
    }
}

impl LlmConfig {
    /// Resolution order: `PHONECLAW_API_KEY`, `ZHIPUAI_API_KEY`, then the config file.
    pub fn resolve_api_key(&self) -> Option<String> {
        ["PHONECLAW_API_KEY", "ZHIPUAI_API_KEY"]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|v| !v.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSection {
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Replaces the built-in system prompt when set.
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub record_session: bool,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            lang: default_lang(),
            system_prompt: None,
            record_session: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_adb_path")]
    pub adb_path: String,
    /// adb serial; `None` targets the only connected device.
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default = "default_action_delay_ms")]
    pub action_delay_ms: u64,
    #[serde(default = "default_type_settle_ms")]
    pub type_settle_ms: u64,
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    #[serde(default = "default_automation_ime")]
    pub automation_ime: String,
    #[serde(default = "default_fallback_width")]
    pub fallback_width: u32,
    #[serde(default = "default_fallback_height")]
    pub fallback_height: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            adb_path: default_adb_path(),
            device_id: None,
            action_delay_ms: default_action_delay_ms(),
            type_settle_ms: default_type_settle_ms(),
            command_timeout_secs: default_command_timeout_secs(),
            automation_ime: default_automation_ime(),
            fallback_width: default_fallback_width(),
            fallback_height: default_fallback_height(),
        }
    }
}

fn default_api_base() -> String {
    "https://open.bigmodel.cn/api/paas/v4/".into()
}

fn default_model() -> String {
    "autoglm-phone".into()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f64 {
    0.5
}

fn default_top_p() -> f64 {
    0.85
}

fn default_frequency_penalty() -> f64 {
    0.2
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

fn default_max_steps() -> u32 {
    100
}

fn default_lang() -> String {
    "cn".into()
}

fn default_adb_path() -> String {
    "adb".into()
}

fn default_action_delay_ms() -> u64 {
    1000
}

fn default_type_settle_ms() -> u64 {
    500
}

fn default_command_timeout_secs() -> u64 {
    10
}

fn default_automation_ime() -> String {
    "com.android.adbkeyboard/.AdbIME".into()
}

fn default_fallback_width() -> u32 {
    720
}

fn default_fallback_height() -> u32 {
    1604
}

fn resolve_config_path() -> PhoneClawResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    Err(PhoneClawError::Config(
        "config.toml not found next to executable or in working directory".into(),
    ))
}

pub fn parse_config(content: &str) -> PhoneClawResult<AppConfig> {
    let config: AppConfig = toml::from_str(content)?;
    if config.agent.max_steps == 0 {
        return Err(PhoneClawError::Config("agent.max_steps must be at least 1".into()));
    }
    Ok(config)
}

pub fn load_config() -> PhoneClawResult<AppConfig> {
    let path = resolve_config_path()?;
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> PhoneClawResult<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    tracing::info!(path = %path.display(), model = %config.llm.model, "config loaded");
    Ok(config)
}

/// Like [`load_config`], but a missing file yields the built-in defaults.
/// A file that exists and fails to parse is still an error.
pub fn load_config_or_default() -> PhoneClawResult<AppConfig> {
    match resolve_config_path() {
        Ok(path) => load_config_from(&path),
        Err(e) => {
            tracing::warn!(error = %e, "no config file; using defaults");
            Ok(AppConfig::default())
        }
    }
}
