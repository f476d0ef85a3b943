use crate::core::engine::EngineSettings;
use crate::utils::error::{DispatchError, Result};
use crate::utils::logger::LogFormat;
use crate::utils::validation::{
    validate_non_empty_string, validate_one_of, validate_path, validate_range, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const STORAGE_BACKENDS: [&str; 2] = ["memory", "json"];
pub const LOG_FORMATS: [&str; 2] = ["compact", "json"];
pub const MAX_DURATION_CEILING: u32 = 168;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub storage: StorageConfig,
    pub engine: EngineConfig,
    pub pool: PoolConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: String,
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "json".to_string(),
            path: "./guard-dispatch-state.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub release_on_completion: bool,
    pub max_duration_hours: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let settings = EngineSettings::default();
        Self {
            release_on_completion: settings.release_on_completion,
            max_duration_hours: settings.max_duration_hours,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Labels provisioned when the store holds no guards yet.
    pub guards: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl DispatchConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(&path).map_err(|e| DispatchError::ConfigError {
                message: format!("cannot read {}: {}", path.as_ref().display(), e),
            })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| DispatchError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${HOME})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| DispatchError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            release_on_completion: self.engine.release_on_completion,
            max_duration_hours: self.engine.max_duration_hours,
        }
    }

    pub fn log_format(&self) -> LogFormat {
        LogFormat::parse(&self.logging.format).unwrap_or(LogFormat::Compact)
    }

    pub fn uses_memory_backend(&self) -> bool {
        self.storage.backend == "memory"
    }
}

impl Validate for DispatchConfig {
    fn validate(&self) -> Result<()> {
        validate_one_of("storage.backend", &self.storage.backend, &STORAGE_BACKENDS)?;
        if !self.uses_memory_backend() {
            validate_path("storage.path", &self.storage.path)?;
        }

        validate_range(
            "engine.max_duration_hours",
            self.engine.max_duration_hours,
            1,
            MAX_DURATION_CEILING,
        )?;

        for label in &self.pool.guards {
            validate_non_empty_string("pool.guards", label)?;
        }

        validate_non_empty_string("logging.level", &self.logging.level)?;
        validate_one_of("logging.format", &self.logging.format, &LOG_FORMATS)?;

        Ok(())
    }
}
