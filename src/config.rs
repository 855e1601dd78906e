use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for donorflow.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DonorflowConfig {
    /// Persistence settings
    pub store: StoreConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
    /// Workflow engine settings
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Directory holding the JSON collection files
    pub data_directory: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Enable structured tracing output
    pub tracing_enabled: bool,
    /// Log level
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowConfig {
    /// Run the automatic admin-queueing advance immediately after a doctor's
    /// initial approval, instead of waiting for the auto-advance sweep
    pub auto_advance_on_apply: bool,
}

impl Default for DonorflowConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig {
                data_directory: ".donorflow/data".to_string(),
            },
            observability: ObservabilityConfig {
                tracing_enabled: true,
                log_level: "info".to_string(),
            },
            workflow: WorkflowConfig {
                auto_advance_on_apply: true,
            },
        }
    }
}

impl DonorflowConfig {
    /// Load configuration with precedence:
    /// 1. Default values
    /// 2. Configuration file (donorflow.toml)
    /// 3. Environment variables (prefixed with DONORFLOW_)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if Path::new("donorflow.toml").exists() {
            builder = builder.add_source(File::with_name("donorflow"));
        }

        builder = builder.add_source(
            Environment::with_prefix("DONORFLOW")
                .separator("_")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<DonorflowConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = DonorflowConfig::load_env_file();
        DonorflowConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static DonorflowConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}
