use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workspace directory - computed from home, not serialized
    #[serde(skip)]
    pub workspace_dir: PathBuf,
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_dir: PathBuf::new(),
            config_path: PathBuf::new(),
            provider: ProviderConfig::default(),
            gateway: GatewayConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

// ── Completion provider ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key for the completion service. Falls back to ANTHROPIC_API_KEY.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Override the service base URL (tests, proxies)
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_model() -> String {
    "claude-3-5-sonnet-latest".into()
}

fn default_temperature() -> f64 {
    0.7
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: default_model(),
            temperature: default_temperature(),
        }
    }
}

impl ProviderConfig {
    /// Resolve the API key: config value first, then the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(ToOwned::to_owned)
            .or_else(|| {
                std::env::var("ANTHROPIC_API_KEY")
                    .ok()
                    .map(|k| k.trim().to_owned())
                    .filter(|k| !k.is_empty())
            })
    }
}

// ── Gateway ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway port (default: 8080)
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Gateway host (default: 127.0.0.1)
    #[serde(default = "default_gateway_host")]
    pub host: String,
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_gateway_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            host: default_gateway_host(),
        }
    }
}

// ── Store ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file path, relative to the workspace unless absolute.
    /// Supports `~` expansion.
    #[serde(default = "default_database")]
    pub database: String,
}

fn default_database() -> String {
    "judgebench.db".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

impl StoreConfig {
    /// Absolute database path for a given workspace directory.
    pub fn database_path(&self, workspace_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(&self.database).to_string();
        let path = PathBuf::from(expanded);
        if path.is_absolute() {
            path
        } else {
            workspace_dir.join(path)
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl Config {
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        Self::load_or_init_at(&home.join(".judgebench"))
    }

    /// Load (or create) the config rooted at an explicit directory.
    pub fn load_or_init_at(base_dir: &Path) -> Result<Self> {
        let config_path = base_dir.join("config.toml");
        let workspace_dir = base_dir.join("workspace");

        if !base_dir.exists() {
            fs::create_dir_all(base_dir).context("Failed to create config directory")?;
        }
        if !workspace_dir.exists() {
            fs::create_dir_all(&workspace_dir).context("Failed to create workspace directory")?;
        }

        if config_path.exists() {
            let contents =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_path = config_path;
            config.workspace_dir = workspace_dir;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self {
                config_path,
                workspace_dir,
                ..Self::default()
            };
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            anyhow::bail!(
                "provider.temperature must be within 0.0..=2.0, got {}",
                self.provider.temperature
            );
        }
        Ok(())
    }
}
