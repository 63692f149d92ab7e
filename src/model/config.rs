use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::env_file;
use crate::model::step::FailurePolicy;
use crate::model::variant::Variant;

const DEFAULTS: &str = include_str!("../../config/default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapConfig {
    pub general: GeneralConfig,
    pub workspace: WorkspaceConfig,
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub install: Vec<InstallConfig>,
    pub env: EnvConfig,
    #[serde(default)]
    pub models: Vec<ModelConfig>,
    #[serde(default)]
    pub wrappers: Vec<WrapperConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    pub variant: Variant,
    /// User name, or numeric `uid[:gid]`.
    pub owner: String,
    pub prompt_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceConfig {
    pub root: PathBuf,
    /// Project manifest whose presence means the application is already cloned.
    pub marker: String,
    pub data_root: PathBuf,
    pub data_dir: String,
    pub models_dir: String,
    pub db_dir: String,
    #[serde(default)]
    pub extra_dirs: Vec<String>,
    pub bin_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryConfig {
    pub url: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub depth: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstallConfig {
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Path relative to the workspace root; the install is skipped when it exists.
    #[serde(default)]
    pub skip_if: Option<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub on_failure: FailurePolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvConfig {
    pub file: String,
    pub profiles: String,
    pub database_url: String,
    pub redis_url: String,
    pub host: String,
    pub port: u16,
    pub ui_port: u16,
    pub log_level: String,
    pub log_file: String,
    pub object_store: ObjectStoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectStoreConfig {
    pub endpoint: String,
    pub bucket: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub url: String,
    /// File name inside the models directory.
    pub file: String,
    pub env_key: String,
    #[serde(default)]
    pub prompt: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WrapperConfig {
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl BootstrapConfig {
    /// Load configuration with layering: defaults → user config (or `explicit`).
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let user = match explicit {
            Some(path) => Some(
                fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?,
            ),
            None => user_config_path()
                .filter(|path| path.exists())
                .map(|path| {
                    fs::read_to_string(&path)
                        .with_context(|| format!("failed to read config {}", path.display()))
                })
                .transpose()?,
        };

        Self::from_layers(user.as_deref())
    }

    /// Parse the embedded defaults and deep-merge `user` over them.
    ///
    /// Tables merge key by key. Arrays (`[[install]]`, `[[models]]`,
    /// `[[wrappers]]`) are replaced as a whole.
    pub fn from_layers(user: Option<&str>) -> Result<Self> {
        let mut merged: toml::Value =
            toml::from_str(DEFAULTS).context("embedded default config is invalid")?;

        if let Some(user) = user {
            let overlay: toml::Value = toml::from_str(user).context("invalid user config")?;
            merge(&mut merged, overlay);
        }

        let mut config: BootstrapConfig = merged.try_into().context("invalid config")?;
        config.expand_paths()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.owner.trim().is_empty() {
            bail!("general.owner must not be empty");
        }
        if self.workspace.marker.trim().is_empty() {
            bail!("workspace.marker must not be empty");
        }
        if self.repository.url.trim().is_empty() {
            bail!("repository.url must not be empty");
        }
        for model in &self.models {
            if !env_file::is_valid_key(&model.env_key) {
                bail!("models.env_key {:?} is not a valid variable name", model.env_key);
            }
            if model.file.contains('/') {
                bail!("models.file {:?} must be a bare file name", model.file);
            }
        }
        for wrapper in &self.wrappers {
            if wrapper.name.is_empty() || wrapper.name.contains('/') {
                bail!("wrappers.name {:?} must be a bare file name", wrapper.name);
            }
        }
        Ok(())
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace.root
    }

    pub fn marker_path(&self) -> PathBuf {
        self.workspace.root.join(&self.workspace.marker)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.workspace.data_root.join(&self.workspace.data_dir)
    }

    pub fn models_dir(&self) -> PathBuf {
        self.workspace.data_root.join(&self.workspace.models_dir)
    }

    pub fn db_dir(&self) -> PathBuf {
        self.workspace.data_root.join(&self.workspace.db_dir)
    }

    /// Every sibling directory the sequencer creates and owns.
    pub fn managed_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.data_dir(), self.models_dir(), self.db_dir()];
        dirs.extend(
            self.workspace
                .extra_dirs
                .iter()
                .map(|dir| self.workspace.data_root.join(dir)),
        );
        dirs
    }

    pub fn env_path(&self) -> PathBuf {
        self.workspace.root.join(&self.env.file)
    }

    pub fn model_path(&self, model: &ModelConfig) -> PathBuf {
        self.models_dir().join(&model.file)
    }

    fn expand_paths(&mut self) -> Result<()> {
        self.workspace.root = expand_tilde(&self.workspace.root)?;
        self.workspace.data_root = expand_tilde(&self.workspace.data_root)?;
        self.workspace.bin_dir = expand_tilde(&self.workspace.bin_dir)?;
        Ok(())
    }
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "devboot")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let text = path.to_string_lossy();
    if !text.starts_with('~') {
        return Ok(path.to_path_buf());
    }

    let home = directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(PathBuf::from(text.replacen('~', &home.to_string_lossy(), 1)))
}
