//! Configuration parsing and validation
//!
//! This module handles loading and validating colmap project files.
//!
//! # Configuration Files
//!
//! - `colmap.yaml` - Project root configuration
//! - `catalogs/*.yaml` - Source and target catalog descriptors
//! - `sessions/*.yaml` - Session scripts
//! - `patterns/*.yaml` - Saved mapping patterns

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::actions::{Action, parse_script};
use crate::collaborators::{FileCatalogSource, FilePatternStore, OutboxSubmitter, load_mapper};
use crate::error::{Error, Result};
use crate::mapper::Mapper;

/// Root project configuration from `colmap.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Project version
    #[serde(default = "default_version")]
    pub version: String,

    /// Which catalogs to map between
    #[serde(default)]
    pub catalogs: CatalogsConfig,

    /// Column preview settings
    #[serde(default)]
    pub preview: PreviewConfig,

    /// Directory for saved patterns
    #[serde(default = "default_patterns_dir")]
    pub patterns_dir: String,

    /// Directory submissions are written to
    #[serde(default = "default_outbox_dir")]
    pub outbox_dir: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_patterns_dir() -> String {
    "patterns".to_string()
}

fn default_outbox_dir() -> String {
    "outbox".to_string()
}

/// Catalog selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogsConfig {
    /// Directory holding catalog descriptors
    #[serde(default = "default_catalogs_dir")]
    pub dir: String,

    /// Source descriptor name
    pub source: Option<String>,

    /// Target descriptor name. Without one, targets are added by hand.
    pub target: Option<String>,
}

impl Default for CatalogsConfig {
    fn default() -> Self {
        Self {
            dir: default_catalogs_dir(),
            source: None,
            target: None,
        }
    }
}

fn default_catalogs_dir() -> String {
    "catalogs".to_string()
}

/// Column preview settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Rows per preview page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    10
}

impl ProjectConfig {
    /// Check values serde can't
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::ConfigInvalid {
                message: "project name must not be empty".to_string(),
            });
        }
        if self.preview.page_size == 0 {
            return Err(Error::ConfigInvalid {
                message: "preview.page_size must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Main configuration container
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Base path of the project
    pub base_path: PathBuf,
}

impl Config {
    /// Load configuration from a directory
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the project directory or colmap.yaml file
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config = Config::load("./my-project")?;
    /// println!("Project: {}", config.project.name);
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let (config_path, base_path) = if path.is_dir() {
            (path.join("colmap.yaml"), path.to_path_buf())
        } else {
            (
                path.to_path_buf(),
                path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            )
        };

        if !config_path.exists() {
            return Err(Error::ConfigNotFound {
                path: config_path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let project: ProjectConfig = serde_yaml::from_str(&contents)?;
        project.validate()?;

        Ok(Self { project, base_path })
    }

    /// Directory of catalog descriptors
    pub fn catalogs_dir(&self) -> PathBuf {
        self.base_path.join(&self.project.catalogs.dir)
    }

    /// Directory of saved patterns
    pub fn patterns_dir(&self) -> PathBuf {
        self.base_path.join(&self.project.patterns_dir)
    }

    /// Directory submissions are written to
    pub fn outbox_dir(&self) -> PathBuf {
        self.base_path.join(&self.project.outbox_dir)
    }

    /// Catalog source over the catalogs directory
    pub fn catalog_source(&self) -> FileCatalogSource {
        FileCatalogSource::new(self.catalogs_dir())
    }

    /// Pattern store over the patterns directory
    pub fn pattern_store(&self) -> FilePatternStore {
        FilePatternStore::new(self.patterns_dir())
    }

    /// Submitter writing into the outbox directory
    pub fn submitter(&self) -> OutboxSubmitter {
        OutboxSubmitter::new(self.outbox_dir())
    }

    /// Start a mapper over the configured catalogs
    pub async fn load_mapper(&self) -> Result<Mapper> {
        let source = self
            .project
            .catalogs
            .source
            .as_deref()
            .ok_or_else(|| Error::ConfigInvalid {
                message: "catalogs.source is not set".to_string(),
            })?;
        load_mapper(
            &self.catalog_source(),
            source,
            self.project.catalogs.target.as_deref(),
        )
        .await
    }

    /// Paths of all session scripts in `sessions/`, sorted
    pub fn session_scripts(&self) -> Result<Vec<PathBuf>> {
        let sessions_dir = self.base_path.join("sessions");
        if !sessions_dir.exists() {
            return Ok(vec![]);
        }

        let mut paths: Vec<_> = std::fs::read_dir(&sessions_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "yaml" || ext == "yml"))
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// Load a session script by path, or by name under `sessions/`
    pub fn load_script(&self, reference: &str) -> Result<Vec<Action>> {
        let direct = PathBuf::from(reference);
        let path = if direct.is_file() {
            direct
        } else {
            self.base_path
                .join("sessions")
                .join(format!("{}.yaml", reference))
        };

        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&path)?;
        parse_script(&contents)
    }
}
