//! TOML configuration.
//!
//! Every section is optional; a missing file is an error but an empty one
//! yields the defaults below.
//!
//! ```toml
//! [db]
//! path = "./data/choff.sqlite"
//!
//! [embedding]
//! # changing dims needs a fresh database: cached vectors are write-once
//! dims = 100
//! model = "simple_embedding"
//!
//! [resonance]
//! threshold = 0.8
//! strong_cutoff = 0.9
//!
//! [server]
//! bind = "127.0.0.1:8000"
//!
//! [classifier.content_types]
//! procedure = ["step", "method", "recipe"]
//!
//! [classifier.insight_types]
//! practical = ["implement", "apply"]
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use choff_core::classifier::{Classifier, Taxonomy};
use choff_core::embedding::{DEFAULT_DIMS, DEFAULT_MODEL_TAG};
use choff_core::models::{ContentType, InsightType};
use choff_core::resonance::{DEFAULT_STRONG_CUTOFF, DEFAULT_THRESHOLD};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub resonance: ResonanceConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/choff.sqlite"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dims: default_dims(),
            model: default_model(),
        }
    }
}

fn default_dims() -> usize {
    DEFAULT_DIMS
}
fn default_model() -> String {
    DEFAULT_MODEL_TAG.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResonanceConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default = "default_strong_cutoff")]
    pub strong_cutoff: f32,
}

impl Default for ResonanceConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            strong_cutoff: default_strong_cutoff(),
        }
    }
}

fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}
fn default_strong_cutoff() -> f32 {
    DEFAULT_STRONG_CUTOFF
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

/// Keyword overrides, label name -> substrings. Labels left out keep their
/// built-in keywords.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub content_types: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub insight_types: HashMap<String, Vec<String>>,
}

impl ClassifierConfig {
    /// Build the classifier: built-in taxonomies with overrides applied.
    pub fn build(&self) -> Result<Classifier> {
        let content = parse_overrides::<ContentType>(&self.content_types, "content_types")?;
        let insight = parse_overrides::<InsightType>(&self.insight_types, "insight_types")?;
        Ok(Classifier::new(
            Taxonomy::<ContentType>::default().with_overrides(&content),
            Taxonomy::<InsightType>::default().with_overrides(&insight),
        ))
    }
}

fn parse_overrides<L>(
    raw: &HashMap<String, Vec<String>>,
    section: &str,
) -> Result<HashMap<L, Vec<String>>>
where
    L: std::str::FromStr<Err = choff_core::Error> + std::hash::Hash + Eq,
{
    raw.iter()
        .map(|(name, keywords)| -> Result<(L, Vec<String>)> {
            let label = name
                .parse::<L>()
                .with_context(|| format!("classifier.{}: unknown label '{}'", section, name))?;
            if keywords.iter().any(|k| k.trim().is_empty()) {
                anyhow::bail!("classifier.{}.{}: keywords must not be empty", section, name);
            }
            Ok((label, keywords.clone()))
        })
        .collect()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.embedding.dims == 0 {
            anyhow::bail!("embedding.dims must be > 0");
        }
        if self.embedding.model.trim().is_empty() {
            anyhow::bail!("embedding.model must not be empty");
        }

        if !(-1.0..=1.0).contains(&self.resonance.threshold) {
            anyhow::bail!("resonance.threshold must be in [-1.0, 1.0]");
        }
        if !(-1.0..=1.0).contains(&self.resonance.strong_cutoff) {
            anyhow::bail!("resonance.strong_cutoff must be in [-1.0, 1.0]");
        }

        self.classifier.build()?;
        Ok(())
    }
}
