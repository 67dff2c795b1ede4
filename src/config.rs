use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::IntakeError;

pub const DEFAULT_CONFIG_FILE: &str = "htsf-intake.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub store_root: Option<String>,
    #[serde(default)]
    pub submission_prefix: Option<String>,
    #[serde(default)]
    pub comment_filter: Option<CommentFilterEntry>,
    #[serde(default)]
    pub defaults: Option<DefaultsEntry>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CommentFilterEntry {
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default)]
    pub min_length: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct DefaultsEntry {
    #[serde(default)]
    pub genome_size: Option<String>,
    #[serde(default)]
    pub coverage: Option<String>,
    #[serde(default)]
    pub flow_cells: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentFilter {
    pub keywords: Vec<String>,
    pub min_length: usize,
}

impl CommentFilter {
    pub fn accepts(&self, comment: &str) -> bool {
        let contaminated = self
            .keywords
            .iter()
            .any(|keyword| comment.contains(keyword.as_str()));
        !contaminated && comment.chars().count() > self.min_length
    }
}

impl Default for CommentFilter {
    fn default() -> Self {
        Self {
            keywords: default_comment_keywords(),
            min_length: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutDefaults {
    pub genome_size: String,
    pub coverage: String,
    pub flow_cells: i64,
}

impl Default for LayoutDefaults {
    fn default() -> Self {
        Self {
            genome_size: "600 bp".to_string(),
            coverage: "50x-100x".to_string(),
            flow_cells: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub submission_prefix: String,
    pub comment_filter: CommentFilter,
    pub defaults: LayoutDefaults,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            submission_prefix: "SUBMISSION".to_string(),
            comment_filter: CommentFilter::default(),
            defaults: LayoutDefaults::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub store_root: Option<Utf8PathBuf>,
    pub engine: EngineConfig,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, IntakeError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| IntakeError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| IntakeError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, IntakeError> {
        let schema_version = config.schema_version.unwrap_or(1);
        let mut engine = EngineConfig::default();

        if let Some(prefix) = config.submission_prefix {
            let prefix = prefix.trim().to_string();
            let is_valid = !prefix.is_empty()
                && prefix
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
            if !is_valid {
                return Err(IntakeError::ConfigParse(format!(
                    "submission_prefix must be non-empty and alphanumeric: {prefix:?}"
                )));
            }
            engine.submission_prefix = prefix;
        }

        if let Some(filter) = config.comment_filter {
            if let Some(keywords) = filter.keywords {
                engine.comment_filter.keywords = keywords
                    .into_iter()
                    .map(|keyword| keyword.trim().to_string())
                    .filter(|keyword| !keyword.is_empty())
                    .collect();
            }
            if let Some(min_length) = filter.min_length {
                engine.comment_filter.min_length = min_length;
            }
        }

        if let Some(defaults) = config.defaults {
            if let Some(genome_size) = defaults.genome_size {
                engine.defaults.genome_size = genome_size;
            }
            if let Some(coverage) = defaults.coverage {
                engine.defaults.coverage = coverage;
            }
            if let Some(flow_cells) = defaults.flow_cells {
                if flow_cells < 0 {
                    return Err(IntakeError::ConfigParse(format!(
                        "defaults.flow_cells must not be negative: {flow_cells}"
                    )));
                }
                engine.defaults.flow_cells = flow_cells;
            }
        }

        Ok(ResolvedConfig {
            schema_version,
            store_root: config.store_root.map(Utf8PathBuf::from),
            engine,
        })
    }
}

pub fn default_comment_keywords() -> Vec<String> {
    vec![
        "HAC".to_string(),
        "SUP".to_string(),
        "FASTQ".to_string(),
        "POD5".to_string(),
        "Methylation".to_string(),
    ]
}
