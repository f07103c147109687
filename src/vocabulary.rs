//! Keyword vocabulary used by preference learning and query building.
//!
//! The vocabulary is data, not code: an ordered list of `(pattern, category)`
//! entries, a generic token pattern, a stopword list and a synonym table. A
//! default ships embedded in the binary (`assets/vocabulary.yaml`); a YAML file
//! with the same shape can replace it at runtime via `--vocabulary`.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tracing::{info, instrument};

const BUILTIN_YAML: &str = include_str!("../assets/vocabulary.yaml");

static BUILTIN: Lazy<Vocabulary> = Lazy::new(|| {
    Vocabulary::from_yaml(BUILTIN_YAML).expect("embedded vocabulary.yaml must be valid")
});

#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("failed to read vocabulary file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid vocabulary YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// On-disk shape of a vocabulary file.
#[derive(Debug, Deserialize)]
struct VocabularyFile {
    patterns: Vec<PatternEntry>,
    token_pattern: String,
    #[serde(default)]
    stopwords: Vec<String>,
    #[serde(default = "default_max_keywords")]
    max_keywords: usize,
    #[serde(default)]
    query_synonyms: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct PatternEntry {
    pattern: String,
    category: String,
}

fn default_max_keywords() -> usize {
    5
}

/// A curated pattern and the category it belongs to (brand, powertrain, ...).
#[derive(Debug, Clone)]
pub struct CuratedPattern {
    pub regex: Regex,
    pub category: String,
}

/// Compiled keyword vocabulary.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    patterns: Vec<CuratedPattern>,
    token: Regex,
    stopwords: HashSet<String>,
    max_keywords: usize,
    synonyms: BTreeMap<String, String>,
}

fn compile(pattern: &str, case_insensitive: bool) -> Result<Regex, VocabularyError> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|source| VocabularyError::Pattern {
            pattern: pattern.to_string(),
            source,
        })
}

impl Vocabulary {
    /// The vocabulary embedded at build time.
    pub fn builtin() -> &'static Vocabulary {
        &BUILTIN
    }

    /// Parse and compile a vocabulary from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self, VocabularyError> {
        let file: VocabularyFile = serde_yaml::from_str(yaml)?;

        let patterns = file
            .patterns
            .iter()
            .map(|entry| {
                Ok(CuratedPattern {
                    regex: compile(&entry.pattern, true)?,
                    category: entry.category.clone(),
                })
            })
            .collect::<Result<Vec<_>, VocabularyError>>()?;

        Ok(Self {
            patterns,
            token: compile(&file.token_pattern, false)?,
            stopwords: file.stopwords.iter().map(|s| s.to_lowercase()).collect(),
            max_keywords: file.max_keywords,
            synonyms: file
                .query_synonyms
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
        })
    }

    /// Load a vocabulary file from disk.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, VocabularyError> {
        let yaml = fs::read_to_string(path.as_ref()).await?;
        let vocabulary = Self::from_yaml(&yaml)?;
        info!(
            patterns = vocabulary.patterns.len(),
            stopwords = vocabulary.stopwords.len(),
            "Loaded keyword vocabulary"
        );
        Ok(vocabulary)
    }

    /// Curated patterns in priority order.
    pub fn patterns(&self) -> &[CuratedPattern] {
        &self.patterns
    }

    /// Generic word tokens of `text`, in order of appearance.
    pub fn tokens<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.token.find_iter(text).map(|m| m.as_str()).collect()
    }

    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(&word.to_lowercase())
    }

    /// Upper bound on keywords extracted from one title.
    pub fn max_keywords(&self) -> usize {
        self.max_keywords
    }

    /// Search-query replacement for a liked keyword, if one is configured.
    pub fn synonym(&self, keyword: &str) -> Option<&str> {
        self.synonyms.get(&keyword.to_lowercase()).map(String::as_str)
    }
}
