//! Render configuration.
//!
//! ```json
//! {
//!   "slides": [
//!     {"src_page": 2, "replace_texts": {"title": "Q3", "items": [{"name": "A"}]}},
//!     {"src_page": 1}
//!   ]
//! }
//! ```

use crate::template::data::DataTree;
use crate::template::error::{Result, TemplateError};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub slides: Vec<SlideJob>,
}

/// One output slide: a copy of template slide `src_page` (1-based) with its
/// placeholders filled from `replace_texts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideJob {
    pub src_page: usize,
    #[serde(default = "DataTree::empty_map")]
    pub replace_texts: DataTree,
}

impl SlideJob {
    pub fn new(src_page: usize) -> Self {
        Self {
            src_page,
            replace_texts: DataTree::empty_map(),
        }
    }

    pub fn with_data(mut self, data: impl Into<DataTree>) -> Self {
        self.replace_texts = data.into();
        self
    }
}

impl TemplateConfig {
    pub fn new(slides: Vec<SlideJob>) -> Self {
        Self { slides }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| TemplateError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Check every job against a template with `slide_count` slides.
    ///
    /// A `null` `replace_texts` counts as an empty mapping; any other
    /// non-mapping value is rejected.
    pub fn validate(&self, slide_count: usize) -> Result<()> {
        if self.slides.is_empty() {
            return Err(TemplateError::Config("no slides requested".to_string()));
        }
        for (i, job) in self.slides.iter().enumerate() {
            if job.src_page == 0 || job.src_page > slide_count {
                return Err(TemplateError::SlideIndexOutOfRange {
                    index: job.src_page,
                    count: slide_count,
                });
            }
            if !matches!(job.replace_texts, DataTree::Map(_) | DataTree::Null) {
                return Err(TemplateError::Config(format!(
                    "slides[{}].replace_texts must be a mapping, got {}",
                    i,
                    job.replace_texts.kind()
                )));
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for TemplateConfig {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_json_str(s)
    }
}

/// Where a render configuration comes from.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    Path(std::path::PathBuf),
    Json(String),
    Value(TemplateConfig),
}

impl ConfigSource {
    pub fn load(self) -> Result<TemplateConfig> {
        match self {
            ConfigSource::Path(path) => TemplateConfig::from_path(path),
            ConfigSource::Json(json) => TemplateConfig::from_json_str(&json),
            ConfigSource::Value(config) => Ok(config),
        }
    }
}

impl From<TemplateConfig> for ConfigSource {
    fn from(config: TemplateConfig) -> Self {
        ConfigSource::Value(config)
    }
}

/// Engine behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Give runs without a typeface an explicit one after substitution
    pub normalize_fonts: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self { normalize_fonts: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_parse_config() {
        let config = TemplateConfig::from_json_str(
            r#"{"slides": [{"src_page": 2, "replace_texts": {"a": {"b": [1]}}}, {"src_page": 1}]}"#,
        )
        .unwrap();
        assert_eq!(config.slides.len(), 2);
        assert_eq!(config.slides[0].src_page, 2);
        assert_eq!(config.slides[0].replace_texts, DataTree::from(json!({"a": {"b": [1]}})));
        assert_eq!(config.slides[1].replace_texts, DataTree::empty_map());
        config.validate(2).unwrap();
    }

    #[test]
    fn test_malformed_config() {
        assert!(matches!(TemplateConfig::from_json_str("{"), Err(TemplateError::Json(_))));
        assert!(matches!(TemplateConfig::from_json_str(r#"{"pages": []}"#), Err(TemplateError::Json(_))));
        assert!(matches!(
            TemplateConfig::from_json_str(r#"{"slides": [{"src_page": -1}]}"#),
            Err(TemplateError::Json(_))
        ));
        assert!(matches!(
            TemplateConfig::from_path("/nonexistent/config.json"),
            Err(TemplateError::Config(_))
        ));
    }

    #[test]
    fn test_validate() {
        assert!(matches!(TemplateConfig::new(vec![]).validate(3), Err(TemplateError::Config(_))));
        assert!(matches!(
            TemplateConfig::new(vec![SlideJob::new(0)]).validate(3),
            Err(TemplateError::SlideIndexOutOfRange { index: 0, count: 3 })
        ));
        assert!(matches!(
            TemplateConfig::new(vec![SlideJob::new(1), SlideJob::new(4)]).validate(3),
            Err(TemplateError::SlideIndexOutOfRange { index: 4, count: 3 })
        ));
        let listed = SlideJob::new(1).with_data(DataTree::from(json!(["x"])));
        assert!(matches!(TemplateConfig::new(vec![listed]).validate(3), Err(TemplateError::Config(_))));
        let null = SlideJob::new(1).with_data(DataTree::Null);
        TemplateConfig::new(vec![null]).validate(3).unwrap();
    }

    #[test]
    fn test_config_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"slides": [{{"src_page": 1}}]}}"#).unwrap();
        let from_file = ConfigSource::Path(file.path().to_path_buf()).load().unwrap();
        let from_json = ConfigSource::Json(r#"{"slides": [{"src_page": 1}]}"#.into()).load().unwrap();
        assert_eq!(from_file, from_json);
        assert_eq!(ConfigSource::from(from_json.clone()).load().unwrap(), from_json);
    }
}
