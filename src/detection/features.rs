//! Feature maps produced by the extractors

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One extracted feature
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Scalar(f64),
    Series(Vec<f64>),
}

/// Media-specific key → value mapping. Read-only once built, never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMap {
    values: BTreeMap<String, FeatureValue>,
    /// Derived file providers should inspect instead of the upload
    /// (the middle frame of a video)
    derived_media: Option<PathBuf>,
}

impl FeatureMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scalar(mut self, key: &str, value: f64) -> Self {
        self.values.insert(key.to_string(), FeatureValue::Scalar(value));
        self
    }

    pub fn with_series(mut self, key: &str, values: Vec<f64>) -> Self {
        self.values.insert(key.to_string(), FeatureValue::Series(values));
        self
    }

    pub fn set_derived_media(&mut self, path: PathBuf) {
        self.derived_media = Some(path);
    }

    pub fn derived_media(&self) -> Option<&Path> {
        self.derived_media.as_deref()
    }

    pub fn scalar(&self, key: &str) -> Option<f64> {
        match self.values.get(key) {
            Some(FeatureValue::Scalar(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn series(&self, key: &str) -> Option<&[f64]> {
        match self.values.get(key) {
            Some(FeatureValue::Series(v)) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Typed extraction failure. The display text is what reaches the caller.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExtractError {
    #[error("File not found")]
    FileNotFound,

    #[error("Could not open video file")]
    CannotOpenVideo,

    #[error("{0}")]
    Decode(String),

    #[error("{0}")]
    Io(String),
}

impl From<std::io::Error> for ExtractError {
    fn from(err: std::io::Error) -> Self {
        ExtractError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_lookup() {
        let map = FeatureMap::new()
            .with_scalar("zcr_mean", 0.02)
            .with_series("mfcc_var", vec![150.0, 3.0]);

        assert_eq!(map.scalar("zcr_mean"), Some(0.02));
        assert_eq!(map.series("mfcc_var"), Some(&[150.0, 3.0][..]));
        // wrong shape is treated as missing
        assert_eq!(map.scalar("mfcc_var"), None);
        assert_eq!(map.series("chroma_var"), None);
    }
}
