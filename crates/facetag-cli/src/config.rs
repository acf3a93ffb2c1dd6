use facetag_core::{BatchOptions, MatchPolicy, ModelKind, OutputNaming, DEFAULT_TOLERANCE};
use facetag_render::AnnotationStyle;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
    #[error("tolerance must be a finite number >= 0, got {0}")]
    InvalidTolerance(f32),
}

/// Run configuration. Defaults, then an optional TOML file, then
/// `FACETAG_*` environment variables, then command-line flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// One subdirectory per identity, holding reference photos.
    pub known_faces_dir: PathBuf,
    /// Flat directory of photos to label.
    pub unknown_faces_dir: PathBuf,
    /// Where annotated copies are written.
    pub output_dir: PathBuf,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// Maximum embedding distance for a match.
    pub tolerance: f32,
    pub model: ModelKind,
    pub policy: MatchPolicy,
    pub naming: OutputNaming,
    pub annotation: AnnotationStyle,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            known_faces_dir: PathBuf::from("known_faces"),
            unknown_faces_dir: PathBuf::from("unknown_faces"),
            output_dir: PathBuf::from("."),
            model_dir: facetag_core::default_model_dir(),
            tolerance: DEFAULT_TOLERANCE,
            model: ModelKind::Fast,
            policy: MatchPolicy::First,
            naming: OutputNaming::Prefix,
            annotation: AnnotationStyle::default(),
        }
    }
}

impl Config {
    /// Defaults overlaid with `path` (if any) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay `FACETAG_*` variables read through `get`.
    pub fn apply_env_with<F>(&mut self, get: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = get("FACETAG_KNOWN_DIR") {
            self.known_faces_dir = PathBuf::from(v);
        }
        if let Some(v) = get("FACETAG_UNKNOWN_DIR") {
            self.unknown_faces_dir = PathBuf::from(v);
        }
        if let Some(v) = get("FACETAG_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = get("FACETAG_MODEL_DIR") {
            self.model_dir = PathBuf::from(v);
        }
        if let Some(v) = get("FACETAG_TOLERANCE") {
            self.tolerance = parse_value("FACETAG_TOLERANCE", &v)?;
        }
        if let Some(v) = get("FACETAG_MODEL") {
            self.model = parse_value("FACETAG_MODEL", &v)?;
        }
        if let Some(v) = get("FACETAG_POLICY") {
            self.policy = parse_value("FACETAG_POLICY", &v)?;
        }
        if let Some(v) = get("FACETAG_NAMING") {
            self.naming = parse_value("FACETAG_NAMING", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance(self.tolerance));
        }
        Ok(())
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            tolerance: self.tolerance,
            policy: self.policy,
            output_dir: self.output_dir.clone(),
            naming: self.naming,
        }
    }
}

/// Parse a single setting, naming the offending key on failure.
pub fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!(c.known_faces_dir, PathBuf::from("known_faces"));
        assert_eq!(c.unknown_faces_dir, PathBuf::from("unknown_faces"));
        assert_eq!(c.output_dir, PathBuf::from("."));
        assert_eq!(c.tolerance, 0.6);
        assert_eq!(c.model, ModelKind::Fast);
        assert_eq!(c.policy, MatchPolicy::First);
        assert_eq!(c.naming, OutputNaming::Prefix);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let c: Config = toml::from_str(
            r#"
            known_faces_dir = "/data/known"
            tolerance = 0.45
            model = "accurate"

            [annotation]
            thickness = 4
            "#,
        )
        .unwrap();
        assert_eq!(c.known_faces_dir, PathBuf::from("/data/known"));
        assert_eq!(c.tolerance, 0.45);
        assert_eq!(c.model, ModelKind::Accurate);
        assert_eq!(c.annotation.thickness, 4);
        assert_eq!(c.annotation.strip_height, 35);
        assert_eq!(c.unknown_faces_dir, PathBuf::from("unknown_faces"));
    }

    #[test]
    fn test_toml_rejects_unknown_keys() {
        assert!(toml::from_str::<Config>("tolerence = 0.5").is_err());
        assert!(toml::from_str::<Config>("policy = \"best\"").is_err());
    }

    #[test]
    fn test_toml_accepts_legacy_model_names() {
        let cnn: Config = toml::from_str("model = \"cnn\"").unwrap();
        assert_eq!(cnn.model, ModelKind::Accurate);
        let hog: Config = toml::from_str("model = \"hog\"").unwrap();
        assert_eq!(hog.model, ModelKind::Fast);
    }

    #[test]
    fn test_from_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = Config::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "tolerance = \"high\"").unwrap();
        assert!(matches!(Config::from_file(&bad).unwrap_err(), ConfigError::Parse { .. }));
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facetag.toml");
        std::fs::write(&path, "tolerance = 0.5\npolicy = \"nearest\"\n").unwrap();

        let mut c = Config::from_file(&path).unwrap();
        c.apply_env_with(env(&[
            ("FACETAG_TOLERANCE", "0.4"),
            ("FACETAG_MODEL", "cnn"),
            ("FACETAG_UNKNOWN_DIR", "/in"),
            ("FACETAG_NAMING", "hashed"),
        ]))
        .unwrap();

        assert_eq!(c.tolerance, 0.4);
        assert_eq!(c.model, ModelKind::Accurate);
        assert_eq!(c.policy, MatchPolicy::Nearest);
        assert_eq!(c.unknown_faces_dir, PathBuf::from("/in"));
        assert_eq!(c.naming, OutputNaming::Hashed);
    }

    #[test]
    fn test_env_invalid_value_names_key() {
        let mut c = Config::default();
        let err = c.apply_env_with(env(&[("FACETAG_TOLERANCE", "loose")])).unwrap_err();
        assert!(err.to_string().contains("FACETAG_TOLERANCE"), "{err}");
    }

    #[test]
    fn test_validate_tolerance() {
        for bad in [-0.1, f32::NAN, f32::INFINITY] {
            let c = Config { tolerance: bad, ..Config::default() };
            assert!(matches!(c.validate(), Err(ConfigError::InvalidTolerance(_))));
        }
        let zero = Config { tolerance: 0.0, ..Config::default() };
        assert!(zero.validate().is_ok());
    }

    #[test]
    fn test_batch_options_carry_settings() {
        let c = Config {
            tolerance: 0.3,
            policy: MatchPolicy::Nearest,
            output_dir: PathBuf::from("/out"),
            naming: OutputNaming::Hashed,
            ..Config::default()
        };
        let o = c.batch_options();
        assert_eq!(o.tolerance, 0.3);
        assert_eq!(o.policy, MatchPolicy::Nearest);
        assert_eq!(o.output_dir, PathBuf::from("/out"));
        assert_eq!(o.naming, OutputNaming::Hashed);
    }
}
