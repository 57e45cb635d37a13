//! Settings for the assistant.
//!
//! Values are layered:
//! 1. Defaults in code
//! 2. The YAML config file, when present
//! 3. Environment overrides with the `GROW__` prefix, e.g.
//!    `GROW__DIRECTORIES__UPLOADS=/mnt/camera`. List keys take
//!    comma-separated values: `GROW__DATA_EVALUATION__TEMPERATURE_RANGE=20,25`

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, FileFormat, FileSourceFile};
use serde::Deserialize;

use crate::models::{Range, Thresholds};

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub image_analysis: ImageAnalysisConfig,
    pub data_evaluation: DataEvaluationConfig,
    pub directories: DirectoryConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ImageAnalysisConfig {
    /// File extensions picked up from the upload directory
    pub supported_formats: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DataEvaluationConfig {
    pub temperature_range: Range,
    pub humidity_range: Range,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DirectoryConfig {
    pub uploads: PathBuf,
    pub analyzed: PathBuf,
    pub archive: PathBuf,
    pub data: PathBuf,
    pub docs: PathBuf,
    pub output: PathBuf,
}

const LIST_KEYS: [&str; 3] = [
    "image_analysis.supported_formats",
    "data_evaluation.temperature_range",
    "data_evaluation.humidity_range",
];

fn environment() -> Environment {
    LIST_KEYS.into_iter().fold(
        Environment::with_prefix("GROW")
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .try_parsing(true),
        |env, key| env.with_list_parse_key(key),
    )
}

impl Settings {
    /// Loads settings from `path` (optional) and the environment.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = File::from(path).format(FileFormat::Yaml).required(false);
        Self::build(Some(file), Some(environment()))
    }

    fn build(
        file: Option<File<FileSourceFile, FileFormat>>,
        env: Option<Environment>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default(
                "image_analysis.supported_formats",
                vec!["jpg", "jpeg", "png"],
            )?
            .set_default("data_evaluation.temperature_range", vec![18.0, 28.0])?
            .set_default("data_evaluation.humidity_range", vec![40.0, 70.0])?
            .set_default("directories.uploads", "images/uploads")?
            .set_default("directories.analyzed", "images/analyzed")?
            .set_default("directories.archive", "images/archive")?
            .set_default("directories.data", "data")?
            .set_default("directories.docs", "docs")?
            .set_default("directories.output", "output")?;

        if let Some(file) = file {
            builder = builder.add_source(file);
        }
        if let Some(env) = env {
            builder = builder.add_source(env);
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (key, range) in [
            ("data_evaluation.temperature_range", self.temperature_range()),
            ("data_evaluation.humidity_range", self.humidity_range()),
        ] {
            if range.low > range.high {
                return Err(ConfigError::Message(format!(
                    "{key}: low bound {} is above high bound {}",
                    range.low, range.high
                )));
            }
        }
        Ok(())
    }

    pub fn temperature_range(&self) -> Range {
        self.data_evaluation.temperature_range
    }

    pub fn humidity_range(&self) -> Range {
        self.data_evaluation.humidity_range
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            temperature: self.temperature_range(),
            humidity: self.humidity_range(),
        }
    }

    pub fn supported_formats(&self) -> &[String] {
        &self.image_analysis.supported_formats
    }
}

impl Default for Settings {
    fn default() -> Self {
        let defaults = Thresholds::default();
        Self {
            image_analysis: ImageAnalysisConfig {
                supported_formats: vec!["jpg".into(), "jpeg".into(), "png".into()],
            },
            data_evaluation: DataEvaluationConfig {
                temperature_range: defaults.temperature,
                humidity_range: defaults.humidity,
            },
            directories: DirectoryConfig {
                uploads: "images/uploads".into(),
                analyzed: "images/analyzed".into(),
                archive: "images/archive".into(),
                data: "data".into(),
                docs: "docs".into(),
                output: "output".into(),
            },
        }
    }
}
