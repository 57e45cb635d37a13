use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AverageRgb {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

/// Channel statistics, or the reason they could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorAnalysis {
    Available {
        average_rgb: AverageRgb,
        green_dominance: f64,
    },
    Unavailable {
        error: String,
    },
}

impl ColorAnalysis {
    pub fn green_dominance(&self) -> Option<f64> {
        match self {
            ColorAnalysis::Available {
                green_dominance, ..
            } => Some(*green_dominance),
            ColorAnalysis::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Health {
    Excellent,
    Good,
    Fair,
    Poor,
    Unknown,
}

impl Health {
    pub fn description(&self) -> &'static str {
        match self {
            Health::Excellent => "Excellent - Strong green coloration",
            Health::Good => "Good - Healthy green color",
            Health::Fair => "Fair - Moderate green color",
            Health::Poor => "Poor - Low green coloration, check plant health",
            Health::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Health::Excellent => "Excellent",
            Health::Good => "Good",
            Health::Fair => "Fair",
            Health::Poor => "Poor",
            Health::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    pub dimensions: Dimensions,
    pub format: String,
    pub mode: String,
    pub color_analysis: ColorAnalysis,
    pub brightness: f64,
    pub estimated_health: Health,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedImage {
    pub filename: String,
    pub analysis: ImageAnalysis,
    pub analyzed_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Info,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightCategory {
    Temperature,
    Humidity,
    Growth,
    Trend,
    Setup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub category: InsightCategory,
    pub message: String,
}

impl Insight {
    pub fn info(category: InsightCategory, message: impl Into<String>) -> Self {
        Self {
            kind: InsightKind::Info,
            category,
            message: message.into(),
        }
    }

    pub fn warning(category: InsightCategory, message: impl Into<String>) -> Self {
        Self {
            kind: InsightKind::Warning,
            category,
            message: message.into(),
        }
    }
}

/// Inclusive `[low, high]` band, written as a two-element list in config files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Range {
    pub low: f64,
    pub high: f64,
}

impl Range {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }
}

impl From<[f64; 2]> for Range {
    fn from([low, high]: [f64; 2]) -> Self {
        Self { low, high }
    }
}

impl From<Range> for [f64; 2] {
    fn from(range: Range) -> Self {
        [range.low, range.high]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub temperature: Range,
    pub humidity: Range,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            temperature: Range::new(18.0, 28.0),
            humidity: Range::new(40.0, 70.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightSnapshot {
    pub timestamp: NaiveDateTime,
    pub insights: Vec<Insight>,
}

/// A numeric sensor value that prints exactly as it was written, so `40.0`
/// stays `40.0` and `40` stays `40`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading(Number);

impl Reading {
    pub fn value(&self) -> f64 {
        self.0.as_f64().unwrap_or(f64::NAN)
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EnvironmentReading {
    #[serde(default, deserialize_with = "lenient_number")]
    pub temperature: Option<Reading>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub humidity: Option<Reading>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GrowthReading {
    #[serde(default, deserialize_with = "lenient_number")]
    pub height: Option<Reading>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub stage: Option<String>,
}

/// One data file: every section is optional, and a section of the wrong
/// shape is treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GrowRecord {
    #[serde(default, deserialize_with = "lenient_section")]
    pub environment: Option<EnvironmentReading>,
    #[serde(default, deserialize_with = "lenient_section")]
    pub growth: Option<GrowthReading>,
    #[serde(default, deserialize_with = "lenient_series")]
    pub history: Option<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Milestone {
    Germination,
    Vegetative,
    Flowering,
    Harvest,
    Other(String),
}

impl Milestone {
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "germination" => Milestone::Germination,
            "vegetative" => Milestone::Vegetative,
            "flowering" => Milestone::Flowering,
            "harvest" => Milestone::Harvest,
            _ => Milestone::Other(label.trim().to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Milestone::Germination => "germination",
            Milestone::Vegetative => "vegetative",
            Milestone::Flowering => "flowering",
            Milestone::Harvest => "harvest",
            Milestone::Other(label) => label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MilestoneDetails {
    Fields(Vec<(String, String)>),
    Note(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WeeklySummary {
    #[serde(default)]
    pub images_processed: Option<u32>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub avg_health: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub growth_rate: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub notes: Option<String>,
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<Reading>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => Some(Reading(number)),
        _ => None,
    })
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        _ => None,
    })
}

fn lenient_section<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(object @ Value::Object(_)) => serde_json::from_value(object).ok(),
        _ => None,
    })
}

fn lenient_series<'de, D>(deserializer: D) -> Result<Option<Vec<Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => Some(items),
        _ => None,
    })
}
