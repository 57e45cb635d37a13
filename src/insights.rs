use serde_json::Value;
use tracing::{info, warn};

use crate::error::ParseError;
use crate::models::{
    EnvironmentReading, GrowRecord, GrowthReading, Insight, InsightCategory, Range, Thresholds,
};

pub struct InsightEngine {
    thresholds: Thresholds,
}

enum Band {
    Below,
    Within,
    Above,
}

fn band(value: f64, range: Range) -> Band {
    if value < range.low {
        Band::Below
    } else if value > range.high {
        Band::Above
    } else {
        Band::Within
    }
}

impl InsightEngine {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Insights for one record, in field order: temperature, humidity,
    /// height, stage, trend.
    pub fn evaluate(&self, record: &GrowRecord) -> Vec<Insight> {
        let mut insights = Vec::new();

        if let Some(environment) = &record.environment {
            insights.extend(self.evaluate_environment(environment));
        }
        if let Some(growth) = &record.growth {
            insights.extend(evaluate_growth(growth));
        }
        if let Some(history) = &record.history {
            insights.extend(evaluate_trend(history));
        }

        insights
    }

    /// Parses and evaluates each source in turn. A source that fails to parse
    /// is logged and contributes nothing; no sources at all yields the
    /// welcome sequence.
    pub fn evaluate_sources<I, S>(&self, sources: I) -> Vec<Insight>
    where
        I: IntoIterator<Item = (String, S)>,
        S: AsRef<str>,
    {
        let mut insights = Vec::new();
        let mut seen = 0usize;

        for (source_id, raw) in sources {
            seen += 1;
            match parse_record(&source_id, raw.as_ref()) {
                Ok(record) => {
                    let found = self.evaluate(&record);
                    info!(source = %source_id, insights = found.len(), "evaluated data file");
                    insights.extend(found);
                }
                Err(err) => warn!(error = %err, "skipping data file"),
            }
        }

        if seen == 0 {
            info!("no data files found");
            return welcome_insights();
        }

        insights
    }

    fn evaluate_environment(&self, environment: &EnvironmentReading) -> Vec<Insight> {
        let mut insights = Vec::new();

        if let Some(temp) = &environment.temperature {
            insights.push(match band(temp.value(), self.thresholds.temperature) {
                Band::Below => Insight::warning(
                    InsightCategory::Temperature,
                    format!("Temperature is low ({temp}°C). Consider increasing heat."),
                ),
                Band::Above => Insight::warning(
                    InsightCategory::Temperature,
                    format!("Temperature is high ({temp}°C). Consider cooling."),
                ),
                Band::Within => Insight::info(
                    InsightCategory::Temperature,
                    format!("Temperature is optimal ({temp}°C)."),
                ),
            });
        }

        if let Some(humidity) = &environment.humidity {
            insights.push(match band(humidity.value(), self.thresholds.humidity) {
                Band::Below => Insight::warning(
                    InsightCategory::Humidity,
                    format!("Humidity is low ({humidity}%). Consider humidifier."),
                ),
                Band::Above => Insight::warning(
                    InsightCategory::Humidity,
                    format!("Humidity is high ({humidity}%). Increase ventilation."),
                ),
                Band::Within => Insight::info(
                    InsightCategory::Humidity,
                    format!("Humidity is good ({humidity}%)."),
                ),
            });
        }

        insights
    }
}

impl Default for InsightEngine {
    fn default() -> Self {
        Self::new(Thresholds::default())
    }
}

pub fn parse_record(source_id: &str, raw: &str) -> Result<GrowRecord, ParseError> {
    serde_json::from_str(raw).map_err(|source| ParseError {
        source_id: source_id.to_string(),
        source,
    })
}

fn evaluate_growth(growth: &GrowthReading) -> Vec<Insight> {
    let mut insights = Vec::new();

    if let Some(height) = &growth.height {
        insights.push(Insight::info(
            InsightCategory::Growth,
            format!("Current plant height: {height}cm"),
        ));
    }
    if let Some(stage) = &growth.stage {
        insights.push(Insight::info(
            InsightCategory::Growth,
            format!("Current growth stage: {stage}"),
        ));
    }

    insights
}

fn evaluate_trend(history: &[Value]) -> Option<Insight> {
    // a single reading is not a trend
    if history.len() < 2 {
        return None;
    }

    Some(Insight::info(
        InsightCategory::Trend,
        format!("Historical data available for {} data points", history.len()),
    ))
}

pub fn welcome_insights() -> Vec<Insight> {
    vec![
        Insight::info(
            InsightCategory::Setup,
            "Welcome to Grow Documentation Assistant!",
        ),
        Insight::info(
            InsightCategory::Setup,
            "Place images in images/uploads/ directory to analyze them",
        ),
        Insight::info(
            InsightCategory::Setup,
            "Add JSON data files to data/ directory for evaluation",
        ),
    ]
}
