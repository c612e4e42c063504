//! Classification of a final answer into plain text or a structured shape.
//!
//! The model is free to answer in prose or to embed a JSON object. The slice
//! from the first `{` to the last `}` is parsed; only an object whose `type`
//! is `itinerary` or `general` becomes structured, anything else stays text.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    PlainText(String),
    Structured(StructuredAnswer),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StructuredAnswer {
    Itinerary(Itinerary),
    #[serde(rename = "general")]
    Recommendation(Recommendation),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Itinerary {
    pub title: String,
    pub summary: String,
    pub total_budget: Option<f64>,
    pub duration: Option<String>,
    pub days: Vec<ItineraryDay>,
    pub transportation: Option<String>,
    pub tips: Vec<String>,
    pub budget: Option<BudgetBreakdown>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItineraryDay {
    pub day: u32,
    pub date: Option<String>,
    pub theme: Option<String>,
    pub locations: Vec<ItineraryStop>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItineraryStop {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub cost: Option<f64>,
    pub tips: Option<String>,
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetBreakdown {
    pub accommodation: f64,
    pub food: f64,
    pub activities: f64,
    pub transportation: f64,
    pub miscellaneous: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub answer: String,
    #[serde(default)]
    pub recommendations: Vec<RecommendationItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecommendationItem {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub estimated_cost: Option<f64>,
    pub tips: Vec<String>,
}

impl Answer {
    pub fn classify(text: &str) -> Self {
        let Some(candidate) = json_slice(text) else {
            return Answer::PlainText(text.to_string());
        };

        let value: Value = match serde_json::from_str(candidate) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "Embedded braces are not JSON, keeping plain text");
                return Answer::PlainText(text.to_string());
            }
        };

        let structured = match value.get("type").and_then(Value::as_str) {
            Some("itinerary") => serde_json::from_value(value).map(StructuredAnswer::Itinerary),
            Some("general") => serde_json::from_value(value).map(StructuredAnswer::Recommendation),
            _ => return Answer::PlainText(text.to_string()),
        };

        match structured {
            Ok(structured) => Answer::Structured(structured),
            Err(e) => {
                debug!(error = %e, "JSON does not match a structured answer shape");
                Answer::PlainText(text.to_string())
            }
        }
    }

    /// Text shown to the user as the turn content
    pub fn display_text(&self) -> String {
        match self {
            Answer::PlainText(text) => text.clone(),
            Answer::Structured(StructuredAnswer::Recommendation(rec)) => {
                rec.answer.trim().to_string()
            }
            Answer::Structured(StructuredAnswer::Itinerary(itinerary)) => {
                [itinerary.title.trim(), itinerary.summary.trim()]
                    .iter()
                    .filter(|part| !part.is_empty())
                    .copied()
                    .collect::<Vec<_>>()
                    .join("\n\n")
            }
        }
    }

    pub fn into_structured(self) -> Option<StructuredAnswer> {
        match self {
            Answer::Structured(structured) => Some(structured),
            Answer::PlainText(_) => None,
        }
    }
}

fn json_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
