//! Token metadata and export file naming.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::series::Series;
use crate::style::Style;

pub const DEFAULT_NETWORK: &str = "Arbitrum One";

/// An attribute value is either text or a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub trait_type: String,
    pub value: AttributeValue,
}

impl Attribute {
    pub fn text(trait_type: &str, value: impl Into<String>) -> Self {
        Attribute {
            trait_type: trait_type.to_string(),
            value: AttributeValue::Text(value.into()),
        }
    }

    pub fn number(trait_type: &str, value: f64) -> Self {
        Attribute {
            trait_type: trait_type.to_string(),
            value: AttributeValue::Number(value),
        }
    }
}

/// Marketplace-style metadata describing one exported melody.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation_url: Option<String>,
    pub attributes: Vec<Attribute>,
}

impl TokenMetadata {
    pub fn build(series: &Series, style: Style, description: impl Into<String>, network: &str) -> Self {
        let summary = series.summary();
        let hours = (summary.span_seconds.max(0) as f64 / 3600.0).round() as i64;

        TokenMetadata {
            name: format!("Data Pulse #{}", last_sequence(series)),
            description: description.into(),
            image: None,
            animation_url: None,
            attributes: vec![
                Attribute::text("Network", network),
                Attribute::text("Audio Style", style.as_str()),
                Attribute::text("Duration", format!("{hours} Hours")),
                Attribute::number("Average", round4(summary.avg_primary)),
            ],
        }
    }

    pub fn with_image(mut self, uri: impl Into<String>) -> Self {
        self.image = Some(uri.into());
        self
    }

    /// Usually an `AudioFile::to_data_uri()`.
    pub fn with_animation_url(mut self, uri: impl Into<String>) -> Self {
        self.animation_url = Some(uri.into());
        self
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// Sequence number of the last point, 0 for an empty series.
fn last_sequence(series: &Series) -> u64 {
    series.last().map_or(0, |p| p.sequence_number)
}

/// `melody-<style>-<lastSeq>.wav`
pub fn export_file_name(series: &Series, style: Style) -> String {
    format!("melody-{}-{}.wav", style.slug(), last_sequence(series))
}

/// `pulse-<lastSeq>.json`
pub fn metadata_file_name(series: &Series) -> String {
    format!("pulse-{}.json", last_sequence(series))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::point;

    fn series() -> Series {
        Series::new(vec![point(1200, 4.0, 0.012345), point(1201, 9.0, 0.02), point(1203, 2.0, 0.01)]).unwrap()
    }

    #[test]
    fn file_names_use_last_sequence_number() {
        assert_eq!(export_file_name(&series(), Style::Cyberpunk), "melody-cyberpunk-1203.wav");
        assert_eq!(metadata_file_name(&series()), "pulse-1203.json");
        assert_eq!(export_file_name(&Series::default(), Style::Retro), "melody-retro-0.wav");
    }

    #[test]
    fn attributes() {
        let meta = TokenMetadata::build(&series(), Style::Ethereal, "Quiet hum.", DEFAULT_NETWORK);
        assert_eq!(meta.name, "Data Pulse #1203");
        assert_eq!(meta.attributes[0], Attribute::text("Network", "Arbitrum One"));
        assert_eq!(meta.attributes[1], Attribute::text("Audio Style", "ETHEREAL"));
        // point() spaces timestamps one hour apart by sequence number
        assert_eq!(meta.attributes[2], Attribute::text("Duration", "3 Hours"));
        match meta.attributes[3].value {
            AttributeValue::Number(avg) => approx::assert_abs_diff_eq!(avg, 0.0141, epsilon = 1e-12),
            ref other => panic!("expected a number, got {other:?}"),
        }
    }

    #[test]
    fn json_shape() {
        let meta = TokenMetadata::build(&series(), Style::Retro, "Blips.", DEFAULT_NETWORK).with_animation_url("data:audio/wav;base64,AA==");
        let json: serde_json::Value = serde_json::from_str(&meta.to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["attributes"][1]["trait_type"], "Audio Style");
        assert_eq!(json["attributes"][1]["value"], "RETRO");
        assert!(json["attributes"][3]["value"].is_number());
        assert!(json.get("image").is_none());
        assert_eq!(json["animation_url"], "data:audio/wav;base64,AA==");
    }
}
