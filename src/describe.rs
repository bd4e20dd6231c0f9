//! Text descriptions for exported melodies.
//!
//! Descriptions come from an optional remote model. The export pipeline
//! never fails because of it: any error becomes [`FALLBACK_DESCRIPTION`].

use std::future::Future;

use thiserror::Error;

use crate::series::SeriesSummary;

pub const FALLBACK_DESCRIPTION: &str = "A procedurally generated melody based on the heartbeat of a live data feed. \
     Captured in a moment of digital time.";

/// Environment variable holding the model API key.
pub const API_KEY_ENV: &str = "API_KEY";

pub const SYSTEM_INSTRUCTION: &str = "You are a creative digital artist. \
     Your task is to analyze a sequence of measurements and write a short, poetic, cyberpunk style \
     description for the melody generated from it. \
     Focus on the mood of the data (busy and volatile = frantic, low and steady = calm). \
     Keep the description under 50 words.";

#[derive(Error, Debug)]
pub enum DescribeError {
    #[error("No API key found in ${0}")]
    MissingApiKey(&'static str),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Model returned no text")]
    EmptyResponse,

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Something that can describe a series in a sentence or two.
pub trait Describer {
    fn describe(&self, summary: &SeriesSummary) -> impl Future<Output = Result<String, DescribeError>> + Send;
}

/// Always returns the same text. Useful offline and in tests.
#[derive(Debug, Clone)]
pub struct StaticDescriber(pub String);

impl Default for StaticDescriber {
    fn default() -> Self {
        StaticDescriber(FALLBACK_DESCRIPTION.to_string())
    }
}

impl Describer for StaticDescriber {
    fn describe(&self, _summary: &SeriesSummary) -> impl Future<Output = Result<String, DescribeError>> + Send {
        let text = self.0.clone();
        async move { Ok(text) }
    }
}

/// User prompt for a series: point count plus average, peak and lowest
/// primary metric at four decimals.
pub fn build_prompt(summary: &SeriesSummary) -> String {
    format!(
        "Analyze this data sequence (last {} points):\n\
         Average: {:.4}\n\
         Peak: {:.4}\n\
         Lowest: {:.4}\n\n\
         Generate a poetic, futuristic description for this melody.",
        summary.count, summary.avg_primary, summary.max_primary, summary.min_primary
    )
}

/// Ask `describer`, falling back to [`FALLBACK_DESCRIPTION`] on any error
/// or blank answer.
pub async fn describe_or_fallback<D: Describer>(describer: &D, summary: &SeriesSummary) -> String {
    match describer.describe(summary).await {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => {
            tracing::warn!("describer returned blank text, using fallback description");
            FALLBACK_DESCRIPTION.to_string()
        }
        Err(e) => {
            tracing::warn!(error = %e, "description unavailable, using fallback");
            FALLBACK_DESCRIPTION.to_string()
        }
    }
}

#[cfg(feature = "describe")]
pub use gemini::GeminiDescriber;

#[cfg(feature = "describe")]
mod gemini {
    use std::future::Future;
    use std::time::Duration;

    use serde_json::{Value, json};

    use super::{API_KEY_ENV, DescribeError, Describer, SYSTEM_INSTRUCTION, build_prompt};
    use crate::series::SeriesSummary;

    const DEFAULT_MODEL: &str = "gemini-2.5-flash";
    const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
    const TEMPERATURE: f64 = 0.8;

    /// Describer backed by the Gemini `generateContent` endpoint.
    #[derive(Debug, Clone)]
    pub struct GeminiDescriber {
        client: reqwest::Client,
        api_key: String,
        model: String,
        base_url: String,
    }

    impl GeminiDescriber {
        pub fn new(api_key: impl Into<String>) -> Result<Self, DescribeError> {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .map_err(|e| DescribeError::Http(e.to_string()))?;
            Ok(GeminiDescriber {
                client,
                api_key: api_key.into(),
                model: DEFAULT_MODEL.to_string(),
                base_url: DEFAULT_BASE_URL.to_string(),
            })
        }

        /// Read the key from `$API_KEY`.
        pub fn from_env() -> Result<Self, DescribeError> {
            match std::env::var(API_KEY_ENV) {
                Ok(key) if !key.is_empty() => Self::new(key),
                _ => Err(DescribeError::MissingApiKey(API_KEY_ENV)),
            }
        }

        pub fn with_model(mut self, model: impl Into<String>) -> Self {
            self.model = model.into();
            self
        }

        pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
            self.base_url = base_url.into();
            self
        }

        fn request_body(summary: &SeriesSummary) -> Value {
            json!({
                "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
                "contents": [{ "role": "user", "parts": [{ "text": build_prompt(summary) }] }],
                "generationConfig": { "temperature": TEMPERATURE },
            })
        }
    }

    /// First candidate's concatenated text parts.
    pub(super) fn extract_text(body: &Value) -> Result<String, DescribeError> {
        let parts = body
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .ok_or_else(|| DescribeError::Malformed("no candidate parts".into()))?;
        let text: String = parts.iter().filter_map(|p| p.get("text").and_then(Value::as_str)).collect();
        if text.trim().is_empty() {
            Err(DescribeError::EmptyResponse)
        } else {
            Ok(text)
        }
    }

    impl Describer for GeminiDescriber {
        fn describe(&self, summary: &SeriesSummary) -> impl Future<Output = Result<String, DescribeError>> + Send {
            let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
            let request = self
                .client
                .post(url)
                .query(&[("key", self.api_key.as_str())])
                .json(&Self::request_body(summary));

            async move {
                let response = request.send().await.map_err(|e| DescribeError::Http(e.to_string()))?;
                let status = response.status();
                if !status.is_success() {
                    let message = response.text().await.unwrap_or_default();
                    return Err(DescribeError::Http(format!("{status}: {message}")));
                }
                let body: Value = response.json().await.map_err(|e| DescribeError::Malformed(e.to_string()))?;
                extract_text(&body)
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn extracts_first_candidate() {
            let body = json!({
                "candidates": [{ "content": { "parts": [{ "text": "Neon " }, { "text": "rain." }] } }]
            });
            assert_eq!(extract_text(&body).unwrap(), "Neon rain.");
        }

        #[test]
        fn blank_or_missing_text_is_an_error() {
            let blank = json!({ "candidates": [{ "content": { "parts": [{ "text": "  " }] } }] });
            assert!(matches!(extract_text(&blank), Err(DescribeError::EmptyResponse)));
            assert!(matches!(extract_text(&json!({})), Err(DescribeError::Malformed(_))));
        }

        #[test]
        fn body_carries_instruction_and_temperature() {
            let summary = SeriesSummary { count: 2, avg_primary: 0.5, max_primary: 1.0, min_primary: 0.0, span_seconds: 10 };
            let body = GeminiDescriber::request_body(&summary);
            assert_eq!(body["generationConfig"]["temperature"], 0.8);
            assert!(body["contents"][0]["parts"][0]["text"].as_str().unwrap().contains("Average: 0.5000"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl Describer for Failing {
        fn describe(&self, _summary: &SeriesSummary) -> impl Future<Output = Result<String, DescribeError>> + Send {
            async { Err(DescribeError::MissingApiKey(API_KEY_ENV)) }
        }
    }

    fn summary() -> SeriesSummary {
        SeriesSummary {
            count: 20,
            avg_primary: 0.0123456,
            max_primary: 0.5,
            min_primary: 0.00001,
            span_seconds: 3600,
        }
    }

    #[test]
    fn prompt_uses_four_decimals() {
        let prompt = build_prompt(&summary());
        assert!(prompt.contains("last 20 points"));
        assert!(prompt.contains("Average: 0.0123"));
        assert!(prompt.contains("Peak: 0.5000"));
        assert!(prompt.contains("Lowest: 0.0000"));
    }

    #[tokio::test]
    async fn errors_fall_back() {
        assert_eq!(describe_or_fallback(&Failing, &summary()).await, FALLBACK_DESCRIPTION);
    }

    #[tokio::test]
    async fn blank_answers_fall_back() {
        let d = StaticDescriber("   ".into());
        assert_eq!(describe_or_fallback(&d, &summary()).await, FALLBACK_DESCRIPTION);
    }

    #[tokio::test]
    async fn answers_are_trimmed() {
        let d = StaticDescriber("  Calm blue static.\n".into());
        assert_eq!(describe_or_fallback(&d, &summary()).await, "Calm blue static.");
    }
}
