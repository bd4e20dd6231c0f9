pub mod config;
pub mod describe;
pub mod dsp;
pub mod error;
pub mod metadata;
pub mod output;
pub mod plan;
pub mod playback;
pub mod scale;
pub mod series;
pub mod stats;
pub mod style;

pub use config::{JitterMode, SonifyConfig};
pub use dsp::renderer::{OfflineRenderer, render_wav};
pub use dsp::wav::{AudioFile, SampleBuffer, WavHeader, encode_wav};
pub use error::SonifyError;
pub use plan::{NoteEvent, NotePlan, PlannedNote};
pub use series::{DataPoint, Series, SeriesSummary};
pub use style::Style;

use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// WASM-exposed: return the datasong-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: render a JSON series to WAV bytes with the default config.
#[wasm_bindgen]
pub fn render_series_wav(series_json: &str, style: &str, tempo_seconds: f64) -> Result<Vec<u8>, JsValue> {
    let series = Series::from_json_str(series_json).map_err(js_err)?;
    let renderer = OfflineRenderer::default();
    let buffer = renderer.render_tagged(&series, style, tempo_seconds).map_err(js_err)?;
    Ok(encode_wav(buffer).map_err(js_err)?.into_bytes())
}

/// WASM-exposed: count/avg/max/min of a JSON series.
#[wasm_bindgen]
pub fn series_summary(series_json: &str) -> Result<JsValue, JsValue> {
    let series = Series::from_json_str(series_json).map_err(js_err)?;
    serde_wasm_bindgen::to_value(&series.summary()).map_err(js_err)
}

/// WASM-exposed: the note plan for a JSON series, for driving a JS-side
/// scheduler and visualizer.
#[wasm_bindgen]
pub fn plan_series(series_json: &str, style: &str, tempo_seconds: f64) -> Result<JsValue, JsValue> {
    let series = Series::from_json_str(series_json).map_err(js_err)?;
    let style: Style = style.parse().map_err(js_err)?;
    let plan = NotePlan::build(&series, style, tempo_seconds, &SonifyConfig::default()).map_err(js_err)?;
    serde_wasm_bindgen::to_value(&plan).map_err(js_err)
}
