//! Derived register values
//!
//! Unit conversions the console shows next to raw reads. They are computed
//! on request and stored back into the log entry through enrichment.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// ADC full scale for 12-bit converters
const ADC_FULL_SCALE: f64 = 4095.0;

/// Which derived views to compute after a read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DerivedKind {
    /// Register pairs as big-endian IEEE-754 floats
    Floats,
    /// 12-bit ADC counts scaled to 0-5 V and 0-20 mA
    Adc,
    /// Millivolt registers as volts
    Volts05,
    /// Hundredths of mA as mA
    Milliamps020,
}

impl DerivedKind {
    /// Key under which the view is stored in the response payload
    pub fn key(&self) -> &'static str {
        match self {
            Self::Floats => "parsedFloatValues",
            Self::Adc => "parsedAdc",
            Self::Volts05 => "parsed05V",
            Self::Milliamps020 => "parsed020mA",
        }
    }
}

/// One ADC register in both scales
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdcReading {
    pub raw: u16,
    pub volts_0_5: f64,
    #[serde(rename = "mA_0_20")]
    pub ma_0_20: f64,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Consecutive register pairs, high word first; a trailing odd register is dropped
pub fn parse_floats(values: &[u16]) -> Vec<f32> {
    values
        .chunks_exact(2)
        .map(|pair| f32::from_bits((u32::from(pair[0]) << 16) | u32::from(pair[1])))
        .collect()
}

pub fn parse_adc(values: &[u16]) -> Vec<AdcReading> {
    values
        .iter()
        .map(|&raw| AdcReading {
            raw,
            volts_0_5: round_to(f64::from(raw) * 5.0 / ADC_FULL_SCALE, 3),
            ma_0_20: round_to(f64::from(raw) * 20.0 / ADC_FULL_SCALE, 2),
        })
        .collect()
}

pub fn parse_volts(values: &[u16]) -> Vec<f64> {
    values
        .iter()
        .map(|&v| round_to(f64::from(v) / 1000.0, 3))
        .collect()
}

pub fn parse_milliamps(values: &[u16]) -> Vec<f64> {
    values
        .iter()
        .map(|&v| round_to(f64::from(v) / 100.0, 2))
        .collect()
}

/// Compute the requested views, keyed for merging into a response payload
pub fn derive_values(values: &[u16], kinds: &[DerivedKind]) -> Map<String, Value> {
    let mut derived = Map::new();
    for kind in kinds {
        let view = match kind {
            DerivedKind::Floats => serde_json::to_value(parse_floats(values)),
            DerivedKind::Adc => serde_json::to_value(parse_adc(values)),
            DerivedKind::Volts05 => serde_json::to_value(parse_volts(values)),
            DerivedKind::Milliamps020 => serde_json::to_value(parse_milliamps(values)),
        };
        // Non-finite floats serialize to null rather than failing
        derived.insert(kind.key().to_string(), view.unwrap_or(Value::Null));
    }
    derived
}
