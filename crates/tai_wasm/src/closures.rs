//! Elementwise closures exposed as free functions.

use js_sys::Float64Array;
use serde_wasm_bindgen::{from_value, to_value};
use tai_core::closures::breaking;
use tai_core::closures::wave_number::{self as dispersion, WaveNumberMethod};
use tai_core::roots::RootSolution;
use wasm_bindgen::prelude::*;

pub(crate) fn parse_wave_number_method(name: &str) -> Result<WaveNumberMethod, String> {
    match name {
        "dispersion" => Ok(WaveNumberMethod::Dispersion),
        "similarity" => Ok(WaveNumberMethod::Similarity),
        other => Err(format!("Unknown wave number method: {}", other)),
    }
}

/// Wave number (m-1) of a single node.
#[wasm_bindgen]
pub fn wave_number(period: f64, depth: f64) -> f64 {
    dispersion::wave_number(period, depth)
}

/// Wave numbers of a transect with the chosen method (`dispersion` or `similarity`).
#[wasm_bindgen]
pub fn wave_numbers(
    period: Vec<f64>,
    depth: Vec<f64>,
    method: &str,
) -> Result<Float64Array, JsValue> {
    let method = parse_wave_number_method(method).map_err(|e| JsValue::from_str(&e))?;
    let k = dispersion::update_wave_number_with(method, &period, &depth)
        .map_err(|e| JsValue::from_str(&format!("Wave number failed: {}", e)))?;
    Ok(Float64Array::from(k.as_slice()))
}

/// Root-solved breaking fraction for one node.
#[wasm_bindgen]
pub fn breaking_probability(hrms: f64, hmax: f64) -> f64 {
    breaking::breaking_probability(hrms, hmax)
}

/// Full Brent result (root, residual, iterations, status) of the breaking
/// equation, or `null` when `hmax` is not positive.
#[wasm_bindgen]
pub fn solve_breaking_probability(hrms: f64, hmax: f64) -> Result<JsValue, JsValue> {
    let solution: Option<RootSolution> = breaking::solve_breaking_probability(hrms, hmax);
    to_value(&solution).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Breaking fractions of a transect; `params_val` may be undefined for defaults.
#[wasm_bindgen]
pub fn breaking_probabilities(
    hrms: Vec<f64>,
    depth: Vec<f64>,
    params_val: JsValue,
) -> Result<Float64Array, JsValue> {
    let params = if params_val.is_undefined() || params_val.is_null() {
        tai_core::params::ModelParams::default()
    } else {
        from_value(params_val)
            .map_err(|e| JsValue::from_str(&format!("Invalid model params: {}", e)))?
    };
    let qb = breaking::update_breaking_probability(&hrms, &depth, &params)
        .map_err(|e| JsValue::from_str(&format!("Breaking probability failed: {}", e)))?;
    Ok(Float64Array::from(qb.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names_are_parsed() {
        assert_eq!(parse_wave_number_method("dispersion"), Ok(WaveNumberMethod::Dispersion));
        assert_eq!(parse_wave_number_method("similarity"), Ok(WaveNumberMethod::Similarity));
        let err = parse_wave_number_method("exact").expect_err("unknown method");
        assert!(err.contains("exact"));
    }

    #[test]
    fn scalar_wrappers_forward_to_core() {
        assert_eq!(wave_number(8.0, 5.0), dispersion::wave_number(8.0, 5.0));
        assert_eq!(wave_number(8.0, 0.0), 0.0);
        assert_eq!(breaking_probability(0.3, 0.0), 1.0);
    }
}
