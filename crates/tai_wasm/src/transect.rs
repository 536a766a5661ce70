//! WASM wrapper around the transect system and the RKF45 integrator.

use js_sys::Float64Array;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, to_value};
use tai_core::params::{Forcing, ModelParams};
use tai_core::rkf45::{Rkf45, Rkf45Settings, RungeKuttaCache, StepMode, StepReport};
use tai_core::transect::{TransectSystem, VARIABLES};
use wasm_bindgen::prelude::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationSettings {
    /// Absolute tolerances for depth, discharge and wave energy.
    pub tolerances: Vec<f64>,
    pub initial_step: f64,
    pub mode: StepMode,
    /// Still water level used to build the initial state.
    pub water_level: f64,
    pub solver: Rkf45Settings,
}

impl Default for IntegrationSettings {
    fn default() -> Self {
        Self {
            tolerances: vec![1e-4, 1.0, 1.0],
            initial_step: 0.1,
            mode: StepMode::Adaptive,
            water_level: 0.0,
            solver: Rkf45Settings::default(),
        }
    }
}

/// Flattens a state table node by node.
pub(crate) fn to_row_major(state: &DMatrix<f64>) -> Vec<f64> {
    state.transpose().as_slice().to_vec()
}

pub(crate) fn from_row_major(
    values: &[f64],
    rows: usize,
    cols: usize,
) -> anyhow::Result<DMatrix<f64>> {
    if values.len() != rows * cols {
        anyhow::bail!(
            "State has {} values, expected {} ({} nodes x {} variables).",
            values.len(),
            rows * cols,
            rows,
            cols
        );
    }
    Ok(DMatrix::from_row_slice(rows, cols, values))
}

fn params_from_value(value: JsValue) -> Result<ModelParams, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(ModelParams::default());
    }
    from_value(value).map_err(|e| JsValue::from_str(&format!("Invalid model params: {}", e)))
}

#[wasm_bindgen]
pub struct WasmTransect {
    system: TransectSystem,
    solver: Rkf45,
    cache: RungeKuttaCache,
    state: DMatrix<f64>,
    next: DMatrix<f64>,
    tolerances: Vec<f64>,
    step: f64,
    mode: StepMode,
    t: f64,
}

#[wasm_bindgen]
impl WasmTransect {
    #[wasm_bindgen(constructor)]
    pub fn new(
        dx: f64,
        bed: Vec<f64>,
        forcing_val: JsValue,
        params_val: JsValue,
        settings_val: JsValue,
    ) -> Result<WasmTransect, JsValue> {
        console_error_panic_hook::set_once();

        let forcing: Forcing = from_value(forcing_val)
            .map_err(|e| JsValue::from_str(&format!("Invalid forcing: {}", e)))?;
        let params = params_from_value(params_val)?;
        let settings: IntegrationSettings = if settings_val.is_undefined() {
            IntegrationSettings::default()
        } else {
            from_value(settings_val)
                .map_err(|e| JsValue::from_str(&format!("Invalid integration settings: {}", e)))?
        };
        if settings.tolerances.len() != VARIABLES {
            return Err(JsValue::from_str(&format!(
                "Expected {} tolerances, got {}.",
                VARIABLES,
                settings.tolerances.len()
            )));
        }

        let system = TransectSystem::new(dx, bed, forcing, params)
            .map_err(|e| JsValue::from_str(&format!("Invalid transect: {}", e)))?;
        let state = system.still_water_state(settings.water_level);
        let nodes = system.nodes();

        Ok(WasmTransect {
            system,
            solver: Rkf45::new(settings.solver),
            cache: RungeKuttaCache::new(nodes, VARIABLES),
            next: state.clone(),
            state,
            tolerances: settings.tolerances,
            step: settings.initial_step,
            mode: settings.mode,
            t: 0.0,
        })
    }

    /// Takes one accepted step and returns the step report.
    pub fn step(&mut self) -> Result<JsValue, JsValue> {
        let report = self.advance()?;
        to_value(&report).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Steps until `duration` seconds have elapsed; returns the number of steps.
    pub fn run(&mut self, duration: f64) -> Result<u32, JsValue> {
        let end = self.t + duration;
        let mut steps = 0;
        while self.t < end {
            let proposed = self.step;
            let remaining = end - self.t;
            if proposed > remaining {
                self.step = remaining;
                let report = self.advance()?;
                self.step = resume_step(proposed, remaining, &report);
            } else {
                self.advance()?;
            }
            steps += 1;
        }
        Ok(steps)
    }

    /// State as a row-major `nodes x 3` array.
    pub fn get_state(&self) -> Float64Array {
        Float64Array::from(to_row_major(&self.state).as_slice())
    }

    pub fn set_state(&mut self, state: &[f64]) -> Result<(), JsValue> {
        self.state = from_row_major(state, self.system.nodes(), VARIABLES)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(())
    }

    pub fn get_t(&self) -> f64 {
        self.t
    }

    pub fn get_step(&self) -> f64 {
        self.step
    }

    pub fn diagnostics(&self) -> Result<JsValue, JsValue> {
        let diagnostics = self
            .system
            .diagnostics(&self.state)
            .map_err(|e| JsValue::from_str(&format!("Diagnostics failed: {}", e)))?;
        to_value(&diagnostics)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}

impl WasmTransect {
    fn advance(&mut self) -> Result<StepReport, JsValue> {
        let report = self
            .solver
            .advance(
                &mut self.system,
                &mut self.cache,
                &self.state,
                &mut self.next,
                &mut self.step,
                &self.tolerances,
                self.mode,
            )
            .map_err(|e| JsValue::from_str(&format!("Integration failed: {}", e)))?;
        self.state.copy_from(&self.next);
        self.t += report.used_step;
        self.step = report.next_step;
        Ok(report)
    }
}

/// Step size to continue with after a step clipped from `proposed` to `clipped`.
///
/// When the clipped step went through unchanged it says nothing about how
/// large a step the dynamics allow, so the earlier proposal is kept.
fn resume_step(proposed: f64, clipped: f64, report: &StepReport) -> f64 {
    if report.used_step == clipped {
        report.next_step.max(proposed)
    } else {
        report.next_step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_major_layout_is_node_by_node() {
        let state = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let flat = to_row_major(&state);
        assert_eq!(flat, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(from_row_major(&flat, 2, 3).expect("lengths match"), state);
    }

    #[test]
    fn row_major_rejects_wrong_length() {
        let err = from_row_major(&[1.0; 5], 2, 3).expect_err("expected mismatch");
        assert!(format!("{err}").contains("expected 6"));
    }

    #[test]
    fn clipped_step_keeps_the_earlier_proposal() {
        let accepted = StepReport {
            used_step: 0.05,
            next_step: 0.2,
            iterations: 1,
        };
        assert_eq!(resume_step(0.5, 0.05, &accepted), 0.5);
        assert_eq!(resume_step(0.1, 0.05, &accepted), 0.2);

        // shrunk by error control: the controller's proposal stands
        let rejected = StepReport {
            used_step: 0.02,
            next_step: 0.03,
            iterations: 3,
        };
        assert_eq!(resume_step(0.5, 0.05, &rejected), 0.03);
    }

    #[test]
    fn default_settings_cover_every_variable() {
        let settings = IntegrationSettings::default();
        assert_eq!(settings.tolerances.len(), VARIABLES);
        assert_eq!(settings.mode, StepMode::Adaptive);
    }
}
