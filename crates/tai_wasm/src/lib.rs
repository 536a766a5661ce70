//! JavaScript bindings for `tai_core`.
//!
//! Errors cross the boundary as string `JsValue`s; parameter and settings
//! objects are decoded with `serde-wasm-bindgen`.

pub mod closures;
pub mod transect;

pub use closures::{breaking_probability, wave_number};
pub use transect::{IntegrationSettings, WasmTransect};
