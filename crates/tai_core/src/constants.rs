//! Physical constants shared by the closures.

/// Gravitational acceleration (m s-2).
pub const G: f64 = 9.8;
/// Sea water density (kg m-3).
pub const RHO_WATER: f64 = 1025.0;
/// Air density (kg m-3).
pub const RHO_AIR: f64 = 1.225;
/// Seconds per (365 day) year.
pub const SECONDS_PER_YEAR: f64 = 3.1536e7;
/// Seconds per day.
pub const SECONDS_PER_DAY: f64 = 8.64e4;
