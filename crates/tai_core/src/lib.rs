pub mod accretion;
pub mod closures;
pub mod constants;
pub mod error;
pub mod lookup;
pub mod params;
pub mod reconstruction;
pub mod reduce;
pub mod rkf45;
pub mod roots;
pub mod transect;
/// The `tai_core` crate provides the numerical engine of a coastal hydrodynamic and wave
/// model. Its two generic primitives are an adaptive RKF45 integrator and a bracketed Brent
/// root solver; the physical closures are formulated as root-finding or elementwise array
/// problems on top of them.
///
/// Key components:
/// - **Traits**: `Scalar` (numeric type abstraction), `Residual` (root solver callbacks),
///   `StateDerivative` (integrator callbacks).
/// - **Reduce / Roots / RKF45**: per-slice table reductions, Brent's method with a
///   status-carrying result, and the embedded 4(5) stepper.
/// - **Closures**: roughness, shear stress, wave number, breaking probability and wave energy
///   sources.
/// - **Reconstruction**: Superbee limiter and MUSCL edge states.
/// - **Transect / Accretion**: a cross-shore client system and organic matter accretion
///   models, including the stateful mangrove stand model.
pub mod traits;
