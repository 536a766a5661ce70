//! Read-only parameter tables and per-node forcing consumed by the closures.

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};

/// Allometric and drag coefficients of one vegetation category.
///
/// Stem frontal area per unit volume and stem diameter follow power laws of
/// aboveground biomass; the bulk drag coefficient is linear in biomass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VegetationCoefficients {
    pub alpha_a: f64,
    pub beta_a: f64,
    pub alpha_d: f64,
    pub beta_d: f64,
    pub cd0: f64,
    pub scd: f64,
}

impl VegetationCoefficients {
    pub const BARE: Self = Self {
        alpha_a: 0.0,
        beta_a: 0.0,
        alpha_d: 0.0,
        beta_d: 0.0,
        cd0: 0.0,
        scd: 0.0,
    };

    /// Frontal area per unit volume (m-1).
    pub fn frontal_area(&self, biomass: f64) -> f64 {
        self.alpha_a * biomass.max(0.0).powf(self.beta_a)
    }

    /// Stem diameter (m).
    pub fn stem_diameter(&self, biomass: f64) -> f64 {
        self.alpha_d * biomass.max(0.0).powf(self.beta_d)
    }

    /// Bulk drag coefficient, floored at zero for dense stands where a
    /// negative biomass slope would otherwise flip its sign.
    pub fn drag_coefficient(&self, biomass: f64) -> f64 {
        (self.cd0 + self.scd * biomass).max(0.0)
    }
}

/// Vegetation category ids used to index [`ModelParams::vegetation`].
pub mod category {
    pub const BARRIER: usize = 0;
    pub const TIDAL_FLAT: usize = 1;
    pub const SALT_MARSH: usize = 2;
    pub const BRACKISH_MARSH: usize = 3;
    pub const FRESHWATER_MARSH: usize = 4;
    pub const MANGROVE: usize = 5;

    pub fn is_vegetated(id: usize) -> bool {
        (SALT_MARSH..=MANGROVE).contains(&id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    pub vegetation: Vec<VegetationCoefficients>,
    /// Bed drag coefficient Cb of the bare bed.
    pub bed_drag: f64,
    /// Breaker index: maximum wave height as a fraction of depth.
    pub breaker_index: f64,
    /// Wind drag coefficient at 10 m.
    pub wind_drag: f64,
    /// Linear (Phillips) wind input coefficient.
    pub wind_input: f64,
    pub whitecap_rate: f64,
    /// Pierson-Moskowitz integral steepness.
    pub pm_steepness: f64,
    pub whitecap_exponent: f64,
    /// JONSWAP bottom friction coefficient (m2 s-3).
    pub bottom_friction: f64,
    /// Battjes-Janssen dissipation coefficient.
    pub breaking_rate: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        let marsh = VegetationCoefficients {
            alpha_a: 0.55,
            beta_a: 0.40,
            alpha_d: 0.006,
            beta_d: 0.30,
            cd0: 1.1,
            scd: -0.3,
        };
        let mangrove = VegetationCoefficients {
            alpha_a: 0.65,
            beta_a: 0.46,
            alpha_d: 0.05,
            beta_d: 0.20,
            cd0: 1.0,
            scd: 0.0,
        };
        Self {
            vegetation: vec![
                VegetationCoefficients::BARE,
                VegetationCoefficients::BARE,
                marsh,
                marsh,
                marsh,
                mangrove,
            ],
            bed_drag: 2.5e-3,
            breaker_index: 0.78,
            wind_drag: 1.3e-3,
            wind_input: 80.0,
            whitecap_rate: 3.33e-5,
            pm_steepness: 3.02e-3,
            whitecap_exponent: 2.0,
            bottom_friction: 0.038,
            breaking_rate: 1.0,
        }
    }
}

impl ModelParams {
    pub fn vegetation(&self, category: usize) -> Result<&VegetationCoefficients> {
        self.vegetation.get(category).ok_or_else(|| {
            anyhow!(
                "Vegetation category {} has no coefficients ({} categories configured).",
                category,
                self.vegetation.len()
            )
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.bed_drag <= 0.0 {
            bail!("bed_drag must be positive.");
        }
        if self.breaker_index <= 0.0 {
            bail!("breaker_index must be positive.");
        }
        if self.pm_steepness <= 0.0 {
            bail!("pm_steepness must be positive.");
        }
        for (id, veg) in self.vegetation.iter().enumerate() {
            if veg.alpha_a < 0.0 || veg.alpha_d < 0.0 {
                bail!("Vegetation category {} has negative allometric coefficients.", id);
            }
        }
        Ok(())
    }
}

/// Per-node forcing. Every array has one entry per node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forcing {
    /// Wave period (s).
    pub period: Vec<f64>,
    /// Significant wave height (m).
    pub wave_height: Vec<f64>,
    /// Aboveground biomass (kg m-2).
    pub biomass: Vec<f64>,
    /// Depth-averaged current velocity (m s-1).
    pub current: Vec<f64>,
    /// Wind speed at 10 m (m s-1).
    pub wind: Vec<f64>,
    /// Median sediment grain size d50 (m).
    pub grain_size: Vec<f64>,
    pub category: Vec<usize>,
}

impl Forcing {
    /// Zero forcing over bare tidal flat.
    pub fn new(nodes: usize) -> Self {
        Self {
            period: vec![0.0; nodes],
            wave_height: vec![0.0; nodes],
            biomass: vec![0.0; nodes],
            current: vec![0.0; nodes],
            wind: vec![0.0; nodes],
            grain_size: vec![0.0; nodes],
            category: vec![category::TIDAL_FLAT; nodes],
        }
    }

    pub fn len(&self) -> usize {
        self.period.len()
    }

    pub fn is_empty(&self) -> bool {
        self.period.is_empty()
    }

    pub fn validate(&self, nodes: usize) -> Result<()> {
        let lengths = [
            ("period", self.period.len()),
            ("wave_height", self.wave_height.len()),
            ("biomass", self.biomass.len()),
            ("current", self.current.len()),
            ("wind", self.wind.len()),
            ("grain_size", self.grain_size.len()),
            ("category", self.category.len()),
        ];
        for (name, len) in lengths {
            if len != nodes {
                bail!("Forcing field {} has {} entries, expected {}.", name, len, nodes);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_cover_all_categories() {
        let params = ModelParams::default();
        params.validate().expect("defaults should validate");
        for id in 0..=category::MANGROVE {
            assert!(params.vegetation(id).is_ok());
        }
        assert!(params.vegetation(category::MANGROVE + 1).is_err());
    }

    #[test]
    fn bare_coefficients_have_no_frontal_area() {
        let bare = VegetationCoefficients::BARE;
        assert_eq!(bare.frontal_area(2.0), 0.0);
        assert_eq!(bare.stem_diameter(0.0), 0.0);
    }

    #[test]
    fn drag_coefficient_never_turns_negative() {
        let params = ModelParams::default();
        let marsh = params.vegetation(category::SALT_MARSH).unwrap();
        assert!((marsh.drag_coefficient(1.0) - 0.8).abs() < 1e-12);
        assert_eq!(marsh.drag_coefficient(5.0), 0.0);
        assert_eq!(marsh.drag_coefficient(50.0), 0.0);
    }

    #[test]
    fn forcing_length_mismatch_is_reported() {
        let mut forcing = Forcing::new(4);
        forcing.wind.pop();
        let err = forcing.validate(4).expect_err("expected mismatch");
        assert!(format!("{err}").contains("wind"));
    }
}
