//! Organic matter accretion: aboveground biomass and organic deposition.
//!
//! Each model updates aboveground biomass in place and turns it into an
//! organic deposition rate. Only vegetated categories inside the model's
//! elevation window are touched; every other node keeps its biomass and gets
//! zero deposition.

use crate::closures::ensure_len;
use crate::constants::{SECONDS_PER_DAY, SECONDS_PER_YEAR};
use crate::params::category;
use anyhow::{anyhow, bail, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Biomass below this is treated as absent.
const BIOMASS_EPSILON: f64 = 1e-6;
/// Phase lag (days) between peak growth and peak biomass.
const GROWTH_PHASE_LAG: f64 = 56.0;
const DAYS_PER_YEAR: f64 = 365.0;

/// Platform and climate state seen by the accretion models.
#[derive(Debug, Clone, Copy)]
pub struct AccretionInputs<'a> {
    /// Platform elevation relative to mean sea level (m).
    pub elevation: &'a [f64],
    /// Platform surface slope (m/m).
    pub slope: &'a [f64],
    pub category: &'a [usize],
    /// Tidal range (m); mean high tide sits at half of it.
    pub tidal_range: f64,
    /// Mean higher high water (m above msl).
    pub high_water: f64,
    /// 1 to 12.
    pub month: u32,
    /// 1 to 365.
    pub day_of_year: u32,
    /// Air temperature (K).
    pub air_temperature: f64,
    /// Time step (s).
    pub timestep: f64,
}

impl<'a> AccretionInputs<'a> {
    pub fn len(&self) -> usize {
        self.elevation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elevation.is_empty()
    }

    pub fn mean_high_tide(&self) -> f64 {
        0.5 * self.tidal_range
    }

    fn validate(&self, biomass: usize) -> Result<()> {
        ensure_len("slope", self.slope.len(), self.len())?;
        ensure_len("category", self.category.len(), self.len())?;
        ensure_len("biomass", biomass, self.len())
    }

    /// Vegetated nodes whose elevation lies in `[0, top]`.
    fn in_window(&self, i: usize, top: f64) -> bool {
        let z = self.elevation[i];
        top > 0.0 && z >= 0.0 && z <= top && category::is_vegetated(self.category[i])
    }
}

pub trait OrganicAccretion {
    /// Updates aboveground biomass (kg m-2) in place.
    ///
    /// Takes `&mut self` so models with per-node history can advance it.
    fn aboveground_biomass(
        &mut self,
        inputs: &AccretionInputs,
        biomass: &mut [f64],
    ) -> Result<()>;

    /// Organic matter deposition rate (kg m-2 s-1).
    fn organic_deposition(&self, inputs: &AccretionInputs, biomass: &[f64]) -> Result<Vec<f64>>;
}

fn coefficient<'c, C>(table: &'c [C], id: usize) -> Result<&'c C> {
    table
        .get(id)
        .ok_or_else(|| anyhow!("No accretion coefficients for vegetation category {}.", id))
}

/// Parabolic biomass-elevation curve `a D + b D^2 + c` of depth below mean high tide.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiomassCurve {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl BiomassCurve {
    pub const NONE: Self = Self { a: 0.0, b: 0.0, c: 0.0 };

    pub fn at(&self, depth_below_high_tide: f64) -> f64 {
        let d = depth_below_high_tide;
        (self.a * d + self.b * d * d + self.c).max(0.0)
    }
}

fn default_curves() -> Vec<BiomassCurve> {
    let marsh = BiomassCurve { a: 3.0, b: -4.0, c: -0.1 };
    vec![BiomassCurve::NONE, BiomassCurve::NONE, marsh, marsh, marsh, marsh]
}

fn parabolic_biomass(
    curves: &[BiomassCurve],
    inputs: &AccretionInputs,
    biomass: &mut [f64],
) -> Result<()> {
    inputs.validate(biomass.len())?;
    let mht = inputs.mean_high_tide();
    for i in 0..inputs.len() {
        if inputs.in_window(i, mht) {
            let curve = coefficient(curves, inputs.category[i])?;
            biomass[i] = curve.at(mht - inputs.elevation[i]);
        }
    }
    Ok(())
}

/// No organic deposition; biomass follows the parabolic curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NullAccretion {
    pub curves: Vec<BiomassCurve>,
}

impl Default for NullAccretion {
    fn default() -> Self {
        Self {
            curves: default_curves(),
        }
    }
}

impl OrganicAccretion for NullAccretion {
    fn aboveground_biomass(
        &mut self,
        inputs: &AccretionInputs,
        biomass: &mut [f64],
    ) -> Result<()> {
        parabolic_biomass(&self.curves, inputs, biomass)
    }

    fn organic_deposition(&self, inputs: &AccretionInputs, biomass: &[f64]) -> Result<Vec<f64>> {
        inputs.validate(biomass.len())?;
        Ok(vec![0.0; inputs.len()])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RootTurnover {
    /// Refractory fraction of root and rhizome biomass.
    pub refractory_fraction: f64,
    /// Root and rhizome turnover time (yr).
    pub turnover_time: f64,
    /// Root:shoot quotient.
    pub root_shoot: f64,
}

/// Morris et al. (2012): parabolic biomass, deposition from root turnover.
///
/// Only vegetated categories deposit. A bare node carrying biomass still gets
/// zero deposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Morris2012 {
    pub curves: Vec<BiomassCurve>,
    pub roots: Vec<RootTurnover>,
}

impl Default for Morris2012 {
    fn default() -> Self {
        let marsh = RootTurnover {
            refractory_fraction: 0.1,
            turnover_time: 1.0,
            root_shoot: 2.0,
        };
        let none = RootTurnover {
            refractory_fraction: 0.0,
            turnover_time: 1.0,
            root_shoot: 0.0,
        };
        Self {
            curves: default_curves(),
            roots: vec![none, none, marsh, marsh, marsh, marsh],
        }
    }
}

impl OrganicAccretion for Morris2012 {
    fn aboveground_biomass(
        &mut self,
        inputs: &AccretionInputs,
        biomass: &mut [f64],
    ) -> Result<()> {
        parabolic_biomass(&self.curves, inputs, biomass)
    }

    fn organic_deposition(&self, inputs: &AccretionInputs, biomass: &[f64]) -> Result<Vec<f64>> {
        inputs.validate(biomass.len())?;
        let mut deposition = vec![0.0; inputs.len()];
        for (i, &b) in biomass.iter().enumerate() {
            if b > 0.0 && category::is_vegetated(inputs.category[i]) {
                let r = coefficient(&self.roots, inputs.category[i])?;
                deposition[i] = r.refractory_fraction * r.root_shoot * b
                    / (r.turnover_time * SECONDS_PER_YEAR);
            }
        }
        Ok(deposition)
    }
}

/// D'Alpaos et al. (2007): seasonal biomass, deposition proportional to biomass.
///
/// Bare categories are skipped by both operations. Inside the elevation window
/// a bare node keeps its biomass rather than being zeroed, and deposits nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DAlpaos2007 {
    /// Peak biomass per category (kg m-2).
    pub max_biomass: Vec<f64>,
    /// Typical organic deposition rate (m yr-1).
    pub reference_rate: f64,
    /// Organic matter density (kg m-3).
    pub organic_density: f64,
    /// Ratio of winter to peak season biomass.
    pub winter_ratio: f64,
    /// Month of peak biomass.
    pub peak_month: f64,
}

impl Default for DAlpaos2007 {
    fn default() -> Self {
        Self {
            max_biomass: vec![0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
            reference_rate: 1e-3,
            organic_density: 1200.0,
            winter_ratio: 0.1,
            peak_month: 7.0,
        }
    }
}

impl OrganicAccretion for DAlpaos2007 {
    fn aboveground_biomass(
        &mut self,
        inputs: &AccretionInputs,
        biomass: &mut [f64],
    ) -> Result<()> {
        inputs.validate(biomass.len())?;
        let mht = inputs.mean_high_tide();
        let season = (PI * f64::from(inputs.month) / 6.0 - self.peak_month * PI / 12.0).sin();
        for i in 0..inputs.len() {
            if !inputs.in_window(i, mht) {
                continue;
            }
            let bmax = *coefficient(&self.max_biomass, inputs.category[i])?;
            let peak = (mht - inputs.elevation[i]) / mht * bmax;
            biomass[i] = 0.5 * peak * (1.0 - self.winter_ratio) * (season + 1.0)
                + self.winter_ratio * peak;
        }
        Ok(())
    }

    fn organic_deposition(&self, inputs: &AccretionInputs, biomass: &[f64]) -> Result<Vec<f64>> {
        inputs.validate(biomass.len())?;
        let mut deposition = vec![0.0; inputs.len()];
        for (i, &b) in biomass.iter().enumerate() {
            if b <= BIOMASS_EPSILON || !category::is_vegetated(inputs.category[i]) {
                continue;
            }
            let bmax = *coefficient(&self.max_biomass, inputs.category[i])?;
            if bmax > 0.0 {
                deposition[i] =
                    self.reference_rate / SECONDS_PER_YEAR * self.organic_density * b / bmax;
            }
        }
        Ok(deposition)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonalGrowth {
    /// Maximum peak season biomass (kg m-2).
    pub max_biomass: f64,
    /// Reference temperature for growth (K).
    pub reference_temperature: f64,
    /// Relative biomass increase per kelvin.
    pub temperature_sensitivity: f64,
    /// Slope of the root:shoot quotient with depth below high water (m-1).
    pub root_shoot_slope: f64,
    /// Root:shoot quotient at high water.
    pub root_shoot_offset: f64,
}

/// Kirwan and Mudd (2012): temperature-dependent seasonal biomass with
/// deposition from aboveground mortality, plus a two-pool soil carbon decay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KirwanMudd2012 {
    pub growth: Vec<SeasonalGrowth>,
    /// Ratio of winter to peak season biomass.
    pub winter_ratio: f64,
    /// Winter growth rate relative to peak biomass (day-1).
    pub winter_growth: f64,
    /// Peak growth rate relative to peak biomass (day-1).
    pub peak_growth: f64,
    /// Day of year of peak biomass.
    pub peak_day: f64,
    /// Decay rate of the labile soil carbon pool (yr-1).
    pub labile_decay: f64,
    /// Decay rate of the refractory soil carbon pool (yr-1).
    pub refractory_decay: f64,
    pub decay_reference_temperature: f64,
    pub decay_temperature_sensitivity: f64,
}

impl Default for KirwanMudd2012 {
    fn default() -> Self {
        let none = SeasonalGrowth {
            max_biomass: 0.0,
            reference_temperature: 293.15,
            temperature_sensitivity: 0.0,
            root_shoot_slope: 0.0,
            root_shoot_offset: 0.0,
        };
        let marsh = SeasonalGrowth {
            max_biomass: 2.5,
            reference_temperature: 293.15,
            temperature_sensitivity: 0.03,
            root_shoot_slope: 0.5,
            root_shoot_offset: 1.5,
        };
        Self {
            growth: vec![none, none, marsh, marsh, marsh, marsh],
            winter_ratio: 0.1,
            winter_growth: 0.0,
            peak_growth: 0.0138,
            peak_day: 250.0,
            labile_decay: 1.0,
            refractory_decay: 5e-4,
            decay_reference_temperature: 293.15,
            decay_temperature_sensitivity: 0.03,
        }
    }
}

impl KirwanMudd2012 {
    fn peak_biomass(&self, g: &SeasonalGrowth, inputs: &AccretionInputs, i: usize) -> f64 {
        let mhhw = inputs.high_water;
        g.max_biomass * (mhhw - inputs.elevation[i]) / mhhw
            * (1.0 + (inputs.air_temperature - g.reference_temperature) * g.temperature_sensitivity)
    }

    fn root_shoot(&self, g: &SeasonalGrowth, inputs: &AccretionInputs, i: usize) -> f64 {
        let depth = inputs.high_water - inputs.elevation[i];
        (g.root_shoot_slope * depth + g.root_shoot_offset).max(0.0)
    }

    /// Belowground biomass (kg m-2) from the depth-dependent root:shoot quotient.
    pub fn belowground_biomass(
        &self,
        inputs: &AccretionInputs,
        biomass: &[f64],
    ) -> Result<Vec<f64>> {
        inputs.validate(biomass.len())?;
        let mut below = vec![0.0; inputs.len()];
        for (i, &b) in biomass.iter().enumerate() {
            if inputs.in_window(i, inputs.high_water) {
                let g = coefficient(&self.growth, inputs.category[i])?;
                below[i] = self.root_shoot(g, inputs, i) * b.max(0.0);
            }
        }
        Ok(below)
    }

    /// Mineralization rate (kg m-2 s-1) of the labile (column 0) and
    /// refractory (column 1) soil carbon pools.
    pub fn soil_carbon_decay(
        &self,
        air_temperature: f64,
        pools: &DMatrix<f64>,
    ) -> Result<DMatrix<f64>> {
        if pools.ncols() != 2 {
            bail!("Soil carbon needs 2 pools per node, got {}.", pools.ncols());
        }
        let warming = air_temperature - self.decay_reference_temperature;
        let factor = 1.0 + warming * self.decay_temperature_sensitivity;
        let rates = [self.labile_decay, self.refractory_decay];
        Ok(DMatrix::from_fn(pools.nrows(), 2, |i, j| {
            factor * rates[j] / SECONDS_PER_YEAR * pools[(i, j)]
        }))
    }
}

impl OrganicAccretion for KirwanMudd2012 {
    fn aboveground_biomass(
        &mut self,
        inputs: &AccretionInputs,
        biomass: &mut [f64],
    ) -> Result<()> {
        inputs.validate(biomass.len())?;
        let day = f64::from(inputs.day_of_year);
        let season = (2.0 * PI * (day - self.peak_day) / DAYS_PER_YEAR).cos();
        for i in 0..inputs.len() {
            if !inputs.in_window(i, inputs.high_water) {
                continue;
            }
            let g = coefficient(&self.growth, inputs.category[i])?;
            let peak = self.peak_biomass(g, inputs, i);
            let winter = self.winter_ratio * peak;
            biomass[i] = (0.5 * (winter + peak + (peak - winter) * season)).max(0.0);
        }
        Ok(())
    }

    /// Deposition is root:shoot times aboveground mortality, where mortality is
    /// growth minus the seasonal change of standing biomass.
    ///
    /// The seasonal decline `pi / 365 * (Bpeak - Bwinter) * sin(..)` is a daily
    /// rate and is divided by the seconds in a day before it is added to the
    /// per-second growth.
    fn organic_deposition(&self, inputs: &AccretionInputs, biomass: &[f64]) -> Result<Vec<f64>> {
        inputs.validate(biomass.len())?;
        let day = f64::from(inputs.day_of_year);
        let growth_phase = 2.0 * PI * (day - self.peak_day + GROWTH_PHASE_LAG) / DAYS_PER_YEAR;
        let biomass_phase = 2.0 * PI * (day - self.peak_day) / DAYS_PER_YEAR;
        let mut deposition = vec![0.0; inputs.len()];
        for i in 0..inputs.len() {
            if !inputs.in_window(i, inputs.high_water) {
                continue;
            }
            let g = coefficient(&self.growth, inputs.category[i])?;
            let peak = self.peak_biomass(g, inputs, i);
            let winter = self.winter_ratio * peak;
            let g_min = self.winter_growth / SECONDS_PER_DAY * peak;
            let g_peak = self.peak_growth / SECONDS_PER_DAY * peak;
            let growth = 0.5 * (g_min + g_peak + (g_peak - g_min) * growth_phase.cos());
            let decline =
                PI / DAYS_PER_YEAR * (peak - winter) * biomass_phase.sin() / SECONDS_PER_DAY;
            let mortality = growth + decline;
            deposition[i] = self.root_shoot(g, inputs, i) * mortality.max(0.0);
        }
        Ok(deposition)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticGrowth {
    /// Intrinsic growth rate (yr-1).
    pub growth_rate: f64,
    /// Carrying capacity (kg m-2).
    pub max_biomass: f64,
    /// Elevation of half-saturated growth (m).
    pub half_saturation: f64,
    /// Senescence mortality (yr-1).
    pub senescence: f64,
    /// Wave damage mortality per unit slope (yr-1).
    pub wave_damage: f64,
}

/// van de Koppel et al. (2005): logistic biomass growth limited by
/// elevation and wave damage; no organic deposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VanDeKoppel2005 {
    pub growth: Vec<LogisticGrowth>,
}

impl Default for VanDeKoppel2005 {
    fn default() -> Self {
        let none = LogisticGrowth {
            growth_rate: 0.0,
            max_biomass: 1.0,
            half_saturation: 1.0,
            senescence: 0.0,
            wave_damage: 0.0,
        };
        let marsh = LogisticGrowth {
            growth_rate: 1.0,
            max_biomass: 1.0,
            half_saturation: 0.1,
            senescence: 0.1,
            wave_damage: 0.2,
        };
        Self {
            growth: vec![none, none, marsh, marsh, marsh, marsh],
        }
    }
}

impl OrganicAccretion for VanDeKoppel2005 {
    /// Crank-Nicolson update of `dB/dt = A B`.
    fn aboveground_biomass(
        &mut self,
        inputs: &AccretionInputs,
        biomass: &mut [f64],
    ) -> Result<()> {
        inputs.validate(biomass.len())?;
        let dt = inputs.timestep / SECONDS_PER_YEAR;
        for i in 0..inputs.len() {
            if !category::is_vegetated(inputs.category[i]) {
                continue;
            }
            let g = coefficient(&self.growth, inputs.category[i])?;
            let z = inputs.elevation[i].max(0.0);
            let rate = g.growth_rate
                * (1.0 - biomass[i] / g.max_biomass)
                * (z / (z + g.half_saturation))
                - g.senescence
                - g.wave_damage * inputs.slope[i];
            biomass[i] = (biomass[i] * (1.0 + rate * dt) / (1.0 - rate * dt)).max(0.0);
        }
        Ok(())
    }

    fn organic_deposition(&self, inputs: &AccretionInputs, biomass: &[f64]) -> Result<Vec<f64>> {
        inputs.validate(biomass.len())?;
        Ok(vec![0.0; inputs.len()])
    }
}

/// Stem growth and allometry of individual mangrove trees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MangroveAllometry {
    /// Stem diameter growth coefficient (cm yr-1).
    pub growth_rate: f64,
    /// Linear coefficient of the height-diameter curve (-).
    pub height_linear: f64,
    /// Quadratic coefficient of the height-diameter curve (cm-1).
    pub height_quadratic: f64,
    /// Maximum stem diameter (cm).
    pub max_diameter: f64,
    /// Maximum tree height (cm).
    pub max_height: f64,
    /// Diameter (cm) given to every tree when the node state is first sized.
    pub sapling_diameter: f64,
}

impl MangroveAllometry {
    /// Tree height (cm) from `137 + b2 D - b3 D^2`.
    pub fn height(&self, diameter: f64) -> f64 {
        137.0 + self.height_linear * diameter - self.height_quadratic * diameter * diameter
    }

    /// Diameter growth rate (cm s-1) at inundation factor `inundation`.
    fn diameter_rate(&self, diameter: f64, height: f64, inundation: f64) -> f64 {
        let crowding = 1.0 - diameter * height / (self.max_diameter * self.max_height);
        let denominator = 274.0 + 3.0 * self.height_linear * diameter
            - 4.0 * self.height_quadratic * diameter * diameter;
        if denominator <= 0.0 {
            return 0.0;
        }
        self.growth_rate / SECONDS_PER_YEAR * inundation * diameter * crowding / denominator
    }
}

/// Stand biomass (kg m-2) of trees with stem diameter `diameter` (cm), at a
/// density of `0.5 / D` trees per m2.
fn stand_biomass(diameter: f64, coefficient: f64, exponent: f64) -> f64 {
    if diameter <= 0.0 {
        return 0.0;
    }
    0.5 / diameter * coefficient * diameter.powf(exponent)
}

/// Kakeh et al. (2016): logistic marsh biomass and individual-tree mangrove
/// growth, with deposition proportional to biomass.
///
/// Mangrove nodes carry a stem diameter and height between calls. The state is
/// sized on the first biomass update and must keep that node count afterwards.
/// Every marsh rate is per year, so the multi-species branch is scaled to per
/// second like the salt marsh branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kakeh2016 {
    /// Carrying capacity per category (kg m-2).
    pub max_biomass: Vec<f64>,
    /// Root:shoot quotient per category.
    pub root_shoot: Vec<f64>,
    /// Deposition per unit biomass (m yr-1 m2 kg-1).
    pub deposition_rate: f64,
    /// Organic matter density (kg m-3).
    pub organic_density: f64,
    pub mangrove: MangroveAllometry,
    #[serde(default)]
    diameter: Vec<f64>,
    #[serde(default)]
    height: Vec<f64>,
}

impl Default for Kakeh2016 {
    fn default() -> Self {
        Self {
            max_biomass: vec![0.0, 0.0, 2.5, 2.0, 2.0, 0.0],
            root_shoot: vec![0.0, 0.0, 2.0, 2.0, 2.0, 0.0],
            deposition_rate: 2e-3,
            organic_density: 1200.0,
            mangrove: MangroveAllometry {
                growth_rate: 162.0,
                height_linear: 48.04,
                height_quadratic: 0.172,
                max_diameter: 140.0,
                max_height: 3500.0,
                sapling_diameter: 1.0,
            },
            diameter: Vec::new(),
            height: Vec::new(),
        }
    }
}

impl Kakeh2016 {
    /// Per-node stem diameter (cm); empty before the first biomass update.
    pub fn tree_diameter(&self) -> &[f64] {
        &self.diameter
    }

    /// Per-node tree height (cm).
    pub fn tree_height(&self) -> &[f64] {
        &self.height
    }

    fn ensure_trees(&mut self, nodes: usize) -> Result<()> {
        if self.diameter.is_empty() {
            let sapling = self.mangrove.sapling_diameter.max(0.0);
            self.diameter = vec![sapling; nodes];
            self.height = vec![self.mangrove.height(sapling); nodes];
            return Ok(());
        }
        ensure_len("tree state", self.diameter.len(), nodes)
    }

    /// Crank-Nicolson step of `dB/dt = (r (1 - B / Bmax) - m) B`.
    fn logistic_step(biomass: f64, bmax: f64, growth: f64, mortality: f64, dt: f64) -> f64 {
        let rate = 0.5 * (growth * (1.0 - biomass / bmax) - mortality) * dt;
        ((1.0 + rate) * biomass / (1.0 - rate)).max(0.0)
    }

    /// Belowground biomass (kg m-2): root:shoot times biomass on marshes, and
    /// the root allometry of the stand on mangroves.
    pub fn belowground_biomass(
        &self,
        inputs: &AccretionInputs,
        biomass: &[f64],
    ) -> Result<Vec<f64>> {
        inputs.validate(biomass.len())?;
        let mht = inputs.mean_high_tide();
        let mut below = vec![0.0; inputs.len()];
        for (i, &b) in biomass.iter().enumerate() {
            if !inputs.in_window(i, mht) {
                continue;
            }
            let id = inputs.category[i];
            if id == category::MANGROVE {
                let diameter = self.diameter.get(i).copied().unwrap_or(0.0);
                below[i] = stand_biomass(diameter, 1.28, 1.17);
            } else {
                below[i] = coefficient(&self.root_shoot, id)? * b;
            }
        }
        Ok(below)
    }
}

impl OrganicAccretion for Kakeh2016 {
    fn aboveground_biomass(
        &mut self,
        inputs: &AccretionInputs,
        biomass: &mut [f64],
    ) -> Result<()> {
        inputs.validate(biomass.len())?;
        self.ensure_trees(inputs.len())?;
        let mht = inputs.mean_high_tide();
        let dt = inputs.timestep;
        for i in 0..inputs.len() {
            if !inputs.in_window(i, mht) {
                continue;
            }
            let relative = inputs.elevation[i] / mht;
            let id = inputs.category[i];
            match id {
                category::SALT_MARSH | category::BRACKISH_MARSH | category::FRESHWATER_MARSH => {
                    let bmax = *coefficient(&self.max_biomass, id)?;
                    if bmax <= 0.0 {
                        continue;
                    }
                    let (growth, mortality) = if id == category::SALT_MARSH {
                        (1.0 - 0.5 * relative, 0.5 * relative)
                    } else {
                        (0.5 * (1.0 + relative), 0.5 * (1.0 - relative))
                    };
                    biomass[i] = Self::logistic_step(
                        biomass[i],
                        bmax,
                        growth / SECONDS_PER_YEAR,
                        mortality / SECONDS_PER_YEAR,
                        dt,
                    );
                }
                category::MANGROVE => {
                    let p = 1.0 - relative;
                    let inundation = (4.0 * p - 8.0 * p * p + 0.5).max(0.0);
                    let rate = self
                        .mangrove
                        .diameter_rate(self.diameter[i], self.height[i], inundation);
                    let diameter = (self.diameter[i] + dt * rate).max(0.0);
                    self.diameter[i] = diameter;
                    self.height[i] = self.mangrove.height(diameter);
                    biomass[i] = stand_biomass(diameter, 0.308, 2.11);
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn organic_deposition(&self, inputs: &AccretionInputs, biomass: &[f64]) -> Result<Vec<f64>> {
        inputs.validate(biomass.len())?;
        let rate = self.organic_density * self.deposition_rate / SECONDS_PER_YEAR;
        Ok(biomass.iter().map(|&b| rate * b.max(0.0)).collect())
    }
}

/// Runtime-selected accretion model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AccretionModel {
    Null(NullAccretion),
    Morris2012(Morris2012),
    DAlpaos2007(DAlpaos2007),
    KirwanMudd2012(KirwanMudd2012),
    VanDeKoppel2005(VanDeKoppel2005),
    Kakeh2016(Kakeh2016),
}

impl AccretionModel {
    /// Model with default coefficients from its short name
    /// (`null`, `m12`, `da07`, `km12`, `vdk05`, `k16`).
    pub fn from_name(name: &str) -> Result<Self> {
        let model = match name.to_ascii_lowercase().as_str() {
            "null" => AccretionModel::Null(NullAccretion::default()),
            "m12" => AccretionModel::Morris2012(Morris2012::default()),
            "da07" => AccretionModel::DAlpaos2007(DAlpaos2007::default()),
            "km12" => AccretionModel::KirwanMudd2012(KirwanMudd2012::default()),
            "vdk05" => AccretionModel::VanDeKoppel2005(VanDeKoppel2005::default()),
            "k16" => AccretionModel::Kakeh2016(Kakeh2016::default()),
            other => bail!("Unknown organic accretion model '{}'.", other),
        };
        Ok(model)
    }

    fn inner(&self) -> &dyn OrganicAccretion {
        match self {
            AccretionModel::Null(m) => m,
            AccretionModel::Morris2012(m) => m,
            AccretionModel::DAlpaos2007(m) => m,
            AccretionModel::KirwanMudd2012(m) => m,
            AccretionModel::VanDeKoppel2005(m) => m,
            AccretionModel::Kakeh2016(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn OrganicAccretion {
        match self {
            AccretionModel::Null(m) => m,
            AccretionModel::Morris2012(m) => m,
            AccretionModel::DAlpaos2007(m) => m,
            AccretionModel::KirwanMudd2012(m) => m,
            AccretionModel::VanDeKoppel2005(m) => m,
            AccretionModel::Kakeh2016(m) => m,
        }
    }
}

impl OrganicAccretion for AccretionModel {
    fn aboveground_biomass(
        &mut self,
        inputs: &AccretionInputs,
        biomass: &mut [f64],
    ) -> Result<()> {
        self.inner_mut().aboveground_biomass(inputs, biomass)
    }

    fn organic_deposition(&self, inputs: &AccretionInputs, biomass: &[f64]) -> Result<Vec<f64>> {
        self.inner().organic_deposition(inputs, biomass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ELEVATION: [f64; 6] = [0.1, 0.1, 0.1, 0.3, -0.2, 0.7];
    const SLOPE: [f64; 6] = [0.0, 0.0, 0.0, 0.01, 0.0, 0.0];
    const CATEGORY: [usize; 6] = [
        category::BARRIER,
        category::TIDAL_FLAT,
        category::SALT_MARSH,
        category::BRACKISH_MARSH,
        category::SALT_MARSH,
        category::MANGROVE,
    ];

    fn inputs() -> AccretionInputs<'static> {
        AccretionInputs {
            elevation: &ELEVATION,
            slope: &SLOPE,
            category: &CATEGORY,
            tidal_range: 1.2,
            high_water: 0.65,
            month: 7,
            day_of_year: 200,
            air_temperature: 298.15,
            timestep: 3600.0,
        }
    }

    fn assert_untouched_outside_window(biomass: &[f64], initial: f64) {
        // bare categories, the submerged node and the node above high tide
        for i in [0, 1, 4, 5] {
            assert_eq!(biomass[i], initial, "node {i}");
        }
    }

    #[test]
    fn null_model_never_deposits() {
        let mut model = NullAccretion::default();
        let mut biomass = vec![0.5; 6];
        model.aboveground_biomass(&inputs(), &mut biomass).unwrap();
        assert_untouched_outside_window(&biomass, 0.5);
        assert!((biomass[2] - (3.0 * 0.5 - 4.0 * 0.25 - 0.1)).abs() < 1e-12);
        let deposition = model.organic_deposition(&inputs(), &biomass).unwrap();
        assert!(deposition.iter().all(|&d| d == 0.0));
    }

    #[test]
    fn morris_deposition_follows_root_turnover() {
        let mut model = Morris2012::default();
        let mut biomass = vec![0.0; 6];
        model.aboveground_biomass(&inputs(), &mut biomass).unwrap();
        let deposition = model.organic_deposition(&inputs(), &biomass).unwrap();
        let expected = 0.1 * 2.0 * biomass[2] / SECONDS_PER_YEAR;
        assert!((deposition[2] - expected).abs() < 1e-20);
        assert_eq!(deposition[0], 0.0);
        assert_eq!(deposition[4], 0.0);
    }

    #[test]
    fn dalpaos_peaks_in_summer() {
        let mut model = DAlpaos2007::default();
        let mut summer = vec![0.0; 6];
        model.aboveground_biomass(&inputs(), &mut summer).unwrap();
        let winter_inputs = AccretionInputs { month: 1, ..inputs() };
        let mut winter = vec![0.0; 6];
        model.aboveground_biomass(&winter_inputs, &mut winter).unwrap();
        assert!(summer[2] > winter[2]);
        // lower nodes carry more biomass
        assert!(summer[2] > summer[3]);
        let deposition = model.organic_deposition(&inputs(), &summer).unwrap();
        assert!(deposition[2] > deposition[3]);
        assert_eq!(deposition[1], 0.0);
    }

    #[test]
    fn dalpaos_leaves_bare_nodes_alone() {
        let mut model = DAlpaos2007::default();
        let mut biomass = vec![0.4; 6];
        model.aboveground_biomass(&inputs(), &mut biomass).unwrap();
        // nodes 0 and 1 sit inside the window but are bare
        assert_eq!(biomass[0], 0.4);
        assert_eq!(biomass[1], 0.4);
        assert_ne!(biomass[2], 0.4);
        let deposition = model.organic_deposition(&inputs(), &biomass).unwrap();
        assert_eq!(deposition[0], 0.0);
        assert_eq!(deposition[1], 0.0);
    }

    #[test]
    fn kirwan_mudd_mortality_is_per_second() {
        let mut model = KirwanMudd2012::default();
        let mut biomass = vec![0.0; 6];
        model.aboveground_biomass(&inputs(), &mut biomass).unwrap();
        let deposition = model.organic_deposition(&inputs(), &biomass).unwrap();

        let peak = 2.5 * (0.65 - 0.1) / 0.65 * (1.0 + 5.0 * 0.03);
        let root_shoot = 0.5 * (0.65 - 0.1) + 1.5;
        let bound = root_shoot * (0.0138 + PI / DAYS_PER_YEAR) * peak / SECONDS_PER_DAY;
        assert!(deposition[2] > 0.0);
        assert!(deposition[2] <= bound, "{} > {bound}", deposition[2]);
    }

    #[test]
    fn kirwan_mudd_biomass_and_roots() {
        let mut model = KirwanMudd2012::default();
        let mut biomass = vec![0.0; 6];
        model.aboveground_biomass(&inputs(), &mut biomass).unwrap();
        assert!(biomass[2] > 0.0);
        assert_untouched_outside_window(&biomass, 0.0);

        let below = model.belowground_biomass(&inputs(), &biomass).unwrap();
        let quotient = 0.5 * (0.65 - 0.1) + 1.5;
        assert!((below[2] - quotient * biomass[2]).abs() < 1e-12);

        let deposition = model.organic_deposition(&inputs(), &biomass).unwrap();
        assert!(deposition.iter().all(|&d| d >= 0.0 && d.is_finite()));
        assert!(deposition[2] > 0.0);
    }

    #[test]
    fn soil_carbon_decays_per_pool() {
        let model = KirwanMudd2012::default();
        let pools = DMatrix::from_row_slice(2, 2, &[10.0, 40.0, 0.0, 5.0]);
        let decay = model.soil_carbon_decay(293.15, &pools).unwrap();
        assert!((decay[(0, 0)] - 10.0 / SECONDS_PER_YEAR).abs() < 1e-18);
        assert!((decay[(0, 1)] - 40.0 * 5e-4 / SECONDS_PER_YEAR).abs() < 1e-20);
        assert_eq!(decay[(1, 0)], 0.0);
        let warmer = model.soil_carbon_decay(303.15, &pools).unwrap();
        assert!(warmer[(0, 0)] > decay[(0, 0)]);
        assert!(model.soil_carbon_decay(293.15, &DMatrix::zeros(2, 3)).is_err());
    }

    #[test]
    fn van_de_koppel_grows_towards_capacity() {
        let mut model = VanDeKoppel2005::default();
        let mut biomass = vec![0.2; 6];
        let step = AccretionInputs {
            timestep: 30.0 * SECONDS_PER_DAY,
            ..inputs()
        };
        model.aboveground_biomass(&step, &mut biomass).unwrap();
        assert!(biomass[2] > 0.2);
        assert!(biomass[2] < 1.0);
        assert_eq!(biomass[0], 0.2);
        assert_eq!(biomass[1], 0.2);
        assert!(model.organic_deposition(&step, &biomass).unwrap().iter().all(|&d| d == 0.0));
    }

    #[test]
    fn models_are_selected_by_name() {
        for name in ["null", "M12", "da07", "km12", "vdk05", "K16"] {
            let mut model = AccretionModel::from_name(name).expect("known model");
            let mut biomass = vec![0.3; 6];
            model.aboveground_biomass(&inputs(), &mut biomass).unwrap();
            assert_eq!(model.organic_deposition(&inputs(), &biomass).unwrap().len(), 6);
        }
        let err = AccretionModel::from_name("k20").expect_err("not available");
        assert!(format!("{err}").contains("k20"));
    }

    #[test]
    fn length_mismatch_is_reported() {
        let model = Morris2012::default();
        let err = model.organic_deposition(&inputs(), &[0.1; 3]).expect_err("expected mismatch");
        assert!(format!("{err}").contains("biomass"));
    }

    const STAND_ELEVATION: [f64; 4] = [0.1, 0.3, 0.3, 0.3];
    const STAND_CATEGORY: [usize; 4] = [
        category::SALT_MARSH,
        category::BRACKISH_MARSH,
        category::MANGROVE,
        category::TIDAL_FLAT,
    ];

    fn stand_inputs(timestep: f64) -> AccretionInputs<'static> {
        AccretionInputs {
            elevation: &STAND_ELEVATION,
            slope: &[0.0; 4],
            category: &STAND_CATEGORY,
            timestep,
            ..inputs()
        }
    }

    #[test]
    fn kakeh_marshes_follow_logistic_growth() {
        let mut model = Kakeh2016::default();
        let dt = 30.0 * SECONDS_PER_DAY;
        let mut biomass = vec![0.5, 0.5, 0.0, 0.5];
        model.aboveground_biomass(&stand_inputs(dt), &mut biomass).unwrap();

        let relative: f64 = 0.1 / 0.6;
        let growth = (1.0 - 0.5 * relative) / SECONDS_PER_YEAR;
        let mortality = 0.5 * relative / SECONDS_PER_YEAR;
        let half = 0.5 * (growth * (1.0 - 0.5 / 2.5) - mortality) * dt;
        let expected = (1.0 + half) * 0.5 / (1.0 - half);
        assert!((biomass[0] - expected).abs() < 1e-12);
        assert!(biomass[0] > 0.5 && biomass[0] < 2.5);
        assert!(biomass[1] > 0.5 && biomass[1] < 2.0);
        assert_eq!(biomass[3], 0.5);
    }

    #[test]
    fn kakeh_mangroves_grow_from_saplings() {
        let mut model = Kakeh2016::default();
        assert!(model.tree_diameter().is_empty());
        let step = stand_inputs(365.0 * SECONDS_PER_DAY);
        let mut biomass = vec![0.0; 4];
        model.aboveground_biomass(&step, &mut biomass).unwrap();

        let first = model.tree_diameter()[2];
        assert!(first > 1.0);
        assert_eq!(model.tree_height()[2], model.mangrove.height(first));
        let stand = 0.5 / first * 0.308 * first.powf(2.11);
        assert!((biomass[2] - stand).abs() < 1e-12);

        model.aboveground_biomass(&step, &mut biomass).unwrap();
        assert!(model.tree_diameter()[2] > first);
        // the bare node keeps its sapling
        assert_eq!(model.tree_diameter()[3], 1.0);

        let diameter = model.tree_diameter()[2];
        let below = model.belowground_biomass(&step, &biomass).unwrap();
        assert!((below[2] - 0.5 / diameter * 1.28 * diameter.powf(1.17)).abs() < 1e-12);
        assert!((below[0] - 2.0 * biomass[0]).abs() < 1e-12);
        assert_eq!(below[3], 0.0);

        let deposition = model.organic_deposition(&step, &biomass).unwrap();
        let rate = 1200.0 * 2e-3 / SECONDS_PER_YEAR;
        assert!((deposition[2] - rate * biomass[2]).abs() < 1e-18);
    }

    #[test]
    fn kakeh_without_trees_has_no_stand() {
        let mut model = Kakeh2016::default();
        model.mangrove.sapling_diameter = 0.0;
        let step = stand_inputs(365.0 * SECONDS_PER_DAY);
        let mut biomass = vec![0.0; 4];
        model.aboveground_biomass(&step, &mut biomass).unwrap();
        assert_eq!(biomass[2], 0.0);
        assert_eq!(model.tree_diameter()[2], 0.0);
        let below = model.belowground_biomass(&step, &biomass).unwrap();
        assert_eq!(below[2], 0.0);
    }

    #[test]
    fn kakeh_tree_state_keeps_its_node_count() {
        let mut model = Kakeh2016::default();
        let mut biomass = vec![0.0; 4];
        model.aboveground_biomass(&stand_inputs(3600.0), &mut biomass).unwrap();
        let mut wider = vec![0.0; 6];
        let err = model.aboveground_biomass(&inputs(), &mut wider).expect_err("node count changed");
        assert!(format!("{err}").contains("tree state"));
    }
}
