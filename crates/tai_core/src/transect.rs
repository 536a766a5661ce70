//! One-dimensional cross-shore transect: a reference client of the integrator.
//!
//! State columns are depth `h`, discharge `hU` and wave energy density `E`.
//! Interface fluxes are Rusanov fluxes between MUSCL edge states; sources come
//! from the physical closures. The first and last nodes are held fixed.

use crate::closures::breaking::{update_breaking_probability_lookup, BreakingTable};
use crate::closures::roughness::{ground_roughness, update_ground_roughness};
use crate::closures::shear::{update_shear_stress, ShearInputs};
use crate::closures::sources::{
    bottom_friction_rate, depth_breaking_rate, generation_rate, whitecapping_rate, WaveNode,
};
use crate::closures::wave_number::{group_velocity, update_wave_number, wave_number};
use crate::closures::{rms_wave_height, wave_energy};
use crate::constants::G;
use crate::params::{Forcing, ModelParams, VegetationCoefficients};
use crate::reconstruction::muscl_edges;
use crate::traits::StateDerivative;
use anyhow::{bail, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

pub const DEPTH: usize = 0;
pub const DISCHARGE: usize = 1;
pub const ENERGY: usize = 2;
pub const VARIABLES: usize = 3;

/// Depth below which a node is treated as dry.
pub const DEFAULT_MIN_DEPTH: f64 = 1e-3;

/// Conserved variables on one side of an interface.
#[derive(Debug, Clone, Copy)]
struct EdgeState {
    h: f64,
    hu: f64,
    energy: f64,
    group_velocity: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Flux {
    mass: f64,
    momentum: f64,
    energy: f64,
}

/// Derived per-node fields of a transect state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransectDiagnostics {
    pub wave_number: Vec<f64>,
    pub breaking_probability: Vec<f64>,
    pub chezy: Vec<f64>,
    pub shear_stress: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct TransectSystem {
    dx: f64,
    bed: Vec<f64>,
    forcing: Forcing,
    params: ModelParams,
    vegetation: Vec<VegetationCoefficients>,
    table: BreakingTable,
    min_depth: f64,
    // scratch, one entry per node
    wave_numbers: Vec<f64>,
    celerities: Vec<f64>,
}

impl TransectSystem {
    /// `bed` holds the bed elevation of every node; `dx` is the node spacing.
    pub fn new(dx: f64, bed: Vec<f64>, forcing: Forcing, params: ModelParams) -> Result<Self> {
        if !(dx > 0.0) {
            bail!("Node spacing must be positive, got {}.", dx);
        }
        if bed.len() < 3 {
            bail!("A transect needs at least 3 nodes, got {}.", bed.len());
        }
        forcing.validate(bed.len())?;
        params.validate()?;
        let vegetation = forcing
            .category
            .iter()
            .map(|&id| params.vegetation(id).copied())
            .collect::<Result<Vec<_>>>()?;
        let nodes = bed.len();
        Ok(Self {
            dx,
            bed,
            forcing,
            params,
            vegetation,
            table: BreakingTable::new(),
            min_depth: DEFAULT_MIN_DEPTH,
            wave_numbers: vec![0.0; nodes],
            celerities: vec![0.0; nodes],
        })
    }

    pub fn with_min_depth(mut self, min_depth: f64) -> Self {
        self.min_depth = min_depth;
        self
    }

    pub fn nodes(&self) -> usize {
        self.bed.len()
    }

    pub fn forcing(&self) -> &Forcing {
        &self.forcing
    }

    /// Motionless water at `water_level` carrying the forced wave height.
    pub fn still_water_state(&self, water_level: f64) -> DMatrix<f64> {
        let mut state = DMatrix::zeros(self.nodes(), VARIABLES);
        for (i, &zb) in self.bed.iter().enumerate() {
            let h = (water_level - zb).max(0.0);
            state[(i, DEPTH)] = h;
            if h > self.min_depth {
                state[(i, ENERGY)] = wave_energy(self.forcing.wave_height[i]);
            }
        }
        state
    }

    pub fn diagnostics(&self, state: &DMatrix<f64>) -> Result<TransectDiagnostics> {
        if state.shape() != (self.nodes(), VARIABLES) {
            bail!(
                "State has shape {:?}, expected ({}, {}).",
                state.shape(),
                self.nodes(),
                VARIABLES
            );
        }
        let depth: Vec<f64> = state.column(DEPTH).iter().copied().collect();
        let velocity: Vec<f64> = (0..self.nodes())
            .map(|i| self.velocity(state[(i, DEPTH)], state[(i, DISCHARGE)]))
            .collect();
        let hrms: Vec<f64> = state.column(ENERGY).iter().map(|&e| rms_wave_height(e)).collect();

        let wave_number = update_wave_number(&self.forcing.period, &depth)?;
        let breaking_probability =
            update_breaking_probability_lookup(&self.table, &hrms, &depth, &self.params)?;
        let chezy = update_ground_roughness(&self.forcing, &depth, &self.params)?;
        let shear_stress = update_shear_stress(&ShearInputs {
            depth: &depth,
            velocity: &velocity,
            hrms: &hrms,
            wave_number: &wave_number,
            chezy: &chezy,
            period: &self.forcing.period,
            grain_size: &self.forcing.grain_size,
        })?;

        Ok(TransectDiagnostics {
            wave_number,
            breaking_probability,
            chezy,
            shear_stress,
        })
    }

    fn velocity(&self, h: f64, hu: f64) -> f64 {
        if h > self.min_depth {
            hu / h
        } else {
            0.0
        }
    }

    fn edge(&self, table: &DMatrix<f64>, node: usize) -> EdgeState {
        EdgeState {
            h: table[(node, DEPTH)],
            hu: table[(node, DISCHARGE)],
            energy: table[(node, ENERGY)],
            group_velocity: self.celerities[node],
        }
    }

    /// Local Lax-Friedrichs flux between two edge states.
    fn rusanov(&self, left: EdgeState, right: EdgeState) -> Flux {
        if left.h <= self.min_depth && right.h <= self.min_depth {
            return Flux::default();
        }
        let physical = |q: EdgeState| {
            let u = self.velocity(q.h, q.hu);
            let h = q.h.max(0.0);
            let flux = Flux {
                mass: q.hu,
                momentum: q.hu * u + 0.5 * G * h * h,
                energy: q.group_velocity * q.energy,
            };
            let speed = (u.abs() + (G * h).sqrt()).max(q.group_velocity);
            (flux, speed)
        };
        let (f_l, s_l) = physical(left);
        let (f_r, s_r) = physical(right);
        let lambda = s_l.max(s_r);
        Flux {
            mass: 0.5 * (f_l.mass + f_r.mass) - 0.5 * lambda * (right.h - left.h),
            momentum: 0.5 * (f_l.momentum + f_r.momentum) - 0.5 * lambda * (right.hu - left.hu),
            energy: 0.5 * (f_l.energy + f_r.energy) - 0.5 * lambda * (right.energy - left.energy),
        }
    }

    /// Momentum sources (bed slope and Chezy friction) of an interior node.
    fn momentum_source(&self, i: usize, h: f64, u: f64) -> f64 {
        if h <= self.min_depth {
            return 0.0;
        }
        let slope = (self.bed[i + 1] - self.bed[i - 1]) / (2.0 * self.dx);
        let chezy = ground_roughness(
            &self.vegetation[i],
            self.forcing.biomass[i],
            h,
            self.params.bed_drag,
        );
        -G * h * slope - G * u * u.abs() / (chezy * chezy)
    }

    fn energy_source(&self, i: usize, h: f64, energy: f64) -> f64 {
        let node = WaveNode {
            depth: h,
            energy,
            wave_number: self.wave_numbers[i],
            period: self.forcing.period[i],
        };
        let qb = self
            .table
            .breaking_probability(rms_wave_height(energy), self.params.breaker_index * h);
        generation_rate(&node, self.forcing.wind[i], &self.params)
            + whitecapping_rate(&node, &self.params)
            + bottom_friction_rate(&node, &self.params)
            + depth_breaking_rate(&node, qb, &self.params)
    }
}

impl StateDerivative for TransectSystem {
    fn apply(&mut self, state: &DMatrix<f64>, out: &mut DMatrix<f64>) {
        debug_assert_eq!(state.shape(), (self.nodes(), VARIABLES));
        let n = state.nrows();
        out.fill(0.0);

        for i in 0..n {
            let h = state[(i, DEPTH)];
            let period = self.forcing.period[i];
            let k = if h > self.min_depth { wave_number(period, h) } else { 0.0 };
            self.wave_numbers[i] = k;
            self.celerities[i] = group_velocity(k, period, h);
        }

        let (left, right) = muscl_edges(state);
        // fluxes[i] sits between node i and node i + 1
        let fluxes: Vec<Flux> = (0..n - 1)
            .map(|i| self.rusanov(self.edge(&right, i), self.edge(&left, i + 1)))
            .collect();

        for i in 1..n - 1 {
            let h = state[(i, DEPTH)];
            let u = self.velocity(h, state[(i, DISCHARGE)]);
            let energy = state[(i, ENERGY)];
            let (east, west) = (fluxes[i], fluxes[i - 1]);
            out[(i, DEPTH)] = -(east.mass - west.mass) / self.dx;
            out[(i, DISCHARGE)] =
                -(east.momentum - west.momentum) / self.dx + self.momentum_source(i, h, u);
            out[(i, ENERGY)] =
                -(east.energy - west.energy) / self.dx + self.energy_source(i, h, energy);
        }
    }
}
