//! Chezy roughness of vegetated and bare beds.

use super::ensure_len;
use crate::constants::G;
use crate::params::{Forcing, ModelParams, VegetationCoefficients};
use anyhow::Result;

/// Chezy coefficient (m^0.5 s-1) of one node.
///
/// `Cz = Cz0 * sqrt(2 / (cD * asb * h + 2 * (1 - asb * dsb) * Cb))` with
/// `Cz0 = sqrt(G)`. Non-positive depths are evaluated as zero depth, which
/// leaves only the bed term. A stand so dense that the resistance term is not
/// positive falls back to the bare bed value `sqrt(G / Cb)`.
pub fn ground_roughness(
    vegetation: &VegetationCoefficients,
    biomass: f64,
    depth: f64,
    bed_drag: f64,
) -> f64 {
    let asb = vegetation.frontal_area(biomass);
    let dsb = vegetation.stem_diameter(biomass);
    let cd = vegetation.drag_coefficient(biomass);
    let depth = depth.max(0.0);
    let resistance = cd * asb * depth + 2.0 * (1.0 - asb * dsb) * bed_drag;
    if !(resistance > 0.0) {
        return (G / bed_drag).sqrt();
    }
    G.sqrt() * (2.0 / resistance).sqrt()
}

pub fn update_ground_roughness(
    forcing: &Forcing,
    h: &[f64],
    params: &ModelParams,
) -> Result<Vec<f64>> {
    forcing.validate(h.len())?;
    ensure_len("h", h.len(), forcing.len())?;
    h.iter()
        .enumerate()
        .map(|(i, &depth)| {
            let vegetation = params.vegetation(forcing.category[i])?;
            Ok(ground_roughness(
                vegetation,
                forcing.biomass[i],
                depth,
                params.bed_drag,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::category;

    #[test]
    fn bare_bed_reduces_to_bed_drag() {
        let params = ModelParams::default();
        let forcing = Forcing::new(3);
        let cz = update_ground_roughness(&forcing, &[0.5, 2.0, 0.0], &params).expect("valid input");
        let expected = (G / params.bed_drag).sqrt();
        for value in cz {
            assert!((value - expected).abs() < 1e-10);
        }
    }

    #[test]
    fn vegetation_lowers_chezy_with_depth() {
        let params = ModelParams::default();
        let mut forcing = Forcing::new(2);
        forcing.category = vec![category::SALT_MARSH; 2];
        forcing.biomass = vec![1.0; 2];
        let cz = update_ground_roughness(&forcing, &[0.2, 1.0], &params).expect("valid input");
        let bare = (G / params.bed_drag).sqrt();
        assert!(cz[0] < bare);
        assert!(cz[1] < cz[0]);

        let veg = params.vegetation(category::SALT_MARSH).unwrap();
        let asb = 0.55;
        let dsb = 0.006;
        let cd = 0.8;
        let resistance = cd * asb * 1.0 + 2.0 * (1.0 - asb * dsb) * params.bed_drag;
        let expected = G.sqrt() * (2.0 / resistance).sqrt();
        assert!((ground_roughness(veg, 1.0, 1.0, params.bed_drag) - expected).abs() < 1e-12);
    }

    #[test]
    fn dry_nodes_use_bed_term_only() {
        let params = ModelParams::default();
        let veg = params.vegetation(category::MANGROVE).unwrap();
        let dry = ground_roughness(veg, 2.0, -0.5, params.bed_drag);
        let zero = ground_roughness(veg, 2.0, 0.0, params.bed_drag);
        assert_eq!(dry, zero);
        assert!(dry.is_finite());
    }

    #[test]
    fn dense_marsh_stays_finite() {
        let params = ModelParams::default();
        let veg = params.vegetation(category::SALT_MARSH).unwrap();
        for biomass in [3.0, 5.0, 20.0, 1e4] {
            let cz = ground_roughness(veg, biomass, 2.0, params.bed_drag);
            assert!(cz.is_finite() && cz > 0.0, "biomass {biomass}: {cz}");
        }
        // no drag left at B = 5, so only the stem-blocked bed term remains
        let asb = veg.frontal_area(5.0);
        let dsb = veg.stem_diameter(5.0);
        let expected = (G / ((1.0 - asb * dsb) * params.bed_drag)).sqrt();
        assert!((ground_roughness(veg, 5.0, 2.0, params.bed_drag) - expected).abs() < 1e-9);
    }

    #[test]
    fn blocked_bed_falls_back_to_bare_value() {
        let veg = VegetationCoefficients {
            alpha_a: 10.0,
            beta_a: 0.0,
            alpha_d: 0.5,
            beta_d: 0.0,
            cd0: 0.0,
            scd: 0.0,
        };
        let cz = ground_roughness(&veg, 1.0, 1.0, 2.5e-3);
        assert!((cz - (G / 2.5e-3).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn unknown_category_is_an_error() {
        let params = ModelParams::default();
        let mut forcing = Forcing::new(1);
        forcing.category[0] = 42;
        assert!(update_ground_roughness(&forcing, &[1.0], &params).is_err());
    }
}
