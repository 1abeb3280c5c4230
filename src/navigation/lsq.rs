use nalgebra::{Cholesky, Matrix4, Vector4};

use crate::{navigation::Navigation, solver::Error};

// Relative pivot floor: below this, GᵀG is numerically rank deficient
// (SV nearly coplanar with the estimate) and the correction is garbage.
const PIVOT_FLOOR: f64 = 1.0E-7;

/// One normal equations resolution
#[derive(Debug, Clone)]
pub(crate) struct Estimate {
    /// Correction: dx, dy, dz [m] and receiver clock term
    pub(crate) x: Vector4<f64>,
    /// (GᵀG)⁻¹, for the covariance / DOP report
    pub(crate) q: Matrix4<f64>,
}

/// Resolves x̂ = (GᵀG)⁻¹ Gᵀ y, through a Cholesky factorization of GᵀG
/// rather than the explicit inverse, for conditioning robustness.
pub(crate) fn resolve(nav: &Navigation) -> Result<Estimate, Error> {
    let g_prime = nav.g.transpose();
    let gtg: Matrix4<f64> = &g_prime * &nav.g;
    let gty: Vector4<f64> = &g_prime * &nav.y;

    let diagonal = gtg.diagonal();
    let cholesky = Cholesky::new(gtg).ok_or(Error::SingularGeometry)?;

    // each pivot is compared to its own column scale: the clock column
    // sits many orders of magnitude above the line of sight columns
    let l = cholesky.l();
    for i in 0..4 {
        if l[(i, i)].abs() <= diagonal[i].sqrt() * PIVOT_FLOOR {
            return Err(Error::SingularGeometry);
        }
    }

    Ok(Estimate {
        x: cholesky.solve(&gty),
        q: cholesky.inverse(),
    })
}

#[cfg(test)]
mod test {
    use super::resolve;
    use crate::{navigation::Navigation, solver::Error};

    #[test]
    fn well_conditioned_system() {
        let mut nav = Navigation::new(4);
        // four spread unit vectors, pure 100 m range error
        nav.load(0, (1.0, 0.0, 0.0), 100.0);
        nav.load(1, (0.0, 1.0, 0.0), 100.0);
        nav.load(2, (0.0, 0.0, 1.0), 100.0);
        nav.load(3, (-0.577, -0.577, -0.577), 100.0);
        let estimate = resolve(&nav).unwrap();
        assert!(estimate.x.iter().all(|x| x.is_finite()));
        assert!(estimate.q.iter().all(|q| q.is_finite()));
    }

    #[test]
    fn rank_deficient_system() {
        let mut nav = Navigation::new(4);
        // all lines of sight confined to the x/z plane
        for (row, (x, z)) in [(0.2, 0.98), (0.5, 0.87), (0.8, 0.6), (0.95, 0.31)]
            .into_iter()
            .enumerate()
        {
            nav.load(row, (x, 0.0, z), 1.0);
        }
        assert_eq!(resolve(&nav).err(), Some(Error::SingularGeometry));
    }
}
