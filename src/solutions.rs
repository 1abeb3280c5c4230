//! PVT solution and diagnostics
use gnss::prelude::SV;
use hifitime::Epoch;
use map_3d::{ecef2geodetic, Ellipsoid};
use nalgebra::{Matrix3, Matrix4, Vector3};

/// How the iteration loop came to an end.
/// Both variants expose an estimate: it is up to the caller to decide
/// how much to trust an [Termination::Exhausted] one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Termination {
    /// Position correction norm passed below the configured threshold
    Converged,
    /// Iteration budget ran out first: the estimate is the last one
    /// formed and did not formally converge
    Exhausted,
}

/// Position + Time solution, resolved from one epoch of code ranges.
#[derive(Debug, Clone)]
pub struct PVTSolution {
    /// Sampling [Epoch]
    pub epoch: Epoch,
    /// Receiver position, ECEF [m]
    pub position: Vector3<f64>,
    /// Receiver clock bias [s]
    pub clock_bias_s: f64,
    /// Number of Gauss-Newton iterations spent
    pub iterations: usize,
    /// Whether the loop converged or exhausted its budget
    pub termination: Termination,
    /// SVs that contributed to this solution
    pub sv: Vec<SV>,
    /// (GᵀG)⁻¹ of the final iteration
    pub(crate) q: Matrix4<f64>,
}

impl PVTSolution {
    /// True if the loop formally converged
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
    /// (GᵀG)⁻¹ of the final iteration, in ECEF axes [m², m·s mixed units]
    pub fn covariance(&self) -> Matrix4<f64> {
        self.q
    }
    /// Dilution of Precision figures, derived from the final covariance
    /// rotated into the local ENU frame at this solution
    pub fn dop(&self) -> DilutionOfPrecision {
        let (lat_rad, lon_rad, _) = ecef2geodetic(
            self.position[0],
            self.position[1],
            self.position[2],
            Ellipsoid::WGS84,
        );
        DilutionOfPrecision::new(&self.q, lat_rad, lon_rad)
    }
}

/// Scalar figures of merit describing the geometric quality
/// of a [PVTSolution].
#[derive(Debug, Clone, Copy)]
pub struct DilutionOfPrecision {
    /// Geometric DOP
    pub gdop: f64,
    /// Position (3D) DOP
    pub pdop: f64,
    /// Time DOP
    pub tdop: f64,
    /// Horizontal DOP
    pub hdop: f64,
    /// Vertical DOP
    pub vdop: f64,
}

impl DilutionOfPrecision {
    fn q_enu(q: &Matrix4<f64>, lat_rad: f64, lon_rad: f64) -> Matrix3<f64> {
        let r = Matrix3::<f64>::new(
            -lon_rad.sin(),
            -lon_rad.cos() * lat_rad.sin(),
            lat_rad.cos() * lon_rad.cos(),
            lon_rad.cos(),
            -lat_rad.sin() * lon_rad.sin(),
            lat_rad.cos() * lon_rad.sin(),
            0.0_f64,
            lat_rad.cos(),
            lat_rad.sin(),
        );
        let q_3 = q.fixed_view::<3, 3>(0, 0).into_owned();
        r.transpose() * q_3 * r
    }
    pub(crate) fn new(q: &Matrix4<f64>, lat_rad: f64, lon_rad: f64) -> Self {
        let q_enu = Self::q_enu(q, lat_rad, lon_rad);
        Self {
            gdop: q.trace().sqrt(),
            pdop: (q[(0, 0)] + q[(1, 1)] + q[(2, 2)]).sqrt(),
            tdop: q[(3, 3)].sqrt(),
            hdop: (q_enu[(0, 0)] + q_enu[(1, 1)]).sqrt(),
            vdop: q_enu[(2, 2)].sqrt(),
        }
    }
}
