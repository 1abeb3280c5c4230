pub(crate) mod lsq;

use nalgebra::{DVector, MatrixXx4};

use crate::constants::SPEED_OF_LIGHT_M_S;

/// Linearized design system: geometry matrix G (N x 4) and
/// observed minus modeled residual vector y (N).
/// Rebuilt from scratch at every iteration.
#[derive(Debug, Clone)]
pub(crate) struct Navigation {
    pub(crate) g: MatrixXx4<f64>,
    pub(crate) y: DVector<f64>,
}

impl Navigation {
    pub(crate) fn new(rows: usize) -> Self {
        Self {
            g: MatrixXx4::<f64>::zeros(rows),
            y: DVector::<f64>::zeros(rows),
        }
    }
    /// Loads one SV contribution: unit line of sight vector
    /// (pointing from SV towards the current estimate) and residual [m].
    /// The 4th column carries the receiver clock term.
    pub(crate) fn load(&mut self, row: usize, los: (f64, f64, f64), residual: f64) {
        self.g[(row, 0)] = los.0;
        self.g[(row, 1)] = los.1;
        self.g[(row, 2)] = los.2;
        self.g[(row, 3)] = SPEED_OF_LIGHT_M_S;
        self.y[row] = residual;
    }
}
