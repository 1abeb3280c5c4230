//! Position solver
use log::{debug, error, info};
use std::collections::HashMap;
use thiserror::Error;

use gnss::prelude::SV;
use hifitime::{Duration, Epoch};
use nalgebra::{Matrix4, Vector3, Vector4};

use crate::{
    apriori::AprioriPosition,
    bias::{tropo_delay, TroposphericBias},
    candidate::{form_pool, Candidate},
    cfg::Config,
    constants::SPEED_OF_LIGHT_M_S,
    ephemeris::Ephemeris,
    navigation::{lsq, Navigation},
    observation::Observation,
    orbit::Orbit,
    solutions::{PVTSolution, Termination},
};

/// Resolution errors. All of them are local to one epoch:
/// the caller is free to skip it, retry with another seed,
/// or report data loss, and move on to the next epoch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Fewer than 4 SV qualified for this epoch: no resolution attempt.
    #[error("not enough qualifying satellites")]
    InsufficientSatellites,
    /// An SV provides signal observations but published no broadcast record.
    #[error("no ephemeris available")]
    NoEphemerisAvailable,
    /// Normal equations cannot be factorized: SV geometry is degenerate
    /// or insufficiently diverse (near coplanar).
    #[error("singular geometry: failed to factorize normal equations")]
    SingularGeometry,
    /// Null range between the estimate and one SV position.
    #[error("degenerate geometry: null range")]
    DegenerateGeometry,
    /// Resolved clock component is not a number.
    #[error("resolved time is not a number")]
    TimeIsNan,
}

/// Iteration loop states
#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum State {
    #[default]
    Initializing,
    Iterating,
    Converged,
    Exhausted,
    Failed,
}

/// One Gauss-Newton snapshot. Applying a correction produces a new
/// state: position and clock bias always move as a unit and past
/// snapshots remain valid for inspection.
#[derive(Debug, Clone, Copy)]
struct SolverState {
    /// Current position estimate, ECEF [m]
    position: Vector3<f64>,
    /// Current receiver clock bias estimate [s]
    clock_bias_s: f64,
    /// Iterations spent so far
    iteration: usize,
    /// Norm of the last position correction [m]
    correction_norm_m: f64,
}

impl SolverState {
    /// Initial estimate: the reference position when one is known,
    /// a tiny non null vector otherwise.
    fn seed(apriori: Option<&AprioriPosition>) -> Self {
        let position = match apriori {
            Some(apriori) => apriori.ecef(),
            None => Vector3::new(1.0E-10, 1.0E-10, 1.0E-10),
        };
        Self {
            position,
            clock_bias_s: 0.0,
            iteration: 0,
            correction_norm_m: f64::MAX,
        }
    }
    /// Applies one correction (clock term already in seconds)
    fn apply(&self, x_hat: Vector4<f64>) -> Self {
        let correction = Vector3::new(x_hat[0], x_hat[1], x_hat[2]);
        Self {
            position: self.position + correction,
            clock_bias_s: self.clock_bias_s + x_hat[3],
            iteration: self.iteration + 1,
            correction_norm_m: correction.norm(),
        }
    }
}

/// Single point position solver.
/// One resolution attempt only reads its inputs and owns all of its
/// working state: resolving many epochs concurrently (one [Solver] each,
/// ephemerides shared read-only) requires no synchronization.
#[derive(Debug, Clone)]
pub struct Solver {
    /// Solver configuration
    cfg: Config,
    /// Apriori position, if a past survey provides one
    apriori: Option<AprioriPosition>,
    /// Measured tropospheric components, if any
    tropo_bias: TroposphericBias,
}

impl Solver {
    /// Builds a new position solver from [Config] and, when available,
    /// an [AprioriPosition] to start from. Without one, each resolution
    /// attempt grabs a coarse fix first and refines it.
    pub fn new(cfg: Config, apriori: Option<AprioriPosition>) -> Self {
        Self {
            cfg,
            apriori,
            tropo_bias: TroposphericBias::default(),
        }
    }
    /// Attach measured tropospheric components, preferred over the
    /// internal model whenever provided.
    pub fn with_tropo_components(&self, tropo_bias: TroposphericBias) -> Self {
        let mut s = self.clone();
        s.tropo_bias = tropo_bias;
        s
    }
    /// Try to resolve a [PVTSolution] from one epoch of [Observation]s
    /// and all broadcast records gathered so far, grouped per SV.
    /// Observation epochs and record reference times must share one
    /// timescale (GPST recommended): they are subtracted directly.
    pub fn resolve<E: Ephemeris>(
        &self,
        epoch: Epoch,
        observations: &[Observation],
        ephemerides: &HashMap<SV, Vec<E>>,
    ) -> Result<PVTSolution, Error> {
        match &self.apriori {
            Some(apriori) => {
                let pool = form_pool(&self.cfg, epoch, observations, ephemerides, Some(apriori))?;
                self.gauss_newton(
                    epoch,
                    &pool,
                    Some(apriori),
                    self.cfg.convergence_threshold_m,
                    true,
                )
            },
            None => {
                // surveying: coarse fix first (no masking, no troposphere),
                // then one refined pass seeded with it. Bounded to these
                // two passes, never recursive.
                let pool = form_pool(&self.cfg, epoch, observations, ephemerides, None)?;
                let coarse =
                    self.gauss_newton(epoch, &pool, None, self.cfg.coarse_threshold_m, false)?;
                info!(
                    "{:?} - coarse fix ({:.1}, {:.1}, {:.1}) [m]",
                    epoch, coarse.position[0], coarse.position[1], coarse.position[2],
                );
                let seed = AprioriPosition::from_ecef(coarse.position);
                let pool = form_pool(&self.cfg, epoch, observations, ephemerides, Some(&seed))?;
                self.gauss_newton(
                    epoch,
                    &pool,
                    Some(&seed),
                    self.cfg.convergence_threshold_m,
                    true,
                )
            },
        }
    }
    /// Bounded Gauss-Newton loop over one SV working set.
    fn gauss_newton<E: Ephemeris>(
        &self,
        epoch: Epoch,
        pool: &[Candidate<E>],
        seed: Option<&AprioriPosition>,
        threshold_m: f64,
        tropo: bool,
    ) -> Result<PVTSolution, Error> {
        let mut machine = State::default();
        let mut state = SolverState::seed(seed);
        let mut failure = Error::InsufficientSatellites;
        let mut q = Matrix4::<f64>::zeros();
        // transmission time estimate, compensated a little more
        // at each pass as the clock estimate settles
        let mut t_tx = epoch;

        loop {
            match machine {
                State::Initializing => {
                    debug!(
                        "{:?} - initial estimate ({:.3E}, {:.3E}, {:.3E})",
                        epoch, state.position[0], state.position[1], state.position[2],
                    );
                    machine = State::Iterating;
                },
                State::Iterating => {
                    let estimate = self
                        .design_system(epoch, t_tx, &state, pool, tropo)
                        .and_then(|nav| lsq::resolve(&nav));
                    let estimate = match estimate {
                        Ok(estimate) => estimate,
                        Err(e) => {
                            error!("{:?} - aborting: {}", epoch, e);
                            failure = e;
                            machine = State::Failed;
                            continue;
                        },
                    };

                    let mut x_hat = estimate.x;
                    x_hat[3] /= SPEED_OF_LIGHT_M_S;
                    if x_hat[3].is_nan() {
                        failure = Error::TimeIsNan;
                        machine = State::Failed;
                        continue;
                    }

                    state = state.apply(x_hat);
                    q = estimate.q;
                    debug!(
                        "{:?} - iter {}: correction {:.3E} [m]",
                        epoch, state.iteration, state.correction_norm_m,
                    );

                    if state.correction_norm_m < threshold_m {
                        machine = State::Converged;
                    } else if state.iteration >= self.cfg.max_iterations {
                        machine = State::Exhausted;
                    } else {
                        // SV re-evaluated at corrected transmission time
                        t_tx = epoch + Duration::from_seconds(x_hat[3]);
                    }
                },
                State::Converged | State::Exhausted => {
                    let termination = if machine == State::Converged {
                        Termination::Converged
                    } else {
                        info!(
                            "{:?} - iteration budget exhausted ({} iter)",
                            epoch, state.iteration
                        );
                        Termination::Exhausted
                    };
                    return Ok(PVTSolution {
                        epoch,
                        position: state.position,
                        clock_bias_s: state.clock_bias_s,
                        iterations: state.iteration,
                        termination,
                        sv: pool.iter().map(|cd| cd.sv).collect(),
                        q,
                    });
                },
                State::Failed => {
                    return Err(failure);
                },
            }
        }
    }
    /// Builds the design system for the current estimate:
    /// geometric ranges, unit lines of sight, and residuals with
    /// SV clock and tropospheric corrections folded in.
    fn design_system<E: Ephemeris>(
        &self,
        epoch: Epoch,
        t_tx: Epoch,
        state: &SolverState,
        pool: &[Candidate<E>],
        tropo: bool,
    ) -> Result<Navigation, Error> {
        let mut nav = Navigation::new(pool.len());
        let (x, y, z) = (state.position[0], state.position[1], state.position[2]);
        // geodetic frame of the current estimate, for the troposphere mapping
        let reference = AprioriPosition::from_ecef(state.position);
        // SV clock evaluated at the receiver clock compensated instant
        let t_clk = epoch + Duration::from_seconds(state.clock_bias_s);

        for (row, candidate) in pool.iter().enumerate() {
            let sv_position = candidate.eph.position(t_tx);
            let (sv_x, sv_y, sv_z) = (sv_position[0], sv_position[1], sv_position[2]);

            let rho = ((sv_x - x).powi(2) + (sv_y - y).powi(2) + (sv_z - z).powi(2)).sqrt();
            if !rho.is_normal() {
                error!("{:?} ({}) - null or invalid range", epoch, candidate.sv);
                return Err(Error::DegenerateGeometry);
            }

            let mut residual = candidate.pseudorange_m - rho;

            if self.cfg.modeling.sv_clock_bias {
                let offset = candidate.eph.clock_offset(t_clk);
                residual += offset.to_seconds() * SPEED_OF_LIGHT_M_S;
            }

            if tropo && self.cfg.modeling.tropo_delay {
                let orbit = Orbit::new(candidate.sv, t_tx, (sv_x, sv_y, sv_z), &reference);
                let delay = tropo_delay(
                    self.cfg.tropo_model,
                    &self.tropo_bias,
                    orbit.elevation,
                    reference.altitude_above_sea_m(),
                );
                debug!(
                    "{:?} ({}) - modeled tropo delay {:.3E} [m]",
                    epoch, candidate.sv, delay
                );
                residual -= delay;
            }

            nav.load(
                row,
                ((x - sv_x) / rho, (y - sv_y) / rho, (z - sv_z) / rho),
                residual,
            );
        }
        Ok(nav)
    }
}
