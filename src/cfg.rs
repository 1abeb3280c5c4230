use gnss::prelude::Constellation;

#[cfg(feature = "serde")]
use serde::Deserialize;

use crate::bias::TropoModel;

fn default_constellation() -> Constellation {
    Constellation::GPS
}

fn default_frequency() -> f64 {
    // L1 C/A
    1575.42E6_f64
}

fn default_elevation_mask() -> f64 {
    8.0
}

fn default_threshold() -> f64 {
    1.0
}

fn default_coarse_threshold() -> f64 {
    10.0
}

fn default_max_iter() -> usize {
    10
}

fn default_sv_clock() -> bool {
    true
}

fn default_tropo() -> bool {
    true
}

/// Physical effects compensated by the solver.
/// Turning a model off degrades accuracy accordingly.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct Modeling {
    /// Compensate for SV onboard clock offset
    #[cfg_attr(feature = "serde", serde(default = "default_sv_clock"))]
    pub sv_clock_bias: bool,
    /// Compensate for tropospheric path delay
    #[cfg_attr(feature = "serde", serde(default = "default_tropo"))]
    pub tropo_delay: bool,
}

impl Default for Modeling {
    fn default() -> Self {
        Self {
            sv_clock_bias: default_sv_clock(),
            tropo_delay: default_tropo(),
        }
    }
}

/// Solver configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct Config {
    /// Constellation to navigate with
    #[cfg_attr(feature = "serde", serde(default = "default_constellation"))]
    pub constellation: Constellation,
    /// Carrier signal the code ranges are expected on [Hz]
    #[cfg_attr(feature = "serde", serde(default = "default_frequency"))]
    pub signal_frequency_hz: f64,
    /// Minimal SNR criteria [dB]. Observations that do not advertise
    /// their SNR always pass when this is unset.
    #[cfg_attr(feature = "serde", serde(default))]
    pub min_snr_db: Option<f64>,
    /// Discard SV below this elevation angle [°], whenever a reference
    /// position is known
    #[cfg_attr(feature = "serde", serde(default = "default_elevation_mask"))]
    pub elevation_mask_deg: f64,
    /// Declare convergence once the position correction norm
    /// passes below this value [m]
    #[cfg_attr(feature = "serde", serde(default = "default_threshold"))]
    pub convergence_threshold_m: f64,
    /// Looser threshold [m] used by the initial (surveying) pass,
    /// when no apriori position was provided
    #[cfg_attr(feature = "serde", serde(default = "default_coarse_threshold"))]
    pub coarse_threshold_m: f64,
    /// Iteration budget per resolution attempt
    #[cfg_attr(feature = "serde", serde(default = "default_max_iter"))]
    pub max_iterations: usize,
    /// Modeled effects
    #[cfg_attr(feature = "serde", serde(default))]
    pub modeling: Modeling,
    /// Tropospheric delay model, when no measured components are provided
    #[cfg_attr(feature = "serde", serde(default))]
    pub tropo_model: TropoModel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            constellation: default_constellation(),
            signal_frequency_hz: default_frequency(),
            min_snr_db: None,
            elevation_mask_deg: default_elevation_mask(),
            convergence_threshold_m: default_threshold(),
            coarse_threshold_m: default_coarse_threshold(),
            max_iterations: default_max_iter(),
            modeling: Modeling::default(),
            tropo_model: TropoModel::default(),
        }
    }
}
