use gnss::prelude::SV;
use hifitime::Epoch;

/// Code range (pseudorange) measurement, sampled from one carrier signal.
/// One SV may contribute several of these per epoch, one per band:
/// the solver retains the measurement sampled on the configured carrier.
#[derive(Debug, Default, Clone)]
pub struct Observation {
    /// SV (signal emitter)
    pub(crate) sv: SV,
    /// Signal sampling Epoch
    pub(crate) epoch: Epoch,
    /// Measured code range [m]
    pub(crate) pseudorange_m: f64,
    /// Carrier frequency [Hz]
    pub(crate) frequency_hz: f64,
    /// Optional (but recommended) SNR in [dB]
    pub(crate) snr_db: Option<f64>,
}

impl Observation {
    /// Builds new [Observation] of one code range measured from one carrier
    /// signal of given frequency. We recommend providing the SNR estimate
    /// (in dB) if that is feasible.
    pub fn new(
        sv: SV,
        epoch: Epoch,
        pseudorange_m: f64,
        frequency_hz: f64,
        snr_db: Option<f64>,
    ) -> Self {
        Self {
            sv,
            epoch,
            pseudorange_m,
            frequency_hz,
            snr_db,
        }
    }
}
