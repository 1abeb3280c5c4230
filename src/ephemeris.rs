use hifitime::{Duration, Epoch};
use nalgebra::Vector3;

use crate::solver::Error;

/// Broadcast navigation record evaluator: implement this on your parsed
/// ephemeris frames. One SV usually publishes several records over a day,
/// each valid around its reference time; the solver picks the closest
/// in time on its own.
///
/// Reference times must share the timescale of the observation epochs
/// (GPST recommended): the solver subtracts them directly.
pub trait Ephemeris {
    /// Reference time of this record (TOE)
    fn toe(&self) -> Epoch;
    /// SV position in ECEF [m] at requested instant.
    /// Requested instants may be offset by the evolving receiver clock
    /// estimate, so this must remain valid slightly around the epoch.
    fn position(&self, t: Epoch) -> Vector3<f64>;
    /// SV onboard clock offset at requested instant
    fn clock_offset(&self, t: Epoch) -> Duration;
}

/// Selects, among all records published by one SV, the one whose
/// reference time is closest to `t`. Ties go to the first record
/// encountered. Empty input: [Error::NoEphemerisAvailable].
pub fn nearest_in_time<E: Ephemeris>(t: Epoch, records: &[E]) -> Result<&E, Error> {
    let mut nearest = Option::<(&E, Duration)>::None;
    for record in records {
        let dt = (t - record.toe()).abs();
        match nearest {
            Some((_, best)) if dt >= best => {},
            _ => nearest = Some((record, dt)),
        }
    }
    nearest
        .map(|(record, _)| record)
        .ok_or(Error::NoEphemerisAvailable)
}
