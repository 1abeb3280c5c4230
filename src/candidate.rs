use itertools::Itertools;
use log::{debug, error};
use std::collections::HashMap;

use gnss::prelude::SV;
use hifitime::Epoch;

use crate::{
    apriori::AprioriPosition,
    cfg::Config,
    ephemeris::{nearest_in_time, Ephemeris},
    observation::Observation,
    orbit::Orbit,
    solver::Error,
};

/// A 3D + time resolution requires at least 4 SV in sight
pub(crate) const MIN_SV_REQUIRED: usize = 4;

/// SV candidate to the resolution attempt: one code range
/// paired to the broadcast record selected for this epoch.
#[derive(Debug)]
pub(crate) struct Candidate<'a, E: Ephemeris> {
    /// Satellite Vehicle
    pub(crate) sv: SV,
    /// Measured code range [m]
    pub(crate) pseudorange_m: f64,
    /// Selected record: nearest in time among all records this SV published
    pub(crate) eph: &'a E,
}

/// Forms the SV working set for one epoch.
/// Only signal availability and broadcast data are considered, unless a
/// reference position is known: then SV below the configured elevation
/// mask are discarded too. Insertion order is preserved.
pub(crate) fn form_pool<'a, E: Ephemeris>(
    cfg: &Config,
    epoch: Epoch,
    observations: &[Observation],
    ephemerides: &'a HashMap<SV, Vec<E>>,
    reference: Option<&AprioriPosition>,
) -> Result<Vec<Candidate<'a, E>>, Error> {
    let mut pool = Vec::<Candidate<'a, E>>::with_capacity(observations.len());

    for obs in observations
        .iter()
        .filter(|obs| obs.epoch == epoch)
        .filter(|obs| obs.sv.constellation == cfg.constellation)
        .filter(|obs| obs.frequency_hz == cfg.signal_frequency_hz)
        .filter(|obs| obs.pseudorange_m > 0.0)
        .unique_by(|obs| obs.sv)
    {
        if let Some(min_snr) = cfg.min_snr_db {
            if obs.snr_db.unwrap_or(-200.0) < min_snr {
                debug!("{:?} ({}) - below snr criteria", epoch, obs.sv);
                continue;
            }
        }

        let records = ephemerides.get(&obs.sv).map(|r| r.as_slice()).unwrap_or(&[]);
        let eph = match nearest_in_time(epoch, records) {
            Ok(eph) => eph,
            Err(_) => {
                error!("{:?} ({}) - no broadcast record available", epoch, obs.sv);
                continue;
            },
        };

        if let Some(reference) = reference {
            let position = eph.position(epoch);
            let orbit = Orbit::new(obs.sv, epoch, (position[0], position[1], position[2]), reference);
            if orbit.elevation < cfg.elevation_mask_deg {
                debug!(
                    "{:?} ({}) - excluded: elevation {:.2}° (azimuth {:.1}°) below mask",
                    orbit.epoch, orbit.sv, orbit.elevation, orbit.azimuth
                );
                continue;
            }
        }

        pool.push(Candidate {
            sv: obs.sv,
            pseudorange_m: obs.pseudorange_m,
            eph,
        });
    }

    if pool.len() < MIN_SV_REQUIRED {
        debug!(
            "{:?} - too few candidates: {}/{}",
            epoch,
            pool.len(),
            MIN_SV_REQUIRED
        );
        return Err(Error::InsufficientSatellites);
    }
    Ok(pool)
}
