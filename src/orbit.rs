use gnss::prelude::SV;
use hifitime::Epoch;
use map_3d::rad2deg;
use std::f64::consts::PI;

use crate::prelude::AprioriPosition;

/// SV state snapshot: ECEF position and attitude angles
/// as seen from a reference position on ground.
#[derive(Debug, Clone)]
pub(crate) struct Orbit {
    /// Satellite Vehicle
    pub(crate) sv: SV,
    /// Instant of this State snapshot
    pub(crate) epoch: Epoch,
    /// ECEF position [m]
    pub(crate) position: (f64, f64, f64),
    /// Azimuth angle [°]
    pub(crate) azimuth: f64,
    /// Elevation angle [°]
    pub(crate) elevation: f64,
}

impl Orbit {
    /// Computes Elevation and Azimuth angles between given position
    /// in the Sky and reference position on ground.
    fn elevation_azimuth(position: (f64, f64, f64), reference: &AprioriPosition) -> (f64, f64) {
        let (sv_x, sv_y, sv_z) = position;

        let ecef = reference.ecef();
        let (ref_x, ref_y, ref_z) = (ecef[0], ecef[1], ecef[2]);

        let geodetic_rad = reference.geodetic_rad();
        let (ref_lat, ref_lon) = (geodetic_rad[0], geodetic_rad[1]);

        // line of sight unit vector
        let a_i = (sv_x - ref_x, sv_y - ref_y, sv_z - ref_z);
        let norm = (a_i.0.powi(2) + a_i.1.powi(2) + a_i.2.powi(2)).sqrt();
        let a_i = (a_i.0 / norm, a_i.1 / norm, a_i.2 / norm);

        // ECEF to VEN 3x3 transform matrix
        let ecef_to_ven = (
            (
                ref_lat.cos() * ref_lon.cos(),
                ref_lat.cos() * ref_lon.sin(),
                ref_lat.sin(),
            ),
            (-ref_lon.sin(), ref_lon.cos(), 0.0_f64),
            (
                -ref_lat.sin() * ref_lon.cos(),
                -ref_lat.sin() * ref_lon.sin(),
                ref_lat.cos(),
            ),
        );
        // ECEF to VEN transform
        let ven = (
            ecef_to_ven.0 .0 * a_i.0 + ecef_to_ven.0 .1 * a_i.1 + ecef_to_ven.0 .2 * a_i.2,
            ecef_to_ven.1 .0 * a_i.0 + ecef_to_ven.1 .1 * a_i.1 + ecef_to_ven.1 .2 * a_i.2,
            ecef_to_ven.2 .0 * a_i.0 + ecef_to_ven.2 .1 * a_i.1 + ecef_to_ven.2 .2 * a_i.2,
        );
        let el = rad2deg(PI / 2.0 - ven.0.acos());
        let mut az = rad2deg(ven.1.atan2(ven.2));
        if az < 0.0 {
            az += 360.0;
        }
        (el, az)
    }
    /// Builds Self from given ECEF position [m], angles evaluated
    /// against the given reference
    pub(crate) fn new(
        sv: SV,
        epoch: Epoch,
        position: (f64, f64, f64),
        reference: &AprioriPosition,
    ) -> Self {
        let (elevation, azimuth) = Self::elevation_azimuth(position, reference);
        Self {
            sv,
            epoch,
            position,
            azimuth,
            elevation,
        }
    }
}
