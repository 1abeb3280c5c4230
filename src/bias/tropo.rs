use map_3d::deg2rad;

#[cfg(feature = "serde")]
use serde::Deserialize;

/// Tropospheric delay models
#[derive(Default, Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub enum TropoModel {
    #[default]
    Niel,
}

/// Measured Tropospheric components, to attach to a resolution attempt.
/// Fill as much as you can: measured components (from meteo sensors or
/// gridded products) are always preferred over the internal model.
/// An empty structure makes the solver fall back to [TropoModel].
#[derive(Default, Debug, Copy, Clone)]
pub struct TroposphericBias {
    /// Undifferentiated total Zenith delay (Dry + Wet components), in meters of delay
    pub total: Option<f64>,
    /// Zenith Wet and Zenith Dry delay components, in meters of delay
    pub zwd_zdd: Option<(f64, f64)>,
}

impl TroposphericBias {
    /// Measured slant delay [m], if any zenith component was provided
    fn slant_delay(&self, elevation_deg: f64) -> Option<f64> {
        if let Some((zwd, zdd)) = self.zwd_zdd {
            Some((zdd + zwd) * mapping(elevation_deg))
        } else {
            self.total.map(|total| total * mapping(elevation_deg))
        }
    }
}

// zenith to slant mapping function
fn mapping(elevation_deg: f64) -> f64 {
    1.001_f64 / (0.002001_f64 + deg2rad(elevation_deg).sin().powi(2)).sqrt()
}

fn niel_model(elevation_deg: f64, altitude_above_sea_m: f64) -> f64 {
    const NS: f64 = 324.8;

    let elev_rad = deg2rad(elevation_deg);
    let h_km = altitude_above_sea_m / 1000.0;

    let f = if elevation_deg < 90.0 {
        1.0_f64 / (elev_rad.sin() + 0.00143 / (elev_rad.tan() + 0.0455))
    } else {
        1.0_f64
    };

    let delta_n = -7.32 * (0.005577 * NS).exp();

    let delta_r =
        (NS + 0.5 * delta_n - NS * h_km - 0.5 * delta_n * h_km.powi(2) + 1430.0 + 732.0) * 0.001;

    f * delta_r
}

/// Slant tropospheric delay [m] at given elevation [°], from measured
/// components when available, modeled otherwise.
pub(crate) fn tropo_delay(
    model: TropoModel,
    bias: &TroposphericBias,
    elevation_deg: f64,
    altitude_above_sea_m: f64,
) -> f64 {
    if let Some(measured) = bias.slant_delay(elevation_deg) {
        measured
    } else {
        match model {
            TropoModel::Niel => niel_model(elevation_deg, altitude_above_sea_m),
        }
    }
}
