use log::LevelFilter;
use map_3d::{deg2rad, ecef2geodetic, Ellipsoid};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Once;

use crate::candidate::form_pool;
use crate::prelude::*;

static INIT: Once = Once::new();

fn init_logger() {
    INIT.call_once(|| {
        env_logger::builder()
            .is_test(true)
            .filter_level(LevelFilter::Debug)
            .init();
    });
}

/// Synthetic broadcast record: SV pinned at a fixed ECEF position,
/// constant clock offset.
struct StaticEphemeris {
    toe: Epoch,
    position: Vector3<f64>,
    clock_offset_s: f64,
}

impl Ephemeris for StaticEphemeris {
    fn toe(&self) -> Epoch {
        self.toe
    }
    fn position(&self, _t: Epoch) -> Vector3<f64> {
        self.position
    }
    fn clock_offset(&self, _t: Epoch) -> Duration {
        Duration::from_seconds(self.clock_offset_s)
    }
}

fn gps(prn: u8) -> SV {
    SV {
        constellation: Constellation::GPS,
        prn,
    }
}

fn epoch() -> Epoch {
    Epoch::from_str("2020-06-25T00:00:00 GPST").unwrap()
}

// surveyed receiver position [m ECEF]
fn receiver() -> Vector3<f64> {
    Vector3::new(3628427.9118, 562059.0936, 5197872.215)
}

const L1_HZ: f64 = 1575.42E6;
const SV_RANGE_M: f64 = 22.0E6;

/// Places an SV `range_m` away from `rx`, seen under given
/// elevation and azimuth angles [°].
fn sv_position(rx: Vector3<f64>, elev_deg: f64, azim_deg: f64, range_m: f64) -> Vector3<f64> {
    let (lat, lon, _) = ecef2geodetic(rx[0], rx[1], rx[2], Ellipsoid::WGS84);
    let (el, az) = (deg2rad(elev_deg), deg2rad(azim_deg));
    let enu = (az.sin() * el.cos(), az.cos() * el.cos(), el.sin());
    let e = Vector3::new(-lon.sin(), lon.cos(), 0.0);
    let n = Vector3::new(
        -lat.sin() * lon.cos(),
        -lat.sin() * lon.sin(),
        lat.cos(),
    );
    let u = Vector3::new(
        lat.cos() * lon.cos(),
        lat.cos() * lon.sin(),
        lat.sin(),
    );
    rx + (e * enu.0 + n * enu.1 + u * enu.2) * range_m
}

/// Builds one epoch of perfect signals: pseudoranges match geometric
/// ranges exactly, null SV clocks.
fn constellation(
    rx: Vector3<f64>,
    sky: &[(f64, f64)], // (elevation, azimuth) [°]
) -> (Vec<Observation>, HashMap<SV, Vec<StaticEphemeris>>) {
    let t = epoch();
    let mut observations = Vec::new();
    let mut ephemerides = HashMap::new();
    for (index, (elev, azim)) in sky.iter().enumerate() {
        let sv = gps(index as u8 + 1);
        let position = sv_position(rx, *elev, *azim, SV_RANGE_M);
        let pseudorange_m = (position - rx).norm();
        observations.push(Observation::new(sv, t, pseudorange_m, L1_HZ, Some(41.0)));
        ephemerides.insert(
            sv,
            vec![StaticEphemeris {
                toe: t,
                position,
                clock_offset_s: 0.0,
            }],
        );
    }
    (observations, ephemerides)
}

/// Perfect signals carry no tropospheric delay
fn test_cfg() -> Config {
    Config {
        modeling: Modeling {
            tropo_delay: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn exact_geometry_recovery() {
    init_logger();
    let rx = receiver();
    let (observations, ephemerides) = constellation(
        rx,
        &[
            (15.0, 30.0),
            (35.0, 100.0),
            (55.0, 170.0),
            (80.0, 240.0),
            (25.0, 310.0),
            (45.0, 10.0),
        ],
    );

    let solver = Solver::new(test_cfg(), None);
    let solution = solver.resolve(epoch(), &observations, &ephemerides).unwrap();

    assert!(solution.converged());
    assert!(solution.iterations <= 10);
    let err = (solution.position - rx).norm();
    assert!(err < 1.0E-6, "position error too large: {:.3E} m", err);
    assert!(
        solution.clock_bias_s.abs() < 1.0E-9,
        "clock bias should be null: {:.3E}",
        solution.clock_bias_s
    );
    assert_eq!(solution.sv.len(), 6);

    // geometry diagnostics are finite and sane
    let dop = solution.dop();
    assert!(dop.gdop.is_finite() && dop.gdop > 0.0);
    assert!(dop.hdop.is_finite() && dop.vdop.is_finite());
}

#[test]
fn insufficient_satellites() {
    init_logger();
    let rx = receiver();
    let (observations, ephemerides) =
        constellation(rx, &[(15.0, 30.0), (35.0, 100.0), (55.0, 170.0)]);

    let solver = Solver::new(test_cfg(), None);
    assert_eq!(
        solver.resolve(epoch(), &observations, &ephemerides).err(),
        Some(Error::InsufficientSatellites),
    );
}

#[test]
fn missing_records_degrade_not_abort() {
    init_logger();
    let rx = receiver();
    let (observations, mut ephemerides) = constellation(
        rx,
        &[
            (15.0, 30.0),
            (35.0, 100.0),
            (55.0, 170.0),
            (80.0, 240.0),
            (25.0, 310.0),
        ],
    );
    // one SV lost its broadcast data: 4 remain, still solvable
    ephemerides.remove(&gps(5));

    let solver = Solver::new(test_cfg(), None);
    let solution = solver.resolve(epoch(), &observations, &ephemerides).unwrap();
    assert!(solution.converged());
    assert_eq!(solution.sv.len(), 4);
    assert!(!solution.sv.contains(&gps(5)));
}

#[test]
fn elevation_masking() {
    init_logger();
    let rx = receiver();
    let sky = [
        (5.0, 45.0), // below a 10° mask
        (30.0, 0.0),
        (50.0, 90.0),
        (70.0, 180.0),
        (85.0, 270.0),
    ];
    let (observations, ephemerides) = constellation(rx, &sky);

    let cfg = Config {
        elevation_mask_deg: 10.0,
        ..test_cfg()
    };
    let apriori = AprioriPosition::from_ecef(rx);

    // with a reference position, the low SV is discarded
    let pool = form_pool(&cfg, epoch(), &observations, &ephemerides, Some(&apriori)).unwrap();
    assert_eq!(pool.len(), 4);
    assert!(pool.iter().all(|cd| cd.sv != gps(1)));

    // masking cannot run without a reference position: all retained
    let pool = form_pool(&cfg, epoch(), &observations, &ephemerides, None).unwrap();
    assert_eq!(pool.len(), 5);
    assert!(pool.iter().any(|cd| cd.sv == gps(1)));

    // end to end, the masked set still resolves
    let solver = Solver::new(cfg, Some(apriori));
    let solution = solver.resolve(epoch(), &observations, &ephemerides).unwrap();
    assert!(solution.converged());
    assert_eq!(solution.sv.len(), 4);
}

#[test]
fn idempotence_near_convergence() {
    init_logger();
    let rx = receiver();
    let (observations, ephemerides) = constellation(
        rx,
        &[
            (15.0, 30.0),
            (35.0, 100.0),
            (55.0, 170.0),
            (80.0, 240.0),
            (25.0, 310.0),
        ],
    );

    let surveyed = Solver::new(test_cfg(), None)
        .resolve(epoch(), &observations, &ephemerides)
        .unwrap();
    assert!(surveyed.converged());

    // feeding the fix back in converges on the very first iteration
    let apriori = AprioriPosition::from_ecef(surveyed.position);
    let refined = Solver::new(test_cfg(), Some(apriori))
        .resolve(epoch(), &observations, &ephemerides)
        .unwrap();
    assert!(refined.converged());
    assert_eq!(refined.iterations, 1);
}

#[test]
fn coplanar_geometry_is_singular() {
    init_logger();
    let rx = receiver();
    // all SV confined to the local East/Up plane through the receiver
    let (observations, ephemerides) = constellation(
        rx,
        &[(20.0, 90.0), (40.0, 90.0), (60.0, 90.0), (80.0, 90.0)],
    );

    let solver = Solver::new(test_cfg(), Some(AprioriPosition::from_ecef(rx)));
    assert_eq!(
        solver.resolve(epoch(), &observations, &ephemerides).err(),
        Some(Error::SingularGeometry),
    );
}

#[test]
fn null_range_is_degenerate() {
    init_logger();
    let rx = receiver();
    let sky = [(20.0, 0.0), (40.0, 90.0), (60.0, 180.0), (80.0, 270.0)];
    let (observations, ephemerides) = constellation(rx, &sky);

    // estimate pinned right onto the first SV
    let apriori = AprioriPosition::from_ecef(sv_position(rx, 20.0, 0.0, SV_RANGE_M));
    let cfg = Config {
        // keep every SV in the pool, whatever this reference sees
        elevation_mask_deg: -91.0,
        ..test_cfg()
    };
    let solver = Solver::new(cfg, Some(apriori));
    assert_eq!(
        solver.resolve(epoch(), &observations, &ephemerides).err(),
        Some(Error::DegenerateGeometry),
    );
}

#[test]
fn exhausted_budget_still_surfaces_estimate() {
    init_logger();
    let rx = receiver();
    let (observations, ephemerides) = constellation(
        rx,
        &[
            (40.0, 30.0),
            (55.0, 100.0),
            (70.0, 170.0),
            (85.0, 240.0),
            (60.0, 310.0),
        ],
    );

    let cfg = Config {
        max_iterations: 1,
        ..test_cfg()
    };
    let solver = Solver::new(cfg, None);
    let solution = solver.resolve(epoch(), &observations, &ephemerides).unwrap();
    // one iteration from the surveying seed cannot converge,
    // yet the last estimate is surfaced and tagged
    assert_eq!(solution.termination, Termination::Exhausted);
    assert!(!solution.converged());
    assert_eq!(solution.iterations, 1);
    assert!(solution.position.iter().all(|x| x.is_finite()));
}

#[test]
fn signal_and_constellation_filters() {
    init_logger();
    let rx = receiver();
    let t = epoch();
    let (mut observations, mut ephemerides) = constellation(
        rx,
        &[
            (15.0, 30.0),
            (35.0, 100.0),
            (55.0, 170.0),
            (80.0, 240.0),
            (25.0, 310.0),
        ],
    );

    // foreign constellation, off carrier, null range, poor SNR: all rejected
    let glo = SV {
        constellation: Constellation::Glonass,
        prn: 7,
    };
    let position = sv_position(rx, 45.0, 200.0, SV_RANGE_M);
    observations.push(Observation::new(glo, t, 2.2E7, L1_HZ, Some(41.0)));
    ephemerides.insert(
        glo,
        vec![StaticEphemeris {
            toe: t,
            position,
            clock_offset_s: 0.0,
        }],
    );
    observations.push(Observation::new(gps(6), t, 2.2E7, 1227.60E6, Some(41.0)));
    observations.push(Observation::new(gps(7), t, 0.0, L1_HZ, Some(41.0)));
    observations.push(Observation::new(gps(8), t, 2.2E7, L1_HZ, Some(12.0)));

    let cfg = Config {
        min_snr_db: Some(30.0),
        ..test_cfg()
    };
    let pool = form_pool(&cfg, t, &observations, &ephemerides, None).unwrap();
    assert_eq!(pool.len(), 5);
    assert!(pool.iter().all(|cd| cd.sv.constellation == Constellation::GPS));
    assert!(pool.iter().all(|cd| cd.sv.prn <= 5));
}

#[test]
fn sv_clock_offset_compensation() {
    init_logger();
    let rx = receiver();
    let t = epoch();
    let sky = [
        (15.0, 30.0),
        (35.0, 100.0),
        (55.0, 170.0),
        (80.0, 240.0),
        (25.0, 310.0),
    ];
    let offset_s = 1.5E-4;
    let mut observations = Vec::new();
    let mut ephemerides = HashMap::new();
    for (index, (elev, azim)) in sky.iter().enumerate() {
        let sv = gps(index as u8 + 1);
        let position = sv_position(rx, *elev, *azim, SV_RANGE_M);
        // a fast SV clock shortens the measured range
        let pseudorange_m = (position - rx).norm() - offset_s * 299_792_458.0;
        observations.push(Observation::new(sv, t, pseudorange_m, L1_HZ, Some(41.0)));
        ephemerides.insert(
            sv,
            vec![StaticEphemeris {
                toe: t,
                position,
                clock_offset_s: offset_s,
            }],
        );
    }

    let solver = Solver::new(test_cfg(), None);
    let solution = solver.resolve(t, &observations, &ephemerides).unwrap();
    assert!(solution.converged());
    let err = (solution.position - rx).norm();
    assert!(err < 1.0E-6, "position error too large: {:.3E} m", err);
}
