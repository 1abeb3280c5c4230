#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

extern crate gnss_rs as gnss;

// private modules
mod apriori;
mod bias;
mod candidate;
mod cfg;
mod constants;
mod ephemeris;
mod navigation;
mod observation;
mod orbit;
mod solutions;
mod solver;

// pub export
pub use solver::Error;

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::apriori::AprioriPosition;
    pub use crate::bias::{TropoModel, TroposphericBias};
    pub use crate::cfg::{Config, Modeling};
    pub use crate::ephemeris::{nearest_in_time, Ephemeris};
    pub use crate::observation::Observation;
    pub use crate::solutions::{DilutionOfPrecision, PVTSolution, Termination};
    pub use crate::solver::{Error, Solver};
    // re-export
    pub use gnss::prelude::{Constellation, SV};
    pub use hifitime::{Duration, Epoch, TimeScale};
    pub use nalgebra::Vector3;
}
