//! Environmental signal delays
mod tropo;

pub(crate) use tropo::tropo_delay;
pub use tropo::{TropoModel, TroposphericBias};
