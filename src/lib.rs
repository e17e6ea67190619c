pub mod error;

pub use error::{Error, Result};

pub mod packed;

pub mod criteria;

pub use criteria::PackedCriteria;

pub mod frontier;

pub use frontier::{ParetoFront, ParetoFrontBuilder};

pub mod timetable;

pub use timetable::{CachedTimeTable, TimeTable};

pub mod network;

pub use network::{Network, NetworkConfig};

pub mod profile;

pub use profile::{Profile, ProfileBuilder};

pub mod csa;

pub use csa::csa_profile;

pub mod journey;

pub use journey::{Journey, Leg, Stop, Vehicle};

pub mod extract;

pub use extract::journeys;

pub mod utils;
