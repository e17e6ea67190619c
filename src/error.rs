use crate::timetable::{Minutes, StationId};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Arrival time {0} is outside the packable range.")]
    ArrivalOutOfRange(Minutes),
    #[error("Departure time {0} is outside the packable range.")]
    DepartureOutOfRange(Minutes),
    #[error("Change count {0} does not fit in the criteria.")]
    TooManyChanges(u32),
    #[error("Criteria carry no departure time.")]
    MissingDeparture,
    #[error("Criteria are incomparable: only one of them carries a departure time.")]
    IncomparableCriteria,
    #[error("Departure time 0 is ambiguous when neither frontier carries departure times.")]
    AmbiguousDeparture,
    #[error("No criteria arriving at {arrival_mins} with {changes} changes.")]
    CriteriaNotFound { arrival_mins: Minutes, changes: u32 },
    #[error("No transfer from station {from} to station {to}.")]
    NoTransfer { from: StationId, to: StationId },
    #[error("Index {index} is out of range for {len} {kind}.")]
    IndexOutOfRange { kind: &'static str, index: usize, len: usize },
    #[error("Values ({0}, {1}) do not fit in 24 + 8 bits.")]
    BitsOutOfRange(u32, u32),
    #[error("Range [{start}, {end}) cannot be packed.")]
    InvalidRange { start: usize, end: usize },
    #[error("Coordinates ({longitude}, {latitude}) are out of range.")]
    InvalidCoordinates { longitude: f64, latitude: f64 },
    #[error("Invalid leg: {0}.")]
    InvalidLeg(&'static str),
    #[error("Invalid journey: {0}.")]
    InvalidJourney(&'static str),
    #[error("Station {0:?} not found.")]
    StationNotFound(String),
    #[error(transparent)]
    Gtfs(#[from] gtfs_structures::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
