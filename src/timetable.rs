//! Read-only access to an indexed timetable.
//!
//! Stop identifiers below the station count are stations; identifiers from the
//! station count upwards are platforms, offset by the station count.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;

use crate::error::Result;
use crate::journey::Vehicle;
use crate::packed::PackedRange;

/// Minutes after midnight of the service date. May be negative or exceed a day.
pub type Minutes = i32;
pub type StationId = usize;
pub type StopId = usize;
pub type RouteId = usize;
pub type TripId = usize;
pub type ConnectionId = usize;
pub type TransferId = usize;

pub trait Indexed {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait Stations: Indexed {
    fn name(&self, id: StationId) -> &str;
    fn longitude(&self, id: StationId) -> f64;
    fn latitude(&self, id: StationId) -> f64;

    /// Exact name lookup.
    fn find(&self, name: &str) -> Option<StationId> {
        (0..self.len()).find(|&id| self.name(id) == name)
    }
}

pub trait Platforms: Indexed {
    fn name(&self, id: usize) -> &str;
    fn station_id(&self, id: usize) -> StationId;
}

pub trait Routes: Indexed {
    fn vehicle(&self, id: RouteId) -> Vehicle;
    fn name(&self, id: RouteId) -> &str;
}

pub trait Transfers: Indexed {
    fn dep_station_id(&self, id: TransferId) -> StationId;
    fn minutes(&self, id: TransferId) -> Minutes;
    /// The transfers whose arrival station is `station`.
    fn arriving_at(&self, station: StationId) -> PackedRange;
    /// Fails with [`crate::Error::NoTransfer`] when no footpath links the two stations.
    fn minutes_between(&self, dep_station: StationId, arr_station: StationId) -> Result<Minutes>;
}

pub trait Trips: Indexed {
    fn route_id(&self, id: TripId) -> RouteId;
    fn destination(&self, id: TripId) -> &str;
}

/// Connections ordered by non-increasing departure time.
pub trait Connections: Indexed {
    fn dep_stop_id(&self, id: ConnectionId) -> StopId;
    fn dep_mins(&self, id: ConnectionId) -> Minutes;
    fn arr_stop_id(&self, id: ConnectionId) -> StopId;
    fn arr_mins(&self, id: ConnectionId) -> Minutes;
    fn trip_id(&self, id: ConnectionId) -> TripId;
    /// Position of the connection within its trip, starting at 0.
    fn trip_pos(&self, id: ConnectionId) -> usize;
    /// The following connection of the same trip, or the trip's first one for its last.
    fn next_connection_id(&self, id: ConnectionId) -> ConnectionId;
}

pub trait TimeTable {
    type Stations: Stations;
    type Platforms: Platforms;
    type Routes: Routes;
    type Transfers: Transfers;
    type Trips: Trips;
    type Connections: Connections;

    fn stations(&self) -> &Self::Stations;
    fn platforms(&self) -> &Self::Platforms;
    fn routes(&self) -> &Self::Routes;
    fn transfers(&self) -> &Self::Transfers;
    fn trips_for(&self, date: NaiveDate) -> Arc<Self::Trips>;
    fn connections_for(&self, date: NaiveDate) -> Arc<Self::Connections>;

    fn is_station_id(&self, stop: StopId) -> bool {
        stop < self.stations().len()
    }

    fn is_platform_id(&self, stop: StopId) -> bool {
        let stations = self.stations().len();
        stop >= stations && stop < stations + self.platforms().len()
    }

    fn station_id(&self, stop: StopId) -> StationId {
        if self.is_station_id(stop) {
            stop
        } else {
            self.platforms().station_id(stop - self.stations().len())
        }
    }

    fn platform_name(&self, stop: StopId) -> Option<&str> {
        if self.is_platform_id(stop) {
            Some(self.platforms().name(stop - self.stations().len()))
        } else {
            None
        }
    }
}

/// Remembers the date-dependent tables of the last date asked for.
pub struct CachedTimeTable<T: TimeTable> {
    underlying: T,
    trips: Mutex<Option<(NaiveDate, Arc<T::Trips>)>>,
    connections: Mutex<Option<(NaiveDate, Arc<T::Connections>)>>,
}

impl<T: TimeTable> CachedTimeTable<T> {
    pub fn new(underlying: T) -> Self {
        Self { underlying, trips: Mutex::new(None), connections: Mutex::new(None) }
    }

    pub fn into_inner(self) -> T {
        self.underlying
    }
}

fn cached<V>(slot: &Mutex<Option<(NaiveDate, Arc<V>)>>, date: NaiveDate, load: impl FnOnce() -> Arc<V>) -> Arc<V> {
    let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
    match &*slot {
        Some((cached_date, value)) if *cached_date == date => Arc::clone(value),
        _ => {
            let value = load();
            *slot = Some((date, Arc::clone(&value)));
            value
        }
    }
}

impl<T: TimeTable> TimeTable for CachedTimeTable<T> {
    type Stations = T::Stations;
    type Platforms = T::Platforms;
    type Routes = T::Routes;
    type Transfers = T::Transfers;
    type Trips = T::Trips;
    type Connections = T::Connections;

    fn stations(&self) -> &Self::Stations {
        self.underlying.stations()
    }

    fn platforms(&self) -> &Self::Platforms {
        self.underlying.platforms()
    }

    fn routes(&self) -> &Self::Routes {
        self.underlying.routes()
    }

    fn transfers(&self) -> &Self::Transfers {
        self.underlying.transfers()
    }

    fn trips_for(&self, date: NaiveDate) -> Arc<Self::Trips> {
        cached(&self.trips, date, || self.underlying.trips_for(date))
    }

    fn connections_for(&self, date: NaiveDate) -> Arc<Self::Connections> {
        cached(&self.connections, date, || self.underlying.connections_for(date))
    }
}
