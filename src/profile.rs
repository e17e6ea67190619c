use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::frontier::{ParetoFront, ParetoFrontBuilder};
use crate::timetable::{Indexed, StationId, TimeTable, TripId};

/// The Pareto frontiers of every station towards one destination on one date.
pub struct Profile<'a, T: TimeTable> {
    timetable: &'a T,
    date: NaiveDate,
    arr_station: StationId,
    connections: Arc<T::Connections>,
    trips: Arc<T::Trips>,
    station_fronts: Vec<ParetoFront>,
}

impl<'a, T: TimeTable> Profile<'a, T> {
    pub fn timetable(&self) -> &'a T {
        self.timetable
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn arr_station(&self) -> StationId {
        self.arr_station
    }

    pub fn connections(&self) -> &T::Connections {
        &self.connections
    }

    pub fn trips(&self) -> &T::Trips {
        &self.trips
    }

    pub fn for_station(&self, station: StationId) -> Result<&ParetoFront> {
        self.station_fronts.get(station).ok_or(Error::IndexOutOfRange {
            kind: "stations",
            index: station,
            len: self.station_fronts.len(),
        })
    }

    pub fn station_fronts(&self) -> &[ParetoFront] {
        &self.station_fronts
    }
}

fn slot<'s, B>(slots: &'s [Option<B>], index: usize, kind: &'static str) -> Result<&'s Option<B>> {
    slots.get(index).ok_or(Error::IndexOutOfRange { kind, index, len: slots.len() })
}

fn slot_mut<'s, B>(slots: &'s mut [Option<B>], index: usize, kind: &'static str) -> Result<&'s mut Option<B>> {
    let len = slots.len();
    slots.get_mut(index).ok_or(Error::IndexOutOfRange { kind, index, len })
}

/// Scratch frontiers for stations and trips, filled in while sweeping connections.
pub struct ProfileBuilder<'a, T: TimeTable> {
    timetable: &'a T,
    date: NaiveDate,
    arr_station: StationId,
    connections: Arc<T::Connections>,
    trips: Arc<T::Trips>,
    station_fronts: Vec<Option<ParetoFrontBuilder>>,
    trip_fronts: Vec<Option<ParetoFrontBuilder>>,
}

impl<'a, T: TimeTable> ProfileBuilder<'a, T> {
    pub fn new(timetable: &'a T, date: NaiveDate, arr_station: StationId) -> Self {
        let connections = timetable.connections_for(date);
        let trips = timetable.trips_for(date);
        Self {
            timetable,
            date,
            arr_station,
            connections,
            station_fronts: vec![None; timetable.stations().len()],
            trip_fronts: vec![None; trips.len()],
            trips,
        }
    }

    pub fn timetable(&self) -> &'a T {
        self.timetable
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn arr_station(&self) -> StationId {
        self.arr_station
    }

    pub fn connections(&self) -> Arc<T::Connections> {
        Arc::clone(&self.connections)
    }

    pub fn trips(&self) -> Arc<T::Trips> {
        Arc::clone(&self.trips)
    }

    pub fn for_station(&self, station: StationId) -> Result<Option<&ParetoFrontBuilder>> {
        Ok(slot(&self.station_fronts, station, "stations")?.as_ref())
    }

    pub fn for_station_mut(&mut self, station: StationId) -> Result<Option<&mut ParetoFrontBuilder>> {
        Ok(slot_mut(&mut self.station_fronts, station, "stations")?.as_mut())
    }

    pub fn set_for_station(&mut self, station: StationId, front: ParetoFrontBuilder) -> Result<()> {
        *slot_mut(&mut self.station_fronts, station, "stations")? = Some(front);
        Ok(())
    }

    /// The station's frontier, created empty on first use.
    pub fn station_entry(&mut self, station: StationId) -> Result<&mut ParetoFrontBuilder> {
        Ok(slot_mut(&mut self.station_fronts, station, "stations")?.get_or_insert_with(ParetoFrontBuilder::new))
    }

    pub fn for_trip(&self, trip: TripId) -> Result<Option<&ParetoFrontBuilder>> {
        Ok(slot(&self.trip_fronts, trip, "trips")?.as_ref())
    }

    pub fn for_trip_mut(&mut self, trip: TripId) -> Result<Option<&mut ParetoFrontBuilder>> {
        Ok(slot_mut(&mut self.trip_fronts, trip, "trips")?.as_mut())
    }

    pub fn set_for_trip(&mut self, trip: TripId, front: ParetoFrontBuilder) -> Result<()> {
        *slot_mut(&mut self.trip_fronts, trip, "trips")? = Some(front);
        Ok(())
    }

    pub fn trip_entry(&mut self, trip: TripId) -> Result<&mut ParetoFrontBuilder> {
        Ok(slot_mut(&mut self.trip_fronts, trip, "trips")?.get_or_insert_with(ParetoFrontBuilder::new))
    }

    /// Freezes the station frontiers. Trip frontiers are dropped.
    pub fn build(self) -> Profile<'a, T> {
        let station_fronts = self
            .station_fronts
            .iter()
            .map(|front| front.as_ref().map_or(ParetoFront::EMPTY, ParetoFrontBuilder::build))
            .collect();

        Profile {
            timetable: self.timetable,
            date: self.date,
            arr_station: self.arr_station,
            connections: self.connections,
            trips: self.trips,
            station_fronts,
        }
    }
}
