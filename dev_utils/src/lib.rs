use std::collections::HashSet;

use chrono::NaiveDate;
use rayon::prelude::*;

use csa::journey::Vehicle;
use csa::network::{Connection, Platform, Route, Station, Transfer, Trip};
use csa::timetable::{Minutes, StationId};
use csa::{utils, Journey, Network, Profile};

// Common data for the integration tests and benchmarks.

pub const CHANGE_MINUTES: Minutes = 3;
pub const MAX_WALK_MINUTES: Minutes = 8;

pub fn get_example_date() -> NaiveDate {
    const { utils::const_unwrap(NaiveDate::from_ymd_opt(2025, 3, 18)) }
}

/// Shape of a generated network.
#[derive(Clone, Debug)]
pub struct RandomNetwork {
    pub seed: u64,
    pub num_stations: usize,
    pub num_trips: usize,
    pub max_hops: usize,
    /// Draw every footpath's minutes from `1..=MAX_WALK_MINUTES` instead of using `CHANGE_MINUTES`.
    pub varied_walks: bool,
}

impl Default for RandomNetwork {
    fn default() -> Self {
        Self { seed: 42, num_stations: 30, num_trips: 60, max_hops: 8, varied_walks: false }
    }
}

impl RandomNetwork {
    /// No two connections leave in the same minute. Footpaths take `CHANGE_MINUTES` unless
    /// `varied_walks` is set.
    pub fn build(&self) -> Network {
        let mut rng = fastrand::Rng::with_seed(self.seed);
        let num_stations = self.num_stations.max(2);

        let stations = (0..num_stations)
            .map(|i| Station::new(&format!("Station {i}"), 7.40 + rng.f64() * 0.1, 46.90 + rng.f64() * 0.1))
            .collect();
        // One platform per station, stop `num_stations + i` belongs to station i.
        let platforms = (0..num_stations).map(|i| Platform::new(&(i % 4 + 1).to_string(), i)).collect();
        let routes = vec![
            Route::new("S1", Vehicle::Train),
            Route::new("10", Vehicle::Bus),
            Route::new("9", Vehicle::Tram),
        ];

        let varied_walks = self.varied_walks;
        let mut walk_minutes = || if varied_walks { rng.i32(1..=MAX_WALK_MINUTES) } else { CHANGE_MINUTES };
        let mut transfers: Vec<Transfer> = (0..num_stations)
            .map(|station| Transfer { dep_station: station, arr_station: station, minutes: walk_minutes() })
            .collect();
        for station in (0..num_stations - 1).step_by(2) {
            transfers.push(Transfer { dep_station: station, arr_station: station + 1, minutes: walk_minutes() });
            transfers.push(Transfer { dep_station: station + 1, arr_station: station, minutes: walk_minutes() });
        }

        let mut network = Network::new(stations, platforms, routes, transfers).unwrap();

        let mut used_departures = HashSet::new();
        let mut trips = Vec::with_capacity(self.num_trips);
        let mut connections = Vec::new();
        for trip in 0..self.num_trips {
            let mut visited: Vec<StationId> = (0..num_stations).collect();
            rng.shuffle(&mut visited);
            visited.truncate(rng.usize(2..=self.max_hops.clamp(1, num_stations - 1) + 1));

            let stops: Vec<usize> =
                visited.iter().map(|&station| if rng.bool() { station } else { num_stations + station }).collect();

            let mut time = rng.i32(300..1200);
            for pair in stops.windows(2) {
                let mut dep_mins = time + rng.i32(0..4);
                while !used_departures.insert(dep_mins) {
                    dep_mins += 1;
                }
                let arr_mins = dep_mins + rng.i32(1..12);
                connections.push(Connection { dep_stop: pair[0], dep_mins, arr_stop: pair[1], arr_mins, trip });
                time = arr_mins;
            }

            let last = visited[visited.len() - 1];
            trips.push(Trip::new(rng.usize(0..3), &format!("Station {last}")));
        }

        network.add_day(get_example_date(), trips, connections).unwrap();
        network
    }
}

pub fn get_example_scenario() -> (Network, NaiveDate, StationId) {
    let network = RandomNetwork { num_stations: 200, num_trips: 150, ..Default::default() }.build();
    (network, get_example_date(), 7)
}

/// Journeys from every station of the profile, reconstructed in parallel.
pub fn journeys_from_every_station(profile: &Profile<'_, Network>) -> Vec<(StationId, csa::Result<Vec<Journey>>)> {
    (0..profile.station_fronts().len())
        .into_par_iter()
        .map(|station| (station, csa::journeys(profile, station)))
        .collect()
}
