use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use gtfs_structures::{Gtfs, LocationType, RouteType};
use log::{info, warn};

use crate::criteria::PackedCriteria;
use crate::error::{Error, Result};
use crate::journey::Vehicle;
use crate::packed::PackedRange;
use crate::timetable::{
    ConnectionId, Connections, Indexed, Minutes, Platforms, RouteId, Routes, StationId, Stations, StopId,
    TimeTable, TransferId, Transfers, TripId, Trips,
};
use crate::utils;

// A packed range holds at most this many transfers per arrival station.
const MAX_TRANSFERS_PER_STATION: usize = u8::MAX as usize;

const METRES_PER_DEGREE_LATITUDE: f64 = 111_320.0;

/// Parameters for building a network from a GTFS feed.
#[derive(Clone, Debug)]
pub struct NetworkConfig {
    /// Time needed to change vehicles within one station.
    pub min_change_minutes: Minutes,
    /// Stations further apart than this are not linked by a footpath.
    pub max_walk_metres: f64,
    pub walk_metres_per_minute: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { min_change_minutes: 3, max_walk_metres: 400.0, walk_metres_per_minute: 80.0 }
    }
}

#[derive(Clone, Debug)]
pub struct Station {
    pub name: Box<str>,
    pub longitude: f64,
    pub latitude: f64,
}

impl Station {
    pub fn new(name: &str, longitude: f64, latitude: f64) -> Self {
        Self { name: name.into(), longitude, latitude }
    }
}

#[derive(Clone, Debug)]
pub struct Platform {
    pub name: Box<str>,
    pub station: StationId,
}

impl Platform {
    pub fn new(name: &str, station: StationId) -> Self {
        Self { name: name.into(), station }
    }
}

#[derive(Clone, Debug)]
pub struct Route {
    pub name: Box<str>,
    pub vehicle: Vehicle,
}

impl Route {
    pub fn new(name: &str, vehicle: Vehicle) -> Self {
        Self { name: name.into(), vehicle }
    }
}

#[derive(Clone, Debug)]
pub struct Trip {
    pub route: RouteId,
    pub destination: Box<str>,
}

impl Trip {
    pub fn new(route: RouteId, destination: &str) -> Self {
        Self { route, destination: destination.into() }
    }
}

/// A footpath from `dep_station` to `arr_station`.
#[derive(Clone, Copy, Debug)]
pub struct Transfer {
    pub dep_station: StationId,
    pub arr_station: StationId,
    pub minutes: Minutes,
}

/// One non-stop hop of a trip.
#[derive(Clone, Copy, Debug)]
pub struct Connection {
    pub dep_stop: StopId,
    pub dep_mins: Minutes,
    pub arr_stop: StopId,
    pub arr_mins: Minutes,
    pub trip: TripId,
}

pub struct StationTable(Vec<Station>);

impl Indexed for StationTable {
    fn len(&self) -> usize { self.0.len() }
}

impl Stations for StationTable {
    fn name(&self, id: StationId) -> &str { &self.0[id].name }

    fn longitude(&self, id: StationId) -> f64 { self.0[id].longitude }

    fn latitude(&self, id: StationId) -> f64 { self.0[id].latitude }
}

pub struct PlatformTable(Vec<Platform>);

impl Indexed for PlatformTable {
    fn len(&self) -> usize { self.0.len() }
}

impl Platforms for PlatformTable {
    fn name(&self, id: usize) -> &str { &self.0[id].name }

    fn station_id(&self, id: usize) -> StationId { self.0[id].station }
}

pub struct RouteTable(Vec<Route>);

impl Indexed for RouteTable {
    fn len(&self) -> usize { self.0.len() }
}

impl Routes for RouteTable {
    fn vehicle(&self, id: RouteId) -> Vehicle { self.0[id].vehicle }

    fn name(&self, id: RouteId) -> &str { &self.0[id].name }
}

pub struct TripTable(Vec<Trip>);

impl Indexed for TripTable {
    fn len(&self) -> usize { self.0.len() }
}

impl Trips for TripTable {
    fn route_id(&self, id: TripId) -> RouteId { self.0[id].route }

    fn destination(&self, id: TripId) -> &str { &self.0[id].destination }
}

/// Transfers grouped by arrival station.
pub struct TransferTable {
    transfers: Vec<Transfer>,
    arriving: Vec<PackedRange>,
}

impl TransferTable {
    pub fn new(mut transfers: Vec<Transfer>, num_stations: usize) -> Result<Self> {
        if let Some(transfer) = transfers
            .iter()
            .find(|transfer| transfer.arr_station >= num_stations || transfer.dep_station >= num_stations)
        {
            let index = transfer.arr_station.max(transfer.dep_station);
            return Err(Error::IndexOutOfRange { kind: "stations", index, len: num_stations });
        }

        transfers.sort_by_key(|transfer| transfer.arr_station);

        let mut arriving = Vec::with_capacity(num_stations);
        let mut start = 0;
        for station in 0..num_stations {
            let end = start + transfers[start..].partition_point(|transfer| transfer.arr_station == station);
            arriving.push(PackedRange::new(start, end)?);
            start = end;
        }

        Ok(Self { transfers, arriving })
    }
}

impl Indexed for TransferTable {
    fn len(&self) -> usize { self.transfers.len() }
}

impl Transfers for TransferTable {
    fn dep_station_id(&self, id: TransferId) -> StationId { self.transfers[id].dep_station }

    fn minutes(&self, id: TransferId) -> Minutes { self.transfers[id].minutes }

    fn arriving_at(&self, station: StationId) -> PackedRange { self.arriving[station] }

    fn minutes_between(&self, dep_station: StationId, arr_station: StationId) -> Result<Minutes> {
        self.arriving_at(arr_station)
            .into_iter()
            .find(|&id| self.transfers[id].dep_station == dep_station)
            .map(|id| self.transfers[id].minutes)
            .ok_or(Error::NoTransfer { from: dep_station, to: arr_station })
    }
}

/// Connections sorted by decreasing departure time, with their trip links.
pub struct ConnectionTable {
    connections: Vec<Connection>,
    trip_pos: Vec<usize>,
    next: Vec<ConnectionId>,
}

impl ConnectionTable {
    /// Connections of one trip sharing both departure and arrival minutes must be given in travel order.
    pub fn new(connections: Vec<Connection>) -> Self {
        // Among equal departures the later arrival comes first, then the later input, so
        // that a trip's zero-length hops are still scanned back to front.
        let mut indexed: Vec<(usize, Connection)> = connections.into_iter().enumerate().collect();
        indexed.sort_by(|(i, a), (j, b)| {
            b.dep_mins.cmp(&a.dep_mins).then(b.arr_mins.cmp(&a.arr_mins)).then(j.cmp(i))
        });
        let connections: Vec<Connection> = indexed.into_iter().map(|(_, connection)| connection).collect();

        let num_trips = connections.iter().map(|connection| connection.trip + 1).max().unwrap_or(0);
        let mut trip_pos = vec![0; connections.len()];
        let mut next = vec![0; connections.len()];
        let mut first: Vec<Option<ConnectionId>> = vec![None; num_trips];
        let mut last: Vec<Option<ConnectionId>> = vec![None; num_trips];
        let mut count = vec![0; num_trips];

        // Walking backwards visits every trip in travel order.
        for id in (0..connections.len()).rev() {
            let trip = connections[id].trip;
            trip_pos[id] = count[trip];
            count[trip] += 1;
            match last[trip] {
                Some(previous) => next[previous] = id,
                None => first[trip] = Some(id),
            }
            last[trip] = Some(id);
        }
        for (last, first) in last.into_iter().zip(first) {
            if let (Some(last), Some(first)) = (last, first) {
                next[last] = first;
            }
        }

        Self { connections, trip_pos, next }
    }
}

impl Indexed for ConnectionTable {
    fn len(&self) -> usize { self.connections.len() }
}

impl Connections for ConnectionTable {
    fn dep_stop_id(&self, id: ConnectionId) -> StopId { self.connections[id].dep_stop }

    fn dep_mins(&self, id: ConnectionId) -> Minutes { self.connections[id].dep_mins }

    fn arr_stop_id(&self, id: ConnectionId) -> StopId { self.connections[id].arr_stop }

    fn arr_mins(&self, id: ConnectionId) -> Minutes { self.connections[id].arr_mins }

    fn trip_id(&self, id: ConnectionId) -> TripId { self.connections[id].trip }

    fn trip_pos(&self, id: ConnectionId) -> usize { self.trip_pos[id] }

    fn next_connection_id(&self, id: ConnectionId) -> ConnectionId { self.next[id] }
}

#[derive(Clone)]
struct Day {
    trips: Arc<TripTable>,
    connections: Arc<ConnectionTable>,
}

impl Day {
    fn new(trips: Vec<Trip>, connections: Vec<Connection>) -> Self {
        Self { trips: Arc::new(TripTable(trips)), connections: Arc::new(ConnectionTable::new(connections)) }
    }
}

/// An in-memory timetable holding the service of a set of dates.
pub struct Network {
    stations: StationTable,
    platforms: PlatformTable,
    routes: RouteTable,
    transfers: TransferTable,
    days: HashMap<NaiveDate, Day>,
    no_service: Day,
}

impl Network {
    pub fn new(stations: Vec<Station>, platforms: Vec<Platform>, routes: Vec<Route>, transfers: Vec<Transfer>) -> Result<Self> {
        if let Some(platform) = platforms.iter().find(|platform| platform.station >= stations.len()) {
            return Err(Error::IndexOutOfRange { kind: "stations", index: platform.station, len: stations.len() });
        }
        let transfers = TransferTable::new(transfers, stations.len())?;

        Ok(Self {
            stations: StationTable(stations),
            platforms: PlatformTable(platforms),
            routes: RouteTable(routes),
            transfers,
            days: HashMap::new(),
            no_service: Day::new(Vec::new(), Vec::new()),
        })
    }

    /// Sets the service of `date`, replacing any previous one.
    pub fn add_day(&mut self, date: NaiveDate, trips: Vec<Trip>, connections: Vec<Connection>) -> Result<&mut Self> {
        if let Some(trip) = trips.iter().find(|trip| trip.route >= self.routes.len()) {
            return Err(Error::IndexOutOfRange { kind: "routes", index: trip.route, len: self.routes.len() });
        }
        let num_stops = self.stations.len() + self.platforms.len();
        for connection in &connections {
            if connection.trip >= trips.len() {
                return Err(Error::IndexOutOfRange { kind: "trips", index: connection.trip, len: trips.len() });
            }
            let stop = connection.dep_stop.max(connection.arr_stop);
            if stop >= num_stops {
                return Err(Error::IndexOutOfRange { kind: "stops", index: stop, len: num_stops });
            }
        }

        self.days.insert(date, Day::new(trips, connections));
        Ok(self)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    pub fn log_stats(&self) {
        info!(
            "Network has {} stations, {} platforms, {} routes and {} transfers.",
            self.stations.len(),
            self.platforms.len(),
            self.routes.len(),
            self.transfers.len()
        );
        for (date, day) in &self.days {
            info!("Service on {date}: {} trips, {} connections.", day.trips.len(), day.connections.len());
        }
    }

    /// Builds the network for the given service dates.
    pub fn from_gtfs(gtfs: &Gtfs, dates: &[NaiveDate], config: &NetworkConfig) -> Result<Self> {
        let mut stop_index: HashMap<&str, StopId> = HashMap::with_capacity(gtfs.stops.len());

        // Parentless stops are stations, their child stop points platforms.
        let mut station_ids: Vec<&str> = gtfs
            .stops
            .values()
            .filter(|stop| {
                stop.parent_station.is_none() && matches!(stop.location_type, LocationType::StopPoint | LocationType::StopArea)
            })
            .map(|stop| stop.id.as_str())
            .collect();
        station_ids.sort_unstable();

        let mut stations = Vec::with_capacity(station_ids.len());
        let mut located = Vec::with_capacity(station_ids.len());
        for (i, &id) in station_ids.iter().enumerate() {
            let stop = &gtfs.stops[id];
            stop_index.insert(id, i);
            located.push(stop.longitude.is_some() && stop.latitude.is_some());
            stations.push(Station::new(
                gtfs_stop_name(stop),
                stop.longitude.unwrap_or_default(),
                stop.latitude.unwrap_or_default(),
            ));
        }

        let mut platform_stops: Vec<(&str, StationId, &str)> = gtfs
            .stops
            .values()
            .filter(|stop| matches!(stop.location_type, LocationType::StopPoint))
            .filter_map(|stop| {
                let station = *stop_index.get(stop.parent_station.as_deref()?)?;
                Some((stop.id.as_str(), station, stop.platform_code.as_deref().unwrap_or_default()))
            })
            .collect();
        platform_stops.sort_unstable_by_key(|&(id, _, _)| id);

        let mut platforms = Vec::with_capacity(platform_stops.len());
        for (i, &(id, station, name)) in platform_stops.iter().enumerate() {
            stop_index.insert(id, stations.len() + i);
            platforms.push(Platform::new(name, station));
        }

        let mut route_ids: Vec<&str> = gtfs.routes.keys().map(String::as_str).collect();
        route_ids.sort_unstable();
        let mut route_index = HashMap::with_capacity(route_ids.len());
        let mut routes = Vec::with_capacity(route_ids.len());
        for &id in &route_ids {
            let route = &gtfs.routes[id];
            let name = route
                .short_name
                .as_deref()
                .filter(|name| !name.is_empty())
                .or(route.long_name.as_deref())
                .unwrap_or(id);
            route_index.insert(id, routes.len());
            routes.push(Route::new(name, vehicle_for(&route.route_type)));
        }

        let transfers = footpaths(&stations, &located, config);
        let mut network = Network::new(stations, platforms, routes, transfers)?;

        for &date in dates {
            let mut trip_ids: Vec<&str> = gtfs
                .trips
                .values()
                .filter(|trip| utils::does_trip_run(gtfs, trip, date))
                .map(|trip| trip.id.as_str())
                .collect();
            trip_ids.sort_unstable();

            let mut trips = Vec::with_capacity(trip_ids.len());
            let mut connections = Vec::new();
            for id in trip_ids {
                let trip = &gtfs.trips[id];
                let Some(&route) = route_index.get(trip.route_id.as_str()) else {
                    warn!("Skipping trip {id}: unknown route {}.", trip.route_id);
                    continue;
                };
                let Some(hops) = gtfs_connections(trip, &stop_index, trips.len()) else {
                    warn!("Skipping trip {id}: incomplete or out of range stop times.");
                    continue;
                };

                let destination = trip
                    .trip_headsign
                    .as_deref()
                    .or_else(|| trip.stop_times.last().map(|stop_time| gtfs_stop_name(&stop_time.stop)))
                    .unwrap_or_default();
                trips.push(Trip::new(route, destination));
                connections.extend(hops);
            }
            network.add_day(date, trips, connections)?;
        }

        network.log_stats();
        Ok(network)
    }
}

impl TimeTable for Network {
    type Stations = StationTable;
    type Platforms = PlatformTable;
    type Routes = RouteTable;
    type Transfers = TransferTable;
    type Trips = TripTable;
    type Connections = ConnectionTable;

    fn stations(&self) -> &StationTable { &self.stations }

    fn platforms(&self) -> &PlatformTable { &self.platforms }

    fn routes(&self) -> &RouteTable { &self.routes }

    fn transfers(&self) -> &TransferTable { &self.transfers }

    fn trips_for(&self, date: NaiveDate) -> Arc<TripTable> {
        Arc::clone(&self.days.get(&date).unwrap_or(&self.no_service).trips)
    }

    fn connections_for(&self, date: NaiveDate) -> Arc<ConnectionTable> {
        Arc::clone(&self.days.get(&date).unwrap_or(&self.no_service).connections)
    }
}

fn gtfs_stop_name(stop: &gtfs_structures::Stop) -> &str {
    stop.name.as_deref().unwrap_or(&stop.id)
}

fn vehicle_for(route_type: &RouteType) -> Vehicle {
    match route_type {
        RouteType::Tramway | RouteType::CableCar => Vehicle::Tram,
        RouteType::Subway => Vehicle::Metro,
        RouteType::Rail => Vehicle::Train,
        RouteType::Ferry => Vehicle::Ferry,
        RouteType::Gondola => Vehicle::AerialLift,
        RouteType::Funicular => Vehicle::Funicular,
        _ => Vehicle::Bus,
    }
}

// GTFS times are seconds after midnight.
fn gtfs_connections(
    trip: &gtfs_structures::Trip,
    stop_index: &HashMap<&str, StopId>,
    trip_idx: TripId,
) -> Option<Vec<Connection>> {
    let mut connections = Vec::with_capacity(trip.stop_times.len().saturating_sub(1));
    for pair in trip.stop_times.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);
        let dep_mins = (from.departure_time? / 60) as Minutes;
        let arr_mins = (to.arrival_time? / 60) as Minutes;
        if arr_mins < dep_mins || arr_mins > PackedCriteria::MAX_MINS {
            return None;
        }
        connections.push(Connection {
            dep_stop: *stop_index.get(from.stop.id.as_str())?,
            dep_mins,
            arr_stop: *stop_index.get(to.stop.id.as_str())?,
            arr_mins,
            trip: trip_idx,
        });
    }
    Some(connections)
}

/// A change within every station, plus walks between located stations close enough together.
fn footpaths(stations: &[Station], located: &[bool], config: &NetworkConfig) -> Vec<Transfer> {
    let mut by_latitude: Vec<StationId> = (0..stations.len()).filter(|&id| located[id]).collect();
    by_latitude.sort_by(|&a, &b| stations[a].latitude.total_cmp(&stations[b].latitude));
    let max_latitude_delta = config.max_walk_metres / METRES_PER_DEGREE_LATITUDE;

    let mut walks: Vec<Vec<Transfer>> = vec![Vec::new(); stations.len()];
    for (i, &from) in by_latitude.iter().enumerate() {
        for &to in &by_latitude[i + 1..] {
            if stations[to].latitude - stations[from].latitude > max_latitude_delta {
                break;
            }
            let metres = utils::haversine_metres(
                (stations[from].longitude, stations[from].latitude),
                (stations[to].longitude, stations[to].latitude),
            );
            if metres > config.max_walk_metres {
                continue;
            }
            let minutes = ((metres / config.walk_metres_per_minute).ceil() as Minutes).max(1);
            walks[to].push(Transfer { dep_station: from, arr_station: to, minutes });
            walks[from].push(Transfer { dep_station: to, arr_station: from, minutes });
        }
    }

    let mut transfers = Vec::new();
    for (station, mut arriving) in walks.into_iter().enumerate() {
        transfers.push(Transfer { dep_station: station, arr_station: station, minutes: config.min_change_minutes });
        if arriving.len() >= MAX_TRANSFERS_PER_STATION {
            warn!("Station {station} has {} footpaths, keeping the shortest.", arriving.len());
            arriving.sort_by_key(|transfer| transfer.minutes);
            arriving.truncate(MAX_TRANSFERS_PER_STATION - 1);
        }
        transfers.extend(arriving);
    }
    transfers
}
