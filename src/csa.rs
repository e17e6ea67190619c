use chrono::NaiveDate;
use log::{debug, trace};

use crate::criteria::PackedCriteria;
use crate::error::Result;
use crate::frontier::ParetoFrontBuilder;
use crate::packed;
use crate::profile::{Profile, ProfileBuilder};
use crate::timetable::{Connections, Indexed, Minutes, StationId, TimeTable, Transfers};

/// Runs a profile connection scan towards `arr_station`: every station ends up with the
/// Pareto-optimal (departure, arrival, changes) options for reaching it on `date`.
///
/// Options whose times fall outside the packable range are dropped, not reported as errors.
pub fn csa_profile<T: TimeTable>(timetable: &T, date: NaiveDate, arr_station: StationId) -> Result<Profile<'_, T>> {
    let mut profile = ProfileBuilder::new(timetable, date, arr_station);
    let connections = profile.connections();
    let transfers = timetable.transfers();
    debug!("Scanning {} connections on {date} towards station {arr_station}.", connections.len());

    // Minutes needed to walk from each station to the destination.
    let mut walk_to_destination: Vec<Option<Minutes>> = vec![None; timetable.stations().len()];
    for transfer in transfers.arriving_at(arr_station) {
        walk_to_destination[transfers.dep_station_id(transfer)] = Some(transfers.minutes(transfer));
    }

    let mut front = ParetoFrontBuilder::new();
    for connection in 0..connections.len() {
        let dep_station = timetable.station_id(connections.dep_stop_id(connection));
        let arr_station = timetable.station_id(connections.arr_stop_id(connection));
        let dep_mins = connections.dep_mins(connection);
        let arr_mins = connections.arr_mins(connection);
        let trip = connections.trip_id(connection);
        let payload = packed::pack_24_8(connection as u32, 0)?;

        front.clear();

        // Get off and walk to the destination.
        if let Some(minutes) = walk_to_destination[arr_station] {
            if in_time_range(arr_mins + minutes) {
                front.add_tuple(arr_mins + minutes, 0, payload)?;
            } else {
                trace!("Connection {connection} arrives too late to walk to station {arr_station}.");
            }
        }

        // Stay on the trip.
        if let Some(trip_front) = profile.for_trip(trip)? {
            front.add_all(trip_front)?;
        }

        // Get off and change.
        if let Some(station_front) = profile.for_station(arr_station)? {
            for criteria in station_front.iter() {
                if criteria.departure_mins()? >= arr_mins && criteria.changes() < PackedCriteria::MAX_CHANGES {
                    front.add(criteria.without_departure().with_additional_change()?.with_payload(payload))?;
                }
            }
        }

        if front.is_empty() {
            continue;
        }

        profile.trip_entry(trip)?.add_all(&front)?;

        if let Some(station_front) = profile.for_station(dep_station)? {
            if !station_front.is_empty() && station_front.fully_dominates(&front, dep_mins)? {
                trace!("Connection {connection} adds nothing at station {dep_station}.");
                continue;
            }
        }

        let first_pos = connections.trip_pos(connection);
        for transfer in transfers.arriving_at(dep_station) {
            let origin = transfers.dep_station_id(transfer);
            let origin_dep_mins = dep_mins - transfers.minutes(transfer);
            if !in_time_range(origin_dep_mins) {
                trace!("Walk from station {origin} to connection {connection} leaves too early.");
                continue;
            }
            let origin_front = profile.station_entry(origin)?;
            for criteria in front.iter() {
                let alight = packed::unpack_24(criteria.payload()) as usize;
                let skipped = connections.trip_pos(alight).saturating_sub(first_pos) as u32;
                let payload = packed::pack_24_8(connection as u32, skipped)?;
                origin_front.add(criteria.with_departure(origin_dep_mins)?.with_payload(payload))?;
            }
        }
    }

    let profile = profile.build();
    debug!(
        "{} of {} stations reach station {arr_station}.",
        profile.station_fronts().iter().filter(|front| !front.is_empty()).count(),
        profile.station_fronts().len()
    );
    Ok(profile)
}

fn in_time_range(mins: Minutes) -> bool {
    (PackedCriteria::MIN_MINS..=PackedCriteria::MAX_MINS).contains(&mins)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::journey::Vehicle;
    use crate::network::{Connection, Network, Platform, Route, Station, Transfer, Trip};

    pub(crate) fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 18).unwrap()
    }

    /// Stations A to D along a line, each with a two minute change, and a walk from B to D.
    pub(crate) fn line_network(trips: Vec<Trip>, connections: Vec<Connection>) -> Network {
        let stations = ["A", "B", "C", "D"]
            .iter()
            .enumerate()
            .map(|(i, name)| Station::new(name, 7.0 + i as f64 * 0.1, 46.5))
            .collect();
        let mut transfers: Vec<Transfer> =
            (0..4).map(|station| Transfer { dep_station: station, arr_station: station, minutes: 2 }).collect();
        transfers.push(Transfer { dep_station: 1, arr_station: 3, minutes: 5 });

        let mut network = Network::new(
            stations,
            vec![Platform::new("7", 1)],
            vec![Route::new("S1", Vehicle::Train), Route::new("12", Vehicle::Bus)],
            transfers,
        )
        .unwrap();
        network.add_day(date(), trips, connections).unwrap();
        network
    }

    pub(crate) fn hop(dep_stop: usize, dep_mins: Minutes, arr_stop: usize, arr_mins: Minutes, trip: usize) -> Connection {
        Connection { dep_stop, dep_mins, arr_stop, arr_mins, trip }
    }

    #[test]
    fn single_connection_then_walk() {
        let network = line_network(vec![Trip::new(0, "B")], vec![hop(0, 480, 1, 500, 0)]);
        let profile = csa_profile(&network, date(), 3).unwrap();

        let front = profile.for_station(0).unwrap();
        assert_eq!(front.len(), 1);
        let criteria = front.iter().next().unwrap();
        assert_eq!(criteria.arrival_mins(), 505);
        assert_eq!(criteria.changes(), 0);
        assert_eq!(criteria.departure_mins().unwrap(), 478);
        assert_eq!(criteria.payload(), packed::pack_24_8(0, 0).unwrap());

        // B itself walks to D, C is never reached.
        assert_eq!(profile.for_station(1).unwrap().len(), 0);
        assert!(profile.for_station(2).unwrap().is_empty());
    }

    #[test]
    fn change_between_trips() {
        let network = line_network(
            vec![Trip::new(0, "B"), Trip::new(1, "C")],
            vec![hop(0, 480, 1, 500, 0), hop(1, 510, 2, 530, 1)],
        );
        let profile = csa_profile(&network, date(), 2).unwrap();

        let criteria = profile.for_station(0).unwrap().get(532, 1).unwrap();
        assert_eq!(criteria.departure_mins().unwrap(), 478);

        let at_b = profile.for_station(1).unwrap().get(532, 0).unwrap();
        assert_eq!(at_b.departure_mins().unwrap(), 508);
    }

    #[test]
    fn missed_change_is_not_used() {
        let network = line_network(
            vec![Trip::new(0, "B"), Trip::new(1, "C")],
            vec![hop(0, 480, 1, 500, 0), hop(1, 499, 2, 530, 1)],
        );
        let profile = csa_profile(&network, date(), 2).unwrap();
        assert!(profile.for_station(0).unwrap().is_empty());
        assert_eq!(profile.for_station(1).unwrap().len(), 1);
    }

    #[test]
    fn skipped_stops_are_counted() {
        // One trip D -> C -> B -> A, ridden from D to A.
        let network = line_network(
            vec![Trip::new(0, "A")],
            vec![hop(3, 480, 2, 490, 0), hop(2, 492, 1, 500, 0), hop(1, 502, 0, 510, 0)],
        );
        let profile = csa_profile(&network, date(), 0).unwrap();

        let criteria = profile.for_station(3).unwrap().get(512, 0).unwrap();
        assert_eq!(criteria.departure_mins().unwrap(), 478);

        let connections = profile.connections();
        let first = packed::unpack_24(criteria.payload()) as usize;
        assert_eq!(connections.dep_mins(first), 480);
        assert_eq!(packed::unpack_8(criteria.payload()), 2);

        // Walking from B to D and boarding there is worse than boarding at B.
        let at_b = profile.for_station(1).unwrap();
        assert_eq!(at_b.len(), 1);
        assert_eq!(at_b.get(512, 0).unwrap().departure_mins().unwrap(), 500);
    }

    #[test]
    fn later_departure_wins() {
        let network = line_network(
            vec![Trip::new(0, "D"), Trip::new(0, "D")],
            vec![hop(0, 480, 3, 520, 0), hop(0, 490, 3, 520, 1)],
        );
        let profile = csa_profile(&network, date(), 3).unwrap();
        let front = profile.for_station(0).unwrap();
        assert_eq!(front.len(), 1);
        assert_eq!(front.get(522, 0).unwrap().departure_mins().unwrap(), 488);
    }

    #[test]
    fn boarding_on_a_platform() {
        // Stop 4 is platform "7" of station B.
        let network = line_network(vec![Trip::new(1, "C")], vec![hop(4, 600, 2, 620, 0)]);
        let profile = csa_profile(&network, date(), 2).unwrap();
        let criteria = profile.for_station(1).unwrap().get(622, 0).unwrap();
        assert_eq!(criteria.departure_mins().unwrap(), 598);
    }

    #[test]
    fn same_minute_hops_are_ridden_through() {
        let network = line_network(vec![Trip::new(0, "C")], vec![hop(0, 500, 1, 500, 0), hop(1, 500, 2, 500, 0)]);
        let profile = csa_profile(&network, date(), 2).unwrap();

        let criteria = profile.for_station(0).unwrap().get(502, 0).unwrap();
        assert_eq!(criteria.departure_mins().unwrap(), 498);
        let first = packed::unpack_24(criteria.payload()) as usize;
        assert_eq!(profile.connections().dep_stop_id(first), 0);
        assert_eq!(packed::unpack_8(criteria.payload()), 1);
    }

    #[test]
    fn late_arrival_is_dropped() {
        // Arriving at B at 47:58 leaves no room for the five minute walk to D.
        let network = line_network(
            vec![Trip::new(0, "B"), Trip::new(0, "B")],
            vec![hop(0, 2860, 1, 2878, 0), hop(0, 600, 1, 620, 1)],
        );
        let profile = csa_profile(&network, date(), 3).unwrap();

        let front = profile.for_station(0).unwrap();
        assert_eq!(front.len(), 1);
        assert_eq!(front.get(625, 0).unwrap().departure_mins().unwrap(), 598);
    }

    #[test]
    fn early_walk_is_dropped() {
        let network = line_network(vec![Trip::new(0, "B")], vec![hop(0, PackedCriteria::MIN_MINS + 1, 1, 10, 0)]);
        let profile = csa_profile(&network, date(), 1).unwrap();
        assert!(profile.for_station(0).unwrap().is_empty());
    }

    #[test]
    fn empty_timetable_gives_empty_fronts() {
        let network = line_network(Vec::new(), Vec::new());
        let profile = csa_profile(&network, date(), 3).unwrap();
        assert!(profile.station_fronts().iter().all(|front| front.is_empty()));
    }

    #[test]
    #[should_panic]
    fn unknown_destination_panics() {
        let network = line_network(Vec::new(), Vec::new());
        let _ = csa_profile(&network, date(), 9);
    }
}
