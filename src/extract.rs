use chrono::{NaiveDateTime, NaiveTime, TimeDelta};

use crate::criteria::PackedCriteria;
use crate::error::Result;
use crate::journey::{FootLeg, IntermediateStop, Journey, Leg, Stop, TransportLeg};
use crate::packed;
use crate::profile::Profile;
use crate::timetable::{ConnectionId, Connections, Minutes, Routes, StationId, Stations, StopId, TimeTable, Transfers, Trips};

/// Every Pareto-optimal journey from `dep_station` to the profile's destination, sorted
/// by departure then arrival time.
pub fn journeys<T: TimeTable>(profile: &Profile<'_, T>, dep_station: StationId) -> Result<Vec<Journey>> {
    let mut journeys = profile
        .for_station(dep_station)?
        .iter()
        .map(|criteria| Extractor { profile }.journey(dep_station, criteria))
        .collect::<Result<Vec<_>>>()?;
    journeys.sort_by_key(|journey| (journey.dep_time(), journey.arr_time()));
    Ok(journeys)
}

struct Extractor<'p, 'a, T: TimeTable> {
    profile: &'p Profile<'a, T>,
}

impl<T: TimeTable> Extractor<'_, '_, T> {
    fn time(&self, mins: Minutes) -> NaiveDateTime {
        self.profile.date().and_time(NaiveTime::MIN) + TimeDelta::minutes(mins.into())
    }

    fn stop(&self, stop: StopId) -> Result<Stop> {
        let timetable = self.profile.timetable();
        let station = timetable.station_id(stop);
        let stations = timetable.stations();
        Stop::new(
            stations.name(station),
            timetable.platform_name(stop),
            stations.longitude(station),
            stations.latitude(station),
        )
    }

    fn walk(&self, from: StopId, dep_mins: Minutes, to: StopId) -> Result<Leg> {
        let timetable = self.profile.timetable();
        let minutes = timetable.transfers().minutes_between(timetable.station_id(from), timetable.station_id(to))?;
        Ok(Leg::Foot(FootLeg::new(self.stop(from)?, self.time(dep_mins), self.stop(to)?, self.time(dep_mins + minutes))?))
    }

    /// Rides from `boarding` past `skipped` stops, returning the leg and the connection
    /// the trip is left on.
    fn ride(&self, boarding: ConnectionId, skipped: u32) -> Result<(Leg, ConnectionId)> {
        let connections = self.profile.connections();
        let trips = self.profile.trips();
        let routes = self.profile.timetable().routes();

        let mut alighting = boarding;
        let mut intermediate_stops = Vec::with_capacity(skipped as usize);
        for _ in 0..skipped {
            let next = connections.next_connection_id(alighting);
            intermediate_stops.push(IntermediateStop::new(
                self.stop(connections.arr_stop_id(alighting))?,
                self.time(connections.arr_mins(alighting)),
                self.time(connections.dep_mins(next)),
            )?);
            alighting = next;
        }

        let trip = connections.trip_id(boarding);
        let route = trips.route_id(trip);
        let leg = TransportLeg::new(
            self.stop(connections.dep_stop_id(boarding))?,
            self.time(connections.dep_mins(boarding)),
            self.stop(connections.arr_stop_id(alighting))?,
            self.time(connections.arr_mins(alighting)),
            intermediate_stops,
            routes.vehicle(route),
            routes.name(route),
            trips.destination(trip),
        )?;
        Ok((Leg::Transport(leg), alighting))
    }

    fn journey(&self, dep_station: StationId, criteria: PackedCriteria) -> Result<Journey> {
        let timetable = self.profile.timetable();
        let connections = self.profile.connections();
        let arrival_mins = criteria.arrival_mins();
        let mut legs = Vec::new();

        let mut boarding = packed::unpack_24(criteria.payload()) as ConnectionId;
        let mut skipped = packed::unpack_8(criteria.payload());
        let first_stop = connections.dep_stop_id(boarding);
        if timetable.station_id(first_stop) != dep_station {
            legs.push(self.walk(dep_station, criteria.departure_mins()?, first_stop)?);
        }

        let mut changes = criteria.changes();
        loop {
            let (leg, alighting) = self.ride(boarding, skipped)?;
            legs.push(leg);

            let arr_stop = connections.arr_stop_id(alighting);
            let arr_mins = connections.arr_mins(alighting);
            let arr_station = timetable.station_id(arr_stop);
            if changes == 0 {
                if arr_station != self.profile.arr_station() {
                    legs.push(self.walk(arr_stop, arr_mins, self.profile.arr_station())?);
                }
                break;
            }

            changes -= 1;
            let next = self.profile.for_station(arr_station)?.get(arrival_mins, changes)?;
            boarding = packed::unpack_24(next.payload()) as ConnectionId;
            skipped = packed::unpack_8(next.payload());
            legs.push(self.walk(arr_stop, arr_mins, connections.dep_stop_id(boarding))?);
        }

        Journey::new(legs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csa::csa_profile;
    use crate::csa::tests::{date, hop, line_network};
    use crate::error::Error;
    use crate::frontier::ParetoFrontBuilder;
    use crate::journey::Vehicle;
    use crate::network::tests::{small_gtfs, tuesday};
    use crate::network::{Network, NetworkConfig, Trip};
    use crate::profile::ProfileBuilder;

    fn at(mins: i64) -> NaiveDateTime {
        date().and_time(NaiveTime::MIN) + TimeDelta::minutes(mins)
    }

    #[test]
    fn ride_then_walk() {
        let network = line_network(vec![Trip::new(0, "B")], vec![hop(0, 480, 1, 500, 0)]);
        let profile = csa_profile(&network, date(), 3).unwrap();
        let journeys = journeys(&profile, 0).unwrap();

        assert_eq!(journeys.len(), 1);
        let legs = journeys[0].legs();
        assert_eq!(legs.len(), 2);
        assert!(matches!(&legs[0], Leg::Transport(leg) if leg.vehicle() == Vehicle::Train && leg.route() == "S1"));
        assert!(matches!(&legs[1], Leg::Foot(leg) if !leg.is_transfer()));
        assert_eq!(journeys[0].dep_time(), at(480));
        assert_eq!(journeys[0].arr_time(), at(505));
        assert_eq!(journeys[0].arr_stop().name(), "D");
    }

    #[test]
    fn direct_ride() {
        let network = line_network(vec![Trip::new(1, "D")], vec![hop(0, 480, 3, 520, 0)]);
        let profile = csa_profile(&network, date(), 3).unwrap();
        let journeys = journeys(&profile, 0).unwrap();

        assert_eq!(journeys.len(), 1);
        assert_eq!(journeys[0].legs().len(), 1);
        assert_eq!(journeys[0].dep_stop().name(), "A");
        assert_eq!(journeys[0].arr_stop().name(), "D");
        assert_eq!(journeys[0].arr_time(), at(520));
    }

    #[test]
    fn change_between_trips() {
        let network = line_network(
            vec![Trip::new(0, "B"), Trip::new(1, "C")],
            vec![hop(0, 480, 1, 500, 0), hop(1, 510, 2, 530, 1)],
        );
        let profile = csa_profile(&network, date(), 2).unwrap();
        let journeys = journeys(&profile, 0).unwrap();

        assert_eq!(journeys.len(), 1);
        let journey = &journeys[0];
        assert_eq!(journey.changes(), 1);
        let legs = journey.legs();
        assert_eq!(legs.len(), 3);
        assert!(matches!(&legs[1], Leg::Foot(leg) if leg.is_transfer()));
        assert_eq!(legs[1].dep_time(), at(500));
        assert_eq!(legs[1].arr_time(), at(502));
        assert_eq!(legs[2].dep_time(), at(510));
        assert_eq!(journey.arr_time(), at(530));
    }

    #[test]
    fn intermediate_stops() {
        let network = line_network(
            vec![Trip::new(0, "A")],
            vec![hop(3, 480, 2, 490, 0), hop(2, 492, 1, 500, 0), hop(1, 502, 0, 510, 0)],
        );
        let profile = csa_profile(&network, date(), 0).unwrap();
        let journeys = journeys(&profile, 3).unwrap();

        assert_eq!(journeys.len(), 1);
        let legs = journeys[0].legs();
        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].dep_time(), at(480));
        assert_eq!(legs[0].arr_time(), at(510));

        let stops = legs[0].intermediate_stops();
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].stop().name(), "C");
        assert_eq!((stops[0].arr_time(), stops[0].dep_time()), (at(490), at(492)));
        assert_eq!(stops[1].stop().name(), "B");
        assert_eq!((stops[1].arr_time(), stops[1].dep_time()), (at(500), at(502)));
    }

    #[test]
    fn same_minute_stops_are_listed() {
        let network = line_network(vec![Trip::new(0, "C")], vec![hop(0, 500, 1, 500, 0), hop(1, 500, 2, 500, 0)]);
        let profile = csa_profile(&network, date(), 2).unwrap();
        let journeys = journeys(&profile, 0).unwrap();

        assert_eq!(journeys.len(), 1);
        let legs = journeys[0].legs();
        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].arr_stop().name(), "C");
        let stops = legs[0].intermediate_stops();
        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0].stop().name(), "B");
    }

    #[test]
    fn gtfs_journey_ends_with_a_walk() {
        // Leaving the bus at Prilly and walking beats riding on to Lausanne.
        let network = Network::from_gtfs(&small_gtfs(), &[tuesday()], &NetworkConfig::default()).unwrap();
        let profile = csa_profile(&network, tuesday(), 0).unwrap();
        let journeys = journeys(&profile, 2).unwrap();

        assert_eq!(journeys.len(), 1);
        let legs = journeys[0].legs();
        assert_eq!(legs.len(), 2);
        assert!(matches!(&legs[0], Leg::Transport(leg) if leg.vehicle() == Vehicle::Bus && leg.route() == "Lausanne Renens"));
        assert_eq!(legs[0].arr_stop().name(), "Prilly");
        assert!(matches!(&legs[1], Leg::Foot(leg) if !leg.is_transfer()));
        assert_eq!(journeys[0].dep_time(), tuesday().and_hms_opt(9, 0, 0).unwrap());
        assert_eq!(journeys[0].arr_time(), tuesday().and_hms_opt(9, 11, 0).unwrap());
    }

    #[test]
    fn walk_to_first_boarding() {
        // From B the only way to C is walking to D and riding from there.
        let network = line_network(vec![Trip::new(0, "C")], vec![hop(3, 600, 2, 620, 0)]);
        let profile = csa_profile(&network, date(), 2).unwrap();
        let from_b = journeys(&profile, 1).unwrap();

        assert_eq!(from_b.len(), 1);
        let legs = from_b[0].legs();
        assert_eq!(legs.len(), 2);
        assert!(matches!(&legs[0], Leg::Foot(leg) if !leg.is_transfer()));
        assert_eq!((legs[0].dep_time(), legs[0].arr_time()), (at(595), at(600)));
        assert_eq!(legs[1].dep_stop().name(), "D");
        assert_eq!(from_b[0].arr_time(), at(620));
    }

    #[test]
    fn platform_names_are_kept() {
        let network = line_network(vec![Trip::new(0, "C")], vec![hop(4, 600, 2, 620, 0)]);
        let profile = csa_profile(&network, date(), 2).unwrap();
        let journeys = journeys(&profile, 1).unwrap();

        assert_eq!(journeys.len(), 1);
        assert_eq!(journeys[0].dep_stop().name(), "B");
        assert_eq!(journeys[0].dep_stop().platform_name(), Some("7"));
    }

    #[test]
    fn sorted_by_departure() {
        // Direct at 08:00, or a later departure changing at C.
        let network = line_network(
            vec![Trip::new(0, "D"), Trip::new(0, "C"), Trip::new(1, "D")],
            vec![hop(0, 480, 3, 520, 0), hop(0, 490, 2, 500, 1), hop(2, 505, 3, 540, 2)],
        );
        let profile = csa_profile(&network, date(), 3).unwrap();
        let journeys = journeys(&profile, 0).unwrap();

        assert_eq!(journeys.len(), 2);
        assert_eq!((journeys[0].dep_time(), journeys[0].arr_time()), (at(480), at(520)));
        assert_eq!(journeys[0].changes(), 0);
        assert_eq!((journeys[1].dep_time(), journeys[1].arr_time()), (at(490), at(540)));
        assert_eq!(journeys[1].changes(), 1);
        assert_eq!(journeys[1].legs().len(), 3);
    }

    #[test]
    fn missing_final_transfer_fails() {
        // An entry at A riding to B with no changes, while B has no footpath to C.
        let network = line_network(vec![Trip::new(0, "B")], vec![hop(0, 480, 1, 500, 0)]);
        let mut builder = ProfileBuilder::new(&network, date(), 2);
        let mut front = ParetoFrontBuilder::new();
        let payload = packed::pack_24_8(0, 0).unwrap();
        front.add(PackedCriteria::pack(510, 0, payload).unwrap().with_departure(478).unwrap()).unwrap();
        builder.set_for_station(0, front).unwrap();
        let profile = builder.build();

        assert!(matches!(journeys(&profile, 0), Err(Error::NoTransfer { from: 1, to: 2 })));
    }

    #[test]
    fn unknown_station_fails() {
        let network = line_network(Vec::new(), Vec::new());
        let profile = csa_profile(&network, date(), 3).unwrap();
        assert!(matches!(journeys(&profile, 10), Err(Error::IndexOutOfRange { .. })));
    }
}
