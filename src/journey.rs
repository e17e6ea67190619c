use std::fmt::{self, Display};

use chrono::{NaiveDateTime, TimeDelta};

use crate::error::{Error, Result};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Vehicle {
    Tram,
    Metro,
    Train,
    Bus,
    Ferry,
    AerialLift,
    Funicular,
}

impl Vehicle {
    pub const ALL: [Vehicle; 7] = [
        Vehicle::Tram,
        Vehicle::Metro,
        Vehicle::Train,
        Vehicle::Bus,
        Vehicle::Ferry,
        Vehicle::AerialLift,
        Vehicle::Funicular,
    ];
}

impl Display for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Vehicle::Tram => "tram",
            Vehicle::Metro => "metro",
            Vehicle::Train => "train",
            Vehicle::Bus => "bus",
            Vehicle::Ferry => "ferry",
            Vehicle::AerialLift => "aerial lift",
            Vehicle::Funicular => "funicular",
        })
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Stop {
    name: Box<str>,
    platform_name: Option<Box<str>>,
    longitude: f64,
    latitude: f64,
}

impl Stop {
    pub fn new(name: &str, platform_name: Option<&str>, longitude: f64, latitude: f64) -> Result<Self> {
        if !(-180.0..=180.0).contains(&longitude) || !(-90.0..=90.0).contains(&latitude) {
            return Err(Error::InvalidCoordinates { longitude, latitude });
        }
        Ok(Self { name: name.into(), platform_name: platform_name.map(Into::into), longitude, latitude })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn platform_name(&self) -> Option<&str> {
        self.platform_name.as_deref()
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }
}

impl Display for Stop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.platform_name() {
            Some(platform) if !platform.is_empty() => write!(f, "{} (platform {platform})", self.name),
            _ => f.write_str(&self.name),
        }
    }
}

/// A stop passed through without getting off.
#[derive(Clone, PartialEq, Debug)]
pub struct IntermediateStop {
    stop: Stop,
    arr_time: NaiveDateTime,
    dep_time: NaiveDateTime,
}

impl IntermediateStop {
    pub fn new(stop: Stop, arr_time: NaiveDateTime, dep_time: NaiveDateTime) -> Result<Self> {
        if dep_time < arr_time {
            return Err(Error::InvalidLeg("intermediate stop departs before it arrives"));
        }
        Ok(Self { stop, arr_time, dep_time })
    }

    pub fn stop(&self) -> &Stop {
        &self.stop
    }

    pub fn arr_time(&self) -> NaiveDateTime {
        self.arr_time
    }

    pub fn dep_time(&self) -> NaiveDateTime {
        self.dep_time
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct TransportLeg {
    dep_stop: Stop,
    dep_time: NaiveDateTime,
    arr_stop: Stop,
    arr_time: NaiveDateTime,
    intermediate_stops: Vec<IntermediateStop>,
    vehicle: Vehicle,
    route: Box<str>,
    destination: Box<str>,
}

impl TransportLeg {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dep_stop: Stop,
        dep_time: NaiveDateTime,
        arr_stop: Stop,
        arr_time: NaiveDateTime,
        intermediate_stops: Vec<IntermediateStop>,
        vehicle: Vehicle,
        route: &str,
        destination: &str,
    ) -> Result<Self> {
        if arr_time < dep_time {
            return Err(Error::InvalidLeg("arrival before departure"));
        }
        Ok(Self {
            dep_stop,
            dep_time,
            arr_stop,
            arr_time,
            intermediate_stops,
            vehicle,
            route: route.into(),
            destination: destination.into(),
        })
    }

    pub fn vehicle(&self) -> Vehicle {
        self.vehicle
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct FootLeg {
    dep_stop: Stop,
    dep_time: NaiveDateTime,
    arr_stop: Stop,
    arr_time: NaiveDateTime,
}

impl FootLeg {
    pub fn new(dep_stop: Stop, dep_time: NaiveDateTime, arr_stop: Stop, arr_time: NaiveDateTime) -> Result<Self> {
        if arr_time < dep_time {
            return Err(Error::InvalidLeg("arrival before departure"));
        }
        Ok(Self { dep_stop, dep_time, arr_stop, arr_time })
    }

    /// A change within one station rather than a walk between two. Platforms may differ.
    pub fn is_transfer(&self) -> bool {
        self.dep_stop.name() == self.arr_stop.name()
            && self.dep_stop.longitude() == self.arr_stop.longitude()
            && self.dep_stop.latitude() == self.arr_stop.latitude()
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum Leg {
    Transport(TransportLeg),
    Foot(FootLeg),
}

impl Leg {
    pub fn dep_stop(&self) -> &Stop {
        match self {
            Leg::Transport(leg) => &leg.dep_stop,
            Leg::Foot(leg) => &leg.dep_stop,
        }
    }

    pub fn arr_stop(&self) -> &Stop {
        match self {
            Leg::Transport(leg) => &leg.arr_stop,
            Leg::Foot(leg) => &leg.arr_stop,
        }
    }

    pub fn dep_time(&self) -> NaiveDateTime {
        match self {
            Leg::Transport(leg) => leg.dep_time,
            Leg::Foot(leg) => leg.dep_time,
        }
    }

    pub fn arr_time(&self) -> NaiveDateTime {
        match self {
            Leg::Transport(leg) => leg.arr_time,
            Leg::Foot(leg) => leg.arr_time,
        }
    }

    pub fn intermediate_stops(&self) -> &[IntermediateStop] {
        match self {
            Leg::Transport(leg) => &leg.intermediate_stops,
            Leg::Foot(_) => &[],
        }
    }

    pub fn duration(&self) -> TimeDelta {
        self.arr_time() - self.dep_time()
    }
}

/// A sequence of legs, each leaving from where and after the previous one arrived.
#[derive(Clone, PartialEq, Debug)]
pub struct Journey {
    legs: Vec<Leg>,
}

impl Journey {
    pub fn new(legs: Vec<Leg>) -> Result<Self> {
        if legs.is_empty() {
            return Err(Error::InvalidJourney("no legs"));
        }
        for pair in legs.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);
            if previous.arr_stop() != current.dep_stop() {
                return Err(Error::InvalidJourney("leg does not start where the previous one ended"));
            }
            if previous.arr_time() > current.dep_time() {
                return Err(Error::InvalidJourney("leg departs before the previous one arrives"));
            }
            if matches!((previous, current), (Leg::Foot(_), Leg::Foot(_))) {
                return Err(Error::InvalidJourney("consecutive foot legs"));
            }
        }
        Ok(Self { legs })
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    fn first(&self) -> &Leg {
        &self.legs[0]
    }

    fn last(&self) -> &Leg {
        &self.legs[self.legs.len() - 1]
    }

    pub fn dep_stop(&self) -> &Stop {
        self.first().dep_stop()
    }

    pub fn arr_stop(&self) -> &Stop {
        self.last().arr_stop()
    }

    pub fn dep_time(&self) -> NaiveDateTime {
        self.first().dep_time()
    }

    pub fn arr_time(&self) -> NaiveDateTime {
        self.last().arr_time()
    }

    pub fn duration(&self) -> TimeDelta {
        self.arr_time() - self.dep_time()
    }

    pub fn changes(&self) -> usize {
        self.legs.iter().filter(|leg| matches!(leg, Leg::Transport(_))).count().saturating_sub(1)
    }
}

const TIME_FORMAT: &str = "%H:%M";

impl Display for Journey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-----------------------------------------------")?;
        for leg in &self.legs {
            match leg {
                Leg::Transport(leg) => {
                    writeln!(
                        f,
                        "Board at {} at {} ({} {} to {}).",
                        leg.dep_stop,
                        leg.dep_time.format(TIME_FORMAT),
                        leg.vehicle,
                        leg.route,
                        leg.destination
                    )?;
                    for stop in &leg.intermediate_stops {
                        writeln!(f, "  via {} at {}", stop.stop, stop.dep_time.format(TIME_FORMAT))?;
                    }
                    writeln!(f, "Arrive at {} at {}.", leg.arr_stop, leg.arr_time.format(TIME_FORMAT))?;
                }
                Leg::Foot(foot) if foot.is_transfer() => {
                    writeln!(f, "Change at {} ({} minutes).", foot.dep_stop.name(), leg.duration().num_minutes())?;
                }
                Leg::Foot(foot) => {
                    writeln!(
                        f,
                        "Walk from {} to {} ({} minutes).",
                        foot.dep_stop,
                        foot.arr_stop,
                        leg.duration().num_minutes()
                    )?;
                }
            }
        }
        writeln!(f, "Total journey time: {} minutes.", self.duration().num_minutes())?;
        writeln!(f, "-----------------------------------------------")
    }
}
