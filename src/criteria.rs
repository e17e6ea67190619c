use std::fmt;

use crate::error::{Error, Result};
use crate::timetable::Minutes;
use crate::utils;

// Layout, most significant bit first:
//   [63]     departure present
//   [51..63] departure, stored as complement so that later departures sort first
//   [39..51] arrival
//   [32..39] changes
//   [0..32]  payload
// Numeric order therefore matches (arrival, changes) order among criteria that
// agree on the departure field.

/// One optimisation state packed into 64 bits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackedCriteria(u64);

impl PackedCriteria {
    pub const TIME_BITS: u32 = 12;
    pub const CHANGES_BITS: u32 = 7;
    pub const PAYLOAD_BITS: u32 = 32;

    /// Times are stored relative to this origin, in minutes after midnight.
    pub const TIME_ORIGIN: Minutes = -240;
    pub const MIN_MINS: Minutes = Self::TIME_ORIGIN;
    pub const MAX_MINS: Minutes = 2879;
    pub const MAX_CHANGES: u32 = (1 << Self::CHANGES_BITS) - 1;

    const CHANGES_SHIFT: u32 = Self::PAYLOAD_BITS;
    const ARRIVAL_SHIFT: u32 = Self::CHANGES_SHIFT + Self::CHANGES_BITS;
    const DEPARTURE_SHIFT: u32 = Self::ARRIVAL_SHIFT + Self::TIME_BITS;
    const PRESENCE_SHIFT: u32 = Self::DEPARTURE_SHIFT + Self::TIME_BITS;

    const TIME_MASK: u64 = (1 << Self::TIME_BITS) - 1;
    const CHANGES_MASK: u64 = (1 << Self::CHANGES_BITS) - 1;
    const PAYLOAD_MASK: u64 = (1 << Self::PAYLOAD_BITS) - 1;
    const DEPARTURE_MASK: u64 = (Self::TIME_MASK << Self::DEPARTURE_SHIFT) | (1 << Self::PRESENCE_SHIFT);

    const fn in_range(mins: Minutes) -> bool {
        Self::MIN_MINS <= mins && mins <= Self::MAX_MINS
    }

    pub fn pack(arrival_mins: Minutes, changes: u32, payload: u32) -> Result<Self> {
        if !Self::in_range(arrival_mins) {
            return Err(Error::ArrivalOutOfRange(arrival_mins));
        }
        if changes > Self::MAX_CHANGES {
            return Err(Error::TooManyChanges(changes));
        }
        let arrival = (arrival_mins - Self::TIME_ORIGIN) as u64;
        Ok(Self(
            (arrival << Self::ARRIVAL_SHIFT) | ((changes as u64) << Self::CHANGES_SHIFT) | payload as u64,
        ))
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn has_departure(self) -> bool {
        self.0 >> Self::PRESENCE_SHIFT != 0
    }

    pub fn departure_mins(self) -> Result<Minutes> {
        if !self.has_departure() {
            return Err(Error::MissingDeparture);
        }
        let stored = ((self.0 >> Self::DEPARTURE_SHIFT) & Self::TIME_MASK) as Minutes;
        Ok(Self::TIME_MASK as Minutes - stored + Self::TIME_ORIGIN)
    }

    pub const fn arrival_mins(self) -> Minutes {
        ((self.0 >> Self::ARRIVAL_SHIFT) & Self::TIME_MASK) as Minutes + Self::TIME_ORIGIN
    }

    pub const fn changes(self) -> u32 {
        ((self.0 >> Self::CHANGES_SHIFT) & Self::CHANGES_MASK) as u32
    }

    pub const fn payload(self) -> u32 {
        (self.0 & Self::PAYLOAD_MASK) as u32
    }

    pub const fn without_departure(self) -> Self {
        Self(self.0 & !Self::DEPARTURE_MASK)
    }

    pub fn with_departure(self, departure_mins: Minutes) -> Result<Self> {
        if !Self::in_range(departure_mins) {
            return Err(Error::DepartureOutOfRange(departure_mins));
        }
        let stored = (Self::TIME_MASK as Minutes - (departure_mins - Self::TIME_ORIGIN)) as u64;
        Ok(Self(
            self.without_departure().0 | (1 << Self::PRESENCE_SHIFT) | (stored << Self::DEPARTURE_SHIFT),
        ))
    }

    pub fn with_additional_change(self) -> Result<Self> {
        let changes = self.changes();
        if changes == Self::MAX_CHANGES {
            return Err(Error::TooManyChanges(changes + 1));
        }
        Ok(Self(self.0 + (1 << Self::CHANGES_SHIFT)))
    }

    pub const fn with_payload(self, payload: u32) -> Self {
        Self((self.0 & !Self::PAYLOAD_MASK) | payload as u64)
    }

    /// Whether `self` is at least as good as `other` on every criterion: arrives no later,
    /// changes no more often and, when both carry one, leaves no earlier.
    pub fn dominates_or_equals(self, other: Self) -> Result<bool> {
        match (self.has_departure(), other.has_departure()) {
            (false, false) => Ok(self.arrival_mins() <= other.arrival_mins() && self.changes() <= other.changes()),
            (true, true) => Ok(self.arrival_mins() <= other.arrival_mins()
                && self.changes() <= other.changes()
                && self.departure_mins()? >= other.departure_mins()?),
            _ => Err(Error::IncomparableCriteria),
        }
    }
}

impl fmt::Debug for PackedCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("PackedCriteria");
        if let Ok(departure) = self.departure_mins() {
            s.field("departure_mins", &departure);
        }
        s.field("arrival_mins", &self.arrival_mins())
            .field("changes", &self.changes())
            .field("payload", &self.payload())
            .finish()
    }
}

impl fmt::Display for PackedCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Ok(departure) = self.departure_mins() {
            write!(f, "dep: {}, ", utils::format_minutes(departure))?;
        }
        write!(f, "arr: {}, changes: {}", utils::format_minutes(self.arrival_mins()), self.changes())
    }
}
