use std::borrow::Cow;
use std::fmt::{self, Display};

use crate::criteria::PackedCriteria;
use crate::error::{Error, Result};
use crate::timetable::Minutes;

/// An immutable Pareto frontier: criteria in ascending packed order, none of which
/// dominates or equals another.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ParetoFront {
    criteria: Cow<'static, [PackedCriteria]>,
}

impl ParetoFront {
    pub const EMPTY: ParetoFront = ParetoFront { criteria: Cow::Borrowed(&[]) };

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn as_slice(&self) -> &[PackedCriteria] {
        &self.criteria
    }

    pub fn iter(&self) -> impl Iterator<Item = PackedCriteria> + '_ {
        self.criteria.iter().copied()
    }

    /// Finds the criteria with the given arrival time and change count.
    pub fn get(&self, arrival_mins: Minutes, changes: u32) -> Result<PackedCriteria> {
        self.iter()
            .find(|criteria| criteria.arrival_mins() == arrival_mins && criteria.changes() == changes)
            .ok_or(Error::CriteriaNotFound { arrival_mins, changes })
    }
}

impl Default for ParetoFront {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Display for ParetoFront {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for criteria in self.iter() {
            writeln!(f, "{criteria}")?;
        }
        Ok(())
    }
}

/// A frontier under construction, reused as scratch space during a sweep.
#[derive(Clone, Default, Debug)]
pub struct ParetoFrontBuilder {
    criteria: Vec<PackedCriteria>,
}

impl ParetoFrontBuilder {
    pub const fn new() -> Self {
        Self { criteria: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    // Keeps the allocation.
    pub fn clear(&mut self) -> &mut Self {
        self.criteria.clear();
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = PackedCriteria> + '_ {
        self.criteria.iter().copied()
    }

    /// Adds `new_criteria` unless an existing entry dominates or equals it, removing every
    /// entry it dominates in turn.
    pub fn add(&mut self, new_criteria: PackedCriteria) -> Result<&mut Self> {
        for &criteria in &self.criteria {
            if criteria.dominates_or_equals(new_criteria)? {
                return Ok(self);
            }
        }

        let mut kept = 0;
        for i in 0..self.criteria.len() {
            let criteria = self.criteria[i];
            if !new_criteria.dominates_or_equals(criteria)? {
                self.criteria[kept] = criteria;
                kept += 1;
            }
        }
        self.criteria.truncate(kept);

        let position = self.criteria.partition_point(|&criteria| criteria < new_criteria);
        self.criteria.insert(position, new_criteria);
        Ok(self)
    }

    pub fn add_tuple(&mut self, arrival_mins: Minutes, changes: u32, payload: u32) -> Result<&mut Self> {
        self.add(PackedCriteria::pack(arrival_mins, changes, payload)?)
    }

    pub fn add_all(&mut self, other: &ParetoFrontBuilder) -> Result<&mut Self> {
        for criteria in other.iter() {
            self.add(criteria)?;
        }
        Ok(self)
    }

    /// Whether every entry of `other` is dominated by some entry of `self`, once entries
    /// without a departure time on either side are given `departure_mins`.
    pub fn fully_dominates(&self, other: &ParetoFrontBuilder, departure_mins: Minutes) -> Result<bool> {
        let no_departures = !self.iter().chain(other.iter()).any(PackedCriteria::has_departure);
        if no_departures && departure_mins == 0 {
            return Err(Error::AmbiguousDeparture);
        }

        let normalize = |criteria: PackedCriteria| {
            if criteria.has_departure() {
                Ok(criteria)
            } else {
                criteria.with_departure(departure_mins)
            }
        };

        for theirs in other.iter() {
            let theirs = normalize(theirs)?;
            let mut dominated = false;
            for ours in self.iter() {
                if normalize(ours)?.dominates_or_equals(theirs)? {
                    dominated = true;
                    break;
                }
            }
            if !dominated {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn build(&self) -> ParetoFront {
        if self.criteria.is_empty() {
            return ParetoFront::EMPTY;
        }
        ParetoFront { criteria: Cow::Owned(self.criteria.clone()) }
    }
}

impl Display for ParetoFrontBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.build().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pack(arrival: Minutes, changes: u32, payload: u32) -> PackedCriteria {
        PackedCriteria::pack(arrival, changes, payload).unwrap()
    }

    fn assert_antichain(criteria: &[PackedCriteria]) {
        for (i, &a) in criteria.iter().enumerate() {
            for (j, &b) in criteria.iter().enumerate() {
                if i != j {
                    assert!(!a.dominates_or_equals(b).unwrap(), "{a:?} dominates {b:?}");
                }
            }
        }
        assert!(criteria.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn empty_front() {
        assert_eq!(ParetoFront::EMPTY.len(), 0);
        assert!(ParetoFrontBuilder::new().build().is_empty());
        assert_eq!(ParetoFrontBuilder::new().build(), ParetoFront::EMPTY);
        assert!(matches!(ParetoFront::EMPTY.get(10, 1), Err(Error::CriteriaNotFound { .. })));
    }

    #[test]
    fn dominated_entry_is_rejected() {
        let mut builder = ParetoFrontBuilder::new();
        builder.add_tuple(480, 3, 0).unwrap().add_tuple(480, 4, 0).unwrap();
        let front = builder.build();
        assert_eq!(front.len(), 1);
        assert_eq!(front.get(480, 3).unwrap(), pack(480, 3, 0));
        assert!(front.get(480, 4).is_err());
    }

    #[test]
    fn dominated_entries_are_removed() {
        let mut builder = ParetoFrontBuilder::new();
        builder.add_tuple(500, 4, 0).unwrap();
        builder.add_tuple(510, 2, 0).unwrap();
        builder.add_tuple(520, 1, 0).unwrap();
        builder.add_tuple(490, 2, 0).unwrap();
        let front = builder.build();
        assert_eq!(front.as_slice(), &[pack(490, 2, 0), pack(520, 1, 0)]);
    }

    #[test]
    fn payload_does_not_break_ties() {
        let mut builder = ParetoFrontBuilder::new();
        builder.add_tuple(600, 1, 10).unwrap().add_tuple(600, 1, 20).unwrap();
        assert_eq!(builder.build().as_slice(), &[pack(600, 1, 10)]);
    }

    #[test]
    fn insertion_is_idempotent() {
        let mut builder = ParetoFrontBuilder::new();
        builder.add_tuple(600, 5, 1).unwrap().add_tuple(700, 3, 2).unwrap();
        let size = builder.len();
        builder.add_tuple(700, 3, 2).unwrap();
        assert_eq!(builder.len(), size);
    }

    #[test]
    fn mixed_departures_fail() {
        let mut builder = ParetoFrontBuilder::new();
        builder.add_tuple(600, 1, 0).unwrap();
        let with_departure = pack(600, 1, 0).with_departure(500).unwrap();
        assert!(matches!(builder.add(with_departure), Err(Error::IncomparableCriteria)));
    }

    #[test]
    fn build_is_a_snapshot() {
        let mut builder = ParetoFrontBuilder::new();
        builder.add_tuple(200, 4, 100).unwrap();
        let front = builder.build();
        builder.add_tuple(210, 3, 110).unwrap();
        assert_eq!(front.len(), 1);
        assert_eq!(builder.len(), 2);
    }

    #[test]
    fn clear_and_reuse() {
        let mut builder = ParetoFrontBuilder::new();
        builder.add_tuple(600, 1, 0).unwrap();
        assert!(builder.clear().is_empty());
        builder.add_tuple(700, 0, 0).unwrap();
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn add_all_merges() {
        let mut a = ParetoFrontBuilder::new();
        a.add_tuple(600, 2, 0).unwrap();
        let mut b = ParetoFrontBuilder::new();
        b.add_tuple(590, 3, 0).unwrap().add_tuple(610, 2, 0).unwrap();
        a.add_all(&b).unwrap();
        assert_eq!(a.build().as_slice(), &[pack(590, 3, 0), pack(600, 2, 0)]);
    }

    #[test]
    fn fully_dominates_without_departures() {
        let mut ours = ParetoFrontBuilder::new();
        ours.add_tuple(600, 1, 0).unwrap().add_tuple(650, 0, 0).unwrap();
        let mut theirs = ParetoFrontBuilder::new();
        theirs.add_tuple(610, 1, 0).unwrap().add_tuple(660, 0, 0).unwrap();
        assert!(ours.fully_dominates(&theirs, 500).unwrap());
        assert!(!theirs.fully_dominates(&ours, 500).unwrap());
        assert!(matches!(ours.fully_dominates(&theirs, 0), Err(Error::AmbiguousDeparture)));
    }

    #[test]
    fn fully_dominates_with_departures() {
        let mut ours = ParetoFrontBuilder::new();
        ours.add(pack(600, 1, 0).with_departure(540).unwrap()).unwrap();
        let mut theirs = ParetoFrontBuilder::new();
        theirs.add_tuple(610, 1, 0).unwrap();

        // Leaving at 530 is dominated by our option leaving at 540.
        assert!(ours.fully_dominates(&theirs, 530).unwrap());
        // Leaving at 545 is not.
        assert!(!ours.fully_dominates(&theirs, 545).unwrap());
    }

    #[test]
    fn empty_fronts_and_domination() {
        let empty = ParetoFrontBuilder::new();
        let mut other = ParetoFrontBuilder::new();
        other.add_tuple(600, 0, 0).unwrap();
        assert!(other.fully_dominates(&empty, 500).unwrap());
        assert!(!empty.fully_dominates(&other, 500).unwrap());
    }

    #[test]
    fn display_lists_entries() {
        let mut builder = ParetoFrontBuilder::new();
        builder.add_tuple(480, 1, 0).unwrap();
        assert_eq!(builder.to_string(), "arr: 08:00, changes: 1\n");
    }

    proptest! {
        #[test]
        fn stays_an_ordered_antichain(entries in prop::collection::vec((400i32..700, 0u32..6, any::<u32>()), 0..60)) {
            let mut builder = ParetoFrontBuilder::new();
            for (arrival, changes, payload) in entries.iter().copied() {
                builder.add_tuple(arrival, changes, payload).unwrap();
                assert_antichain(&builder.criteria);
            }
            let front = builder.build();
            prop_assert!(front.iter().map(PackedCriteria::arrival_mins).collect::<Vec<_>>().windows(2).all(|w| w[0] <= w[1]));

            // Every inserted tuple ends up dominated by some entry.
            for (arrival, changes, payload) in entries {
                let criteria = pack(arrival, changes, payload);
                prop_assert!(front.iter().any(|kept| kept.dominates_or_equals(criteria).unwrap()));
            }
        }

        #[test]
        fn departures_stay_an_antichain(entries in prop::collection::vec((400i32..700, 0u32..4, 300i32..500), 0..40)) {
            let mut builder = ParetoFrontBuilder::new();
            for (arrival, changes, departure) in entries {
                builder.add(pack(arrival, changes, 0).with_departure(departure).unwrap()).unwrap();
                assert_antichain(&builder.criteria);
            }
        }
    }
}
