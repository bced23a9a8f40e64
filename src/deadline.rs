use std::collections::BTreeMap;

use crate::time::Deadline;

/// An ordered map from registered deadlines to the probability of
/// meeting them. A probability is `None` until a solver has filled it in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeadlineProbabilityMap {
    entries: BTreeMap<Deadline, Option<f64>>,
}

impl DeadlineProbabilityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `deadline` with an unsolved probability. Returns
    /// `false` (and leaves the map unchanged) if it was already present.
    pub fn insert(&mut self, deadline: Deadline) -> bool {
        if self.entries.contains_key(&deadline) {
            false
        } else {
            self.entries.insert(deadline, None);
            true
        }
    }

    /// Unregister `deadline`; returns whether it was present.
    pub fn remove(&mut self, deadline: Deadline) -> bool {
        self.entries.remove(&deadline).is_some()
    }

    pub fn contains(&self, deadline: Deadline) -> bool {
        self.entries.contains_key(&deadline)
    }

    /// Look up a deadline: `None` if it is not registered,
    /// `Some(None)` if it is registered but unsolved.
    pub fn get(&self, deadline: Deadline) -> Option<Option<f64>> {
        self.entries.get(&deadline).copied()
    }

    /// Record the probability of meeting `deadline`. Returns `false`
    /// if the deadline is not registered; unknown deadlines are never
    /// added by this method.
    pub fn set(&mut self, deadline: Deadline, probability: f64) -> bool {
        match self.entries.get_mut(&deadline) {
            Some(entry) => {
                *entry = Some(probability);
                true
            }
            None => false,
        }
    }

    /// Forget all computed probabilities, keeping the deadlines.
    pub fn clear_probabilities(&mut self) {
        self.entries.values_mut().for_each(|p| *p = None);
    }

    /// The registered deadlines in ascending order.
    pub fn deadlines(&self) -> impl Iterator<Item = Deadline> + '_ {
        self.entries.keys().copied()
    }

    /// Iterate over `(deadline, probability)` pairs in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (Deadline, Option<f64>)> + '_ {
        self.entries.iter().map(|(d, p)| (*d, *p))
    }

    /// Mutable access to every probability, for solvers filling the map in place.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Deadline, &mut Option<f64>)> + '_ {
        self.entries.iter_mut().map(|(d, p)| (*d, p))
    }

    /// The smallest deadline whose probability has not been filled in.
    pub fn first_unsolved(&self) -> Option<Deadline> {
        self.entries
            .iter()
            .find(|(_, p)| p.is_none())
            .map(|(d, _)| *d)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
