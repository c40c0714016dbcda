//! Bookkeeping for the presentation layer's per-node handles (rows, widgets, whatever it builds).
//!
//! The presentation owns the handles themselves. This only tracks, per node, whether the presentation can
//! still trust the one it has.

use crate::id::NodeID;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, strum::AsRefStr)]
pub enum DisplayState {
    /// No handle has been built.
    Unrealized,
    /// The handle is known to match the tree.
    Live,
    /// The tree changed structurally since the handle was confirmed. Must be reconciled before it is trusted.
    Stale,
    /// The node is gone and the handle should be dropped.
    Discarded,
}

/// What the presentation needs to do to catch up with the tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Nodes in the tree that have no handle yet.
    pub to_create: hashbrown::HashSet<NodeID>,
    /// Handles whose node is no longer in the tree.
    pub to_discard: hashbrown::HashSet<NodeID>,
}
impl Reconciliation {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_discard.is_empty()
    }
}

#[derive(Debug, Default)]
pub(super) struct DisplayCache {
    // Absent means Unrealized.
    states: hashbrown::HashMap<NodeID, DisplayState>,
    stale: bool,
}
impl DisplayCache {
    pub fn state(&self, id: NodeID) -> DisplayState {
        self.states
            .get(&id)
            .copied()
            .unwrap_or(DisplayState::Unrealized)
    }
    pub fn needs_reconcile(&self) -> bool {
        self.stale
    }
    /// The presentation built handles for these.
    pub fn realize(&mut self, ids: impl IntoIterator<Item = NodeID>) {
        for id in ids {
            self.states.insert(id, DisplayState::Live);
        }
    }
    /// Something structural happened. Nothing live can be trusted anymore.
    pub fn invalidate(&mut self) {
        for state in self.states.values_mut() {
            if *state == DisplayState::Live {
                *state = DisplayState::Stale;
            }
        }
        self.stale = true;
    }
    /// Compare the handles the presentation holds against the nodes actually present.
    ///
    /// Everything returned in `to_create` is assumed to be realized by the caller afterwards.
    pub fn reconcile(
        &mut self,
        present: impl Iterator<Item = NodeID>,
        known_live: &hashbrown::HashSet<NodeID>,
    ) -> Reconciliation {
        // Discarded entries have been reported already, forget them.
        self.states
            .retain(|_, state| *state != DisplayState::Discarded);

        let present: hashbrown::HashSet<NodeID> = present.collect();
        let mut reconciliation = Reconciliation::default();
        for id in &present {
            if !known_live.contains(id) {
                reconciliation.to_create.insert(*id);
            }
            self.states.insert(*id, DisplayState::Live);
        }
        for id in known_live {
            if !present.contains(id) {
                reconciliation.to_discard.insert(*id);
                self.states.insert(*id, DisplayState::Discarded);
            }
        }
        // Anything we tracked that neither side knows about is simply gone.
        self.states.retain(|id, state| {
            *state == DisplayState::Discarded || present.contains(id)
        });
        self.stale = false;
        reconciliation
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ids(raw: &[u64]) -> Vec<NodeID> {
        raw.iter().map(|r| NodeID::from_raw(*r).unwrap()).collect()
    }

    #[test]
    fn state_machine() {
        let [a, b, c]: [NodeID; 3] = ids(&[1, 2, 3]).try_into().unwrap();
        let mut cache = DisplayCache::default();
        assert_eq!(cache.state(a), DisplayState::Unrealized);
        cache.realize([a, b]);
        assert_eq!(cache.state(a), DisplayState::Live);

        cache.invalidate();
        assert!(cache.needs_reconcile());
        assert_eq!(cache.state(b), DisplayState::Stale);

        // `b` was removed, `c` is new.
        let live = [a, b].into_iter().collect();
        let result = cache.reconcile([a, c].into_iter(), &live);
        assert_eq!(result.to_create, [c].into_iter().collect());
        assert_eq!(result.to_discard, [b].into_iter().collect());
        assert_eq!(cache.state(a), DisplayState::Live);
        assert_eq!(cache.state(b), DisplayState::Discarded);
        assert_eq!(cache.state(c), DisplayState::Live);
        assert!(!cache.needs_reconcile());

        // Discarded entries don't linger.
        let live = [a, c].into_iter().collect();
        assert!(cache.reconcile([a, c].into_iter(), &live).is_empty());
        assert_eq!(cache.state(b), DisplayState::Unrealized);
    }
}
