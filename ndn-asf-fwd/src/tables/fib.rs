//! FIB (Forwarding Information Base).
//!
//! Maps name prefixes to next-hop faces with a routing cost. Lookup is
//! longest-prefix match: the query name's prefixes are tried from longest to
//! shortest against the registered entries.

use ndn_asf_common::name::Name;
use ndn_asf_common::types::FaceId;
use std::collections::HashMap;

/// A next hop of a FIB entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextHop {
    /// The face to forward to.
    pub face: FaceId,
    /// Routing cost of this route.
    pub cost: u32,
}

/// The Forwarding Information Base.
#[derive(Debug, Default)]
pub struct Fib {
    entries: HashMap<Name, Vec<NextHop>>,
}

impl Fib {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route: `prefix` reachable via `face` at `cost`.
    ///
    /// Re-registering an existing (prefix, face) pair updates its cost.
    pub fn register_route(&mut self, prefix: Name, face: FaceId, cost: u32) {
        let hops = self.entries.entry(prefix).or_default();
        match hops.iter_mut().find(|h| h.face == face) {
            Some(hop) => hop.cost = cost,
            None => hops.push(NextHop { face, cost }),
        }
    }

    /// Removes the route for (prefix, face); drops the entry when it was the
    /// last next hop.
    pub fn unregister_route(&mut self, prefix: &Name, face: FaceId) {
        if let Some(hops) = self.entries.get_mut(prefix) {
            hops.retain(|h| h.face != face);
            if hops.is_empty() {
                self.entries.remove(prefix);
            }
        }
    }

    /// Longest-prefix match for `name`.
    ///
    /// Returns the matched prefix together with its next hops.
    pub fn longest_prefix_match(&self, name: &Name) -> Option<(&Name, &[NextHop])> {
        for len in (0..=name.len()).rev() {
            let prefix = name.prefix(len);
            if let Some((key, hops)) = self.entries.get_key_value(&prefix) {
                return Some((key, hops.as_slice()));
            }
        }
        None
    }

    /// Number of FIB entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    #[test]
    fn longest_prefix_wins() {
        let mut fib = Fib::new();
        fib.register_route(name("/a"), FaceId(1), 10);
        fib.register_route(name("/a/b"), FaceId(2), 10);

        let (prefix, hops) = fib.longest_prefix_match(&name("/a/b/c")).unwrap();
        assert_eq!(prefix, &name("/a/b"));
        assert_eq!(hops[0].face, FaceId(2));

        let (prefix, _) = fib.longest_prefix_match(&name("/a/x")).unwrap();
        assert_eq!(prefix, &name("/a"));

        assert!(fib.longest_prefix_match(&name("/b")).is_none());
    }

    #[test]
    fn root_entry_matches_everything() {
        let mut fib = Fib::new();
        fib.register_route(Name::root(), FaceId(7), 1);
        let (prefix, hops) = fib.longest_prefix_match(&name("/x/y")).unwrap();
        assert!(prefix.is_empty());
        assert_eq!(hops, &[NextHop { face: FaceId(7), cost: 1 }]);
    }

    #[test]
    fn reregistration_updates_cost() {
        let mut fib = Fib::new();
        fib.register_route(name("/a"), FaceId(1), 10);
        fib.register_route(name("/a"), FaceId(1), 5);
        let (_, hops) = fib.longest_prefix_match(&name("/a")).unwrap();
        assert_eq!(hops, &[NextHop { face: FaceId(1), cost: 5 }]);
    }

    #[test]
    fn unregister_drops_empty_entries() {
        let mut fib = Fib::new();
        fib.register_route(name("/a"), FaceId(1), 10);
        fib.unregister_route(&name("/a"), FaceId(1));
        assert!(fib.is_empty());
    }
}
