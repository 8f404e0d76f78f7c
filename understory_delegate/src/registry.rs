// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-responder interest bookkeeping.
//!
//! Maps an event type to three explicit counters: direct listeners,
//! delegated listeners per selector, and interest proxied from managed
//! descendants. An entry exists iff at least one counter is nonzero.

use alloc::string::String;
use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::kind::DispatchKind;

/// Interest counts for one event type at one responder.
#[derive(Clone, Debug)]
pub(crate) struct Interest {
    pub(crate) kind: DispatchKind,
    pub(crate) direct: u32,
    /// Ordered by first registration; delegation tests selectors in this order.
    pub(crate) delegated: SmallVec<[(String, u32); 2]>,
    pub(crate) proxied: u32,
}

impl Interest {
    fn new(kind: DispatchKind) -> Self {
        Self {
            kind,
            direct: 0,
            delegated: SmallVec::new(),
            proxied: 0,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.direct == 0 && self.delegated.is_empty() && self.proxied == 0
    }

    pub(crate) fn selectors(&self) -> impl Iterator<Item = &str> + '_ {
        self.delegated.iter().map(|(s, _)| s.as_str())
    }
}

/// Outcome of a counter change that may flip entry existence.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Transition {
    /// The entry was created by this change.
    Created(DispatchKind),
    /// The entry was removed by this change.
    Emptied(DispatchKind),
    /// Existence did not change.
    Unchanged,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Registry {
    entries: HashMap<String, Interest>,
}

impl Registry {
    pub(crate) fn get(&self, event_type: &str) -> Option<&Interest> {
        self.entries.get(event_type)
    }

    /// Event types with an entry, with their kinds.
    pub(crate) fn types(&self) -> impl Iterator<Item = (&str, DispatchKind)> + '_ {
        self.entries.iter().map(|(t, i)| (t.as_str(), i.kind))
    }

    fn entry(&mut self, event_type: &str) -> (&mut Interest, bool) {
        let created = !self.entries.contains_key(event_type);
        let interest = self
            .entries
            .entry_ref(event_type)
            .or_insert_with(|| Interest::new(DispatchKind::of(event_type)));
        (interest, created)
    }

    /// Count one listener, direct when `selector` is `None`.
    pub(crate) fn add_listener(&mut self, event_type: &str, selector: Option<&str>) -> Transition {
        let (interest, created) = self.entry(event_type);
        match selector {
            None => interest.direct += 1,
            Some(sel) => match interest.delegated.iter_mut().find(|(s, _)| s == sel) {
                Some((_, n)) => *n += 1,
                None => interest.delegated.push((sel.into(), 1)),
            },
        }
        if created {
            Transition::Created(interest.kind)
        } else {
            Transition::Unchanged
        }
    }

    /// Uncount one listener; a selector reaching zero is dropped.
    pub(crate) fn remove_listener(
        &mut self,
        event_type: &str,
        selector: Option<&str>,
    ) -> Transition {
        let Some(interest) = self.entries.get_mut(event_type) else {
            return Transition::Unchanged;
        };
        match selector {
            None => interest.direct = interest.direct.saturating_sub(1),
            Some(sel) => {
                if let Some(pos) = interest.delegated.iter().position(|(s, _)| s == sel) {
                    let n = &mut interest.delegated[pos].1;
                    *n -= 1;
                    if *n == 0 {
                        interest.delegated.remove(pos);
                    }
                }
            }
        }
        self.remove_if_empty(event_type)
    }

    /// Zero the direct count and every delegated selector of a type.
    pub(crate) fn clear_listeners(&mut self, event_type: &str) -> Transition {
        let Some(interest) = self.entries.get_mut(event_type) else {
            return Transition::Unchanged;
        };
        interest.direct = 0;
        interest.delegated.clear();
        self.remove_if_empty(event_type)
    }

    /// Drop one delegated selector of a type regardless of its count.
    pub(crate) fn clear_selector(&mut self, event_type: &str, selector: &str) -> Transition {
        let Some(interest) = self.entries.get_mut(event_type) else {
            return Transition::Unchanged;
        };
        interest.delegated.retain(|(s, _)| s != selector);
        self.remove_if_empty(event_type)
    }

    pub(crate) fn proxy(&mut self, event_type: &str) -> Transition {
        let (interest, created) = self.entry(event_type);
        interest.proxied += 1;
        if created {
            Transition::Created(interest.kind)
        } else {
            Transition::Unchanged
        }
    }

    pub(crate) fn unproxy(&mut self, event_type: &str) -> Transition {
        let Some(interest) = self.entries.get_mut(event_type) else {
            return Transition::Unchanged;
        };
        interest.proxied = interest.proxied.saturating_sub(1);
        self.remove_if_empty(event_type)
    }

    fn remove_if_empty(&mut self, event_type: &str) -> Transition {
        match self.entries.get(event_type) {
            Some(interest) if interest.is_empty() => {
                let kind = interest.kind;
                self.entries.remove(event_type);
                Transition::Emptied(kind)
            }
            _ => Transition::Unchanged,
        }
    }
}
