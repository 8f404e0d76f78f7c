// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Listener store: `(type, selector, handler, context)` tuples in
//! registration order.

use alloc::string::String;
use alloc::vec::Vec;

#[derive(Clone, Debug)]
pub(crate) struct Listener<H, C> {
    pub(crate) event_type: String,
    pub(crate) selector: Option<String>,
    pub(crate) handler: H,
    pub(crate) context: Option<C>,
}

impl<H, C> Listener<H, C> {
    fn is_for(&self, event_type: &str, selector: Option<&str>) -> bool {
        self.event_type == event_type && self.selector.as_deref() == selector
    }
}

#[derive(Clone, Debug)]
pub(crate) struct ListenerStore<H, C> {
    entries: Vec<Listener<H, C>>,
}

impl<H, C> Default for ListenerStore<H, C> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<H: PartialEq, C: PartialEq> ListenerStore<H, C> {
    /// Exact registration lookup.
    pub(crate) fn contains(
        &self,
        event_type: &str,
        selector: Option<&str>,
        handler: &H,
        context: Option<&C>,
    ) -> bool {
        self.entries.iter().any(|l| {
            l.is_for(event_type, selector) && l.handler == *handler && l.context.as_ref() == context
        })
    }

    /// Existence query ignoring context; any handler when `handler` is `None`.
    pub(crate) fn has(&self, event_type: &str, selector: Option<&str>, handler: Option<&H>) -> bool {
        self.entries
            .iter()
            .any(|l| l.is_for(event_type, selector) && handler.is_none_or(|h| l.handler == *h))
    }

    pub(crate) fn push(&mut self, listener: Listener<H, C>) {
        self.entries.push(listener);
    }

    /// Remove one exact registration; `false` when none matched.
    pub(crate) fn remove(
        &mut self,
        event_type: &str,
        selector: Option<&str>,
        handler: &H,
        context: Option<&C>,
    ) -> bool {
        let pos = self.entries.iter().position(|l| {
            l.is_for(event_type, selector) && l.handler == *handler && l.context.as_ref() == context
        });
        match pos {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Remove every listener of a type and selector; returns how many went.
    pub(crate) fn remove_all(&mut self, event_type: &str, selector: Option<&str>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|l| !l.is_for(event_type, selector));
        before - self.entries.len()
    }

    /// Remove every listener of a type, direct or delegated.
    pub(crate) fn remove_type(&mut self, event_type: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|l| l.event_type != event_type);
        before - self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Listeners registered for exactly `(event_type, selector)`.
    pub(crate) fn matching<'a>(
        &'a self,
        event_type: &'a str,
        selector: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Listener<H, C>> + 'a {
        self.entries
            .iter()
            .filter(move |l| l.is_for(event_type, selector))
    }
}
