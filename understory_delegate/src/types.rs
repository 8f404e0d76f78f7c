// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types: responder identifiers, collaborator traits, and the records
//! exchanged with the native event system.

use alloc::string::String;
use smallvec::SmallVec;

/// Identifier for a responder (generational).
///
/// Ids of destroyed responders become stale; every query answers as if the
/// responder never existed and every mutation is a no-op.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ResponderId(pub(crate) u32, pub(crate) u32);

impl ResponderId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Parsed `"<type>"` or `"<type> <selector>"` event spec.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EventSpec<'a> {
    /// Event type, e.g. `click`.
    pub event_type: &'a str,
    /// Delegation selector, e.g. `li.item`.
    pub selector: Option<&'a str>,
}

impl<'a> EventSpec<'a> {
    /// Split `spec` at its first space.
    ///
    /// ```
    /// use understory_delegate::types::EventSpec;
    /// let spec = EventSpec::parse("click li.item");
    /// assert_eq!(spec.event_type, "click");
    /// assert_eq!(spec.selector, Some("li.item"));
    /// assert_eq!(EventSpec::parse("click").selector, None);
    /// ```
    pub fn parse(spec: &'a str) -> Self {
        match spec.split_once(' ') {
            Some((event_type, selector)) => {
                let selector = selector.trim();
                Self {
                    event_type,
                    selector: (!selector.is_empty()).then_some(selector),
                }
            }
            None => Self {
                event_type: spec,
                selector: None,
            },
        }
    }
}

/// Externally owned UI tree the responders mirror.
///
/// The tree also stores the node → responder association; at most one
/// responder is associated with a node at a time.
pub trait NodeTree {
    /// Node handle. Must be cheap to copy.
    type Node: Copy + Eq + core::fmt::Debug;

    /// Parent of `node`, or `None` at the root.
    fn parent_of(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Whether `node` matches a delegation `selector`.
    fn matches(&self, node: &Self::Node, selector: &str) -> bool;

    /// Whether `node` is `ancestor` or one of its descendants.
    fn contains(&self, ancestor: &Self::Node, node: &Self::Node) -> bool;

    /// Responder currently associated with `node`.
    fn responder_of(&self, node: &Self::Node) -> Option<ResponderId>;

    /// Associate `responder` with `node`, replacing any previous association.
    fn set_responder(&mut self, node: &Self::Node, responder: ResponderId);

    /// Drop the association of `node`.
    fn clear_responder(&mut self, node: &Self::Node);
}

/// Which responder entry point a native binding feeds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NativeHandler {
    /// Plain delivery, replayed as-is.
    Event,
    /// Non-bubbling delivery: normalized and deduplicated per physical event.
    Stale,
    /// `mouseover`/`mouseout` delivery synthesizing `mouseenter`/`mouseleave`.
    EnterLeave,
}

/// One native binding held by a manager.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NativeBinding {
    /// The listening responder that owns the binding.
    pub manager: ResponderId,
    /// Native type to bind, e.g. `click`, `mouseover` or `focus *`.
    ///
    /// A trailing ` *` asks for the all-descendants form of the type.
    pub native_type: String,
    /// Entry point to call on delivery.
    pub handler: NativeHandler,
}

/// Native event binding primitive.
///
/// When a bound event fires, the native system hands the event and the
/// binding to [`Responders::handle_native`](crate::responder::Responders::handle_native).
/// Failures are the adapter's concern; responders never retry.
pub trait NativeEvents<N> {
    /// Bind `binding` on `node`.
    fn bind(&mut self, node: &N, binding: &NativeBinding);

    /// Undo a previous [`bind`](Self::bind) with an equal binding.
    fn unbind(&mut self, node: &N, binding: &NativeBinding);
}

/// View of a platform event during dispatch.
pub trait PlatformEvent<N> {
    /// Native type of the delivery, e.g. `click` or `focusin`.
    fn event_type(&self) -> &str;

    /// Physical target node.
    fn target(&self) -> N;

    /// Related target for pointer transitions (`mouseover`/`mouseout`).
    fn related_target(&self) -> Option<N>;

    /// Whether a listener asked to stop propagation.
    fn is_propagation_stopped(&self) -> bool;
}

/// Transient metadata for one physical event.
///
/// Create one scope per physical event and pass it to every
/// [`handle_native`](crate::responder::Responders::handle_native) call made
/// for that event, so that enclosing managers resume where inner managers
/// stopped and redelivered non-bubbling events are suppressed.
#[derive(Clone, Debug, Default)]
pub struct EventScope {
    pub(crate) cursor: Option<ResponderId>,
    pub(crate) handled: SmallVec<[ResponderId; 4]>,
}

impl EventScope {
    /// Create an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Responder an enclosing manager resumes replay from, if any.
    pub fn cursor(&self) -> Option<ResponderId> {
        self.cursor
    }

    /// Managers that already processed this event through a stale handler.
    pub fn handled(&self) -> &[ResponderId] {
        &self.handled
    }

    /// Record `manager` as having processed the event; `false` if it already had.
    pub(crate) fn mark_handled(&mut self, manager: ResponderId) -> bool {
        if self.handled.contains(&manager) {
            return false;
        }
        self.handled.push(manager);
        true
    }
}

/// A listener being fired during replay.
#[derive(Debug)]
pub struct Fired<'a, N, H, C> {
    /// Responder the listener is registered on.
    pub responder: ResponderId,
    /// Node handed to the listener: the matched node for delegated
    /// listeners, the responder's node otherwise.
    pub node: N,
    /// Effective event type after normalization.
    pub event_type: &'a str,
    /// Selector the listener was registered with.
    pub selector: Option<&'a str>,
    /// Registered handler.
    pub handler: &'a H,
    /// Registered context.
    pub context: Option<&'a C>,
}

bitflags::bitflags! {
    /// Validation policies applied by [`Responders`](crate::responder::Responders).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Policy: u8 {
        /// `create` fails with [`Error::DuplicateAssociation`](crate::error::Error::DuplicateAssociation)
        /// when the node already carries a responder. When unset the
        /// association is silently overwritten.
        const STRICT_ASSOCIATION = 0b0000_0001;
        /// `on` fails with [`Error::UnsupportedDelegation`](crate::error::Error::UnsupportedDelegation)
        /// for selectors on non-delegable types.
        const STRICT_DELEGATION  = 0b0000_0010;
    }
}

impl Default for Policy {
    /// Association checks follow `debug_assertions`; delegation checks are always on.
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::STRICT_ASSOCIATION | Self::STRICT_DELEGATION
        } else {
            Self::STRICT_DELEGATION
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_selector() {
        let spec = EventSpec::parse("click  ul > li ");
        assert_eq!(spec.event_type, "click");
        assert_eq!(spec.selector, Some("ul > li"));
        assert_eq!(EventSpec::parse("click ").selector, None);
    }

    #[test]
    fn scope_dedups_managers() {
        let mut scope = EventScope::new();
        let a = ResponderId::new(0, 1);
        let b = ResponderId::new(1, 1);
        assert!(scope.mark_handled(a));
        assert!(scope.mark_handled(b));
        assert!(!scope.mark_handled(a));
        assert_eq!(scope.handled(), &[a, b]);
    }

    #[test]
    fn default_policy_always_checks_delegation() {
        assert!(Policy::default().contains(Policy::STRICT_DELEGATION));
    }
}
