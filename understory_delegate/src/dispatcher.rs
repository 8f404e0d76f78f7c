// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dispatch engine: replay one native delivery across the responder chain.
//!
//! ## Overview
//!
//! A manager holds the only native binding for its subtree. When that binding
//! fires, [`Responders::handle_native`] finds the responder closest to the
//! physical target and replays local handling from there up to the manager:
//!
//! 1. Resolve the origin. If the [`EventScope`] carries a cursor left by an
//!    inner manager, resume from it. Otherwise walk the node tree upward from
//!    the target until a node's responder is managed by this manager; fall
//!    back to the manager itself.
//! 2. Replay. Run local handling on each responder from the origin up to the
//!    manager, checking [`PlatformEvent::is_propagation_stopped`] between
//!    responders.
//! 3. Leave the manager's parent as the cursor, so an enclosing manager picks
//!    up where this one stopped and never reprocesses this subtree.
//!
//! ## Local handling
//!
//! For a bubbling delivery, delegated selectors are tested against every node
//! from the target up to (excluding) the responder's own node. The first
//! node/selector match fires that selector's listeners and ends the walk.
//! Direct listeners fire afterwards, matched or not.
//!
//! For a non-bubbling delivery, a target equal to the responder's node fires
//! the direct listeners only. Any other target is tested as-is against the
//! delegated selectors, and only the first match fires.
//!
//! ## Minimal example
//!
//! ```
//! # use understory_delegate::responder::Responders;
//! # use understory_delegate::types::*;
//! # use std::collections::HashMap;
//! # #[derive(Default)]
//! # struct Tree { parent: Vec<Option<usize>>, tag: Vec<&'static str>, assoc: HashMap<usize, ResponderId> }
//! # impl NodeTree for Tree {
//! #     type Node = usize;
//! #     fn parent_of(&self, n: &usize) -> Option<usize> { self.parent[*n] }
//! #     fn matches(&self, n: &usize, sel: &str) -> bool { self.tag[*n] == sel }
//! #     fn contains(&self, a: &usize, n: &usize) -> bool {
//! #         let mut cur = Some(*n);
//! #         while let Some(c) = cur { if c == *a { return true; } cur = self.parent[c]; }
//! #         false
//! #     }
//! #     fn responder_of(&self, n: &usize) -> Option<ResponderId> { self.assoc.get(n).copied() }
//! #     fn set_responder(&mut self, n: &usize, r: ResponderId) { self.assoc.insert(*n, r); }
//! #     fn clear_responder(&mut self, n: &usize) { self.assoc.remove(n); }
//! # }
//! # #[derive(Default)]
//! # struct Bindings(Vec<(usize, NativeBinding)>);
//! # impl NativeEvents<usize> for Bindings {
//! #     fn bind(&mut self, n: &usize, b: &NativeBinding) { self.0.push((*n, b.clone())); }
//! #     fn unbind(&mut self, n: &usize, b: &NativeBinding) { self.0.retain(|(m, c)| !(m == n && c == b)); }
//! # }
//! # struct Click { target: usize, stopped: bool }
//! # impl PlatformEvent<usize> for Click {
//! #     fn event_type(&self) -> &str { "click" }
//! #     fn target(&self) -> usize { self.target }
//! #     fn related_target(&self) -> Option<usize> { None }
//! #     fn is_propagation_stopped(&self) -> bool { self.stopped }
//! # }
//! // ul (0) > li (1)
//! let tree = Tree {
//!     parent: vec![None, Some(0)],
//!     tag: vec!["ul", "li"],
//!     ..Tree::default()
//! };
//! let mut responders: Responders<Tree, Bindings, &str> =
//!     Responders::new(tree, Bindings::default());
//! let list = responders.create(0).unwrap();
//! let item = responders.create(1).unwrap();
//! responders.add_child(list, item);
//! responders.on(item, "click", "item").unwrap();
//! responders.on(list, "click li", "delegated").unwrap();
//! responders.on(list, "click", "list").unwrap();
//! responders.listen(list);
//!
//! // A single native binding on the list's node serves the whole subtree.
//! assert_eq!(responders.native().0.len(), 1);
//! let (_, binding) = responders.native().0[0].clone();
//!
//! let mut event = Click { target: 1, stopped: false };
//! let mut scope = EventScope::new();
//! let mut fired = Vec::new();
//! responders.handle_native(&binding, &mut event, &mut scope, |f, _| fired.push(*f.handler));
//! assert_eq!(fired, ["item", "delegated", "list"]);
//! ```

use alloc::string::String;

use tracing::trace;

use crate::kind::{normalize_enter_leave, normalize_stale};
use crate::responder::{Responder, Responders};
use crate::types::{
    EventScope, Fired, NativeBinding, NativeEvents, NativeHandler, NodeTree, PlatformEvent,
    ResponderId,
};

/// One replay of a normalized event type inside a manager's domain.
#[derive(Copy, Clone, Debug)]
struct Pass<'a, N> {
    manager: ResponderId,
    event_type: &'a str,
    /// Non-bubbling delivery: delegation tests the target alone.
    tagged: bool,
    target: N,
}

impl<T, B, H, C> Responders<T, B, H, C>
where
    T: NodeTree,
    B: NativeEvents<T::Node>,
    H: PartialEq,
    C: PartialEq,
{
    /// Handle one native delivery for `binding`.
    ///
    /// ## Usage
    ///
    /// - `binding`: the binding the native system fired, as passed to
    ///   [`NativeEvents::bind`].
    /// - `event`: the platform event; listeners may stop its propagation.
    /// - `scope`: transient metadata for this physical event. Reuse the same
    ///   scope for every delivery of one physical event, and a fresh scope for
    ///   the next one.
    /// - `invoke`: called once per fired listener, in replay order.
    ///
    /// Deliveries for bindings whose manager is gone or no longer listening
    /// are ignored. Mutating responders from inside `invoke` is not possible;
    /// defer such changes until dispatch returns.
    pub fn handle_native<E, F>(
        &self,
        binding: &NativeBinding,
        event: &mut E,
        scope: &mut EventScope,
        mut invoke: F,
    ) where
        E: PlatformEvent<T::Node>,
        F: FnMut(&Fired<'_, T::Node, H, C>, &mut E),
    {
        let manager = binding.manager;
        if !self.is_listening(manager) {
            trace!(?manager, "delivery for a released binding");
            return;
        }
        match binding.handler {
            NativeHandler::Event => {
                let event_type = String::from(event.event_type());
                let pass = Pass {
                    manager,
                    event_type: &event_type,
                    tagged: false,
                    target: event.target(),
                };
                self.on_event(pass, event, scope, &mut invoke);
            }
            NativeHandler::Stale => {
                let event_type = String::from(normalize_stale(event.event_type()));
                if !scope.mark_handled(manager) {
                    trace!(?manager, %event_type, "suppressed redelivery");
                    return;
                }
                let pass = Pass {
                    manager,
                    event_type: &event_type,
                    tagged: true,
                    target: event.target(),
                };
                self.on_event(pass, event, scope, &mut invoke);
            }
            NativeHandler::EnterLeave => {
                self.on_enter_leave(manager, event, scope, &mut invoke);
            }
        }
    }

    fn on_event<E, F>(
        &self,
        pass: Pass<'_, T::Node>,
        event: &mut E,
        scope: &mut EventScope,
        invoke: &mut F,
    ) where
        E: PlatformEvent<T::Node>,
        F: FnMut(&Fired<'_, T::Node, H, C>, &mut E),
    {
        let origin = match self.resume_point(pass.manager, scope.cursor) {
            Some(origin) => origin,
            None => self.resolve_origin(pass.manager, pass.target),
        };
        self.replay(pass, origin, event, invoke);
        scope.cursor = self.parent_of(pass.manager);
    }

    /// Emulate `mouseenter`/`mouseleave`: every node between the target and
    /// the related target counts as entered (or left).
    fn on_enter_leave<E, F>(
        &self,
        manager: ResponderId,
        event: &mut E,
        scope: &mut EventScope,
        invoke: &mut F,
    ) where
        E: PlatformEvent<T::Node>,
        F: FnMut(&Fired<'_, T::Node, H, C>, &mut E),
    {
        let event_type = String::from(normalize_enter_leave(event.event_type()));
        let related = event.related_target();
        let manager_node = self.node(manager);
        let mut current = Some(event.target());
        while let Some(el) = current {
            if let Some(rel) = related
                && (rel == el || self.tree.contains(&el, &rel))
            {
                break;
            }
            let pass = Pass {
                manager,
                event_type: &event_type,
                tagged: true,
                target: el,
            };
            let origin = self.resolve_origin(manager, el);
            if self.replay(pass, origin, event, invoke) || Some(el) == manager_node {
                break;
            }
            current = self.tree.parent_of(&el);
        }
        scope.cursor = self.parent_of(manager);
    }

    /// A stored cursor is only honored inside this manager's domain.
    fn resume_point(
        &self,
        manager: ResponderId,
        cursor: Option<ResponderId>,
    ) -> Option<ResponderId> {
        let cursor = cursor?;
        (cursor == manager || self.manager_of(cursor) == Some(manager)).then_some(cursor)
    }

    fn resolve_origin(&self, manager: ResponderId, target: T::Node) -> ResponderId {
        let manager_node = self.node(manager);
        let mut current = Some(target);
        while let Some(node) = current {
            if Some(node) == manager_node {
                break;
            }
            if let Some(id) = self.tree.responder_of(&node)
                && self.manager_of(id) == Some(manager)
            {
                trace!(?manager, origin = ?id, "resolved origin");
                return id;
            }
            current = self.tree.parent_of(&node);
        }
        manager
    }

    /// Run local handling from `origin` up to and including the manager.
    ///
    /// Returns `true` if a listener stopped propagation.
    fn replay<E, F>(
        &self,
        pass: Pass<'_, T::Node>,
        origin: ResponderId,
        event: &mut E,
        invoke: &mut F,
    ) -> bool
    where
        E: PlatformEvent<T::Node>,
        F: FnMut(&Fired<'_, T::Node, H, C>, &mut E),
    {
        let mut current = Some(origin);
        while let Some(id) = current {
            if id == pass.manager {
                break;
            }
            self.handle_local(id, pass, event, invoke);
            if event.is_propagation_stopped() {
                return true;
            }
            current = self.parent_of(id);
        }
        self.handle_local(pass.manager, pass, event, invoke);
        event.is_propagation_stopped()
    }

    fn handle_local<E, F>(
        &self,
        id: ResponderId,
        pass: Pass<'_, T::Node>,
        event: &mut E,
        invoke: &mut F,
    ) where
        E: PlatformEvent<T::Node>,
        F: FnMut(&Fired<'_, T::Node, H, C>, &mut E),
    {
        let Some(r) = self.get(id) else {
            return;
        };
        let Some(interest) = r.registry.get(pass.event_type) else {
            return;
        };
        trace!(responder = ?id, event_type = pass.event_type, "local handling");

        if !(pass.tagged || interest.kind.is_non_bubbling()) {
            let mut candidate = Some(pass.target);
            'walk: while let Some(node) = candidate {
                if node == r.node {
                    break;
                }
                for selector in interest.selectors() {
                    if self.tree.matches(&node, selector) {
                        r.fire(id, pass.event_type, Some(selector), node, event, invoke);
                        break 'walk;
                    }
                }
                candidate = self.tree.parent_of(&node);
            }
            r.fire(id, pass.event_type, None, r.node, event, invoke);
        } else if pass.target == r.node {
            r.fire(id, pass.event_type, None, r.node, event, invoke);
        } else if let Some(selector) = interest
            .selectors()
            .find(|selector| self.tree.matches(&pass.target, selector))
        {
            r.fire(id, pass.event_type, Some(selector), pass.target, event, invoke);
        }
    }
}

impl<N: Copy, H: PartialEq, C: PartialEq> Responder<N, H, C> {
    /// Invoke every listener registered for exactly `(event_type, selector)`.
    fn fire<E, F>(
        &self,
        id: ResponderId,
        event_type: &str,
        selector: Option<&str>,
        node: N,
        event: &mut E,
        invoke: &mut F,
    ) where
        F: FnMut(&Fired<'_, N, H, C>, &mut E),
    {
        for l in self.listeners.matching(event_type, selector) {
            let fired = Fired {
                responder: id,
                node,
                event_type,
                selector,
                handler: &l.handler,
                context: l.context.as_ref(),
            };
            invoke(&fired, event);
        }
    }
}
