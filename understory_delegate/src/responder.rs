// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Responder arena: tree links, manager resolution, and listener registration.
//!
//! ## Overview
//!
//! Every responder tracks one node of the external tree. Responders form their
//! own tree through [`Responders::add_child`]; the responder tree usually
//! mirrors a subset of the node tree but does not have to.
//!
//! ## Managers
//!
//! Calling [`Responders::listen`] turns a responder into a *manager*: it binds
//! one native handler per event type on its own node, and every non-listening
//! descendant forwards (proxies) its interest to it instead of binding
//! anything. A responder that is already listening is an *island*: an
//! ancestor's `listen` leaves it and its subtree alone.
//!
//! Interest is reference counted per type. A manager binds a type when its
//! first interest appears and unbinds it when the last one goes, so the number
//! of native bindings never depends on how many descendants registered.
//!
//! ## Unlisten
//!
//! [`Responders::unlisten`] releases every managed descendant. Descendants are
//! not handed over to a manager further up; they stay unmanaged until a
//! responder above them listens again or they are re-parented.

use alloc::string::String;
use alloc::vec::Vec;

use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::kind::DispatchKind;
use crate::listeners::{Listener, ListenerStore};
use crate::registry::{Registry, Transition};
use crate::types::{EventSpec, NativeBinding, NativeEvents, NodeTree, Policy, ResponderId};

#[derive(Clone, Debug)]
pub(crate) struct Responder<N, H, C> {
    generation: u32,
    pub(crate) node: N,
    pub(crate) parent: Option<ResponderId>,
    pub(crate) children: Vec<ResponderId>,
    pub(crate) manager: Option<ResponderId>,
    pub(crate) listening: bool,
    pub(crate) registry: Registry,
    pub(crate) listeners: ListenerStore<H, C>,
}

impl<N, H, C> Responder<N, H, C> {
    fn new(generation: u32, node: N) -> Self {
        Self {
            generation,
            node,
            parent: None,
            children: Vec::new(),
            manager: None,
            listening: false,
            registry: Registry::default(),
            listeners: ListenerStore::default(),
        }
    }
}

/// Arena of responders sharing one node tree and one native event system.
///
/// ## Usage
///
/// - [`Responders::create`] a responder per tracked node.
/// - Link them with [`Responders::add_child`].
/// - Register listeners with [`Responders::on`] using `"type"` or
///   `"type selector"` specs.
/// - Call [`Responders::listen`] on the responder that should own the native
///   bindings for its subtree.
/// - Forward native deliveries to [`Responders::handle_native`].
///
/// `H` is the stored handler and `C` the optional listener context. Two
/// registrations are the same listener when type, selector, handler and
/// context all compare equal.
pub struct Responders<T: NodeTree, B, H, C = ()> {
    pub(crate) tree: T,
    pub(crate) native: B,
    policy: Policy,
    slots: Vec<Option<Responder<T::Node, H, C>>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
}

impl<T: NodeTree, B, H, C> core::fmt::Debug for Responders<T, B, H, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Responders")
            .field("policy", &self.policy)
            .field("live", &(self.slots.len() - self.free_list.len()))
            .finish_non_exhaustive()
    }
}

impl<T, B, H, C> Responders<T, B, H, C>
where
    T: NodeTree,
    B: NativeEvents<T::Node>,
    H: PartialEq,
    C: PartialEq,
{
    /// Create an empty arena with the default [`Policy`].
    pub fn new(tree: T, native: B) -> Self {
        Self::with_policy(tree, native, Policy::default())
    }

    /// Create an empty arena with an explicit [`Policy`].
    pub fn with_policy(tree: T, native: B, policy: Policy) -> Self {
        Self {
            tree,
            native,
            policy,
            slots: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Current validation policy.
    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Replace the validation policy.
    pub fn set_policy(&mut self, policy: Policy) {
        self.policy = policy;
    }

    /// The node tree adapter.
    pub fn tree(&self) -> &T {
        &self.tree
    }

    /// Mutable access to the node tree adapter.
    ///
    /// Changing responder associations behind the arena's back is unsupported.
    pub fn tree_mut(&mut self) -> &mut T {
        &mut self.tree
    }

    /// The native event adapter.
    pub fn native(&self) -> &B {
        &self.native
    }

    /// Mutable access to the native event adapter.
    pub fn native_mut(&mut self) -> &mut B {
        &mut self.native
    }

    /// Number of live responders.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    /// Whether no responder is alive.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `id` refers to a live responder.
    pub fn is_alive(&self, id: ResponderId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn get(&self, id: ResponderId) -> Option<&Responder<T::Node, H, C>> {
        self.slots
            .get(id.idx())?
            .as_ref()
            .filter(|r| r.generation == id.1)
    }

    fn get_mut(&mut self, id: ResponderId) -> Option<&mut Responder<T::Node, H, C>> {
        self.slots
            .get_mut(id.idx())?
            .as_mut()
            .filter(|r| r.generation == id.1)
    }

    /// Create a responder bound to `node`.
    ///
    /// Fails with [`Error::DuplicateAssociation`] if the node already carries
    /// a live responder and [`Policy::STRICT_ASSOCIATION`] is set.
    pub fn create(&mut self, node: T::Node) -> Result<ResponderId> {
        if let Some(existing) = self.tree.responder_of(&node)
            && self.is_alive(existing)
        {
            if self.policy.contains(Policy::STRICT_ASSOCIATION) {
                return Err(Error::DuplicateAssociation);
            }
            debug!(?node, ?existing, "overwriting responder association");
        }

        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.slots[idx] = Some(Responder::new(generation, node));
            (idx, generation)
        } else {
            let generation = 1_u32;
            self.slots.push(Some(Responder::new(generation, node)));
            self.generations.push(generation);
            (self.slots.len() - 1, generation)
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "ResponderId uses 32-bit indices by design."
        )]
        let id = ResponderId::new(idx as u32, generation);
        self.tree.set_responder(&node, id);
        debug!(?node, ?id, "created responder");
        Ok(id)
    }

    /// Node the responder is bound to.
    pub fn node(&self, id: ResponderId) -> Option<T::Node> {
        self.get(id).map(|r| r.node)
    }

    /// Parent responder, or `None` for roots and stale ids.
    pub fn parent_of(&self, id: ResponderId) -> Option<ResponderId> {
        self.get(id).and_then(|r| r.parent)
    }

    /// Children in insertion order, or an empty slice for stale ids.
    pub fn children_of(&self, id: ResponderId) -> &[ResponderId] {
        self.get(id).map(|r| r.children.as_slice()).unwrap_or(&[])
    }

    /// The manager holding native bindings on behalf of `id`.
    pub fn manager_of(&self, id: ResponderId) -> Option<ResponderId> {
        self.get(id).and_then(|r| r.manager)
    }

    /// Whether `id` owns native bindings.
    pub fn is_listening(&self, id: ResponderId) -> bool {
        self.get(id).is_some_and(|r| r.listening)
    }

    /// Whether a manager currently proxies the events of `id`.
    pub fn has_manager(&self, id: ResponderId) -> bool {
        self.manager_of(id).is_some()
    }

    // --- registration ---

    /// Register `handler` for `spec` (`"type"` or `"type selector"`).
    ///
    /// Registering the same listener twice is a no-op. Fails with
    /// [`Error::UnsupportedDelegation`] when a selector is given for a type
    /// that cannot be delegated, leaving every state untouched.
    pub fn on(&mut self, id: ResponderId, spec: &str, handler: H) -> Result<()> {
        self.register(id, spec, handler, None)
    }

    /// Like [`on`](Self::on), with a context stored alongside the handler.
    pub fn on_with(&mut self, id: ResponderId, spec: &str, handler: H, context: C) -> Result<()> {
        self.register(id, spec, handler, Some(context))
    }

    fn register(
        &mut self,
        id: ResponderId,
        spec: &str,
        handler: H,
        context: Option<C>,
    ) -> Result<()> {
        let EventSpec {
            event_type,
            selector,
        } = EventSpec::parse(spec);
        let policy = self.policy;
        let r = self.get_mut(id).ok_or(Error::StaleResponder)?;
        if event_type.is_empty()
            || r.listeners
                .contains(event_type, selector, &handler, context.as_ref())
        {
            return Ok(());
        }
        if selector.is_some()
            && policy.contains(Policy::STRICT_DELEGATION)
            && !DispatchKind::of(event_type).is_delegable()
        {
            return Err(Error::UnsupportedDelegation {
                event_type: event_type.into(),
            });
        }

        r.listeners.push(Listener {
            event_type: event_type.into(),
            selector: selector.map(Into::into),
            handler,
            context,
        });
        if let Transition::Created(kind) = r.registry.add_listener(event_type, selector) {
            self.publish(id, event_type, kind);
        }
        Ok(())
    }

    /// Remove every listener and release every native binding or proxy link
    /// held for them.
    pub fn off_all(&mut self, id: ResponderId) {
        let Some(r) = self.get_mut(id) else {
            return;
        };
        r.listeners.clear();
        let types: Vec<String> = r.registry.types().map(|(t, _)| t.into()).collect();
        for event_type in types {
            self.settle(id, &event_type, |reg| reg.clear_listeners(&event_type));
        }
    }

    /// Remove every listener of `spec`.
    ///
    /// A bare type removes its direct and delegated listeners; a
    /// `"type selector"` spec removes only the listeners of that selector.
    pub fn off_event(&mut self, id: ResponderId, spec: &str) {
        let EventSpec {
            event_type,
            selector,
        } = EventSpec::parse(spec);
        let Some(r) = self.get_mut(id) else {
            return;
        };
        match selector {
            Some(sel) => {
                r.listeners.remove_all(event_type, Some(sel));
                self.settle(id, event_type, |reg| reg.clear_selector(event_type, sel));
            }
            None => {
                r.listeners.remove_type(event_type);
                self.settle(id, event_type, |reg| reg.clear_listeners(event_type));
            }
        }
    }

    /// Remove the one registration of `handler` for `spec` that has no context.
    pub fn off(&mut self, id: ResponderId, spec: &str, handler: &H) {
        self.unregister(id, spec, handler, None);
    }

    /// Remove the one registration of `handler` for `spec` with `context`.
    pub fn off_with(&mut self, id: ResponderId, spec: &str, handler: &H, context: &C) {
        self.unregister(id, spec, handler, Some(context));
    }

    fn unregister(&mut self, id: ResponderId, spec: &str, handler: &H, context: Option<&C>) {
        let EventSpec {
            event_type,
            selector,
        } = EventSpec::parse(spec);
        let Some(r) = self.get_mut(id) else {
            return;
        };
        if r.listeners.remove(event_type, selector, handler, context) {
            self.settle(id, event_type, |reg| {
                reg.remove_listener(event_type, selector)
            });
        }
    }

    /// Whether a listener is registered for exactly `spec`.
    ///
    /// With `handler` set, only that handler counts. Interest proxied from
    /// descendants is not reported.
    pub fn has_listener(&self, id: ResponderId, spec: &str, handler: Option<&H>) -> bool {
        let EventSpec {
            event_type,
            selector,
        } = EventSpec::parse(spec);
        self.get(id)
            .is_some_and(|r| r.listeners.has(event_type, selector, handler))
    }

    /// Apply a registry change and release the type if it emptied.
    fn settle(
        &mut self,
        id: ResponderId,
        event_type: &str,
        change: impl FnOnce(&mut Registry) -> Transition,
    ) {
        let Some(r) = self.get_mut(id) else {
            return;
        };
        if let Transition::Emptied(kind) = change(&mut r.registry) {
            self.retract(id, event_type, kind);
        }
    }

    /// First interest in `event_type` at `id`: proxy it or bind it.
    fn publish(&mut self, id: ResponderId, event_type: &str, kind: DispatchKind) {
        let Some((manager, listening)) = self.get(id).map(|r| (r.manager, r.listening)) else {
            return;
        };
        if let Some(manager) = manager {
            self.proxy_event(manager, event_type);
        } else if listening {
            self.attach(id, event_type, kind);
        }
    }

    /// Last interest in `event_type` at `id` is gone: unproxy it or unbind it.
    fn retract(&mut self, id: ResponderId, event_type: &str, kind: DispatchKind) {
        let Some((manager, listening)) = self.get(id).map(|r| (r.manager, r.listening)) else {
            return;
        };
        if let Some(manager) = manager {
            self.unproxy_event(manager, event_type);
        } else if listening {
            self.detach(id, event_type, kind);
        }
    }

    // --- tree ---

    /// Add `child` under `parent`.
    ///
    /// No-op when `child` already is a child of `parent`, or when the link
    /// would create a cycle. A child with another parent is moved. The child
    /// subtree adopts `parent`'s manager, or `parent` itself if it listens.
    pub fn add_child(&mut self, parent: ResponderId, child: ResponderId) {
        if parent == child || !self.is_alive(child) {
            return;
        }
        let Some(p) = self.get(parent) else {
            return;
        };
        if p.children.contains(&child) {
            return;
        }
        if self.is_ancestor(child, parent) {
            warn!(?parent, ?child, "refusing to add an ancestor as child");
            return;
        }
        if let Some(old) = self.parent_of(child) {
            self.remove_child(old, child);
        }

        let Some(p) = self.get_mut(parent) else {
            return;
        };
        p.children.push(child);
        let (manager, listening) = (p.manager, p.listening);
        if let Some(c) = self.get_mut(child) {
            c.parent = Some(parent);
        }
        if let Some(manager) = manager {
            self.set_manager(child, manager);
        } else if listening {
            self.set_manager(child, parent);
        }
    }

    /// Remove `child` from `parent`, releasing the child subtree from its manager.
    pub fn remove_child(&mut self, parent: ResponderId, child: ResponderId) {
        let Some(p) = self.get_mut(parent) else {
            return;
        };
        let Some(pos) = p.children.iter().position(|c| *c == child) else {
            return;
        };
        p.children.remove(pos);
        if let Some(c) = self.get_mut(child) {
            c.parent = None;
        }
        self.unset_manager(child);
    }

    /// Remove every child of `parent`.
    pub fn remove_children(&mut self, parent: ResponderId) {
        let Some(p) = self.get_mut(parent) else {
            return;
        };
        let children = core::mem::take(&mut p.children);
        for child in children {
            if let Some(c) = self.get_mut(child) {
                c.parent = None;
            }
            self.unset_manager(child);
        }
    }

    /// Whether `child` is a direct child of `parent`.
    pub fn has_child(&self, parent: ResponderId, child: ResponderId) -> bool {
        self.get(parent).is_some_and(|p| p.children.contains(&child))
    }

    fn is_ancestor(&self, ancestor: ResponderId, of: ResponderId) -> bool {
        let mut cur = self.parent_of(of);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.parent_of(id);
        }
        false
    }

    // --- managers ---

    /// Become the manager of the non-island subtree and bind every known type.
    pub fn listen(&mut self, id: ResponderId) {
        match self.get(id) {
            Some(r) if !r.listening => {}
            _ => return,
        }
        self.unset_manager(id);
        let children = self.children_of(id).to_vec();
        for child in children {
            self.set_manager(child, id);
        }
        let types = self.types_of(id);
        for (event_type, kind) in &types {
            self.attach(id, event_type, *kind);
        }
        if let Some(r) = self.get_mut(id) {
            r.listening = true;
        }
        debug!(?id, types = types.len(), "listening");
    }

    /// Release the managed subtree and drop every native binding.
    pub fn unlisten(&mut self, id: ResponderId) {
        match self.get(id) {
            Some(r) if r.listening => {}
            _ => return,
        }
        let children = self.children_of(id).to_vec();
        for child in children {
            self.unset_manager(child);
        }
        for (event_type, kind) in self.types_of(id) {
            self.detach(id, &event_type, kind);
        }
        if let Some(r) = self.get_mut(id) {
            r.listening = false;
        }
        debug!(?id, "stopped listening");
    }

    fn types_of(&self, id: ResponderId) -> Vec<(String, DispatchKind)> {
        self.get(id)
            .map(|r| r.registry.types().map(|(t, k)| (t.into(), k)).collect())
            .unwrap_or_default()
    }

    fn set_manager(&mut self, id: ResponderId, manager: ResponderId) {
        let Some(r) = self.get(id) else {
            return;
        };
        // Islands keep managing themselves.
        if r.listening || r.manager == Some(manager) {
            return;
        }
        if r.manager.is_some() {
            self.unset_manager(id);
        }
        if let Some(r) = self.get_mut(id) {
            r.manager = Some(manager);
        }
        let children = self.children_of(id).to_vec();
        for child in children {
            self.set_manager(child, manager);
        }
        for (event_type, _) in self.types_of(id) {
            self.proxy_event(manager, &event_type);
        }
    }

    fn unset_manager(&mut self, id: ResponderId) {
        let Some(manager) = self.manager_of(id) else {
            return;
        };
        for (event_type, _) in self.types_of(id) {
            self.unproxy_event(manager, &event_type);
        }
        let children = self.children_of(id).to_vec();
        for child in children {
            self.unset_manager(child);
        }
        if let Some(r) = self.get_mut(id) {
            r.manager = None;
        }
    }

    fn proxy_event(&mut self, manager: ResponderId, event_type: &str) {
        let Some(m) = self.get_mut(manager) else {
            return;
        };
        if m.manager.is_some() {
            return;
        }
        let transition = m.registry.proxy(event_type);
        let listening = m.listening;
        trace!(?manager, event_type, "proxied");
        if let Transition::Created(kind) = transition
            && listening
        {
            self.attach(manager, event_type, kind);
        }
    }

    fn unproxy_event(&mut self, manager: ResponderId, event_type: &str) {
        let Some(m) = self.get_mut(manager) else {
            return;
        };
        if m.manager.is_some() {
            return;
        }
        let transition = m.registry.unproxy(event_type);
        let listening = m.listening;
        trace!(?manager, event_type, "unproxied");
        if let Transition::Emptied(kind) = transition
            && listening
        {
            self.detach(manager, event_type, kind);
        }
    }

    fn bindings(id: ResponderId, event_type: &str, kind: DispatchKind) -> Vec<NativeBinding> {
        let (primary, secondary) = kind.native_types(event_type);
        let handler = kind.handler();
        core::iter::once(primary)
            .chain(secondary)
            .map(|native_type| NativeBinding {
                manager: id,
                native_type,
                handler,
            })
            .collect()
    }

    fn attach(&mut self, id: ResponderId, event_type: &str, kind: DispatchKind) {
        let Some(node) = self.node(id) else {
            return;
        };
        for binding in Self::bindings(id, event_type, kind) {
            debug!(?id, native_type = %binding.native_type, "bind");
            self.native.bind(&node, &binding);
        }
    }

    fn detach(&mut self, id: ResponderId, event_type: &str, kind: DispatchKind) {
        let Some(node) = self.node(id) else {
            return;
        };
        for binding in Self::bindings(id, event_type, kind) {
            debug!(?id, native_type = %binding.native_type, "unbind");
            self.native.unbind(&node, &binding);
        }
    }

    // --- lifecycle ---

    /// Tear the responder down: listeners, children, manager link or native
    /// bindings, parent link, and node association. Idempotent.
    pub fn destroy(&mut self, id: ResponderId) {
        if !self.is_alive(id) {
            return;
        }
        self.off_all(id);
        self.remove_children(id);
        if self.has_manager(id) {
            self.unset_manager(id);
        } else {
            self.unlisten(id);
        }
        if let Some(parent) = self.parent_of(id) {
            self.remove_child(parent, id);
        }
        let Some(node) = self.node(id) else {
            return;
        };
        if self.tree.responder_of(&node) == Some(id) {
            self.tree.clear_responder(&node);
        }
        self.slots[id.idx()] = None;
        self.free_list.push(id.idx());
        debug!(?id, ?node, "destroyed responder");
    }
}
