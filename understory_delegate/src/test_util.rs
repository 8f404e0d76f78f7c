// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory node tree and native event log shared by the unit tests.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::responder::Responders;
use crate::types::{
    EventScope, NativeBinding, NativeEvents, NativeHandler, NodeTree, PlatformEvent, Policy,
    ResponderId,
};

#[derive(Clone, Debug)]
struct DomNode {
    tag: String,
    classes: Vec<String>,
    parent: Option<usize>,
    responder: Option<ResponderId>,
}

/// Flat tree of tagged nodes; nodes are indices.
#[derive(Clone, Debug, Default)]
pub(crate) struct Dom {
    nodes: Vec<DomNode>,
}

impl Dom {
    pub(crate) fn add(&mut self, parent: Option<usize>, tag: &str, classes: &[&str]) -> usize {
        self.nodes.push(DomNode {
            tag: tag.into(),
            classes: classes.iter().map(|c| String::from(*c)).collect(),
            parent,
            responder: None,
        });
        self.nodes.len() - 1
    }

    pub(crate) fn responder(&self, node: usize) -> Option<ResponderId> {
        self.nodes[node].responder
    }

    pub(crate) fn tag(&self, node: usize) -> &str {
        &self.nodes[node].tag
    }
}

impl NodeTree for Dom {
    type Node = usize;

    fn parent_of(&self, node: &usize) -> Option<usize> {
        self.nodes[*node].parent
    }

    /// Supports `*`, `tag`, `.class` and `tag.class.class`.
    fn matches(&self, node: &usize, selector: &str) -> bool {
        if selector == "*" {
            return true;
        }
        let n = &self.nodes[*node];
        let mut parts = selector.split('.');
        let tag = parts.next().unwrap_or_default();
        (tag.is_empty() || n.tag == tag) && parts.all(|c| n.classes.iter().any(|k| k == c))
    }

    fn contains(&self, ancestor: &usize, node: &usize) -> bool {
        let mut cur = Some(*node);
        while let Some(c) = cur {
            if c == *ancestor {
                return true;
            }
            cur = self.nodes[c].parent;
        }
        false
    }

    fn responder_of(&self, node: &usize) -> Option<ResponderId> {
        self.nodes[*node].responder
    }

    fn set_responder(&mut self, node: &usize, responder: ResponderId) {
        self.nodes[*node].responder = Some(responder);
    }

    fn clear_responder(&mut self, node: &usize) {
        self.nodes[*node].responder = None;
    }
}

/// Records live native bindings.
#[derive(Clone, Debug, Default)]
pub(crate) struct NativeLog {
    pub(crate) bound: Vec<(usize, NativeBinding)>,
    /// Deliver stale bindings twice, like platforms that fire both the plain
    /// and the capturing form for one physical event.
    pub(crate) redeliver: bool,
}

impl NativeLog {
    pub(crate) fn count_on(&self, node: usize) -> usize {
        self.bound.iter().filter(|(n, _)| *n == node).count()
    }

    pub(crate) fn has(&self, node: usize, native_type: &str, handler: NativeHandler) -> bool {
        self.bound
            .iter()
            .any(|(n, b)| *n == node && b.native_type == native_type && b.handler == handler)
    }

    pub(crate) fn binding(&self, node: usize, native_type: &str) -> Option<NativeBinding> {
        self.bound
            .iter()
            .find(|(n, b)| *n == node && b.native_type == native_type)
            .map(|(_, b)| b.clone())
    }
}

impl NativeEvents<usize> for NativeLog {
    fn bind(&mut self, node: &usize, binding: &NativeBinding) {
        self.bound.push((*node, binding.clone()));
    }

    fn unbind(&mut self, node: &usize, binding: &NativeBinding) {
        if let Some(pos) = self
            .bound
            .iter()
            .position(|(n, b)| n == node && b == binding)
        {
            self.bound.remove(pos);
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct TestEvent {
    pub(crate) ty: String,
    pub(crate) target: usize,
    pub(crate) related: Option<usize>,
    pub(crate) stopped: bool,
}

impl PlatformEvent<usize> for TestEvent {
    fn event_type(&self) -> &str {
        &self.ty
    }

    fn target(&self) -> usize {
        self.target
    }

    fn related_target(&self) -> Option<usize> {
        self.related
    }

    fn is_propagation_stopped(&self) -> bool {
        self.stopped
    }
}

/// A physical event to simulate.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Delivery {
    ty: &'static str,
    target: usize,
    related: Option<usize>,
}

impl Delivery {
    pub(crate) fn new(ty: &'static str, target: usize) -> Self {
        Self {
            ty,
            target,
            related: None,
        }
    }

    pub(crate) fn related(mut self, node: usize) -> Self {
        self.related = Some(node);
        self
    }
}

/// Types the simulated platform delivers at the target only.
fn bubbles(ty: &str) -> bool {
    !matches!(
        ty,
        "focus"
            | "blur"
            | "load"
            | "unload"
            | "error"
            | "scroll"
            | "mouseenter"
            | "mouseleave"
    )
}

pub(crate) type TestResponders = Responders<Dom, NativeLog, &'static str, u32>;

#[derive(Debug)]
pub(crate) struct Nodes {
    pub(crate) outer: usize,
    pub(crate) root: usize,
    pub(crate) ul_wrapper: usize,
    pub(crate) ul: usize,
    pub(crate) lis: Vec<usize>,
    pub(crate) form: usize,
    pub(crate) first_input: usize,
    pub(crate) textarea: usize,
    pub(crate) select: usize,
    pub(crate) actions: usize,
}

/// Two overlapping responder trees over one page:
///
/// ```text
/// div.test-wrapper            overlapping
///   div.wrapper
///     div.test                root
///       div.ul-wrapper        list (child of root)
///         ul                  ul (child of overlapping)
///           li.item x4        lis (children of list)
///       div.form-wrapper
///         form                form (child of root)
///           input.first-input
///           input.second-input
///           textarea
///           select > option
///           input.submit
///       div.actions
///         div.button.ok       ok (child of root)
///         div.button.cancel   cancel (child of root)
/// ```
#[derive(Debug)]
pub(crate) struct Fixture {
    pub(crate) r: TestResponders,
    pub(crate) overlapping: ResponderId,
    pub(crate) root: ResponderId,
    pub(crate) list: ResponderId,
    pub(crate) ul: ResponderId,
    pub(crate) lis: Vec<ResponderId>,
    pub(crate) form: ResponderId,
    pub(crate) ok: ResponderId,
    pub(crate) cancel: ResponderId,
    pub(crate) n: Nodes,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self::with_native(NativeLog::default())
    }

    pub(crate) fn with_native(native: NativeLog) -> Self {
        let mut dom = Dom::default();
        let test_wrapper = dom.add(None, "div", &["test-wrapper"]);
        let outer = dom.add(Some(test_wrapper), "div", &["wrapper"]);
        let root = dom.add(Some(outer), "div", &["test"]);
        let ul_wrapper = dom.add(Some(root), "div", &["ul-wrapper"]);
        let ul = dom.add(Some(ul_wrapper), "ul", &[]);
        let lis: Vec<usize> = (0..4).map(|_| dom.add(Some(ul), "li", &["item"])).collect();
        let form_wrapper = dom.add(Some(root), "div", &["form-wrapper"]);
        let form = dom.add(Some(form_wrapper), "form", &[]);
        let first_input = dom.add(Some(form), "input", &["first-input"]);
        dom.add(Some(form), "input", &["second-input"]);
        let textarea = dom.add(Some(form), "textarea", &[]);
        let select = dom.add(Some(form), "select", &[]);
        dom.add(Some(select), "option", &[]);
        dom.add(Some(form), "input", &["submit"]);
        let actions = dom.add(Some(root), "div", &["actions"]);
        let ok = dom.add(Some(actions), "div", &["button", "ok"]);
        let cancel = dom.add(Some(actions), "div", &["button", "cancel"]);

        let mut r = Responders::with_policy(dom, native, Policy::all());
        let overlapping_id = r.create(test_wrapper).unwrap();
        let root_id = r.create(root).unwrap();
        let list_id = r.create(ul_wrapper).unwrap();
        let ul_id = r.create(ul).unwrap();
        let li_ids: Vec<ResponderId> = lis.iter().map(|li| r.create(*li).unwrap()).collect();
        let form_id = r.create(form).unwrap();
        let ok_id = r.create(ok).unwrap();
        let cancel_id = r.create(cancel).unwrap();

        for li in &li_ids {
            r.add_child(list_id, *li);
        }
        for child in [list_id, form_id, ok_id, cancel_id] {
            r.add_child(root_id, child);
        }
        r.add_child(overlapping_id, ul_id);

        Self {
            r,
            overlapping: overlapping_id,
            root: root_id,
            list: list_id,
            ul: ul_id,
            lis: li_ids,
            form: form_id,
            ok: ok_id,
            cancel: cancel_id,
            n: Nodes {
                outer,
                root,
                ul_wrapper,
                ul,
                lis,
                form,
                first_input,
                textarea,
                select,
                actions,
            },
        }
    }

    pub(crate) fn event(&self, ty: &str, target: usize, related: Option<usize>) -> TestEvent {
        TestEvent {
            ty: ty.into(),
            target,
            related,
            stopped: false,
        }
    }

    pub(crate) fn click(&self, target: usize) -> Vec<(&'static str, usize)> {
        self.trigger(Delivery::new("click", target))
    }

    /// Simulate native propagation of one physical event and return the fired
    /// handlers with the node each received.
    ///
    /// Plain bindings fire at the target, and at ancestors for bubbling types.
    /// `"<type> *"` bindings fire at strict ancestors only. Handlers whose
    /// label ends in `!` stop propagation.
    pub(crate) fn trigger(&self, delivery: Delivery) -> Vec<(&'static str, usize)> {
        let mut event = self.event(delivery.ty, delivery.target, delivery.related);
        let mut scope = EventScope::new();
        let mut log = Vec::new();
        let all_descendants = format!("{} *", delivery.ty);
        let native = self.r.native();

        let mut current = Some(delivery.target);
        while let Some(node) = current {
            let at_target = node == delivery.target;
            let bindings: Vec<NativeBinding> = native
                .bound
                .iter()
                .filter(|(n, b)| {
                    *n == node
                        && ((b.native_type == delivery.ty && (at_target || bubbles(delivery.ty)))
                            || (b.native_type == all_descendants && !at_target))
                })
                .map(|(_, b)| b.clone())
                .collect();
            for binding in bindings {
                let times = if native.redeliver && binding.handler == NativeHandler::Stale {
                    2
                } else {
                    1
                };
                for _ in 0..times {
                    self.r
                        .handle_native(&binding, &mut event, &mut scope, |fired, ev| {
                            log.push((*fired.handler, fired.node));
                            ev.stopped |= fired.handler.ends_with('!');
                        });
                }
            }
            if event.stopped {
                break;
            }
            current = self.r.tree().parent_of(&node);
        }
        log
    }
}
