// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Delegate: responder trees with delegated native event binding.
//!
//! ## Overview
//!
//! A *responder* mirrors one node of an externally owned UI tree and carries
//! event listeners. Responders form their own tree; a responder that
//! [`listen`](responder::Responders::listen)s becomes the *manager* of its
//! subtree and holds the only native bindings for it, one per event type.
//! Descendants proxy their interest to the manager instead of binding anything
//! themselves.
//!
//! When a native binding fires, [`handle_native`](responder::Responders::handle_native)
//! replays the event across the responder chain, from the responder nearest to
//! the physical target up to the manager, and calls back once per listener.
//!
//! ## Listeners
//!
//! Listeners are registered with a spec string: `"click"` registers a direct
//! listener and `"click li.item"` a delegated one, which fires when the target
//! or one of its ancestors below the responder's node matches the selector.
//! Selector matching is left to the [`NodeTree`](types::NodeTree)
//! implementation.
//!
//! ## Event kinds
//!
//! [`DispatchKind`](kind::DispatchKind) classifies event types:
//!
//! - Bubbling types such as `click` are delegated through an ancestor walk.
//! - Direct types (`load`, `unload`, `error`, `scroll`) are never delegated.
//! - Stale types (`focus`, `blur`, `submit`, `select`, `change`, `reset`) do
//!   not bubble reliably. Managers bind both the plain and the all-descendants
//!   native form, and an [`EventScope`](types::EventScope) suppresses the
//!   duplicate delivery.
//! - `mouseenter` and `mouseleave` are synthesized from `mouseover` and
//!   `mouseout`.
//!
//! ```
//! use understory_delegate::kind::DispatchKind;
//! use understory_delegate::types::EventSpec;
//!
//! let spec = EventSpec::parse("focus input");
//! let kind = DispatchKind::of(spec.event_type);
//! assert_eq!(kind, DispatchKind::Stale);
//! assert!(kind.is_delegable());
//! assert_eq!(
//!     kind.native_types("focus"),
//!     (String::from("focus"), Some(String::from("focus *")))
//! );
//! assert!(!DispatchKind::of("scroll").is_delegable());
//! ```
//!
//! See the [`dispatcher`] module for a complete round trip.
//!
//! ## Collaborators
//!
//! The crate does not own the node tree or the native event system. Provide a
//! [`NodeTree`](types::NodeTree) for structure, selector matching and the
//! node → responder association, a [`NativeEvents`](types::NativeEvents) sink
//! for bindings, and a [`PlatformEvent`](types::PlatformEvent) view of each
//! delivered event.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod dispatcher;
pub mod error;
pub mod kind;
mod listeners;
mod registry;
pub mod responder;
pub mod types;

#[cfg(test)]
mod test_util;

pub use error::{Error, Result};
pub use responder::Responders;
pub use types::{EventScope, Fired, NativeBinding, ResponderId};
