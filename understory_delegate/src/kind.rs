// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Static classification of event types.
//!
//! ## Overview
//!
//! Native event systems disagree on which events bubble. Rather than branching
//! on type strings for every delivered event, each type is classified once into
//! a [`DispatchKind`] when interest in it is first recorded, and the kind is
//! stored alongside the registry counts.
//!
//! | types | kind |
//! |---|---|
//! | `focus`, `blur`, `submit`, `select`, `change`, `reset` | [`DispatchKind::Stale`] |
//! | `load`, `unload`, `error`, `scroll` | [`DispatchKind::Direct`] |
//! | `mouseenter`, `mouseleave` | [`DispatchKind::SyntheticEnterLeave`] |
//! | anything else | [`DispatchKind::Bubbling`] |

use alloc::format;
use alloc::string::String;

use crate::types::NativeHandler;

/// How a type is bound natively and replayed across the responder chain.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DispatchKind {
    /// Bubbles natively; delegated selectors are matched against every
    /// ancestor of the target.
    Bubbling,
    /// Does not bubble and cannot be delegated (`load`, `scroll`, ...).
    Direct,
    /// Does not bubble reliably. Bound on both the exact type and its
    /// all-descendants form, and deduplicated per physical event.
    Stale,
    /// `mouseenter`/`mouseleave`, emulated from `mouseover`/`mouseout`.
    SyntheticEnterLeave,
}

impl DispatchKind {
    /// Classify an event type.
    pub fn of(event_type: &str) -> Self {
        match event_type {
            "focus" | "blur" | "submit" | "select" | "change" | "reset" => Self::Stale,
            "load" | "unload" | "error" | "scroll" => Self::Direct,
            "mouseenter" | "mouseleave" => Self::SyntheticEnterLeave,
            _ => Self::Bubbling,
        }
    }

    /// Whether a selector-qualified listener may be registered for this kind.
    pub fn is_delegable(self) -> bool {
        !matches!(self, Self::Direct)
    }

    /// Whether local handling skips the ancestor walk for this kind.
    ///
    /// Tagged deliveries (stale and enter/leave handlers) are always treated as
    /// non-bubbling; this only answers for untagged deliveries.
    pub fn is_non_bubbling(self) -> bool {
        matches!(self, Self::Direct | Self::Stale)
    }

    /// The native handler that receives deliveries for this kind.
    pub fn handler(self) -> NativeHandler {
        match self {
            Self::Bubbling | Self::Direct => NativeHandler::Event,
            Self::Stale => NativeHandler::Stale,
            Self::SyntheticEnterLeave => NativeHandler::EnterLeave,
        }
    }

    /// Native types that must be bound to observe `event_type`.
    ///
    /// Returns one or two type strings; the second slot is only used by
    /// [`DispatchKind::Stale`] for its all-descendants form.
    pub fn native_types(self, event_type: &str) -> (String, Option<String>) {
        match self {
            Self::Bubbling | Self::Direct => (event_type.into(), None),
            Self::Stale => (event_type.into(), Some(format!("{event_type} *"))),
            Self::SyntheticEnterLeave => {
                let source = match event_type {
                    "mouseenter" => "mouseover",
                    "mouseleave" => "mouseout",
                    other => other,
                };
                (source.into(), None)
            }
        }
    }
}

/// Canonical tag for a type delivered to a stale handler.
///
/// Adapters that expose bubbling equivalents deliver `focusin`/`focusout`;
/// those collapse onto `focus`/`blur`.
pub fn normalize_stale(native_type: &str) -> &str {
    match native_type {
        "focusin" => "focus",
        "focusout" => "blur",
        other => other,
    }
}

/// Canonical tag for a type delivered to an enter/leave handler.
pub fn normalize_enter_leave(native_type: &str) -> &str {
    match native_type {
        "mouseover" => "mouseenter",
        "mouseout" => "mouseleave",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_table() {
        for t in ["focus", "blur", "submit", "select", "change", "reset"] {
            assert_eq!(DispatchKind::of(t), DispatchKind::Stale, "{t}");
        }
        for t in ["load", "unload", "error", "scroll"] {
            assert_eq!(DispatchKind::of(t), DispatchKind::Direct, "{t}");
            assert!(!DispatchKind::of(t).is_delegable(), "{t}");
        }
        assert_eq!(
            DispatchKind::of("mouseenter"),
            DispatchKind::SyntheticEnterLeave
        );
        assert_eq!(DispatchKind::of("click"), DispatchKind::Bubbling);
        // `focusin` bubbles natively; only its normalized form is stale.
        assert_eq!(DispatchKind::of("focusin"), DispatchKind::Bubbling);
    }

    #[test]
    fn native_types_per_kind() {
        assert_eq!(
            DispatchKind::Stale.native_types("change"),
            ("change".into(), Some("change *".into()))
        );
        assert_eq!(
            DispatchKind::SyntheticEnterLeave.native_types("mouseleave"),
            ("mouseout".into(), None)
        );
        assert_eq!(
            DispatchKind::Bubbling.native_types("click"),
            ("click".into(), None)
        );
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_stale("focusin"), "focus");
        assert_eq!(normalize_stale("focusout"), "blur");
        assert_eq!(normalize_stale("change"), "change");
        assert_eq!(normalize_enter_leave("mouseover"), "mouseenter");
        assert_eq!(normalize_enter_leave("mouseout"), "mouseleave");
    }
}
