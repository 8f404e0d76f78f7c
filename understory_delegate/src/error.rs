// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors raised by the fallible responder operations.
//!
//! Only [`Responders::create`](crate::responder::Responders::create) and
//! [`Responders::on`](crate::responder::Responders::on) can fail. Every other
//! operation is total: stale ids, unknown children and unregistered listeners
//! are silently ignored.

use alloc::string::String;

/// Errors returned by [`Responders`](crate::responder::Responders).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The node already carries a responder.
    ///
    /// Only raised while [`Policy::STRICT_ASSOCIATION`](crate::types::Policy::STRICT_ASSOCIATION)
    /// is set.
    #[error("a responder is already associated with the node")]
    DuplicateAssociation,

    /// A selector was supplied for an event type that cannot be delegated.
    #[error("event of type \"{event_type}\" can't be delegated, attach it directly instead")]
    UnsupportedDelegation {
        /// The offending event type.
        event_type: String,
    },

    /// The responder id no longer refers to a live responder.
    #[error("the responder has been destroyed")]
    StaleResponder,
}

/// Shorthand result type for responder operations.
pub type Result<T, E = Error> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn messages_name_the_event_type() {
        let err = Error::UnsupportedDelegation {
            event_type: "scroll".into(),
        };
        assert_eq!(
            err.to_string(),
            "event of type \"scroll\" can't be delegated, attach it directly instead"
        );
    }
}
