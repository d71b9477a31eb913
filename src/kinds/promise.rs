//! Promise settlement state.
//!
//! The object model tracks the one-way `Pending → Fulfilled | Rejected`
//! transition and the reactions registered while pending. It never runs
//! reaction jobs itself: settling drains the reaction list and hands it to
//! the embedder's job queue.

use crate::error::JsError;
use crate::object::JsObject;
use crate::protocol::KindOps;
use crate::value::{JsObjectRef, JsValue};

/// Promise status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseStatus {
    Pending,
    Fulfilled,
    Rejected,
}

/// Handler pair registered via a `then`-style builtin.
#[derive(Debug, Clone)]
pub struct PromiseReaction {
    pub on_fulfilled: Option<JsObjectRef>,
    pub on_rejected: Option<JsObjectRef>,
}

/// Promise internal state
#[derive(Debug)]
pub struct PromiseState {
    status: PromiseStatus,
    /// Resolved value or rejection reason, once settled.
    result: Option<JsValue>,
    /// Reactions to schedule when the promise settles.
    reactions: Vec<PromiseReaction>,
}

impl PromiseState {
    pub fn new() -> PromiseState {
        PromiseState {
            status: PromiseStatus::Pending,
            result: None,
            reactions: Vec::new(),
        }
    }

    pub fn status(&self) -> PromiseStatus {
        self.status
    }

    pub fn is_settled(&self) -> bool {
        self.status != PromiseStatus::Pending
    }

    pub fn result(&self) -> Option<&JsValue> {
        self.result.as_ref()
    }

    /// Register a reaction. Returns false if the promise is already
    /// settled, in which case the caller schedules the reaction itself.
    pub fn add_reaction(&mut self, reaction: PromiseReaction) -> bool {
        if self.is_settled() {
            return false;
        }
        self.reactions.push(reaction);
        true
    }

    /// Settle as fulfilled. One-way: settling twice is a no-op that drains
    /// nothing. Returns the reactions to schedule.
    pub fn fulfill(&mut self, value: JsValue) -> Vec<PromiseReaction> {
        self.settle(PromiseStatus::Fulfilled, value)
    }

    /// Settle as rejected; same one-way discipline as `fulfill`.
    pub fn reject(&mut self, reason: JsValue) -> Vec<PromiseReaction> {
        self.settle(PromiseStatus::Rejected, reason)
    }

    fn settle(&mut self, status: PromiseStatus, result: JsValue) -> Vec<PromiseReaction> {
        if self.is_settled() {
            return Vec::new();
        }
        self.status = status;
        self.result = Some(result);
        std::mem::take(&mut self.reactions)
    }
}

impl Default for PromiseState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct PromiseOps;

impl KindOps for PromiseOps {
    fn class_name(&self, _obj: &JsObject) -> &'static str {
        "Promise"
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Entry points for builtin implementations
// ═══════════════════════════════════════════════════════════════════════════════

fn with_promise<R>(
    obj: &JsObjectRef,
    f: impl FnOnce(&mut PromiseState) -> R,
) -> Result<R, JsError> {
    let mut o = obj.borrow_mut();
    match o.as_promise_mut() {
        Some(state) => Ok(f(state)),
        None => Err(JsError::type_error("Receiver is not a Promise")),
    }
}

/// Fulfill a promise object, returning the reactions to schedule.
pub fn fulfill(obj: &JsObjectRef, value: JsValue) -> Result<Vec<PromiseReaction>, JsError> {
    with_promise(obj, |state| state.fulfill(value))
}

/// Reject a promise object, returning the reactions to schedule.
pub fn reject_promise(obj: &JsObjectRef, reason: JsValue) -> Result<Vec<PromiseReaction>, JsError> {
    with_promise(obj, |state| state.reject(reason))
}

/// Register a reaction; false means "already settled, schedule it now".
pub fn add_reaction(obj: &JsObjectRef, reaction: PromiseReaction) -> Result<bool, JsError> {
    with_promise(obj, |state| state.add_reaction(reaction))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settlement_is_one_way() {
        let mut state = PromiseState::new();
        assert_eq!(state.status(), PromiseStatus::Pending);

        let drained = state.fulfill(JsValue::Number(1.0));
        assert!(drained.is_empty());
        assert_eq!(state.status(), PromiseStatus::Fulfilled);
        assert_eq!(state.result(), Some(&JsValue::Number(1.0)));

        // A later rejection changes nothing
        state.reject(JsValue::from("nope"));
        assert_eq!(state.status(), PromiseStatus::Fulfilled);
        assert_eq!(state.result(), Some(&JsValue::Number(1.0)));
    }

    #[test]
    fn test_reactions_drain_on_settle() {
        let mut state = PromiseState::new();
        assert!(state.add_reaction(PromiseReaction {
            on_fulfilled: None,
            on_rejected: None,
        }));
        let drained = state.reject(JsValue::from("reason"));
        assert_eq!(drained.len(), 1);

        // Settled promises refuse new pending reactions
        assert!(!state.add_reaction(PromiseReaction {
            on_fulfilled: None,
            on_rejected: None,
        }));
    }
}
