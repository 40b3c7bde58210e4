//! Minimal promises: `resolve`, `then`, adoption and rejection pass-through.
//!
//! Reactions never run synchronously. Settling a promise turns each
//! callback reaction into a [`Task`] on the microtask queue; the runtime that
//! runs the task settles the derived promise with the callback's outcome.

use crate::error::HostError;
use crate::event_loop::{EventLoop, Task, TaskSource};
use crate::object::{ObjectKind, ObjectRef};
use crate::value::HostValue;

pub enum PromiseState {
    Pending(Vec<Reaction>),
    Fulfilled(HostValue),
    Rejected(HostValue),
}

pub enum Reaction {
    /// Run `callback` on fulfilment and settle `derived` with its result.
    Callback { callback: HostValue, derived: ObjectRef },
    /// Settle `derived` the same way as the source promise.
    Forward(ObjectRef),
}

enum Outcome {
    Fulfilled(HostValue),
    Rejected(HostValue),
}

/// A new pending promise.
pub fn new_promise() -> ObjectRef {
    ObjectRef::new(ObjectKind::Promise(PromiseState::Pending(Vec::new())))
}

/// `Promise.resolve(value)`: promises are returned as-is.
pub fn promise_resolve(value: HostValue, event_loop: &mut EventLoop) -> ObjectRef {
    if let Some(obj) = value.as_object() {
        if obj.is_promise() {
            return obj.clone();
        }
    }
    let promise = new_promise();
    resolve(&promise, value, event_loop);
    promise
}

/// Resolve `promise` with `value`, adopting `value`'s state if it is itself a
/// promise. Settled promises ignore further resolution.
pub fn resolve(promise: &ObjectRef, value: HostValue, event_loop: &mut EventLoop) {
    let source = match value.as_object() {
        Some(obj) if obj.is_promise() => obj.clone(),
        _ => return settle(promise, Outcome::Fulfilled(value), event_loop),
    };
    if source.ptr_eq(promise) {
        let err = HostError::type_error("chaining cycle detected for promise");
        return settle(promise, Outcome::Rejected(err.to_value()), event_loop);
    }

    let outcome = {
        let mut data = source.data_mut();
        match &mut data.kind {
            ObjectKind::Promise(PromiseState::Pending(reactions)) => {
                reactions.push(Reaction::Forward(promise.clone()));
                None
            }
            ObjectKind::Promise(PromiseState::Fulfilled(v)) => Some(Outcome::Fulfilled(v.clone())),
            ObjectKind::Promise(PromiseState::Rejected(v)) => Some(Outcome::Rejected(v.clone())),
            _ => None,
        }
    };
    if let Some(outcome) = outcome {
        settle(promise, outcome, event_loop);
    }
}

/// Reject `promise` with `reason`.
pub fn reject(promise: &ObjectRef, reason: HostValue, event_loop: &mut EventLoop) {
    settle(promise, Outcome::Rejected(reason), event_loop);
}

fn settle(promise: &ObjectRef, outcome: Outcome, event_loop: &mut EventLoop) {
    let reactions = {
        let mut data = promise.data_mut();
        let ObjectKind::Promise(state) = &mut data.kind else {
            return;
        };
        if !matches!(state, PromiseState::Pending(_)) {
            return;
        }
        let settled = match &outcome {
            Outcome::Fulfilled(v) => PromiseState::Fulfilled(v.clone()),
            Outcome::Rejected(v) => PromiseState::Rejected(v.clone()),
        };
        match std::mem::replace(state, settled) {
            PromiseState::Pending(reactions) => reactions,
            _ => Vec::new(),
        }
    };
    for reaction in reactions {
        react(reaction, &outcome, event_loop);
    }
}

fn react(reaction: Reaction, outcome: &Outcome, event_loop: &mut EventLoop) {
    match (reaction, outcome) {
        (Reaction::Callback { callback, derived }, Outcome::Fulfilled(value)) => {
            event_loop.queue_task(Task {
                source: TaskSource::PromiseReaction,
                callback,
                args: vec![value.clone()],
                settles: Some(derived),
            });
        }
        (Reaction::Callback { derived, .. }, Outcome::Rejected(reason)) => {
            reject(&derived, reason.clone(), event_loop);
        }
        (Reaction::Forward(derived), Outcome::Fulfilled(value)) => {
            resolve(&derived, value.clone(), event_loop);
        }
        (Reaction::Forward(derived), Outcome::Rejected(reason)) => {
            reject(&derived, reason.clone(), event_loop);
        }
    }
}

/// `promise.then(callback)`. A non-function callback passes the value
/// through unchanged.
pub fn then(
    promise: &ObjectRef,
    callback: HostValue,
    event_loop: &mut EventLoop,
) -> Result<ObjectRef, HostError> {
    let derived = new_promise();
    let reaction = if callback.is_function() {
        Reaction::Callback {
            callback,
            derived: derived.clone(),
        }
    } else {
        Reaction::Forward(derived.clone())
    };

    let settled = {
        let mut data = promise.data_mut();
        match &mut data.kind {
            ObjectKind::Promise(PromiseState::Pending(reactions)) => {
                reactions.push(reaction);
                return Ok(derived);
            }
            ObjectKind::Promise(PromiseState::Fulfilled(v)) => Outcome::Fulfilled(v.clone()),
            ObjectKind::Promise(PromiseState::Rejected(v)) => Outcome::Rejected(v.clone()),
            _ => return Err(HostError::type_error("value is not a Promise")),
        }
    };
    react(reaction, &settled, event_loop);
    Ok(derived)
}

impl ObjectRef {
    /// Fulfilled value of a settled promise.
    pub fn promise_value(&self) -> Option<HostValue> {
        match &self.data().kind {
            ObjectKind::Promise(PromiseState::Fulfilled(v)) => Some(v.clone()),
            _ => None,
        }
    }

    /// Rejection reason of a rejected promise.
    pub fn promise_reason(&self) -> Option<HostValue> {
        match &self.data().kind {
            ObjectKind::Promise(PromiseState::Rejected(v)) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn is_pending_promise(&self) -> bool {
        matches!(&self.data().kind, ObjectKind::Promise(PromiseState::Pending(_)))
    }
}
