//! Events and listener bookkeeping.
//!
//! Dispatch itself needs to call into the sandbox, so it is split in two:
//! [`ObjectRef::begin_dispatch`] validates the event and computes the
//! propagation path, the caller invokes the listeners it finds along that
//! path, and [`ObjectRef::finish_dispatch`] closes the dispatch.

use crate::error::HostError;
use crate::object::{ObjectKind, ObjectRef};
use crate::value::HostValue;

/// Event subtype payload.
#[derive(Debug, Clone, PartialEq)]
pub enum EventDetail {
    Plain,
    Keyboard { key: String },
    Mouse { client_x: i32, client_y: i32 },
}

/// Event state.
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: String,
    pub detail: EventDetail,
    pub bubbles: bool,
    pub default_prevented: bool,
    pub(crate) dispatching: bool,
    pub target: Option<ObjectRef>,
    pub current_target: Option<ObjectRef>,
}

impl Event {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            detail: EventDetail::Plain,
            bubbles: false,
            default_prevented: false,
            dispatching: false,
            target: None,
            current_target: None,
        }
    }

    /// Keyboard events bubble.
    pub fn keyboard(event_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            detail: EventDetail::Keyboard { key: key.into() },
            bubbles: true,
            ..Self::new(event_type)
        }
    }

    /// Mouse events bubble.
    pub fn mouse(event_type: impl Into<String>, client_x: i32, client_y: i32) -> Self {
        Self {
            detail: EventDetail::Mouse { client_x, client_y },
            bubbles: true,
            ..Self::new(event_type)
        }
    }

    pub fn with_bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    pub fn class_name(&self) -> &'static str {
        match self.detail {
            EventDetail::Plain => "Event",
            EventDetail::Keyboard { .. } => "KeyboardEvent",
            EventDetail::Mouse { .. } => "MouseEvent",
        }
    }
}

/// A registered listener. `callback` is always a `HostValue::Function`.
#[derive(Clone)]
pub struct Listener {
    pub event_type: String,
    pub callback: HostValue,
}

impl ObjectRef {
    pub fn new_event(event: Event) -> Self {
        ObjectRef::new(ObjectKind::Event(event))
    }

    /// Run `f` against this object's event state.
    pub fn with_event<R>(&self, f: impl FnOnce(&Event) -> R) -> Result<R, HostError> {
        match &self.data().kind {
            ObjectKind::Event(event) => Ok(f(event)),
            _ => Err(HostError::type_error("value is not an Event")),
        }
    }

    fn with_event_mut<R>(&self, f: impl FnOnce(&mut Event) -> R) -> Result<R, HostError> {
        match &mut self.data_mut().kind {
            ObjectKind::Event(event) => Ok(f(event)),
            _ => Err(HostError::type_error("value is not an Event")),
        }
    }

    /// `event.preventDefault()`.
    pub fn prevent_default(&self) -> Result<(), HostError> {
        self.with_event_mut(|event| event.default_prevented = true)
    }

    /// Register a listener. Registering the same callback for the same type
    /// twice is a no-op.
    pub fn add_event_listener(&self, event_type: &str, callback: HostValue) -> Result<(), HostError> {
        if !callback.is_function() {
            return Err(HostError::type_error(
                "addEventListener: parameter 2 is not a function",
            ));
        }
        let mut data = self.data_mut();
        let exists = data
            .listeners
            .iter()
            .any(|l| l.event_type == event_type && l.callback.same_value(&callback));
        if !exists {
            data.listeners.push(Listener {
                event_type: event_type.to_string(),
                callback,
            });
        }
        Ok(())
    }

    /// Unregister a listener; unknown pairs are ignored.
    pub fn remove_event_listener(&self, event_type: &str, callback: &HostValue) {
        self.data_mut()
            .listeners
            .retain(|l| !(l.event_type == event_type && l.callback.same_value(callback)));
    }

    /// Snapshot of the callbacks registered for `event_type`.
    pub fn listeners_for(&self, event_type: &str) -> Vec<HostValue> {
        self.data()
            .listeners
            .iter()
            .filter(|l| l.event_type == event_type)
            .map(|l| l.callback.clone())
            .collect()
    }

    pub fn listener_count(&self) -> usize {
        self.data().listeners.len()
    }

    /// Start dispatching this event at `target`.
    ///
    /// Returns the propagation path: the target, then its ancestors when the
    /// event bubbles. A shadow root's next hop is its host.
    pub fn begin_dispatch(&self, target: &ObjectRef) -> Result<Vec<ObjectRef>, HostError> {
        let bubbles = self.with_event_mut(|event| {
            if event.dispatching {
                return Err(HostError::invalid_state("the event is already being dispatched"));
            }
            event.dispatching = true;
            event.target = Some(target.clone());
            Ok(event.bubbles)
        })??;

        let mut path = vec![target.clone()];
        if bubbles {
            let mut current = next_hop(target);
            while let Some(node) = current {
                current = next_hop(&node);
                path.push(node);
            }
        }
        Ok(path)
    }

    /// Mark `node` as the node whose listeners are currently running.
    pub fn set_current_target(&self, node: Option<&ObjectRef>) -> Result<(), HostError> {
        self.with_event_mut(|event| event.current_target = node.cloned())
    }

    /// End the dispatch. Returns `false` if a listener cancelled the event.
    pub fn finish_dispatch(&self) -> Result<bool, HostError> {
        self.with_event_mut(|event| {
            event.dispatching = false;
            event.current_target = None;
            !event.default_prevented
        })
    }
}

fn next_hop(node: &ObjectRef) -> Option<ObjectRef> {
    let data = node.data();
    if let ObjectKind::ShadowRoot { host, .. } = &data.kind {
        return host.upgrade();
    }
    data.parent.as_ref().and_then(|parent| parent.upgrade())
}
