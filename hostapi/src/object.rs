//! Host objects.
//!
//! Every reference-typed host value is an [`ObjectRef`]: a shared handle to a
//! [`HostObject`] whose mutable state lives behind a `RefCell`. Identity is
//! pointer identity. Tree links point down strongly (`children`) and up
//! weakly (`parent`), so dropping the last outside handle to a detached
//! subtree frees it.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::event::{Event, Listener};
use crate::kind::HostKind;
use crate::promise::PromiseState;
use crate::value::HostValue;

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// XHTML namespace; elements created with `create_element` live here.
pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
/// SVG namespace.
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Shadow root encapsulation mode.
///
/// The discriminants are the wire values of the `attach_shadow` import,
/// matching the host's `["open", "closed"]` enumeration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ShadowRootMode {
    Open = 0,
    Closed = 1,
}

impl ShadowRootMode {
    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Open),
            1 => Some(Self::Closed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// A single element attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub namespace: Option<String>,
    /// Qualified name (`prefix:local` or `local`).
    pub name: String,
    pub local_name: String,
    pub value: String,
}

/// Element-specific state.
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub local_name: String,
    pub attributes: Vec<Attribute>,
    pub shadow_root: Option<ObjectRef>,
    /// Form control state (`value`, `disabled`, `checked`).
    pub value: String,
    pub disabled: bool,
    pub checked: bool,
}

impl Element {
    /// True when this element is in the HTML namespace.
    pub fn is_html(&self) -> bool {
        self.namespace.as_deref() == Some(HTML_NAMESPACE)
    }

    /// The qualified name (`prefix:local` or `local`).
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local_name),
            None => self.local_name.clone(),
        }
    }
}

/// Deadline handed to idle callbacks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdleDeadline {
    pub did_timeout: bool,
    pub time_remaining: f64,
}

/// The closed set of host object shapes.
pub enum ObjectKind {
    Window,
    Document,
    Element(Element),
    Text(String),
    Comment(String),
    DocumentFragment,
    ShadowRoot {
        mode: ShadowRootMode,
        host: WeakObjectRef,
    },
    Event(Event),
    Promise(PromiseState),
    Performance,
    IdleDeadline(IdleDeadline),
    Error {
        name: String,
        message: String,
    },
    Plain,
}

/// Mutable state of a host object.
pub struct ObjectData {
    pub kind: ObjectKind,
    pub(crate) parent: Option<WeakObjectRef>,
    pub(crate) children: Vec<ObjectRef>,
    pub(crate) listeners: Vec<Listener>,
    pub properties: BTreeMap<String, HostValue>,
}

pub struct HostObject {
    id: u64,
    data: RefCell<ObjectData>,
}

/// Shared, identity-compared handle to a host object.
#[derive(Clone)]
pub struct ObjectRef(Rc<HostObject>);

/// Non-owning handle; used for parent and shadow-host links.
#[derive(Clone, Default)]
pub struct WeakObjectRef(Weak<HostObject>);

impl WeakObjectRef {
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.0.upgrade().map(ObjectRef)
    }
}

impl ObjectRef {
    /// Allocate a new host object.
    pub fn new(kind: ObjectKind) -> Self {
        let id = NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed);
        Self(Rc::new(HostObject {
            id,
            data: RefCell::new(ObjectData {
                kind,
                parent: None,
                children: Vec::new(),
                listeners: Vec::new(),
                properties: BTreeMap::new(),
            }),
        }))
    }

    /// Process-unique object id (diagnostics only).
    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef(Rc::downgrade(&self.0))
    }

    /// Number of strong handles; lets tests observe host-side releases.
    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub fn data(&self) -> Ref<'_, ObjectData> {
        self.0.data.borrow()
    }

    pub fn data_mut(&self) -> RefMut<'_, ObjectData> {
        self.0.data.borrow_mut()
    }

    pub fn is_window(&self) -> bool {
        matches!(self.data().kind, ObjectKind::Window)
    }

    pub fn is_document(&self) -> bool {
        matches!(self.data().kind, ObjectKind::Document)
    }

    pub fn is_element(&self) -> bool {
        matches!(self.data().kind, ObjectKind::Element(_))
    }

    pub fn is_promise(&self) -> bool {
        matches!(self.data().kind, ObjectKind::Promise(_))
    }

    pub fn is_event(&self) -> bool {
        matches!(self.data().kind, ObjectKind::Event(_))
    }

    /// True for every object that participates in the node tree.
    pub fn is_node(&self) -> bool {
        matches!(
            self.data().kind,
            ObjectKind::Document
                | ObjectKind::Element(_)
                | ObjectKind::Text(_)
                | ObjectKind::Comment(_)
                | ObjectKind::DocumentFragment
                | ObjectKind::ShadowRoot { .. }
        )
    }

    /// Read a generic property. Missing properties are `undefined`.
    pub fn property(&self, name: &str) -> HostValue {
        self.data().properties.get(name).cloned().unwrap_or_default()
    }

    /// Write a generic property.
    pub fn set_property(&self, name: &str, value: HostValue) {
        self.data_mut().properties.insert(name.to_string(), value);
    }

    /// Read an idle deadline's fields.
    pub fn idle_deadline(&self) -> Option<IdleDeadline> {
        match &self.data().kind {
            ObjectKind::IdleDeadline(deadline) => Some(*deadline),
            _ => None,
        }
    }

    /// The host class name (`[object ClassName]`).
    pub fn class_name(&self) -> String {
        let data = self.data();
        match &data.kind {
            ObjectKind::Window => "Window".to_string(),
            ObjectKind::Document => "HTMLDocument".to_string(),
            ObjectKind::Element(element) => element_class_name(element).to_string(),
            ObjectKind::Text(_) => "Text".to_string(),
            ObjectKind::Comment(_) => "Comment".to_string(),
            ObjectKind::DocumentFragment => "DocumentFragment".to_string(),
            ObjectKind::ShadowRoot { .. } => "ShadowRoot".to_string(),
            ObjectKind::Event(event) => event.class_name().to_string(),
            ObjectKind::Promise(_) => "Promise".to_string(),
            ObjectKind::Performance => "Performance".to_string(),
            ObjectKind::IdleDeadline(_) => "IdleDeadline".to_string(),
            ObjectKind::Error { name, .. } => name.clone(),
            ObjectKind::Plain => "Object".to_string(),
        }
    }
}

fn element_class_name(element: &Element) -> &'static str {
    match element.namespace.as_deref() {
        Some(HTML_NAMESPACE) => HostKind::for_html_tag(&element.local_name)
            .map(HostKind::class_name)
            .unwrap_or("HTMLElement"),
        Some(SVG_NAMESPACE) => "SVGElement",
        _ => "Element",
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.data.try_borrow() {
            Ok(_) => write!(f, "{}#{}", self.class_name(), self.id()),
            Err(_) => write!(f, "Object#{}", self.id()),
        }
    }
}
