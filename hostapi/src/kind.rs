//! Type narrowing over the closed set of host object kinds.
//!
//! The sandbox asks "is this value an `HTMLInputElement`?" through a single
//! `instance_of(handle, kind)` import. Rather than open-ended dynamic typing,
//! every value is classified into its most specific [`HostKind`] and the
//! check walks that kind's fixed ancestor chain. Mismatches return `false`;
//! nothing here throws.

use crate::event::EventDetail;
use crate::object::ObjectKind;
use crate::value::HostValue;

/// Host object kinds the sandbox can narrow to.
///
/// Discriminants are the wire values of the `instance_of` import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum HostKind {
    Window = 0,
    Node = 1,
    Element = 2,
    HtmlElement = 3,
    Document = 4,
    DocumentFragment = 5,
    ShadowRoot = 6,
    Text = 7,
    Comment = 8,
    Event = 9,
    KeyboardEvent = 10,
    MouseEvent = 11,
    Promise = 12,
    HtmlAudioElement = 20,
    HtmlButtonElement = 21,
    HtmlDataElement = 22,
    HtmlDetailsElement = 23,
    HtmlFieldSetElement = 24,
    HtmlInputElement = 25,
    HtmlLiElement = 26,
    HtmlLinkElement = 27,
    HtmlMeterElement = 28,
    HtmlOptGroupElement = 29,
    HtmlOptionElement = 30,
    HtmlOutputElement = 31,
    HtmlParamElement = 32,
    HtmlProgressElement = 33,
    HtmlSelectElement = 34,
    HtmlStyleElement = 35,
    HtmlTextAreaElement = 36,
}

/// HTML tag → specialized element kind.
const HTML_TAG_KINDS: &[(&str, HostKind)] = &[
    ("audio", HostKind::HtmlAudioElement),
    ("button", HostKind::HtmlButtonElement),
    ("data", HostKind::HtmlDataElement),
    ("details", HostKind::HtmlDetailsElement),
    ("fieldset", HostKind::HtmlFieldSetElement),
    ("input", HostKind::HtmlInputElement),
    ("li", HostKind::HtmlLiElement),
    ("link", HostKind::HtmlLinkElement),
    ("meter", HostKind::HtmlMeterElement),
    ("optgroup", HostKind::HtmlOptGroupElement),
    ("option", HostKind::HtmlOptionElement),
    ("output", HostKind::HtmlOutputElement),
    ("param", HostKind::HtmlParamElement),
    ("progress", HostKind::HtmlProgressElement),
    ("select", HostKind::HtmlSelectElement),
    ("style", HostKind::HtmlStyleElement),
    ("textarea", HostKind::HtmlTextAreaElement),
];

const ALL_KINDS: &[HostKind] = &[
    HostKind::Window,
    HostKind::Node,
    HostKind::Element,
    HostKind::HtmlElement,
    HostKind::Document,
    HostKind::DocumentFragment,
    HostKind::ShadowRoot,
    HostKind::Text,
    HostKind::Comment,
    HostKind::Event,
    HostKind::KeyboardEvent,
    HostKind::MouseEvent,
    HostKind::Promise,
    HostKind::HtmlAudioElement,
    HostKind::HtmlButtonElement,
    HostKind::HtmlDataElement,
    HostKind::HtmlDetailsElement,
    HostKind::HtmlFieldSetElement,
    HostKind::HtmlInputElement,
    HostKind::HtmlLiElement,
    HostKind::HtmlLinkElement,
    HostKind::HtmlMeterElement,
    HostKind::HtmlOptGroupElement,
    HostKind::HtmlOptionElement,
    HostKind::HtmlOutputElement,
    HostKind::HtmlParamElement,
    HostKind::HtmlProgressElement,
    HostKind::HtmlSelectElement,
    HostKind::HtmlStyleElement,
    HostKind::HtmlTextAreaElement,
];

impl HostKind {
    /// Convert from the `instance_of` wire value.
    pub fn from_i32(code: i32) -> Option<Self> {
        ALL_KINDS.iter().copied().find(|kind| kind.as_i32() == code)
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Specialized kind for an HTML element's local name.
    pub fn for_html_tag(tag: &str) -> Option<Self> {
        HTML_TAG_KINDS
            .iter()
            .find(|(name, _)| *name == tag)
            .map(|(_, kind)| *kind)
    }

    /// Direct supertype, `None` at the roots (`Window`, `Node`, `Event`,
    /// `Promise`).
    pub fn parent(self) -> Option<Self> {
        match self {
            Self::Window | Self::Node | Self::Event | Self::Promise => None,
            Self::Element | Self::Document | Self::DocumentFragment | Self::Text | Self::Comment => {
                Some(Self::Node)
            }
            Self::ShadowRoot => Some(Self::DocumentFragment),
            Self::HtmlElement => Some(Self::Element),
            Self::KeyboardEvent | Self::MouseEvent => Some(Self::Event),
            _ => Some(Self::HtmlElement),
        }
    }

    /// True if `self` is `other` or one of its subtypes.
    pub fn is_a(self, other: HostKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == other {
                return true;
            }
            current = kind.parent();
        }
        false
    }

    /// Most specific kind of a value, `None` for primitives, functions and
    /// objects outside the enumerated set.
    pub fn classify(value: &HostValue) -> Option<Self> {
        let obj = value.as_object()?;
        let data = obj.data();
        match &data.kind {
            ObjectKind::Window => Some(Self::Window),
            ObjectKind::Document => Some(Self::Document),
            ObjectKind::DocumentFragment => Some(Self::DocumentFragment),
            ObjectKind::ShadowRoot { .. } => Some(Self::ShadowRoot),
            ObjectKind::Text(_) => Some(Self::Text),
            ObjectKind::Comment(_) => Some(Self::Comment),
            ObjectKind::Promise(_) => Some(Self::Promise),
            ObjectKind::Element(element) if element.is_html() => {
                Some(Self::for_html_tag(&element.local_name).unwrap_or(Self::HtmlElement))
            }
            ObjectKind::Element(_) => Some(Self::Element),
            ObjectKind::Event(event) => Some(match event.detail {
                EventDetail::Keyboard { .. } => Self::KeyboardEvent,
                EventDetail::Mouse { .. } => Self::MouseEvent,
                EventDetail::Plain => Self::Event,
            }),
            ObjectKind::Performance
            | ObjectKind::IdleDeadline(_)
            | ObjectKind::Error { .. }
            | ObjectKind::Plain => None,
        }
    }

    /// The `instanceof` check: classification followed by a subtype test.
    pub fn matches(self, value: &HostValue) -> bool {
        Self::classify(value).is_some_and(|kind| kind.is_a(self))
    }

    /// Host class name of this kind.
    pub fn class_name(self) -> &'static str {
        match self {
            Self::Window => "Window",
            Self::Node => "Node",
            Self::Element => "Element",
            Self::HtmlElement => "HTMLElement",
            Self::Document => "HTMLDocument",
            Self::DocumentFragment => "DocumentFragment",
            Self::ShadowRoot => "ShadowRoot",
            Self::Text => "Text",
            Self::Comment => "Comment",
            Self::Event => "Event",
            Self::KeyboardEvent => "KeyboardEvent",
            Self::MouseEvent => "MouseEvent",
            Self::Promise => "Promise",
            Self::HtmlAudioElement => "HTMLAudioElement",
            Self::HtmlButtonElement => "HTMLButtonElement",
            Self::HtmlDataElement => "HTMLDataElement",
            Self::HtmlDetailsElement => "HTMLDetailsElement",
            Self::HtmlFieldSetElement => "HTMLFieldSetElement",
            Self::HtmlInputElement => "HTMLInputElement",
            Self::HtmlLiElement => "HTMLLIElement",
            Self::HtmlLinkElement => "HTMLLinkElement",
            Self::HtmlMeterElement => "HTMLMeterElement",
            Self::HtmlOptGroupElement => "HTMLOptGroupElement",
            Self::HtmlOptionElement => "HTMLOptionElement",
            Self::HtmlOutputElement => "HTMLOutputElement",
            Self::HtmlParamElement => "HTMLParamElement",
            Self::HtmlProgressElement => "HTMLProgressElement",
            Self::HtmlSelectElement => "HTMLSelectElement",
            Self::HtmlStyleElement => "HTMLStyleElement",
            Self::HtmlTextAreaElement => "HTMLTextAreaElement",
        }
    }
}
