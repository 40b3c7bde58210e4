//! Object-tree operations.
//!
//! Just enough of a document model for the boundary imports: node creation,
//! insertion with hierarchy checks, lookup by id, attributes, shadow roots
//! and a handful of form-control properties. Every fallible operation
//! reports a [`HostError`] named like the exception a browser would throw.

use crate::error::HostError;
use crate::object::{
    Attribute, Element, ObjectKind, ObjectRef, ShadowRootMode, HTML_NAMESPACE,
};

/// `Node.nodeType` values.
pub const ELEMENT_NODE: u16 = 1;
pub const TEXT_NODE: u16 = 3;
pub const COMMENT_NODE: u16 = 8;
pub const DOCUMENT_NODE: u16 = 9;
pub const DOCUMENT_FRAGMENT_NODE: u16 = 11;

/// Elements that may host a shadow root, besides custom elements.
const SHADOW_HOSTS: &[&str] = &[
    "article",
    "aside",
    "blockquote",
    "body",
    "div",
    "footer",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "main",
    "nav",
    "p",
    "section",
    "span",
];

/// A document with `<html><head></head><body></body></html>`.
pub fn new_document() -> ObjectRef {
    let doc = ObjectRef::new(ObjectKind::Document);
    let html = html_element("html");
    let head = html_element("head");
    let body = html_element("body");
    attach(&html, &head, None);
    attach(&html, &body, None);
    attach(&doc, &html, None);
    doc
}

fn html_element(local_name: &str) -> ObjectRef {
    ObjectRef::new(ObjectKind::Element(Element {
        namespace: Some(HTML_NAMESPACE.to_string()),
        local_name: local_name.to_string(),
        ..Element::default()
    }))
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let start_ok = first.is_alphabetic() || first == '_' || first == ':' || !first.is_ascii();
    start_ok
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '.' | '_' | ':') || !c.is_ascii())
}

fn require_document(doc: &ObjectRef) -> Result<(), HostError> {
    if doc.is_document() {
        Ok(())
    } else {
        Err(HostError::type_error("value is not a Document"))
    }
}

// ── Creation ──

/// `document.createElement(name)`. HTML names are lowercased.
pub fn create_element(doc: &ObjectRef, name: &str) -> Result<ObjectRef, HostError> {
    require_document(doc)?;
    if !is_valid_name(name) {
        return Err(HostError::invalid_character(format!(
            "'{}' is not a valid element name",
            name
        )));
    }
    Ok(html_element(&name.to_ascii_lowercase()))
}

/// `document.createElementNS(namespace, qualifiedName)`.
pub fn create_element_ns(
    doc: &ObjectRef,
    namespace: Option<&str>,
    qualified_name: &str,
) -> Result<ObjectRef, HostError> {
    require_document(doc)?;
    let (prefix, local_name) = split_qualified_name(namespace, qualified_name)?;
    Ok(ObjectRef::new(ObjectKind::Element(Element {
        namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
        prefix,
        local_name,
        ..Element::default()
    })))
}

fn split_qualified_name(
    namespace: Option<&str>,
    qualified_name: &str,
) -> Result<(Option<String>, String), HostError> {
    if !is_valid_name(qualified_name) {
        return Err(HostError::invalid_character(format!(
            "'{}' is not a valid qualified name",
            qualified_name
        )));
    }
    match qualified_name.split_once(':') {
        Some((prefix, local)) => {
            if prefix.is_empty() || local.is_empty() || local.contains(':') {
                return Err(HostError::invalid_character(format!(
                    "'{}' is not a valid qualified name",
                    qualified_name
                )));
            }
            if namespace.map_or(true, str::is_empty) {
                return Err(HostError::namespace(format!(
                    "prefix '{}' requires a namespace",
                    prefix
                )));
            }
            Ok((Some(prefix.to_string()), local.to_string()))
        }
        None => Ok((None, qualified_name.to_string())),
    }
}

pub fn create_text_node(doc: &ObjectRef, data: &str) -> Result<ObjectRef, HostError> {
    require_document(doc)?;
    Ok(ObjectRef::new(ObjectKind::Text(data.to_string())))
}

pub fn create_comment(doc: &ObjectRef, data: &str) -> Result<ObjectRef, HostError> {
    require_document(doc)?;
    Ok(ObjectRef::new(ObjectKind::Comment(data.to_string())))
}

pub fn create_document_fragment(doc: &ObjectRef) -> Result<ObjectRef, HostError> {
    require_document(doc)?;
    Ok(ObjectRef::new(ObjectKind::DocumentFragment))
}

// ── Tree navigation ──

pub fn parent_node(node: &ObjectRef) -> Option<ObjectRef> {
    node.data().parent.as_ref().and_then(|p| p.upgrade())
}

pub fn last_child(node: &ObjectRef) -> Option<ObjectRef> {
    node.data().children.last().cloned()
}

pub fn child_count(node: &ObjectRef) -> usize {
    node.data().children.len()
}

pub fn child_at(node: &ObjectRef, index: usize) -> Option<ObjectRef> {
    node.data().children.get(index).cloned()
}

fn index_in_parent(parent: &ObjectRef, child: &ObjectRef) -> Option<usize> {
    parent.data().children.iter().position(|c| c.ptr_eq(child))
}

/// The document's root element.
pub fn document_element(doc: &ObjectRef) -> Option<ObjectRef> {
    if !doc.is_document() {
        return None;
    }
    let data = doc.data();
    data.children.iter().find(|c| c.is_element()).cloned()
}

fn html_child(doc: &ObjectRef, tag: &str) -> Option<ObjectRef> {
    let html = document_element(doc)?;
    let data = html.data();
    data.children
        .iter()
        .find(|c| local_name(c).as_deref() == Some(tag))
        .cloned()
}

/// `document.body`.
pub fn body(doc: &ObjectRef) -> Option<ObjectRef> {
    html_child(doc, "body")
}

/// `document.head`.
pub fn head(doc: &ObjectRef) -> Option<ObjectRef> {
    html_child(doc, "head")
}

/// `getElementById`. Searches the light tree only.
pub fn get_element_by_id(root: &ObjectRef, id: &str) -> Option<ObjectRef> {
    let children: Vec<ObjectRef> = root.data().children.clone();
    for child in children {
        if get_attribute(&child, "id").ok().flatten().as_deref() == Some(id) {
            return Some(child);
        }
        if let Some(found) = get_element_by_id(&child, id) {
            return Some(found);
        }
    }
    None
}

// ── Mutation ──

fn can_have_children(node: &ObjectRef) -> bool {
    matches!(
        node.data().kind,
        ObjectKind::Document
            | ObjectKind::Element(_)
            | ObjectKind::DocumentFragment
            | ObjectKind::ShadowRoot { .. }
    )
}

fn is_fragment(node: &ObjectRef) -> bool {
    matches!(node.data().kind, ObjectKind::DocumentFragment)
}

/// True if `node` is `other` or one of its ancestors (shadow hosts included).
fn is_inclusive_ancestor(node: &ObjectRef, other: &ObjectRef) -> bool {
    let mut current = Some(other.clone());
    while let Some(n) = current {
        if n.ptr_eq(node) {
            return true;
        }
        let data = n.data();
        current = match &data.kind {
            ObjectKind::ShadowRoot { host, .. } => host.upgrade(),
            _ => data.parent.as_ref().and_then(|p| p.upgrade()),
        };
    }
    false
}

fn check_insert(parent: &ObjectRef, child: &ObjectRef) -> Result<(), HostError> {
    if !can_have_children(parent) {
        return Err(HostError::hierarchy_request("parent cannot have children"));
    }
    if !child.is_node() {
        return Err(HostError::type_error("value is not a Node"));
    }
    if matches!(
        child.data().kind,
        ObjectKind::Document | ObjectKind::ShadowRoot { .. }
    ) {
        return Err(HostError::hierarchy_request("node cannot be inserted"));
    }
    if is_inclusive_ancestor(child, parent) {
        return Err(HostError::hierarchy_request(
            "the new child contains the parent",
        ));
    }
    Ok(())
}

fn detach(child: &ObjectRef) {
    let old_parent = child.data_mut().parent.take().and_then(|p| p.upgrade());
    if let Some(old_parent) = old_parent {
        old_parent.data_mut().children.retain(|c| !c.ptr_eq(child));
    }
}

/// Link `child` under `parent` at `index` (append when `None`), without
/// checks.
fn attach(parent: &ObjectRef, child: &ObjectRef, index: Option<usize>) {
    child.data_mut().parent = Some(parent.downgrade());
    let mut data = parent.data_mut();
    let index = index.unwrap_or(data.children.len()).min(data.children.len());
    data.children.insert(index, child.clone());
}

/// Insert `child` before the child at `index`; fragments splice their
/// children in order and end up empty.
fn insert_at(parent: &ObjectRef, child: &ObjectRef, index: Option<usize>) -> Result<(), HostError> {
    check_insert(parent, child)?;
    if is_fragment(child) {
        let moved: Vec<ObjectRef> = std::mem::take(&mut child.data_mut().children);
        let mut at = index;
        for node in moved {
            node.data_mut().parent = None;
            attach(parent, &node, at);
            at = at.map(|i| i + 1);
        }
        return Ok(());
    }

    // Account for the child moving within the same parent.
    let mut index = index;
    if let (Some(i), Some(current)) = (index, index_in_parent(parent, child)) {
        if current < i {
            index = Some(i - 1);
        }
    }
    detach(child);
    attach(parent, child, index);
    Ok(())
}

/// `parent.appendChild(child)`; returns the appended node.
pub fn append_child(parent: &ObjectRef, child: &ObjectRef) -> Result<ObjectRef, HostError> {
    insert_at(parent, child, None)?;
    Ok(child.clone())
}

/// `parent.removeChild(child)`; returns the removed node.
pub fn remove_child(parent: &ObjectRef, child: &ObjectRef) -> Result<ObjectRef, HostError> {
    if index_in_parent(parent, child).is_none() {
        return Err(HostError::not_found(
            "the node to be removed is not a child of this node",
        ));
    }
    detach(child);
    Ok(child.clone())
}

/// `node.replaceWith(replacement)`. A parentless node is left alone.
pub fn replace_with(node: &ObjectRef, replacement: &ObjectRef) -> Result<(), HostError> {
    if node.ptr_eq(replacement) {
        return Ok(());
    }
    let Some(parent) = parent_node(node) else {
        return Ok(());
    };
    check_insert(&parent, replacement)?;
    detach(replacement);
    let index = index_in_parent(&parent, node);
    detach(node);
    insert_at(&parent, replacement, index)
}

/// `target.insertAdjacentElement(position, element)`.
///
/// Returns `None` when the position needs a parent the target lacks.
pub fn insert_adjacent_element(
    target: &ObjectRef,
    position: &str,
    element: &ObjectRef,
) -> Result<Option<ObjectRef>, HostError> {
    if !element.is_element() {
        return Err(HostError::type_error("value is not an Element"));
    }
    match position.to_ascii_lowercase().as_str() {
        "beforebegin" | "afterend" => {
            let Some(parent) = parent_node(target) else {
                return Ok(None);
            };
            let Some(index) = index_in_parent(&parent, target) else {
                return Ok(None);
            };
            let index = if position.eq_ignore_ascii_case("afterend") {
                index + 1
            } else {
                index
            };
            insert_at(&parent, element, Some(index))?;
        }
        "afterbegin" => insert_at(target, element, Some(0))?,
        "beforeend" => insert_at(target, element, None)?,
        _ => {
            return Err(HostError::syntax_error(format!(
                "'{}' is not a valid insertion position",
                position
            )))
        }
    }
    Ok(Some(element.clone()))
}

// ── Node properties ──

pub fn node_type(node: &ObjectRef) -> u16 {
    match node.data().kind {
        ObjectKind::Element(_) => ELEMENT_NODE,
        ObjectKind::Text(_) => TEXT_NODE,
        ObjectKind::Comment(_) => COMMENT_NODE,
        ObjectKind::Document => DOCUMENT_NODE,
        ObjectKind::DocumentFragment | ObjectKind::ShadowRoot { .. } => DOCUMENT_FRAGMENT_NODE,
        _ => 0,
    }
}

/// `element.tagName`: uppercased for HTML elements.
pub fn tag_name(node: &ObjectRef) -> Option<String> {
    match &node.data().kind {
        ObjectKind::Element(element) if element.is_html() => {
            Some(element.qualified_name().to_ascii_uppercase())
        }
        ObjectKind::Element(element) => Some(element.qualified_name()),
        _ => None,
    }
}

pub fn local_name(node: &ObjectRef) -> Option<String> {
    match &node.data().kind {
        ObjectKind::Element(element) => Some(element.local_name.clone()),
        _ => None,
    }
}

/// `CharacterData.data` of a text or comment node.
pub fn text_data(node: &ObjectRef) -> Result<String, HostError> {
    match &node.data().kind {
        ObjectKind::Text(data) | ObjectKind::Comment(data) => Ok(data.clone()),
        _ => Err(HostError::type_error("value is not CharacterData")),
    }
}

pub fn set_text_data(node: &ObjectRef, value: &str) -> Result<(), HostError> {
    match &mut node.data_mut().kind {
        ObjectKind::Text(data) | ObjectKind::Comment(data) => {
            *data = value.to_string();
            Ok(())
        }
        _ => Err(HostError::type_error("value is not CharacterData")),
    }
}

/// `Text.wholeText`: this node's data joined with adjacent text siblings.
pub fn whole_text(node: &ObjectRef) -> Result<String, HostError> {
    let own = match &node.data().kind {
        ObjectKind::Text(data) => data.clone(),
        _ => return Err(HostError::type_error("value is not a Text node")),
    };
    let Some(parent) = parent_node(node) else {
        return Ok(own);
    };
    let data = parent.data();
    let Some(index) = data.children.iter().position(|c| c.ptr_eq(node)) else {
        return Ok(own);
    };
    let text_of = |n: &ObjectRef| match &n.data().kind {
        ObjectKind::Text(t) => Some(t.clone()),
        _ => None,
    };
    let mut start = index;
    while start > 0 && text_of(&data.children[start - 1]).is_some() {
        start -= 1;
    }
    let mut out = String::new();
    for sibling in &data.children[start..] {
        match text_of(sibling) {
            Some(t) => out.push_str(&t),
            None => break,
        }
    }
    Ok(out)
}

// ── Attributes ──

fn with_element<R>(node: &ObjectRef, f: impl FnOnce(&Element) -> R) -> Result<R, HostError> {
    match &node.data().kind {
        ObjectKind::Element(element) => Ok(f(element)),
        _ => Err(HostError::type_error("value is not an Element")),
    }
}

fn with_element_mut<R>(node: &ObjectRef, f: impl FnOnce(&mut Element) -> R) -> Result<R, HostError> {
    match &mut node.data_mut().kind {
        ObjectKind::Element(element) => Ok(f(element)),
        _ => Err(HostError::type_error("value is not an Element")),
    }
}

fn attribute_name(element: &Element, name: &str) -> String {
    if element.is_html() {
        name.to_ascii_lowercase()
    } else {
        name.to_string()
    }
}

/// `element.getAttribute(name)`; `Ok(None)` for a missing attribute.
pub fn get_attribute(node: &ObjectRef, name: &str) -> Result<Option<String>, HostError> {
    with_element(node, |element| {
        let name = attribute_name(element, name);
        element
            .attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.clone())
    })
}

/// `element.setAttribute(name, value)`.
pub fn set_attribute(node: &ObjectRef, name: &str, value: &str) -> Result<(), HostError> {
    if !is_valid_name(name) {
        return Err(HostError::invalid_character(format!(
            "'{}' is not a valid attribute name",
            name
        )));
    }
    with_element_mut(node, |element| {
        let name = attribute_name(element, name);
        match element.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value.to_string(),
            None => element.attributes.push(Attribute {
                namespace: None,
                local_name: name.clone(),
                name,
                value: value.to_string(),
            }),
        }
    })
}

/// `element.setAttributeNS(namespace, qualifiedName, value)`.
pub fn set_attribute_ns(
    node: &ObjectRef,
    namespace: Option<&str>,
    qualified_name: &str,
    value: &str,
) -> Result<(), HostError> {
    let (_, local_name) = split_qualified_name(namespace, qualified_name)?;
    let namespace = namespace.filter(|ns| !ns.is_empty()).map(str::to_string);
    with_element_mut(node, |element| {
        let existing = element
            .attributes
            .iter_mut()
            .find(|a| a.namespace == namespace && a.local_name == local_name);
        match existing {
            Some(attr) => {
                attr.name = qualified_name.to_string();
                attr.value = value.to_string();
            }
            None => element.attributes.push(Attribute {
                namespace,
                name: qualified_name.to_string(),
                local_name,
                value: value.to_string(),
            }),
        }
    })
}

/// `element.removeAttribute(name)`; missing attributes are ignored.
pub fn remove_attribute(node: &ObjectRef, name: &str) -> Result<(), HostError> {
    with_element_mut(node, |element| {
        let name = attribute_name(element, name);
        element.attributes.retain(|a| a.name != name);
    })
}

// ── Shadow DOM ──

fn can_host_shadow(element: &Element) -> bool {
    element.is_html()
        && (element.local_name.contains('-') || SHADOW_HOSTS.contains(&element.local_name.as_str()))
}

/// `element.attachShadow({ mode })`.
pub fn attach_shadow(node: &ObjectRef, mode: ShadowRootMode) -> Result<ObjectRef, HostError> {
    let root = ObjectRef::new(ObjectKind::ShadowRoot {
        mode,
        host: node.downgrade(),
    });
    with_element_mut(node, |element| {
        if !can_host_shadow(element) {
            return Err(HostError::not_supported(format!(
                "<{}> cannot host a shadow root",
                element.local_name
            )));
        }
        if element.shadow_root.is_some() {
            return Err(HostError::not_supported(
                "the element already hosts a shadow root",
            ));
        }
        element.shadow_root = Some(root.clone());
        Ok(())
    })??;
    Ok(root)
}

/// `element.shadowRoot`: closed roots are hidden.
pub fn shadow_root(node: &ObjectRef) -> Option<ObjectRef> {
    let root = with_element(node, |element| element.shadow_root.clone()).ok()??;
    let open = matches!(
        root.data().kind,
        ObjectKind::ShadowRoot {
            mode: ShadowRootMode::Open,
            ..
        }
    );
    open.then_some(root)
}

pub fn shadow_root_mode(node: &ObjectRef) -> Option<ShadowRootMode> {
    match &node.data().kind {
        ObjectKind::ShadowRoot { mode, .. } => Some(*mode),
        _ => None,
    }
}

// ── Form controls ──

pub fn value(node: &ObjectRef) -> Result<String, HostError> {
    with_element(node, |element| element.value.clone())
}

pub fn set_value(node: &ObjectRef, value: &str) -> Result<(), HostError> {
    with_element_mut(node, |element| element.value = value.to_string())
}

pub fn disabled(node: &ObjectRef) -> Result<bool, HostError> {
    with_element(node, |element| element.disabled)
}

pub fn set_disabled(node: &ObjectRef, disabled: bool) -> Result<(), HostError> {
    with_element_mut(node, |element| element.disabled = disabled)
}

pub fn checked(node: &ObjectRef) -> Result<bool, HostError> {
    with_element(node, |element| element.checked)
}

pub fn set_checked(node: &ObjectRef, checked: bool) -> Result<(), HostError> {
    with_element_mut(node, |element| element.checked = checked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HostErrorKind;
    use crate::object::SVG_NAMESPACE;

    fn names(parent: &ObjectRef) -> Vec<String> {
        (0..child_count(parent))
            .filter_map(|i| child_at(parent, i))
            .map(|c| local_name(&c).or_else(|| text_data(&c).ok()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_new_document_shape() {
        let doc = new_document();
        assert_eq!(node_type(&doc), DOCUMENT_NODE);
        let html = document_element(&doc).unwrap();
        assert_eq!(names(&html), vec!["head", "body"]);
        assert!(parent_node(&body(&doc).unwrap()).unwrap().ptr_eq(&html));
        assert!(head(&doc).is_some());
    }

    #[test]
    fn test_create_element_validates_and_lowercases() {
        let doc = new_document();
        let el = create_element(&doc, "DIV").unwrap();
        assert_eq!(local_name(&el).as_deref(), Some("div"));
        assert_eq!(tag_name(&el).as_deref(), Some("DIV"));
        let err = create_element(&doc, "1bad").unwrap_err();
        assert_eq!(err.kind, HostErrorKind::InvalidCharacter);
        assert!(create_element(&doc, "").is_err());
    }

    #[test]
    fn test_create_element_ns() {
        let doc = new_document();
        let el = create_element_ns(&doc, Some(SVG_NAMESPACE), "svg:rect").unwrap();
        assert_eq!(local_name(&el).as_deref(), Some("rect"));
        assert_eq!(tag_name(&el).as_deref(), Some("svg:rect"));
        let err = create_element_ns(&doc, None, "svg:rect").unwrap_err();
        assert_eq!(err.kind, HostErrorKind::Namespace);
    }

    #[test]
    fn test_append_moves_between_parents() {
        let doc = new_document();
        let a = create_element(&doc, "div").unwrap();
        let b = create_element(&doc, "div").unwrap();
        let child = create_element(&doc, "span").unwrap();
        append_child(&a, &child).unwrap();
        append_child(&b, &child).unwrap();
        assert_eq!(child_count(&a), 0);
        assert_eq!(child_count(&b), 1);
        assert!(parent_node(&child).unwrap().ptr_eq(&b));
    }

    #[test]
    fn test_append_rejects_cycles() {
        let doc = new_document();
        let outer = create_element(&doc, "div").unwrap();
        let inner = create_element(&doc, "div").unwrap();
        append_child(&outer, &inner).unwrap();
        let err = append_child(&inner, &outer).unwrap_err();
        assert_eq!(err.kind, HostErrorKind::HierarchyRequest);
        let err = append_child(&outer, &outer).unwrap_err();
        assert_eq!(err.kind, HostErrorKind::HierarchyRequest);
    }

    #[test]
    fn test_append_into_text_is_hierarchy_error() {
        let doc = new_document();
        let text = create_text_node(&doc, "t").unwrap();
        let el = create_element(&doc, "b").unwrap();
        assert_eq!(
            append_child(&text, &el).unwrap_err().kind,
            HostErrorKind::HierarchyRequest
        );
    }

    #[test]
    fn test_fragment_splices_children() {
        let doc = new_document();
        let frag = create_document_fragment(&doc).unwrap();
        for tag in ["a", "b", "c"] {
            append_child(&frag, &create_element(&doc, tag).unwrap()).unwrap();
        }
        let list = create_element(&doc, "ul").unwrap();
        append_child(&list, &frag).unwrap();
        assert_eq!(names(&list), vec!["a", "b", "c"]);
        assert_eq!(child_count(&frag), 0);
    }

    #[test]
    fn test_remove_child_not_found() {
        let doc = new_document();
        let a = create_element(&doc, "div").unwrap();
        let b = create_element(&doc, "div").unwrap();
        assert_eq!(remove_child(&a, &b).unwrap_err().kind, HostErrorKind::NotFound);
        append_child(&a, &b).unwrap();
        remove_child(&a, &b).unwrap();
        assert!(parent_node(&b).is_none());
    }

    #[test]
    fn test_replace_with_keeps_position() {
        let doc = new_document();
        let list = create_element(&doc, "ul").unwrap();
        let first = create_element(&doc, "a").unwrap();
        let second = create_element(&doc, "b").unwrap();
        append_child(&list, &first).unwrap();
        append_child(&list, &second).unwrap();
        let replacement = create_element(&doc, "x").unwrap();
        replace_with(&first, &replacement).unwrap();
        assert_eq!(names(&list), vec!["x", "b"]);
        assert!(parent_node(&first).is_none());
    }

    #[test]
    fn test_insert_adjacent_positions() {
        let doc = new_document();
        let parent = create_element(&doc, "div").unwrap();
        let target = create_element(&doc, "t").unwrap();
        append_child(&parent, &target).unwrap();
        for (pos, tag) in [
            ("beforebegin", "a"),
            ("afterend", "z"),
            ("afterbegin", "first"),
            ("beforeend", "last"),
        ] {
            let el = create_element(&doc, tag).unwrap();
            assert!(insert_adjacent_element(&target, pos, &el).unwrap().is_some());
        }
        assert_eq!(names(&parent), vec!["a", "t", "z"]);
        assert_eq!(names(&target), vec!["first", "last"]);

        let orphan = create_element(&doc, "o").unwrap();
        let el = create_element(&doc, "e").unwrap();
        assert!(insert_adjacent_element(&orphan, "beforebegin", &el).unwrap().is_none());
        let err = insert_adjacent_element(&orphan, "middle", &el).unwrap_err();
        assert_eq!(err.kind, HostErrorKind::SyntaxError);
    }

    #[test]
    fn test_get_element_by_id() {
        let doc = new_document();
        let body = body(&doc).unwrap();
        let el = create_element(&doc, "section").unwrap();
        set_attribute(&el, "id", "main").unwrap();
        append_child(&body, &el).unwrap();
        assert!(get_element_by_id(&doc, "main").unwrap().ptr_eq(&el));
        assert!(get_element_by_id(&doc, "other").is_none());
    }

    #[test]
    fn test_attributes() {
        let doc = new_document();
        let el = create_element(&doc, "input").unwrap();
        set_attribute(&el, "Type", "text").unwrap();
        assert_eq!(get_attribute(&el, "type").unwrap().as_deref(), Some("text"));
        set_attribute(&el, "type", "checkbox").unwrap();
        assert_eq!(get_attribute(&el, "TYPE").unwrap().as_deref(), Some("checkbox"));
        remove_attribute(&el, "type").unwrap();
        assert_eq!(get_attribute(&el, "type").unwrap(), None);
        assert!(set_attribute(&el, "bad name", "x").is_err());

        set_attribute_ns(&el, Some("urn:x"), "x:flag", "1").unwrap();
        set_attribute_ns(&el, Some("urn:x"), "y:flag", "2").unwrap();
        assert_eq!(get_attribute(&el, "y:flag").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_attach_shadow() {
        let doc = new_document();
        let host = create_element(&doc, "div").unwrap();
        let root = attach_shadow(&host, ShadowRootMode::Open).unwrap();
        assert!(shadow_root(&host).unwrap().ptr_eq(&root));
        assert_eq!(node_type(&root), DOCUMENT_FRAGMENT_NODE);
        let err = attach_shadow(&host, ShadowRootMode::Open).unwrap_err();
        assert_eq!(err.kind, HostErrorKind::NotSupported);

        let custom = create_element(&doc, "my-widget").unwrap();
        attach_shadow(&custom, ShadowRootMode::Closed).unwrap();
        assert!(shadow_root(&custom).is_none());

        let input = create_element(&doc, "input").unwrap();
        assert!(attach_shadow(&input, ShadowRootMode::Open).is_err());
    }

    #[test]
    fn test_text_data_and_whole_text() {
        let doc = new_document();
        let p = create_element(&doc, "p").unwrap();
        let a = create_text_node(&doc, "Hello, ").unwrap();
        let b = create_text_node(&doc, "world").unwrap();
        append_child(&p, &a).unwrap();
        append_child(&p, &b).unwrap();
        append_child(&p, &create_element(&doc, "br").unwrap()).unwrap();
        assert_eq!(whole_text(&b).unwrap(), "Hello, world");
        set_text_data(&b, "there").unwrap();
        assert_eq!(text_data(&b).unwrap(), "there");
        assert!(text_data(&p).is_err());
        assert!(last_child(&p).unwrap().is_element());
    }

    #[test]
    fn test_form_state() {
        let doc = new_document();
        let input = create_element(&doc, "input").unwrap();
        set_value(&input, "abc").unwrap();
        set_disabled(&input, true).unwrap();
        set_checked(&input, true).unwrap();
        assert_eq!(value(&input).unwrap(), "abc");
        assert!(disabled(&input).unwrap());
        assert!(checked(&input).unwrap());
        assert!(set_value(&doc, "x").is_err());
    }
}
