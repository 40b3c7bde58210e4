//! Object-tree and value import tests: element creation, tree edits,
//! attributes, shadow roots, form controls, plain objects and globals.

mod common;

use boundary_hostapi::{dom, MemHost};
use boundary_sandbox::BridgeConfig;

use common::*;

const IMPORTS: &str = r#"
    (import "boundary" "global_window" (func $global_window (result i32)))
    (import "boundary" "document" (func $document (param i32) (result i32)))
    (import "boundary" "body" (func $body (param i32) (result i32)))
    (import "boundary" "head" (func $head (param i32) (result i32)))
    (import "boundary" "performance" (func $performance (param i32) (result i32)))
    (import "boundary" "now" (func $now (param i32) (result f64)))
    (import "boundary" "create_element" (func $create_element (param i32 i32 i32) (result i32)))
    (import "boundary" "create_element_ns" (func $create_element_ns (param i32 i32 i32 i32 i32) (result i32)))
    (import "boundary" "create_text_node" (func $create_text_node (param i32 i32 i32) (result i32)))
    (import "boundary" "create_comment" (func $create_comment (param i32 i32 i32) (result i32)))
    (import "boundary" "create_document_fragment" (func $create_document_fragment (param i32) (result i32)))
    (import "boundary" "get_element_by_id" (func $get_element_by_id (param i32 i32 i32) (result i32)))
    (import "boundary" "append_child" (func $append_child (param i32 i32) (result i32)))
    (import "boundary" "remove_child" (func $remove_child (param i32 i32) (result i32)))
    (import "boundary" "replace_with" (func $replace_with (param i32 i32)))
    (import "boundary" "insert_adjacent_element" (func $insert_adjacent_element (param i32 i32 i32 i32) (result i32)))
    (import "boundary" "last_child" (func $last_child (param i32) (result i32)))
    (import "boundary" "parent_node" (func $parent_node (param i32) (result i32)))
    (import "boundary" "child_count" (func $child_count (param i32) (result i32)))
    (import "boundary" "child_at" (func $child_at (param i32 i32) (result i32)))
    (import "boundary" "node_type" (func $node_type (param i32) (result i32)))
    (import "boundary" "tag_name" (func $tag_name (param i32 i32)))
    (import "boundary" "local_name" (func $local_name (param i32 i32)))
    (import "boundary" "text_data" (func $text_data (param i32 i32)))
    (import "boundary" "set_text_data" (func $set_text_data (param i32 i32 i32)))
    (import "boundary" "whole_text" (func $whole_text (param i32 i32)))
    (import "boundary" "set_attribute" (func $set_attribute (param i32 i32 i32 i32 i32)))
    (import "boundary" "set_attribute_ns" (func $set_attribute_ns (param i32 i32 i32 i32 i32 i32 i32)))
    (import "boundary" "get_attribute" (func $get_attribute (param i32 i32 i32 i32)))
    (import "boundary" "remove_attribute" (func $remove_attribute (param i32 i32 i32)))
    (import "boundary" "attach_shadow" (func $attach_shadow (param i32 i32) (result i32)))
    (import "boundary" "shadow_root" (func $shadow_root (param i32) (result i32)))
    (import "boundary" "value" (func $value (param i32 i32)))
    (import "boundary" "set_value" (func $set_value (param i32 i32 i32)))
    (import "boundary" "set_disabled" (func $set_disabled (param i32 i32)))
    (import "boundary" "set_checked" (func $set_checked (param i32 i32)))
    (import "boundary" "instance_of" (func $instance_of (param i32 i32) (result i32)))
    (import "boundary" "object_new" (func $object_new (result i32)))
    (import "boundary" "get_property" (func $get_property (param i32 i32 i32) (result i32)))
    (import "boundary" "set_property" (func $set_property (param i32 i32 i32 i32)))
    (import "boundary" "get_index" (func $get_index (param i32 i32) (result i32)))
    (import "boundary" "number_new" (func $number_new (param f64) (result i32)))
    (import "boundary" "string_new" (func $string_new (param i32 i32) (result i32)))
    (import "boundary" "is_undefined" (func $is_undefined (param i32) (result i32)))
    (import "boundary" "is_null" (func $is_null (param i32) (result i32)))
    (import "boundary" "is_object" (func $is_object (param i32) (result i32)))
    (import "boundary" "is_function" (func $is_function (param i32) (result i32)))
    (import "boundary" "is_string" (func $is_string (param i32) (result i32)))
    (import "boundary" "boolean_get" (func $boolean_get (param i32) (result i32)))
    (import "boundary" "exception_take" (func $exception_take (result i32)))
"#;

/// Start builds `<div id="main">` inside the body and stores the div at 300,
/// the document at 304 and the body at 308.
const BODY: &str = r#"
    (data (i32.const 16) "div")
    (data (i32.const 20) "span")
    (data (i32.const 24) "hello")
    (data (i32.const 32) " world")
    (data (i32.const 40) "note")
    (data (i32.const 48) "id")
    (data (i32.const 52) "main")
    (data (i32.const 56) "beforeend")
    (data (i32.const 72) "afterbegin")
    (data (i32.const 88) "http://www.w3.org/2000/svg")
    (data (i32.const 120) "rect")
    (data (i32.const 124) "Title")
    (data (i32.const 132) "x")
    (data (i32.const 136) "input")
    (data (i32.const 144) "typed")
    (data (i32.const 152) "key")
    (data (i32.const 160) "sideways")
    (data (i32.const 168) "SECTION")
    (data (i32.const 176) "0")

    (func $div (result i32) (i32.load (i32.const 300)))
    (func $doc (result i32) (i32.load (i32.const 304)))

    (func (export "start")
        (local $doc i32)
        (local $div i32)
        (local $body i32)
        (local.set $doc (call $document (call $global_window)))
        (local.set $div (call $create_element (local.get $doc) (i32.const 16) (i32.const 3)))
        (call $set_attribute (local.get $div) (i32.const 48) (i32.const 2) (i32.const 52) (i32.const 4))
        (local.set $body (call $body (local.get $doc)))
        (drop (call $append_child (local.get $body) (local.get $div)))
        (i32.store (i32.const 300) (local.get $div))
        (i32.store (i32.const 304) (local.get $doc))
        (i32.store (i32.const 308) (local.get $body)))

    (func (export "find_main") (result i32)
        (call $get_element_by_id (call $doc) (i32.const 52) (i32.const 4)))
    (func (export "find_missing") (result i32)
        (call $get_element_by_id (call $doc) (i32.const 40) (i32.const 4)))

    ;; Two adjacent text nodes and a comment under the div.
    (func (export "texts")
        (local $t1 i32)
        (local $t2 i32)
        (local $c i32)
        (local.set $t1 (call $create_text_node (call $doc) (i32.const 24) (i32.const 5)))
        (local.set $t2 (call $create_text_node (call $doc) (i32.const 32) (i32.const 6)))
        (drop (call $append_child (call $div) (local.get $t1)))
        (drop (call $append_child (call $div) (local.get $t2)))
        (call $whole_text (local.get $t1) (i32.const 512))
        (i32.store (i32.const 312) (call $child_count (call $div)))
        (i32.store (i32.const 316) (call $node_type (local.get $t1)))
        (local.set $c (call $create_comment (call $doc) (i32.const 40) (i32.const 4)))
        (i32.store (i32.const 320) (call $node_type (local.get $c)))
        (call $text_data (local.get $c) (i32.const 528))
        (call $set_text_data (local.get $t2) (i32.const 40) (i32.const 4))
        (call $whole_text (local.get $t2) (i32.const 544))
        ;; element nodes have no whole text
        (call $whole_text (call $div) (i32.const 560))
        (i32.store (i32.const 324) (call $exception_take)))

    (func (export "names") (result i32)
        (local $el i32)
        (local.set $el (call $create_element (call $doc) (i32.const 168) (i32.const 7)))
        (call $tag_name (local.get $el) (i32.const 512))
        (call $local_name (local.get $el) (i32.const 528))
        (i32.store (i32.const 312) (call $node_type (local.get $el)))
        (i32.store (i32.const 316) (call $node_type (call $doc)))
        (local.get $el))

    (func (export "svg") (result i32)
        (local $el i32)
        (local.set $el
            (call $create_element_ns (call $doc) (i32.const 88) (i32.const 26) (i32.const 120) (i32.const 4)))
        (call $tag_name (local.get $el) (i32.const 512))
        (i32.store (i32.const 312) (call $instance_of (local.get $el) (i32.const 3)))
        (i32.store (i32.const 316) (call $instance_of (local.get $el) (i32.const 2)))
        (i32.store (i32.const 320) (call $instance_of (call $div) (i32.const 3)))
        (local.get $el))

    (func (export "bad_name") (result i32)
        (i32.store (i32.const 312) (call $create_element (call $doc) (i32.const 32) (i32.const 6)))
        (call $exception_take))

    ;; Inserts a span at the end and a div at the front of the main div.
    (func (export "adjacent")
        (local $a i32)
        (local $b i32)
        (local.set $a (call $create_element (call $doc) (i32.const 20) (i32.const 4)))
        (local.set $b (call $create_element (call $doc) (i32.const 16) (i32.const 3)))
        (i32.store (i32.const 312)
            (call $insert_adjacent_element (call $div) (i32.const 56) (i32.const 9) (local.get $a)))
        (drop (call $insert_adjacent_element (call $div) (i32.const 72) (i32.const 10) (local.get $b)))
        (i32.store (i32.const 316) (call $child_at (call $div) (i32.const 0)))
        (i32.store (i32.const 320) (call $last_child (call $div)))
        (i32.store (i32.const 324) (call $parent_node (local.get $a)))
        (i32.store (i32.const 328) (call $child_at (call $div) (i32.const 9)))
        (i32.store (i32.const 332) (local.get $a))
        (i32.store (i32.const 336) (local.get $b))
        (i32.store (i32.const 340)
            (call $insert_adjacent_element (call $div) (i32.const 160) (i32.const 8) (local.get $a)))
        (i32.store (i32.const 344) (call $exception_take)))

    ;; Replaces the front child with a fragment's worth of nodes and then
    ;; removes the span.
    (func (export "edit") (result i32)
        (local $frag i32)
        (local $span i32)
        (local.set $frag (call $create_document_fragment (call $doc)))
        (i32.store (i32.const 312) (call $node_type (local.get $frag)))
        (local.set $span (call $create_element (call $doc) (i32.const 20) (i32.const 4)))
        (drop (call $append_child (call $div) (local.get $span)))
        (i32.store (i32.const 316) (call $child_count (call $div)))
        (drop (call $remove_child (call $div) (local.get $span)))
        (i32.store (i32.const 320) (call $child_count (call $div)))
        (i32.store (i32.const 324) (call $parent_node (local.get $span)))
        (drop (call $append_child (call $div) (local.get $span)))
        (call $replace_with (local.get $span)
            (call $create_text_node (call $doc) (i32.const 24) (i32.const 5)))
        (i32.store (i32.const 328) (call $node_type (call $last_child (call $div))))
        ;; removing a node that is not a child is a NotFoundError
        (i32.store (i32.const 332) (call $remove_child (call $div) (local.get $span)))
        (call $exception_take))

    (func (export "attributes")
        (call $set_attribute (call $div) (i32.const 124) (i32.const 5) (i32.const 24) (i32.const 5))
        (call $get_attribute (call $div) (i32.const 124) (i32.const 5) (i32.const 512))
        (call $remove_attribute (call $div) (i32.const 124) (i32.const 5))
        (call $get_attribute (call $div) (i32.const 124) (i32.const 5) (i32.const 528))
        ;; a null namespace
        (call $set_attribute_ns (call $div) (i32.const 0) (i32.const 1)
            (i32.const 132) (i32.const 1) (i32.const 40) (i32.const 4))
        (call $get_attribute (call $div) (i32.const 132) (i32.const 1) (i32.const 544))
        (call $get_attribute (call $div) (i32.const 48) (i32.const 2) (i32.const 560)))

    (func (export "shadow")
        (local $open i32)
        (local $closed i32)
        (local $section i32)
        (local.set $open (call $attach_shadow (call $div) (i32.const 0)))
        (i32.store (i32.const 312) (local.get $open))
        (i32.store (i32.const 316) (call $shadow_root (call $div)))
        (i32.store (i32.const 320) (call $instance_of (local.get $open) (i32.const 6)))
        (i32.store (i32.const 324) (call $instance_of (local.get $open) (i32.const 5)))
        (local.set $section (call $create_element (call $doc) (i32.const 168) (i32.const 7)))
        (local.set $closed (call $attach_shadow (local.get $section) (i32.const 1)))
        (i32.store (i32.const 328) (local.get $closed))
        (i32.store (i32.const 332) (call $shadow_root (local.get $section)))
        ;; a second root on the same host
        (i32.store (i32.const 336) (call $attach_shadow (call $div) (i32.const 0)))
        (i32.store (i32.const 340) (call $exception_take)))

    (func (export "bad_mode") (result i32)
        (local $el i32)
        (local.set $el (call $create_element (call $doc) (i32.const 20) (i32.const 4)))
        (i32.store (i32.const 312) (call $attach_shadow (local.get $el) (i32.const 7)))
        (call $exception_take))

    (func (export "unshadowable") (result i32)
        (local $el i32)
        (local.set $el (call $create_element (call $doc) (i32.const 136) (i32.const 5)))
        (i32.store (i32.const 312) (call $attach_shadow (local.get $el) (i32.const 0)))
        (call $exception_take))

    (func (export "form") (result i32)
        (local $input i32)
        (local.set $input (call $create_element (call $doc) (i32.const 136) (i32.const 5)))
        (call $set_value (local.get $input) (i32.const 144) (i32.const 5))
        (call $value (local.get $input) (i32.const 512))
        (call $set_disabled (local.get $input) (i32.const 1))
        (call $set_checked (local.get $input) (i32.const 1))
        (i32.store (i32.const 312) (call $instance_of (local.get $input) (i32.const 25)))
        (local.get $input))

    (func (export "objects") (result i32)
        (local $o i32)
        (local $n i32)
        (local.set $o (call $object_new))
        (local.set $n (call $number_new (f64.const 2.5)))
        (call $set_property (local.get $o) (i32.const 152) (i32.const 3) (local.get $n))
        (call $set_property (local.get $o) (i32.const 176) (i32.const 1)
            (call $string_new (i32.const 24) (i32.const 5)))
        (i32.store (i32.const 312) (call $get_property (local.get $o) (i32.const 152) (i32.const 3)))
        (i32.store (i32.const 316) (call $get_index (local.get $o) (i32.const 0)))
        (i32.store (i32.const 320)
            (call $is_undefined (call $get_property (local.get $o) (i32.const 40) (i32.const 4))))
        (i32.store (i32.const 324) (call $is_object (local.get $o)))
        (i32.store (i32.const 328) (call $is_function (local.get $o)))
        (i32.store (i32.const 332) (call $is_string (i32.load (i32.const 316))))
        (i32.store (i32.const 336) (call $is_string (local.get $n)))
        (i32.store (i32.const 340) (call $boolean_get (local.get $n)))
        (i32.store (i32.const 344) (call $boolean_get (i32.const 2)))
        (i32.store (i32.const 348) (call $boolean_get (i32.const 3)))
        (i32.store (i32.const 352) (call $is_null (i32.const 1)))
        (i32.store (i32.const 356) (call $is_object (call $global_window)))
        (local.get $o))

    (func (export "unknown_kind") (result i32)
        (i32.store (i32.const 312) (call $instance_of (call $object_new) (i32.const 99)))
        (call $exception_take))

    (func (export "get_on_number") (result i32)
        (i32.store (i32.const 312)
            (call $get_property (call $number_new (f64.const 1)) (i32.const 152) (i32.const 3)))
        (call $exception_take))

    (func (export "globals")
        (local $doc i32)
        (local $perf i32)
        (local.set $doc (call $document (call $global_window)))
        (i32.store (i32.const 312) (local.get $doc))
        (i32.store (i32.const 316) (call $head (local.get $doc)))
        (call $local_name (i32.load (i32.const 316)) (i32.const 512))
        (local.set $perf (call $performance (call $global_window)))
        (i32.store (i32.const 320) (local.get $perf))
        (f64.store (i32.const 576) (call $now (local.get $perf)))
        (i32.store (i32.const 324) (call $instance_of (call $global_window) (i32.const 0))))

    (func (export "no_document") (result i32)
        (call $document (call $global_window)))
"#;

fn wat() -> String {
    guest(IMPORTS, BODY)
}

// ── Test: creation and lookup ──

#[test]
fn test_get_element_by_id_finds_attached_element() {
    let mut instance = started(&wat());
    let found = instance.call_export::<(), i32>("find_main", ()).unwrap();
    let div = stored_object(&mut instance, HANDLE_A);
    assert!(instance.value(found as u32).unwrap().as_object().unwrap().ptr_eq(&div));

    assert_eq!(instance.call_export::<(), i32>("find_missing", ()).unwrap(), 0);
}

#[test]
fn test_text_and_comment_nodes() {
    let mut instance = started(&wat());
    instance.call_export::<(), ()>("texts", ()).unwrap();

    assert_eq!(read_ret_string(&mut instance, RET_AREA).as_deref(), Some("hello world"));
    assert_eq!(read_i32(&mut instance, 312), 2);
    assert_eq!(read_i32(&mut instance, 316), 3, "TEXT_NODE");
    assert_eq!(read_i32(&mut instance, 320), 8, "COMMENT_NODE");
    assert_eq!(read_ret_string(&mut instance, RET_AREA_2).as_deref(), Some("note"));
    assert_eq!(read_ret_string(&mut instance, 544).as_deref(), Some("hellonote"));

    let exception = stored_value(&mut instance, 324);
    assert!(exception.debug_string().starts_with("TypeError:"), "got {}", exception.debug_string());
}

#[test]
fn test_html_names_are_normalized() {
    let mut instance = started(&wat());
    let handle = instance.call_export::<(), i32>("names", ()).unwrap();

    assert_eq!(read_ret_string(&mut instance, RET_AREA).as_deref(), Some("SECTION"));
    assert_eq!(read_ret_string(&mut instance, RET_AREA_2).as_deref(), Some("section"));
    assert_eq!(read_i32(&mut instance, 312), 1, "ELEMENT_NODE");
    assert_eq!(read_i32(&mut instance, 316), 9, "DOCUMENT_NODE");
    let element = instance.value(handle as u32).unwrap();
    assert_eq!(element.as_object().unwrap().class_name(), "HTMLElement");
}

#[test]
fn test_namespaced_element_is_not_html() {
    let mut instance = started(&wat());
    instance.call_export::<(), i32>("svg", ()).unwrap();

    assert_eq!(read_ret_string(&mut instance, RET_AREA).as_deref(), Some("rect"));
    assert_eq!(read_i32(&mut instance, 312), 0, "not an HTMLElement");
    assert_eq!(read_i32(&mut instance, 316), 1, "still an Element");
    assert_eq!(read_i32(&mut instance, 320), 1, "the div is an HTMLElement");
}

#[test]
fn test_invalid_element_name_is_captured() {
    let mut instance = started(&wat());
    let exception = instance.call_export::<(), i32>("bad_name", ()).unwrap();
    assert_eq!(read_i32(&mut instance, 312), 0);
    let value = instance.value(exception as u32).unwrap();
    assert!(
        value.debug_string().starts_with("InvalidCharacterError:"),
        "got {}",
        value.debug_string()
    );
}

// ── Test: tree edits ──

#[test]
fn test_insert_adjacent_element_positions() {
    let mut instance = started(&wat());
    instance.call_export::<(), ()>("adjacent", ()).unwrap();

    let div = stored_object(&mut instance, HANDLE_A);
    let span = stored_object(&mut instance, 332);
    let front = stored_object(&mut instance, 336);

    assert!(stored_object(&mut instance, 312).ptr_eq(&span), "returns the inserted element");
    assert!(stored_object(&mut instance, 316).ptr_eq(&front));
    assert!(stored_object(&mut instance, 320).ptr_eq(&span));
    assert!(stored_object(&mut instance, 324).ptr_eq(&div));
    assert_eq!(read_i32(&mut instance, 328), 0, "out-of-range child is undefined");
    assert_eq!(dom::child_count(&div), 2);

    assert_eq!(read_i32(&mut instance, 340), 0);
    let exception = stored_value(&mut instance, 344);
    assert!(exception.debug_string().starts_with("SyntaxError:"), "got {}", exception.debug_string());
}

#[test]
fn test_remove_and_replace() {
    let mut instance = started(&wat());
    let exception = instance.call_export::<(), i32>("edit", ()).unwrap();

    assert_eq!(read_i32(&mut instance, 312), 11, "DOCUMENT_FRAGMENT_NODE");
    assert_eq!(read_i32(&mut instance, 316), 1);
    assert_eq!(read_i32(&mut instance, 320), 0);
    assert_eq!(read_i32(&mut instance, 324), 0, "a removed node has no parent");
    assert_eq!(read_i32(&mut instance, 328), 3, "replaced by a text node");
    assert_eq!(read_i32(&mut instance, 332), 0);

    let value = instance.value(exception as u32).unwrap();
    assert!(value.debug_string().starts_with("NotFoundError:"), "got {}", value.debug_string());
}

// ── Test: attributes ──

#[test]
fn test_attribute_round_trip() {
    let mut instance = started(&wat());
    instance.call_export::<(), ()>("attributes", ()).unwrap();

    assert_eq!(read_ret_string(&mut instance, RET_AREA).as_deref(), Some("hello"));
    assert_eq!(read_ret_string(&mut instance, RET_AREA_2), None, "removed");
    assert_eq!(read_ret_string(&mut instance, 544).as_deref(), Some("note"));
    assert_eq!(read_ret_string(&mut instance, 560).as_deref(), Some("main"));

    let div = stored_object(&mut instance, HANDLE_A);
    assert_eq!(dom::get_attribute(&div, "title").unwrap(), None);
    assert_eq!(dom::get_attribute(&div, "x").unwrap().as_deref(), Some("note"));
}

// ── Test: shadow roots ──

#[test]
fn test_open_and_closed_shadow_roots() {
    let mut instance = started(&wat());
    instance.call_export::<(), ()>("shadow", ()).unwrap();

    let open = stored_object(&mut instance, 312);
    assert!(stored_object(&mut instance, 316).ptr_eq(&open));
    assert_eq!(read_i32(&mut instance, 320), 1, "a ShadowRoot");
    assert_eq!(read_i32(&mut instance, 324), 1, "and a DocumentFragment");

    assert_ne!(read_i32(&mut instance, 328), 0);
    assert_eq!(read_i32(&mut instance, 332), 0, "closed roots are hidden");

    assert_eq!(read_i32(&mut instance, 336), 0);
    let exception = stored_value(&mut instance, 340);
    assert!(
        exception.debug_string().starts_with("NotSupportedError:"),
        "got {}",
        exception.debug_string()
    );
}

#[test]
fn test_invalid_shadow_mode_is_type_error() {
    let mut instance = started(&wat());
    let exception = instance.call_export::<(), i32>("bad_mode", ()).unwrap();
    assert_eq!(read_i32(&mut instance, 312), 0);
    let value = instance.value(exception as u32).unwrap();
    assert!(value.debug_string().starts_with("TypeError:"), "got {}", value.debug_string());
}

#[test]
fn test_input_cannot_host_shadow_root() {
    let mut instance = started(&wat());
    let exception = instance.call_export::<(), i32>("unshadowable", ()).unwrap();
    assert_eq!(read_i32(&mut instance, 312), 0);
    let value = instance.value(exception as u32).unwrap();
    assert!(value.debug_string().starts_with("NotSupportedError:"));
}

// ── Test: form controls ──

#[test]
fn test_form_control_state() {
    let mut instance = started(&wat());
    let handle = instance.call_export::<(), i32>("form", ()).unwrap();

    assert_eq!(read_ret_string(&mut instance, RET_AREA).as_deref(), Some("typed"));
    assert_eq!(read_i32(&mut instance, 312), 1, "an HTMLInputElement");

    let input = instance.value(handle as u32).unwrap().as_object().cloned().unwrap();
    assert_eq!(input.class_name(), "HTMLInputElement");
    assert_eq!(dom::value(&input).unwrap(), "typed");
    assert!(dom::disabled(&input).unwrap());
    assert!(dom::checked(&input).unwrap());
}

// ── Test: plain objects and predicates ──

#[test]
fn test_object_properties_and_predicates() {
    let mut instance = started(&wat());
    let handle = instance.call_export::<(), i32>("objects", ()).unwrap();

    assert_eq!(stored_value(&mut instance, 312).as_number(), Some(2.5));
    assert_eq!(stored_value(&mut instance, 316).as_str(), Some("hello"));
    assert_eq!(read_i32(&mut instance, 320), 1, "missing property is undefined");
    assert_eq!(read_i32(&mut instance, 324), 1);
    assert_eq!(read_i32(&mut instance, 328), 0);
    assert_eq!(read_i32(&mut instance, 332), 1);
    assert_eq!(read_i32(&mut instance, 336), 0);
    assert_eq!(read_i32(&mut instance, 340), 2, "a number is not a boolean");
    assert_eq!(read_i32(&mut instance, 344), 1);
    assert_eq!(read_i32(&mut instance, 348), 0);
    assert_eq!(read_i32(&mut instance, 352), 1);
    assert_eq!(read_i32(&mut instance, 356), 1);

    let object = instance.value(handle as u32).unwrap();
    assert_eq!(object.as_object().unwrap().property("key").as_number(), Some(2.5));
}

#[test]
fn test_unknown_kind_is_type_error() {
    let mut instance = started(&wat());
    let exception = instance.call_export::<(), i32>("unknown_kind", ()).unwrap();
    assert_eq!(read_i32(&mut instance, 312), 0);
    let value = instance.value(exception as u32).unwrap();
    assert!(value.debug_string().starts_with("TypeError:"), "got {}", value.debug_string());
}

#[test]
fn test_property_read_on_non_object_is_captured() {
    let mut instance = started(&wat());
    let exception = instance.call_export::<(), i32>("get_on_number", ()).unwrap();
    assert_eq!(read_i32(&mut instance, 312), 0);
    assert!(instance.value(exception as u32).unwrap().debug_string().starts_with("TypeError:"));
}

// ── Test: globals ──

#[test]
fn test_global_accessors() {
    let mut instance = started(&wat());
    instance.call_export::<(), ()>("globals", ()).unwrap();

    let doc = stored_object(&mut instance, 312);
    assert!(doc.ptr_eq(&instance.document().unwrap()));
    assert!(doc.ptr_eq(&stored_object(&mut instance, HANDLE_B)), "one document per host");
    assert_eq!(read_ret_string(&mut instance, RET_AREA).as_deref(), Some("head"));
    assert_ne!(read_i32(&mut instance, 320), 0);
    assert_eq!(read_f64(&mut instance, 576), 0.0);
    assert_eq!(read_i32(&mut instance, 324), 1, "the global is a Window");
}

#[test]
fn test_host_without_document() {
    let mut instance = instantiate_with(&wat(), BridgeConfig::default(), MemHost::without_document());
    assert_eq!(instance.call_export::<(), i32>("no_document", ()).unwrap(), 0);
    assert!(instance.document().is_none());
}
