//! Linear memory view tests: reads after growth, host writes, and string
//! returns that force the guest allocator to grow memory.

mod common;

use boundary_hostapi::HostValue;

use common::*;

const IMPORTS: &str = r#"
    (import "boundary" "string_get" (func $string_get (param i32 i32)))
"#;

const BODY: &str = r#"
    (func (export "start"))

    ;; Grow by one page and mark the first word of the new page.
    (func (export "grow_and_mark") (result i32)
        (local $old i32)
        (local.set $old (memory.grow (i32.const 1)))
        (i32.store (i32.mul (local.get $old) (i32.const 65536)) (i32.const 0xabcd))
        (local.get $old))

    (func (export "peek") (param $addr i32) (result i32)
        (i32.load (local.get $addr)))

    (func (export "fetch") (param $h i32)
        (call $string_get (local.get $h) (i32.const 512)))
"#;

#[test]
fn test_read_after_growth_sees_new_buffer() {
    let mut instance = started(&guest(IMPORTS, BODY));
    assert_eq!(instance.bytes().len(), 65536);
    let generation = instance.memory_generation();

    let old_pages = instance.call_export::<(), i32>("grow_and_mark", ()).unwrap();
    assert_eq!(old_pages, 1);

    assert_eq!(instance.bytes().len(), 2 * 65536);
    assert_eq!(read_i32(&mut instance, 65536), 0xabcd);
    assert!(instance.memory_generation() > generation);
}

#[test]
fn test_view_is_stable_without_calls() {
    let mut instance = started(&guest(IMPORTS, BODY));
    let _ = instance.bytes();
    let generation = instance.memory_generation();
    let _ = instance.bytes();
    let _ = instance.words().u32(0).unwrap();
    assert_eq!(instance.memory_generation(), generation);
}

#[test]
fn test_host_writes_are_visible_to_guest() {
    let mut instance = started(&guest(IMPORTS, BODY));
    instance.words().set_i32(600, -7).unwrap();
    assert_eq!(instance.call_export::<i32, i32>("peek", 600).unwrap(), -7);

    instance.bytes_mut()[604..608].copy_from_slice(&9i32.to_le_bytes());
    assert_eq!(instance.call_export::<i32, i32>("peek", 604).unwrap(), 9);
}

#[test]
fn test_out_of_range_words_fail() {
    let mut instance = started(&guest(IMPORTS, BODY));
    assert!(instance.words().i32(65534).is_err());
    assert!(instance.words().f64(u32::MAX).is_err());
}

#[test]
fn test_large_string_return_grows_memory() {
    let mut instance = started(&guest(IMPORTS, BODY));
    let text: String = "wasm boundary ".repeat(20_000);
    let handle = instance.expose(HostValue::from(text.as_str())).unwrap();

    instance.call_export::<i32, ()>("fetch", handle as i32).unwrap();

    assert!(instance.memory_size() > text.len());
    assert_eq!(read_ret_string(&mut instance, RET_AREA).as_deref(), Some(text.as_str()));
}
