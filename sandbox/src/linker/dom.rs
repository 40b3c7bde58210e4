//! Object-tree manipulation.

use wasmtime::{Caller, Linker};

use boundary_hostapi::{dom, HostError, ShadowRootMode};

use super::{expose, guarded, object_arg, opt_str_arg, return_string, str_arg, MODULE};
use crate::error::BridgeError;
use crate::host_impl::HostState;

pub(super) fn register(linker: &mut Linker<HostState>) -> Result<(), BridgeError> {
    register_creation(linker)?;
    register_tree(linker)?;
    register_node_properties(linker)?;
    register_attributes(linker)?;
    register_shadow(linker)?;
    register_form_controls(linker)?;
    Ok(())
}

// ── Creation ──

fn register_creation(linker: &mut Linker<HostState>) -> Result<(), BridgeError> {
    linker.func_wrap(
        MODULE,
        "create_element",
        |mut caller: Caller<'_, HostState>, doc: i32, ptr: i32, len: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let doc = object_arg(caller, doc)?;
                let name = str_arg(caller, ptr, len)?;
                expose(caller, dom::create_element(&doc, &name)?)
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "create_element_ns",
        |mut caller: Caller<'_, HostState>,
         doc: i32,
         ns_ptr: i32,
         ns_len: i32,
         name_ptr: i32,
         name_len: i32|
         -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let doc = object_arg(caller, doc)?;
                let namespace = opt_str_arg(caller, ns_ptr, ns_len)?;
                let name = str_arg(caller, name_ptr, name_len)?;
                expose(caller, dom::create_element_ns(&doc, namespace.as_deref(), &name)?)
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "create_text_node",
        |mut caller: Caller<'_, HostState>, doc: i32, ptr: i32, len: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let doc = object_arg(caller, doc)?;
                let data = str_arg(caller, ptr, len)?;
                expose(caller, dom::create_text_node(&doc, &data)?)
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "create_comment",
        |mut caller: Caller<'_, HostState>, doc: i32, ptr: i32, len: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let doc = object_arg(caller, doc)?;
                let data = str_arg(caller, ptr, len)?;
                expose(caller, dom::create_comment(&doc, &data)?)
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "create_document_fragment",
        |mut caller: Caller<'_, HostState>, doc: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let doc = object_arg(caller, doc)?;
                expose(caller, dom::create_document_fragment(&doc)?)
            })
        },
    )?;
    Ok(())
}

// ── Tree ──

fn register_tree(linker: &mut Linker<HostState>) -> Result<(), BridgeError> {
    linker.func_wrap(
        MODULE,
        "get_element_by_id",
        |mut caller: Caller<'_, HostState>, root: i32, ptr: i32, len: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let root = object_arg(caller, root)?;
                let id = str_arg(caller, ptr, len)?;
                expose(caller, dom::get_element_by_id(&root, &id))
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "append_child",
        |mut caller: Caller<'_, HostState>, parent: i32, child: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let parent = object_arg(caller, parent)?;
                let child = object_arg(caller, child)?;
                expose(caller, dom::append_child(&parent, &child)?)
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "remove_child",
        |mut caller: Caller<'_, HostState>, parent: i32, child: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let parent = object_arg(caller, parent)?;
                let child = object_arg(caller, child)?;
                expose(caller, dom::remove_child(&parent, &child)?)
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "replace_with",
        |mut caller: Caller<'_, HostState>, node: i32, replacement: i32| -> anyhow::Result<()> {
            guarded(&mut caller, |caller| {
                let node = object_arg(caller, node)?;
                let replacement = object_arg(caller, replacement)?;
                Ok(dom::replace_with(&node, &replacement)?)
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "insert_adjacent_element",
        |mut caller: Caller<'_, HostState>, target: i32, ptr: i32, len: i32, element: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let target = object_arg(caller, target)?;
                let position = str_arg(caller, ptr, len)?;
                let element = object_arg(caller, element)?;
                expose(caller, dom::insert_adjacent_element(&target, &position, &element)?)
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "last_child",
        |mut caller: Caller<'_, HostState>, node: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let node = object_arg(caller, node)?;
                expose(caller, dom::last_child(&node))
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "parent_node",
        |mut caller: Caller<'_, HostState>, node: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let node = object_arg(caller, node)?;
                expose(caller, dom::parent_node(&node))
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "child_count",
        |mut caller: Caller<'_, HostState>, node: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let node = object_arg(caller, node)?;
                Ok(dom::child_count(&node) as i32)
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "child_at",
        |mut caller: Caller<'_, HostState>, node: i32, index: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let node = object_arg(caller, node)?;
                expose(caller, dom::child_at(&node, index as u32 as usize))
            })
        },
    )?;
    Ok(())
}

// ── Node properties ──

fn register_node_properties(linker: &mut Linker<HostState>) -> Result<(), BridgeError> {
    linker.func_wrap(
        MODULE,
        "node_type",
        |mut caller: Caller<'_, HostState>, node: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let node = object_arg(caller, node)?;
                Ok(dom::node_type(&node) as i32)
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "tag_name",
        |mut caller: Caller<'_, HostState>, node: i32, ret_ptr: i32| -> anyhow::Result<()> {
            guarded(&mut caller, |caller| {
                let node = object_arg(caller, node)?;
                let name = dom::tag_name(&node);
                return_string(caller, ret_ptr, name.as_deref())
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "local_name",
        |mut caller: Caller<'_, HostState>, node: i32, ret_ptr: i32| -> anyhow::Result<()> {
            guarded(&mut caller, |caller| {
                let node = object_arg(caller, node)?;
                let name = dom::local_name(&node);
                return_string(caller, ret_ptr, name.as_deref())
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "text_data",
        |mut caller: Caller<'_, HostState>, node: i32, ret_ptr: i32| -> anyhow::Result<()> {
            guarded(&mut caller, |caller| {
                let node = object_arg(caller, node)?;
                let data = dom::text_data(&node)?;
                return_string(caller, ret_ptr, Some(&data))
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "set_text_data",
        |mut caller: Caller<'_, HostState>, node: i32, ptr: i32, len: i32| -> anyhow::Result<()> {
            guarded(&mut caller, |caller| {
                let node = object_arg(caller, node)?;
                let data = str_arg(caller, ptr, len)?;
                Ok(dom::set_text_data(&node, &data)?)
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "whole_text",
        |mut caller: Caller<'_, HostState>, node: i32, ret_ptr: i32| -> anyhow::Result<()> {
            guarded(&mut caller, |caller| {
                let node = object_arg(caller, node)?;
                let text = dom::whole_text(&node)?;
                return_string(caller, ret_ptr, Some(&text))
            })
        },
    )?;
    Ok(())
}

// ── Attributes ──

fn register_attributes(linker: &mut Linker<HostState>) -> Result<(), BridgeError> {
    linker.func_wrap(
        MODULE,
        "set_attribute",
        |mut caller: Caller<'_, HostState>,
         node: i32,
         name_ptr: i32,
         name_len: i32,
         value_ptr: i32,
         value_len: i32|
         -> anyhow::Result<()> {
            guarded(&mut caller, |caller| {
                let node = object_arg(caller, node)?;
                let name = str_arg(caller, name_ptr, name_len)?;
                let value = str_arg(caller, value_ptr, value_len)?;
                Ok(dom::set_attribute(&node, &name, &value)?)
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "set_attribute_ns",
        |mut caller: Caller<'_, HostState>,
         node: i32,
         ns_ptr: i32,
         ns_len: i32,
         name_ptr: i32,
         name_len: i32,
         value_ptr: i32,
         value_len: i32|
         -> anyhow::Result<()> {
            guarded(&mut caller, |caller| {
                let node = object_arg(caller, node)?;
                let namespace = opt_str_arg(caller, ns_ptr, ns_len)?;
                let name = str_arg(caller, name_ptr, name_len)?;
                let value = str_arg(caller, value_ptr, value_len)?;
                Ok(dom::set_attribute_ns(&node, namespace.as_deref(), &name, &value)?)
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "get_attribute",
        |mut caller: Caller<'_, HostState>, node: i32, name_ptr: i32, name_len: i32, ret_ptr: i32| -> anyhow::Result<()> {
            guarded(&mut caller, |caller| {
                let node = object_arg(caller, node)?;
                let name = str_arg(caller, name_ptr, name_len)?;
                let value = dom::get_attribute(&node, &name)?;
                return_string(caller, ret_ptr, value.as_deref())
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "remove_attribute",
        |mut caller: Caller<'_, HostState>, node: i32, name_ptr: i32, name_len: i32| -> anyhow::Result<()> {
            guarded(&mut caller, |caller| {
                let node = object_arg(caller, node)?;
                let name = str_arg(caller, name_ptr, name_len)?;
                Ok(dom::remove_attribute(&node, &name)?)
            })
        },
    )?;
    Ok(())
}

// ── Shadow DOM ──

fn register_shadow(linker: &mut Linker<HostState>) -> Result<(), BridgeError> {
    linker.func_wrap(
        MODULE,
        "attach_shadow",
        |mut caller: Caller<'_, HostState>, node: i32, mode: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let node = object_arg(caller, node)?;
                let mode = ShadowRootMode::from_i32(mode).ok_or_else(|| {
                    HostError::type_error(format!("{} is not a valid ShadowRootMode", mode))
                })?;
                expose(caller, dom::attach_shadow(&node, mode)?)
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "shadow_root",
        |mut caller: Caller<'_, HostState>, node: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let node = object_arg(caller, node)?;
                expose(caller, dom::shadow_root(&node))
            })
        },
    )?;
    Ok(())
}

// ── Form controls ──

fn register_form_controls(linker: &mut Linker<HostState>) -> Result<(), BridgeError> {
    linker.func_wrap(
        MODULE,
        "value",
        |mut caller: Caller<'_, HostState>, node: i32, ret_ptr: i32| -> anyhow::Result<()> {
            guarded(&mut caller, |caller| {
                let node = object_arg(caller, node)?;
                let value = dom::value(&node)?;
                return_string(caller, ret_ptr, Some(&value))
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "set_value",
        |mut caller: Caller<'_, HostState>, node: i32, ptr: i32, len: i32| -> anyhow::Result<()> {
            guarded(&mut caller, |caller| {
                let node = object_arg(caller, node)?;
                let value = str_arg(caller, ptr, len)?;
                Ok(dom::set_value(&node, &value)?)
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "set_disabled",
        |mut caller: Caller<'_, HostState>, node: i32, disabled: i32| -> anyhow::Result<()> {
            guarded(&mut caller, |caller| {
                let node = object_arg(caller, node)?;
                Ok(dom::set_disabled(&node, disabled != 0)?)
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "set_checked",
        |mut caller: Caller<'_, HostState>, node: i32, checked: i32| -> anyhow::Result<()> {
            guarded(&mut caller, |caller| {
                let node = object_arg(caller, node)?;
                Ok(dom::set_checked(&node, checked != 0)?)
            })
        },
    )?;
    Ok(())
}
