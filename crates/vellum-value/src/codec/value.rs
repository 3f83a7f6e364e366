//! Value encoding.
//!
//! | Kind | Payload |
//! |---|---|
//! | Bool | `u8` 0 or 1 |
//! | Number | `f64` |
//! | String | `u32` length + UTF-8 |
//! | Blob, List, Set, Map | sequence node |
//! | Ref | target type, target hash (hex string), height `u64` |
//! | Struct | name, field declarations, field values (untagged where the field type is concrete) |
//! | Type | type encoding |

use vellum_hash::Hash;

use super::primitives::{Reader, Writer};
use super::types::{read_struct_header, read_type, write_struct_header, write_type};
use crate::blob::Blob;
use crate::error::DecodeError;
use crate::kind::Kind;
use crate::list::List;
use crate::map::Map;
use crate::reference::Ref;
use crate::sequence::Sequence;
use crate::set::Set;
use crate::structs::Struct;
use crate::types::Type;
use crate::value::Value;

/// Write a value preceded by its kind tag.
pub fn write_value(w: &mut Writer, value: &Value) {
    w.write_u8(value.kind().tag());
    write_payload(w, value);
}

/// Write a value without its kind tag.
pub fn write_payload(w: &mut Writer, value: &Value) {
    match value {
        Value::Bool(b) => w.write_bool(*b),
        Value::Number(n) => w.write_f64(*n),
        Value::String(s) => w.write_string(s),
        Value::Blob(blob) => blob.sequence().write_node(w),
        Value::List(list) => list.sequence().write_node(w),
        Value::Set(set) => set.sequence().write_node(w),
        Value::Map(map) => map.sequence().write_node(w),
        Value::Ref(r) => write_ref(w, r),
        Value::Struct(s) => write_struct(w, s),
        Value::Type(t) => write_type(w, t),
    }
}

/// Write a ref payload.
pub fn write_ref(w: &mut Writer, r: &Ref) {
    write_type(w, r.target_type());
    w.write_string(&r.target().to_hex());
    w.write_u64(r.height());
}

fn write_struct(w: &mut Writer, s: &Struct) {
    let desc = s.desc();
    write_struct_header(w, desc);
    for ((_, ty), value) in desc.fields().iter().zip(s.values()) {
        write_in_slot(w, ty, value);
    }
}

/// Write `value` into a slot of static type `ty`: untagged when the type
/// fixes the kind, tagged otherwise.
pub(crate) fn write_in_slot(w: &mut Writer, ty: &Type, value: &Value) {
    if ty.concrete_kind().is_some() {
        write_payload(w, value);
    } else {
        write_value(w, value);
    }
}

/// Read a tagged value.
pub fn read_value(r: &mut Reader<'_>) -> Result<Value, DecodeError> {
    let kind = Kind::from_u8(r.read_u8("value kind")?)?;
    read_payload(r, kind)
}

/// Read the payload of a value of `kind`.
pub fn read_payload(r: &mut Reader<'_>, kind: Kind) -> Result<Value, DecodeError> {
    r.enter()?;
    let value = match kind {
        Kind::Bool => Value::Bool(r.read_bool("bool")?),
        Kind::Number => Value::Number(r.read_f64("number")?),
        Kind::String => Value::String(r.read_string("string")?),
        Kind::Blob => Value::Blob(Blob::from_sequence(Sequence::read_node(r, kind)?)),
        Kind::List => Value::List(List::from_sequence(Sequence::read_node(r, kind)?)),
        Kind::Set => Value::Set(Set::from_sequence(Sequence::read_node(r, kind)?)),
        Kind::Map => Value::Map(Map::from_sequence(Sequence::read_node(r, kind)?)),
        Kind::Ref => Value::Ref(read_ref(r)?),
        Kind::Struct => Value::Struct(read_struct(r)?),
        Kind::Type => Value::Type(read_type(r)?),
        Kind::Value | Kind::Cycle | Kind::Union => {
            return Err(DecodeError::UnexpectedKind {
                context: "value",
                found: kind,
            })
        }
    };
    r.leave();
    Ok(value)
}

/// Read the value in a slot of static type `ty`.
pub(crate) fn read_in_slot(r: &mut Reader<'_>, ty: &Type) -> Result<Value, DecodeError> {
    match ty.concrete_kind() {
        Some(kind) => read_payload(r, kind),
        None => read_value(r),
    }
}

/// Read a ref payload.
pub fn read_ref(r: &mut Reader<'_>) -> Result<Ref, DecodeError> {
    let target_type = read_type(r)?;
    let hex = r.read_string("ref target")?;
    let target = Hash::from_hex(&hex).map_err(|e| DecodeError::InvalidHash(e.to_string()))?;
    let height = r.read_u64("ref height")?;
    Ok(Ref::new(target, target_type, height))
}

fn read_struct(r: &mut Reader<'_>) -> Result<Struct, DecodeError> {
    let ty = read_struct_header(r)?;
    let desc = ty
        .as_struct()
        .ok_or(DecodeError::MalformedSequence { context: "struct header" })?;
    let mut values = Vec::with_capacity(desc.len());
    for (name, field_ty) in desc.fields() {
        let value = read_in_slot(r, field_ty)?;
        if !field_ty.accepts(&value) {
            return Err(DecodeError::FieldTypeMismatch {
                field: name.clone(),
                found: value.kind(),
            });
        }
        values.push(value);
    }
    Ok(Struct::from_parts(ty.clone(), values))
}
