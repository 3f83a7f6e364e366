//! Type grammar encoding.
//!
//! ```text
//! primitive  := kind
//! List|Set|Ref := kind type
//! Map        := kind type type
//! Struct     := kind name:string count:u32 (field:string type)*
//! Union      := kind count:u32 type*        members sorted by hash
//! Cycle      := kind depth:u32
//! ```
//!
//! A cycle marker may point past the outermost struct of a standalone type
//! (an open field type such as `List<Cycle<0>>`). The header of a struct
//! value must bind every marker.

use std::fmt::Write as _;

use super::primitives::{Reader, Writer};
use crate::error::DecodeError;
use crate::kind::Kind;
use crate::types::{is_valid_field_name, StructDesc, Type, TypeDesc};

// smallest field encoding: empty name plus a primitive type byte
const MIN_FIELD_SIZE: u64 = 5;

/// Write the encoding of `ty`.
pub fn write_type(w: &mut Writer, ty: &Type) {
    match ty.desc() {
        TypeDesc::Primitive(kind) => w.write_u8(kind.tag()),
        TypeDesc::Compound { kind, elems } => {
            w.write_u8(kind.tag());
            for elem in elems {
                write_type(w, elem);
            }
        }
        TypeDesc::Struct(desc) => {
            w.write_u8(Kind::Struct.tag());
            write_struct_header(w, desc);
        }
        TypeDesc::Union(members) => {
            w.write_u8(Kind::Union.tag());
            w.write_u32(members.len() as u32);
            for member in members {
                write_type(w, member);
            }
        }
        TypeDesc::Cycle(depth) => {
            w.write_u8(Kind::Cycle.tag());
            w.write_u32(*depth);
        }
    }
}

/// Struct name and field declarations, without the kind tag.
///
/// Shared by struct types and struct values.
pub(crate) fn write_struct_header(w: &mut Writer, desc: &StructDesc) {
    w.write_string(desc.name());
    w.write_u32(desc.len() as u32);
    for (name, field) in desc.fields() {
        w.write_string(name);
        write_type(w, field);
    }
}

/// Read a struct header written by [`write_struct_header`]. Every cycle
/// marker must point at a struct within the header.
pub(crate) fn read_struct_header(r: &mut Reader<'_>) -> Result<Type, DecodeError> {
    read_struct_type(r, Scope::closed())
}

/// The encoding of `ty` on its own.
pub fn encode_type(ty: &Type) -> Vec<u8> {
    let mut w = Writer::new();
    write_type(&mut w, ty);
    w.into_bytes()
}

/// The encoding of `ty` as a tagged value, the bytes its hash covers.
pub fn encode_type_value(ty: &Type) -> Vec<u8> {
    let mut w = Writer::new();
    w.write_u8(Kind::Type.tag());
    write_type(&mut w, ty);
    w.into_bytes()
}

/// Read a type. Open types are accepted, so every type that can be built
/// reads back unchanged.
pub fn read_type(r: &mut Reader<'_>) -> Result<Type, DecodeError> {
    read_type_within(r, Scope::open())
}

/// Struct levels enclosing the type being read.
#[derive(Clone, Copy)]
struct Scope {
    structs: u32,
    closed: bool,
}

impl Scope {
    fn open() -> Self {
        Self {
            structs: 0,
            closed: false,
        }
    }

    fn closed() -> Self {
        Self {
            structs: 0,
            closed: true,
        }
    }

    fn enter_struct(self) -> Self {
        Self {
            structs: self.structs + 1,
            ..self
        }
    }
}

fn read_type_within(r: &mut Reader<'_>, scope: Scope) -> Result<Type, DecodeError> {
    r.enter()?;
    let kind = Kind::from_u8(r.read_u8("type kind")?)?;
    let ty = match kind {
        Kind::Bool | Kind::Number | Kind::String | Kind::Blob | Kind::Value | Kind::Type => {
            Type::primitive(kind).map_err(|_| DecodeError::UnexpectedKind {
                context: "primitive type",
                found: kind,
            })?
        }
        Kind::List | Kind::Set | Kind::Ref => {
            let elem = read_type_within(r, scope)?;
            Type::compound(kind, vec![elem])
        }
        Kind::Map => {
            let key = read_type_within(r, scope)?;
            let value = read_type_within(r, scope)?;
            Type::compound(kind, vec![key, value])
        }
        Kind::Struct => read_struct_type(r, scope)?,
        Kind::Union => {
            let count = r.read_u32("union member count")? as usize;
            if count > r.remaining_len() {
                return Err(DecodeError::LengthExceedsInput {
                    field: "union member count",
                    len: count as u64,
                    available: r.remaining_len(),
                });
            }
            let mut members: Vec<Type> = Vec::with_capacity(count);
            for _ in 0..count {
                let member = read_type_within(r, scope)?;
                if let Some(prev) = members.last() {
                    if prev.hash() >= member.hash() {
                        return Err(DecodeError::NonCanonicalOrder {
                            context: "union members",
                        });
                    }
                }
                members.push(member);
            }
            Type::from_sorted_union(members)
        }
        Kind::Cycle => {
            let depth = r.read_u32("cycle depth")?;
            if scope.closed && depth >= scope.structs {
                return Err(DecodeError::UnboundCycle { depth });
            }
            Type::make_cycle(depth)
        }
    };
    r.leave();
    Ok(ty)
}

fn read_struct_type(r: &mut Reader<'_>, scope: Scope) -> Result<Type, DecodeError> {
    let name = r.read_string("struct name")?;
    let count = r.read_u32("struct field count")? as u64;
    let available = r.remaining_len();
    if count * MIN_FIELD_SIZE > available as u64 {
        return Err(DecodeError::LengthExceedsInput {
            field: "struct field count",
            len: count,
            available,
        });
    }
    let mut fields: Vec<(String, Type)> = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let field = r.read_string("struct field name")?;
        if !is_valid_field_name(&field) {
            return Err(DecodeError::InvalidFieldName { name: field });
        }
        if fields.iter().any(|(n, _)| *n == field) {
            return Err(DecodeError::DuplicateField { name: field });
        }
        let ty = read_type_within(r, scope.enter_struct())?;
        fields.push((field, ty));
    }
    Ok(Type::from_struct_parts(name, fields))
}

/// Render an encoded type as text.
pub fn describe_type(bytes: &[u8]) -> Result<String, DecodeError> {
    let mut r = Reader::new(bytes);
    let mut out = String::new();
    render(&mut r, 0, &mut out)?;
    if !r.is_empty() {
        return Err(DecodeError::TrailingBytes {
            remaining: r.remaining_len(),
        });
    }
    Ok(out)
}

fn render(r: &mut Reader<'_>, indent: usize, out: &mut String) -> Result<(), DecodeError> {
    r.enter()?;
    let kind = Kind::from_u8(r.read_u8("type kind")?)?;
    match kind {
        Kind::Bool | Kind::Number | Kind::String | Kind::Blob | Kind::Value | Kind::Type => {
            out.push_str(kind.name());
        }
        Kind::List | Kind::Set | Kind::Ref => {
            out.push_str(kind.name());
            out.push('<');
            render(r, indent, out)?;
            out.push('>');
        }
        Kind::Map => {
            out.push_str("Map<");
            render(r, indent, out)?;
            out.push_str(", ");
            render(r, indent, out)?;
            out.push('>');
        }
        Kind::Union => {
            let count = r.read_u32("union member count")?;
            out.push_str("Union<");
            for i in 0..count {
                if i > 0 {
                    out.push_str(", ");
                }
                render(r, indent, out)?;
            }
            out.push('>');
        }
        Kind::Cycle => {
            let depth = r.read_u32("cycle depth")?;
            let _ = write!(out, "Cycle<{depth}>");
        }
        Kind::Struct => {
            let name = r.read_string("struct name")?;
            let count = r.read_u32("struct field count")?;
            out.push_str("struct ");
            if !name.is_empty() {
                out.push_str(&name);
                out.push(' ');
            }
            out.push('{');
            if count > 0 {
                out.push('\n');
                for _ in 0..count {
                    let field = r.read_string("struct field name")?;
                    let _ = write!(out, "{:width$}{field}: ", "", width = indent + 2);
                    render(r, indent + 2, out)?;
                    out.push('\n');
                }
                let _ = write!(out, "{:width$}", "", width = indent);
            }
            out.push('}');
        }
    }
    r.leave();
    Ok(())
}
