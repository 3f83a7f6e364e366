use std::fmt;
use std::sync::{Arc, LazyLock, OnceLock};

use vellum_hash::{ContentHasher, Hash};

use crate::codec;
use crate::error::TypeError;
use crate::kind::Kind;
use crate::value::Value;

/// A structural type description.
///
/// Types are immutable and cheap to clone. Two types are equal iff the
/// hashes of their canonical encodings are equal, so equality is structural
/// except that a struct's name is part of its encoding.
///
/// Recursive struct types are represented with [`TypeDesc::Cycle`] markers
/// that name an enclosing struct by nesting depth (0 is the innermost
/// enclosing struct). The representation is therefore always a finite tree;
/// [`Type::field_type`] and [`Type::resolve`] bind markers back to the struct
/// they point at when a caller walks into a field. Decoding keeps the
/// markers as they were written, so a decoded recursive type is the same
/// tree (and has the same hash) as the one that was encoded.
///
/// A type whose markers point past its outermost struct is *open*: it is a
/// field type waiting for its enclosing struct, such as `List<Cycle<0>>`.
/// [`Type::make_struct`] only builds closed struct types, and only closed
/// struct types can describe a struct value.
#[derive(Clone)]
pub struct Type(Arc<TypeInner>);

struct TypeInner {
    desc: TypeDesc,
    // enclosing struct levels the cycle markers need
    open: u32,
    hash: OnceLock<Hash>,
}

/// The shape of a [`Type`].
#[derive(Clone, Debug)]
pub enum TypeDesc {
    /// Bool, Number, String, Blob, Value or Type.
    Primitive(Kind),
    /// List, Set, Ref (one element type) or Map (key and value types).
    Compound { kind: Kind, elems: Vec<Type> },
    Struct(StructDesc),
    /// Members sorted by hash, without duplicates.
    Union(Vec<Type>),
    /// Back-reference to an enclosing struct type.
    Cycle(u32),
}

/// Name and ordered fields of a struct type.
#[derive(Clone, Debug)]
pub struct StructDesc {
    name: String,
    fields: Vec<(String, Type)>,
}

impl StructDesc {
    /// The struct name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in canonical (insertion) order.
    pub fn fields(&self) -> &[(String, Type)] {
        &self.fields
    }

    /// The declared type of a field, with cycle markers left unbound.
    pub fn field(&self, name: &str) -> Option<&Type> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    /// Position of a field in canonical order.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The first field whose cycle markers reach past this struct.
    pub(crate) fn unbound_field(&self) -> Option<&str> {
        self.fields
            .iter()
            .find(|(_, t)| t.open_levels() > 1)
            .map(|(n, _)| n.as_str())
    }
}

/// Returns `true` if `name` matches `^[A-Za-z][A-Za-z0-9_]*$`.
pub fn is_valid_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

static BOOL: LazyLock<Type> = LazyLock::new(|| Type::new(TypeDesc::Primitive(Kind::Bool)));
static NUMBER: LazyLock<Type> = LazyLock::new(|| Type::new(TypeDesc::Primitive(Kind::Number)));
static STRING: LazyLock<Type> = LazyLock::new(|| Type::new(TypeDesc::Primitive(Kind::String)));
static BLOB: LazyLock<Type> = LazyLock::new(|| Type::new(TypeDesc::Primitive(Kind::Blob)));
static VALUE: LazyLock<Type> = LazyLock::new(|| Type::new(TypeDesc::Primitive(Kind::Value)));
static TYPE: LazyLock<Type> = LazyLock::new(|| Type::new(TypeDesc::Primitive(Kind::Type)));

impl Type {
    pub(crate) fn new(desc: TypeDesc) -> Self {
        let open = match &desc {
            TypeDesc::Primitive(_) => 0,
            TypeDesc::Compound { elems: types, .. } | TypeDesc::Union(types) => {
                types.iter().map(Type::open_levels).max().unwrap_or(0)
            }
            TypeDesc::Struct(s) => s
                .fields
                .iter()
                .map(|(_, t)| t.open_levels().saturating_sub(1))
                .max()
                .unwrap_or(0),
            TypeDesc::Cycle(depth) => depth.saturating_add(1),
        };
        Self(Arc::new(TypeInner {
            desc,
            open,
            hash: OnceLock::new(),
        }))
    }

    // -------------------------------------------------------------------------
    // Constructors
    // -------------------------------------------------------------------------

    /// The singleton type of a primitive kind.
    pub fn primitive(kind: Kind) -> Result<Self, TypeError> {
        match kind {
            Kind::Bool => Ok(Self::bool()),
            Kind::Number => Ok(Self::number()),
            Kind::String => Ok(Self::string()),
            Kind::Blob => Ok(Self::blob()),
            Kind::Value => Ok(Self::value()),
            Kind::Type => Ok(Self::type_type()),
            Kind::List
            | Kind::Map
            | Kind::Ref
            | Kind::Set
            | Kind::Struct
            | Kind::Cycle
            | Kind::Union => Err(TypeError::NotPrimitive(kind)),
        }
    }

    /// Look up a primitive type by its name (`"Bool"`, `"Number"`, ...).
    pub fn primitive_by_name(name: &str) -> Result<Self, TypeError> {
        Kind::ALL
            .into_iter()
            .find(|k| k.is_primitive() && k.name() == name)
            .map(Self::primitive)
            .unwrap_or_else(|| Err(TypeError::UnknownPrimitive(name.to_string())))
    }

    pub fn bool() -> Self {
        BOOL.clone()
    }

    pub fn number() -> Self {
        NUMBER.clone()
    }

    pub fn string() -> Self {
        STRING.clone()
    }

    pub fn blob() -> Self {
        BLOB.clone()
    }

    /// The unconstrained top type.
    pub fn value() -> Self {
        VALUE.clone()
    }

    /// The type of type values.
    pub fn type_type() -> Self {
        TYPE.clone()
    }

    pub fn make_list(elem: Type) -> Self {
        Self::compound(Kind::List, vec![elem])
    }

    pub fn make_set(elem: Type) -> Self {
        Self::compound(Kind::Set, vec![elem])
    }

    pub fn make_ref(target: Type) -> Self {
        Self::compound(Kind::Ref, vec![target])
    }

    pub fn make_map(key: Type, value: Type) -> Self {
        Self::compound(Kind::Map, vec![key, value])
    }

    pub(crate) fn compound(kind: Kind, elems: Vec<Type>) -> Self {
        debug_assert_eq!(kind.elem_arity(), elems.len());
        Self::new(TypeDesc::Compound { kind, elems })
    }

    /// Build a struct type. Field order is the canonical order.
    ///
    /// Fails if a field name does not match the field-name grammar or
    /// appears twice, or if a field's cycle marker points past this struct
    /// (see [`Type::make_open_struct`]).
    pub fn make_struct<N, I>(name: impl Into<String>, fields: I) -> Result<Self, TypeError>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Type)>,
    {
        let ty = Self::make_open_struct(name, fields)?;
        if let Some(field) = ty.as_struct().and_then(StructDesc::unbound_field) {
            return Err(TypeError::UnboundCycle(field.to_string()));
        }
        Ok(ty)
    }

    /// Build a struct type whose fields may refer to structs that will
    /// enclose it. The result is open; it is only useful as a field type
    /// of an enclosing struct type that binds those markers.
    pub fn make_open_struct<N, I>(name: impl Into<String>, fields: I) -> Result<Self, TypeError>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Type)>,
    {
        let mut checked: Vec<(String, Type)> = Vec::new();
        for (field, ty) in fields {
            let field = field.into();
            if !is_valid_field_name(&field) {
                return Err(TypeError::InvalidFieldName(field));
            }
            if checked.iter().any(|(n, _)| *n == field) {
                return Err(TypeError::DuplicateField(field));
            }
            checked.push((field, ty));
        }
        Ok(Self::new(TypeDesc::Struct(StructDesc {
            name: name.into(),
            fields: checked,
        })))
    }

    /// Build a union type. Members are deduplicated and sorted by hash.
    ///
    /// An empty or single-member union stays a union.
    pub fn make_union(members: impl IntoIterator<Item = Type>) -> Self {
        let mut members: Vec<Type> = members.into_iter().collect();
        members.sort_by_key(|t| t.hash());
        members.dedup_by_key(|t| t.hash());
        Self::new(TypeDesc::Union(members))
    }

    /// The smallest description covering `types`: nested unions are
    /// flattened and a single distinct type stands for itself.
    pub fn union_of(types: impl IntoIterator<Item = Type>) -> Self {
        let mut flat = Vec::new();
        for ty in types {
            if let TypeDesc::Union(members) = ty.desc() {
                flat.extend(members.iter().cloned());
                continue;
            }
            flat.push(ty);
        }
        let union = Self::make_union(flat);
        if let TypeDesc::Union(members) = union.desc() {
            if members.len() == 1 {
                return members[0].clone();
            }
        }
        union
    }

    /// A back-reference to the enclosing struct `depth` levels up.
    ///
    /// Only meaningful inside the field types of a struct under
    /// construction.
    pub fn make_cycle(depth: u32) -> Self {
        Self::new(TypeDesc::Cycle(depth))
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn desc(&self) -> &TypeDesc {
        &self.0.desc
    }

    pub fn kind(&self) -> Kind {
        match self.desc() {
            TypeDesc::Primitive(kind) => *kind,
            TypeDesc::Compound { kind, .. } => *kind,
            TypeDesc::Struct(_) => Kind::Struct,
            TypeDesc::Union(_) => Kind::Union,
            TypeDesc::Cycle(_) => Kind::Cycle,
        }
    }

    /// Whether every cycle marker is bound by a struct within this type.
    pub fn is_closed(&self) -> bool {
        self.0.open == 0
    }

    /// How many enclosing struct levels the cycle markers still need.
    pub(crate) fn open_levels(&self) -> u32 {
        self.0.open
    }

    /// True exactly for Number, String and Ref.
    pub fn is_ordered(&self) -> bool {
        self.kind().is_ordered()
    }

    /// The single value kind this type admits, if there is one.
    ///
    /// Values in a slot with a concrete kind are written without their tag.
    /// `Value` and unions admit several kinds and return `None`.
    pub fn concrete_kind(&self) -> Option<Kind> {
        match self.desc() {
            TypeDesc::Primitive(Kind::Value) | TypeDesc::Union(_) => None,
            TypeDesc::Cycle(_) => Some(Kind::Struct),
            _ => Some(self.kind()),
        }
    }

    /// Content address of the type's canonical encoding.
    ///
    /// Equal to the hash of the type when stored as a value.
    pub fn hash(&self) -> Hash {
        *self
            .0
            .hash
            .get_or_init(|| ContentHasher::CHUNK.hash(&codec::encode_type_value(self)))
    }

    /// The struct name, for struct types.
    pub fn name(&self) -> Option<&str> {
        self.as_struct().map(StructDesc::name)
    }

    pub fn as_struct(&self) -> Option<&StructDesc> {
        match self.desc() {
            TypeDesc::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Element types of a compound type (empty otherwise).
    pub fn elem_types(&self) -> &[Type] {
        match self.desc() {
            TypeDesc::Compound { elems, .. } => elems,
            _ => &[],
        }
    }

    /// Element, field or member types, in encoding order.
    pub fn child_types(&self) -> Vec<Type> {
        match self.desc() {
            TypeDesc::Primitive(_) | TypeDesc::Cycle(_) => Vec::new(),
            TypeDesc::Compound { elems, .. } => elems.clone(),
            TypeDesc::Struct(s) => s.fields.iter().map(|(_, t)| t.clone()).collect(),
            TypeDesc::Union(members) => members.clone(),
        }
    }

    /// The type of this type when stored as a value.
    pub fn type_of(&self) -> Type {
        Self::type_type()
    }

    /// The type of a struct field with cycle markers that point at this
    /// struct replaced by this struct.
    pub fn field_type(&self, name: &str) -> Option<Type> {
        let ty = self.as_struct()?.field(name)?;
        Some(ty.bind_cycles(self, 0))
    }

    /// Resolve a cycle marker against a stack of enclosing struct types
    /// (innermost last). Non-cycle types resolve to themselves.
    pub fn resolve(&self, stack: &[Type]) -> Option<Type> {
        match self.desc() {
            TypeDesc::Cycle(depth) => {
                let depth = *depth as usize;
                if depth >= stack.len() {
                    return None;
                }
                Some(stack[stack.len() - 1 - depth].clone())
            }
            _ => Some(self.clone()),
        }
    }

    fn bind_cycles(&self, target: &Type, depth: u32) -> Type {
        match self.desc() {
            TypeDesc::Cycle(d) if *d == depth => target.clone(),
            TypeDesc::Cycle(d) if *d > depth => Type::make_cycle(d - 1),
            TypeDesc::Cycle(_) | TypeDesc::Primitive(_) => self.clone(),
            TypeDesc::Compound { kind, elems } => Type::compound(
                *kind,
                elems.iter().map(|t| t.bind_cycles(target, depth)).collect(),
            ),
            TypeDesc::Union(members) => {
                Type::make_union(members.iter().map(|t| t.bind_cycles(target, depth)))
            }
            TypeDesc::Struct(s) => Type::new(TypeDesc::Struct(StructDesc {
                name: s.name.clone(),
                fields: s
                    .fields
                    .iter()
                    .map(|(n, t)| (n.clone(), t.bind_cycles(target, depth + 1)))
                    .collect(),
            })),
        }
    }

    /// Shallow membership check: does a slot of this type admit `value`?
    ///
    /// Compares kinds (and struct names) only; element types of collections
    /// are not inspected.
    pub fn accepts(&self, value: &Value) -> bool {
        match self.desc() {
            TypeDesc::Primitive(Kind::Value) => true,
            TypeDesc::Primitive(kind) | TypeDesc::Compound { kind, .. } => value.kind() == *kind,
            TypeDesc::Struct(s) => matches!(value, Value::Struct(v) if v.name() == s.name()),
            TypeDesc::Union(members) => members.iter().any(|m| m.accepts(value)),
            TypeDesc::Cycle(_) => value.kind() == Kind::Struct,
        }
    }

    /// Human-readable rendering, produced from the type's encoding.
    pub fn describe(&self) -> String {
        codec::describe_type(&codec::encode_type(self))
            .unwrap_or_else(|e| format!("<undescribable type: {e}>"))
    }

    pub(crate) fn from_struct_parts(name: String, fields: Vec<(String, Type)>) -> Self {
        Self::new(TypeDesc::Struct(StructDesc { name, fields }))
    }

    pub(crate) fn from_sorted_union(members: Vec<Type>) -> Self {
        Self::new(TypeDesc::Union(members))
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.hash() == other.hash()
    }
}

impl Eq for Type {}

impl std::hash::Hash for Type {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        Type::hash(self).hash(state);
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> Type {
        Type::make_struct("Point", [("x", Type::number()), ("y", Type::number())]).unwrap()
    }

    // -------------------------------------------------------------------------
    // Field names
    // -------------------------------------------------------------------------

    #[test]
    fn field_name_grammar() {
        for bad in ["", " ", " a", "a ", "0", "_", "0a", "_a", "a-b", "\u{e9}"] {
            assert!(!is_valid_field_name(bad), "accepted {bad:?}");
            assert_eq!(
                Type::make_struct("S", [(bad, Type::bool())]).unwrap_err(),
                TypeError::InvalidFieldName(bad.to_string())
            );
        }
        for good in ["a", "A", "a0", "a_", "a0_"] {
            assert!(is_valid_field_name(good), "rejected {good:?}");
            assert!(Type::make_struct("S", [(good, Type::bool())]).is_ok());
        }
    }

    #[test]
    fn duplicate_field_rejected() {
        let err = Type::make_struct("S", [("a", Type::bool()), ("a", Type::number())]).unwrap_err();
        assert_eq!(err, TypeError::DuplicateField("a".into()));
    }

    // -------------------------------------------------------------------------
    // Kinds
    // -------------------------------------------------------------------------

    #[test]
    fn is_ordered() {
        assert!(Type::number().is_ordered());
        assert!(Type::string().is_ordered());
        assert!(Type::make_ref(Type::number()).is_ordered());

        assert!(!Type::bool().is_ordered());
        assert!(!Type::blob().is_ordered());
        assert!(!Type::value().is_ordered());
        assert!(!Type::make_list(Type::number()).is_ordered());
        assert!(!Type::make_set(Type::number()).is_ordered());
        assert!(!Type::make_map(Type::string(), Type::number()).is_ordered());
    }

    #[test]
    fn primitives_are_singletons() {
        assert!(Arc::ptr_eq(&Type::number().0, &Type::number().0));
        assert_eq!(Type::primitive(Kind::Blob).unwrap(), Type::blob());
        assert_eq!(Type::primitive(Kind::List), Err(TypeError::NotPrimitive(Kind::List)));
    }

    #[test]
    fn primitive_lookup_by_name() {
        assert_eq!(Type::primitive_by_name("String").unwrap(), Type::string());
        assert_eq!(Type::primitive_by_name("Type").unwrap(), Type::type_type());
        assert!(matches!(
            Type::primitive_by_name("List"),
            Err(TypeError::UnknownPrimitive(_))
        ));
    }

    #[test]
    fn concrete_kinds() {
        assert_eq!(Type::number().concrete_kind(), Some(Kind::Number));
        assert_eq!(Type::value().concrete_kind(), None);
        assert_eq!(Type::make_union([Type::number()]).concrete_kind(), None);
        assert_eq!(Type::make_cycle(0).concrete_kind(), Some(Kind::Struct));
        assert_eq!(point().concrete_kind(), Some(Kind::Struct));
    }

    // -------------------------------------------------------------------------
    // Structural equality
    // -------------------------------------------------------------------------

    #[test]
    fn independently_built_structs_are_equal() {
        assert_eq!(point(), point());
        assert_eq!(point().hash(), point().hash());
    }

    #[test]
    fn field_order_is_part_of_identity() {
        let swapped =
            Type::make_struct("Point", [("y", Type::number()), ("x", Type::number())]).unwrap();
        assert_ne!(point(), swapped);
    }

    #[test]
    fn struct_name_is_part_of_identity() {
        let other = Type::make_struct("Vec2", [("x", Type::number()), ("y", Type::number())]).unwrap();
        assert_ne!(point(), other);
    }

    #[test]
    fn union_sorts_and_dedups() {
        let a = Type::make_union([Type::string(), Type::number(), Type::string()]);
        let b = Type::make_union([Type::number(), Type::string()]);
        assert_eq!(a, b);
        match a.desc() {
            TypeDesc::Union(members) => {
                assert_eq!(members.len(), 2);
                assert!(members[0].hash() < members[1].hash());
            }
            other => panic!("expected union, got {other:?}"),
        }
    }

    #[test]
    fn union_does_not_collapse() {
        let single = Type::make_union([Type::number()]);
        assert_eq!(single.kind(), Kind::Union);
        assert_ne!(single, Type::number());
        assert_eq!(Type::make_union([]).kind(), Kind::Union);
    }

    #[test]
    fn union_of_flattens_and_collapses() {
        assert_eq!(Type::union_of([Type::number(), Type::number()]), Type::number());
        assert_eq!(Type::union_of([]), Type::make_union([]));
        let nested = Type::union_of([
            Type::make_union([Type::number(), Type::string()]),
            Type::bool(),
        ]);
        assert_eq!(
            nested,
            Type::make_union([Type::bool(), Type::number(), Type::string()])
        );
    }

    // -------------------------------------------------------------------------
    // Cycles
    // -------------------------------------------------------------------------

    fn tree() -> Type {
        Type::make_struct(
            "A",
            [
                ("v", Type::number()),
                ("children", Type::make_list(Type::make_cycle(0))),
            ],
        )
        .unwrap()
    }

    #[test]
    fn recursive_struct_hashes() {
        assert_eq!(tree(), tree());
        assert_ne!(tree().hash(), Hash::null());
    }

    #[test]
    fn field_type_binds_cycle() {
        let a = tree();
        let children = a.field_type("children").unwrap();
        assert_eq!(children, Type::make_list(a.clone()));
        assert_eq!(children.elem_types()[0], a);
        assert_eq!(a.field_type("v").unwrap(), Type::number());
        assert!(a.field_type("missing").is_none());
    }

    #[test]
    fn field_type_binds_through_nested_struct() {
        let inner = Type::make_open_struct("Inner", [("back", Type::make_cycle(1))]).unwrap();
        assert!(!inner.is_closed());
        let outer = Type::make_struct("Outer", [("inner", inner)]).unwrap();
        assert!(outer.is_closed());
        let inner = outer.field_type("inner").unwrap();
        assert_eq!(inner.field_type("back").unwrap(), outer);
    }

    #[test]
    fn struct_rejects_marker_past_itself() {
        assert_eq!(
            Type::make_struct("S", [("x", Type::make_cycle(3))]).unwrap_err(),
            TypeError::UnboundCycle("x".into())
        );
        assert_eq!(
            Type::make_struct("Inner", [("back", Type::make_list(Type::make_cycle(1)))])
                .unwrap_err(),
            TypeError::UnboundCycle("back".into())
        );
        let deep = Type::make_open_struct("Inner", [("back", Type::make_cycle(2))]).unwrap();
        assert_eq!(
            Type::make_struct("Outer", [("inner", deep)]).unwrap_err(),
            TypeError::UnboundCycle("inner".into())
        );
    }

    #[test]
    fn openness_of_field_types() {
        assert!(Type::number().is_closed());
        assert!(!Type::make_cycle(0).is_closed());
        assert!(!Type::make_map(Type::string(), Type::make_cycle(0)).is_closed());
        assert!(!Type::make_union([Type::bool(), Type::make_cycle(0)]).is_closed());
        assert!(tree().is_closed());
        // the raw field type is still open; the bound one is not
        assert!(!tree().as_struct().unwrap().field("children").unwrap().is_closed());
        assert!(tree().field_type("children").unwrap().is_closed());
    }

    #[test]
    fn resolve_against_stack() {
        let stack = [point(), tree()];
        assert_eq!(Type::make_cycle(0).resolve(&stack), Some(tree()));
        assert_eq!(Type::make_cycle(1).resolve(&stack), Some(point()));
        assert_eq!(Type::make_cycle(2).resolve(&stack), None);
        assert_eq!(Type::bool().resolve(&stack), Some(Type::bool()));
    }

    // -------------------------------------------------------------------------
    // Description
    // -------------------------------------------------------------------------

    #[test]
    fn describe_renders_encoding() {
        assert_eq!(Type::number().describe(), "Number");
        assert_eq!(
            Type::make_map(Type::string(), Type::number()).describe(),
            "Map<String, Number>"
        );
        assert_eq!(
            Type::make_struct("S", [("x", Type::number())]).unwrap().describe(),
            "struct S {\n  x: Number\n}"
        );
        let empty = Type::make_struct("E", Vec::<(String, Type)>::new()).unwrap();
        assert_eq!(empty.describe(), "struct E {}");
        assert_eq!(
            Type::make_list(Type::make_set(Type::make_ref(Type::blob()))).describe(),
            "List<Set<Ref<Blob>>>"
        );
        assert_eq!(Type::make_union([]).describe(), "Union<>");
    }

    #[test]
    fn describe_nested_struct_indents() {
        assert_eq!(
            tree().describe(),
            "struct A {\n  v: Number\n  children: List<Cycle<0>>\n}"
        );
        let outer = Type::make_struct("O", [("p", point())]).unwrap();
        assert_eq!(
            outer.to_string(),
            "struct O {\n  p: struct Point {\n    x: Number\n    y: Number\n  }\n}"
        );
    }

    #[test]
    fn child_types_and_name() {
        assert_eq!(point().name(), Some("Point"));
        assert_eq!(point().child_types(), vec![Type::number(), Type::number()]);
        assert_eq!(Type::number().name(), None);
        assert_eq!(Type::make_map(Type::bool(), Type::string()).child_types().len(), 2);
        assert_eq!(point().type_of(), Type::type_type());
    }
}
