use std::fmt;
use std::sync::Arc;

use crate::error::{TypeError, ValueError, ValueResult};
use crate::types::{StructDesc, Type};
use crate::value::Value;

/// A struct value: a struct type plus one value per declared field, in
/// the type's canonical field order.
#[derive(Clone)]
pub struct Struct {
    ty: Type,
    values: Arc<[Value]>,
}

impl Struct {
    /// Build a struct against a declared struct type.
    ///
    /// Every declared field must be given exactly once, and each value must
    /// be admitted by its field type.
    pub fn new<N, I>(ty: Type, fields: I) -> ValueResult<Self>
    where
        N: AsRef<str>,
        I: IntoIterator<Item = (N, Value)>,
    {
        let desc = ty
            .as_struct()
            .ok_or_else(|| ValueError::NotAStructType(ty.describe()))?;
        let mut slots: Vec<Option<Value>> = vec![None; desc.len()];
        for (name, value) in fields {
            let name = name.as_ref();
            let index = desc
                .field_index(name)
                .ok_or_else(|| ValueError::UnknownField(name.to_string()))?;
            if slots[index].is_some() {
                return Err(TypeError::DuplicateField(name.to_string()).into());
            }
            slots[index] = Some(value);
        }
        let mut values = Vec::with_capacity(slots.len());
        for ((name, _), slot) in desc.fields().iter().zip(slots) {
            values.push(slot.ok_or_else(|| ValueError::MissingField(name.clone()))?);
        }
        Self::from_values(ty.clone(), values)
    }

    /// Build a struct from values in canonical field order.
    pub fn from_values(ty: Type, values: Vec<Value>) -> ValueResult<Self> {
        let desc = ty
            .as_struct()
            .ok_or_else(|| ValueError::NotAStructType(ty.describe()))?;
        if let Some(field) = desc.unbound_field() {
            return Err(TypeError::UnboundCycle(field.to_string()).into());
        }
        if desc.len() != values.len() {
            return Err(ValueError::FieldCountMismatch {
                expected: desc.len(),
                actual: values.len(),
            });
        }
        for ((name, field_ty), value) in desc.fields().iter().zip(&values) {
            if !field_ty.accepts(value) {
                return Err(ValueError::TypeMismatch {
                    field: name.clone(),
                    expected: field_ty.describe(),
                    found: value.kind(),
                });
            }
        }
        Ok(Self::from_parts(ty.clone(), values))
    }

    /// Build a struct whose type is inferred from the given fields, in the
    /// order given.
    pub fn from_fields<N, I>(name: impl Into<String>, fields: I) -> ValueResult<Self>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Value)>,
    {
        let (decls, values): (Vec<(String, Type)>, Vec<Value>) = fields
            .into_iter()
            .map(|(n, v)| ((n.into(), v.type_of()), v))
            .unzip();
        let ty = Type::make_struct(name, decls)?;
        Ok(Self::from_parts(ty, values))
    }

    pub(crate) fn from_parts(ty: Type, values: Vec<Value>) -> Self {
        Self {
            ty,
            values: values.into(),
        }
    }

    pub fn name(&self) -> &str {
        self.desc().name()
    }

    pub fn type_of(&self) -> &Type {
        &self.ty
    }

    pub(crate) fn desc(&self) -> &StructDesc {
        match self.ty.as_struct() {
            Some(desc) => desc,
            None => unreachable!("struct value with a non-struct type"),
        }
    }

    /// Field values in canonical order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.desc().field_index(field).map(|i| &self.values[i])
    }

    /// `(name, value)` pairs in canonical order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.desc()
            .fields()
            .iter()
            .map(|(n, _)| n.as_str())
            .zip(self.values.iter())
    }

    /// A copy of this struct with one field replaced.
    pub fn set(&self, field: &str, value: Value) -> ValueResult<Self> {
        let desc = self.desc();
        let index = desc
            .field_index(field)
            .ok_or_else(|| ValueError::UnknownField(field.to_string()))?;
        let mut values = self.values.to_vec();
        values[index] = value;
        Self::from_values(self.ty.clone(), values)
    }
}

impl fmt::Debug for Struct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.name());
        for (name, value) in self.fields() {
            s.field(name, value);
        }
        s.finish()
    }
}
