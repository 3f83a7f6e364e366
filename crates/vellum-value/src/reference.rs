use std::cmp::Ordering;
use std::fmt;

use vellum_hash::Hash;

use crate::error::{ValueError, ValueResult};
use crate::store::ValueReader;
use crate::types::Type;
use crate::value::Value;

/// A typed pointer to a stored value.
///
/// Carries the referent's hash, its type and its height: 0 when the
/// referent embeds no refs, otherwise one more than the tallest ref it
/// embeds. Two refs are equal iff they point at the same hash.
#[derive(Clone)]
pub struct Ref {
    target: Hash,
    target_type: Type,
    height: u64,
}

impl Ref {
    pub fn new(target: Hash, target_type: Type, height: u64) -> Self {
        Self {
            target,
            target_type,
            height,
        }
    }

    /// A ref to `value`, computing its hash, type and height.
    pub fn from_value(value: &Value) -> Self {
        Self::new(value.hash(), value.type_of(), value.height())
    }

    pub fn target(&self) -> Hash {
        self.target
    }

    pub fn target_type(&self) -> &Type {
        &self.target_type
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    /// `Ref<T>` where `T` is the referent type.
    pub fn type_of(&self) -> Type {
        Type::make_ref(self.target_type.clone())
    }

    /// Load the referent.
    pub fn target_value<R: ValueReader + ?Sized>(&self, store: &R) -> ValueResult<Value> {
        store
            .read_value(&self.target)?
            .ok_or(ValueError::MissingChunk(self.target))
    }
}

impl PartialEq for Ref {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
    }
}

impl Eq for Ref {}

impl PartialOrd for Ref {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ref {
    fn cmp(&self, other: &Self) -> Ordering {
        self.target.cmp(&other.target)
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("target", &self.target)
            .field("type", &self.target_type)
            .field("height", &self.height)
            .finish()
    }
}
