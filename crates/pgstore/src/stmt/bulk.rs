use crate::model::FieldSet;
use std::collections::HashMap;

/// One homogeneous write group: a canonical field set and the input positions using it.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSetGroup<'a> {
    pub field_set: FieldSet<'a>,
    pub indices: Vec<usize>,
}

/// Partitions per-model field sets into groups of identical column selections.
///
/// Field sets are compared after sorting into declaration order, so `[b, a]` and
/// `[a, b]` land in the same group. Groups and the indices inside them keep
/// first-seen order.
#[derive(Debug, Clone, Default)]
pub struct BulkFieldSet<'a> {
    groups: Vec<FieldSetGroup<'a>>,
    by_key: HashMap<Vec<&'a str>, usize>,
}

impl<'a> BulkFieldSet<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group `field_sets`, the i-th belonging to input position i.
    pub fn from_field_sets<I>(field_sets: I) -> Self
    where
        I: IntoIterator<Item = FieldSet<'a>>,
    {
        let mut bulk = Self::new();
        for (index, field_set) in field_sets.into_iter().enumerate() {
            bulk.add(field_set, index);
        }
        bulk
    }

    pub fn add(&mut self, field_set: FieldSet<'a>, index: usize) {
        let key = field_set.canonical_key();
        if let Some(&slot) = self.by_key.get(&key) {
            self.groups[slot].indices.push(index);
            return;
        }
        self.by_key.insert(key, self.groups.len());
        self.groups.push(FieldSetGroup {
            field_set: field_set.sorted(),
            indices: vec![index],
        });
    }

    pub fn groups(&self) -> &[FieldSetGroup<'a>] {
        &self.groups
    }

    pub fn into_groups(self) -> Vec<FieldSetGroup<'a>> {
        self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
