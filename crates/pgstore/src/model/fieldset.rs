use crate::model::FieldDescriptor;

/// Ordered, duplicate-free selection of fields for one read or write.
#[derive(Debug, Clone, Default)]
pub struct FieldSet<'a> {
    fields: Vec<&'a FieldDescriptor>,
}

impl<'a> FieldSet<'a> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Append `field` unless a field with the same column is already present.
    pub fn push(&mut self, field: &'a FieldDescriptor) {
        if !self.contains(field) {
            self.fields.push(field);
        }
    }

    pub fn contains(&self, field: &FieldDescriptor) -> bool {
        self.fields
            .iter()
            .any(|f| f.column_name() == field.column_name())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &'a FieldDescriptor> + '_ {
        self.fields.iter().copied()
    }

    pub fn retain(&mut self, f: impl FnMut(&&'a FieldDescriptor) -> bool) {
        self.fields.retain(f);
    }

    /// Sort into canonical (declaration) order.
    pub fn sort(&mut self) {
        self.fields.sort_by_key(|f| f.position);
    }

    pub fn sorted(mut self) -> Self {
        self.sort();
        self
    }

    /// Column names in canonical order; equal keys mean interchangeable field sets.
    pub fn canonical_key(&self) -> Vec<&'a str> {
        let mut fields = self.fields.clone();
        fields.sort_by_key(|f| f.position);
        fields.into_iter().map(FieldDescriptor::column_name).collect()
    }

    pub fn as_slice(&self) -> &[&'a FieldDescriptor] {
        &self.fields
    }
}

impl<'a> FromIterator<&'a FieldDescriptor> for FieldSet<'a> {
    fn from_iter<I: IntoIterator<Item = &'a FieldDescriptor>>(iter: I) -> Self {
        let mut set = FieldSet::new();
        for field in iter {
            set.push(field);
        }
        set
    }
}

impl PartialEq for FieldSet<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|(a, b)| a.column_name() == b.column_name())
    }
}

impl Eq for FieldSet<'_> {}
