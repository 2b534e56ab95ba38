use crate::model::{EntityDescriptor, FieldDescriptor};
use crate::schema::{DdlOp, LiveTable, truncate_identifier};

/// Column constraints the reconciler manages.
///
/// Not-null and unique are synced both ways. Primary and foreign keys are only
/// ever added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    PrimaryKey,
    NotNull,
    Unique,
    ForeignKey,
}

impl Constraint {
    pub const ALL: [Constraint; 4] = [
        Constraint::PrimaryKey,
        Constraint::NotNull,
        Constraint::Unique,
        Constraint::ForeignKey,
    ];

    pub fn is_two_way(self) -> bool {
        matches!(self, Constraint::NotNull | Constraint::Unique)
    }

    /// Whether the descriptor asks for this constraint on `field`.
    ///
    /// `None` means the constraint is not managed for the field at all; primary
    /// key columns are implicitly not null and unique.
    pub fn declared(self, field: &FieldDescriptor) -> Option<bool> {
        match self {
            Constraint::PrimaryKey => Some(field.is_primary()),
            Constraint::NotNull | Constraint::Unique if field.is_primary() => None,
            Constraint::NotNull => Some(field.not_null),
            Constraint::Unique => Some(field.unique),
            Constraint::ForeignKey => Some(field.references.is_some()),
        }
    }

    pub fn present(self, entity: &EntityDescriptor, field: &FieldDescriptor, live: &LiveTable) -> bool {
        let column = field.column_name();
        match self {
            Constraint::PrimaryKey => live.primary_key.contains(column),
            Constraint::NotNull => live.not_null.contains(column),
            Constraint::Unique => live
                .unique_constraints
                .contains(&unique_constraint_name(entity, field)),
            Constraint::ForeignKey => live.foreign_keys.contains(column),
        }
    }

    /// The operation moving `field` towards its declared state, if any.
    pub fn reconcile(
        self,
        entity: &EntityDescriptor,
        field: &FieldDescriptor,
        live: &LiveTable,
    ) -> Option<DdlOp> {
        let declared = self.declared(field)?;
        let present = self.present(entity, field, live);
        match (declared, present) {
            (true, false) => self.add(entity, field),
            (false, true) if self.is_two_way() => self.drop(entity, field),
            _ => None,
        }
    }

    fn add(self, entity: &EntityDescriptor, field: &FieldDescriptor) -> Option<DdlOp> {
        let (schema, table) = names(entity);
        let column = field.column_name().to_string();
        Some(match self {
            Constraint::PrimaryKey => DdlOp::AddPrimaryKey {
                schema,
                table,
                column,
            },
            Constraint::NotNull => DdlOp::SetNotNull {
                schema,
                table,
                column,
            },
            Constraint::Unique => DdlOp::AddUnique {
                schema,
                table,
                constraint: unique_constraint_name(entity, field),
                column,
            },
            Constraint::ForeignKey => DdlOp::AddForeignKey {
                schema,
                table,
                column,
                references: field.references.clone()?,
            },
        })
    }

    fn drop(self, entity: &EntityDescriptor, field: &FieldDescriptor) -> Option<DdlOp> {
        let (schema, table) = names(entity);
        match self {
            Constraint::NotNull => Some(DdlOp::DropNotNull {
                schema,
                table,
                column: field.column_name().to_string(),
            }),
            Constraint::Unique => Some(DdlOp::DropUnique {
                schema,
                table,
                constraint: unique_constraint_name(entity, field),
            }),
            Constraint::PrimaryKey | Constraint::ForeignKey => None,
        }
    }
}

/// `unique_<table>_<column>`: the name unique constraints are created and dropped by.
pub fn unique_constraint_name(entity: &EntityDescriptor, field: &FieldDescriptor) -> String {
    truncate_identifier(&format!(
        "unique_{}_{}",
        entity.table_name(),
        field.column_name()
    ))
    .to_string()
}

fn names(entity: &EntityDescriptor) -> (String, String) {
    (
        entity.schema_name().to_string(),
        entity.table_name().to_string(),
    )
}
