//! Change records produced by diffing two catalog snapshots.
//!
//! A [`ChangeRecord`] is the unpersisted form of a changelog entry. The
//! constructors enforce the field-name rule: updates always name a field,
//! inserts and deletes never do.

use serde::{Deserialize, Serialize};

use crate::enums::{ChangeType, EntityType};
use crate::errors::CoreError;

/// Id and name of an entity, used for parent context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityRef {
    pub id: String,
    pub name: String,
}

impl EntityRef {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Ancestors of an entity in the catalog tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lineage {
    pub parent: Option<EntityRef>,
    pub grandparent: Option<EntityRef>,
}

impl Lineage {
    /// Datasets have no recorded ancestors.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            parent: None,
            grandparent: None,
        }
    }

    /// Lineage of a table: its dataset.
    #[must_use]
    pub const fn in_dataset(dataset: EntityRef) -> Self {
        Self {
            parent: Some(dataset),
            grandparent: None,
        }
    }

    /// Lineage of a column: its table, then the table's dataset.
    #[must_use]
    pub const fn in_table(table: EntityRef, dataset: EntityRef) -> Self {
        Self {
            parent: Some(table),
            grandparent: Some(dataset),
        }
    }
}

/// One detected difference between two snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeRecord {
    pub change_type: ChangeType,
    pub entity_type: EntityType,
    pub entity: EntityRef,
    pub field_name: String,
    pub old_value: String,
    pub new_value: String,
    pub lineage: Lineage,
}

impl ChangeRecord {
    /// An entity that exists only in the newer snapshot.
    #[must_use]
    pub fn insert(entity_type: EntityType, entity: EntityRef, lineage: Lineage) -> Self {
        Self::structural(ChangeType::Insert, entity_type, entity, lineage)
    }

    /// An entity that exists only in the older snapshot.
    #[must_use]
    pub fn delete(entity_type: EntityType, entity: EntityRef, lineage: Lineage) -> Self {
        Self::structural(ChangeType::Delete, entity_type, entity, lineage)
    }

    /// A single field whose value differs between the two snapshots.
    ///
    /// `old` and `new` are stored JSON-encoded.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidChange` if `field_name` is empty, or
    /// `CoreError::Encoding` if a value cannot be serialized.
    pub fn update<T: Serialize + ?Sized>(
        entity_type: EntityType,
        entity: EntityRef,
        lineage: Lineage,
        field_name: &str,
        old: &T,
        new: &T,
    ) -> Result<Self, CoreError> {
        if field_name.is_empty() {
            return Err(CoreError::InvalidChange(format!(
                "update of {entity_type} {} has no field name",
                entity.id
            )));
        }
        Ok(Self {
            change_type: ChangeType::Update,
            entity_type,
            entity,
            field_name: field_name.to_string(),
            old_value: serde_json::to_string(old)?,
            new_value: serde_json::to_string(new)?,
            lineage,
        })
    }

    fn structural(
        change_type: ChangeType,
        entity_type: EntityType,
        entity: EntityRef,
        lineage: Lineage,
    ) -> Self {
        Self {
            change_type,
            entity_type,
            entity,
            field_name: String::new(),
            old_value: String::new(),
            new_value: String::new(),
            lineage,
        }
    }

    /// Whether the record satisfies the field-name rule for its type.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        match self.change_type {
            ChangeType::Update => !self.field_name.is_empty(),
            ChangeType::Insert | ChangeType::Delete => {
                self.field_name.is_empty() && self.old_value.is_empty() && self.new_value.is_empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn col_lineage() -> Lineage {
        Lineage::in_table(EntityRef::new("tbl-1", "orders"), EntityRef::new("dst-1", "sales"))
    }

    #[test]
    fn insert_and_delete_carry_no_field() {
        let ins = ChangeRecord::insert(
            EntityType::Column,
            EntityRef::new("col-1", "id"),
            col_lineage(),
        );
        let del = ChangeRecord::delete(
            EntityType::Dataset,
            EntityRef::new("dst-1", "sales"),
            Lineage::root(),
        );

        assert_eq!(ins.change_type, ChangeType::Insert);
        assert!(ins.field_name.is_empty());
        assert!(ins.is_well_formed());
        assert_eq!(del.change_type, ChangeType::Delete);
        assert!(del.lineage.parent.is_none());
        assert!(del.is_well_formed());
    }

    #[test]
    fn update_json_encodes_values() {
        let text = ChangeRecord::update(
            EntityType::Dataset,
            EntityRef::new("dst-1", "sales"),
            Lineage::root(),
            "description",
            "old",
            "new",
        )
        .unwrap();
        assert_eq!(text.old_value, "\"old\"");
        assert_eq!(text.new_value, "\"new\"");

        let count = ChangeRecord::update(
            EntityType::Table,
            EntityRef::new("tbl-1", "orders"),
            Lineage::in_dataset(EntityRef::new("dst-1", "sales")),
            "row_count",
            &10_i64,
            &12_i64,
        )
        .unwrap();
        assert_eq!(count.old_value, "10");
        assert_eq!(count.new_value, "12");
        assert_eq!(count.lineage.parent.unwrap().name, "sales");
    }

    #[test]
    fn update_without_field_name_is_rejected() {
        let err = ChangeRecord::update(
            EntityType::Column,
            EntityRef::new("col-1", "id"),
            col_lineage(),
            "",
            "a",
            "b",
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidChange(_)));
    }

    #[test]
    fn column_lineage_orders_table_then_dataset() {
        let lineage = col_lineage();
        assert_eq!(lineage.parent.unwrap().id, "tbl-1");
        assert_eq!(lineage.grandparent.unwrap().id, "dst-1");
    }
}
