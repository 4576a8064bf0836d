//! Draft tree nodes and their conversion from/to JSON objects.

use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

use crate::schema::{CollectionSpec, FieldSpec};

/// Scalar field values of one draft node, keyed by wire name.
pub type FieldMap = Map<String, Value>;

/// Stable identity of a group for the lifetime of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupKey(Uuid);

/// Stable identity of an item for the lifetime of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemKey(Uuid);

impl GroupKey {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl ItemKey {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupDraft {
    key: GroupKey,
    pub fields: FieldMap,
    pub items: Vec<ItemDraft>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    key: ItemKey,
    pub fields: FieldMap,
}

impl GroupDraft {
    pub(crate) fn empty() -> Self {
        Self {
            key: GroupKey::new(),
            fields: FieldMap::new(),
            items: Vec::new(),
        }
    }

    pub fn key(&self) -> GroupKey {
        self.key
    }

    /// Builds a group from a JSON object, picking only declared fields.
    pub(crate) fn from_value(
        value: &Value,
        groups: &CollectionSpec,
        items: &CollectionSpec,
    ) -> Self {
        let mut group = Self::empty();
        group.fields = pick_fields(value, groups.fields);
        group.items = value
            .get(items.key)
            .and_then(Value::as_array)
            .map(|list| list.iter().map(|v| ItemDraft::from_value(v, items)).collect())
            .unwrap_or_default();
        group
    }

    pub(crate) fn to_value(&self, items_key: &str) -> Value {
        let mut object = self.fields.clone();
        let items = self.items.iter().map(ItemDraft::to_value).collect();
        object.insert(items_key.to_string(), Value::Array(items));
        Value::Object(object)
    }
}

impl ItemDraft {
    pub(crate) fn empty() -> Self {
        Self {
            key: ItemKey::new(),
            fields: FieldMap::new(),
        }
    }

    pub fn key(&self) -> ItemKey {
        self.key
    }

    pub(crate) fn from_value(value: &Value, items: &CollectionSpec) -> Self {
        let mut item = Self::empty();
        item.fields = pick_fields(value, items.fields);
        item
    }

    pub(crate) fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

/// Copies the declared, non-null fields of a JSON object.
pub(crate) fn pick_fields(value: &Value, specs: &[FieldSpec]) -> FieldMap {
    let mut fields = FieldMap::new();
    if let Some(object) = value.as_object() {
        for spec in specs {
            match object.get(spec.name) {
                Some(Value::Null) | None => {}
                Some(v) => {
                    fields.insert(spec.name.to_string(), v.clone());
                }
            }
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MEAL_PLAN_SCHEMA;
    use serde_json::json;

    #[test]
    fn test_pick_fields_skips_undeclared_and_null() {
        let value = json!({"name": "Oats", "ingredients": null, "calories": 300});
        let fields = pick_fields(&value, MEAL_PLAN_SCHEMA.items.fields);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["name"], "Oats");
    }

    #[test]
    fn test_group_from_value_keeps_item_order() {
        let value = json!({
            "name": "Dinner",
            "recipes": [{"name": "Soup"}, {"name": "Bread"}, {"name": "Salad"}]
        });
        let group =
            GroupDraft::from_value(&value, &MEAL_PLAN_SCHEMA.groups, &MEAL_PLAN_SCHEMA.items);
        let names: Vec<_> = group.items.iter().map(|i| i.fields["name"].clone()).collect();
        assert_eq!(names, vec![json!("Soup"), json!("Bread"), json!("Salad")]);
    }

    #[test]
    fn test_keys_are_unique() {
        let a = ItemDraft::empty();
        let b = ItemDraft::empty();
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn test_to_value_has_no_keys() {
        let mut group = GroupDraft::empty();
        group.fields.insert("name".into(), json!("Lunch"));
        group.items.push(ItemDraft::empty());

        let value = group.to_value("recipes");
        assert_eq!(value, json!({"name": "Lunch", "recipes": [{}]}));
    }
}
