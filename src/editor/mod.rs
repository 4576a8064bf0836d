//! Nested collection editor.
//!
//! Holds the editable draft of one plan: scalar fields at the root, an
//! ordered list of groups (meals, routines), and inside each group an
//! ordered list of items (recipes, exercises). Every group and item gets a
//! stable key when it is created so asynchronous results such as photo
//! uploads can find their target even after rows were added or removed.
//!
//! ```
//! use fitplan::editor::{FieldPath, NestedEditor};
//! use fitplan::models::MealPlan;
//!
//! let mut editor = NestedEditor::<MealPlan>::new();
//! editor.set_field(&FieldPath::root("title"), "Week 1".into()).unwrap();
//! editor.add_group();
//! editor.set_field(&FieldPath::group(0, "name"), "Breakfast".into()).unwrap();
//!
//! let plan = editor.to_payload().unwrap();
//! assert_eq!(plan.meals[0].name, "Breakfast");
//! ```

mod draft;
mod path;

pub use draft::{FieldMap, GroupDraft, GroupKey, ItemDraft, ItemKey};
pub use path::FieldPath;

use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

use crate::schema::{FieldSpec, Level, PlanResource};

/// Errors raised by editor operations.
#[derive(Debug)]
pub enum EditorError {
    /// Path could not be parsed
    InvalidPath(String),
    /// Field is not declared at that level
    UnknownField(FieldPath),
    /// Field exists but is not user-editable
    ReadOnlyField(FieldPath),
    /// Value does not fit the field kind
    InvalidValue(FieldPath, String),
    /// Group index out of range
    NoSuchGroup(usize),
    /// Item index out of range
    NoSuchItem(usize, usize),
    /// Draft could not be converted to or from the typed resource
    Payload(serde_json::Error),
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditorError::InvalidPath(raw) => write!(f, "Invalid field path '{}'", raw),
            EditorError::UnknownField(path) => write!(f, "Unknown field '{}'", path),
            EditorError::ReadOnlyField(path) => write!(f, "Field '{}' cannot be edited", path),
            EditorError::InvalidValue(path, msg) => write!(f, "{}: {}", path, msg),
            EditorError::NoSuchGroup(group) => write!(f, "No group at index {}", group),
            EditorError::NoSuchItem(group, item) => {
                write!(f, "No item at index {} in group {}", item, group)
            }
            EditorError::Payload(e) => write!(f, "Invalid draft: {}", e),
        }
    }
}

impl std::error::Error for EditorError {}

/// A single failed required-field or bound check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub path: FieldPath,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Editable draft of a `R` with two levels of owned child collections.
#[derive(Debug, Clone)]
pub struct NestedEditor<R> {
    fields: FieldMap,
    groups: Vec<GroupDraft>,
    _resource: PhantomData<fn() -> R>,
}

impl<R: PlanResource> Default for NestedEditor<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: PlanResource> NestedEditor<R> {
    pub fn new() -> Self {
        Self {
            fields: FieldMap::new(),
            groups: Vec::new(),
            _resource: PhantomData,
        }
    }

    /// Replaces the draft with a copy of `seed`, or an empty shell.
    ///
    /// The copy shares nothing with `seed`; every group and item gets a
    /// fresh key. The resource `id` is not part of the draft.
    pub fn initialize(&mut self, seed: Option<&R>) -> Result<(), EditorError> {
        self.reset();
        let Some(seed) = seed else {
            return Ok(());
        };

        let schema = R::SCHEMA;
        let value = serde_json::to_value(seed).map_err(EditorError::Payload)?;
        self.fields = draft::pick_fields(&value, schema.fields);
        self.groups = value
            .get(schema.groups.key)
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .map(|g| GroupDraft::from_value(g, &schema.groups, &schema.items))
                    .collect()
            })
            .unwrap_or_default();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.fields.clear();
        self.groups.clear();
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn groups(&self) -> &[GroupDraft] {
        &self.groups
    }

    /// Appends an empty group and returns its key.
    pub fn add_group(&mut self) -> GroupKey {
        let group = GroupDraft::empty();
        let key = group.key();
        self.groups.push(group);
        key
    }

    /// Removes the group at `group`. Out-of-range indices are ignored.
    pub fn remove_group(&mut self, group: usize) -> Option<GroupDraft> {
        (group < self.groups.len()).then(|| self.groups.remove(group))
    }

    /// Appends an empty item to the group at `group`.
    pub fn add_item(&mut self, group: usize) -> Option<ItemKey> {
        let target = self.groups.get_mut(group)?;
        let item = ItemDraft::empty();
        let key = item.key();
        target.items.push(item);
        Some(key)
    }

    /// Removes one item. Out-of-range indices are ignored.
    pub fn remove_item(&mut self, group: usize, item: usize) -> Option<ItemDraft> {
        let target = self.groups.get_mut(group)?;
        (item < target.items.len()).then(|| target.items.remove(item))
    }

    /// Current key of the item at `(group, item)`.
    pub fn item_key(&self, group: usize, item: usize) -> Option<ItemKey> {
        self.groups.get(group)?.items.get(item).map(ItemDraft::key)
    }

    /// Current position of the item with `key`.
    pub fn locate_item(&self, key: ItemKey) -> Option<(usize, usize)> {
        self.groups.iter().enumerate().find_map(|(g, group)| {
            group
                .items
                .iter()
                .position(|item| item.key() == key)
                .map(|i| (g, i))
        })
    }

    pub fn field(&self, path: &FieldPath) -> Option<&Value> {
        self.fields_at(path).ok()?.get(path.field())
    }

    /// Sets one scalar field. Siblings are never touched.
    pub fn set_field(&mut self, path: &FieldPath, value: Value) -> Result<(), EditorError> {
        let spec = Self::editable_spec(path)?;
        let fields = self.fields_at_mut(path)?;
        fields.insert(spec.name.to_string(), value);
        Ok(())
    }

    /// Parses `raw` according to the field kind and sets it.
    pub fn set_field_from_str(&mut self, path: &FieldPath, raw: &str) -> Result<(), EditorError> {
        let spec = Self::editable_spec(path)?;
        let value = spec
            .parse_value(raw)
            .map_err(|msg| EditorError::InvalidValue(path.clone(), msg))?;
        self.set_field(path, value)
    }

    /// Writes an uploaded file reference into the item identified by `key`.
    ///
    /// Only the asset field of that item changes. Returns `false` when the
    /// item no longer exists, in which case the reference is dropped.
    pub fn attach_asset(&mut self, key: ItemKey, reference: impl Into<String>) -> bool {
        let Some(asset) = R::SCHEMA.asset_field() else {
            return false;
        };
        let Some((g, i)) = self.locate_item(key) else {
            tracing::debug!("Dropping upload result for removed item {}", key);
            return false;
        };

        self.groups[g].items[i]
            .fields
            .insert(asset.name.to_string(), Value::String(reference.into()));
        true
    }

    /// Checks required fields and numeric bounds across the whole draft.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let schema = R::SCHEMA;
        let mut errors = Vec::new();

        check_level(schema.fields, &self.fields, |f| FieldPath::root(f), &mut errors);
        for (g, group) in self.groups.iter().enumerate() {
            check_level(
                schema.groups.fields,
                &group.fields,
                |f| FieldPath::group(g, f),
                &mut errors,
            );
            for (i, item) in group.items.iter().enumerate() {
                check_level(
                    schema.items.fields,
                    &item.fields,
                    |f| FieldPath::item(g, i, f),
                    &mut errors,
                );
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Flattens the draft into the resource shape sent to the backend.
    pub fn to_payload(&self) -> Result<R, EditorError> {
        let schema = R::SCHEMA;
        let mut object = self.fields.clone();
        let groups = self
            .groups
            .iter()
            .map(|g| g.to_value(schema.items.key))
            .collect();
        object.insert(schema.groups.key.to_string(), Value::Array(groups));
        serde_json::from_value(Value::Object(object)).map_err(EditorError::Payload)
    }

    fn editable_spec(path: &FieldPath) -> Result<&'static FieldSpec, EditorError> {
        let spec = R::SCHEMA
            .field(path.level(), path.field())
            .ok_or_else(|| EditorError::UnknownField(path.clone()))?;
        if !spec.is_editable() {
            return Err(EditorError::ReadOnlyField(path.clone()));
        }
        Ok(spec)
    }

    fn fields_at(&self, path: &FieldPath) -> Result<&FieldMap, EditorError> {
        match *path {
            FieldPath::Root { .. } => Ok(&self.fields),
            FieldPath::Group { group, .. } => self
                .groups
                .get(group)
                .map(|g| &g.fields)
                .ok_or(EditorError::NoSuchGroup(group)),
            FieldPath::Item { group, item, .. } => self
                .groups
                .get(group)
                .ok_or(EditorError::NoSuchGroup(group))?
                .items
                .get(item)
                .map(|i| &i.fields)
                .ok_or(EditorError::NoSuchItem(group, item)),
        }
    }

    fn fields_at_mut(&mut self, path: &FieldPath) -> Result<&mut FieldMap, EditorError> {
        match *path {
            FieldPath::Root { .. } => Ok(&mut self.fields),
            FieldPath::Group { group, .. } => self
                .groups
                .get_mut(group)
                .map(|g| &mut g.fields)
                .ok_or(EditorError::NoSuchGroup(group)),
            FieldPath::Item { group, item, .. } => self
                .groups
                .get_mut(group)
                .ok_or(EditorError::NoSuchGroup(group))?
                .items
                .get_mut(item)
                .map(|i| &mut i.fields)
                .ok_or(EditorError::NoSuchItem(group, item)),
        }
    }
}

fn check_level(
    specs: &[FieldSpec],
    fields: &FieldMap,
    path: impl Fn(&str) -> FieldPath,
    errors: &mut Vec<ValidationError>,
) {
    for spec in specs.iter().filter(|s| s.is_editable()) {
        if let Some(message) = spec.check(fields.get(spec.name)) {
            errors.push(ValidationError {
                path: path(spec.name),
                message,
            });
        }
    }
}

/// Renders the draft as a form, one field per line with its path.
impl<R: PlanResource> fmt::Display for NestedEditor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schema = R::SCHEMA;
        write_fields(f, schema.fields, &self.fields, |name| FieldPath::root(name), "")?;

        for (g, group) in self.groups.iter().enumerate() {
            writeln!(f, "[{}] {}", g, schema.groups.label)?;
            write_fields(
                f,
                schema.groups.fields,
                &group.fields,
                |name| FieldPath::group(g, name),
                "  ",
            )?;
            for (i, item) in group.items.iter().enumerate() {
                writeln!(f, "  [{}.{}] {}", g, i, schema.items.label)?;
                write_fields(
                    f,
                    schema.items.fields,
                    &item.fields,
                    |name| FieldPath::item(g, i, name),
                    "    ",
                )?;
            }
        }

        Ok(())
    }
}

fn write_fields(
    f: &mut fmt::Formatter<'_>,
    specs: &[FieldSpec],
    fields: &FieldMap,
    path: impl Fn(&str) -> FieldPath,
    indent: &str,
) -> fmt::Result {
    for spec in specs.iter().filter(|s| s.is_editable()) {
        let value = match fields.get(spec.name) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let marker = if spec.required { "*" } else { " " };
        writeln!(
            f,
            "{}{:<14}{} {}: {}",
            indent,
            path(spec.name).to_string(),
            marker,
            spec.label,
            value
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Exercise, Meal, MealPlan, Recipe, Routine, WorkoutPlan};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn meal_plan() -> MealPlan {
        MealPlan::new("Week 1", "First week")
            .with_meals(vec![
                Meal::new("Breakfast")
                    .with_description("Early")
                    .with_recipes(vec![
                        Recipe::new("Oats").with_ingredients("oats, milk"),
                        Recipe::new("Eggs")
                            .with_instructions("Boil 8 minutes")
                            .with_photo_url("https://cdn.example.com/eggs.png"),
                    ]),
                Meal::new("Dinner").with_recipes(vec![Recipe::new("Soup")]),
            ])
            .with_user_id(1)
            .with_id(42)
    }

    fn group_names(editor: &NestedEditor<MealPlan>) -> Vec<Value> {
        editor
            .groups()
            .iter()
            .map(|g| g.fields.get("name").cloned().unwrap_or(Value::Null))
            .collect()
    }

    #[test]
    fn test_roundtrip_without_changes_drops_only_id() {
        let plan = meal_plan();
        let mut editor = NestedEditor::<MealPlan>::new();
        editor.initialize(Some(&plan)).unwrap();

        let payload = editor.to_payload().unwrap();
        assert_eq!(payload, MealPlan { id: None, ..plan });
    }

    #[test]
    fn test_roundtrip_keeps_hidden_timestamps() {
        let mut plan = WorkoutPlan::new("Strength", "Lift heavy")
            .with_routines(vec![
                Routine::new("Push").with_exercises(vec![Exercise::new("Bench", 5, 5)])
            ])
            .with_id(9);
        plan.created_at = Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
        plan.last_updated_at = Some(Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap());

        let mut editor = NestedEditor::<WorkoutPlan>::new();
        editor.initialize(Some(&plan)).unwrap();

        assert_eq!(editor.to_payload().unwrap(), WorkoutPlan { id: None, ..plan });
    }

    #[test]
    fn test_initialize_is_independent_of_seed() {
        let plan = meal_plan();
        let mut editor = NestedEditor::<MealPlan>::new();
        editor.initialize(Some(&plan)).unwrap();
        editor
            .set_field(&FieldPath::group(0, "name"), json!("Brunch"))
            .unwrap();

        assert_eq!(plan.meals[0].name, "Breakfast");
        assert_eq!(editor.to_payload().unwrap().meals[0].name, "Brunch");
    }

    #[test]
    fn test_initialize_empty_yields_empty_payload() {
        let mut editor = NestedEditor::<MealPlan>::new();
        editor.initialize(Some(&meal_plan())).unwrap();
        editor.initialize(None).unwrap();

        assert!(editor.groups().is_empty());
        assert_eq!(editor.to_payload().unwrap(), MealPlan::default());
    }

    #[test]
    fn test_add_then_remove_last_group_restores_list() {
        for n in 0..4 {
            let mut editor = NestedEditor::<MealPlan>::new();
            for g in 0..n {
                editor.add_group();
                editor
                    .set_field(&FieldPath::group(g, "name"), json!(format!("Meal {}", g)))
                    .unwrap();
            }
            let before = editor.groups().to_vec();

            editor.add_group();
            assert!(editor.remove_group(n).is_some());

            assert_eq!(editor.groups(), before.as_slice());
        }
    }

    #[test]
    fn test_remove_middle_group_then_append() {
        let mut editor = NestedEditor::<MealPlan>::new();
        for name in ["A", "B", "C"] {
            let g = editor.groups().len();
            editor.add_group();
            editor
                .set_field(&FieldPath::group(g, "name"), json!(name))
                .unwrap();
        }

        editor.remove_group(1);
        assert_eq!(group_names(&editor), vec![json!("A"), json!("C")]);

        let key = editor.add_group();
        assert_eq!(editor.groups()[2].key(), key);
        assert_eq!(editor.groups().len(), 3);
    }

    #[test]
    fn test_remove_out_of_range_is_noop() {
        let mut editor = NestedEditor::<MealPlan>::new();
        editor.initialize(Some(&meal_plan())).unwrap();
        let before = editor.groups().to_vec();

        assert!(editor.remove_group(5).is_none());
        assert!(editor.remove_item(0, 9).is_none());
        assert!(editor.remove_item(7, 0).is_none());
        assert_eq!(editor.groups(), before.as_slice());
    }

    #[test]
    fn test_add_item_to_missing_group() {
        let mut editor = NestedEditor::<MealPlan>::new();
        assert!(editor.add_item(0).is_none());
    }

    #[test]
    fn test_set_field_touches_only_target() {
        let mut editor = NestedEditor::<MealPlan>::new();
        editor.initialize(Some(&meal_plan())).unwrap();
        let before = editor.groups().to_vec();

        editor
            .set_field(&FieldPath::item(0, 1, "name"), json!("Scrambled eggs"))
            .unwrap();

        let after = editor.groups();
        assert_eq!(after[1], before[1]);
        assert_eq!(after[0].fields, before[0].fields);
        assert_eq!(after[0].items[0], before[0].items[0]);
        assert_eq!(after[0].items[1].fields["name"], "Scrambled eggs");
        assert_eq!(
            after[0].items[1].fields["cookingInstructions"],
            before[0].items[1].fields["cookingInstructions"]
        );
    }

    #[test]
    fn test_set_field_errors() {
        let mut editor = NestedEditor::<MealPlan>::new();
        editor.add_group();

        assert!(matches!(
            editor.set_field(&FieldPath::root("calories"), json!(1)),
            Err(EditorError::UnknownField(_))
        ));
        assert!(matches!(
            editor.set_field(&FieldPath::root("userId"), json!(2)),
            Err(EditorError::ReadOnlyField(_))
        ));
        assert!(matches!(
            editor.set_field(&FieldPath::group(3, "name"), json!("x")),
            Err(EditorError::NoSuchGroup(3))
        ));
        assert!(matches!(
            editor.set_field(&FieldPath::item(0, 0, "name"), json!("x")),
            Err(EditorError::NoSuchItem(0, 0))
        ));
    }

    #[test]
    fn test_set_field_from_str_parses_numbers() {
        let mut editor = NestedEditor::<WorkoutPlan>::new();
        editor.add_group();
        editor.add_item(0);

        editor
            .set_field_from_str(&FieldPath::item(0, 0, "sets"), "4")
            .unwrap();
        assert_eq!(editor.field(&FieldPath::item(0, 0, "sets")), Some(&json!(4)));

        let err = editor
            .set_field_from_str(&FieldPath::item(0, 0, "repetitions"), "many")
            .unwrap_err();
        assert!(matches!(err, EditorError::InvalidValue(_, _)));
    }

    #[test]
    fn test_attach_asset_merges_with_other_edits() {
        let mut editor = NestedEditor::<MealPlan>::new();
        editor.initialize(Some(&meal_plan())).unwrap();
        let target = editor.item_key(0, 0).unwrap();

        // edits made while the upload is in flight
        editor
            .set_field(&FieldPath::item(0, 1, "name"), json!("Poached eggs"))
            .unwrap();
        editor
            .set_field(&FieldPath::item(0, 0, "ingredients"), json!("oats, water"))
            .unwrap();
        editor.add_group();
        let snapshot = editor.groups().to_vec();

        assert!(editor.attach_asset(target, "https://cdn.example.com/oats.jpg"));

        let groups = editor.groups();
        assert_eq!(groups[0].items[1], snapshot[0].items[1]);
        assert_eq!(groups[1], snapshot[1]);
        assert_eq!(groups[2], snapshot[2]);
        let oats = &groups[0].items[0].fields;
        assert_eq!(oats["photoUrl"], "https://cdn.example.com/oats.jpg");
        assert_eq!(oats["ingredients"], "oats, water");
        assert_eq!(oats["name"], "Oats");
    }

    #[test]
    fn test_attach_asset_follows_item_after_reorder() {
        let mut editor = NestedEditor::<MealPlan>::new();
        editor.initialize(Some(&meal_plan())).unwrap();
        let eggs = editor.item_key(0, 1).unwrap();

        editor.remove_item(0, 0);
        assert_eq!(editor.locate_item(eggs), Some((0, 0)));

        assert!(editor.attach_asset(eggs, "https://cdn.example.com/new.png"));
        assert_eq!(
            editor.to_payload().unwrap().meals[0].recipes[0].photo_url,
            "https://cdn.example.com/new.png"
        );
    }

    #[test]
    fn test_attach_asset_to_removed_item_is_dropped() {
        let mut editor = NestedEditor::<MealPlan>::new();
        editor.initialize(Some(&meal_plan())).unwrap();
        let soup = editor.item_key(1, 0).unwrap();
        editor.remove_group(1);
        let before = editor.groups().to_vec();

        assert!(!editor.attach_asset(soup, "https://cdn.example.com/soup.jpg"));
        assert_eq!(editor.groups(), before.as_slice());
    }

    #[test]
    fn test_attach_asset_without_asset_field() {
        let mut editor = NestedEditor::<WorkoutPlan>::new();
        editor.add_group();
        let key = editor.add_item(0).unwrap();
        assert!(!editor.attach_asset(key, "https://cdn.example.com/x.png"));
    }

    #[test]
    fn test_validate_reports_every_missing_field() {
        let mut editor = NestedEditor::<WorkoutPlan>::new();
        editor
            .set_field(&FieldPath::root("title"), json!("Plan"))
            .unwrap();
        editor.add_group();
        editor.add_item(0);
        editor
            .set_field(&FieldPath::item(0, 0, "sets"), json!(0))
            .unwrap();

        let errors = editor.validate().unwrap_err();
        let paths: Vec<String> = errors.iter().map(|e| e.path.to_string()).collect();
        assert_eq!(
            paths,
            vec!["description", "0.name", "0.0.name", "0.0.sets", "0.0.repetitions"]
        );
        assert_eq!(errors[0].message, "Please enter description");
        assert_eq!(errors[3].message, "Sets must be at least 1");
        assert_eq!(errors[4].message, "Please enter repetitions");
    }

    #[test]
    fn test_validate_accepts_complete_draft_without_groups() {
        let mut editor = NestedEditor::<MealPlan>::new();
        editor
            .set_field(&FieldPath::root("title"), json!("Week 1"))
            .unwrap();
        editor
            .set_field(&FieldPath::root("description"), json!("Plan"))
            .unwrap();
        assert!(editor.validate().is_ok());
    }

    #[test]
    fn test_payload_fills_missing_text_with_empty_strings() {
        let mut editor = NestedEditor::<MealPlan>::new();
        editor.add_group();
        editor.add_item(0);
        editor
            .set_field(&FieldPath::item(0, 0, "name"), json!("Oats"))
            .unwrap();

        let payload = editor.to_payload().unwrap();
        let recipe = &payload.meals[0].recipes[0];
        assert_eq!(recipe.name, "Oats");
        assert_eq!(recipe.photo_url, "");
        assert_eq!(recipe.ingredients, "");
        assert_eq!(payload.id, None);
    }

    #[test]
    fn test_payload_rejects_ill_typed_values() {
        let mut editor = NestedEditor::<WorkoutPlan>::new();
        editor.add_group();
        editor.add_item(0);
        editor
            .set_field(&FieldPath::item(0, 0, "sets"), json!("three"))
            .unwrap();
        assert!(matches!(editor.to_payload(), Err(EditorError::Payload(_))));
    }

    #[test]
    fn test_display_lists_paths() {
        let mut editor = NestedEditor::<MealPlan>::new();
        editor.initialize(Some(&meal_plan())).unwrap();
        let form = editor.to_string();

        assert!(form.contains("title"));
        assert!(form.contains("[1] Meal"));
        assert!(form.contains("[0.1] Recipe"));
        assert!(form.contains("0.1.photoUrl"));
        assert!(form.contains("Recipe Photo: https://cdn.example.com/eggs.png"));
        assert!(!form.contains("userId"));
    }
}
