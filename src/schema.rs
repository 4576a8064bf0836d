//! Static descriptions of the editable resource kinds.
//!
//! A schema tells the generic editor which scalar fields live at the root,
//! group and item levels of a plan, what the two nested collections are
//! called on the wire, and which fields are required. Typed models tie
//! themselves to a schema through [`PlanResource`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// How a field is edited and validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Single-line text
    Text,
    /// Multi-line text
    LongText,
    /// Whole number that must be at least 1
    PositiveInt,
    /// Reference (URL) to an uploaded file
    Asset,
    /// Carried through edits but never set by the user
    Hidden,
}

/// One scalar field of a resource level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Wire name (camelCase JSON key)
    pub name: &'static str,
    /// Human readable label
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub const fn new(
        name: &'static str,
        label: &'static str,
        kind: FieldKind,
        required: bool,
    ) -> Self {
        Self {
            name,
            label,
            kind,
            required,
        }
    }

    pub fn is_editable(&self) -> bool {
        self.kind != FieldKind::Hidden
    }

    /// Parses raw user input into the JSON value stored in a draft.
    pub fn parse_value(&self, raw: &str) -> Result<Value, String> {
        match self.kind {
            FieldKind::Text | FieldKind::LongText | FieldKind::Asset => {
                Ok(Value::String(raw.to_string()))
            }
            FieldKind::PositiveInt => raw
                .trim()
                .parse::<u32>()
                .map(Value::from)
                .map_err(|_| format!("{} must be a whole number, got '{}'", self.label, raw)),
            FieldKind::Hidden => Err(format!("{} cannot be edited", self.label)),
        }
    }

    /// Returns the validation message for `value`, if any.
    pub fn check(&self, value: Option<&Value>) -> Option<String> {
        let missing = match value {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        };

        if missing {
            return self
                .required
                .then(|| format!("Please enter {}", self.label.to_lowercase()));
        }

        if self.kind == FieldKind::PositiveInt {
            let valid = value.and_then(Value::as_u64).is_some_and(|n| n >= 1);
            if !valid {
                return Some(format!("{} must be at least 1", self.label));
            }
        }

        None
    }
}

/// Nesting level of a field inside a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Root,
    Group,
    Item,
}

/// An ordered child collection (e.g. `meals` or `exercises`).
#[derive(Debug, Clone, Copy)]
pub struct CollectionSpec {
    /// Wire name of the array
    pub key: &'static str,
    /// Singular display name
    pub label: &'static str,
    pub fields: &'static [FieldSpec],
}

impl CollectionSpec {
    /// "1 meal", "3 meals"
    pub fn count_label(&self, count: usize) -> String {
        if count == 1 {
            format!("1 {}", self.label.to_lowercase())
        } else {
            format!("{} {}", count, self.key)
        }
    }
}

/// Full shape of one resource kind.
#[derive(Debug, Clone, Copy)]
pub struct ResourceSchema {
    /// REST collection segment, e.g. `mealplans`
    pub path: &'static str,
    /// Tab title, e.g. "Meal Plans"
    pub title: &'static str,
    /// Singular noun used in messages, e.g. "meal plan"
    pub noun: &'static str,
    pub fields: &'static [FieldSpec],
    pub groups: CollectionSpec,
    pub items: CollectionSpec,
}

impl ResourceSchema {
    pub fn fields_at(&self, level: Level) -> &'static [FieldSpec] {
        match level {
            Level::Root => self.fields,
            Level::Group => self.groups.fields,
            Level::Item => self.items.fields,
        }
    }

    pub fn field(&self, level: Level, name: &str) -> Option<&'static FieldSpec> {
        self.fields_at(level).iter().find(|f| f.name == name)
    }

    /// The item-level field that receives upload references, if any.
    pub fn asset_field(&self) -> Option<&'static FieldSpec> {
        self.items.fields.iter().find(|f| f.kind == FieldKind::Asset)
    }
}

/// A plan type that can be listed, edited and submitted.
pub trait PlanResource:
    Serialize + DeserializeOwned + Clone + fmt::Display + Send + Sync + 'static
{
    const SCHEMA: &'static ResourceSchema;

    /// Backend-assigned identifier; `None` until created.
    fn id(&self) -> Option<i64>;

    fn with_id(self, id: i64) -> Self;

    fn with_user_id(self, user_id: i64) -> Self;

    fn title(&self) -> &str;

    /// Number of first-level children (meals, routines).
    fn group_count(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME: FieldSpec = FieldSpec::new("name", "Routine Name", FieldKind::Text, true);
    const SETS: FieldSpec = FieldSpec::new("sets", "Sets", FieldKind::PositiveInt, true);
    const NOTES: FieldSpec = FieldSpec::new("notes", "Notes", FieldKind::LongText, false);
    const USER: FieldSpec = FieldSpec::new("userId", "User ID", FieldKind::Hidden, false);

    #[test]
    fn test_parse_text_keeps_raw_input() {
        assert_eq!(NAME.parse_value(" Leg Day "), Ok(Value::from(" Leg Day ")));
    }

    #[test]
    fn test_parse_positive_int() {
        assert_eq!(SETS.parse_value(" 3"), Ok(Value::from(3u32)));
        assert!(SETS.parse_value("three").is_err());
        assert!(SETS.parse_value("-1").is_err());
    }

    #[test]
    fn test_parse_hidden_rejected() {
        assert!(USER.parse_value("2").is_err());
    }

    #[test]
    fn test_check_required_text() {
        assert_eq!(
            NAME.check(None),
            Some("Please enter routine name".to_string())
        );
        assert_eq!(
            NAME.check(Some(&Value::from("   "))),
            Some("Please enter routine name".to_string())
        );
        assert_eq!(NAME.check(Some(&Value::from("Push"))), None);
    }

    #[test]
    fn test_check_optional_empty_is_fine() {
        assert_eq!(NOTES.check(None), None);
        assert_eq!(NOTES.check(Some(&Value::from(""))), None);
    }

    #[test]
    fn test_check_positive_int_bound() {
        assert_eq!(SETS.check(Some(&Value::from(1))), None);
        assert_eq!(
            SETS.check(Some(&Value::from(0))),
            Some("Sets must be at least 1".to_string())
        );
        assert_eq!(
            SETS.check(Some(&Value::from("x"))),
            Some("Sets must be at least 1".to_string())
        );
    }

    #[test]
    fn test_count_label() {
        let meals = CollectionSpec {
            key: "meals",
            label: "Meal",
            fields: &[],
        };
        assert_eq!(meals.count_label(0), "0 meals");
        assert_eq!(meals.count_label(1), "1 meal");
        assert_eq!(meals.count_label(4), "4 meals");
    }
}
