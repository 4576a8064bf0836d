//! Addresses of scalar fields inside a draft.
//!
//! Paths are written as dotted strings. The short form uses bare indices
//! (`title`, `0.name`, `0.1.sets`); the long form spells out the collection
//! keys of the schema (`meals.0.recipes.1.name`).

use std::fmt;

use super::EditorError;
use crate::schema::{Level, ResourceSchema};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldPath {
    Root { field: String },
    Group { group: usize, field: String },
    Item { group: usize, item: usize, field: String },
}

impl FieldPath {
    pub fn root(field: impl Into<String>) -> Self {
        FieldPath::Root {
            field: field.into(),
        }
    }

    pub fn group(group: usize, field: impl Into<String>) -> Self {
        FieldPath::Group {
            group,
            field: field.into(),
        }
    }

    pub fn item(group: usize, item: usize, field: impl Into<String>) -> Self {
        FieldPath::Item {
            group,
            item,
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            FieldPath::Root { field }
            | FieldPath::Group { field, .. }
            | FieldPath::Item { field, .. } => field,
        }
    }

    pub fn level(&self) -> Level {
        match self {
            FieldPath::Root { .. } => Level::Root,
            FieldPath::Group { .. } => Level::Group,
            FieldPath::Item { .. } => Level::Item,
        }
    }

    /// Parses a dotted path against `schema`.
    pub fn parse(raw: &str, schema: &ResourceSchema) -> Result<Self, EditorError> {
        let invalid = || EditorError::InvalidPath(raw.to_string());

        let segments: Vec<&str> = raw.trim().split('.').collect();
        let (field, prefix) = segments.split_last().ok_or_else(invalid)?;
        if field.is_empty() || field.parse::<usize>().is_ok() {
            return Err(invalid());
        }

        let collection_keys = [schema.groups.key, schema.items.key];
        let mut indices: Vec<usize> = Vec::new();
        let mut expect_index = false;

        for segment in prefix {
            if let Ok(index) = segment.parse::<usize>() {
                if indices.len() == collection_keys.len() {
                    return Err(invalid());
                }
                indices.push(index);
                expect_index = false;
            } else if !expect_index && collection_keys.get(indices.len()) == Some(segment) {
                expect_index = true;
            } else {
                return Err(invalid());
            }
        }

        if expect_index {
            return Err(invalid());
        }

        match indices.as_slice() {
            [] => Ok(FieldPath::root(*field)),
            [group] => Ok(FieldPath::group(*group, *field)),
            [group, item] => Ok(FieldPath::item(*group, *item, *field)),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Root { field } => write!(f, "{}", field),
            FieldPath::Group { group, field } => write!(f, "{}.{}", group, field),
            FieldPath::Item { group, item, field } => write!(f, "{}.{}.{}", group, item, field),
        }
    }
}
