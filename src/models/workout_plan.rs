use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::{CollectionSpec, FieldKind, FieldSpec, PlanResource, ResourceSchema};

/// A training plan made of routines. Timestamps are owned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkoutPlan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub routines: Vec<Routine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Routine {
    pub name: String,
    pub exercises: Vec<Exercise>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Exercise {
    pub name: String,
    pub sets: u32,
    pub repetitions: u32,
}

pub const WORKOUT_PLAN_SCHEMA: ResourceSchema = ResourceSchema {
    path: "workoutplans",
    title: "Workout Plans",
    noun: "workout plan",
    fields: &[
        FieldSpec::new("userId", "User ID", FieldKind::Hidden, false),
        FieldSpec::new("title", "Title", FieldKind::Text, true),
        FieldSpec::new("description", "Description", FieldKind::LongText, true),
        FieldSpec::new("createdAt", "Created At", FieldKind::Hidden, false),
        FieldSpec::new("lastUpdatedAt", "Last Updated At", FieldKind::Hidden, false),
    ],
    groups: CollectionSpec {
        key: "routines",
        label: "Routine",
        fields: &[FieldSpec::new(
            "name",
            "Routine Name",
            FieldKind::Text,
            true,
        )],
    },
    items: CollectionSpec {
        key: "exercises",
        label: "Exercise",
        fields: &[
            FieldSpec::new("name", "Exercise Name", FieldKind::Text, true),
            FieldSpec::new("sets", "Sets", FieldKind::PositiveInt, true),
            FieldSpec::new("repetitions", "Repetitions", FieldKind::PositiveInt, true),
        ],
    },
};

impl WorkoutPlan {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_routines(mut self, routines: Vec<Routine>) -> Self {
        self.routines = routines;
        self
    }

    /// Total number of exercises across all routines.
    pub fn exercise_count(&self) -> usize {
        self.routines.iter().map(|r| r.exercises.len()).sum()
    }
}

impl Routine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exercises: Vec::new(),
        }
    }

    pub fn with_exercises(mut self, exercises: Vec<Exercise>) -> Self {
        self.exercises = exercises;
        self
    }
}

impl Exercise {
    pub fn new(name: impl Into<String>, sets: u32, repetitions: u32) -> Self {
        Self {
            name: name.into(),
            sets,
            repetitions,
        }
    }
}

impl PlanResource for WorkoutPlan {
    const SCHEMA: &'static ResourceSchema = &WORKOUT_PLAN_SCHEMA;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = user_id;
        self
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn group_count(&self) -> usize {
        self.routines.len()
    }
}

impl fmt::Display for WorkoutPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => writeln!(f, "{} (#{})", self.title, id)?,
            None => writeln!(f, "{}", self.title)?,
        }
        writeln!(f, "{}", "=".repeat(self.title.len()))?;
        writeln!(f, "Description: {}", self.description)?;
        if let Some(updated) = self.last_updated_at.or(self.created_at) {
            writeln!(f, "Updated: {}", updated.format("%Y-%m-%d %H:%M"))?;
        }

        if !self.routines.is_empty() {
            writeln!(f, "\nRoutines:")?;
            for (index, routine) in self.routines.iter().enumerate() {
                writeln!(f, "  Routine {}: {}", index + 1, routine.name)?;
                for (n, exercise) in routine.exercises.iter().enumerate() {
                    writeln!(f, "    Exercise {}: {}", n + 1, exercise)?;
                }
            }
        }

        Ok(())
    }
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, Sets: {}, Repetitions: {}",
            self.name, self.sets, self.repetitions
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> WorkoutPlan {
        WorkoutPlan::new("Strength", "Three days a week").with_routines(vec![
            Routine::new("Push").with_exercises(vec![Exercise::new("Bench", 5, 5)]),
            Routine::new("Pull").with_exercises(vec![
                Exercise::new("Row", 4, 8),
                Exercise::new("Chin-up", 3, 6),
            ]),
        ])
    }

    #[test]
    fn test_exercise_count() {
        assert_eq!(sample().exercise_count(), 3);
        assert_eq!(sample().group_count(), 2);
    }

    #[test]
    fn test_timestamps_omitted_on_create() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("createdAt").is_none());
        assert!(json.get("lastUpdatedAt").is_none());
        assert!(json.get("id").is_none());
        assert_eq!(json["routines"][1]["exercises"][0]["repetitions"], 8);
    }

    #[test]
    fn test_timestamps_roundtrip() {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let mut plan = sample().with_id(12);
        plan.created_at = Some(created);

        let json = serde_json::to_string(&plan).unwrap();
        assert!(json.contains("\"createdAt\""));
        let parsed: WorkoutPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, plan);
    }

    #[test]
    fn test_display_card() {
        let output = format!("{}", sample().with_id(2));
        assert!(output.contains("Strength (#2)"));
        assert!(output.contains("Routine 2: Pull"));
        assert!(output.contains("Exercise 2: Chin-up, Sets: 3, Repetitions: 6"));
    }
}
