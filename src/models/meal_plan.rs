use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::{CollectionSpec, FieldKind, FieldSpec, PlanResource, ResourceSchema};

/// A named collection of meals owned by one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MealPlan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub meals: Vec<Meal>,
}

/// A meal inside a plan. Has no identity of its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Meal {
    pub name: String,
    pub description: String,
    pub recipes: Vec<Recipe>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Recipe {
    pub name: String,
    pub ingredients: String,
    pub cooking_instructions: String,
    /// Uploaded photo reference; empty when there is none
    pub photo_url: String,
}

pub const MEAL_PLAN_SCHEMA: ResourceSchema = ResourceSchema {
    path: "mealplans",
    title: "Meal Plans",
    noun: "meal plan",
    fields: &[
        FieldSpec::new("userId", "User ID", FieldKind::Hidden, false),
        FieldSpec::new("title", "Title", FieldKind::Text, true),
        FieldSpec::new("description", "Description", FieldKind::LongText, true),
    ],
    groups: CollectionSpec {
        key: "meals",
        label: "Meal",
        fields: &[
            FieldSpec::new("name", "Meal Name", FieldKind::Text, true),
            FieldSpec::new("description", "Meal Description", FieldKind::LongText, false),
        ],
    },
    items: CollectionSpec {
        key: "recipes",
        label: "Recipe",
        fields: &[
            FieldSpec::new("name", "Recipe Name", FieldKind::Text, true),
            FieldSpec::new("ingredients", "Ingredients", FieldKind::LongText, false),
            FieldSpec::new(
                "cookingInstructions",
                "Cooking Instructions",
                FieldKind::LongText,
                false,
            ),
            FieldSpec::new("photoUrl", "Recipe Photo", FieldKind::Asset, false),
        ],
    },
};

impl MealPlan {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_meals(mut self, meals: Vec<Meal>) -> Self {
        self.meals = meals;
        self
    }
}

impl Meal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_recipes(mut self, recipes: Vec<Recipe>) -> Self {
        self.recipes = recipes;
        self
    }
}

impl Recipe {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_ingredients(mut self, ingredients: impl Into<String>) -> Self {
        self.ingredients = ingredients.into();
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.cooking_instructions = instructions.into();
        self
    }

    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = url.into();
        self
    }
}

impl PlanResource for MealPlan {
    const SCHEMA: &'static ResourceSchema = &MEAL_PLAN_SCHEMA;

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
        self.meals.len()
    }
}

impl fmt::Display for MealPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => writeln!(f, "{} (#{})", self.title, id)?,
            None => writeln!(f, "{}", self.title)?,
        }
        writeln!(f, "{}", "=".repeat(self.title.len()))?;
        writeln!(f, "Description: {}", self.description)?;

        if !self.meals.is_empty() {
            writeln!(f, "\nMeals:")?;
            for meal in &self.meals {
                write!(f, "{}", meal)?;
            }
        }

        Ok(())
    }
}

impl fmt::Display for Meal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  - {}", self.name)?;
        if !self.description.is_empty() {
            writeln!(f, "    {}", self.description)?;
        }
        for recipe in &self.recipes {
            writeln!(f, "    * {}", recipe.name)?;
            if !recipe.ingredients.is_empty() {
                writeln!(f, "      Ingredients: {}", recipe.ingredients)?;
            }
            if !recipe.cooking_instructions.is_empty() {
                writeln!(f, "      Cooking Instructions: {}", recipe.cooking_instructions)?;
            }
            if !recipe.photo_url.is_empty() {
                writeln!(f, "      Photo: {}", recipe.photo_url)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MealPlan {
        MealPlan::new("Week 1", "Cutting week").with_meals(vec![Meal::new("Breakfast")
            .with_recipes(vec![Recipe::new("Oats")
                .with_ingredients("oats, milk")
                .with_photo_url("https://cdn.example.com/oats.jpg")])])
    }

    #[test]
    fn test_serializes_camel_case_without_id() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["userId"], 0);
        assert_eq!(
            json["meals"][0]["recipes"][0]["photoUrl"],
            "https://cdn.example.com/oats.jpg"
        );
        assert_eq!(json["meals"][0]["recipes"][0]["cookingInstructions"], "");
    }

    #[test]
    fn test_missing_fields_decode_to_defaults() {
        let plan: MealPlan =
            serde_json::from_str(r#"{"id": 3, "title": "Bulk", "meals": [{"name": "Lunch"}]}"#)
                .unwrap();
        assert_eq!(plan.id, Some(3));
        assert_eq!(plan.description, "");
        assert_eq!(plan.meals[0].name, "Lunch");
        assert!(plan.meals[0].recipes.is_empty());
    }

    #[test]
    fn test_display_card() {
        let output = format!("{}", sample().with_id(4));
        assert!(output.contains("Week 1 (#4)"));
        assert!(output.contains("Description: Cutting week"));
        assert!(output.contains("- Breakfast"));
        assert!(output.contains("* Oats"));
        assert!(output.contains("Ingredients: oats, milk"));
        assert!(output.contains("Photo: https://cdn.example.com/oats.jpg"));
    }

    #[test]
    fn test_schema_matches_wire_names() {
        let json = serde_json::to_value(sample().with_id(1)).unwrap();
        let object = json.as_object().unwrap();
        for field in MEAL_PLAN_SCHEMA.fields {
            assert!(object.contains_key(field.name), "missing {}", field.name);
        }
        assert!(object.contains_key(MEAL_PLAN_SCHEMA.groups.key));
        let recipe = json["meals"][0]["recipes"][0].as_object().unwrap();
        for field in MEAL_PLAN_SCHEMA.items.fields {
            assert!(recipe.contains_key(field.name), "missing {}", field.name);
        }
    }
}
