mod meal_plan;
mod workout_plan;

pub use meal_plan::{Meal, MealPlan, Recipe, MEAL_PLAN_SCHEMA};
pub use workout_plan::{Exercise, Routine, WorkoutPlan, WORKOUT_PLAN_SCHEMA};
