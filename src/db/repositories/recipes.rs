use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Row};

use crate::db::{
    models::{Recipe, RecipeInput},
    Database,
};

fn row_to_recipe(row: &Row) -> rusqlite::Result<Recipe> {
    Ok(Recipe {
        id: row.get("id")?,
        name: row.get("name")?,
        amount_g: row.get("g_amount")?,
        calories: row.get("calories")?,
        protein_g: row.get("g_protein")?,
        carbs_g: row.get("g_carbs")?,
        fat_g: row.get("g_fats")?,
    })
}

impl Database {
    pub async fn create_recipe(&self, input: RecipeInput) -> Result<Recipe> {
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO recipes (name, g_amount, calories, g_protein, g_carbs, g_fats)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    input.name.trim(),
                    input.amount_g,
                    input.calories,
                    input.protein_g,
                    input.carbs_g,
                    input.fat_g,
                ],
            )
            .context("failed to insert recipe")?;

            let recipe_id = conn.last_insert_rowid();
            conn.query_row(
                "SELECT id, name, g_amount, calories, g_protein, g_carbs, g_fats
                 FROM recipes WHERE id = ?1",
                params![recipe_id],
                row_to_recipe,
            )
            .map_err(|err| anyhow!("recipe {recipe_id} not found after insert: {err}"))
        })
        .await
    }

    /// All recipes, alphabetically.
    pub async fn list_recipes(&self) -> Result<Vec<Recipe>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, g_amount, calories, g_protein, g_carbs, g_fats
                 FROM recipes
                 ORDER BY name COLLATE NOCASE ASC, id ASC",
            )?;

            let recipes_iter = stmt.query_map([], row_to_recipe)?;

            let mut recipes = Vec::new();
            for recipe_result in recipes_iter {
                recipes.push(recipe_result?);
            }

            Ok(recipes)
        })
        .await
    }
}
