use crate::{
    authentication::permissions::ActionType,
    constants::{INGREDIENT_NAME_MAX_LENGTH, MEASUREMENT_UNIT_MAX_LENGTH},
    error::ActionError,
    jwt::SessionData,
    schema::{Ingredient, RecipeIngredient, Uuid},
    validation::check_text,
};

use sqlx::{Pool, Postgres};

pub async fn create_ingredient(
    session: &SessionData,
    name: &str,
    measurement_unit: &str,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, ActionError> {
    session.authenticate(ActionType::ManageCatalog)?;

    check_text("name", name, INGREDIENT_NAME_MAX_LENGTH)?;
    check_text("measurement_unit", measurement_unit, MEASUREMENT_UNIT_MAX_LENGTH)?;

    let ingredient: Option<Ingredient> = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING RETURNING *
    ",
    )
    .bind(name.trim())
    .bind(measurement_unit.trim())
    .fetch_optional(pool)
    .await?;

    match ingredient {
        Some(ingredient) => {
            log::info!(
                "Ingredient '{}' ({}) created",
                ingredient.name,
                ingredient.measurement_unit
            );
            Ok(ingredient)
        }
        None => Err(ActionError::conflict(
            "Ingredient with the same measurement unit already exists",
        )),
    }
}

pub async fn get_ingredient(id: Uuid, pool: &Pool<Postgres>) -> Result<Ingredient, ActionError> {
    let ingredient: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    ingredient.ok_or_else(|| ActionError::not_found("Ingredient doesn't exist"))
}

/// Case-insensitive substring search on the name. `None` lists the whole catalog.
pub async fn list_ingredients(
    search: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, ActionError> {
    let pattern = search.map(like_pattern).unwrap_or_else(|| String::from("%"));

    let list: Vec<Ingredient> =
        sqlx::query_as("SELECT * FROM ingredients WHERE name ILIKE $1 ORDER BY name, measurement_unit")
            .bind(pattern)
            .fetch_all(pool)
            .await?;

    Ok(list)
}

pub async fn load_ingredients(
    ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, ActionError> {
    let list: Vec<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await?;

    Ok(list)
}

/// Removing an ingredient also removes every recipe line that uses it.
pub async fn delete_ingredient(
    session: &SessionData,
    id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ActionError> {
    session.authenticate(ActionType::ManageCatalog)?;

    let result = sqlx::query("DELETE FROM ingredients WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ActionError::not_found("Ingredient doesn't exist"));
    }

    log::info!("Ingredient {id} deleted by {}", session.username);
    Ok(())
}

pub async fn list_recipe_ingredients(
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeIngredient>, ActionError> {
    let rows: Vec<RecipeIngredient> = sqlx::query_as(
        "
        SELECT ri.recipe_id, i.id AS ingredient_id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY ri.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Wraps `search` for ILIKE, escaping the pattern characters it may contain.
pub fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_matches_substrings() {
        assert_eq!(like_pattern("flour"), "%flour%");
        assert_eq!(like_pattern("  oat "), "%oat%");
        assert_eq!(like_pattern(""), "%%");
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
    }
}
