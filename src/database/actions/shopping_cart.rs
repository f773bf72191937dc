use crate::{
    authentication::permissions::{require_session, ActionType},
    error::ActionError,
    jwt::SessionData,
    schema::{RecipeSummary, ShoppingListDocument, ShoppingListEntry, ShoppingListLine, Uuid},
    shopping_list::aggregate,
};

use sqlx::{Pool, Postgres};

use super::{
    recipes::get_recipe_summary,
    relations::{add_edge, remove_edge, Relation},
};

pub async fn add_to_shopping_cart(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<RecipeSummary, ActionError> {
    session.authenticate(ActionType::ManageOwnCart)?;
    let summary = get_recipe_summary(id, pool).await?;

    add_edge(Relation::Cart, session.user_id, id, pool).await?;
    Ok(summary)
}

pub async fn remove_from_shopping_cart(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), ActionError> {
    session.authenticate(ActionType::ManageOwnCart)?;
    remove_edge(Relation::Cart, session.user_id, id, pool).await
}

pub async fn list_cart_recipes(
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeSummary>, ActionError> {
    let list: Vec<RecipeSummary> = sqlx::query_as(
        "
        SELECT r.id, r.name, r.image, r.cooking_time
        FROM user_cart c
        INNER JOIN recipes r ON r.id = c.recipe_id
        WHERE c.user_id = $1
        ORDER BY r.name, r.id
    ",
    )
    .bind(session.user_id)
    .fetch_all(pool)
    .await?;

    Ok(list)
}

/// Every ingredient line of every recipe currently in the user's cart.
pub async fn list_cart_lines(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShoppingListLine>, ActionError> {
    let lines: Vec<ShoppingListLine> = sqlx::query_as(
        "
        SELECT i.name AS ingredient_name, i.measurement_unit, ri.amount
        FROM user_cart c
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(lines)
}

pub async fn aggregate_shopping_list(
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShoppingListEntry>, ActionError> {
    let session = require_session(viewer)?;
    let lines = list_cart_lines(session.user_id, pool).await?;

    log::debug!(
        "Aggregating {} cart lines for {}",
        lines.len(),
        session.username
    );

    Ok(aggregate(lines))
}

pub async fn download_shopping_list(
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<ShoppingListDocument, ActionError> {
    let entries = aggregate_shopping_list(viewer, pool).await?;
    Ok(ShoppingListDocument::from(entries.as_slice()))
}

#[cfg(test)]
mod tests {
    use sqlx::postgres::PgPoolOptions;

    use super::*;

    #[tokio::test]
    async fn anonymous_viewer_has_no_shopping_list() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unreachable")
            .unwrap();

        assert!(matches!(
            aggregate_shopping_list(None, &pool).await,
            Err(ActionError::Permission(_))
        ));
        assert!(matches!(
            download_shopping_list(None, &pool).await,
            Err(ActionError::Permission(_))
        ));
    }
}
