use crate::{
    authentication::permissions::ActionType,
    constants::TAG_NAME_MAX_LENGTH,
    error::ActionError,
    jwt::SessionData,
    schema::{LinkedRecipeTag, Tag, Uuid},
    validation::{check_slug, check_text, normalize_color},
};

use sqlx::{Pool, Postgres};

pub async fn create_tag(
    session: &SessionData,
    name: &str,
    color: &str,
    slug: &str,
    pool: &Pool<Postgres>,
) -> Result<Tag, ActionError> {
    session.authenticate(ActionType::ManageCatalog)?;

    check_text("name", name, TAG_NAME_MAX_LENGTH)?;
    let color = normalize_color(color)?;
    check_slug(slug)?;

    let tag: Option<Tag> = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING RETURNING *",
    )
    .bind(name.trim())
    .bind(color)
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    match tag {
        Some(tag) => {
            log::info!("Tag '{}' created by {}", tag.slug, session.username);
            Ok(tag)
        }
        None => Err(ActionError::conflict(
            "A tag with the same name, color or slug already exists",
        )),
    }
}

pub async fn get_tag(id: Uuid, pool: &Pool<Postgres>) -> Result<Tag, ActionError> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    tag.ok_or_else(|| ActionError::not_found("Tag doesn't exist"))
}

pub async fn find_tag_by_slug(slug: &str, pool: &Pool<Postgres>) -> Result<Option<Tag>, ActionError> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, ActionError> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY name")
        .fetch_all(pool)
        .await?;

    Ok(list)
}

/// Loads whichever of `ids` exist. Callers decide what a missing tag means.
pub async fn load_tags(ids: &[Uuid], pool: &Pool<Postgres>) -> Result<Vec<Tag>, ActionError> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await?;

    Ok(list)
}

pub async fn list_recipe_tags(
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<Vec<LinkedRecipeTag>, ActionError> {
    let list: Vec<LinkedRecipeTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    Ok(list)
}
