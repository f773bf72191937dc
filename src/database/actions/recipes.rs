use std::collections::HashMap;

use crate::{
    authentication::permissions::ActionType,
    error::{ActionError, QueryError},
    jwt::SessionData,
    pagination::{PageContext, PageRequest},
    schema::{
        Recipe, RecipeDetail, RecipeFilter, RecipeIngredient, RecipeInput, RecipeRow,
        RecipeSummary, RecipeSummaryRow, Tag, UserProfile, Uuid,
    },
    validation::{
        assemble_lines, check_cooking_time, check_recipe_input, check_tags, ingredient_ids,
        tag_ids, RecipeLine, RecipeRules,
    },
};

use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use super::{
    ingredients::{like_pattern, list_recipe_ingredients, load_ingredients},
    relations::{add_edge, remove_edge, Relation},
    tags::{list_recipe_tags, load_tags},
    users::{get_profile, list_profiles},
};

const RECIPE_COLUMNS: &str = "
    SELECT r.*,
        EXISTS (SELECT 1 FROM user_favorites f WHERE f.recipe_id = r.id AND f.user_id = $2) AS is_favorited,
        EXISTS (SELECT 1 FROM user_cart c WHERE c.recipe_id = r.id AND c.user_id = $2) AS is_in_shopping_cart,
        1::BIGINT AS count
    FROM recipes r
";

/// Resolves the payload against the catalog. Nothing is written until this succeeds.
async fn validate_recipe(
    input: &RecipeInput,
    rules: &RecipeRules,
    pool: &Pool<Postgres>,
) -> Result<(Vec<RecipeLine>, Vec<Tag>), ActionError> {
    check_recipe_input(input, rules)?;

    let catalog = load_ingredients(&ingredient_ids(&input.ingredients), pool).await?;
    let lines = assemble_lines(&input.ingredients, &catalog, rules)?;

    let resolved = load_tags(&tag_ids(&input.tag_ids), pool).await?;
    let tags = check_tags(&input.tag_ids, resolved)?;

    Ok((lines, tags))
}

async fn insert_links(
    tr: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    tags: &[Tag],
    lines: &[RecipeLine],
) -> Result<(), ActionError> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    query_builder.push_values(tags, |mut b, tag| {
        b.push_bind(recipe_id).push_bind(tag.id);
    });
    query_builder.build().execute(&mut **tr).await?;

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    query_builder.push_values(lines, |mut b, line| {
        b.push_bind(recipe_id)
            .push_bind(line.ingredient.id)
            .push_bind(line.amount);
    });
    query_builder.build().execute(&mut **tr).await?;

    Ok(())
}

/// Creates the recipe row, its tag links and its ingredient lines in one transaction.
pub async fn create_recipe(
    session: &SessionData,
    input: RecipeInput,
    rules: &RecipeRules,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, ActionError> {
    session.authenticate(ActionType::CreateRecipes)?;

    let image = match input.image.as_deref().map(str::trim) {
        Some(image) if !image.is_empty() => image.to_string(),
        _ => return Err(ActionError::validation("image is required")),
    };
    let (lines, tags) = validate_recipe(&input, rules, pool).await?;
    let cooking_time = check_cooking_time(input.cooking_time, rules.cooking_time)?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let id: (Uuid,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(session.user_id)
    .bind(input.name.trim())
    .bind(image)
    .bind(&input.text)
    .bind(cooking_time)
    .fetch_one(&mut *tr)
    .await?;

    insert_links(&mut tr, id.0, &tags, &lines).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!(
        "Recipe {} created by {} with {} ingredients",
        id.0,
        session.username,
        lines.len()
    );

    get_recipe(id.0, Some(session), pool).await
}

/// Replaces the whole tag set and ingredient-line set. An omitted image keeps the current one.
pub async fn update_recipe(
    id: Uuid,
    session: &SessionData,
    input: RecipeInput,
    rules: &RecipeRules,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, ActionError> {
    get_recipe_mut(id, session, pool).await?;

    let image = input
        .image
        .as_deref()
        .map(str::trim)
        .filter(|image| !image.is_empty());
    let (lines, tags) = validate_recipe(&input, rules, pool).await?;
    let cooking_time = check_cooking_time(input.cooking_time, rules.cooking_time)?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let result = sqlx::query(
        "
        UPDATE recipes SET name = $1, image = COALESCE($2, image), text = $3, cooking_time = $4
        WHERE id = $5
    ",
    )
    .bind(input.name.trim())
    .bind(image)
    .bind(&input.text)
    .bind(cooking_time)
    .bind(id)
    .execute(&mut *tr)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ActionError::not_found("Recipe doesn't exist"));
    }

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;

    insert_links(&mut tr, id, &tags, &lines).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("Recipe {id} updated by {}", session.username);

    get_recipe(id, Some(session), pool).await
}

pub fn check_author(recipe: &Recipe, session: &SessionData) -> Result<(), ActionError> {
    if recipe.author_id != session.user_id {
        return Err(ActionError::permission(
            "Only the author can modify this recipe",
        ));
    }
    Ok(())
}

/// Loads a recipe the session is allowed to modify.
pub async fn get_recipe_mut(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ActionError> {
    session.authenticate(ActionType::ManageOwnRecipes)?;

    let recipe: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    let recipe = recipe.ok_or_else(|| ActionError::not_found("No recipe exists with specified id"))?;
    check_author(&recipe, session)?;

    Ok(recipe)
}

pub async fn delete_recipe(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), ActionError> {
    get_recipe_mut(id, session, pool).await?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    log::info!("Recipe {id} deleted by {}", session.username);
    Ok(())
}

fn group_by_recipe<T, F>(rows: Vec<T>, key: F) -> HashMap<Uuid, Vec<T>>
where
    F: Fn(&T) -> Uuid,
{
    let mut hashmap: HashMap<Uuid, Vec<T>> = HashMap::new();
    rows.into_iter()
        .for_each(|row| hashmap.entry(key(&row)).or_default().push(row));
    hashmap
}

fn into_detail(
    row: RecipeRow,
    author: UserProfile,
    tags: Vec<Tag>,
    ingredients: Vec<RecipeIngredient>,
) -> RecipeDetail {
    RecipeDetail {
        id: row.id,
        author,
        name: row.name,
        image: row.image,
        text: row.text,
        cooking_time: row.cooking_time,
        pub_date: row.pub_date,
        tags,
        ingredients,
        is_favorited: row.is_favorited,
        is_in_shopping_cart: row.is_in_shopping_cart,
    }
}

/// Full recipe as seen by `viewer`; both flags are false for anonymous viewers.
pub async fn get_recipe(
    id: Uuid,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, ActionError> {
    let row: Option<RecipeRow> = sqlx::query_as(&format!("{RECIPE_COLUMNS} WHERE r.id = $1"))
        .bind(id)
        .bind(viewer.map(|session| session.user_id))
        .fetch_optional(pool)
        .await?;

    let row = row.ok_or_else(|| ActionError::not_found("Recipe doesn't exist"))?;

    let author = get_profile(row.author_id, viewer, pool).await?;
    let tags = list_recipe_tags(&[id], pool)
        .await?
        .into_iter()
        .map(Tag::from)
        .collect();
    let ingredients = list_recipe_ingredients(&[id], pool).await?;

    Ok(into_detail(row, author, tags, ingredients))
}

fn push_recipe_filters(
    query_builder: &mut QueryBuilder<'_, Postgres>,
    filter: &RecipeFilter,
    viewer_id: Option<Uuid>,
) {
    if let Some(author) = filter.author {
        query_builder.push(" AND r.author_id = ");
        query_builder.push_bind(author);
    }

    if !filter.tags.is_empty() {
        query_builder.push(
            " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(",
        );
        query_builder.push_bind(filter.tags.clone());
        query_builder.push("))");
    }

    if let Some(name) = &filter.name {
        query_builder.push(" AND r.name ILIKE ");
        query_builder.push_bind(like_pattern(name));
    }

    if let Some(viewer_id) = viewer_id {
        if filter.is_favorited {
            query_builder.push(
                " AND EXISTS (SELECT 1 FROM user_favorites ff WHERE ff.recipe_id = r.id AND ff.user_id = ",
            );
            query_builder.push_bind(viewer_id);
            query_builder.push(")");
        }
        if filter.is_in_shopping_cart {
            query_builder.push(
                " AND EXISTS (SELECT 1 FROM user_cart cc WHERE cc.recipe_id = r.id AND cc.user_id = ",
            );
            query_builder.push_bind(viewer_id);
            query_builder.push(")");
        }
    }
}

/// Window counts vanish with the rows, so a page past the end counts separately.
async fn count_recipes(
    filter: &RecipeFilter,
    viewer_id: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<i64, ActionError> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM recipes r WHERE TRUE");
    push_recipe_filters(&mut query_builder, filter, viewer_id);

    let row: (i64,) = query_builder.build_query_as().fetch_one(pool).await?;
    Ok(row.0)
}

/// Newest first. The favorite and cart filters only apply to signed in viewers.
pub async fn fetch_recipes(
    filter: &RecipeFilter,
    viewer: Option<&SessionData>,
    page: PageRequest,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeDetail>, ActionError> {
    let viewer_id = viewer.map(|session| session.user_id);

    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT r.*, EXISTS (SELECT 1 FROM user_favorites f WHERE f.recipe_id = r.id AND f.user_id = ",
    );
    query_builder.push_bind(viewer_id);
    query_builder.push(
        ") AS is_favorited, EXISTS (SELECT 1 FROM user_cart c WHERE c.recipe_id = r.id AND c.user_id = ",
    );
    query_builder.push_bind(viewer_id);
    query_builder.push(") AS is_in_shopping_cart, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

    push_recipe_filters(&mut query_builder, filter, viewer_id);

    query_builder.push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ");
    query_builder.push_bind(page.limit);
    query_builder.push(" OFFSET ");
    query_builder.push_bind(page.offset());

    let rows: Vec<RecipeRow> = query_builder
        .build_query_as()
        .fetch_all(pool)
        .await?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None if page.offset() > 0 => count_recipes(filter, viewer_id, pool).await?,
        None => 0,
    };
    let details = load_details(rows, viewer, pool).await?;

    Ok(PageContext::from_rows(
        details,
        total_count,
        page.limit,
        page.offset(),
    ))
}

/// Batch-loads authors, tags and ingredient lines for a page of rows.
async fn load_details(
    rows: Vec<RecipeRow>,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeDetail>, ActionError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let mut author_ids: Vec<Uuid> = rows.iter().map(|row| row.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let authors: HashMap<Uuid, UserProfile> = list_profiles(&author_ids, viewer, pool)
        .await?
        .into_iter()
        .map(|profile| (profile.id, profile))
        .collect();
    let mut tags = group_by_recipe(list_recipe_tags(&ids, pool).await?, |tag| tag.recipe_id);
    let mut ingredients =
        group_by_recipe(list_recipe_ingredients(&ids, pool).await?, |line| line.recipe_id);

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let author = authors.get(&row.author_id)?.clone();
            let tags = tags
                .remove(&row.id)
                .unwrap_or_default()
                .into_iter()
                .map(Tag::from)
                .collect();
            let ingredients = ingredients.remove(&row.id).unwrap_or_default();
            Some(into_detail(row, author, tags, ingredients))
        })
        .collect())
}

pub async fn get_recipe_summary(
    id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<RecipeSummary, ActionError> {
    let summary: Option<RecipeSummary> =
        sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    summary.ok_or_else(|| ActionError::not_found("Recipe doesn't exist"))
}

/// Newest recipes per author, at most `limit` each when given.
pub async fn list_author_recipes(
    author_ids: &[Uuid],
    limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<HashMap<Uuid, Vec<RecipeSummary>>, ActionError> {
    let rows: Vec<RecipeSummaryRow> = sqlx::query_as(
        "
        SELECT author_id, id, name, image, cooking_time FROM (
            SELECT r.author_id, r.id, r.name, r.image, r.cooking_time,
                ROW_NUMBER() OVER (PARTITION BY r.author_id ORDER BY r.pub_date DESC, r.id DESC) AS n
            FROM recipes r
            WHERE r.author_id = ANY($1)
        ) ranked
        WHERE $2::BIGINT IS NULL OR ranked.n <= $2
        ORDER BY ranked.author_id, ranked.n
    ",
    )
    .bind(author_ids)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(group_by_recipe(rows, |row| row.author_id)
        .into_iter()
        .map(|(author_id, rows)| {
            (
                author_id,
                rows.into_iter().map(RecipeSummary::from).collect(),
            )
        })
        .collect())
}

pub async fn count_author_recipes(
    author_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Uuid, i64>, ActionError> {
    let rows: Vec<(Uuid, i64)> = sqlx::query_as(
        "SELECT author_id, COUNT(*) FROM recipes WHERE author_id = ANY($1) GROUP BY author_id",
    )
    .bind(author_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}

pub async fn add_to_favorites(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<RecipeSummary, ActionError> {
    session.authenticate(ActionType::ManageOwnFavorites)?;
    let summary = get_recipe_summary(id, pool).await?;

    add_edge(Relation::Favorites, session.user_id, id, pool).await?;
    Ok(summary)
}

pub async fn remove_from_favorites(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), ActionError> {
    session.authenticate(ActionType::ManageOwnFavorites)?;
    remove_edge(Relation::Favorites, session.user_id, id, pool).await
}
