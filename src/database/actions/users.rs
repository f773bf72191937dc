use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::{generate_jwt_session, SessionKeys},
        permissions::ActionType,
    },
    error::{ActionError, QueryError},
    jwt::SessionData,
    pagination::{PageContext, PageRequest},
    schema::{AuthorWithRecipes, NewUser, User, UserProfile, UserProfileRow, Uuid},
    validation::check_new_user,
};

use sqlx::{Pool, Postgres};

use super::{
    recipes::{count_author_recipes, list_author_recipes},
    relations::{add_edge, remove_edge, Relation},
};

const PROFILE_COLUMNS: &str = "
    SELECT u.id, u.email, u.username, u.first_name, u.last_name,
        EXISTS (
            SELECT 1 FROM user_subscriptions s WHERE s.author_id = u.id AND s.subscriber_id = $2
        ) AS is_subscribed
    FROM users u
";

pub async fn get_user_by_email(
    email: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<User>, ActionError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_user_by_id(user_id: Uuid, pool: &Pool<Postgres>) -> Result<Option<User>, ActionError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

fn hash(password: &str) -> Result<String, ActionError> {
    hash_password(password).map_err(|e| {
        log::error!("Failed to hash password: {e}");
        QueryError::new("Could not store password".to_owned()).into()
    })
}

/// Creates a user, storing the argon2 hash of their password.
pub async fn register_user(
    user: NewUser,
    pool: &Pool<Postgres>,
) -> Result<UserProfile, ActionError> {
    check_new_user(&user)?;
    let password = hash(&user.password)?;

    let profile: Option<UserProfile> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING
        RETURNING id, email, username, first_name, last_name, FALSE AS is_subscribed
    ",
    )
    .bind(user.email.trim())
    .bind(user.username.trim())
    .bind(user.first_name.trim())
    .bind(user.last_name.trim())
    .bind(password)
    .fetch_optional(pool)
    .await?;

    match profile {
        Some(profile) => {
            log::info!("User '{}' registered", profile.username);
            Ok(profile)
        }
        None => Err(ActionError::conflict(
            "A user with that username or email already exists",
        )),
    }
}

pub async fn login_user(
    email: &str,
    password: &str,
    keys: &SessionKeys,
    pool: &Pool<Postgres>,
) -> Result<String, ActionError> {
    let invalid = || ActionError::validation("Invalid credentials");

    let user = get_user_by_email(email.trim(), pool)
        .await?
        .ok_or_else(invalid)?;

    let authenticated = verify_password(password, &user.password).map_err(|_e| invalid())?;
    if !authenticated {
        return Err(invalid());
    }

    generate_jwt_session(&user, keys)
}

pub async fn set_password(
    session: &SessionData,
    current_password: &str,
    new_password: &str,
    pool: &Pool<Postgres>,
) -> Result<(), ActionError> {
    let user = get_user_by_id(session.user_id, pool)
        .await?
        .ok_or_else(|| ActionError::not_found("User doesn't exist"))?;

    let authenticated = verify_password(current_password, &user.password)
        .map_err(|_e| ActionError::validation("Invalid credentials"))?;
    if !authenticated {
        return Err(ActionError::validation("Invalid credentials"));
    }
    if new_password.is_empty() {
        return Err(ActionError::validation("password must not be empty"));
    }

    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(hash(new_password)?)
        .bind(user.id)
        .execute(pool)
        .await?;

    log::info!("User '{}' changed their password", user.username);
    Ok(())
}

pub async fn get_profile(
    id: Uuid,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<UserProfile, ActionError> {
    let profile: Option<UserProfile> =
        sqlx::query_as(&format!("{PROFILE_COLUMNS} WHERE u.id = $1"))
            .bind(id)
            .bind(viewer.map(|session| session.user_id))
            .fetch_optional(pool)
            .await?;

    profile.ok_or_else(|| ActionError::not_found("User doesn't exist"))
}

pub async fn list_profiles(
    ids: &[Uuid],
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<Vec<UserProfile>, ActionError> {
    let profiles: Vec<UserProfile> =
        sqlx::query_as(&format!("{PROFILE_COLUMNS} WHERE u.id = ANY($1) ORDER BY u.id"))
            .bind(ids)
            .bind(viewer.map(|session| session.user_id))
            .fetch_all(pool)
            .await?;

    Ok(profiles)
}

pub async fn fetch_users(
    viewer: Option<&SessionData>,
    page: PageRequest,
    pool: &Pool<Postgres>,
) -> Result<PageContext<UserProfile>, ActionError> {
    let rows: Vec<UserProfileRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            EXISTS (
                SELECT 1 FROM user_subscriptions s WHERE s.author_id = u.id AND s.subscriber_id = $1
            ) AS is_subscribed,
            COUNT(*) OVER() AS count
        FROM users u
        ORDER BY u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(viewer.map(|session| session.user_id))
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None if page.offset() > 0 => {
            let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
                .fetch_one(pool)
                .await?;
            row.0
        }
        None => 0,
    };
    let rows = rows.into_iter().map(UserProfile::from).collect();

    Ok(PageContext::from_rows(
        rows,
        total_count,
        page.limit,
        page.offset(),
    ))
}

async fn with_recipes(
    profiles: Vec<UserProfile>,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Vec<AuthorWithRecipes>, ActionError> {
    let ids: Vec<Uuid> = profiles.iter().map(|profile| profile.id).collect();
    let mut recipes = list_author_recipes(&ids, recipes_limit, pool).await?;
    let counts = count_author_recipes(&ids, pool).await?;

    Ok(profiles
        .into_iter()
        .map(|profile| AuthorWithRecipes {
            recipes: recipes.remove(&profile.id).unwrap_or_default(),
            recipes_count: counts.get(&profile.id).copied().unwrap_or(0),
            profile,
        })
        .collect())
}

pub async fn subscribe(
    author_id: Uuid,
    session: &SessionData,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<AuthorWithRecipes, ActionError> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    add_edge(Relation::Subscriptions, session.user_id, author_id, pool).await?;

    log::info!("{} subscribed to {author_id}", session.username);

    let author = get_profile(author_id, Some(session), pool).await?;
    let mut authors = with_recipes(vec![author], recipes_limit, pool).await?;
    authors
        .pop()
        .ok_or_else(|| ActionError::not_found("User doesn't exist"))
}

pub async fn unsubscribe(
    author_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), ActionError> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    remove_edge(Relation::Subscriptions, session.user_id, author_id, pool).await?;

    log::info!("{} unsubscribed from {author_id}", session.username);
    Ok(())
}

/// Authors `session` follows, each with a preview of their newest recipes.
pub async fn fetch_subscriptions(
    session: &SessionData,
    page: PageRequest,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<AuthorWithRecipes>, ActionError> {
    let rows: Vec<UserProfileRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            TRUE AS is_subscribed,
            COUNT(*) OVER() AS count
        FROM user_subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.subscriber_id = $1
        ORDER BY u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(session.user_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None if page.offset() > 0 => {
            let row: (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM user_subscriptions WHERE subscriber_id = $1")
                    .bind(session.user_id)
                    .fetch_one(pool)
                    .await?;
            row.0
        }
        None => 0,
    };
    let profiles = rows.into_iter().map(UserProfile::from).collect();
    let authors = with_recipes(profiles, recipes_limit, pool).await?;

    Ok(PageContext::from_rows(
        authors,
        total_count,
        page.limit,
        page.offset(),
    ))
}
