#![allow(dead_code)]

use foodgram_sdk::{
    actions::{create_ingredient, create_tag, register_user},
    jwt::SessionData,
    schema::{Ingredient, IngredientEntry, NewUser, RecipeInput, Tag, UserRole, Uuid},
};
use sqlx::PgPool;

pub async fn user(pool: &PgPool, username: &str) -> SessionData {
    let profile = register_user(
        NewUser {
            email: format!("{username}@example.com"),
            username: username.to_string(),
            first_name: String::from("Test"),
            last_name: String::from("Cook"),
            password: String::from("correct horse"),
        },
        pool,
    )
    .await
    .expect("register user");

    SessionData {
        user_id: profile.id,
        username: profile.username,
        user_role: UserRole::User,
        is_admin: false,
    }
}

pub async fn admin(pool: &PgPool) -> SessionData {
    let mut session = user(pool, "admin").await;
    sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1")
        .bind(session.user_id)
        .execute(pool)
        .await
        .expect("promote admin");

    session.user_role = UserRole::Admin;
    session.is_admin = true;
    session
}

pub async fn ingredient(pool: &PgPool, admin: &SessionData, name: &str, unit: &str) -> Ingredient {
    create_ingredient(admin, name, unit, pool)
        .await
        .expect("create ingredient")
}

pub async fn tag(pool: &PgPool, admin: &SessionData, slug: &str, color: &str) -> Tag {
    create_tag(admin, slug, color, slug, pool)
        .await
        .expect("create tag")
}

pub fn input(name: &str, tags: &[Uuid], lines: &[(Uuid, i64)]) -> RecipeInput {
    RecipeInput {
        name: name.to_string(),
        image: Some(format!("recipes/{name}.png")),
        text: String::from("Mix everything."),
        cooking_time: 15,
        tag_ids: tags.to_vec(),
        ingredients: lines
            .iter()
            .map(|&(ingredient_id, amount)| IngredientEntry {
                ingredient_id,
                amount,
            })
            .collect(),
    }
}

pub async fn recipe_count(pool: &PgPool) -> i64 {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes")
        .fetch_one(pool)
        .await
        .expect("count recipes");
    row.0
}
