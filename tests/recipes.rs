mod common;

use foodgram_sdk::{
    actions::{
        add_to_favorites, add_to_shopping_cart, aggregate_shopping_list, create_recipe,
        delete_recipe, fetch_recipes, get_recipe, update_recipe,
    },
    error::ActionError,
    pagination::PageRequest,
    schema::{RecipeFilter, ShoppingListEntry},
    validation::RecipeRules,
};
use sqlx::PgPool;

use common::{admin, ingredient, input, recipe_count, tag, user};

fn entry(name: &str, unit: &str, total_amount: i64) -> ShoppingListEntry {
    ShoppingListEntry {
        ingredient_name: name.to_string(),
        measurement_unit: unit.to_string(),
        total_amount,
    }
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn cart_follows_recipe_updates(pool: PgPool) {
    let rules = RecipeRules::default();
    let admin = admin(&pool).await;
    let flour = ingredient(&pool, &admin, "flour", "g").await;
    let sugar = ingredient(&pool, &admin, "sugar", "g").await;
    let breakfast = tag(&pool, &admin, "breakfast", "#ffaa00").await;

    let author = user(&pool, "author").await;
    let viewer = user(&pool, "viewer").await;

    let recipe = create_recipe(
        &author,
        input("pancakes", &[breakfast.id], &[(flour.id, 200), (sugar.id, 50)]),
        &rules,
        &pool,
    )
    .await
    .unwrap();

    add_to_shopping_cart(recipe.id, &viewer, &pool).await.unwrap();
    assert_eq!(
        aggregate_shopping_list(Some(&viewer), &pool).await.unwrap(),
        vec![entry("flour", "g", 200), entry("sugar", "g", 50)]
    );

    let mut replacement = input("pancakes", &[breakfast.id], &[(sugar.id, 100)]);
    replacement.image = None;
    update_recipe(recipe.id, &author, replacement, &rules, &pool)
        .await
        .unwrap();

    assert_eq!(
        aggregate_shopping_list(Some(&viewer), &pool).await.unwrap(),
        vec![entry("sugar", "g", 100)]
    );
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn created_recipe_is_fully_populated(pool: PgPool) {
    let rules = RecipeRules::default();
    let admin = admin(&pool).await;
    let flour = ingredient(&pool, &admin, "flour", "g").await;
    let egg = ingredient(&pool, &admin, "egg", "pcs").await;
    let breakfast = tag(&pool, &admin, "breakfast", "#ffaa00").await;
    let author = user(&pool, "author").await;

    let recipe = create_recipe(
        &author,
        input("crepes", &[breakfast.id, breakfast.id], &[(flour.id, 120), (egg.id, 2)]),
        &rules,
        &pool,
    )
    .await
    .unwrap();

    assert_eq!(recipe.author.id, author.user_id);
    assert_eq!(recipe.tags, vec![breakfast]);
    assert_eq!(recipe.ingredients.len(), 2);
    assert_eq!(recipe.ingredients[0].name, "flour");
    assert_eq!(recipe.ingredients[1].amount, 2);
    assert!(!recipe.is_favorited);
    assert!(!recipe.is_in_shopping_cart);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn update_leaves_no_residue(pool: PgPool) {
    let rules = RecipeRules::default();
    let admin = admin(&pool).await;
    let flour = ingredient(&pool, &admin, "flour", "g").await;
    let milk = ingredient(&pool, &admin, "milk", "ml").await;
    let breakfast = tag(&pool, &admin, "breakfast", "#ffaa00").await;
    let dinner = tag(&pool, &admin, "dinner", "#0000ff").await;
    let author = user(&pool, "author").await;

    let recipe = create_recipe(
        &author,
        input("porridge", &[breakfast.id], &[(flour.id, 50), (milk.id, 300)]),
        &rules,
        &pool,
    )
    .await
    .unwrap();

    let updated = update_recipe(
        recipe.id,
        &author,
        input("porridge", &[dinner.id], &[(milk.id, 250)]),
        &rules,
        &pool,
    )
    .await
    .unwrap();

    assert_eq!(updated.tags, vec![dinner]);
    assert_eq!(updated.ingredients.len(), 1);
    assert_eq!(updated.ingredients[0].ingredient_id, milk.id);
    assert_eq!(updated.ingredients[0].amount, 250);
    assert_eq!(updated.pub_date, recipe.pub_date);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn invalid_payloads_write_nothing(pool: PgPool) {
    let rules = RecipeRules::default();
    let admin = admin(&pool).await;
    let flour = ingredient(&pool, &admin, "flour", "g").await;
    let breakfast = tag(&pool, &admin, "breakfast", "#ffaa00").await;
    let author = user(&pool, "author").await;

    let cases = vec![
        (input("a", &[breakfast.id], &[]), "no ingredients"),
        (input("b", &[], &[(flour.id, 10)]), "tags missing/invalid"),
        (input("c", &[9999], &[(flour.id, 10)]), "tags missing/invalid"),
        (
            input("d", &[breakfast.id], &[(flour.id, 10), (flour.id, 20)]),
            "duplicate ingredient: flour",
        ),
        (input("e", &[breakfast.id], &[(flour.id, 0)]), "amount must be ≥ 1"),
    ];

    for (payload, message) in cases {
        match create_recipe(&author, payload, &rules, &pool).await {
            Err(ActionError::Validation(info)) => assert_eq!(info, message),
            other => panic!("unexpected {other:?}"),
        }
    }

    assert_eq!(recipe_count(&pool).await, 0);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn failed_update_keeps_previous_version(pool: PgPool) {
    let rules = RecipeRules::default();
    let admin = admin(&pool).await;
    let flour = ingredient(&pool, &admin, "flour", "g").await;
    let breakfast = tag(&pool, &admin, "breakfast", "#ffaa00").await;
    let author = user(&pool, "author").await;

    let recipe = create_recipe(
        &author,
        input("bread", &[breakfast.id], &[(flour.id, 500)]),
        &rules,
        &pool,
    )
    .await
    .unwrap();

    let result = update_recipe(
        recipe.id,
        &author,
        input("bread", &[], &[(flour.id, 400)]),
        &rules,
        &pool,
    )
    .await;
    assert!(matches!(result, Err(ActionError::Validation(_))));

    let current = get_recipe(recipe.id, None, &pool).await.unwrap();
    assert_eq!(current.tags, vec![breakfast]);
    assert_eq!(current.ingredients[0].amount, 500);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn only_author_may_modify(pool: PgPool) {
    let rules = RecipeRules::default();
    let admin = admin(&pool).await;
    let flour = ingredient(&pool, &admin, "flour", "g").await;
    let breakfast = tag(&pool, &admin, "breakfast", "#ffaa00").await;
    let author = user(&pool, "author").await;
    let stranger = user(&pool, "stranger").await;

    let recipe = create_recipe(
        &author,
        input("toast", &[breakfast.id], &[(flour.id, 100)]),
        &rules,
        &pool,
    )
    .await
    .unwrap();

    let update = update_recipe(
        recipe.id,
        &stranger,
        input("toast", &[breakfast.id], &[(flour.id, 1)]),
        &rules,
        &pool,
    )
    .await;
    assert!(matches!(update, Err(ActionError::Permission(_))));
    assert!(matches!(
        delete_recipe(recipe.id, &stranger, &pool).await,
        Err(ActionError::Permission(_))
    ));

    delete_recipe(recipe.id, &author, &pool).await.unwrap();
    assert!(matches!(
        get_recipe(recipe.id, None, &pool).await,
        Err(ActionError::NotFound(_))
    ));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn filters_narrow_the_listing(pool: PgPool) {
    let rules = RecipeRules::default();
    let admin = admin(&pool).await;
    let flour = ingredient(&pool, &admin, "flour", "g").await;
    let breakfast = tag(&pool, &admin, "breakfast", "#ffaa00").await;
    let lunch = tag(&pool, &admin, "lunch", "#00ff00").await;
    let author = user(&pool, "author").await;
    let viewer = user(&pool, "viewer").await;

    let waffles = create_recipe(
        &author,
        input("waffles", &[breakfast.id], &[(flour.id, 100)]),
        &rules,
        &pool,
    )
    .await
    .unwrap();
    let soup = create_recipe(
        &author,
        input("soup", &[lunch.id], &[(flour.id, 10)]),
        &rules,
        &pool,
    )
    .await
    .unwrap();
    add_to_favorites(soup.id, &viewer, &pool).await.unwrap();

    let page = PageRequest::new(None, None, 6);

    let all = fetch_recipes(&RecipeFilter::default(), None, page, &pool)
        .await
        .unwrap();
    let ids: Vec<_> = all.rows.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![soup.id, waffles.id]);

    let by_tag = RecipeFilter {
        tags: vec![String::from("breakfast")],
        ..Default::default()
    };
    let rows = fetch_recipes(&by_tag, None, page, &pool).await.unwrap().rows;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, waffles.id);

    let favorited = RecipeFilter {
        is_favorited: true,
        ..Default::default()
    };
    let rows = fetch_recipes(&favorited, Some(&viewer), page, &pool)
        .await
        .unwrap()
        .rows;
    assert_eq!(rows.len(), 1);
    assert!(rows[0].is_favorited);

    let anonymous = fetch_recipes(&favorited, None, page, &pool).await.unwrap();
    assert_eq!(anonymous.total_rows, 2);
    assert!(anonymous.rows.iter().all(|r| !r.is_favorited));

    let by_name = RecipeFilter {
        name: Some(String::from("WAFF")),
        ..Default::default()
    };
    let rows = fetch_recipes(&by_name, None, page, &pool).await.unwrap().rows;
    assert_eq!(rows.len(), 1);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn page_past_the_end_keeps_total(pool: PgPool) {
    let rules = RecipeRules::default();
    let admin = admin(&pool).await;
    let flour = ingredient(&pool, &admin, "flour", "g").await;
    let breakfast = tag(&pool, &admin, "breakfast", "#ffaa00").await;
    let lunch = tag(&pool, &admin, "lunch", "#00ff00").await;
    let author = user(&pool, "author").await;

    for (name, tag_id) in [("eggs", breakfast.id), ("toast", breakfast.id), ("salad", lunch.id)] {
        let payload = input(name, &[tag_id], &[(flour.id, 1)]);
        create_recipe(&author, payload, &rules, &pool).await.unwrap();
    }

    let by_tag = RecipeFilter {
        tags: vec![String::from("breakfast")],
        ..Default::default()
    };
    let past_end = PageRequest::new(Some(5), Some(1), 6);

    let page = fetch_recipes(&by_tag, None, past_end, &pool).await.unwrap();
    assert!(page.rows.is_empty());
    assert_eq!(page.total_rows, 2);

    let empty = PageRequest::new(None, None, 6);
    let nothing = RecipeFilter {
        name: Some(String::from("pizza")),
        ..Default::default()
    };
    let page = fetch_recipes(&nothing, None, empty, &pool).await.unwrap();
    assert_eq!(page.total_rows, 0);
}
