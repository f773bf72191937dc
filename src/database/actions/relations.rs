use sqlx::{Pool, Postgres};

use crate::{error::ActionError, schema::Uuid};

/// The three membership sets a user owns. Each is an edge table keyed by the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Favorites,
    Cart,
    Subscriptions,
}

impl Relation {
    fn table(self) -> &'static str {
        match self {
            Relation::Favorites => "user_favorites",
            Relation::Cart => "user_cart",
            Relation::Subscriptions => "user_subscriptions",
        }
    }

    /// (subject, object) column names.
    fn columns(self) -> (&'static str, &'static str) {
        match self {
            Relation::Favorites | Relation::Cart => ("user_id", "recipe_id"),
            Relation::Subscriptions => ("subscriber_id", "author_id"),
        }
    }

    fn already_exists(self) -> &'static str {
        match self {
            Relation::Favorites => "Recipe is already in favorites",
            Relation::Cart => "Recipe is already in the shopping cart",
            Relation::Subscriptions => "Already subscribed to this author",
        }
    }

    fn missing(self) -> &'static str {
        match self {
            Relation::Favorites => "Recipe is not in favorites",
            Relation::Cart => "Recipe is not in the shopping cart",
            Relation::Subscriptions => "Not subscribed to this author",
        }
    }
}

pub fn check_edge(relation: Relation, subject: Uuid, object: Uuid) -> Result<(), ActionError> {
    if relation == Relation::Subscriptions && subject == object {
        return Err(ActionError::validation("You can't subscribe to yourself"));
    }
    Ok(())
}

fn insert_outcome(relation: Relation, rows_affected: u64) -> Result<(), ActionError> {
    match rows_affected {
        0 => Err(ActionError::conflict(relation.already_exists())),
        _ => Ok(()),
    }
}

fn delete_outcome(relation: Relation, rows_affected: u64) -> Result<(), ActionError> {
    match rows_affected {
        0 => Err(ActionError::not_found(relation.missing())),
        _ => Ok(()),
    }
}

/// Fails with Conflict when the edge is already present. A racing insert of the
/// same pair either hits `DO NOTHING` or the primary key, both of which end up here.
pub async fn add_edge(
    relation: Relation,
    subject: Uuid,
    object: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ActionError> {
    check_edge(relation, subject, object)?;
    let (subject_column, object_column) = relation.columns();

    let result = sqlx::query(&format!(
        "INSERT INTO {} ({subject_column}, {object_column}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        relation.table()
    ))
    .bind(subject)
    .bind(object)
    .execute(pool)
    .await;

    let rows_affected = match result {
        Ok(result) => result.rows_affected(),
        Err(e) => match ActionError::from(e) {
            ActionError::Conflict(_) => 0,
            ActionError::NotFound(_) => {
                return Err(ActionError::NotFound(format!("Target {object} doesn't exist")))
            }
            e => return Err(e),
        },
    };

    insert_outcome(relation, rows_affected)?;
    log::debug!("{:?}: {subject} -> {object} added", relation);
    Ok(())
}

pub async fn remove_edge(
    relation: Relation,
    subject: Uuid,
    object: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ActionError> {
    let (subject_column, object_column) = relation.columns();

    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE {subject_column} = $1 AND {object_column} = $2",
        relation.table()
    ))
    .bind(subject)
    .bind(object)
    .execute(pool)
    .await?;

    delete_outcome(relation, result.rows_affected())?;
    log::debug!("{:?}: {subject} -> {object} removed", relation);
    Ok(())
}

pub async fn contains_edge(
    relation: Relation,
    subject: Uuid,
    object: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, ActionError> {
    let (subject_column, object_column) = relation.columns();

    let row: (bool,) = sqlx::query_as(&format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE {subject_column} = $1 AND {object_column} = $2)",
        relation.table()
    ))
    .bind(subject)
    .bind(object)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

#[cfg(test)]
mod tests {
    use sqlx::postgres::PgPoolOptions;

    use super::*;

    #[test]
    fn self_subscription_is_invalid() {
        assert!(matches!(
            check_edge(Relation::Subscriptions, 4, 4),
            Err(ActionError::Validation(_))
        ));
        assert!(check_edge(Relation::Subscriptions, 4, 5).is_ok());
        // a user favoriting recipe 4 is unrelated to user 4
        assert!(check_edge(Relation::Favorites, 4, 4).is_ok());
    }

    #[test]
    fn second_add_conflicts() {
        assert!(insert_outcome(Relation::Cart, 1).is_ok());
        assert!(matches!(
            insert_outcome(Relation::Cart, 0),
            Err(ActionError::Conflict(_))
        ));
    }

    #[test]
    fn second_remove_is_not_found() {
        assert!(delete_outcome(Relation::Favorites, 1).is_ok());
        match delete_outcome(Relation::Favorites, 0) {
            Err(ActionError::NotFound(info)) => assert_eq!(info, "Recipe is not in favorites"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn edge_tables() {
        assert_eq!(Relation::Cart.table(), "user_cart");
        assert_eq!(
            Relation::Subscriptions.columns(),
            ("subscriber_id", "author_id")
        );
    }

    #[tokio::test]
    async fn self_subscription_fails_before_touching_the_database() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unreachable")
            .unwrap();

        assert!(matches!(
            add_edge(Relation::Subscriptions, 9, 9, &pool).await,
            Err(ActionError::Validation(_))
        ));
    }
}
