use std::{env, fmt::Display, str::FromStr};

use log::{info, warn};
use thiserror::Error;

use crate::{
    constants::{
        DATABASE_MAX_CONNECTIONS, MAX_AMOUNT, MAX_COOKING_TIME, MIN_AMOUNT, MIN_COOKING_TIME,
        RECIPE_COUNT_PER_PAGE, SESSION_LIFETIME_HOURS,
    },
    validation::{Bounds, RecipeRules},
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable {0} is required")]
    Missing(&'static str),

    #[error("Invalid {key} value: {info}")]
    Invalid { key: &'static str, info: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub session_secret: String,
    pub session_lifetime_hours: i64,
    pub recipe_page_size: i64,
    pub amount_bounds: Bounds,
    pub cooking_time_bounds: Bounds,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let amount_bounds = Bounds::new(
            try_load(&lookup, "MIN_AMOUNT", MIN_AMOUNT)?,
            try_load(&lookup, "MAX_AMOUNT", MAX_AMOUNT)?,
        );
        let cooking_time_bounds = Bounds::new(
            try_load(&lookup, "MIN_COOKING_TIME", MIN_COOKING_TIME)?,
            try_load(&lookup, "MAX_COOKING_TIME", MAX_COOKING_TIME)?,
        );

        // The schema CHECK constraints cap both fields at the default maximums.
        for (min_key, max_key, bounds, ceiling) in [
            ("MIN_AMOUNT", "MAX_AMOUNT", amount_bounds, MAX_AMOUNT),
            ("MIN_COOKING_TIME", "MAX_COOKING_TIME", cooking_time_bounds, MAX_COOKING_TIME),
        ] {
            if bounds.min < 1 || bounds.min > bounds.max {
                return Err(ConfigError::Invalid {
                    key: min_key,
                    info: format!("range {}..={} is empty or not positive", bounds.min, bounds.max),
                });
            }
            if bounds.max > ceiling {
                warn!("{max_key} {} is above the stored maximum of {ceiling}", bounds.max);
                return Err(ConfigError::Invalid {
                    key: max_key,
                    info: format!("must be at most {ceiling}"),
                });
            }
        }

        let recipe_page_size = try_load(&lookup, "RECIPE_PAGE_SIZE", RECIPE_COUNT_PER_PAGE)?;
        if recipe_page_size < 1 {
            return Err(ConfigError::Invalid {
                key: "RECIPE_PAGE_SIZE",
                info: String::from("must be positive"),
            });
        }

        Ok(Self {
            database_url: require(&lookup, "DATABASE_URL")?,
            database_max_connections: try_load(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                DATABASE_MAX_CONNECTIONS,
            )?,
            session_secret: require(&lookup, "SESSION_SECRET")?,
            session_lifetime_hours: try_load(
                &lookup,
                "SESSION_LIFETIME_HOURS",
                SESSION_LIFETIME_HOURS,
            )?,
            recipe_page_size,
            amount_bounds,
            cooking_time_bounds,
        })
    }

    pub fn recipe_rules(&self) -> RecipeRules {
        RecipeRules {
            amount: self.amount_bounds,
            cooking_time: self.cooking_time_bounds,
        }
    }
}

fn require<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => {
            warn!("Environment variable {key} not found");
            Err(ConfigError::Missing(key))
        }
    }
}

fn try_load<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                info: e.to_string(),
            }
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
