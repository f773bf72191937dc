use std::{collections::HashMap, str::FromStr};

use serde_json::Value;

use super::{
    error::{ActionError, TypeError},
    schema::{IngredientEntry, RecipeFilter, RecipeInput, Uuid},
};

pub type FormData = HashMap<String, Value>;

pub struct Form {
    inner: HashMap<String, Value>,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    /// Accepts a JSON object body; anything else is an invalid form.
    pub fn from_json(value: Value) -> Result<Self, TypeError> {
        match value {
            Value::Object(map) => Ok(Self::from_data(map.into_iter().collect())),
            _ => Err(TypeError::new("Expected an object")),
        }
    }

    /// Numbers may arrive either as JSON numbers or as numeric strings.
    pub fn get_number<T>(&self, key: &str) -> Result<T, TypeError>
    where
        T: FromStr,
    {
        match self.inner.get(key) {
            Some(Value::Number(n)) => n
                .to_string()
                .parse()
                .map_err(|_e| TypeError::new("Invalid type conversion")),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map_err(|_e| TypeError::new("Invalid type conversion")),
            Some(_) => Err(TypeError::new("Failed to parse value as number")),
            None => Err(TypeError::new("Invalid key")),
        }
    }

    pub fn get_str(&self, key: &str) -> Result<String, TypeError> {
        match self.inner.get(key) {
            Some(value) => match value.as_str() {
                Some(v) => Ok(v.to_string()),
                None => Err(TypeError::new("Invalid key")),
            },
            None => Err(TypeError::new("Invalid key")),
        }
    }

    pub fn get_optional_str(&self, key: &str) -> Result<Option<String>, TypeError> {
        match self.inner.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.get_str(key).map(Some),
        }
    }

    pub fn get_tag_ids(&self) -> Result<Vec<Uuid>, ActionError> {
        let invalid = || ActionError::validation("tags missing/invalid");

        let values = match self.inner.get("tags") {
            Some(Value::Array(values)) => values,
            _ => return Err(invalid()),
        };

        values
            .iter()
            .map(|value| {
                value
                    .as_i64()
                    .and_then(|id| Uuid::try_from(id).ok())
                    .ok_or_else(invalid)
            })
            .collect()
    }

    pub fn get_ingredient_entries(&self) -> Result<Vec<IngredientEntry>, ActionError> {
        let values = match self.inner.get("ingredients") {
            Some(Value::Array(values)) => values,
            Some(_) => return Err(ActionError::validation("ingredients must be a list")),
            None => return Err(ActionError::validation("no ingredients")),
        };

        values
            .iter()
            .map(|value| {
                serde_json::from_value::<IngredientEntry>(value.to_owned())
                    .map_err(|e| ActionError::Validation(format!("Invalid ingredient: {e}")))
            })
            .collect()
    }
}

impl TryFrom<&Form> for RecipeInput {
    type Error = ActionError;

    fn try_from(form: &Form) -> Result<Self, Self::Error> {
        Ok(Self {
            name: form.get_str("name")?,
            image: form.get_optional_str("image")?,
            text: form.get_str("text")?,
            cooking_time: form.get_number("cooking_time")?,
            tag_ids: form.get_tag_ids()?,
            ingredients: form.get_ingredient_entries()?,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

impl RecipeFilter {
    /// Builds a filter from raw query pairs. Unparseable flags are ignored.
    pub fn from_query(pairs: &[(String, String)]) -> Result<Self, ActionError> {
        let mut filter = Self::default();

        for (key, value) in pairs {
            match key.as_str() {
                "author" => {
                    let author = value
                        .trim()
                        .parse::<Uuid>()
                        .map_err(|_e| ActionError::validation("author must be an id"))?;
                    filter.author = Some(author);
                }
                "tags" => filter.tags.push(value.to_owned()),
                "name" if !value.trim().is_empty() => filter.name = Some(value.to_owned()),
                "is_favorited" => {
                    filter.is_favorited = parse_flag(value).unwrap_or(filter.is_favorited)
                }
                "is_in_shopping_cart" => {
                    filter.is_in_shopping_cart =
                        parse_flag(value).unwrap_or(filter.is_in_shopping_cart)
                }
                _ => {}
            }
        }

        Ok(filter)
    }
}
