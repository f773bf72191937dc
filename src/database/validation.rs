use std::collections::{BTreeSet, HashMap, HashSet};

use crate::{
    constants::{
        EMAIL_MAX_LENGTH, MAX_AMOUNT, MAX_COOKING_TIME, MIN_AMOUNT, MIN_COOKING_TIME,
        PERSON_NAME_MAX_LENGTH, RECIPE_NAME_MAX_LENGTH, TAG_SLUG_MAX_LENGTH, USERNAME_MAX_LENGTH,
    },
    error::ActionError,
    schema::{Ingredient, IngredientEntry, NewUser, RecipeInput, Tag, Uuid},
};

/// Inclusive range an integer field must fall into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub min: i32,
    pub max: i32,
}

impl Bounds {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn check(&self, field: &str, value: i64) -> Result<i32, ActionError> {
        if value < self.min as i64 {
            return Err(ActionError::Validation(format!(
                "{field} must be ≥ {}",
                self.min
            )));
        }
        if value > self.max as i64 {
            return Err(ActionError::Validation(format!(
                "{field} must be ≤ {}",
                self.max
            )));
        }
        Ok(value as i32)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecipeRules {
    pub amount: Bounds,
    pub cooking_time: Bounds,
}

impl Default for RecipeRules {
    fn default() -> Self {
        Self {
            amount: Bounds::new(MIN_AMOUNT, MAX_AMOUNT),
            cooking_time: Bounds::new(MIN_COOKING_TIME, MAX_COOKING_TIME),
        }
    }
}

/// An ingredient entry once its ingredient has been resolved from the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeLine {
    pub ingredient: Ingredient,
    pub amount: i32,
}

pub fn check_amount(amount: i64, bounds: Bounds) -> Result<i32, ActionError> {
    bounds.check("amount", amount)
}

pub fn check_cooking_time(cooking_time: i64, bounds: Bounds) -> Result<i32, ActionError> {
    bounds.check("cooking_time", cooking_time)
}

pub fn check_text(field: &str, value: &str, max_length: usize) -> Result<(), ActionError> {
    if value.trim().is_empty() {
        return Err(ActionError::Validation(format!("{field} must not be empty")));
    }
    if value.chars().count() > max_length {
        return Err(ActionError::Validation(format!(
            "{field} must be at most {max_length} characters"
        )));
    }
    Ok(())
}

/// Everything about a recipe payload that can be checked without the catalog.
pub fn check_recipe_input(input: &RecipeInput, rules: &RecipeRules) -> Result<(), ActionError> {
    check_text("name", &input.name, RECIPE_NAME_MAX_LENGTH)?;
    if input.text.trim().is_empty() {
        return Err(ActionError::validation("text must not be empty"));
    }
    check_cooking_time(input.cooking_time, rules.cooking_time)?;

    if input.tag_ids.is_empty() {
        return Err(ActionError::validation("tags missing/invalid"));
    }
    if input.ingredients.is_empty() {
        return Err(ActionError::validation("no ingredients"));
    }
    for entry in &input.ingredients {
        check_amount(entry.amount, rules.amount)?;
    }

    Ok(())
}

/// Distinct ingredient ids in payload order, used to load the catalog rows.
pub fn ingredient_ids(entries: &[IngredientEntry]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .map(|entry| entry.ingredient_id)
        .filter(|id| seen.insert(*id))
        .collect()
}

pub fn tag_ids(ids: &[Uuid]) -> Vec<Uuid> {
    ids.iter()
        .copied()
        .collect::<BTreeSet<Uuid>>()
        .into_iter()
        .collect()
}

/// Pairs every entry with its catalog ingredient, rejecting unknown and repeated ingredients.
pub fn assemble_lines(
    entries: &[IngredientEntry],
    catalog: &[Ingredient],
    rules: &RecipeRules,
) -> Result<Vec<RecipeLine>, ActionError> {
    if entries.is_empty() {
        return Err(ActionError::validation("no ingredients"));
    }

    let catalog: HashMap<Uuid, &Ingredient> = catalog.iter().map(|i| (i.id, i)).collect();
    let mut seen: HashSet<Uuid> = HashSet::new();
    let mut lines = Vec::with_capacity(entries.len());

    for entry in entries {
        let ingredient = catalog.get(&entry.ingredient_id).ok_or_else(|| {
            ActionError::NotFound(format!(
                "Ingredient {} doesn't exist",
                entry.ingredient_id
            ))
        })?;

        if !seen.insert(entry.ingredient_id) {
            return Err(ActionError::Validation(format!(
                "duplicate ingredient: {}",
                ingredient.name
            )));
        }

        lines.push(RecipeLine {
            ingredient: (*ingredient).clone(),
            amount: check_amount(entry.amount, rules.amount)?,
        });
    }

    Ok(lines)
}

/// Every requested tag must exist; the result is the deduplicated tag set.
pub fn check_tags(requested: &[Uuid], resolved: Vec<Tag>) -> Result<Vec<Tag>, ActionError> {
    let wanted = tag_ids(requested);
    if wanted.is_empty() || resolved.is_empty() {
        return Err(ActionError::validation("tags missing/invalid"));
    }

    let found: HashSet<Uuid> = resolved.iter().map(|tag| tag.id).collect();
    if wanted.iter().any(|id| !found.contains(id)) {
        return Err(ActionError::validation("tags missing/invalid"));
    }

    let mut tags: Vec<Tag> = resolved
        .into_iter()
        .filter(|tag| wanted.contains(&tag.id))
        .collect();
    tags.sort_by_key(|tag| tag.id);
    tags.dedup_by_key(|tag| tag.id);

    Ok(tags)
}

pub fn check_slug(slug: &str) -> Result<(), ActionError> {
    check_text("slug", slug, TAG_SLUG_MAX_LENGTH)?;
    if !slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ActionError::validation("slug contains an invalid character"));
    }
    Ok(())
}

/// Accepts `#RGB` and `#RRGGBB` and returns the lowercase form.
pub fn normalize_color(color: &str) -> Result<String, ActionError> {
    let hex = color
        .strip_prefix('#')
        .ok_or_else(|| ActionError::validation("color must be a hex code"))?;

    if !(hex.len() == 3 || hex.len() == 6) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ActionError::validation("color must be a hex code"));
    }

    Ok(format!("#{}", hex.to_ascii_lowercase()))
}

pub fn check_new_user(user: &NewUser) -> Result<(), ActionError> {
    check_text("username", &user.username, USERNAME_MAX_LENGTH)?;
    if !user
        .username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'))
    {
        return Err(ActionError::validation("username contains an invalid character"));
    }

    check_text("email", &user.email, EMAIL_MAX_LENGTH)?;
    match user.email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
        _ => return Err(ActionError::validation("email is invalid")),
    }

    check_text("first_name", &user.first_name, PERSON_NAME_MAX_LENGTH)?;
    check_text("last_name", &user.last_name, PERSON_NAME_MAX_LENGTH)?;

    if user.password.is_empty() {
        return Err(ActionError::validation("password must not be empty"));
    }

    Ok(())
}
