use std::collections::BTreeMap;

use crate::{
    constants::{SHOPPING_LIST_CONTENT_TYPE, SHOPPING_LIST_FILENAME},
    schema::{ShoppingListDocument, ShoppingListEntry, ShoppingListLine},
};

/*
Shopping list document

One line per (ingredient, unit) group, ordered by ingredient name:

flour (g) — 200
sugar (g) — 50
*/

/// Sums line amounts per (name, unit). Ordering is by code point on name, then unit.
pub fn aggregate<I>(lines: I) -> Vec<ShoppingListEntry>
where
    I: IntoIterator<Item = ShoppingListLine>,
{
    let mut groups: BTreeMap<(String, String), i64> = BTreeMap::new();

    for line in lines {
        *groups
            .entry((line.ingredient_name, line.measurement_unit))
            .or_insert(0) += i64::from(line.amount);
    }

    groups
        .into_iter()
        .map(
            |((ingredient_name, measurement_unit), total_amount)| ShoppingListEntry {
                ingredient_name,
                measurement_unit,
                total_amount,
            },
        )
        .collect()
}

pub fn render_shopping_list(entries: &[ShoppingListEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            format!(
                "{} ({}) — {}\n",
                entry.ingredient_name, entry.measurement_unit, entry.total_amount
            )
        })
        .collect()
}

impl From<&[ShoppingListEntry]> for ShoppingListDocument {
    fn from(entries: &[ShoppingListEntry]) -> Self {
        Self {
            filename: SHOPPING_LIST_FILENAME.to_string(),
            content_type: SHOPPING_LIST_CONTENT_TYPE.to_string(),
            body: render_shopping_list(entries),
        }
    }
}
