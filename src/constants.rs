pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const MIN_AMOUNT: i32 = 1;
pub const MAX_AMOUNT: i32 = 10000;
pub const MIN_COOKING_TIME: i32 = 1;
pub const MAX_COOKING_TIME: i32 = 10000;

pub const SESSION_LIFETIME_HOURS: i64 = 24;
pub const DATABASE_MAX_CONNECTIONS: u32 = 5;

pub const USERNAME_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 50;
pub const PERSON_NAME_MAX_LENGTH: usize = 150;
pub const RECIPE_NAME_MAX_LENGTH: usize = 200;
pub const INGREDIENT_NAME_MAX_LENGTH: usize = 200;
pub const MEASUREMENT_UNIT_MAX_LENGTH: usize = 30;
pub const TAG_NAME_MAX_LENGTH: usize = 200;
pub const TAG_SLUG_MAX_LENGTH: usize = 200;

pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";
pub const SHOPPING_LIST_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
