// Shared limits and naming conventions used across disk and query layers.

pub const MAX_PAGE_SIZE: usize = 1024 * 50;
pub const MAX_INDEX_SIZE: usize = 5024 * 100;
pub const SEARCH_THREAD_COUNT: usize = 10;

pub const DB_MAX_LENGTH: usize = 25;
pub const BLOB_MAX_LENGTH: usize = 25;
pub const KEY_MAX_LENGTH: usize = 45;

pub const NAME_REGEX: &str = "^[a-z_]*$";
pub const NAME_REGEX_DESC: &str = "snake case";

pub const ID_KEY: &str = "_id";

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
