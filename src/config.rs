//! Library-wide limits.

/// Maximum number of tables that may be defined at the same time.
pub const MAX_TABLES: usize = 32;

/// Maximum number of fields per table, the key excluded.
pub const MAX_FIELDS: usize = 16;

/// Maximum number of elements a single table may declare.
pub const MAX_CAPACITY: u32 = 1 << 26;

/// Table display names longer than this are truncated.
pub const MAX_TABLE_NAME_LEN: usize = 32;

/// Key and field display names longer than this are truncated.
pub const MAX_FIELD_NAME_LEN: usize = 16;

/// Bounds for the declared length of `String` keys and fields.
pub const MIN_STRING_LEN: u8 = 1;
pub const MAX_STRING_LEN: u8 = 64;

/// Maximum accepted length of one CSV line, newline included.
pub const MAX_CSV_LINE_LEN: usize = 1200;

/// Arena index sentinel denoting "none".
pub const NIL: u32 = u32::MAX;
