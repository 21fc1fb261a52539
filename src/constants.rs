//! Shared literals: the timestamp marker, header labels and derived column names.

/// Prefix of the capture timestamp embedded in resolved photo URLs
/// (`saved-YYYYMMDD_HHMMSS`).
pub const TIMESTAMP_MARKER: &str = "saved-";

// Header labels recognised by the exact-match detection pass (compared lowercased)
pub const BEFORE_COLUMN_LABEL: &str = "фото до";
pub const AFTER_COLUMN_LABEL: &str = "фото после";
pub const BEFORE_COLUMN_LABEL_EN: &str = "photo before";
pub const AFTER_COLUMN_LABEL_EN: &str = "photo after";

// Derived columns appended to every processed table
pub const BEFORE_TIMESTAMP_COLUMN: &str = "Дата_время_до";
pub const AFTER_TIMESTAMP_COLUMN: &str = "Дата_время_после";
pub const INTERVAL_LABEL_COLUMN: &str = "Интервал_мин";
pub const RAW_MINUTES_COLUMN: &str = "interval_minutes_raw";

// Interval label pieces
pub const MINUTES_UNIT: &str = "мин";
pub const HOURS_UNIT: &str = "ч";
pub const INTERVAL_ERROR_LABEL: &str = "ошибка";

pub const TIMESTAMP_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 15;
pub const DEFAULT_MAX_REDIRECTS: usize = 10;
pub const DEFAULT_PREVIEW_ROWS: usize = 15;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

pub const EXPORT_FILE_SUFFIX: &str = "_обработанный";

/// Get the default header labels for the before/after columns
pub fn default_before_labels() -> Vec<String> {
    vec![BEFORE_COLUMN_LABEL.to_string(), BEFORE_COLUMN_LABEL_EN.to_string()]
}

pub fn default_after_labels() -> Vec<String> {
    vec![AFTER_COLUMN_LABEL.to_string(), AFTER_COLUMN_LABEL_EN.to_string()]
}
