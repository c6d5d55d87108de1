//! Process-wide timestamp format.
//!
//! Tables store timestamps as raw seconds since the epoch; the format
//! configured here governs only the textual boundary (CSV fields and the
//! encode/decode helpers). The empty format selects raw decimal seconds.

use arc_swap::ArcSwapOption;
use chrono::format::strftime::StrftimeItems;
use chrono::format::{parse, Item, Parsed};
use chrono::{Local, LocalResult, TimeZone};
use std::sync::Arc;

use crate::error::TableError;
use crate::Result;

static TIME_FORMAT: ArcSwapOption<String> = ArcSwapOption::const_empty();

/// Install a new process-wide format. The empty string selects raw decimal
/// seconds. A non-empty format is accepted only when formatting the current
/// time and parsing it back succeeds; a rejected format leaves the previous
/// one in place.
pub fn define_time_format(format: &str) -> Result<()> {
    if format.is_empty() {
        TIME_FORMAT.store(None);
        return Ok(());
    }
    let now = Local::now().timestamp();
    let rendered = format_with(format, now).ok_or(TableError::Generic)?;
    if parse_with(format, &rendered).is_none() {
        return Err(TableError::Generic);
    }
    TIME_FORMAT.store(Some(Arc::new(format.to_owned())));
    Ok(())
}

/// Text to raw seconds under the active format; 0 when the text does not
/// parse.
pub fn encode_timestamp(text: &str) -> i64 {
    match TIME_FORMAT.load_full() {
        None => text.trim().parse().unwrap_or(0),
        Some(format) => parse_with(&format, text).unwrap_or(0),
    }
}

/// Raw seconds to text under the active format.
pub fn decode_timestamp(seconds: i64) -> String {
    match TIME_FORMAT.load_full() {
        None => seconds.to_string(),
        Some(format) => {
            format_with(&format, seconds).unwrap_or_else(|| seconds.to_string())
        }
    }
}

/// Serializes tests that touch the process-wide format.
#[cfg(test)]
pub(crate) fn exclusive() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn items(format: &str) -> Option<Vec<Item<'_>>> {
    let items: Vec<Item> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        None
    } else {
        Some(items)
    }
}

fn format_with(format: &str, seconds: i64) -> Option<String> {
    let items = items(format)?;
    let time = match Local.timestamp_opt(seconds, 0) {
        LocalResult::Single(time) => time,
        _ => return None,
    };
    Some(time.format_with_items(items.into_iter()).to_string())
}

fn parse_with(format: &str, text: &str) -> Option<i64> {
    let items = items(format)?;
    let mut parsed = Parsed::new();
    parse(&mut parsed, text, items.into_iter()).ok()?;
    parsed
        .to_datetime_with_timezone(&Local)
        .ok()
        .map(|time| time.timestamp())
}
