//! Row codec: the one place that maps a `ValueKind` to its byte pattern
//! inside a slot, plus the delimited-line parse and format used by CSV
//! import/export.

use crate::error::TableError;
use crate::schema::{FieldDef, Schema};
use crate::value::{self, Value, ValueKind};
use crate::Result;
use std::cmp::Ordering;

/// Write one value at its descriptor's offset. Strings are truncated to
/// the declared bound and the region is zero-filled, so stored strings are
/// always terminated.
pub fn write_value(row: &mut [u8], def: &FieldDef, val: &Value) {
    let region = &mut row[def.offset..def.offset + def.kind.size()];
    match (def.kind, val) {
        (ValueKind::UInt32, Value::UInt32(v)) => region.copy_from_slice(&v.to_le_bytes()),
        (ValueKind::Int32, Value::Int32(v)) => region.copy_from_slice(&v.to_le_bytes()),
        (ValueKind::Float64, Value::Float64(v)) => region.copy_from_slice(&v.to_le_bytes()),
        (ValueKind::Byte, Value::Byte(v)) => region[0] = *v,
        (ValueKind::String(max), Value::Str(s)) => {
            let text = value::truncate_str(s, max as usize);
            for byte in region.iter_mut() {
                *byte = 0;
            }
            region[..text.len()].copy_from_slice(text.as_bytes());
        }
        (ValueKind::Timestamp, Value::Timestamp(v)) => region.copy_from_slice(&v.to_le_bytes()),
        _ => debug_assert!(false, "value does not match the descriptor kind"),
    }
}

pub fn read_value(row: &[u8], def: &FieldDef) -> Value {
    let region = &row[def.offset..def.offset + def.kind.size()];
    match def.kind {
        ValueKind::UInt32 => Value::UInt32(u32::from_le_bytes(bytes4(region))),
        ValueKind::Int32 => Value::Int32(i32::from_le_bytes(bytes4(region))),
        ValueKind::Float64 => Value::Float64(f64::from_le_bytes(bytes8(region))),
        ValueKind::Byte => Value::Byte(region[0]),
        ValueKind::String(_) => {
            Value::Str(String::from_utf8_lossy(stored_str(region)).into_owned())
        }
        ValueKind::Timestamp => Value::Timestamp(i64::from_le_bytes(bytes8(region))),
    }
}

/// Order of the probe relative to the row's key. String probes are
/// truncated to the declared bound before comparing, the same way they
/// would be before storage.
pub fn compare_key(schema: &Schema, row: &[u8], probe: &Value) -> Ordering {
    let key = schema.key().expect("key declared before any lookup");
    match (key.kind, probe) {
        (ValueKind::String(max), Value::Str(s)) => {
            let region = &row[key.offset..key.offset + key.kind.size()];
            value::truncate_str(s, max as usize)
                .as_bytes()
                .cmp(stored_str(region))
        }
        _ => value::cmp(probe, &read_value(row, key)),
    }
}

/// Write a full row: the key, then every field in declaration order.
pub fn write_row(schema: &Schema, row: &mut [u8], key: &Value, fields: &[Value]) {
    debug_assert_eq!(fields.len(), schema.fields().len());
    write_value(row, schema.key().expect("key declared"), key);
    for (def, val) in schema.fields().iter().zip(fields) {
        write_value(row, def, val);
    }
}

/// Apply explicit `(field_index, value)` updates, walking the fields in
/// declaration order and writing those present in the set.
pub fn apply_updates(schema: &Schema, row: &mut [u8], updates: &[(usize, Value)]) {
    for (index, def) in schema.fields().iter().enumerate() {
        if let Some((_, val)) = updates.iter().find(|(i, _)| *i == index) {
            write_value(row, def, val);
        }
    }
}

/// Split one CSV line into a key and field values.
///
/// Returns `None` for blank lines and `#` comments (after stripping
/// leading spaces and tabs). A line with fewer fields than the schema is an
/// error; extra fields are ignored.
pub fn parse_line(schema: &Schema, line: &[u8], sep: u8) -> Result<Option<(Value, Vec<Value>)>> {
    let mut line = line;
    while let Some((&last, rest)) = line.split_last() {
        if last == b'\n' || last == b'\r' {
            line = rest;
        } else {
            break;
        }
    }
    let mut start = 0;
    while start < line.len() && (line[start] == b' ' || line[start] == b'\t') {
        start += 1;
    }
    let line = &line[start..];
    if line.is_empty() || line[0] == b'#' {
        return Ok(None);
    }

    let key_def = schema.key().ok_or(TableError::Generic)?;
    let mut tokens = line.split(|&byte| byte == sep);
    let key = value::parse_token(key_def.kind, tokens.next().unwrap_or(&[]));
    let mut fields = Vec::with_capacity(schema.fields().len());
    for def in schema.fields() {
        let token = tokens.next().ok_or(TableError::Generic)?;
        fields.push(value::parse_token(def.kind, token));
    }
    Ok(Some((key, fields)))
}

/// Append the row as one CSV line: key, then separator and field for each
/// field, then a newline.
pub fn format_line(schema: &Schema, row: &[u8], sep: u8, out: &mut Vec<u8>) {
    let key_def = schema.key().expect("key declared");
    value::format_into(&read_value(row, key_def), out);
    for def in schema.fields() {
        out.push(sep);
        value::format_into(&read_value(row, def), out);
    }
    out.push(b'\n');
}

/// Stored string bytes up to the terminator.
fn stored_str(region: &[u8]) -> &[u8] {
    let end = region.iter().position(|&byte| byte == 0).unwrap_or(region.len());
    &region[..end]
}

fn bytes4(region: &[u8]) -> [u8; 4] {
    let mut raw = [0u8; 4];
    raw.clone_from_slice(&region[..4]);
    raw
}

fn bytes8(region: &[u8]) -> [u8; 8] {
    let mut raw = [0u8; 8];
    raw.clone_from_slice(&region[..8]);
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> Schema {
        let mut schema = Schema::new(9, "codec", 4);
        schema.define_key("word", ValueKind::String(8)).expect("key");
        schema
            .define_fields(&[
                ("count", ValueKind::UInt32),
                ("delta", ValueKind::Int32),
                ("ratio", ValueKind::Float64),
                ("tag", ValueKind::Byte),
                ("seen", ValueKind::Timestamp),
            ])
            .expect("fields");
        schema
    }

    fn blank_row(schema: &Schema) -> Vec<u8> {
        vec![0; schema.slot_size()]
    }

    #[test]
    fn row_round_trip() {
        let schema = sample_schema();
        let mut row = blank_row(&schema);
        let fields = vec![
            Value::UInt32(7),
            Value::Int32(-3),
            Value::Float64(0.5),
            Value::Byte(b'x'),
            Value::Timestamp(1_624_288_135),
        ];
        write_row(&schema, &mut row, &Value::Str("hello".into()), &fields);

        let key = schema.key().expect("declared");
        assert_eq!(read_value(&row, key), Value::Str("hello".into()));
        for (def, val) in schema.fields().iter().zip(&fields) {
            assert_eq!(&read_value(&row, def), val);
        }
    }

    #[test]
    fn string_overflow_is_truncated_and_terminated() {
        let schema = sample_schema();
        let mut row = blank_row(&schema);
        let key = schema.key().expect("declared");
        write_value(&mut row, key, &Value::Str("overlong-word".into()));
        assert_eq!(read_value(&row, key), Value::Str("overlong".into()));

        // shorter rewrites do not leak previous bytes
        write_value(&mut row, key, &Value::Str("ab".into()));
        assert_eq!(read_value(&row, key), Value::Str("ab".into()));
    }

    #[test]
    fn probe_comparison_truncates_like_storage() {
        let schema = sample_schema();
        let mut row = blank_row(&schema);
        write_value(
            &mut row,
            schema.key().expect("declared"),
            &Value::Str("overlong".into()),
        );
        // the probe exceeds the bound but equals the stored prefix
        assert_eq!(
            compare_key(&schema, &row, &Value::Str("overlong-word".into())),
            Ordering::Equal
        );
        assert_eq!(
            compare_key(&schema, &row, &Value::Str("overlonf".into())),
            Ordering::Less
        );
    }

    #[test]
    fn masked_updates_touch_only_named_fields() {
        let schema = sample_schema();
        let mut row = blank_row(&schema);
        let fields = vec![
            Value::UInt32(1),
            Value::Int32(2),
            Value::Float64(3.0),
            Value::Byte(4),
            Value::Timestamp(5),
        ];
        write_row(&schema, &mut row, &Value::Str("w".into()), &fields);
        apply_updates(
            &schema,
            &mut row,
            &[(0, Value::UInt32(100)), (4, Value::Timestamp(50))],
        );
        assert_eq!(read_value(&row, &schema.fields()[0]), Value::UInt32(100));
        assert_eq!(read_value(&row, &schema.fields()[1]), Value::Int32(2));
        assert_eq!(read_value(&row, &schema.fields()[4]), Value::Timestamp(50));
    }

    #[test]
    fn line_parse_skips_comments_and_blanks() {
        // timestamp fields go through the process-wide format
        let _serial = crate::timefmt::exclusive();
        let schema = sample_schema();
        assert!(parse_line(&schema, b"\n", b',').expect("blank").is_none());
        assert!(parse_line(&schema, b"   \t # note\n", b',')
            .expect("comment")
            .is_none());
        assert!(parse_line(&schema, b"", b',').expect("eof line").is_none());

        let (key, fields) = parse_line(&schema, b"  word,3,-1,2.5,z,77\n", b',')
            .expect("valid line")
            .expect("data row");
        assert_eq!(key, Value::Str("word".into()));
        assert_eq!(fields[0], Value::UInt32(3));
        assert_eq!(fields[1], Value::Int32(-1));
        assert_eq!(fields[2], Value::Float64(2.5));
        assert_eq!(fields[3], Value::Byte(b'z'));
        assert_eq!(fields[4], Value::Timestamp(77));
    }

    #[test]
    fn short_lines_are_rejected() {
        let schema = sample_schema();
        assert_eq!(
            parse_line(&schema, b"word,3,-1\n", b',').unwrap_err(),
            TableError::Generic
        );
    }

    #[test]
    fn line_format_matches_parse() {
        let _serial = crate::timefmt::exclusive();
        let schema = sample_schema();
        let mut row = blank_row(&schema);
        let fields = vec![
            Value::UInt32(3),
            Value::Int32(-1),
            Value::Float64(2.5),
            Value::Byte(b'z'),
            Value::Timestamp(77),
        ];
        write_row(&schema, &mut row, &Value::Str("word".into()), &fields);
        let mut out = Vec::new();
        format_line(&schema, &row, b';', &mut out);
        assert_eq!(out, b"word;3;-1;2.500000;z;77\n");
    }
}
