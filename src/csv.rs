//! Line-oriented CSV import and export layered over the table controller.
//!
//! Fields are separated by a single caller-chosen byte and never quoted;
//! lines whose first non-blank byte is `#` are comments. The caller owns
//! the streams: nothing here opens or closes anything.

use crate::codec;
use crate::collections::arena::Arena;
use crate::config::{MAX_CSV_LINE_LEN, NIL};
use crate::error::TableError;
use crate::tables::{Direction, TableCore};
use crate::value::Value;
use crate::Result;
use std::cmp::Ordering;
use std::io::{BufRead, Write};

/// Read rows from `reader` into the locked table. Duplicate keys overwrite
/// every field. `lines_read` counts each consumed line (comments and
/// blanks included); on error it names the offending line, and rows
/// inserted before it remain.
pub(crate) fn import_into<R: BufRead>(
    core: &mut TableCore,
    mut reader: R,
    sep: u8,
    lines_read: &mut u32,
) -> Result<()> {
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        *lines_read += 1;
        if line.len() > MAX_CSV_LINE_LEN {
            return Err(TableError::Generic);
        }
        let (key, fields) = match codec::parse_line(&core.schema, &line, sep)? {
            Some(row) => row,
            None => continue,
        };
        core.ensure_arena()?;
        let descent = core.find(&key).expect("arena allocated");
        match descent.found {
            Some(node) => {
                let arena = core.arena.as_mut().expect("arena allocated");
                codec::write_row(&core.schema, arena.slot_mut(node), &key, &fields);
            }
            None => core.insert(&descent, &key, &fields)?,
        }
    }
    debug!(
        "table {}: imported {} lines, {} rows stored",
        core.schema.id(),
        *lines_read,
        core.count
    );
    Ok(())
}

/// Write the header comment lines and the rows of the locked table, all of
/// them or only those with keys in `range`, in the chosen direction.
pub(crate) fn export_table<W: Write>(
    core: &TableCore,
    mut writer: W,
    sep: u8,
    direction: Direction,
    range: Option<(&Value, &Value)>,
) -> Result<()> {
    let mut buf = Vec::new();
    buf.extend_from_slice(
        format!("#Table: {} (Id: {})\n", core.schema.name(), core.schema.id()).as_bytes(),
    );
    buf.push(b'#');
    if let Some(key) = core.schema.key() {
        buf.extend_from_slice(key.name.as_bytes());
    }
    for field in core.schema.fields() {
        buf.push(sep);
        buf.extend_from_slice(field.name.as_bytes());
    }
    buf.push(b'\n');
    writer.write_all(&buf)?;

    if let Some(arena) = core.arena.as_ref() {
        export_subtree(core, arena, core.root, &mut writer, sep, direction, range, &mut buf)?;
    }
    Ok(())
}

/// In-order (or reverse in-order) emission of a subtree, pruning subtrees
/// whose root lies strictly outside the range.
fn export_subtree<W: Write>(
    core: &TableCore,
    arena: &Arena,
    node: u32,
    writer: &mut W,
    sep: u8,
    direction: Direction,
    range: Option<(&Value, &Value)>,
    buf: &mut Vec<u8>,
) -> Result<()> {
    if node == NIL {
        return Ok(());
    }
    let row = arena.slot(node);
    if let Some((min, max)) = range {
        if codec::compare_key(&core.schema, row, min) == Ordering::Greater {
            // key below the range: only the right subtree can intersect
            let right = arena.right(node);
            return export_subtree(core, arena, right, writer, sep, direction, range, buf);
        }
        if codec::compare_key(&core.schema, row, max) == Ordering::Less {
            // key above the range: only the left subtree can intersect
            let left = arena.left(node);
            return export_subtree(core, arena, left, writer, sep, direction, range, buf);
        }
    }
    let (first, second) = match direction {
        Direction::Ascending => (arena.left(node), arena.right(node)),
        Direction::Descending => (arena.right(node), arena.left(node)),
    };
    export_subtree(core, arena, first, writer, sep, direction, range, buf)?;
    buf.clear();
    codec::format_line(&core.schema, row, sep, buf);
    writer.write_all(buf)?;
    export_subtree(core, arena, second, writer, sep, direction, range, buf)
}
