//! Per-table metadata: identity, capacity, key and field descriptors, and
//! the slot layout computed from them.

use crate::collections::arena::SLOT_HEADER;
use crate::config::{MAX_FIELDS, MAX_FIELD_NAME_LEN, MAX_TABLE_NAME_LEN};
use crate::error::TableError;
use crate::value::{self, ValueKind};
use crate::Result;

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub kind: ValueKind,
    /// Byte offset inside the slot.
    pub offset: usize,
}

#[derive(Debug, Clone)]
pub struct Schema {
    id: u8,
    name: String,
    capacity: u32,
    key: Option<FieldDef>,
    fields: Vec<FieldDef>,
    slot_size: usize,
}

impl Schema {
    pub fn new(id: u8, name: &str, capacity: u32) -> Schema {
        Schema {
            id,
            name: value::truncate_str(name, MAX_TABLE_NAME_LEN).to_owned(),
            capacity,
            key: None,
            fields: Vec::new(),
            slot_size: SLOT_HEADER,
        }
    }

    /// Declare (or redeclare) the key. Overwrites any previous declaration
    /// and recomputes the slot layout.
    pub fn define_key(&mut self, name: &str, kind: ValueKind) -> Result<()> {
        kind.validate()?;
        self.key = Some(FieldDef {
            name: value::truncate_str(name, MAX_FIELD_NAME_LEN).to_owned(),
            kind,
            offset: 0,
        });
        self.relayout();
        Ok(())
    }

    /// Declare (or redeclare) the full ordered field list.
    pub fn define_fields(&mut self, defs: &[(&str, ValueKind)]) -> Result<()> {
        if defs.is_empty() || defs.len() > MAX_FIELDS {
            return Err(TableError::MaxFieldsInvalid);
        }
        for (_, kind) in defs {
            kind.validate()?;
        }
        self.fields = defs
            .iter()
            .map(|(name, kind)| FieldDef {
                name: value::truncate_str(name, MAX_FIELD_NAME_LEN).to_owned(),
                kind: *kind,
                offset: 0,
            })
            .collect();
        self.relayout();
        Ok(())
    }

    /// Key at the start of the payload, fields following in declaration
    /// order.
    fn relayout(&mut self) {
        let mut offset = SLOT_HEADER;
        if let Some(key) = self.key.as_mut() {
            key.offset = offset;
            offset += key.kind.size();
        }
        for field in self.fields.iter_mut() {
            field.offset = offset;
            offset += field.kind.size();
        }
        self.slot_size = offset;
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn key(&self) -> Option<&FieldDef> {
        self.key.as_ref()
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn slot_size(&self) -> usize {
        self.slot_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_follows_declaration_order() {
        let mut schema = Schema::new(1, "inventory", 100);
        schema
            .define_key("code", ValueKind::String(13))
            .expect("key");
        schema
            .define_fields(&[
                ("size", ValueKind::String(24)),
                ("count", ValueKind::UInt32),
                ("seen", ValueKind::Timestamp),
            ])
            .expect("fields");

        let key = schema.key().expect("declared");
        assert_eq!(key.offset, SLOT_HEADER);
        assert_eq!(schema.fields()[0].offset, SLOT_HEADER + 14);
        assert_eq!(schema.fields()[1].offset, SLOT_HEADER + 14 + 25);
        assert_eq!(schema.fields()[2].offset, SLOT_HEADER + 14 + 25 + 4);
        assert_eq!(schema.slot_size(), SLOT_HEADER + 14 + 25 + 4 + 8);
    }

    #[test]
    fn redeclaration_recomputes_offsets() {
        let mut schema = Schema::new(2, "t", 10);
        schema.define_key("k", ValueKind::String(8)).expect("key");
        schema
            .define_fields(&[("v", ValueKind::UInt32)])
            .expect("fields");
        assert_eq!(schema.fields()[0].offset, SLOT_HEADER + 9);

        // a narrower key shifts every field
        schema.define_key("k", ValueKind::UInt32).expect("key");
        schema
            .define_fields(&[("v", ValueKind::UInt32)])
            .expect("fields");
        assert_eq!(schema.fields()[0].offset, SLOT_HEADER + 4);
        assert_eq!(schema.slot_size(), SLOT_HEADER + 8);
    }

    #[test]
    fn bounds_are_enforced() {
        let mut schema = Schema::new(3, "bounds", 10);
        assert_eq!(
            schema.define_key("k", ValueKind::String(65)).unwrap_err(),
            TableError::FieldTooLong
        );
        assert_eq!(
            schema.define_fields(&[]).unwrap_err(),
            TableError::MaxFieldsInvalid
        );
        let too_many: Vec<(&str, ValueKind)> =
            (0..17).map(|_| ("f", ValueKind::Byte)).collect();
        assert_eq!(
            schema.define_fields(&too_many).unwrap_err(),
            TableError::MaxFieldsInvalid
        );
    }

    #[test]
    fn names_are_truncated() {
        let schema = Schema::new(4, "a-table-name-well-beyond-the-thirty-two-limit", 1);
        assert_eq!(schema.name().len(), MAX_TABLE_NAME_LEN);

        let mut schema = Schema::new(5, "t", 1);
        schema
            .define_key("a-key-name-beyond-sixteen", ValueKind::UInt32)
            .expect("key");
        assert_eq!(schema.key().expect("declared").name.len(), MAX_FIELD_NAME_LEN);
    }
}
