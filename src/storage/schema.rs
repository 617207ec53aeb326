use std::fmt::Debug;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Type {
    Bool,
    Int64,
    Float64,
    Bytes(u8),
}

impl Type {
    /// Get the size of the type in bytes.
    pub fn size(&self) -> usize {
        match self {
            Type::Bool => 1,
            Type::Int64 | Type::Float64 => 8,
            Type::Bytes(size) => {
                // The first byte is the length of the payload, the
                // rest is the payload itself (fixed capacity).
                1 + *size as usize
            }
        }
    }
}

#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct FieldItem {
    pub field_name: String,
    pub field_type: Type,
}

impl FieldItem {
    pub fn new(field_name: &str, field_type: Type) -> FieldItem {
        FieldItem {
            field_type,
            field_name: field_name.to_string(),
        }
    }
}

#[derive(PartialEq, Eq, Hash, Debug, Clone, Default)]
pub struct Schema {
    pub fields: Vec<FieldItem>,
}

impl Schema {
    pub fn new(fields: Vec<FieldItem>) -> Schema {
        Schema { fields }
    }

    /// Get tuple size in bytes.
    pub fn get_size(&self) -> usize {
        self.fields.iter().map(|f| f.field_type.size()).sum()
    }

    pub fn get_field_type(&self, field_index: usize) -> Type {
        self.fields[field_index].field_type
    }
}

pub fn small_int_schema(width: usize, name_prefix: &str) -> Schema {
    let mut fields: Vec<FieldItem> = Vec::new();
    for i in 0..width {
        let field = FieldItem {
            field_name: format!("{}-{}", name_prefix, i),
            field_type: Type::Int64,
        };
        fields.push(field);
    }

    Schema { fields }
}
