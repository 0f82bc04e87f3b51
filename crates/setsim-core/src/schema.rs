//! Logical schema types. Pure data; no Arrow dependency here.
//!
//! Column buffers live in `types.rs`; a `Schema` is what the planner can know
//! about a table before any buffer exists.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int64,
    UInt64,
    Float64,
    Utf8,
    /// Variable-length list of the inner type (offsets + flat values).
    List(Box<DataType>),
}

impl DataType {
    /// The only list type the kernels accept.
    pub fn list_i64() -> Self {
        DataType::List(Box::new(DataType::Int64))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int64 | DataType::UInt64 | DataType::Float64)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, DataType::List(_))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => write!(f, "bool"),
            DataType::Int64 => write!(f, "i64"),
            DataType::UInt64 => write!(f, "u64"),
            DataType::Float64 => write!(f, "f64"),
            DataType::Utf8 => write!(f, "str"),
            DataType::List(inner) => write!(f, "list[{inner}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn field(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
