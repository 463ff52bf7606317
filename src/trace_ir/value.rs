//! Field values ("data copy").

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    BitArray(u64),
    UnsignedInteger(u64),
    SignedInteger(i64),
    UnsignedEnumeration(u64),
    SignedEnumeration(i64),
    Real(f64),
    String(String),
    Structure(Vec<(String, FieldValue)>),
    StaticArray(Vec<FieldValue>),
    DynamicArray(Vec<FieldValue>),
    Option(Option<Box<FieldValue>>),
    /// `selected_index` is the chosen option's position, so the data
    /// copier can pick the structurally-identical option on the
    /// output side without re-deriving the tag ("variant
    /// selects the same option index and recurses").
    Variant {
        selected_index: usize,
        value: Box<FieldValue>,
    },
}

impl FieldValue {
    pub fn member(&self, name: &str) -> Option<&FieldValue> {
        match self {
            FieldValue::Structure(members) => members.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::UnsignedInteger(v) | FieldValue::UnsignedEnumeration(v) | FieldValue::BitArray(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::SignedInteger(v) | FieldValue::SignedEnumeration(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Reads a dynamic array of small unsigned integers as raw bytes,
    /// e.g. a `build_id` field declared as a dynamic array of `u8`.
    pub fn as_byte_array(&self) -> Option<Vec<u8>> {
        match self {
            FieldValue::DynamicArray(items) | FieldValue::StaticArray(items) => {
                items.iter().map(|v| v.as_u64().map(|n| n as u8)).collect()
            }
            _ => None,
        }
    }
}
