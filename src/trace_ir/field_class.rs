//! The recursive field-class algebra.
//!
//! Upstream babeltrace field classes are individually reference-counted
//! objects so that a selector elsewhere in the tree can hold an
//! independent handle to one. Here the whole tree is owned structurally
//! (`Box`/`Vec`) — Rust's ownership already gives correct teardown
//! order for a tree, so there's no need for a flat field-class map for
//! bookkeeping purposes (see DESIGN.md). Selectors instead carry a
//! [`FieldPath`] that's re-resolved against whatever scope is in the
//! process of being built (see `resolving_context.rs`), replacing
//! runtime type tags with an exhaustive match over a tagged enum.

use std::ops::RangeInclusive;
use std::rc::Rc;

/// A minimal, JSON-like value used for "user attributes" attached to
/// nearly every trace-IR object. Trace-class-level
/// attributes are explicitly a "shared frozen value" in the upstream
/// model; `Rc` gives the same semantics everywhere, which is a safe
/// superset for the other, non-shared occurrences.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Real(f64),
    Str(String),
    Array(Vec<AttrValue>),
    Map(Vec<(String, AttrValue)>),
}

pub type UserAttributes = Option<Rc<AttrValue>>;

pub fn copy_user_attributes(attrs: &UserAttributes) -> UserAttributes {
    attrs.as_ref().map(Rc::clone)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayBase {
    Binary,
    Octal,
    Decimal,
    Hexadecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IntegerRangeSet {
    Unsigned(Vec<RangeInclusive<u64>>),
    Signed(Vec<RangeInclusive<i64>>),
}

/// Which scope a [`FieldPath`] is rooted at.
/// `Current` means "the structure presently being built",
/// i.e. a backward reference to an earlier sibling — the common case
/// for a dynamic array's length field or a variant's tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Current,
    PacketContext,
    EventCommonContext,
    EventSpecificContext,
    EventPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldPath {
    pub root: Scope,
    /// Structure-member / variant-option indices to descend, in
    /// order, from `root`.
    pub indices: Vec<usize>,
}

impl FieldPath {
    pub fn new(root: Scope, indices: Vec<usize>) -> Self {
        Self { root, indices }
    }
}

#[derive(Debug, Clone)]
pub struct StructureMember {
    pub name: String,
    pub field_class: FieldClass,
    pub user_attributes: UserAttributes,
}

#[derive(Debug, Clone)]
pub struct VariantOption {
    pub name: String,
    pub field_class: FieldClass,
    pub ranges: Option<IntegerRangeSet>,
    pub user_attributes: UserAttributes,
}

#[derive(Debug, Clone)]
pub enum FieldClass {
    Bool,
    BitArray {
        length: u32,
    },
    UnsignedInteger {
        field_value_range: u32,
        base: DisplayBase,
    },
    SignedInteger {
        field_value_range: u32,
        base: DisplayBase,
    },
    UnsignedEnumeration {
        field_value_range: u32,
        base: DisplayBase,
        mappings: Vec<(String, Vec<RangeInclusive<u64>>)>,
    },
    SignedEnumeration {
        field_value_range: u32,
        base: DisplayBase,
        mappings: Vec<(String, Vec<RangeInclusive<i64>>)>,
    },
    Real {
        single_precision: bool,
    },
    String,
    Structure {
        members: Vec<StructureMember>,
    },
    StaticArray {
        element: Box<FieldClass>,
        length: u64,
    },
    DynamicArray {
        element: Box<FieldClass>,
        length_field_path: Option<FieldPath>,
    },
    OptionWithoutSelector {
        content: Box<FieldClass>,
    },
    OptionWithBoolSelector {
        content: Box<FieldClass>,
        selector_field_path: FieldPath,
        selector_is_reversed: bool,
    },
    OptionWithIntegerSelector {
        content: Box<FieldClass>,
        selector_field_path: FieldPath,
        ranges: IntegerRangeSet,
    },
    VariantWithoutSelector {
        options: Vec<VariantOption>,
    },
    VariantWithIntegerSelector {
        options: Vec<VariantOption>,
        selector_field_path: FieldPath,
        selector_is_signed: bool,
    },
}

impl FieldClass {
    /// Structure-member lookup by name, used by the data copier and
    /// by the augmentation precondition check.
    pub fn struct_member(&self, name: &str) -> Option<&StructureMember> {
        match self {
            FieldClass::Structure { members } => members.iter().find(|m| m.name == name),
            _ => None,
        }
    }

    pub fn is_unsigned_integer(&self) -> bool {
        matches!(self, FieldClass::UnsignedInteger { .. })
    }

    pub fn is_signed_integer_with_range(&self, bits: u32) -> bool {
        matches!(self, FieldClass::SignedInteger { field_value_range, .. } if *field_value_range == bits)
    }
}

/// Convenience constructor for the `{bin, func, src}` augmentation
/// struct.
pub fn debug_info_struct_field_class() -> FieldClass {
    let string_member = |name: &str| StructureMember {
        name: name.to_string(),
        field_class: FieldClass::String,
        user_attributes: None,
    };
    FieldClass::Structure {
        members: vec![string_member("bin"), string_member("func"), string_member("src")],
    }
}
