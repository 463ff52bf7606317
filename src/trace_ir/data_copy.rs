//! Data copy: field value copy driven by field class
//! shape. The debug-info struct itself is left as empty strings here;
//! `fill_debug_info_event_if_needed` (in `debug_info_index.rs`, where
//! `DebugInfoIndex` lives) overwrites it afterwards.

use crate::error::{Error, Result};

use super::field_class::FieldClass;
use super::value::FieldValue;

/// Copies `value` (shaped like `input_class`, the INPUT field class —
/// not the possibly-augmented output one) following the field class
/// recursively. Structures recurse by member NAME, tolerating field
/// reordering. The debug-info member an augmented output common
/// context gains has no input counterpart, so it is never produced
/// here; the caller appends it separately (`empty_debug_info_value`,
/// later overwritten by `fill_debug_info_event_if_needed`).
pub fn copy_field_value(input_class: &FieldClass, value: &FieldValue) -> Result<FieldValue> {
    match (input_class, value) {
        (FieldClass::Bool, FieldValue::Bool(b)) => Ok(FieldValue::Bool(*b)),
        (FieldClass::BitArray { .. }, FieldValue::BitArray(v)) => Ok(FieldValue::BitArray(*v)),
        (FieldClass::UnsignedInteger { .. }, FieldValue::UnsignedInteger(v)) => Ok(FieldValue::UnsignedInteger(*v)),
        (FieldClass::SignedInteger { .. }, FieldValue::SignedInteger(v)) => Ok(FieldValue::SignedInteger(*v)),
        (FieldClass::UnsignedEnumeration { .. }, FieldValue::UnsignedEnumeration(v)) => {
            Ok(FieldValue::UnsignedEnumeration(*v))
        }
        (FieldClass::SignedEnumeration { .. }, FieldValue::SignedEnumeration(v)) => {
            Ok(FieldValue::SignedEnumeration(*v))
        }
        (FieldClass::Real { .. }, FieldValue::Real(v)) => Ok(FieldValue::Real(*v)),
        (FieldClass::String, FieldValue::String(s)) => Ok(FieldValue::String(s.clone())),
        (FieldClass::Structure { members }, FieldValue::Structure(fields)) => {
            let mut out = Vec::with_capacity(fields.len());
            for member in members {
                let Some((_, v)) = fields.iter().find(|(n, _)| n == &member.name) else {
                    return Err(Error::MalformedPayload("structure value missing a declared member"));
                };
                out.push((member.name.clone(), copy_field_value(&member.field_class, v)?));
            }
            Ok(FieldValue::Structure(out))
        }
        (FieldClass::StaticArray { element, .. }, FieldValue::StaticArray(items)) => Ok(FieldValue::StaticArray(
            items.iter().map(|v| copy_field_value(element, v)).collect::<Result<_>>()?,
        )),
        (FieldClass::DynamicArray { element, .. }, FieldValue::DynamicArray(items)) => Ok(FieldValue::DynamicArray(
            items.iter().map(|v| copy_field_value(element, v)).collect::<Result<_>>()?,
        )),
        (
            FieldClass::OptionWithoutSelector { content }
            | FieldClass::OptionWithBoolSelector { content, .. }
            | FieldClass::OptionWithIntegerSelector { content, .. },
            FieldValue::Option(inner),
        ) => match inner {
            Some(v) => Ok(FieldValue::Option(Some(Box::new(copy_field_value(content, v)?)))),
            None => Ok(FieldValue::Option(None)),
        },
        (
            FieldClass::VariantWithoutSelector { options } | FieldClass::VariantWithIntegerSelector { options, .. },
            FieldValue::Variant { selected_index, value },
        ) => {
            let option = options
                .get(*selected_index)
                .ok_or(Error::MalformedPayload("variant value selects an option out of range"))?;
            Ok(FieldValue::Variant {
                selected_index: *selected_index,
                value: Box::new(copy_field_value(&option.field_class, value)?),
            })
        }
        _ => Err(Error::MalformedPayload("field value does not match its declared field class")),
    }
}

/// Appends the `{bin, func, src}` strings (all empty) to an already
/// copied common-context structure's debug-info member, as a
/// placeholder until `fill_debug_info_event_if_needed` runs.
pub fn empty_debug_info_value() -> FieldValue {
    let empty = || FieldValue::String(String::new());
    FieldValue::Structure(vec![
        ("bin".to_string(), empty()),
        ("func".to_string(), empty()),
        ("src".to_string(), empty()),
    ])
}
