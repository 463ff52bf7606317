//! Metadata copy: trace class / stream class / event
//! class / field class, plus the common-context augmentation rule.
//!
//! Field classes are structurally owned (`Box` trees, see
//! `field_class.rs`'s module doc), so a "skeleton then content"
//! two-phase walk collapses into a single recursive pass here — there's
//! no builder API forcing bare nodes to exist before their children
//! are known. The resolving-context lookup still does real work
//! though: each selector field path is resolved against the output
//! tree built so far, which upholds (and checks) the "lookup never
//! fails" invariant.

use crate::config::Config;
use crate::error::{Error, Result};

use super::field_class::{
    copy_user_attributes, debug_info_struct_field_class, FieldClass, StructureMember, VariantOption,
};
use super::resolving_context::ResolvingContext;

/// Copies a field class, resolving and checking any selector field
/// paths it (or its children) carry against `ctx`.
pub fn copy_field_class(input: &FieldClass, ctx: &ResolvingContext) -> Result<FieldClass> {
    Ok(match input {
        FieldClass::Bool => FieldClass::Bool,
        FieldClass::BitArray { length } => FieldClass::BitArray { length: *length },
        FieldClass::UnsignedInteger { field_value_range, base } => FieldClass::UnsignedInteger {
            field_value_range: *field_value_range,
            base: *base,
        },
        FieldClass::SignedInteger { field_value_range, base } => FieldClass::SignedInteger {
            field_value_range: *field_value_range,
            base: *base,
        },
        FieldClass::UnsignedEnumeration { field_value_range, base, mappings } => FieldClass::UnsignedEnumeration {
            field_value_range: *field_value_range,
            base: *base,
            mappings: mappings.clone(),
        },
        FieldClass::SignedEnumeration { field_value_range, base, mappings } => FieldClass::SignedEnumeration {
            field_value_range: *field_value_range,
            base: *base,
            mappings: mappings.clone(),
        },
        FieldClass::Real { single_precision } => FieldClass::Real { single_precision: *single_precision },
        FieldClass::String => FieldClass::String,
        FieldClass::Structure { members } => FieldClass::Structure {
            members: copy_structure_members(members, ctx)?,
        },
        FieldClass::StaticArray { element, length } => FieldClass::StaticArray {
            element: Box::new(copy_field_class(element, ctx)?),
            length: *length,
        },
        FieldClass::DynamicArray { element, length_field_path } => {
            if let Some(path) = length_field_path {
                ctx.resolve(path)?;
            }
            FieldClass::DynamicArray {
                element: Box::new(copy_field_class(element, ctx)?),
                length_field_path: length_field_path.clone(),
            }
        }
        FieldClass::OptionWithoutSelector { content } => FieldClass::OptionWithoutSelector {
            content: Box::new(copy_field_class(content, ctx)?),
        },
        FieldClass::OptionWithBoolSelector { content, selector_field_path, selector_is_reversed } => {
            ctx.resolve(selector_field_path)?;
            FieldClass::OptionWithBoolSelector {
                content: Box::new(copy_field_class(content, ctx)?),
                selector_field_path: selector_field_path.clone(),
                selector_is_reversed: *selector_is_reversed,
            }
        }
        FieldClass::OptionWithIntegerSelector { content, selector_field_path, ranges } => {
            ctx.resolve(selector_field_path)?;
            FieldClass::OptionWithIntegerSelector {
                content: Box::new(copy_field_class(content, ctx)?),
                selector_field_path: selector_field_path.clone(),
                ranges: ranges.clone(),
            }
        }
        FieldClass::VariantWithoutSelector { options } => FieldClass::VariantWithoutSelector {
            options: copy_variant_options(options, ctx)?,
        },
        FieldClass::VariantWithIntegerSelector { options, selector_field_path, selector_is_signed } => {
            ctx.resolve(selector_field_path)?;
            FieldClass::VariantWithIntegerSelector {
                options: copy_variant_options(options, ctx)?,
                selector_field_path: selector_field_path.clone(),
                selector_is_signed: *selector_is_signed,
            }
        }
    })
}

/// Copies structure members in declaration order, growing the
/// `Scope::Current` slice one member at a time so a later member's
/// selector can resolve against earlier siblings ("the
/// lookup never fails because fields are mapped in declaration
/// order").
fn copy_structure_members(members: &[StructureMember], ctx: &ResolvingContext) -> Result<Vec<StructureMember>> {
    let mut out = Vec::with_capacity(members.len());
    for member in members {
        let scoped = ctx.with_current(&out);
        let field_class = copy_field_class(&member.field_class, &scoped)?;
        out.push(StructureMember {
            name: member.name.clone(),
            field_class,
            user_attributes: copy_user_attributes(&member.user_attributes),
        });
    }
    Ok(out)
}

fn copy_variant_options(options: &[VariantOption], ctx: &ResolvingContext) -> Result<Vec<VariantOption>> {
    options
        .iter()
        .map(|opt| {
            Ok(VariantOption {
                name: opt.name.clone(),
                field_class: copy_field_class(&opt.field_class, ctx)?,
                ranges: opt.ranges.clone(),
                user_attributes: copy_user_attributes(&opt.user_attributes),
            })
        })
        .collect()
}

/// Copies the stream class's event common context field class,
/// applying the debug-info augmentation rule when its
/// precondition holds. Returns the copied field class and whether it
/// was augmented.
pub fn copy_event_common_context(
    input: Option<&FieldClass>,
    config: &Config,
    ctx: &ResolvingContext,
) -> Result<(Option<FieldClass>, bool)> {
    let Some(input) = input else { return Ok((None, false)) };
    let FieldClass::Structure { members } = input else {
        return Ok((Some(copy_field_class(input, ctx)?), false));
    };

    let already_has_debug_info = members.iter().any(|m| m.name == config.debug_info_field_name);
    let has_ip = members
        .iter()
        .any(|m| m.name == "ip" && m.field_class.is_unsigned_integer());
    let has_vpid = members
        .iter()
        .any(|m| m.name == "vpid" && m.field_class.is_signed_integer_with_range(32));
    let should_augment = !already_has_debug_info && has_ip && has_vpid;

    let mut copied = copy_structure_members(members, ctx)?;
    if should_augment {
        copied.push(StructureMember {
            name: config.debug_info_field_name.clone(),
            field_class: debug_info_struct_field_class(),
            user_attributes: None,
        });
    }
    Ok((Some(FieldClass::Structure { members: copied }), should_augment))
}

pub fn require_structure(fc: &FieldClass) -> Result<&[StructureMember]> {
    match fc {
        FieldClass::Structure { members } => Ok(members),
        _ => Err(Error::MalformedFieldClass("expected a structure field class".into())),
    }
}
