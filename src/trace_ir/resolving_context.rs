//! The "resolving context": resolves a [`FieldPath`]
//! recorded on a dynamic array / option / variant to the output field
//! class it points to, during the field-class copy.
//!
//! Field paths are copied unchanged from input to output (members are
//! never reordered or dropped by this filter, only appended to at the
//! end of a structure), so resolution here exists to uphold and check
//! the "lookup never fails because fields are mapped in declaration
//! order" invariant rather than to transform anything.

use super::field_class::{FieldClass, FieldPath, Scope, StructureMember};
use crate::error::Error;

pub struct ResolvingContext<'a> {
    pub packet_context: Option<&'a FieldClass>,
    pub event_common_context: Option<&'a FieldClass>,
    pub event_specific_context: Option<&'a FieldClass>,
    pub event_payload: Option<&'a FieldClass>,
    /// Members of the structure presently being copied, in the order
    /// they've been copied so far (`Scope::Current`).
    pub current: &'a [StructureMember],
}

impl<'a> ResolvingContext<'a> {
    pub fn root(&self) -> ResolvingContext<'a> {
        ResolvingContext {
            packet_context: self.packet_context,
            event_common_context: self.event_common_context,
            event_specific_context: self.event_specific_context,
            event_payload: self.event_payload,
            current: &[],
        }
    }

    pub fn with_current(&self, current: &'a [StructureMember]) -> ResolvingContext<'a> {
        ResolvingContext { current, ..*self }
    }

    pub fn resolve(&self, path: &FieldPath) -> Result<&'a FieldClass, Error> {
        match path.root {
            Scope::Current => {
                let (&first, rest) = path
                    .indices
                    .split_first()
                    .ok_or_else(|| Error::FieldPathResolution("empty path rooted at current scope".into()))?;
                let member = self
                    .current
                    .get(first)
                    .ok_or_else(|| Error::FieldPathResolution(format!("current scope has no member {first}")))?;
                descend(&member.field_class, rest)
            }
            Scope::PacketContext => descend(
                self.packet_context
                    .ok_or_else(|| Error::FieldPathResolution("no packet context in scope".into()))?,
                &path.indices,
            ),
            Scope::EventCommonContext => descend(
                self.event_common_context
                    .ok_or_else(|| Error::FieldPathResolution("no event common context in scope".into()))?,
                &path.indices,
            ),
            Scope::EventSpecificContext => descend(
                self.event_specific_context
                    .ok_or_else(|| Error::FieldPathResolution("no event specific context in scope".into()))?,
                &path.indices,
            ),
            Scope::EventPayload => descend(
                self.event_payload
                    .ok_or_else(|| Error::FieldPathResolution("no event payload in scope".into()))?,
                &path.indices,
            ),
        }
    }
}

fn descend<'a>(start: &'a FieldClass, indices: &[usize]) -> Result<&'a FieldClass, Error> {
    let mut cur = start;
    for &i in indices {
        cur = match cur {
            FieldClass::Structure { members } => members
                .get(i)
                .map(|m| &m.field_class)
                .ok_or_else(|| Error::FieldPathResolution(format!("structure has no member {i}")))?,
            FieldClass::VariantWithoutSelector { options } | FieldClass::VariantWithIntegerSelector { options, .. } => {
                options
                    .get(i)
                    .map(|o| &o.field_class)
                    .ok_or_else(|| Error::FieldPathResolution(format!("variant has no option {i}")))?
            }
            _ => return Err(Error::FieldPathResolution(format!("cannot descend into non-composite at index {i}"))),
        };
    }
    Ok(cur)
}
