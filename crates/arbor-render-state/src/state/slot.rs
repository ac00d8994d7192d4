// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! One attribute entry inside a render state.

use crate::attrib::{AttribRef, AttribType};
use std::cmp::Ordering;

/// An attribute together with its override priority, as stored in a state's
/// sorted slot sequence.
///
/// A published state holds at most one slot per attribute type; slots are
/// ordered by type tag.
#[derive(Debug, Clone)]
pub struct AttribSlot {
    ty: AttribType,
    attrib: AttribRef,
    override_priority: i32,
}

impl AttribSlot {
    /// Creates a slot, caching the attribute's type tag.
    pub fn new(attrib: AttribRef, override_priority: i32) -> Self {
        Self {
            ty: attrib.attrib_type(),
            attrib,
            override_priority,
        }
    }

    /// Returns the attribute's type tag.
    #[must_use]
    pub fn ty(&self) -> AttribType {
        self.ty
    }

    /// Returns the attribute held by this slot.
    #[must_use]
    pub fn attrib(&self) -> &AttribRef {
        &self.attrib
    }

    /// Returns the override priority; the higher value wins a composition
    /// conflict outright.
    #[must_use]
    pub fn override_priority(&self) -> i32 {
        self.override_priority
    }

    /// Orders slots by attribute type only; the sort key of a state's slot
    /// sequence.
    #[must_use]
    pub fn type_cmp(&self, other: &Self) -> Ordering {
        self.ty.cmp(&other.ty)
    }

    /// Full value comparison: type tag, then attribute value, then override.
    ///
    /// This is the lexicographic element order the interning registry keys
    /// states by.
    #[must_use]
    pub fn compare_to(&self, other: &Self) -> Ordering {
        self.ty
            .cmp(&other.ty)
            .then_with(|| self.attrib.compare_to(other.attrib.as_ref()))
            .then_with(|| self.override_priority.cmp(&other.override_priority))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrib::{DepthTestAttrib, DepthTestMode, TransparencyAttrib, TransparencyMode};

    #[test]
    fn test_type_cmp_ignores_value() {
        let a = AttribSlot::new(DepthTestAttrib::make(DepthTestMode::Less), 0);
        let b = AttribSlot::new(DepthTestAttrib::make(DepthTestMode::Always), 5);
        assert_eq!(a.type_cmp(&b), Ordering::Equal);
    }

    #[test]
    fn test_compare_to_breaks_ties_on_override() {
        let a = AttribSlot::new(DepthTestAttrib::make(DepthTestMode::Less), 0);
        let b = AttribSlot::new(DepthTestAttrib::make(DepthTestMode::Less), 1);
        assert_eq!(a.compare_to(&b), Ordering::Less);
        assert_eq!(b.compare_to(&a), Ordering::Greater);
    }

    #[test]
    fn test_compare_to_orders_types_first() {
        let depth = AttribSlot::new(DepthTestAttrib::make(DepthTestMode::Always), 9);
        let transparency = AttribSlot::new(TransparencyAttrib::make(TransparencyMode::None), 0);
        // "depth-test" sorts before "transparency".
        assert_eq!(depth.compare_to(&transparency), Ordering::Less);
    }
}
