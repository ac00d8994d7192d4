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

//! Cull-bin attribute: assigns geometry to an explicitly named render bin.

use super::{AttribRef, AttribType, RenderAttrib};
use crate::device::GraphicsDevice;
use crate::record::{self, RecordError};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cmp::Ordering;
use std::sync::Arc;

/// Names the render bin (and the draw order within it) for everything below
/// this attribute in the scene graph.
///
/// An empty bin name means "no explicit bin": the state falls back to the
/// `opaque`/`transparent` default selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CullBinAttrib {
    bin_name: String,
    draw_order: i32,
}

impl CullBinAttrib {
    /// Type tag for cull-bin attributes.
    pub const TYPE: AttribType = AttribType::new("cull-bin");

    /// Creates a cull-bin attribute naming the given bin.
    pub fn make(bin_name: impl Into<String>, draw_order: i32) -> AttribRef {
        Arc::new(Self {
            bin_name: bin_name.into(),
            draw_order,
        })
    }

    /// Returns the explicit bin name, empty if none.
    #[must_use]
    pub fn bin_name(&self) -> &str {
        &self.bin_name
    }

    /// Returns the draw order within the bin.
    #[must_use]
    pub fn draw_order(&self) -> i32 {
        self.draw_order
    }

    /// Decodes a cull-bin attribute from a record payload.
    pub fn decode(payload: &[u8]) -> Result<AttribRef, RecordError> {
        let attrib: Self = record::decode_payload(Self::TYPE, payload)?;
        Ok(Arc::new(attrib))
    }
}

impl RenderAttrib for CullBinAttrib {
    fn attrib_type(&self) -> AttribType {
        Self::TYPE
    }

    fn compare_to(&self, other: &dyn RenderAttrib) -> Ordering {
        match other.as_any().downcast_ref::<Self>() {
            Some(other) => self
                .bin_name
                .cmp(&other.bin_name)
                .then(self.draw_order.cmp(&other.draw_order)),
            None => {
                debug_assert!(false, "compared cull-bin attrib against {}", other.attrib_type());
                Ordering::Equal
            }
        }
    }

    fn make_default(&self) -> AttribRef {
        Self::make("", 0)
    }

    fn issue(&self, device: &mut dyn GraphicsDevice) {
        device.issue_cull_bin(self);
    }

    fn encode(&self) -> Result<Vec<u8>, RecordError> {
        record::encode_payload(Self::TYPE, self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_by_name_then_order() {
        let a = CullBinAttrib::make("fixed", 1);
        let b = CullBinAttrib::make("fixed", 2);
        let c = CullBinAttrib::make("opaque", 0);
        assert_eq!(a.compare_to(b.as_ref()), Ordering::Less);
        assert_eq!(b.compare_to(c.as_ref()), Ordering::Less);
        assert_eq!(a.compare_to(a.as_ref()), Ordering::Equal);
    }
}
