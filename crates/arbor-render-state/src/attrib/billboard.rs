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

//! Billboard attribute: rotates geometry to face the camera during cull.
//!
//! The cull traversal only needs to know whether a state carries a billboard
//! at all; the cached flag on the state answers that without a lookup.

use super::{AttribRef, AttribType, RenderAttrib};
use crate::device::GraphicsDevice;
use crate::record::{self, RecordError};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cmp::Ordering;
use std::sync::Arc;

/// How billboarded geometry tracks the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BillboardMode {
    /// Not billboarded; cancels an inherited billboard.
    Off,
    /// Rotates around the up axis to face the camera.
    Axis,
    /// Rotates fully to face the camera plane.
    PointEye,
    /// Rotates fully to face the camera, keeping the world up vector.
    PointWorld,
}

/// Marks everything below this attribute as billboarded geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillboardAttrib {
    mode: BillboardMode,
}

impl BillboardAttrib {
    /// Type tag for billboard attributes.
    pub const TYPE: AttribType = AttribType::new("billboard");

    /// Creates a billboard attribute with the given mode.
    pub fn make(mode: BillboardMode) -> AttribRef {
        Arc::new(Self { mode })
    }

    /// Returns the billboard mode.
    #[must_use]
    pub fn mode(&self) -> BillboardMode {
        self.mode
    }

    /// Decodes a billboard attribute from a record payload.
    pub fn decode(payload: &[u8]) -> Result<AttribRef, RecordError> {
        let attrib: Self = record::decode_payload(Self::TYPE, payload)?;
        Ok(Arc::new(attrib))
    }
}

impl RenderAttrib for BillboardAttrib {
    fn attrib_type(&self) -> AttribType {
        Self::TYPE
    }

    fn compare_to(&self, other: &dyn RenderAttrib) -> Ordering {
        match other.as_any().downcast_ref::<Self>() {
            Some(other) => self.mode.cmp(&other.mode),
            None => {
                debug_assert!(false, "compared billboard attrib against {}", other.attrib_type());
                Ordering::Equal
            }
        }
    }

    fn make_default(&self) -> AttribRef {
        Self::make(BillboardMode::Off)
    }

    fn issue(&self, device: &mut dyn GraphicsDevice) {
        device.issue_billboard(self);
    }

    fn encode(&self) -> Result<Vec<u8>, RecordError> {
        record::encode_payload(Self::TYPE, self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
