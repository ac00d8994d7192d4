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

//! Transparency attribute: how (and whether) alpha blending is performed.
//!
//! Besides device issuance, this attribute drives the default render-bin
//! selection: modes that require back-to-front sorting send otherwise
//! unbinned geometry to the `transparent` bin.

use super::{AttribRef, AttribType, RenderAttrib};
use crate::device::GraphicsDevice;
use crate::record::{self, RecordError};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cmp::Ordering;
use std::sync::Arc;

/// The blending discipline applied to geometry below this attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TransparencyMode {
    /// Opaque rendering; alpha is ignored.
    None,
    /// Conventional alpha blending.
    Alpha,
    /// Alpha blending with per-primitive depth sorting.
    AlphaSorted,
    /// Alpha is thresholded to fully opaque or fully discarded.
    Binary,
    /// Multisample-based transparency.
    Multisample,
    /// Multisample transparency applied through the coverage mask only.
    MultisampleMask,
    /// Two-pass rendering of the opaque and transparent parts.
    Dual,
}

impl TransparencyMode {
    /// Returns `true` for modes that require special back-to-front sorting.
    #[must_use]
    pub fn requires_back_to_front(self) -> bool {
        matches!(
            self,
            TransparencyMode::Alpha | TransparencyMode::AlphaSorted | TransparencyMode::Binary
        )
    }
}

/// Selects the transparency mode for everything below it in the scene graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyAttrib {
    mode: TransparencyMode,
}

impl TransparencyAttrib {
    /// Type tag for transparency attributes.
    pub const TYPE: AttribType = AttribType::new("transparency");

    /// Creates a transparency attribute with the given mode.
    pub fn make(mode: TransparencyMode) -> AttribRef {
        Arc::new(Self { mode })
    }

    /// Returns the selected transparency mode.
    #[must_use]
    pub fn mode(&self) -> TransparencyMode {
        self.mode
    }

    /// Decodes a transparency attribute from a record payload.
    pub fn decode(payload: &[u8]) -> Result<AttribRef, RecordError> {
        let attrib: Self = record::decode_payload(Self::TYPE, payload)?;
        Ok(Arc::new(attrib))
    }
}

impl RenderAttrib for TransparencyAttrib {
    fn attrib_type(&self) -> AttribType {
        Self::TYPE
    }

    fn compare_to(&self, other: &dyn RenderAttrib) -> Ordering {
        match other.as_any().downcast_ref::<Self>() {
            Some(other) => self.mode.cmp(&other.mode),
            None => {
                debug_assert!(
                    false,
                    "compared transparency attrib against {}",
                    other.attrib_type()
                );
                Ordering::Equal
            }
        }
    }

    fn make_default(&self) -> AttribRef {
        Self::make(TransparencyMode::None)
    }

    fn issue(&self, device: &mut dyn GraphicsDevice) {
        device.issue_transparency(self);
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
    fn test_sorting_modes() {
        assert!(TransparencyMode::Alpha.requires_back_to_front());
        assert!(TransparencyMode::AlphaSorted.requires_back_to_front());
        assert!(TransparencyMode::Binary.requires_back_to_front());
        assert!(!TransparencyMode::None.requires_back_to_front());
        assert!(!TransparencyMode::Multisample.requires_back_to_front());
        assert!(!TransparencyMode::Dual.requires_back_to_front());
    }

    #[test]
    fn test_default_is_opaque() {
        let attrib = TransparencyAttrib::make(TransparencyMode::Alpha);
        let default = attrib.make_default();
        let default = default
            .as_any()
            .downcast_ref::<TransparencyAttrib>()
            .unwrap();
        assert_eq!(default.mode(), TransparencyMode::None);
    }
}
