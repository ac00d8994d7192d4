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

//! Flat persistence records for render states.
//!
//! A state serializes to one flat record: per slot, the attribute's type
//! name, its self-describing payload, and the override priority. Nothing
//! about the composition caches is persisted; a loaded state passes through
//! the interning registry again, so a round trip converges on the same
//! shared instance as direct construction.

use crate::attrib::{
    AttribRef, AttribType, BillboardAttrib, CullBinAttrib, DepthTestAttrib, TexMatrixAttrib,
    TransparencyAttrib,
};
use crate::state::{AttribSlot, RenderState, StateRef};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// An error raised while reading or writing state records.
#[derive(Debug)]
pub enum RecordError {
    /// The record names an attribute type with no registered decoder.
    UnknownAttribType(String),
    /// An attribute payload could not be encoded or decoded.
    Payload {
        /// The attribute type whose payload failed.
        attrib_type: String,
        /// The underlying codec error.
        details: String,
    },
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::UnknownAttribType(name) => {
                write!(f, "No decoder registered for attribute type '{name}'")
            }
            RecordError::Payload {
                attrib_type,
                details,
            } => {
                write!(f, "Bad payload for attribute type '{attrib_type}': {details}")
            }
        }
    }
}

impl std::error::Error for RecordError {}

/// One serialized attribute slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotRecord {
    /// The attribute's type name, matching [`AttribType::name`].
    pub attrib_type: String,
    /// The attribute's encoded value.
    pub payload: Vec<u8>,
    /// The slot's override priority.
    pub override_priority: i32,
}

/// The flat persisted form of a render state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateRecord {
    /// The serialized slots, in slot order.
    pub slots: Vec<SlotRecord>,
}

/// Decoder function turning a record payload back into an attribute.
pub type AttribDecoder = fn(&[u8]) -> Result<AttribRef, RecordError>;

/// Table of payload decoders, keyed by attribute type name.
///
/// Reading a record requires a factory that knows every attribute kind the
/// record may contain; unknown names fail with
/// [`RecordError::UnknownAttribType`].
#[derive(Default)]
pub struct AttribFactory {
    decoders: HashMap<&'static str, AttribDecoder>,
}

impl AttribFactory {
    /// Creates a factory with no decoders registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a factory with all built-in attribute kinds registered.
    #[must_use]
    pub fn with_builtin_attribs() -> Self {
        let mut factory = Self::new();
        factory.register(BillboardAttrib::TYPE, BillboardAttrib::decode);
        factory.register(CullBinAttrib::TYPE, CullBinAttrib::decode);
        factory.register(DepthTestAttrib::TYPE, DepthTestAttrib::decode);
        factory.register(TexMatrixAttrib::TYPE, TexMatrixAttrib::decode);
        factory.register(TransparencyAttrib::TYPE, TransparencyAttrib::decode);
        factory
    }

    /// Registers (or replaces) the decoder for an attribute kind.
    pub fn register(&mut self, ty: AttribType, decoder: AttribDecoder) {
        self.decoders.insert(ty.name(), decoder);
    }

    fn decode(&self, name: &str, payload: &[u8]) -> Result<AttribRef, RecordError> {
        let decoder = self
            .decoders
            .get(name)
            .ok_or_else(|| RecordError::UnknownAttribType(name.to_owned()))?;
        decoder(payload)
    }
}

impl RenderState {
    /// Writes this state's slot sequence as a flat record.
    pub fn write_record(&self) -> Result<StateRecord, RecordError> {
        let mut slots = Vec::with_capacity(self.num_attribs());
        for slot in self.slots() {
            slots.push(SlotRecord {
                attrib_type: slot.ty().name().to_owned(),
                payload: slot.attrib().encode()?,
                override_priority: slot.override_priority(),
            });
        }
        Ok(StateRecord { slots })
    }

    /// Rebuilds a state from a record, re-interning the result.
    ///
    /// The returned state is pointer-equal to one built directly from the
    /// same attribute set.
    pub fn from_record(
        record: &StateRecord,
        factory: &AttribFactory,
    ) -> Result<StateRef, RecordError> {
        let mut slots = Vec::with_capacity(record.slots.len());
        for slot in &record.slots {
            let attrib = factory.decode(&slot.attrib_type, &slot.payload)?;
            slots.push(AttribSlot::new(attrib, slot.override_priority));
        }
        // Records written by us are already slot-ordered, but foreign
        // writers may not be that tidy.
        slots.sort_by(|a, b| a.type_cmp(b));
        Ok(RenderState::intern(slots))
    }
}

pub(crate) fn encode_payload<T: Serialize>(
    ty: AttribType,
    value: &T,
) -> Result<Vec<u8>, RecordError> {
    bincode::serde::encode_to_vec(value, bincode::config::standard()).map_err(|err| {
        RecordError::Payload {
            attrib_type: ty.name().to_owned(),
            details: err.to_string(),
        }
    })
}

pub(crate) fn decode_payload<T: DeserializeOwned>(
    ty: AttribType,
    payload: &[u8],
) -> Result<T, RecordError> {
    let (value, _) = bincode::serde::decode_from_slice(payload, bincode::config::standard())
        .map_err(|err| RecordError::Payload {
            attrib_type: ty.name().to_owned(),
            details: err.to_string(),
        })?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrib::{DepthTestMode, TransparencyMode};
    use glam::{Mat4, Vec3};
    use std::sync::Arc;

    #[test]
    fn test_round_trip_reinterns_to_same_state() {
        let state = RenderState::make_with(&[
            (DepthTestAttrib::make(DepthTestMode::LessEqual), 2),
            (CullBinAttrib::make("fixed", 7), 0),
            (
                TexMatrixAttrib::make(Mat4::from_translation(Vec3::new(0.5, 0.25, 0.0))),
                0,
            ),
        ]);

        let record = state.write_record().unwrap();
        assert_eq!(record.slots.len(), 3);

        let factory = AttribFactory::with_builtin_attribs();
        let loaded = RenderState::from_record(&record, &factory).unwrap();
        assert!(Arc::ptr_eq(&state, &loaded));
    }

    #[test]
    fn test_record_preserves_overrides() {
        let state = RenderState::make(TransparencyAttrib::make(TransparencyMode::Dual), 9);
        let record = state.write_record().unwrap();
        assert_eq!(record.slots[0].override_priority, 9);
        assert_eq!(record.slots[0].attrib_type, "transparency");
    }

    #[test]
    fn test_unknown_attrib_type_is_an_error() {
        let record = StateRecord {
            slots: vec![SlotRecord {
                attrib_type: "no-such-kind".to_owned(),
                payload: Vec::new(),
                override_priority: 0,
            }],
        };
        let factory = AttribFactory::with_builtin_attribs();
        match RenderState::from_record(&record, &factory) {
            Err(RecordError::UnknownAttribType(name)) => assert_eq!(name, "no-such-kind"),
            other => panic!("expected UnknownAttribType, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        let record = StateRecord {
            slots: vec![SlotRecord {
                attrib_type: "cull-bin".to_owned(),
                payload: vec![0xFF],
                override_priority: 0,
            }],
        };
        let factory = AttribFactory::with_builtin_attribs();
        assert!(matches!(
            RenderState::from_record(&record, &factory),
            Err(RecordError::Payload { .. })
        ));
    }

    #[test]
    fn test_empty_state_round_trip() {
        let record = RenderState::empty().write_record().unwrap();
        assert!(record.slots.is_empty());
        let loaded =
            RenderState::from_record(&record, &AttribFactory::with_builtin_attribs()).unwrap();
        assert!(Arc::ptr_eq(&loaded, &RenderState::empty()));
    }
}
