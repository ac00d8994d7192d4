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

//! Render attributes: the immutable, composable value objects a
//! [`RenderState`](crate::state::RenderState) is assembled from.
//!
//! Each attribute kind (depth test, transparency, texture matrix, ...) is one
//! implementation of the [`RenderAttrib`] trait. The state and cache layers
//! never contain attribute-specific logic; everything kind-specific is
//! dispatched through the trait, keyed by the [`AttribType`] tag stored in
//! each slot.

mod billboard;
mod cull_bin;
mod tex_matrix;
mod transparency;

pub use billboard::{BillboardAttrib, BillboardMode};
pub use cull_bin::CullBinAttrib;
pub use depth_test::{DepthTestAttrib, DepthTestMode};
pub use tex_matrix::TexMatrixAttrib;
pub use transparency::{TransparencyAttrib, TransparencyMode};

use crate::device::GraphicsDevice;
use crate::record::RecordError;
use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A shared handle to an immutable render attribute.
///
/// Multiple states may reference the same attribute instance; the attribute
/// lives as long as its longest holder.
pub type AttribRef = Arc<dyn RenderAttrib>;

/// Stable identifier for an attribute kind.
///
/// The wrapped name doubles as the total-order key for slot sorting and as
/// the type tag written into serialized records, so it must be unique per
/// kind and must never change once records exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttribType {
    name: &'static str,
}

impl AttribType {
    /// Creates a type tag from a unique, stable kind name.
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    /// Returns the kind name this tag was created with.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.name
    }
}

impl fmt::Display for AttribType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A single immutable rendering property with defined composition semantics.
///
/// Implementations must be value objects: once published behind an
/// [`AttribRef`] they are never mutated. [`compare_to`](Self::compare_to) is
/// only ever called with two attributes of the same kind; within one kind it
/// must be a total order so that equal attributes compare `Equal` regardless
/// of which instance holds them.
pub trait RenderAttrib: Any + Send + Sync + fmt::Debug {
    /// Returns the stable tag identifying this attribute's kind.
    fn attrib_type(&self) -> AttribType;

    /// Composes this attribute with `other`, which was applied below this one
    /// in the scene graph.
    ///
    /// For most kinds a subsequent attribute completely replaces the
    /// preceding one, which is the default.
    fn compose(&self, other: &AttribRef) -> AttribRef {
        other.clone()
    }

    /// Composes the inverse of this attribute with `other`.
    ///
    /// Used when computing the net state of a node relative to some other
    /// node. Kinds with replace semantics simply yield `other`.
    fn invert_compose(&self, other: &AttribRef) -> AttribRef {
        other.clone()
    }

    /// Totally orders this attribute against another of the same kind.
    ///
    /// Called only with two attributes whose [`attrib_type`](Self::attrib_type)
    /// match; a mismatch is a protocol violation.
    fn compare_to(&self, other: &dyn RenderAttrib) -> Ordering;

    /// Returns the standard default value for this attribute's kind.
    fn make_default(&self) -> AttribRef;

    /// Issues this attribute to the graphics device.
    ///
    /// Double dispatch: each kind calls the one device method that knows how
    /// to apply it.
    fn issue(&self, device: &mut dyn GraphicsDevice);

    /// Encodes this attribute's value as a flat record payload.
    fn encode(&self) -> Result<Vec<u8>, RecordError>;

    /// Downcast seam for kind-specific consumers.
    fn as_any(&self) -> &dyn Any;
}
