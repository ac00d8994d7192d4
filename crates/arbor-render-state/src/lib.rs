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

//! Interned render states with pairwise composition caching.
//!
//! This crate is the state-management layer of a scene-graph renderer. A
//! [`RenderState`] is an immutable set of render attributes (depth test,
//! transparency, texture matrix, ...) with one override priority per
//! attribute. States are value-interned process-wide: building the same
//! attribute set twice yields the same `Arc`, so equality everywhere else is
//! a pointer comparison.
//!
//! The expensive operation, composing a parent state with a child state
//! during traversal, is memoized per ordered pair of states. Cache entries
//! hold only weak handles to their peers and are torn down cooperatively
//! when either participant drops, so the caches never keep a state alive on
//! their own.
//!
//! # Example
//!
//! ```
//! use arbor_render_state::attrib::{DepthTestAttrib, DepthTestMode};
//! use arbor_render_state::attrib::{TransparencyAttrib, TransparencyMode};
//! use arbor_render_state::state::RenderState;
//! use std::sync::Arc;
//!
//! let parent = RenderState::make(DepthTestAttrib::make(DepthTestMode::Less), 0);
//! let child = RenderState::make(TransparencyAttrib::make(TransparencyMode::Alpha), 0);
//!
//! let net = parent.compose(&child);
//! assert_eq!(net.num_attribs(), 2);
//!
//! // Composition is memoized; the repeat is the identical state.
//! assert!(Arc::ptr_eq(&net, &parent.compose(&child)));
//! ```

#![warn(missing_docs)]

pub mod attrib;
pub mod bins;
pub mod device;
pub mod record;
pub mod state;

pub use attrib::{AttribRef, AttribType, RenderAttrib};
pub use bins::{BinDef, BinRegistry, BinSort};
pub use device::GraphicsDevice;
pub use record::{AttribDecoder, AttribFactory, RecordError, SlotRecord, StateRecord};
pub use state::{AttribSlot, RenderState, StateRef};
