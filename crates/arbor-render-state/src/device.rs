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

//! The outward boundary to the graphics backend.
//!
//! This crate never talks to a GPU; when a traversal decides an attribute
//! must take effect, the attribute is handed to an externally supplied
//! [`GraphicsDevice`] through the one method that matches its category. See
//! [`RenderState::issue_delta`](crate::state::RenderState::issue_delta) for
//! the only call site inside the subsystem.

use crate::attrib::{
    BillboardAttrib, CullBinAttrib, DepthTestAttrib, TexMatrixAttrib, TransparencyAttrib,
};

/// Capability interface for applying attributes to the rendering backend.
///
/// One method per attribute category; attributes double-dispatch onto the
/// matching method from [`RenderAttrib::issue`](crate::attrib::RenderAttrib::issue).
pub trait GraphicsDevice {
    /// Applies a depth-test attribute.
    fn issue_depth_test(&mut self, attrib: &DepthTestAttrib);

    /// Applies a transparency attribute.
    fn issue_transparency(&mut self, attrib: &TransparencyAttrib);

    /// Applies a cull-bin attribute.
    fn issue_cull_bin(&mut self, attrib: &CullBinAttrib);

    /// Applies a billboard attribute.
    fn issue_billboard(&mut self, attrib: &BillboardAttrib);

    /// Applies a texture-matrix attribute.
    fn issue_tex_matrix(&mut self, attrib: &TexMatrixAttrib);
}
