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

//! Texture-matrix attribute: per-stage UV transforms.
//!
//! Unlike the replace-semantics attributes, texture matrices combine under
//! composition: the result is the union of the two stage sets, and a stage
//! present on both sides multiplies its matrices together.

use super::{AttribRef, AttribType, RenderAttrib};
use crate::device::GraphicsDevice;
use crate::record::{self, RecordError};
use glam::Mat4;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The stage name used by the single-stage constructors.
pub const DEFAULT_STAGE: &str = "default";

/// Applies a transformation matrix to the texture coordinates of one or more
/// texture stages.
#[derive(Debug, Clone)]
pub struct TexMatrixAttrib {
    stages: BTreeMap<String, Mat4>,
}

#[derive(Serialize, Deserialize)]
struct TexMatrixPayload {
    stages: Vec<(String, [f32; 16])>,
}

impl TexMatrixAttrib {
    /// Type tag for texture-matrix attributes.
    pub const TYPE: AttribType = AttribType::new("tex-matrix");

    /// Creates a texture-matrix attribute applying `mat` to the default
    /// texture stage.
    pub fn make(mat: Mat4) -> AttribRef {
        Self::make_for_stage(DEFAULT_STAGE, mat)
    }

    /// Creates a texture-matrix attribute applying `mat` to the named stage.
    pub fn make_for_stage(stage: impl Into<String>, mat: Mat4) -> AttribRef {
        let mut stages = BTreeMap::new();
        stages.insert(stage.into(), mat);
        Arc::new(Self { stages })
    }

    /// Creates a texture-matrix attribute that transforms no stages at all.
    pub fn make_empty() -> AttribRef {
        Arc::new(Self {
            stages: BTreeMap::new(),
        })
    }

    /// Returns a copy of this attribute with the named stage set to `mat`,
    /// replacing any transform the stage already had.
    pub fn with_stage(&self, stage: impl Into<String>, mat: Mat4) -> AttribRef {
        let mut stages = self.stages.clone();
        stages.insert(stage.into(), mat);
        Arc::new(Self { stages })
    }

    /// Returns a copy of this attribute with the named stage removed.
    pub fn without_stage(&self, stage: &str) -> AttribRef {
        let mut stages = self.stages.clone();
        stages.remove(stage);
        Arc::new(Self { stages })
    }

    /// Returns `true` if no stages are transformed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Returns `true` if the named stage has a transform.
    #[must_use]
    pub fn has_stage(&self, stage: &str) -> bool {
        self.stages.contains_key(stage)
    }

    /// Returns the matrix for the default stage, identity if unset.
    #[must_use]
    pub fn mat(&self) -> Mat4 {
        self.mat_for_stage(DEFAULT_STAGE)
    }

    /// Returns the matrix for the named stage, identity if unset.
    #[must_use]
    pub fn mat_for_stage(&self, stage: &str) -> Mat4 {
        self.stages.get(stage).copied().unwrap_or(Mat4::IDENTITY)
    }

    /// Iterates the (stage, matrix) pairs in stage-name order.
    pub fn stages(&self) -> impl Iterator<Item = (&str, Mat4)> {
        self.stages.iter().map(|(name, mat)| (name.as_str(), *mat))
    }

    /// Decodes a texture-matrix attribute from a record payload.
    pub fn decode(payload: &[u8]) -> Result<AttribRef, RecordError> {
        let payload: TexMatrixPayload = record::decode_payload(Self::TYPE, payload)?;
        let stages = payload
            .stages
            .into_iter()
            .map(|(name, cols)| (name, Mat4::from_cols_array(&cols)))
            .collect();
        Ok(Arc::new(Self { stages }))
    }

    fn downcast<'a>(&self, other: &'a dyn RenderAttrib) -> Option<&'a Self> {
        let other = other.as_any().downcast_ref::<Self>();
        debug_assert!(other.is_some(), "mixed tex-matrix attrib with another kind");
        other
    }
}

fn mat_total_cmp(a: &Mat4, b: &Mat4) -> Ordering {
    let (a, b) = (a.to_cols_array(), b.to_cols_array());
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = x.total_cmp(y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

impl RenderAttrib for TexMatrixAttrib {
    fn attrib_type(&self) -> AttribType {
        Self::TYPE
    }

    /// The composition is the union of the two stage sets. When a stage is in
    /// both attribs, this side's matrix is applied first, then the other's.
    fn compose(&self, other: &AttribRef) -> AttribRef {
        let Some(other) = self.downcast(other.as_ref()) else {
            return other.clone();
        };
        let mut stages = self.stages.clone();
        for (name, mat) in &other.stages {
            stages
                .entry(name.clone())
                .and_modify(|ours| *ours = *mat * *ours)
                .or_insert(*mat);
        }
        Arc::new(Self { stages })
    }

    /// Works like composition, except this side's stages are inverted first.
    fn invert_compose(&self, other: &AttribRef) -> AttribRef {
        let Some(other) = self.downcast(other.as_ref()) else {
            return other.clone();
        };
        let mut stages: BTreeMap<String, Mat4> = self
            .stages
            .iter()
            .map(|(name, mat)| (name.clone(), mat.inverse()))
            .collect();
        for (name, mat) in &other.stages {
            stages
                .entry(name.clone())
                .and_modify(|inv| *inv = *mat * *inv)
                .or_insert(*mat);
        }
        Arc::new(Self { stages })
    }

    fn compare_to(&self, other: &dyn RenderAttrib) -> Ordering {
        let Some(other) = self.downcast(other) else {
            return Ordering::Equal;
        };
        let mut ai = self.stages.iter();
        let mut bi = other.stages.iter();
        loop {
            match (ai.next(), bi.next()) {
                (Some((an, am)), Some((bn, bm))) => {
                    let ord = an.cmp(bn).then_with(|| mat_total_cmp(am, bm));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (None, None) => return Ordering::Equal,
            }
        }
    }

    fn make_default(&self) -> AttribRef {
        Self::make_empty()
    }

    fn issue(&self, device: &mut dyn GraphicsDevice) {
        device.issue_tex_matrix(self);
    }

    fn encode(&self) -> Result<Vec<u8>, RecordError> {
        let payload = TexMatrixPayload {
            stages: self
                .stages
                .iter()
                .map(|(name, mat)| (name.clone(), mat.to_cols_array()))
                .collect(),
        };
        record::encode_payload(Self::TYPE, &payload)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Vec3;

    fn unwrap_tex(attrib: &AttribRef) -> &TexMatrixAttrib {
        attrib.as_any().downcast_ref::<TexMatrixAttrib>().unwrap()
    }

    #[test]
    fn test_compose_multiplies_shared_stage() {
        let a = TexMatrixAttrib::make(Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)));
        let b = TexMatrixAttrib::make(Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)));
        let composed = a.compose(&b);
        assert_relative_eq!(
            unwrap_tex(&composed).mat(),
            Mat4::from_translation(Vec3::new(1.0, 2.0, 0.0))
        );
    }

    #[test]
    fn test_compose_unions_disjoint_stages() {
        let a = TexMatrixAttrib::make_for_stage("diffuse", Mat4::IDENTITY);
        let b = TexMatrixAttrib::make_for_stage("lightmap", Mat4::IDENTITY);
        let composed = a.compose(&b);
        let composed = unwrap_tex(&composed);
        assert!(composed.has_stage("diffuse"));
        assert!(composed.has_stage("lightmap"));
    }

    #[test]
    fn test_invert_compose_with_default_inverts() {
        let mat = Mat4::from_scale(Vec3::splat(2.0));
        let a = TexMatrixAttrib::make(mat);
        let inverted = a.invert_compose(&a.make_default());
        assert_relative_eq!(unwrap_tex(&inverted).mat(), mat.inverse());
    }

    #[test]
    fn test_invert_compose_cancels_itself() {
        let a = TexMatrixAttrib::make(Mat4::from_translation(Vec3::new(3.0, -1.0, 0.5)));
        let net = a.invert_compose(&a);
        assert_relative_eq!(unwrap_tex(&net).mat(), Mat4::IDENTITY, epsilon = 1e-6);
    }

    #[test]
    fn test_compare_walks_stages() {
        let a = TexMatrixAttrib::make_for_stage("a", Mat4::IDENTITY);
        let b = TexMatrixAttrib::make_for_stage("b", Mat4::IDENTITY);
        let ab = unwrap_tex(&a).with_stage("b", Mat4::IDENTITY);
        assert_eq!(a.compare_to(b.as_ref()), Ordering::Less);
        assert_eq!(a.compare_to(ab.as_ref()), Ordering::Less);
        assert_eq!(ab.compare_to(a.as_ref()), Ordering::Greater);
        assert_eq!(a.compare_to(a.as_ref()), Ordering::Equal);
    }
}
