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

//! The process-wide table of named render bins.
//!
//! States resolve their bin name against this table once and cache the
//! resulting index; see
//! [`RenderState::bin_index`](crate::state::RenderState::bin_index). Bin
//! indices are stable for the life of the process: bins can be added but not
//! removed, so a cached index never goes stale.

use std::sync::{Mutex, OnceLock};

/// How the contents of a bin are ordered before drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinSort {
    /// Drawn in traversal order.
    Unsorted,
    /// Sorted to minimize state changes.
    StateSorted,
    /// Drawn in the fixed order given by each state's draw order.
    FixedOrder,
    /// Sorted farthest-first, for blended transparency.
    BackToFront,
    /// Sorted nearest-first, for early depth rejection.
    FrontToBack,
}

/// One named render bin.
#[derive(Debug, Clone)]
pub struct BinDef {
    name: String,
    sort_kind: BinSort,
    sort: i32,
}

impl BinDef {
    /// Returns the bin's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns how the bin's contents are ordered.
    #[must_use]
    pub fn sort_kind(&self) -> BinSort {
        self.sort_kind
    }

    /// Returns the bin's sort value relative to other bins; lower draws
    /// first.
    #[must_use]
    pub fn sort(&self) -> i32 {
        self.sort
    }
}

/// Registry of named render bins, indexed densely in creation order.
pub struct BinRegistry {
    bins: Vec<BinDef>,
}

impl BinRegistry {
    /// Returns the process-wide registry, created with the conventional
    /// default bins on first use.
    pub fn global() -> &'static Mutex<BinRegistry> {
        static REGISTRY: OnceLock<Mutex<BinRegistry>> = OnceLock::new();
        REGISTRY.get_or_init(|| Mutex::new(BinRegistry::with_default_bins()))
    }

    fn with_default_bins() -> Self {
        let mut registry = Self { bins: Vec::new() };
        registry.add_bin("background", BinSort::FixedOrder, 10);
        registry.add_bin("opaque", BinSort::StateSorted, 20);
        registry.add_bin("transparent", BinSort::BackToFront, 30);
        registry.add_bin("fixed", BinSort::FixedOrder, 40);
        registry.add_bin("unsorted", BinSort::Unsorted, 50);
        registry
    }

    /// Returns the index of the named bin, if registered.
    #[must_use]
    pub fn find_bin(&self, name: &str) -> Option<usize> {
        self.bins.iter().position(|bin| bin.name == name)
    }

    /// Registers a new bin and returns its index.
    pub fn add_bin(&mut self, name: &str, sort_kind: BinSort, sort: i32) -> usize {
        debug_assert!(
            self.find_bin(name).is_none(),
            "bin {name} registered twice"
        );
        self.bins.push(BinDef {
            name: name.to_owned(),
            sort_kind,
            sort,
        });
        self.bins.len() - 1
    }

    /// Returns the bin at `index`, if it exists.
    #[must_use]
    pub fn bin(&self, index: usize) -> Option<&BinDef> {
        self.bins.get(index)
    }

    /// Returns the number of registered bins.
    #[must_use]
    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrib::{CullBinAttrib, TransparencyAttrib, TransparencyMode};
    use crate::state::RenderState;

    #[test]
    fn test_default_bins_present() {
        let bins = BinRegistry::global().lock().unwrap();
        for name in ["background", "opaque", "transparent", "fixed", "unsorted"] {
            assert!(bins.find_bin(name).is_some(), "missing default bin {name}");
        }
    }

    #[test]
    fn test_opaque_is_the_fallback_bin() {
        let state = RenderState::make(
            crate::attrib::DepthTestAttrib::make(crate::attrib::DepthTestMode::LessEqual),
            4,
        );
        let opaque = BinRegistry::global().lock().unwrap().find_bin("opaque");
        assert_eq!(Some(state.bin_index()), opaque);
        assert_eq!(state.draw_order(), 0);
    }

    #[test]
    fn test_blended_transparency_selects_transparent_bin() {
        let state = RenderState::make(TransparencyAttrib::make(TransparencyMode::AlphaSorted), 0);
        let transparent = BinRegistry::global().lock().unwrap().find_bin("transparent");
        assert_eq!(Some(state.bin_index()), transparent);

        let multisample =
            RenderState::make(TransparencyAttrib::make(TransparencyMode::Multisample), 0);
        let opaque = BinRegistry::global().lock().unwrap().find_bin("opaque");
        assert_eq!(Some(multisample.bin_index()), opaque);
    }

    #[test]
    fn test_explicit_bin_and_draw_order() {
        let state = RenderState::make(CullBinAttrib::make("fixed", 7), 0);
        let fixed = BinRegistry::global().lock().unwrap().find_bin("fixed");
        assert_eq!(Some(state.bin_index()), fixed);
        assert_eq!(state.draw_order(), 7);
    }

    #[test]
    fn test_unknown_bin_recovered_with_default() {
        let state = RenderState::make(CullBinAttrib::make("glow-test-bin", 2), 0);
        let index = state.bin_index();
        let bins = BinRegistry::global().lock().unwrap();
        assert_eq!(bins.find_bin("glow-test-bin"), Some(index));
        assert_eq!(bins.bin(index).unwrap().sort_kind(), BinSort::Unsorted);
        drop(bins);
        // Cached; the second query must agree.
        assert_eq!(state.bin_index(), index);
        assert_eq!(state.draw_order(), 2);
    }
}
