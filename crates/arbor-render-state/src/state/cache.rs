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

//! Bookkeeping structures for the pairwise composition caches.
//!
//! Cache entries exist in reciprocal pairs: if `A` has an entry for `B`,
//! `B` has one for `A`, although only the side that first computed a result
//! stores it. The pairing is what lets a dying state find and erase every
//! entry that refers to it; see the `Drop` impl in
//! [`state`](crate::state).

use super::{RenderState, StateRef};
use std::collections::HashMap;
use std::sync::Weak;

/// Address-based identity of a state, used as a cache key.
///
/// Interned states are identity-compared everywhere, so the address is the
/// key; the peer handle inside the entry keeps the address meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct StateId(usize);

impl StateId {
    pub(crate) fn of(state: &RenderState) -> Self {
        Self(state as *const RenderState as usize)
    }
}

/// One direction of a cached composition pair.
///
/// `result` is `None` on the side that has not computed its direction yet;
/// the reciprocal entry is created eagerly so teardown stays symmetric.
pub(crate) struct CacheEntry {
    /// Non-owning handle to the peer state. Upgrade fails only while the
    /// peer is already tearing itself down.
    pub(crate) peer: Weak<RenderState>,
    /// The composition result, owned by this side once computed.
    pub(crate) result: Option<StateRef>,
}

/// `compose(X, X)` cannot live in the keyed map (the map would contain its
/// own state as a key), so it is cached as a separate field.
#[derive(Default)]
pub(crate) enum SelfCompose {
    /// Not computed yet.
    #[default]
    Unset,
    /// The self-composition produced the state itself; no handle is stored,
    /// a self-referential strong count would never drop.
    SameAsSelf,
    /// The self-composition is a different state; the handle is released in
    /// the owner's `Drop`.
    Other(StateRef),
}

/// The mutable, transparent part of a state. Not part of value identity.
#[derive(Default)]
pub(crate) struct StateCaches {
    pub(crate) compose: HashMap<StateId, CacheEntry>,
    pub(crate) invert_compose: HashMap<StateId, CacheEntry>,
    pub(crate) self_compose: SelfCompose,
}
