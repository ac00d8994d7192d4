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

//! Process-wide interning table for render states.
//!
//! Every candidate slot sequence passes through [`intern`] before any caller
//! sees a state, which is what makes pointer comparison a valid equality
//! test between states. The table holds weak handles only: an interned state
//! lives exactly as long as its external references, and removes its own
//! entry when it drops.

use super::slot::AttribSlot;
use super::{RenderState, StateRef};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ptr;
use std::sync::{Arc, Mutex, OnceLock, Weak};

/// Owned copy of a slot sequence, ordered by full value comparison.
pub(crate) struct StateKey(Vec<AttribSlot>);

impl PartialEq for StateKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for StateKey {}

impl PartialOrd for StateKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StateKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let mut ai = self.0.iter();
        let mut bi = other.0.iter();
        loop {
            match (ai.next(), bi.next()) {
                (Some(a), Some(b)) => {
                    let ord = a.compare_to(b);
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
}

fn table() -> &'static Mutex<BTreeMap<StateKey, Weak<RenderState>>> {
    static STATES: OnceLock<Mutex<BTreeMap<StateKey, Weak<RenderState>>>> = OnceLock::new();
    STATES.get_or_init(Mutex::default)
}

/// Returns the canonical shared instance for `slots`.
///
/// If an equal state is already registered, the candidate sequence is
/// discarded and the existing instance returned; otherwise a new state is
/// built and registered. `slots` must already be sorted by type with no
/// duplicates.
pub(crate) fn intern(slots: Vec<AttribSlot>) -> StateRef {
    let mut table = table().lock().unwrap();
    let key = StateKey(slots.clone());
    if let Some(existing) = table.get(&key).and_then(Weak::upgrade) {
        return existing;
    }
    let state = RenderState::new_interned(slots);
    // A dead weak entry for the same value may still be present while its
    // state runs Drop on another thread; replace it.
    table.insert(key, Arc::downgrade(&state));
    state
}

/// Removes `state`'s registry entry, called from its `Drop`.
///
/// The entry is only removed if it still refers to this instance; a racing
/// [`intern`] of the same value may already have replaced it.
pub(crate) fn unregister(state: &RenderState) {
    let mut table = table().lock().unwrap();
    let key = StateKey(state.slots().to_vec());
    if let Some(entry) = table.get(&key) {
        if ptr::eq(entry.as_ptr(), state) {
            table.remove(&key);
        }
    }
}

/// Number of states currently registered, counting entries whose state is
/// mid-teardown.
pub(crate) fn len() -> usize {
    table().lock().unwrap().len()
}
