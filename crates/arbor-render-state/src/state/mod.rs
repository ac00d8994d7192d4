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

//! Interned render states and their composition caches.
//!
//! A [`RenderState`] is an immutable, sorted set of attribute slots, one per
//! attribute type. Every construction path funnels the candidate slot
//! sequence through the process-wide interning registry, so two logically
//! equal states are always the same `Arc` and consumers compare states by
//! pointer only.
//!
//! Composing two states is memoized per ordered pair. Cache entries are
//! created in reciprocal pairs across both participants, which is what lets
//! a state find and erase every entry referring to it when it drops; the
//! teardown protocol tolerates the cascading destruction that erasing an
//! entry can trigger.

mod cache;
mod registry;
mod slot;

pub use slot::AttribSlot;

use crate::attrib::{AttribRef, AttribType, BillboardAttrib, CullBinAttrib, TransparencyAttrib};
use crate::bins::{BinRegistry, BinSort};
use crate::device::GraphicsDevice;
use cache::{CacheEntry, SelfCompose, StateCaches, StateId};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::ptr;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};

/// A shared handle to an interned render state.
pub type StateRef = Arc<RenderState>;

#[derive(Clone, Copy)]
struct BinPlacement {
    bin_index: usize,
    draw_order: i32,
}

/// An immutable, interned set of render attributes.
///
/// States are only ever created through the associated factory functions
/// ([`make`](Self::make), [`add_attrib`](Self::add_attrib),
/// [`compose`](Self::compose), ...), all of which return the canonical shared
/// instance for the resulting attribute set. The slot sequence is fixed at
/// construction; only the transparent caches mutate afterwards.
pub struct RenderState {
    slots: Vec<AttribSlot>,
    weak_self: Weak<RenderState>,
    caches: Mutex<StateCaches>,
    bin_placement: OnceLock<BinPlacement>,
    billboard: OnceLock<Option<AttribRef>>,
}

impl RenderState {
    /// Returns the canonical state with no attributes.
    pub fn empty() -> StateRef {
        static EMPTY: OnceLock<StateRef> = OnceLock::new();
        EMPTY.get_or_init(|| registry::intern(Vec::new())).clone()
    }

    /// Returns the interned state holding a single attribute.
    pub fn make(attrib: AttribRef, override_priority: i32) -> StateRef {
        registry::intern(vec![AttribSlot::new(attrib, override_priority)])
    }

    /// Returns the interned state holding the given attributes.
    ///
    /// The attribute types must be distinct; two entries of the same type
    /// are a caller error.
    pub fn make_with(attribs: &[(AttribRef, i32)]) -> StateRef {
        let mut slots: Vec<AttribSlot> = attribs
            .iter()
            .map(|(attrib, override_priority)| AttribSlot::new(attrib.clone(), *override_priority))
            .collect();
        slots.sort_by(|a, b| a.type_cmp(b));
        debug_assert!(
            slots.windows(2).all(|w| w[0].ty() != w[1].ty()),
            "duplicate attribute type in make_with"
        );
        registry::intern(slots)
    }

    /// Returns a state like this one with `attrib` added, replacing any
    /// existing attribute of the same type.
    pub fn add_attrib(&self, attrib: AttribRef, override_priority: i32) -> StateRef {
        let new_slot = AttribSlot::new(attrib, override_priority);
        let new_ty = new_slot.ty();
        let mut slots = Vec::with_capacity(self.slots.len() + 1);

        let mut iter = self.slots.iter().peekable();
        while let Some(slot) = iter.peek() {
            if slot.ty() >= new_ty {
                break;
            }
            slots.push((*slot).clone());
            iter.next();
        }
        slots.push(new_slot);
        if let Some(slot) = iter.peek() {
            // Skip an existing slot of the same type; it has been replaced.
            if slot.ty() == new_ty {
                iter.next();
            }
        }
        slots.extend(iter.cloned());

        registry::intern(slots)
    }

    /// Returns a state like this one without any attribute of type `ty`.
    pub fn remove_attrib(&self, ty: AttribType) -> StateRef {
        let slots = self
            .slots
            .iter()
            .filter(|slot| slot.ty() != ty)
            .cloned()
            .collect();
        registry::intern(slots)
    }

    /// Returns the slot index of the attribute with type `ty`, if present.
    #[must_use]
    pub fn find_attrib(&self, ty: AttribType) -> Option<usize> {
        self.slots.binary_search_by(|slot| slot.ty().cmp(&ty)).ok()
    }

    /// Returns the attribute with type `ty`, if present.
    #[must_use]
    pub fn get_attrib(&self, ty: AttribType) -> Option<&AttribRef> {
        self.find_attrib(ty).map(|index| self.slots[index].attrib())
    }

    /// Returns the attribute with type `ty` downcast to its concrete kind.
    #[must_use]
    pub fn typed_attrib<T: 'static>(&self, ty: AttribType) -> Option<&T> {
        self.get_attrib(ty)?.as_any().downcast_ref::<T>()
    }

    /// Returns the override priority of the attribute with type `ty`, if
    /// present.
    #[must_use]
    pub fn get_override(&self, ty: AttribType) -> Option<i32> {
        self.find_attrib(ty)
            .map(|index| self.slots[index].override_priority())
    }

    /// Returns the number of attributes in this state.
    #[must_use]
    pub fn num_attribs(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if this state holds no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the state representing "apply `self`, then apply `other` on
    /// top".
    ///
    /// The result is cached per ordered pair and retained as long as both
    /// participants exist; once cached, repeated calls return the identical
    /// pointer.
    pub fn compose(&self, other: &RenderState) -> StateRef {
        if self.is_empty() {
            return other.to_ref();
        }
        if other.is_empty() {
            return self.to_ref();
        }
        if ptr::eq(self, other) {
            // The cache key (ourselves) cannot live in the keyed map.
            return self.compose_with_self();
        }

        let other_id = StateId::of(other);
        {
            let caches = self.caches.lock().unwrap();
            if let Some(CacheEntry {
                result: Some(result),
                ..
            }) = caches.compose.get(&other_id)
            {
                return result.clone();
            }
        }

        let computed = self.do_compose(other);
        let result = {
            let mut caches = self.caches.lock().unwrap();
            let entry = caches
                .compose
                .entry(other_id)
                .or_insert_with(|| CacheEntry {
                    peer: other.weak_self.clone(),
                    result: None,
                });
            match &entry.result {
                // Another thread filled this direction first; keep its
                // pointer so repeated composition stays identity-stable.
                Some(existing) => existing.clone(),
                None => {
                    entry.result = Some(computed.clone());
                    computed
                }
            }
        };
        // The reciprocal entry tells `other` to unlink our entry when it
        // destructs. Its result stays unfilled until queried.
        {
            let mut caches = other.caches.lock().unwrap();
            caches
                .compose
                .entry(StateId::of(self))
                .or_insert_with(|| CacheEntry {
                    peer: self.weak_self.clone(),
                    result: None,
                });
        }
        result
    }

    /// Returns the state representing "undo `self`, then apply `other`".
    ///
    /// Used for computing the net state of a node relative to another node.
    /// Cached like [`compose`](Self::compose), in a separate map.
    pub fn invert_compose(&self, other: &RenderState) -> StateRef {
        if self.is_empty() {
            return other.to_ref();
        }
        if ptr::eq(self, other) {
            // Undoing ourselves and applying ourselves is a wash.
            return Self::empty();
        }

        let other_id = StateId::of(other);
        {
            let caches = self.caches.lock().unwrap();
            if let Some(CacheEntry {
                result: Some(result),
                ..
            }) = caches.invert_compose.get(&other_id)
            {
                return result.clone();
            }
        }

        let computed = self.do_invert_compose(other);
        let result = {
            let mut caches = self.caches.lock().unwrap();
            let entry = caches
                .invert_compose
                .entry(other_id)
                .or_insert_with(|| CacheEntry {
                    peer: other.weak_self.clone(),
                    result: None,
                });
            match &entry.result {
                Some(existing) => existing.clone(),
                None => {
                    entry.result = Some(computed.clone());
                    computed
                }
            }
        };
        {
            let mut caches = other.caches.lock().unwrap();
            caches
                .invert_compose
                .entry(StateId::of(self))
                .or_insert_with(|| CacheEntry {
                    peer: self.weak_self.clone(),
                    result: None,
                });
        }
        result
    }

    /// Issues the attribute changes that take the device from this state to
    /// `next`.
    ///
    /// Attributes new in `next`, or present in both but different, are
    /// issued; attribute types present here but absent from `next` issue
    /// their default value so the device does not keep stale settings.
    pub fn issue_delta(&self, next: &RenderState, device: &mut dyn GraphicsDevice) {
        if ptr::eq(self, next) {
            return;
        }

        let (a, b) = (&self.slots, &next.slots);
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].type_cmp(&b[j]) {
                Ordering::Less => {
                    a[i].attrib().make_default().issue(device);
                    i += 1;
                }
                Ordering::Greater => {
                    b[j].attrib().issue(device);
                    j += 1;
                }
                Ordering::Equal => {
                    let unchanged = Arc::ptr_eq(a[i].attrib(), b[j].attrib())
                        || a[i].attrib().compare_to(b[j].attrib().as_ref()) == Ordering::Equal;
                    if !unchanged {
                        b[j].attrib().issue(device);
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        while i < a.len() {
            a[i].attrib().make_default().issue(device);
            i += 1;
        }
        while j < b.len() {
            b[j].attrib().issue(device);
            j += 1;
        }
    }

    /// Returns the index of the render bin this state sorts into.
    ///
    /// Resolved once per state and cached. A state with no explicit bin
    /// falls into `opaque`, or `transparent` when its transparency mode
    /// needs back-to-front sorting.
    #[must_use]
    pub fn bin_index(&self) -> usize {
        self.bin_placement().bin_index
    }

    /// Returns the draw order within the render bin. Cached with
    /// [`bin_index`](Self::bin_index).
    #[must_use]
    pub fn draw_order(&self) -> i32 {
        self.bin_placement().draw_order
    }

    /// Returns the billboard attribute, if this state carries one. Cached on
    /// first access.
    #[must_use]
    pub fn billboard(&self) -> Option<&AttribRef> {
        self.billboard
            .get_or_init(|| self.get_attrib(BillboardAttrib::TYPE).cloned())
            .as_ref()
    }

    /// Returns `true` if this state carries a billboard attribute.
    #[must_use]
    pub fn has_billboard(&self) -> bool {
        self.billboard().is_some()
    }

    /// Number of entries currently held in this state's composition cache.
    #[must_use]
    pub fn composition_cache_size(&self) -> usize {
        self.caches.lock().unwrap().compose.len()
    }

    /// Number of entries currently held in this state's invert-composition
    /// cache.
    #[must_use]
    pub fn invert_composition_cache_size(&self) -> usize {
        self.caches.lock().unwrap().invert_compose.len()
    }

    /// Number of distinct states currently interned process-wide.
    #[must_use]
    pub fn registered_state_count() -> usize {
        registry::len()
    }

    pub(crate) fn new_interned(slots: Vec<AttribSlot>) -> StateRef {
        Arc::new_cyclic(|weak| RenderState {
            slots,
            weak_self: weak.clone(),
            caches: Mutex::default(),
            bin_placement: OnceLock::new(),
            billboard: OnceLock::new(),
        })
    }

    pub(crate) fn slots(&self) -> &[AttribSlot] {
        &self.slots
    }

    /// Interning entry point for sibling modules building slot sequences of
    /// their own (the record reader).
    pub(crate) fn intern(slots: Vec<AttribSlot>) -> StateRef {
        registry::intern(slots)
    }

    fn to_ref(&self) -> StateRef {
        self.weak_self
            .upgrade()
            .expect("render state used while being destroyed")
    }

    fn compose_with_self(&self) -> StateRef {
        let mut caches = self.caches.lock().unwrap();
        match &caches.self_compose {
            SelfCompose::SameAsSelf => self.to_ref(),
            SelfCompose::Other(result) => result.clone(),
            SelfCompose::Unset => {
                let result = self.do_compose(self);
                caches.self_compose = if ptr::eq(Arc::as_ptr(&result), self) {
                    SelfCompose::SameAsSelf
                } else {
                    SelfCompose::Other(result.clone())
                };
                result
            }
        }
    }

    /// Merges the two sorted slot sequences; the actual composition, without
    /// the cache.
    fn do_compose(&self, other: &RenderState) -> StateRef {
        let (a, b) = (&self.slots, &other.slots);
        let mut slots = Vec::with_capacity(a.len() + b.len());

        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].type_cmp(&b[j]) {
                Ordering::Less => {
                    slots.push(a[i].clone());
                    i += 1;
                }
                Ordering::Greater => {
                    slots.push(b[j].clone());
                    j += 1;
                }
                Ordering::Equal => {
                    let (sa, sb) = (&a[i], &b[j]);
                    let slot = match sa.override_priority().cmp(&sb.override_priority()) {
                        // The higher override wins outright; its slot is
                        // copied verbatim.
                        Ordering::Less => sb.clone(),
                        Ordering::Greater => sa.clone(),
                        // Equal overrides defer to the attribute's own
                        // composition semantics.
                        Ordering::Equal => AttribSlot::new(
                            sa.attrib().compose(sb.attrib()),
                            sb.override_priority(),
                        ),
                    };
                    slots.push(slot);
                    i += 1;
                    j += 1;
                }
            }
        }
        slots.extend_from_slice(&a[i..]);
        slots.extend_from_slice(&b[j..]);

        registry::intern(slots)
    }

    /// The actual invert-composition, without the cache. Slots present only
    /// on this side are inverted against their kind's default.
    fn do_invert_compose(&self, other: &RenderState) -> StateRef {
        let (a, b) = (&self.slots, &other.slots);
        let mut slots = Vec::with_capacity(a.len() + b.len());

        let invert_alone = |slot: &AttribSlot| {
            let attrib = slot.attrib();
            AttribSlot::new(attrib.invert_compose(&attrib.make_default()), 0)
        };

        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].type_cmp(&b[j]) {
                Ordering::Less => {
                    slots.push(invert_alone(&a[i]));
                    i += 1;
                }
                Ordering::Greater => {
                    slots.push(b[j].clone());
                    j += 1;
                }
                Ordering::Equal => {
                    // Override is meaningless under inversion; the result
                    // keeps the other side's.
                    slots.push(AttribSlot::new(
                        a[i].attrib().invert_compose(b[j].attrib()),
                        b[j].override_priority(),
                    ));
                    i += 1;
                    j += 1;
                }
            }
        }
        while i < a.len() {
            slots.push(invert_alone(&a[i]));
            i += 1;
        }
        slots.extend_from_slice(&b[j..]);

        registry::intern(slots)
    }

    fn bin_placement(&self) -> BinPlacement {
        *self.bin_placement.get_or_init(|| self.determine_bin_placement())
    }

    fn determine_bin_placement(&self) -> BinPlacement {
        let mut bin_name = String::new();
        let mut draw_order = 0;

        if let Some(bin) = self.typed_attrib::<CullBinAttrib>(CullBinAttrib::TYPE) {
            bin_name = bin.bin_name().to_owned();
            draw_order = bin.draw_order();
        }

        if bin_name.is_empty() {
            // No explicit bin; pick opaque or transparent from the
            // transparency setting.
            bin_name = "opaque".to_owned();
            if let Some(transparency) =
                self.typed_attrib::<TransparencyAttrib>(TransparencyAttrib::TYPE)
            {
                if transparency.mode().requires_back_to_front() {
                    bin_name = "transparent".to_owned();
                }
            }
        }

        let mut bins = BinRegistry::global().lock().unwrap();
        let bin_index = match bins.find_bin(&bin_name) {
            Some(index) => index,
            None => {
                log::warn!("no bin named {bin_name}; creating default bin");
                bins.add_bin(&bin_name, BinSort::Unsorted, 0)
            }
        };

        BinPlacement {
            bin_index,
            draw_order,
        }
    }

    /// Erases the reciprocal entry in every peer referenced by `entries`.
    ///
    /// `entries` is a snapshot already taken out of the dying state's own
    /// cache map, so cascading destruction triggered by dropping an entry's
    /// result handle can never invalidate what we iterate. No lock is held
    /// when anything is dropped.
    fn unlink_peer_entries(
        self_id: StateId,
        entries: HashMap<StateId, CacheEntry>,
        select: fn(&mut StateCaches) -> &mut HashMap<StateId, CacheEntry>,
    ) {
        for (peer_id, entry) in entries {
            debug_assert!(
                peer_id != self_id,
                "render state cached a composition with itself"
            );
            // A peer that fails to upgrade is already tearing itself down;
            // it can no longer reach us either.
            let Some(peer) = entry.peer.upgrade() else {
                continue;
            };
            let removed = {
                let mut peer_caches = peer.caches.lock().unwrap();
                select(&mut peer_caches).remove(&self_id)
            };
            drop(removed);
        }
    }
}

impl Drop for RenderState {
    fn drop(&mut self) {
        registry::unregister(self);

        // Snapshot-then-advance: take the whole cache out before touching
        // any peer. Every state that has us in its cache is a state we have
        // in ours, since entries are created in pairs.
        let caches = mem::take(
            self.caches
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let self_id = StateId::of(self);
        Self::unlink_peer_entries(self_id, caches.compose, |peer| &mut peer.compose);
        Self::unlink_peer_entries(self_id, caches.invert_compose, |peer| &mut peer.invert_compose);
        // `caches.self_compose` drops here, releasing the strong handle on a
        // distinct self-composition result if one was stored.
    }
}

impl fmt::Debug for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RenderState(")?;
        for (index, slot) in self.slots.iter().enumerate() {
            if index > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", slot.ty())?;
        }
        write!(f, ")")
    }
}
