//! Variable heap for local scalars, arrays, and records.
//!
//! Slots are keyed by [`UniqId`], never by source name, so shadowing never
//! merges scopes. Entries are born at `let`/`var`/`for` entry and removed on
//! exit in LIFO order via the insert/restore pair. In partial mode a slot
//! may hold a residual expression rather than a ground value.

use std::collections::HashMap;

use phylang_core::{Exp, Name, UniqId};

/// Mapping from variable identity to its current (possibly residual) value.
#[derive(Debug, Clone, Default)]
pub(crate) struct Heap {
    slots: HashMap<UniqId, Exp>,
}

impl Heap {
    pub fn new() -> Heap {
        Heap::default()
    }

    /// Seeds a heap from initial bindings (the caller-provided environment).
    pub fn from_bindings(bindings: &[(Name, Exp)]) -> Heap {
        let mut heap = Heap::new();
        for (name, value) in bindings {
            heap.slots.insert(name.id, value.clone());
        }
        heap
    }

    /// Binds `id`, returning the shadowed value if one existed. The caller
    /// must pass that value back to [`Heap::restore`] on scope exit.
    pub fn insert(&mut self, id: UniqId, value: Exp) -> Option<Exp> {
        self.slots.insert(id, value)
    }

    /// Undoes an [`Heap::insert`]: reinstates the shadowed value, or removes
    /// the slot if the binder was the first for this identity.
    pub fn restore(&mut self, id: UniqId, shadowed: Option<Exp>) {
        match shadowed {
            Some(prev) => {
                self.slots.insert(id, prev);
            }
            None => {
                self.slots.remove(&id);
            }
        }
    }

    pub fn read(&self, id: UniqId) -> Option<&Exp> {
        self.slots.get(&id)
    }

    /// Overwrites an existing slot. Returns `false` if the slot is absent --
    /// writes never create bindings.
    pub fn write(&mut self, id: UniqId, value: Exp) -> bool {
        match self.slots.get_mut(&id) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}
