// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Arena of every remote handle a session has acquired.
//!
//! Slots are appended in acquisition order and never removed, so cleanup can
//! walk them deterministically and a second release of the same handle is
//! recognised as a double free instead of an unknown handle.

use std::collections::HashMap;

use crate::errors::{SessionError, SessionResult};
use crate::protocol::{RemoteHandle, ResourceKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotStatus {
    Live,
    Released,
}

#[derive(Debug, Clone)]
struct Slot {
    handle: RemoteHandle,
    /// Definition this handle depends on (engines and compiled actions).
    owner: Option<RemoteHandle>,
    status: SlotStatus,
}

#[derive(Debug, Default)]
pub struct HandleRegistry {
    slots: Vec<Slot>,
    index: HashMap<RemoteHandle, usize>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly acquired handle.
    ///
    /// A server may reuse the identifier of a released handle; a handle that is
    /// still live cannot be handed out twice.
    pub fn register(
        &mut self,
        handle: RemoteHandle,
        owner: Option<RemoteHandle>,
    ) -> SessionResult<()> {
        if let Some(&slot) = self.index.get(&handle) {
            if self.slots[slot].status == SlotStatus::Live {
                return Err(SessionError::UnexpectedResponse {
                    operation: "register",
                    response: format!("{} handed out while still live", handle),
                });
            }
        }
        self.index.insert(handle, self.slots.len());
        self.slots.push(Slot {
            handle,
            owner,
            status: SlotStatus::Live,
        });
        Ok(())
    }

    fn status(&self, handle: RemoteHandle) -> Option<SlotStatus> {
        self.index.get(&handle).map(|&slot| self.slots[slot].status)
    }

    /// Fails unless `handle` is owned by this session and not yet released.
    pub fn check_live(&self, handle: RemoteHandle) -> SessionResult<()> {
        match self.status(handle) {
            Some(SlotStatus::Live) => Ok(()),
            Some(SlotStatus::Released) => Err(SessionError::UseAfterFree { handle }),
            None => Err(SessionError::UnknownHandle { handle }),
        }
    }

    /// Like [`check_live`](Self::check_live) but reports a released handle as a
    /// double free.
    pub fn check_releasable(&self, handle: RemoteHandle) -> SessionResult<()> {
        match self.status(handle) {
            Some(SlotStatus::Live) => Ok(()),
            Some(SlotStatus::Released) => Err(SessionError::DoubleFree { handle }),
            None => Err(SessionError::UnknownHandle { handle }),
        }
    }

    pub fn mark_released(&mut self, handle: RemoteHandle) {
        if let Some(&slot) = self.index.get(&handle) {
            self.slots[slot].status = SlotStatus::Released;
        }
    }

    fn live_slots(&self) -> impl DoubleEndedIterator<Item = &Slot> {
        self.slots.iter().filter(|s| s.status == SlotStatus::Live)
    }

    pub fn live_count(&self) -> usize {
        self.live_slots().count()
    }

    pub fn live_of_kind(&self, kind: ResourceKind) -> Vec<RemoteHandle> {
        self.live_slots()
            .filter(|s| s.handle.kind == kind)
            .map(|s| s.handle)
            .collect()
    }

    /// Number of live handles that were derived from `owner`.
    pub fn live_dependents(&self, owner: RemoteHandle) -> usize {
        self.live_slots().filter(|s| s.owner == Some(owner)).count()
    }

    /// Live buffers and compiled actions, most recently acquired first.
    pub fn releasable_in_reverse(&self) -> Vec<RemoteHandle> {
        self.live_slots()
            .rev()
            .filter(|s| matches!(s.handle.kind, ResourceKind::Buffer | ResourceKind::Action))
            .map(|s| s.handle)
            .collect()
    }

    /// Order in which an aborted session gives its handles back: engines first,
    /// then buffers and compiled actions, then definitions, each group newest
    /// first.
    pub fn teardown_order(&self) -> Vec<RemoteHandle> {
        let newest_first = |kind: ResourceKind| {
            self.live_slots()
                .rev()
                .filter(move |s| s.handle.kind == kind)
                .map(|s| s.handle)
                .collect::<Vec<_>>()
        };

        let mut order = newest_first(ResourceKind::Engine);
        order.extend(self.releasable_in_reverse());
        order.extend(newest_first(ResourceKind::Definition));
        order
    }
}
