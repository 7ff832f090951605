// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Signal buses.
//!
//! A [`SignalBus`] is a per-object channel for "something changed" notifications. The payload
//! is a [`Signal`] bitmask naming the reasons for the change; reasons combine with `|`.
//!
//! Dispatch is synchronous and fires every registered handler once, in registration order.
//! The listener list is snapshotted before firing, so a handler that unlistens another handler
//! does not prevent it from running in the current dispatch.
//!
//! While a bus is suspended, dispatched masks are accumulated instead. Resuming with
//! `dispatch_accumulated = true` fires a single coalesced dispatch carrying the union of the
//! accumulated masks; resuming with `false` drops them.

use alloc::rc::Rc;
use core::cell::{Cell, RefCell};
use core::fmt;

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::id::ObjectId;

bitflags! {
    /// A bitmask of change reasons carried by a [`SignalEvent`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Signal: u32 {
        /// Rendered output must be redrawn.
        const NEEDS_REDRAW = 1 << 0;
        /// Settings must be re-applied without recalculating (e.g. a scale's explicit range moved).
        const NEEDS_REAPPLICATION = 1 << 1;
        /// Derived values (statistics, scale ranges) must be recalculated.
        const NEEDS_RECALCULATION = 1 << 2;
        /// The object's bounds changed.
        const BOUNDS_CHANGED = 1 << 3;
        /// The underlying data changed.
        const DATA_CHANGED = 1 << 4;
        /// Per-point meta changed.
        const META_CHANGED = 1 << 5;
        /// Legend items must be rebuilt.
        const NEED_UPDATE_LEGEND = 1 << 6;
        /// Only appearance (fill/stroke) must be redrawn.
        const NEEDS_REDRAW_APPEARANCE = 1 << 7;
        /// Labels must be redrawn.
        const NEEDS_REDRAW_LABELS = 1 << 8;
        /// The enabled flag changed.
        const ENABLED_STATE_CHANGED = 1 << 9;
        /// The z-index changed.
        const Z_INDEX_STATE_CHANGED = 1 << 10;
        /// A color range fed by this object must be updated.
        const NEED_UPDATE_COLOR_RANGE = 1 << 11;

        /// Signals every visual element can emit.
        const VISUAL_BASE = Self::NEEDS_REDRAW.bits()
            | Self::BOUNDS_CHANGED.bits()
            | Self::ENABLED_STATE_CHANGED.bits()
            | Self::Z_INDEX_STATE_CHANGED.bits();

        /// Every bit, including ones no constant names yet.
        const ALL = u32::MAX;
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::NONE
    }
}

impl Signal {
    /// The empty mask.
    pub const NONE: Self = Self::empty();

    /// Returns `true` if the mask asks for any kind of redraw.
    #[must_use]
    pub fn needs_redraw(self) -> bool {
        self.intersects(
            Self::NEEDS_REDRAW | Self::NEEDS_REDRAW_APPEARANCE | Self::NEEDS_REDRAW_LABELS,
        )
    }

    /// Returns `true` if the mask asks for recalculation.
    #[must_use]
    pub fn needs_recalculation(self) -> bool {
        self.intersects(Self::NEEDS_RECALCULATION)
    }

    /// Returns `true` if the mask reports changed bounds.
    #[must_use]
    pub fn bounds_changed(self) -> bool {
        self.intersects(Self::BOUNDS_CHANGED)
    }

    /// Returns `true` if the mask reports changed data.
    #[must_use]
    pub fn data_changed(self) -> bool {
        self.intersects(Self::DATA_CHANGED)
    }

    /// Returns `true` if the mask asks for a legend update.
    #[must_use]
    pub fn needs_legend_update(self) -> bool {
        self.intersects(Self::NEED_UPDATE_LEGEND)
    }
}

/// A dispatched notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignalEvent {
    /// The object whose bus dispatched the event.
    pub source: ObjectId,
    /// The change reasons.
    pub signal: Signal,
}

impl SignalEvent {
    /// Returns `true` if the event carries any bit of `mask`.
    #[must_use]
    pub fn has_signal(&self, mask: Signal) -> bool {
        self.signal.intersects(mask)
    }
}

/// Identifies one registration on one bus.
///
/// Keys are only unique per bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerKey(u64);

type Handler = Rc<dyn Fn(&SignalEvent)>;

struct Listener {
    key: ListenerKey,
    handler: Handler,
}

/// A per-object notification channel.
pub struct SignalBus {
    source: ObjectId,
    supported: Signal,
    listeners: RefCell<SmallVec<[Listener; 2]>>,
    next_key: Cell<u64>,
    suspended: Cell<u32>,
    accumulated: Cell<Signal>,
}

impl fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalBus")
            .field("source", &self.source)
            .field("supported", &self.supported)
            .field("listeners", &self.listener_count())
            .field("suspended", &self.suspended.get())
            .field("accumulated", &self.accumulated.get())
            .finish_non_exhaustive()
    }
}

impl SignalBus {
    /// Creates a bus for `source` that only ever emits bits in `supported`.
    #[must_use]
    pub fn new(source: ObjectId, supported: Signal) -> Self {
        Self {
            source,
            supported,
            listeners: RefCell::new(SmallVec::new()),
            next_key: Cell::new(0),
            suspended: Cell::new(0),
            accumulated: Cell::new(Signal::NONE),
        }
    }

    /// Returns the id carried as the event source.
    #[must_use]
    pub fn source(&self) -> ObjectId {
        self.source
    }

    /// Returns the signals this bus can emit.
    #[must_use]
    pub fn supported(&self) -> Signal {
        self.supported
    }

    /// Registers `handler` and returns the key that removes it again.
    pub fn listen(&self, handler: impl Fn(&SignalEvent) + 'static) -> ListenerKey {
        let key = ListenerKey(self.next_key.get());
        self.next_key.set(key.0 + 1);
        self.listeners.borrow_mut().push(Listener {
            key,
            handler: Rc::new(handler),
        });
        key
    }

    /// Removes exactly the registration identified by `key`.
    ///
    /// Returns `false` if no such registration exists.
    pub fn unlisten(&self, key: ListenerKey) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|l| l.key != key);
        listeners.len() != before
    }

    /// Returns `true` if `key` is currently registered.
    #[must_use]
    pub fn is_listening(&self, key: ListenerKey) -> bool {
        self.listeners.borrow().iter().any(|l| l.key == key)
    }

    /// Returns the number of registered handlers.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Removes every registration.
    pub fn clear_listeners(&self) {
        self.listeners.borrow_mut().clear();
    }

    /// Dispatches `signal` (restricted to the supported set).
    ///
    /// Returns `true` if handlers were invoked. Nothing fires for an empty mask, and nothing
    /// fires while the bus is suspended.
    pub fn dispatch(&self, signal: Signal) -> bool {
        let signal = signal & self.supported;
        if signal.is_empty() {
            return false;
        }
        if self.suspended.get() > 0 {
            self.accumulated.set(self.accumulated.get() | signal);
            return false;
        }

        let snapshot: SmallVec<[Handler; 4]> = self
            .listeners
            .borrow()
            .iter()
            .map(|l| l.handler.clone())
            .collect();
        tracing::trace!(
            source = self.source.raw(),
            signal = signal.bits(),
            listeners = snapshot.len(),
            "dispatch"
        );
        let event = SignalEvent {
            source: self.source,
            signal,
        };
        for handler in snapshot {
            handler(&event);
        }
        true
    }

    /// Starts accumulating dispatches instead of firing them.
    ///
    /// Suspension nests; each call must be matched by a [`resume_dispatching`](Self::resume_dispatching).
    pub fn suspend_dispatching(&self) {
        self.suspended.set(self.suspended.get() + 1);
    }

    /// Ends one level of suspension.
    ///
    /// When the outermost level ends, the accumulated mask is either dispatched once or dropped.
    /// Returns `true` if a coalesced dispatch fired.
    pub fn resume_dispatching(&self, dispatch_accumulated: bool) -> bool {
        let depth = self.suspended.get();
        if depth == 0 {
            return false;
        }
        self.suspended.set(depth - 1);
        if depth > 1 {
            return false;
        }
        let accumulated = self.accumulated.replace(Signal::NONE);
        if dispatch_accumulated && !accumulated.is_empty() {
            self.dispatch(accumulated)
        } else {
            false
        }
    }

    /// Returns `true` while dispatching is suspended.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspended.get() > 0
    }
}
