// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Visual elements.
//!
//! Every drawable entity owns an [`ElementCore`] behind an `Rc`. The core holds the consistency
//! tracker, the signal bus, geometry, the container binding and the bookkeeping needed to
//! dispose the element cleanly. Everything is interior-mutable so that setters, signal handlers
//! and draw calls all take `&self`.
//!
//! Lifecycle:
//!
//! ```text
//!   new ──► (all supported bits dirty) ──draw──► clean ──setter/signal──► dirty ──draw──► …
//!                                                                                │
//!   dispose (any time) ──► disposed: invalidate is ignored, draw fails ◄─────────┘
//! ```

use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use kurbo::Rect;

use crate::consistency::{ConsistencyState, ConsistencyTracker};
use crate::error::DrawError;
use crate::id::ObjectId;
use crate::reporting::{self, ErrorCode, WarningCode};
use crate::scale::Scale;
use crate::signal::{ListenerKey, Signal, SignalBus, SignalEvent};
use crate::surface::{NodeId, Surface};

/// What an element's `draw` must do, as decided by
/// [`ElementCore::check_drawing_needed`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawCheck {
    /// Nothing is dirty.
    Clean,
    /// The element is disabled and its output is already removed.
    Skip,
    /// The element was just disabled; its rendered output must be removed.
    Remove,
    /// Dirty phases must be repaired.
    Draw,
}

#[derive(Debug)]
struct Subscription {
    bus: Weak<SignalBus>,
    key: ListenerKey,
}

/// Link from a child to the composite that owns it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct OwnerLink {
    pub(crate) owner: ObjectId,
    pub(crate) key: ListenerKey,
}

/// State shared by every visual element.
pub struct ElementCore {
    id: ObjectId,
    tracker: ConsistencyTracker,
    bus: Rc<SignalBus>,
    bounds: Cell<Option<Rect>>,
    parent_bounds: Cell<Option<Rect>>,
    container: Cell<Option<NodeId>>,
    z_index: Cell<i32>,
    enabled: Cell<bool>,
    disposed: Cell<bool>,
    subscriptions: RefCell<Vec<Subscription>>,
    owner: Cell<Option<OwnerLink>>,
    repairs: Cell<u64>,
}

impl fmt::Debug for ElementCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementCore")
            .field("id", &self.id)
            .field("dirty", &self.tracker.dirty())
            .field("bounds", &self.bounds.get())
            .field("container", &self.container.get())
            .field("enabled", &self.enabled.get())
            .field("disposed", &self.disposed.get())
            .finish_non_exhaustive()
    }
}

impl ElementCore {
    /// Creates a core supporting `states` and emitting `signals`.
    ///
    /// Every supported state starts dirty so the first draw does full work.
    #[must_use]
    pub fn new(states: ConsistencyState, signals: Signal) -> Rc<Self> {
        let id = ObjectId::next();
        Rc::new(Self {
            id,
            tracker: ConsistencyTracker::new(states),
            bus: Rc::new(SignalBus::new(id, signals)),
            bounds: Cell::new(None),
            parent_bounds: Cell::new(None),
            container: Cell::new(None),
            z_index: Cell::new(0),
            enabled: Cell::new(true),
            disposed: Cell::new(false),
            subscriptions: RefCell::new(Vec::new()),
            owner: Cell::new(None),
            repairs: Cell::new(0),
        })
    }

    /// Returns the element id.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Returns the element's own bus.
    #[must_use]
    pub fn bus(&self) -> &Rc<SignalBus> {
        &self.bus
    }

    /// Returns the supported consistency states.
    #[must_use]
    pub fn supported_states(&self) -> ConsistencyState {
        self.tracker.supported()
    }

    // --- consistency ---

    /// Marks the supported part of `state` dirty and dispatches `signal`.
    ///
    /// A non-empty `state` that is entirely unsupported does nothing at all. An empty `state`
    /// is a pure notification. The signal is dispatched even if the bits were already dirty.
    /// Returns the bits that went from clean to dirty. Disposed elements ignore the call.
    pub fn invalidate(&self, state: ConsistencyState, signal: Signal) -> ConsistencyState {
        if self.disposed.get() {
            return ConsistencyState::NONE;
        }
        if !state.is_empty() && !state.intersects(self.tracker.supported()) {
            return ConsistencyState::NONE;
        }
        let newly = self.tracker.mark_dirty(state);
        if !signal.is_empty() {
            self.bus.dispatch(signal);
        }
        newly
    }

    /// Returns `true` if any bit of `state` is dirty.
    #[must_use]
    pub fn has_invalidation_state(&self, state: ConsistencyState) -> bool {
        self.tracker.has(state)
    }

    /// Clears exactly the supported part of `state`.
    pub fn mark_consistent(&self, state: ConsistencyState) {
        self.tracker.mark_consistent(state);
    }

    /// Returns `true` if nothing is dirty.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.tracker.is_consistent()
    }

    /// Returns the dirty set.
    #[must_use]
    pub fn dirty_states(&self) -> ConsistencyState {
        self.tracker.dirty()
    }

    // --- signals ---

    /// Dispatches `signal` on the element's bus.
    pub fn dispatch_signal(&self, signal: Signal) -> bool {
        self.bus.dispatch(signal)
    }

    /// Registers a handler on the element's bus.
    pub fn listen_signals(&self, handler: impl Fn(&SignalEvent) + 'static) -> ListenerKey {
        self.bus.listen(handler)
    }

    /// Removes a handler from the element's bus.
    pub fn unlisten_signals(&self, key: ListenerKey) -> bool {
        self.bus.unlisten(key)
    }

    /// Suspends the element's bus.
    pub fn suspend_signals_dispatching(&self) {
        self.bus.suspend_dispatching();
    }

    /// Resumes the element's bus.
    pub fn resume_signals_dispatching(&self, dispatch_accumulated: bool) -> bool {
        self.bus.resume_dispatching(dispatch_accumulated)
    }

    /// Runs `f` with the element's bus suspended and drops whatever it dispatched.
    ///
    /// Used by owners pushing layout into a child during their own repair.
    pub fn without_dispatch<R>(&self, f: impl FnOnce() -> R) -> R {
        self.bus.suspend_dispatching();
        let out = f();
        self.bus.resume_dispatching(false);
        out
    }

    /// Listens to another object's bus. The registration is released on [`dispose`](Self::dispose).
    pub fn subscribe(
        &self,
        bus: &Rc<SignalBus>,
        handler: impl Fn(&SignalEvent) + 'static,
    ) -> ListenerKey {
        let key = bus.listen(handler);
        self.subscriptions.borrow_mut().push(Subscription {
            bus: Rc::downgrade(bus),
            key,
        });
        key
    }

    /// Releases a registration made with [`subscribe`](Self::subscribe).
    pub fn unsubscribe(&self, bus: &SignalBus, key: ListenerKey) -> bool {
        self.subscriptions
            .borrow_mut()
            .retain(|s| !(core::ptr::eq(s.bus.as_ptr(), bus) && s.key == key));
        bus.unlisten(key)
    }

    /// Returns the number of live outgoing subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions
            .borrow()
            .iter()
            .filter(|s| s.bus.upgrade().is_some_and(|b| b.is_listening(s.key)))
            .count()
    }

    // --- geometry and placement ---

    /// Returns the explicit bounds.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        self.bounds.get()
    }

    /// Sets the explicit bounds.
    pub fn set_bounds(&self, bounds: Option<Rect>) {
        if !self.ensure_alive("set_bounds") || self.bounds.get() == bounds {
            return;
        }
        self.bounds.set(bounds);
        self.invalidate(
            ConsistencyState::BOUNDS,
            Signal::NEEDS_REDRAW | Signal::BOUNDS_CHANGED,
        );
    }

    /// Returns the bounds given by the parent.
    #[must_use]
    pub fn parent_bounds(&self) -> Option<Rect> {
        self.parent_bounds.get()
    }

    /// Sets the bounds given by the parent.
    pub fn set_parent_bounds(&self, bounds: Option<Rect>) {
        if !self.ensure_alive("set_parent_bounds") || self.parent_bounds.get() == bounds {
            return;
        }
        self.parent_bounds.set(bounds);
        self.invalidate(
            ConsistencyState::BOUNDS,
            Signal::NEEDS_REDRAW | Signal::BOUNDS_CHANGED,
        );
    }

    /// Returns the own bounds, falling back to the parent bounds.
    #[must_use]
    pub fn pixel_bounds(&self) -> Option<Rect> {
        self.bounds.get().or(self.parent_bounds.get())
    }

    /// Returns the container node.
    #[must_use]
    pub fn container(&self) -> Option<NodeId> {
        self.container.get()
    }

    /// Binds the element to a container. An element has at most one container.
    pub fn set_container(&self, container: Option<NodeId>) {
        if !self.ensure_alive("set_container") || self.container.get() == container {
            return;
        }
        self.container.set(container);
        self.invalidate(ConsistencyState::CONTAINER, Signal::NEEDS_REDRAW);
    }

    /// Returns the z-index.
    #[must_use]
    pub fn z_index(&self) -> i32 {
        self.z_index.get()
    }

    /// Sets the z-index.
    pub fn set_z_index(&self, z_index: i32) {
        if !self.ensure_alive("set_z_index") || self.z_index.get() == z_index {
            return;
        }
        self.z_index.set(z_index);
        self.invalidate(ConsistencyState::Z_INDEX, Signal::Z_INDEX_STATE_CHANGED);
    }

    /// Returns the enabled flag.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Enables or disables the element.
    ///
    /// Disabling dirties only `ENABLED`; the next draw removes the rendered output. Enabling
    /// dirties every supported state so the next draw rebuilds everything.
    pub fn set_enabled(&self, enabled: bool) {
        if !self.ensure_alive("set_enabled") || self.enabled.get() == enabled {
            return;
        }
        self.enabled.set(enabled);
        let state = if enabled {
            ConsistencyState::ALL
        } else {
            ConsistencyState::ENABLED
        };
        self.invalidate(state, Signal::NEEDS_REDRAW | Signal::ENABLED_STATE_CHANGED);
    }

    // --- drawing ---

    /// Decides what a `draw` call must do.
    ///
    /// On [`DrawCheck::Remove`] the bookkeeping is already done: `ENABLED` is clean and
    /// `CONTAINER` is dirty again, so the caller only has to remove its output.
    /// On [`DrawCheck::Draw`], `ENABLED` is marked clean. A missing container is reported and
    /// returned as [`DrawError::NoContainer`].
    pub fn check_drawing_needed(&self) -> Result<DrawCheck, DrawError> {
        if self.disposed.get() {
            return Err(DrawError::Disposed);
        }
        if self.tracker.is_consistent() {
            return Ok(DrawCheck::Clean);
        }
        if !self.enabled.get() {
            if self.tracker.has(ConsistencyState::ENABLED) {
                self.tracker.mark_consistent(ConsistencyState::ENABLED);
                self.tracker.mark_dirty(ConsistencyState::CONTAINER);
                return Ok(DrawCheck::Remove);
            }
            return Ok(DrawCheck::Skip);
        }
        if self.container.get().is_none() {
            reporting::error(ErrorCode::NoContainer, "draw");
            return Err(DrawError::NoContainer);
        }
        self.tracker.mark_consistent(ConsistencyState::ENABLED);
        Ok(DrawCheck::Draw)
    }

    /// Counts one executed repair phase.
    pub fn record_repair(&self) {
        self.repairs.set(self.repairs.get() + 1);
    }

    /// Returns the number of repair phases executed so far.
    #[must_use]
    pub fn repair_count(&self) -> u64 {
        self.repairs.get()
    }

    // --- ownership and disposal ---

    pub(crate) fn owner_link(&self) -> Option<OwnerLink> {
        self.owner.get()
    }

    pub(crate) fn set_owner_link(&self, link: Option<OwnerLink>) {
        self.owner.set(link);
    }

    /// Returns the id of the owning composite.
    #[must_use]
    pub fn owner(&self) -> Option<ObjectId> {
        self.owner.get().map(|l| l.owner)
    }

    /// Releases every subscription, every listener on the element's own bus, the owner link and
    /// the container binding. Irreversible; calling it twice is harmless.
    pub fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        let subscriptions = core::mem::take(&mut *self.subscriptions.borrow_mut());
        for sub in subscriptions {
            if let Some(bus) = sub.bus.upgrade() {
                bus.unlisten(sub.key);
            }
        }
        self.bus.clear_listeners();
        self.owner.set(None);
        self.container.set(None);
        tracing::debug!(element = self.id.raw(), "disposed");
    }

    /// Returns `true` once disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Checks that the element is usable before a mutation.
    ///
    /// Fails a debug assertion on a disposed element; in release builds it reports a warning and
    /// returns `false` so the caller can no-op.
    pub fn ensure_alive(&self, operation: &str) -> bool {
        let alive = !self.disposed.get();
        debug_assert!(
            alive,
            "`{operation}` called on disposed element {}",
            self.id
        );
        if !alive {
            reporting::warning(WarningCode::DisposedElementUsed, operation);
        }
        alive
    }
}

/// The drawable capability.
pub trait VisualElement: fmt::Debug {
    /// The shared element state.
    fn core(&self) -> &ElementCore;

    /// Repairs whatever is dirty.
    fn draw(&self, surface: &mut dyn Surface) -> Result<(), DrawError>;

    /// Detaches the rendered output without disposing backing state.
    fn remove(&self, surface: &mut dyn Surface);

    /// Removes the output, releases surface nodes and disposes the core.
    fn dispose(&self, surface: &mut dyn Surface) {
        self.remove(surface);
        self.core().dispose();
    }
}

/// Elements that can show error bars.
pub trait HasError {
    /// The error settings object.
    type Settings;

    /// Returns `true` if this element draws error bars.
    fn supports_error(&self) -> bool;

    /// Returns the error settings. Unsupported elements return an inert object.
    fn error(&self) -> &Self::Settings;
}

/// Elements that draw point markers.
pub trait HasMarkers {
    /// Returns `true` if this element draws markers.
    fn supports_markers(&self) -> bool;
}

/// Elements bound to an x and a y scale.
pub trait HasScales {
    /// The x scale.
    fn x_scale(&self) -> Option<Rc<dyn Scale>>;
    /// The y scale.
    fn y_scale(&self) -> Option<Rc<dyn Scale>>;
    /// Replaces the x scale. Returns `false` if the scale was rejected.
    fn set_x_scale(&self, scale: Rc<dyn Scale>) -> bool;
    /// Replaces the y scale. Returns `false` if the scale was rejected.
    fn set_y_scale(&self, scale: Rc<dyn Scale>) -> bool;
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use super::*;

    const STATES: ConsistencyState = ConsistencyState::VISUAL_BASE;

    fn core_with_log() -> (Rc<ElementCore>, Rc<RefCell<Vec<Signal>>>) {
        let core = ElementCore::new(STATES, Signal::ALL);
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();
        core.listen_signals(move |e| l.borrow_mut().push(e.signal));
        (core, log)
    }

    #[test]
    fn invalidate_clean_state_dirties_and_dispatches_once() {
        let (core, log) = core_with_log();
        core.mark_consistent(ConsistencyState::ALL);

        let newly = core.invalidate(ConsistencyState::APPEARANCE, Signal::NEEDS_REDRAW_APPEARANCE);
        assert_eq!(newly, ConsistencyState::APPEARANCE);
        assert!(core.has_invalidation_state(ConsistencyState::APPEARANCE));
        assert_eq!(*log.borrow(), [Signal::NEEDS_REDRAW_APPEARANCE]);
    }

    #[test]
    fn invalidate_dirty_state_still_dispatches() {
        let (core, log) = core_with_log();
        core.invalidate(ConsistencyState::BOUNDS, Signal::BOUNDS_CHANGED);
        core.invalidate(ConsistencyState::BOUNDS, Signal::NEEDS_REDRAW);
        assert_eq!(*log.borrow(), [Signal::BOUNDS_CHANGED, Signal::NEEDS_REDRAW]);
    }

    #[test]
    fn unsupported_state_is_a_full_no_op() {
        let (core, log) = core_with_log();
        core.mark_consistent(ConsistencyState::ALL);

        let newly = core.invalidate(ConsistencyState::SERIES_DATA, Signal::DATA_CHANGED);
        assert!(newly.is_empty());
        assert!(core.is_consistent());
        assert!(log.borrow().is_empty(), "no dispatch for unsupported states");
    }

    #[test]
    fn empty_state_is_a_pure_notification() {
        let (core, log) = core_with_log();
        core.mark_consistent(ConsistencyState::ALL);
        core.invalidate(ConsistencyState::NONE, Signal::NEED_UPDATE_LEGEND);
        assert!(core.is_consistent());
        assert_eq!(*log.borrow(), [Signal::NEED_UPDATE_LEGEND]);
    }

    #[test]
    fn suspended_invalidations_coalesce() {
        let (core, log) = core_with_log();
        core.suspend_signals_dispatching();
        core.invalidate(ConsistencyState::APPEARANCE, Signal::NEEDS_REDRAW_APPEARANCE);
        core.invalidate(ConsistencyState::BOUNDS, Signal::BOUNDS_CHANGED);
        core.resume_signals_dispatching(true);
        assert_eq!(
            *log.borrow(),
            [Signal::NEEDS_REDRAW_APPEARANCE | Signal::BOUNDS_CHANGED]
        );

        log.borrow_mut().clear();
        core.suspend_signals_dispatching();
        core.invalidate(ConsistencyState::APPEARANCE, Signal::NEEDS_REDRAW_APPEARANCE);
        core.resume_signals_dispatching(false);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn setters_invalidate_only_on_change() {
        let (core, log) = core_with_log();
        core.mark_consistent(ConsistencyState::ALL);
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        core.set_bounds(Some(r));
        core.set_bounds(Some(r));
        assert_eq!(log.borrow().len(), 1);
        assert!(core.has_invalidation_state(ConsistencyState::BOUNDS));
        assert_eq!(core.pixel_bounds(), Some(r));
    }

    #[test]
    fn pixel_bounds_falls_back_to_parent() {
        let core = ElementCore::new(STATES, Signal::ALL);
        let r = Rect::new(1.0, 2.0, 3.0, 4.0);
        core.set_parent_bounds(Some(r));
        assert_eq!(core.pixel_bounds(), Some(r));
    }

    #[test]
    fn without_container_draw_is_an_error() {
        let core = ElementCore::new(STATES, Signal::ALL);
        assert_eq!(core.check_drawing_needed(), Err(DrawError::NoContainer));
    }

    #[test]
    fn disabling_removes_once_then_skips() {
        let core = ElementCore::new(STATES, Signal::ALL);
        core.set_container(Some(NodeId(0)));
        assert_eq!(core.check_drawing_needed(), Ok(DrawCheck::Draw));
        core.mark_consistent(ConsistencyState::ALL);
        assert_eq!(core.check_drawing_needed(), Ok(DrawCheck::Clean));

        core.set_enabled(false);
        assert_eq!(core.check_drawing_needed(), Ok(DrawCheck::Remove));
        assert!(core.has_invalidation_state(ConsistencyState::CONTAINER));
        assert_eq!(core.check_drawing_needed(), Ok(DrawCheck::Skip));

        core.set_enabled(true);
        assert_eq!(core.dirty_states(), STATES);
        assert_eq!(core.check_drawing_needed(), Ok(DrawCheck::Draw));
    }

    #[test]
    fn dispose_releases_both_directions() {
        let (core, log) = core_with_log();
        let other = Rc::new(SignalBus::new(ObjectId::next(), Signal::ALL));
        let weak = Rc::downgrade(&core);
        core.subscribe(&other, move |_| {
            if let Some(c) = weak.upgrade() {
                c.invalidate(ConsistencyState::APPEARANCE, Signal::NEEDS_REDRAW);
            }
        });
        assert_eq!(other.listener_count(), 1);
        assert_eq!(core.subscription_count(), 1);

        core.dispose();
        assert!(core.is_disposed());
        assert_eq!(other.listener_count(), 0);
        assert_eq!(core.bus().listener_count(), 0);

        other.dispatch(Signal::NEEDS_REDRAW);
        assert!(log.borrow().is_empty());
        assert_eq!(core.check_drawing_needed(), Err(DrawError::Disposed));
        assert!(
            core.invalidate(ConsistencyState::APPEARANCE, Signal::NEEDS_REDRAW)
                .is_empty()
        );
    }

    #[test]
    fn unsubscribe_releases_one_registration() {
        let core = ElementCore::new(STATES, Signal::ALL);
        let other = Rc::new(SignalBus::new(ObjectId::next(), Signal::ALL));
        let key = core.subscribe(&other, |_| {});
        core.subscribe(&other, |_| {});
        assert!(core.unsubscribe(&other, key));
        assert_eq!(other.listener_count(), 1);
        assert_eq!(core.subscription_count(), 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "disposed element")]
    fn mutating_disposed_element_fails_fast_in_debug() {
        let core = ElementCore::new(STATES, Signal::ALL);
        core.dispose();
        core.set_z_index(3);
    }
}
