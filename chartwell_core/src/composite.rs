// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Composite aggregation.
//!
//! A [`Composite`] owns child elements and listens to each child's bus. A child signal is
//! mapped through a static [`Translation`] table to the owner's own states and signals, and the
//! owner invalidates itself with the result. The child's raw signal never travels further.

use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use crate::consistency::ConsistencyState;
use crate::element::{ElementCore, OwnerLink, VisualElement};
use crate::error::{AttachError, DrawError};
use crate::id::ObjectId;
use crate::signal::{ListenerKey, Signal, SignalEvent};
use crate::surface::Surface;

/// One row of a translation table: when a child signal carries `on`, the owner dirties `state`
/// and dispatches `signal`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Translation {
    /// Child signal bits that trigger this row.
    pub on: Signal,
    /// Owner states to dirty.
    pub state: ConsistencyState,
    /// Owner signal to dispatch.
    pub signal: Signal,
}

impl Translation {
    /// Creates a row.
    #[must_use]
    pub const fn new(on: Signal, state: ConsistencyState, signal: Signal) -> Self {
        Self { on, state, signal }
    }
}

/// Folds every matching row of `table` into one `(state, signal)` pair.
#[must_use]
pub fn translate(table: &[Translation], event: &SignalEvent) -> (ConsistencyState, Signal) {
    table
        .iter()
        .filter(|t| event.has_signal(t.on))
        .fold((ConsistencyState::NONE, Signal::NONE), |(s, g), t| {
            (s | t.state, g | t.signal)
        })
}

struct ChildSlot {
    element: Rc<dyn VisualElement>,
    key: ListenerKey,
}

/// Owned children of an element.
pub struct Composite {
    owner: Weak<ElementCore>,
    translations: &'static [Translation],
    children: RefCell<Vec<ChildSlot>>,
}

impl fmt::Debug for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<ObjectId> = self
            .children
            .borrow()
            .iter()
            .map(|c| c.element.core().id())
            .collect();
        f.debug_struct("Composite")
            .field("children", &ids)
            .finish_non_exhaustive()
    }
}

impl Composite {
    /// Creates an empty composite for `owner`.
    #[must_use]
    pub fn new(owner: &Rc<ElementCore>, translations: &'static [Translation]) -> Self {
        Self {
            owner: Rc::downgrade(owner),
            translations,
            children: RefCell::new(Vec::new()),
        }
    }

    /// Takes ownership of `child` and starts translating its signals.
    pub fn attach(&self, child: Rc<dyn VisualElement>) -> Result<(), AttachError> {
        let owner = self.owner.upgrade().ok_or(AttachError::Disposed)?;
        if owner.is_disposed() || child.core().is_disposed() {
            return Err(AttachError::Disposed);
        }
        if child.core().owner_link().is_some() {
            return Err(AttachError::AlreadyAttached);
        }

        let weak = Rc::downgrade(&owner);
        let table = self.translations;
        let key = child.core().listen_signals(move |event| {
            let Some(owner) = weak.upgrade() else {
                return;
            };
            let (state, signal) = translate(table, event);
            if !state.is_empty() || !signal.is_empty() {
                owner.invalidate(state, signal);
            }
        });
        child.core().set_owner_link(Some(OwnerLink {
            owner: owner.id(),
            key,
        }));
        self.children.borrow_mut().push(ChildSlot {
            element: child,
            key,
        });
        Ok(())
    }

    /// Releases the child with id `id` and returns it.
    pub fn detach(&self, id: ObjectId) -> Result<Rc<dyn VisualElement>, AttachError> {
        let index = self.position(id).ok_or(AttachError::NotAChild)?;
        self.detach_at(index).ok_or(AttachError::NotAChild)
    }

    /// Releases the child at `index` and returns it.
    pub fn detach_at(&self, index: usize) -> Option<Rc<dyn VisualElement>> {
        let slot = {
            let mut children = self.children.borrow_mut();
            if index >= children.len() {
                return None;
            }
            children.remove(index)
        };
        let core = slot.element.core();
        core.unlisten_signals(slot.key);
        core.set_owner_link(None);
        Some(slot.element)
    }

    /// Returns a snapshot of the children.
    #[must_use]
    pub fn children(&self) -> Vec<Rc<dyn VisualElement>> {
        self.children
            .borrow()
            .iter()
            .map(|c| c.element.clone())
            .collect()
    }

    /// Returns the number of children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.borrow().len()
    }

    /// Returns `true` if there are no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.borrow().is_empty()
    }

    /// Returns the child at `index`.
    #[must_use]
    pub fn child_at(&self, index: usize) -> Option<Rc<dyn VisualElement>> {
        self.children
            .borrow()
            .get(index)
            .map(|c| c.element.clone())
    }

    /// Returns the index of the child with id `id`.
    #[must_use]
    pub fn position(&self, id: ObjectId) -> Option<usize> {
        self.children
            .borrow()
            .iter()
            .position(|c| c.element.core().id() == id)
    }

    /// Draws every child that has dirty states. Children disposed elsewhere are dropped first.
    ///
    /// Returns the number of children drawn. Stops at the first failure.
    pub fn draw_children(&self, surface: &mut dyn Surface) -> Result<usize, DrawError> {
        self.children
            .borrow_mut()
            .retain(|c| !c.element.core().is_disposed());
        let mut drawn = 0;
        for child in self.children() {
            if child.core().is_consistent() {
                continue;
            }
            child.draw(surface)?;
            drawn += 1;
        }
        Ok(drawn)
    }

    /// Removes every child's rendered output.
    pub fn remove_children(&self, surface: &mut dyn Surface) {
        for child in self.children() {
            child.remove(surface);
        }
    }

    /// Releases and disposes every child.
    pub fn dispose_children(&self, surface: &mut dyn Surface) {
        let slots = core::mem::take(&mut *self.children.borrow_mut());
        for slot in slots {
            let core = slot.element.core();
            core.unlisten_signals(slot.key);
            core.set_owner_link(None);
            slot.element.dispose(surface);
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::{Cell, RefCell};

    use super::*;
    use crate::element::DrawCheck;
    use crate::surface::{NodeId, Recorder};

    const PARENT_STATES: ConsistencyState = ConsistencyState::VISUAL_BASE
        .union(ConsistencyState::RECALCULATION)
        .union(ConsistencyState::CHART_SERIES);

    static TABLE: [Translation; 2] = [
        Translation::new(
            Signal::DATA_CHANGED,
            ConsistencyState::RECALCULATION,
            Signal::NEEDS_RECALCULATION,
        ),
        Translation::new(
            Signal::NEEDS_REDRAW,
            ConsistencyState::CHART_SERIES,
            Signal::NEEDS_REDRAW,
        ),
    ];

    #[derive(Debug)]
    struct Leaf {
        core: Rc<ElementCore>,
        draws: Cell<u32>,
        removed: Cell<u32>,
    }

    impl Leaf {
        fn new() -> Rc<Self> {
            let core = ElementCore::new(ConsistencyState::VISUAL_BASE, Signal::ALL);
            core.set_container(Some(NodeId(0)));
            Rc::new(Self {
                core,
                draws: Cell::new(0),
                removed: Cell::new(0),
            })
        }
    }

    impl VisualElement for Leaf {
        fn core(&self) -> &ElementCore {
            &self.core
        }

        fn draw(&self, _surface: &mut dyn Surface) -> Result<(), DrawError> {
            if self.core.check_drawing_needed()? == DrawCheck::Draw {
                self.draws.set(self.draws.get() + 1);
                self.core.mark_consistent(ConsistencyState::ALL);
            }
            Ok(())
        }

        fn remove(&self, _surface: &mut dyn Surface) {
            self.removed.set(self.removed.get() + 1);
        }
    }

    fn parent() -> (Rc<ElementCore>, Composite, Rc<RefCell<Vec<Signal>>>) {
        let core = ElementCore::new(PARENT_STATES, Signal::ALL);
        core.mark_consistent(ConsistencyState::ALL);
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();
        core.listen_signals(move |e| l.borrow_mut().push(e.signal));
        let composite = Composite::new(&core, &TABLE);
        (core, composite, log)
    }

    #[test]
    fn child_signal_is_translated_single_hop() {
        let (core, composite, log) = parent();
        let leaf = Leaf::new();
        composite.attach(leaf.clone()).unwrap();

        leaf.core.dispatch_signal(Signal::DATA_CHANGED);
        assert_eq!(core.dirty_states(), ConsistencyState::RECALCULATION);
        assert_eq!(*log.borrow(), [Signal::NEEDS_RECALCULATION]);
    }

    #[test]
    fn untranslated_signals_are_absorbed() {
        let (core, composite, log) = parent();
        let leaf = Leaf::new();
        composite.attach(leaf.clone()).unwrap();
        leaf.core.dispatch_signal(Signal::NEED_UPDATE_LEGEND);
        assert!(core.is_consistent());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn attach_requires_detach_first() {
        let (_a, first, _) = parent();
        let (_b, second, _) = parent();
        let leaf = Leaf::new();
        first.attach(leaf.clone()).unwrap();
        assert_eq!(second.attach(leaf.clone()), Err(AttachError::AlreadyAttached));

        first.detach(leaf.core.id()).unwrap();
        assert_eq!(leaf.core.bus().listener_count(), 0);
        second.attach(leaf.clone()).unwrap();
        assert_eq!(leaf.core.bus().listener_count(), 1);
        assert_eq!(first.detach(leaf.core.id()).err(), Some(AttachError::NotAChild));
    }

    #[test]
    fn detached_child_no_longer_reaches_owner() {
        let (core, composite, _) = parent();
        let leaf = Leaf::new();
        composite.attach(leaf.clone()).unwrap();
        composite.detach_at(0).unwrap();
        leaf.core.dispatch_signal(Signal::DATA_CHANGED);
        assert!(core.is_consistent());
        assert!(composite.is_empty());
    }

    #[test]
    fn draw_children_skips_consistent_children() {
        let (_core, composite, _) = parent();
        let a = Leaf::new();
        let b = Leaf::new();
        composite.attach(a.clone()).unwrap();
        composite.attach(b.clone()).unwrap();
        let mut surface = Recorder::new();

        assert_eq!(composite.draw_children(&mut surface), Ok(2));
        assert_eq!(composite.draw_children(&mut surface), Ok(0));
        b.core.set_z_index(5);
        assert_eq!(composite.draw_children(&mut surface), Ok(1));
        assert_eq!((a.draws.get(), b.draws.get()), (1, 2));
    }

    #[test]
    fn dispose_children_releases_everything() {
        let (_core, composite, _) = parent();
        let leaf = Leaf::new();
        composite.attach(leaf.clone()).unwrap();
        let mut surface = Recorder::new();
        composite.dispose_children(&mut surface);
        assert!(composite.is_empty());
        assert!(leaf.core.is_disposed());
        assert_eq!(leaf.removed.get(), 1);
        assert_eq!(leaf.core.owner(), None);
    }

    #[test]
    fn children_disposed_elsewhere_are_pruned() {
        let (_core, composite, _) = parent();
        let leaf = Leaf::new();
        composite.attach(leaf.clone()).unwrap();
        leaf.core.dispose();
        let mut surface = Recorder::new();
        assert_eq!(composite.draw_children(&mut surface), Ok(0));
        assert_eq!(composite.len(), 0);
    }

    #[test]
    fn translate_folds_matching_rows() {
        let event = SignalEvent {
            source: ObjectId::next(),
            signal: Signal::DATA_CHANGED | Signal::NEEDS_REDRAW,
        };
        assert_eq!(
            translate(&TABLE, &event),
            (
                ConsistencyState::RECALCULATION | ConsistencyState::CHART_SERIES,
                Signal::NEEDS_RECALCULATION | Signal::NEEDS_REDRAW
            )
        );
    }
}
