// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Surface node bookkeeping shared by elements.

use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use chartwell_core::{ElementCore, NodeId, Surface};

/// The layer an element renders into, created lazily.
#[derive(Debug, Default)]
pub(crate) struct RootLayer(Cell<Option<NodeId>>);

impl RootLayer {
    pub(crate) fn get(&self) -> Option<NodeId> {
        self.0.get()
    }

    /// Creates the layer on first use, attaches it to the element's container and applies the
    /// element's z-index.
    pub(crate) fn mount(&self, surface: &mut dyn Surface, core: &ElementCore) -> NodeId {
        let layer = match self.0.get() {
            Some(layer) => layer,
            None => {
                let layer = surface.layer();
                self.0.set(Some(layer));
                layer
            }
        };
        if let Some(container) = core.container() {
            surface.append(layer, container);
        }
        surface.set_z_index(layer, core.z_index());
        layer
    }

    /// Detaches the layer, keeping it for a later [`mount`](Self::mount).
    pub(crate) fn detach(&self, surface: &mut dyn Surface) {
        if let Some(layer) = self.0.get() {
            surface.remove(layer);
        }
    }

    /// Destroys the layer and everything under it.
    pub(crate) fn release(&self, surface: &mut dyn Surface) {
        if let Some(layer) = self.0.take() {
            surface.release(layer);
        }
    }
}

/// Nodes rebuilt wholesale on every repair of one phase.
#[derive(Debug, Default)]
pub(crate) struct NodePool(RefCell<Vec<NodeId>>);

impl NodePool {
    /// Releases every node created since the last clear.
    pub(crate) fn clear(&self, surface: &mut dyn Surface) {
        for node in self.0.borrow_mut().drain(..) {
            surface.release(node);
        }
    }

    /// Creates a path under `parent`.
    pub(crate) fn path(&self, surface: &mut dyn Surface, parent: NodeId) -> NodeId {
        let node = surface.path();
        surface.append(node, parent);
        self.0.borrow_mut().push(node);
        node
    }

    /// Creates a text node under `parent`.
    pub(crate) fn text(&self, surface: &mut dyn Surface, parent: NodeId) -> NodeId {
        let node = surface.text();
        surface.append(node, parent);
        self.0.borrow_mut().push(node);
        node
    }

    pub(crate) fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub(crate) fn nodes(&self) -> Vec<NodeId> {
        self.0.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use chartwell_core::{ConsistencyState, Recorder, Signal};

    use super::*;

    #[test]
    fn mount_reuses_the_layer_and_follows_z_index() {
        let mut r = Recorder::new();
        let root = r.layer();
        let core = ElementCore::new(ConsistencyState::VISUAL_BASE, Signal::VISUAL_BASE);
        core.set_container(Some(root));
        core.set_z_index(7);

        let layer = RootLayer::default();
        let a = layer.mount(&mut r, &core);
        let b = layer.mount(&mut r, &core);
        assert_eq!(a, b);
        assert_eq!(r.children(root), [a]);
        assert_eq!(r.node(a).map(|n| n.z_index), Some(7));

        layer.detach(&mut r);
        assert!(!r.is_attached(a));
        layer.release(&mut r);
        assert!(r.node(a).is_none());
        assert_eq!(layer.get(), None);
    }

    #[test]
    fn pool_clear_releases_nodes() {
        let mut r = Recorder::new();
        let root = r.layer();
        let pool = NodePool::default();
        pool.path(&mut r, root);
        pool.text(&mut r, root);
        assert_eq!(pool.len(), 2);
        assert_eq!(r.children(root).len(), 2);
        pool.clear(&mut r);
        assert_eq!(pool.len(), 0);
        assert!(r.children(root).is_empty());
    }
}
