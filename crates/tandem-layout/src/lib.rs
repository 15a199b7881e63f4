//! N-ary weighted pane layout tree with a per-peer focus side table (§3/§4.4).

mod node;
mod tests;

use std::collections::HashMap;

use tandem_core::{CellRect, PaneId, PeerId, SplitDirection};

use node::Node;

/// Outcome of a kill (`x`) operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillOutcome {
    /// The focused pane was removed; the tree is non-empty.
    Removed,
    /// The focused pane was the root (and only) pane; the session should
    /// exit (§4.4 step 1, §8 boundary: "kill on the root pane causes the
    /// session to exit cleanly").
    QuitSession,
    /// No focused pane to operate on (empty tree).
    NoOp,
}

/// The shared pane tree plus every peer's focus path (§3 Layout Tree).
pub struct LayoutTree {
    root: Option<Node>,
    next_id: PaneId,
    focus: HashMap<PeerId, Vec<usize>>,
}

impl LayoutTree {
    pub fn empty() -> Self {
        Self { root: None, next_id: 1, focus: HashMap::new() }
    }

    /// Create a tree with a single initial pane and return its id.
    pub fn with_initial_pane() -> (Self, PaneId) {
        let id = 1;
        (Self { root: Some(node::new_leaf(id)), next_id: 2, focus: HashMap::new() }, id)
    }

    pub fn alloc_id(&mut self) -> PaneId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn pane_ids(&self) -> Vec<PaneId> {
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            root.pane_ids(&mut out);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Current focus path for a peer, falling back to the leftmost leaf if
    /// the peer has never interacted or its stored path has gone stale
    /// (§7 "layout invariant violation" recovery).
    fn path_for(&self, pid: &PeerId) -> Vec<usize> {
        let root = match &self.root {
            Some(r) => r,
            None => return Vec::new(),
        };
        if let Some(p) = self.focus.get(pid) {
            if matches!(root.get(p), Some(Node::Pane(_))) {
                return p.clone();
            }
        }
        root.leftmost_path()
    }

    /// `focused_pane(pid)` per §4.4.
    pub fn focused_pane(&self, pid: &PeerId) -> Option<PaneId> {
        let root = self.root.as_ref()?;
        let path = self.path_for(pid);
        root.get(&path)?.pane_id()
    }

    pub fn focus_path(&self, pid: &PeerId) -> Vec<usize> {
        self.path_for(pid)
    }

    /// Drops a peer's recorded focus (e.g. on Share server disconnect,
    /// §4.7 point 4). Leaves any panes that peer created untouched.
    pub fn forget_peer(&mut self, pid: &PeerId) {
        self.focus.remove(pid);
    }

    /// Split the pane focused by `pid` (§4.4). `direction` selects `%`
    /// (Vertical, new sibling to the right) or `"` (Horizontal, new sibling
    /// below). No-op (returns `None`) on an empty tree.
    pub fn split(&mut self, pid: &PeerId, direction: SplitDirection) -> Option<PaneId> {
        let path = self.path_for(pid);
        let new_id = self.alloc_id();
        let root = self.root.as_mut()?;

        if path.is_empty() {
            // P is root: always wrap, there is no parent to check for same axis.
            let old_root = std::mem::replace(root, Node::Pane(new_id));
            *root = node::wrap(direction, old_root, new_id);
            self.focus.insert(pid.clone(), vec![1]);
            // Every other peer still focused on the old root (empty path)
            // now reaches it through child index 0.
            for (other, p) in self.focus.iter_mut() {
                if other != pid && p.is_empty() {
                    p.insert(0, 0);
                }
            }
            return Some(new_id);
        }

        let depth = path.len() - 1;
        let parent_path = &path[..depth];
        let idx = path[depth];
        let parent = root.get_mut(parent_path)?;

        if node::same_axis(parent, direction) {
            node::insert_sibling(parent, idx + 1, new_id);
            let mut new_path = parent_path.to_vec();
            new_path.push(idx + 1);
            self.focus.insert(pid.clone(), new_path);

            for (other, p) in self.focus.iter_mut() {
                if other == pid || p.len() <= depth || p[..depth] != *parent_path {
                    continue;
                }
                if p[depth] > idx {
                    p[depth] += 1;
                }
            }
        } else {
            let slot = parent_at_mut(root, parent_path, idx);
            let old = std::mem::replace(slot, Node::Pane(0));
            *slot = node::wrap(direction, old, new_id);

            let mut new_path = path.clone();
            new_path.push(1);
            self.focus.insert(pid.clone(), new_path);

            for (other, p) in self.focus.iter_mut() {
                if other != pid && *p == path {
                    p.push(0);
                }
            }
        }

        Some(new_id)
    }

    /// Kill the pane focused by `pid` (§4.4).
    pub fn kill(&mut self, pid: &PeerId) -> KillOutcome {
        if self.root.is_none() {
            return KillOutcome::NoOp;
        }
        self.kill_path(self.path_for(pid))
    }

    /// Removes a specific pane by id regardless of any peer's focus,
    /// driven by the pane's own "done" signal rather than a routed kill
    /// command (§4.2, §7 "pty read/write failure: treat the pane as
    /// exited, trigger the kill flow"). `NoOp` if the pane is no longer in
    /// the tree (already removed by a concurrent kill).
    pub fn kill_pane(&mut self, id: PaneId) -> KillOutcome {
        let path = match self.root.as_ref().and_then(|root| root.path_of(id)) {
            Some(p) => p,
            None => return KillOutcome::NoOp,
        };
        self.kill_path(path)
    }

    fn kill_path(&mut self, path: Vec<usize>) -> KillOutcome {
        if path.is_empty() {
            self.root = None;
            self.focus.clear();
            return KillOutcome::QuitSession;
        }

        let depth = path.len() - 1;
        let parent_path = path[..depth].to_vec();
        let idx = path[depth];

        let root = self.root.as_mut().expect("checked above");
        let parent = root.get_mut(&parent_path).expect("path is valid");
        node::remove_child(parent, idx);
        let remaining = node::child_count(parent);

        if remaining >= 2 {
            let fallback_idx = idx.saturating_sub(1);
            self.reindex_after_removal(&parent_path, idx, fallback_idx);
        } else {
            self.collapse_single_child_parent(&parent_path);
        }

        KillOutcome::Removed
    }

    fn reindex_after_removal(&mut self, parent_path: &[usize], removed_idx: usize, fallback_idx: usize) {
        let depth = parent_path.len();
        let pids: Vec<PeerId> = self.focus.keys().cloned().collect();
        for other in pids {
            let p = self.focus.get_mut(&other).unwrap();
            if p.len() <= depth || p[..depth] != *parent_path {
                continue;
            }
            let j = p[depth];
            if j == removed_idx {
                // Was focused on (or inside) the removed subtree. `fallback_idx`
                // may itself be a multi-pane container, so land on its leftmost
                // leaf rather than stopping at the container (every stored path
                // must terminate at a leaf).
                let mut np = parent_path.to_vec();
                np.push(fallback_idx);
                let root = self.root.as_ref().expect("checked above");
                np.extend(root.get(&np).map(|n| n.leftmost_path()).unwrap_or_default());
                *p = np;
            } else if j > removed_idx {
                p[depth] -= 1;
            }
        }
    }

    /// §4.4 step 3: exactly one child remains under `parent_path`; the
    /// parent node is replaced by that child in the grandparent (or root),
    /// and every path through the parent shortens by one index.
    fn collapse_single_child_parent(&mut self, parent_path: &[usize]) {
        let root = self.root.as_mut().expect("called only when root exists");
        let parent = root.get_mut(parent_path).expect("parent_path is valid");
        let only = node::remove_child(parent, 0);

        if parent_path.is_empty() {
            self.root = Some(only.node);
        } else {
            let gp_depth = parent_path.len() - 1;
            let gp_path = &parent_path[..gp_depth];
            let parent_idx = parent_path[gp_depth];
            let slot = parent_at_mut(self.root.as_mut().unwrap(), gp_path, parent_idx);
            *slot = only.node;
        }

        let depth = parent_path.len();
        let new_root_ref = self.root.as_ref().unwrap();
        let landing = {
            let mut p = parent_path.to_vec();
            p.extend(new_root_ref.get(parent_path).map(|n| n.leftmost_path()).unwrap_or_default());
            p
        };

        let pids: Vec<PeerId> = self.focus.keys().cloned().collect();
        for other in pids {
            let p = self.focus.get_mut(&other).unwrap();
            if p.len() <= depth || p[..depth] != *parent_path {
                continue;
            }
            if p.len() == depth {
                // shouldn't happen: a path ending exactly at parent_path isn't a leaf
                continue;
            }
            let j = p[depth];
            // `j` indexed into the now-removed container; the survivor sits
            // at parent_path directly (possibly as an interior node), so any
            // path that still makes sense is parent_path + rest-after-index.
            // A path that pointed at the removed pane itself has no
            // remainder to recover and lands on the leftmost leaf instead.
            let rest = &p[depth + 1..];
            let mut np = parent_path.to_vec();
            if rest.is_empty() && j != 0 {
                np = landing.clone();
            } else {
                np.extend_from_slice(rest);
            }
            *p = np;
        }
    }

    pub fn compute(&self, target: CellRect) -> Vec<(PaneId, CellRect)> {
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            root.compute_rects(target, &mut out);
        }
        out
    }
}

/// Navigate to the mutable slot at `parent_path` + `[idx]` from `root`,
/// used when a split's wrap step needs to overwrite a child in place.
fn parent_at_mut<'a>(root: &'a mut Node, parent_path: &[usize], idx: usize) -> &'a mut Node {
    let parent = root.get_mut(parent_path).expect("parent_path is valid");
    match parent {
        Node::Columns(c) | Node::Rows(c) => &mut c[idx].node,
        Node::Pane(_) => unreachable!("parent_path always resolves to a container"),
    }
}
