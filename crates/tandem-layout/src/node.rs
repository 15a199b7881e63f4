use tandem_core::{CellRect, PaneId, SplitDirection};

/// A child of a `Columns`/`Rows` node. Weight is the share of the axis this
/// child receives relative to its siblings (§4.5); equal weights across a
/// container's children is what keeps the layout visually balanced without
/// the continuous ratio-rebalancing a binary tree needs.
#[derive(Debug, Clone)]
pub(crate) struct Child {
    pub weight: u32,
    pub node: Node,
}

impl Child {
    fn leaf(id: PaneId) -> Self {
        Child { weight: 1, node: Node::Pane(id) }
    }
}

/// N-ary layout tree node (§3 Layout Node). Invariant enforced by every
/// mutator in this module: no `Columns` is a direct child of a `Columns`
/// (same for `Rows`), and every non-leaf has at least two children.
#[derive(Debug, Clone)]
pub(crate) enum Node {
    Pane(PaneId),
    Columns(Vec<Child>),
    Rows(Vec<Child>),
}

impl Node {
    pub(crate) fn pane_id(&self) -> Option<PaneId> {
        match self {
            Node::Pane(id) => Some(*id),
            _ => None,
        }
    }

    fn children(&self) -> Option<&[Child]> {
        match self {
            Node::Pane(_) => None,
            Node::Columns(c) | Node::Rows(c) => Some(c),
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<Child>> {
        match self {
            Node::Pane(_) => None,
            Node::Columns(c) | Node::Rows(c) => Some(c),
        }
    }

    pub(crate) fn pane_ids(&self, out: &mut Vec<PaneId>) {
        match self {
            Node::Pane(id) => out.push(*id),
            Node::Columns(c) | Node::Rows(c) => {
                for child in c {
                    child.node.pane_ids(out);
                }
            }
        }
    }

    /// Path to the leftmost leaf reachable from this node (§4.4 focus-query
    /// default, and the fallback target after an ancestor collapses).
    pub(crate) fn leftmost_path(&self) -> Vec<usize> {
        match self {
            Node::Pane(_) => Vec::new(),
            Node::Columns(c) | Node::Rows(c) => {
                let mut path = vec![0];
                path.extend(c[0].node.leftmost_path());
                path
            }
        }
    }

    /// Path to the leaf holding `id`, used by exit-driven removal (§4.2),
    /// which has no peer to derive a focus path from.
    pub(crate) fn path_of(&self, id: PaneId) -> Option<Vec<usize>> {
        match self {
            Node::Pane(pid) if *pid == id => Some(Vec::new()),
            Node::Pane(_) => None,
            Node::Columns(c) | Node::Rows(c) => c.iter().enumerate().find_map(|(i, child)| {
                child.node.path_of(id).map(|mut rest| {
                    rest.insert(0, i);
                    rest
                })
            }),
        }
    }

    pub(crate) fn get(&self, path: &[usize]) -> Option<&Node> {
        match path.split_first() {
            None => Some(self),
            Some((&i, rest)) => self.children()?.get(i)?.node.get(rest),
        }
    }

    pub(crate) fn get_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        match path.split_first() {
            None => Some(self),
            Some((&i, rest)) => self.children_mut()?.get_mut(i)?.node.get_mut(rest),
        }
    }

    /// Walk the tree computing the rect assigned to every leaf pane (§4.5):
    /// divide the container's extent by child weights, floor then distribute
    /// the remainder starting from the rightmost non-maxed child.
    pub(crate) fn compute_rects(&self, rect: CellRect, out: &mut Vec<(PaneId, CellRect)>) {
        match self {
            Node::Pane(id) => out.push((*id, rect)),
            Node::Columns(children) => {
                for (child, sub) in children.iter().zip(split_axis(rect, children, Axis::X)) {
                    child.node.compute_rects(sub, out);
                }
            }
            Node::Rows(children) => {
                for (child, sub) in children.iter().zip(split_axis(rect, children, Axis::Y)) {
                    child.node.compute_rects(sub, out);
                }
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

/// Divide `rect`'s extent along `axis` among `children` by weight: floor
/// each share, then hand out the remainder one cell at a time starting from
/// the rightmost (bottommost) child whose share hasn't already been rounded
/// up, so rounding error never piles up on one side.
fn split_axis(rect: CellRect, children: &[Child], axis: Axis) -> Vec<CellRect> {
    let total_weight: u32 = children.iter().map(|c| c.weight.max(1)).sum();
    let total = match axis {
        Axis::X => rect.width,
        Axis::Y => rect.height,
    } as u32;

    let mut shares: Vec<u32> = children
        .iter()
        .map(|c| (total * c.weight.max(1)) / total_weight.max(1))
        .collect();
    let mut remainder = total.saturating_sub(shares.iter().sum::<u32>());
    let mut i = shares.len();
    while remainder > 0 && i > 0 {
        i -= 1;
        shares[i] += 1;
        remainder -= 1;
    }

    let mut out = Vec::with_capacity(children.len());
    let mut cursor = match axis {
        Axis::X => rect.x,
        Axis::Y => rect.y,
    };
    for share in shares {
        let share = share as u16;
        out.push(match axis {
            Axis::X => CellRect::new(cursor, rect.y, share, rect.height),
            Axis::Y => CellRect::new(rect.x, cursor, rect.width, share),
        });
        cursor += share;
    }
    out
}

pub(crate) fn new_leaf(id: PaneId) -> Node {
    Node::Pane(id)
}

pub(crate) fn wrap(direction: SplitDirection, existing: Node, new_id: PaneId) -> Node {
    let children = vec![Child { weight: 1, node: existing }, Child::leaf(new_id)];
    match direction {
        SplitDirection::Vertical => Node::Columns(children),
        SplitDirection::Horizontal => Node::Rows(children),
    }
}

/// Does `parent`'s container type match the axis `direction` would split
/// along? If so a split under `parent` inserts a sibling in place; if not,
/// the focused pane must be wrapped in a brand new container (§4.4 step 2
/// vs step 3).
pub(crate) fn same_axis(parent: &Node, direction: SplitDirection) -> bool {
    matches!(
        (parent, direction),
        (Node::Columns(_), SplitDirection::Vertical) | (Node::Rows(_), SplitDirection::Horizontal)
    )
}

pub(crate) fn insert_sibling(parent: &mut Node, at: usize, new_id: PaneId) {
    parent.children_mut().expect("same_axis implies a container").insert(at, Child::leaf(new_id));
}

pub(crate) fn remove_child(parent: &mut Node, at: usize) -> Child {
    parent.children_mut().expect("kill always targets a container parent").remove(at)
}

pub(crate) fn child_count(parent: &Node) -> usize {
    parent.children().map(|c| c.len()).unwrap_or(0)
}
