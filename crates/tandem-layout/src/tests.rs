#![cfg(test)]

use super::*;
use tandem_core::SplitDirection::{Horizontal, Vertical};

fn peer(label: &str) -> PeerId {
    PeerId::new(label.as_bytes().to_vec())
}

#[test]
fn single_pane_tree_focuses_the_root() {
    let (tree, root_id) = LayoutTree::with_initial_pane();
    let a = peer("a");
    assert_eq!(tree.focused_pane(&a), Some(root_id));
}

#[test]
fn vertical_split_creates_two_panes_side_by_side() {
    let (mut tree, root_id) = LayoutTree::with_initial_pane();
    let a = peer("a");
    let new_id = tree.split(&a, Vertical).unwrap();

    assert_ne!(new_id, root_id);
    assert_eq!(tree.focused_pane(&a), Some(new_id));
    assert_eq!(tree.pane_ids().len(), 2);

    let rects = tree.compute(CellRect::new(0, 0, 80, 24));
    assert_eq!(rects.len(), 2);
    for (_, r) in &rects {
        assert_eq!(r.height, 24);
    }
    let total_width: u16 = rects.iter().map(|(_, r)| r.width).sum();
    assert_eq!(total_width, 80);
}

#[test]
fn splitting_under_one_peer_does_not_move_another_peers_focus() {
    let (mut tree, root_id) = LayoutTree::with_initial_pane();
    let a = peer("a");
    let b = peer("b");

    assert_eq!(tree.focused_pane(&b), Some(root_id));
    let new_id = tree.split(&a, Vertical).unwrap();

    assert_eq!(tree.focused_pane(&a), Some(new_id));
    assert_eq!(tree.focused_pane(&b), Some(root_id));
}

#[test]
fn n_horizontal_splits_under_one_peer_yield_n_plus_one_leaves() {
    let (mut tree, _root_id) = LayoutTree::with_initial_pane();
    let a = peer("a");
    for _ in 0..3 {
        tree.split(&a, Horizontal).unwrap();
    }
    assert_eq!(tree.pane_ids().len(), 4);
}

#[test]
fn split_then_kill_restores_prior_shape_and_focus() {
    let (mut tree, root_id) = LayoutTree::with_initial_pane();
    let a = peer("a");
    let b = peer("b");
    assert_eq!(tree.focused_pane(&b), Some(root_id));

    tree.split(&a, Vertical).unwrap();
    assert_eq!(tree.pane_ids().len(), 2);

    let outcome = tree.kill(&a);
    assert_eq!(outcome, KillOutcome::Removed);
    assert_eq!(tree.pane_ids(), vec![root_id]);
    assert_eq!(tree.focused_pane(&a), Some(root_id));
    assert_eq!(tree.focused_pane(&b), Some(root_id));
}

#[test]
fn kill_pane_removes_by_id_regardless_of_any_peers_focus() {
    let (mut tree, root_id) = LayoutTree::with_initial_pane();
    let a = peer("a");
    let b = peer("b");
    let new_id = tree.split(&a, Vertical).unwrap();
    // b never interacted, so its focus is still the default leftmost leaf.
    assert_eq!(tree.focused_pane(&b), Some(root_id));

    let outcome = tree.kill_pane(new_id);
    assert_eq!(outcome, KillOutcome::Removed);
    assert_eq!(tree.pane_ids(), vec![root_id]);
}

#[test]
fn kill_pane_on_already_removed_id_is_a_noop() {
    let (mut tree, root_id) = LayoutTree::with_initial_pane();
    tree.kill_pane(root_id);
    assert_eq!(tree.kill_pane(root_id), KillOutcome::NoOp);
}

#[test]
fn kill_on_root_pane_quits_the_session() {
    let (mut tree, _root_id) = LayoutTree::with_initial_pane();
    let a = peer("a");
    assert_eq!(tree.kill(&a), KillOutcome::QuitSession);
    assert!(tree.is_empty());
}

/// Mirrors §8 end-to-end scenario 3: three peers, two vertical splits, kill
/// the middle pane under the splitting peer. The peer focused on the
/// rightmost pane keeps pointing at the same pane object, re-indexed.
#[test]
fn killing_middle_pane_reindexes_the_peer_focused_past_it() {
    let (mut tree, left_id) = LayoutTree::with_initial_pane();
    let a = peer("a");
    let b = peer("b");
    let c = peer("c");

    // a splits: [left, mid_a] — a now focuses mid_a.
    let mid_a = tree.split(&a, Vertical).unwrap();
    // b (still defaulting to the leftmost leaf, `left_id`) splits too,
    // inserting its own pane right after `left_id`: [left, mid_b, mid_a].
    let mid_b = tree.split(&b, Vertical).unwrap();
    assert_eq!(tree.pane_ids(), vec![left_id, mid_b, mid_a]);
    assert_eq!(tree.focused_pane(&a), Some(mid_a));
    assert_eq!(tree.focused_pane(&b), Some(mid_b));
    // c never interacted; still defaults to the leftmost leaf.
    assert_eq!(tree.focused_pane(&c), Some(left_id));

    // b kills its own (middle) pane.
    assert_eq!(tree.kill(&b), KillOutcome::Removed);

    assert_eq!(tree.pane_ids(), vec![left_id, mid_a]);
    // a's focus is preserved onto the same pane object, re-indexed from 2 to 1.
    assert_eq!(tree.focused_pane(&a), Some(mid_a));
    // c's default (never stored) is still the leftmost leaf.
    assert_eq!(tree.focused_pane(&c), Some(left_id));
    // b, having just killed, lands on the previous sibling (left_id).
    assert_eq!(tree.focused_pane(&b), Some(left_id));
}

/// Regression: the fallback sibling a reindexed peer lands on can itself be
/// a multi-pane subtree rather than a leaf. Every stored focus path must
/// still terminate at a leaf (§3, §8).
#[test]
fn killing_a_pane_whose_fallback_sibling_is_a_subtree_lands_on_a_leaf() {
    let (mut tree, left_id) = LayoutTree::with_initial_pane();
    let killer = peer("killer");
    let builder = peer("builder");

    // killer splits the root: [left, right] — killer focuses `right`.
    let right_id = tree.split(&killer, Vertical).unwrap();
    assert_eq!(tree.focused_pane(&killer), Some(right_id));

    // builder (defaulting to the leftmost leaf) splits to its right,
    // inserting a middle column: [left, mid, right] — killer's focus
    // reindexes from 1 to 2, still pointing at `right_id`.
    let mid_id = tree.split(&builder, Vertical).unwrap();
    assert_eq!(tree.pane_ids(), vec![left_id, mid_id, right_id]);
    assert_eq!(tree.focused_pane(&killer), Some(right_id));

    // builder then splits horizontally under its own (mid) pane, turning it
    // into a two-pane Rows subtree: [left, Rows([mid, mid2]), right].
    let mid2_id = tree.split(&builder, Horizontal).unwrap();
    assert_eq!(tree.pane_ids(), vec![left_id, mid_id, mid2_id, right_id]);
    assert_eq!(tree.focused_pane(&killer), Some(right_id));

    // killer kills its own (rightmost) pane. Two siblings remain at the
    // outer level (`left` and the Rows subtree), so this hits
    // `reindex_after_removal`, not `collapse_single_child_parent`; the
    // fallback sibling one to the left is the Rows subtree, not a leaf.
    assert_eq!(tree.kill(&killer), KillOutcome::Removed);

    assert_eq!(tree.pane_ids(), vec![left_id, mid_id, mid2_id]);
    assert_eq!(tree.focused_pane(&killer), Some(mid_id));
}

#[test]
fn focus_path_recovers_from_a_stale_pointer() {
    let (mut tree, root_id) = LayoutTree::with_initial_pane();
    let a = peer("a");
    tree.split(&a, Horizontal).unwrap();
    tree.kill(&a); // a's stored path now targets a pane that no longer exists
    assert_eq!(tree.focused_pane(&a), Some(root_id));
}

#[test]
fn compute_rects_cover_the_whole_target_with_no_overlap() {
    let (mut tree, _root_id) = LayoutTree::with_initial_pane();
    let a = peer("a");
    tree.split(&a, Vertical).unwrap();
    tree.split(&a, Horizontal).unwrap();

    let rects = tree.compute(CellRect::new(0, 0, 79, 23));
    let area: u32 = rects.iter().map(|(_, r)| r.width as u32 * r.height as u32).sum();
    assert_eq!(area, 79u32 * 23);
}
