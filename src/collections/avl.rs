//! AVL search, insert and delete over arena-resident nodes.
//!
//! Nodes never move: rotations reassign arena indices only, and a deletion
//! that must drop an interior node copies the victim's replacement payload
//! into place instead of relinking payload-carrying slots.

use crate::collections::arena::Arena;
use crate::config::NIL;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Left,
    Right,
}

/// Outcome of a descent. `path` holds each visited node and the direction
/// taken from it; on a miss the last entry is the would-be parent of the
/// searched key.
pub struct Descent {
    pub path: Vec<(u32, Step)>,
    pub found: Option<u32>,
}

/// Descend from `root`, steering by `cmp` (probe versus the visited row).
pub fn search(arena: &Arena, root: u32, mut cmp: impl FnMut(&[u8]) -> Ordering) -> Descent {
    let mut path = Vec::new();
    let mut current = root;
    while current != NIL {
        match cmp(arena.slot(current)) {
            Ordering::Equal => return Descent { path, found: Some(current) },
            Ordering::Less => {
                path.push((current, Step::Left));
                current = arena.left(current);
            }
            Ordering::Greater => {
                path.push((current, Step::Right));
                current = arena.right(current);
            }
        }
    }
    Descent { path, found: None }
}

/// Splice `node` below the deepest entry of `descent` (or make it the
/// root) and rebalance the traversed spine bottom-up.
pub fn attach(arena: &mut Arena, root: &mut u32, descent: &Descent, node: u32) {
    debug_assert!(descent.found.is_none());
    match descent.path.last() {
        None => *root = node,
        Some(&(parent, Step::Left)) => arena.set_left(parent, node),
        Some(&(parent, Step::Right)) => arena.set_right(parent, node),
    }
    rebalance_path(arena, root, &descent.path);
}

/// Unlink the node located by `descent` and return its slot (or, for an
/// interior node, the slot of its replacement) to the free list.
pub fn remove(arena: &mut Arena, root: &mut u32, descent: Descent) {
    let node = descent.found.expect("remove() requires a located node");
    let mut path = descent.path;
    let left = arena.left(node);
    let right = arena.right(node);

    if left == NIL && right == NIL {
        // leaf: unlink from the parent
        match path.last() {
            None => *root = NIL,
            Some(&(parent, Step::Left)) => arena.set_left(parent, NIL),
            Some(&(parent, Step::Right)) => arena.set_right(parent, NIL),
        }
        arena.release(node);
    } else if left == NIL || right == NIL {
        // one child: under the AVL property the child is a leaf; its row
        // moves here and the child slot is dropped
        let child = if left != NIL { left } else { right };
        arena.copy_payload(node, child);
        arena.set_left(node, NIL);
        arena.set_right(node, NIL);
        arena.release(child);
        path.push((node, Step::Left));
    } else {
        // two children: take the row of the in-order successor (leftmost
        // of the right subtree), then unlink the successor, which has at
        // most a right child. The path is extended down to the successor
        // so rebalancing covers the whole affected spine.
        path.push((node, Step::Right));
        let mut successor = right;
        while arena.left(successor) != NIL {
            path.push((successor, Step::Left));
            successor = arena.left(successor);
        }
        arena.copy_payload(node, successor);
        let orphan = arena.right(successor);
        match *path.last().expect("successor has a parent on the path") {
            (parent, Step::Left) => arena.set_left(parent, orphan),
            (parent, Step::Right) => arena.set_right(parent, orphan),
        }
        arena.release(successor);
    }

    rebalance_path(arena, root, &path);
}

/// Rebalance every subtree on the path, deepest first, reattaching roots
/// that rotations may have replaced.
fn rebalance_path(arena: &mut Arena, root: &mut u32, path: &[(u32, Step)]) {
    for depth in (0..path.len()).rev() {
        let subtree = rebalance(arena, path[depth].0);
        if depth == 0 {
            *root = subtree;
        } else {
            match path[depth - 1] {
                (parent, Step::Left) => arena.set_left(parent, subtree),
                (parent, Step::Right) => arena.set_right(parent, subtree),
            }
        }
    }
}

/// Restore the AVL property at `node`; returns the subtree root, which
/// rotations may have changed. Balance factor is height(right) minus
/// height(left).
fn rebalance(arena: &mut Arena, node: u32) -> u32 {
    fix_height(arena, node);
    let balance = arena.height(arena.right(node)) - arena.height(arena.left(node));
    if balance > 1 {
        let right = arena.right(node);
        if arena.height(arena.left(right)) > arena.height(arena.right(right)) {
            // right-left heavy: rotate the right child first
            let new_right = rotate_right(arena, right);
            arena.set_right(node, new_right);
        }
        rotate_left(arena, node)
    } else if balance < -1 {
        let left = arena.left(node);
        if arena.height(arena.right(left)) > arena.height(arena.left(left)) {
            // left-right heavy: rotate the left child first
            let new_left = rotate_left(arena, left);
            arena.set_left(node, new_left);
        }
        rotate_right(arena, node)
    } else {
        node
    }
}

//    x               y
//   / \             / \
//  A   y    --->   x   C
//     / \         / \
//    B   C       A   B
fn rotate_left(arena: &mut Arena, x: u32) -> u32 {
    let y = arena.right(x);
    let b = arena.left(y);
    arena.set_right(x, b);
    arena.set_left(y, x);
    fix_height(arena, x);
    fix_height(arena, y);
    y
}

//      y           x
//     / \         / \
//    x   C  ---> A   y
//   / \             / \
//  A   B           B   C
fn rotate_right(arena: &mut Arena, y: u32) -> u32 {
    let x = arena.left(y);
    let b = arena.right(x);
    arena.set_left(y, b);
    arena.set_right(x, y);
    fix_height(arena, y);
    fix_height(arena, x);
    x
}

fn fix_height(arena: &mut Arena, node: u32) {
    let height = 1 + arena
        .height(arena.left(node))
        .max(arena.height(arena.right(node)));
    arena.set_height(node, height);
}
