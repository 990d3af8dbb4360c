//! Play-order helpers for the engine's media list.
//!
//! The audio thread keeps an `order` of media-list indices (identity, or a
//! shuffle anchored at the current item) and a position into it.

use rand::Rng;
use rand::seq::SliceRandom;

/// Build a play order for `len` items.
///
/// When shuffled, `anchor` (if in range) is placed first so the current
/// item keeps playing and the rest follow in random order.
pub(crate) fn build_order<R: Rng + ?Sized>(
    len: usize,
    shuffle: bool,
    anchor: Option<usize>,
    rng: &mut R,
) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    if !shuffle {
        return order;
    }

    order.shuffle(rng);
    if let Some(a) = anchor.filter(|&a| a < len) {
        if let Some(p) = order.iter().position(|&i| i == a) {
            order.swap(0, p);
        }
    }
    order
}

/// Next position in an order of `len` entries, wrapping to the start.
pub(crate) fn step_forward(pos: usize, len: usize) -> usize {
    if len == 0 { 0 } else { (pos + 1) % len }
}

/// Previous position in an order of `len` entries, wrapping to the end.
pub(crate) fn step_back(pos: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else if pos == 0 {
        len - 1
    } else {
        (pos - 1).min(len - 1)
    }
}
