//! Packed byte regions shared by leaf and node pages.
//!
//! A region is an array of 2-byte cumulative end offsets followed by the
//! packed bytes of its items. The array reserves `reserved_slots(count)`
//! entries, so the packed bytes only shift once every `SLOT_BATCH` inserts
//! or removals.
//!
//! ```text
//! front:  [end 0][end 1]..[slack][item 0][item 1]..              ->
//! back:            <-  ..[item 1][item 0][slack]..[end 1][end 0]
//! ```
//!
//! The front region grows from the start of the page body, the back region
//! from its end. Each function takes the whole body slice and the current
//! item count; callers check capacity before growing a region.

// Region offsets are bounded by PAGE_SIZE and fit in u16.
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]

use crate::page::{OFFSET_SIZE, reserved_slots};

/// Bytes taken by the offset array of a region holding `count` items.
#[must_use]
pub const fn table_size(count: usize) -> usize {
    reserved_slots(count) * OFFSET_SIZE
}

/// Index of the first item whose predicate is false.
///
/// `pred` must be true for a prefix of `0..count` and false afterwards.
pub fn partition(count: usize, mut pred: impl FnMut(usize) -> bool) -> usize {
    let (mut lo, mut hi) = (0, count);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

fn read_offset(body: &[u8], pos: usize) -> usize {
    usize::from(u16::from_le_bytes([body[pos], body[pos + 1]]))
}

fn write_offset(body: &mut [u8], pos: usize, value: usize) {
    body[pos..pos + OFFSET_SIZE].copy_from_slice(&(value as u16).to_le_bytes());
}

/// Region growing forward from the start of the body.
pub mod front {
    use super::{OFFSET_SIZE, read_offset, table_size, write_offset};

    const fn slot(i: usize) -> usize {
        i * OFFSET_SIZE
    }

    #[must_use]
    pub fn end(body: &[u8], i: usize) -> usize {
        read_offset(body, slot(i))
    }

    #[must_use]
    pub fn start(body: &[u8], i: usize) -> usize {
        if i == 0 { 0 } else { end(body, i - 1) }
    }

    /// Total item bytes for `count` items.
    #[must_use]
    pub fn total(body: &[u8], count: usize) -> usize {
        if count == 0 { 0 } else { end(body, count - 1) }
    }

    /// Bytes used by the region: offset array plus items.
    #[must_use]
    pub fn used(body: &[u8], count: usize) -> usize {
        table_size(count) + total(body, count)
    }

    #[must_use]
    pub fn item(body: &[u8], count: usize, i: usize) -> &[u8] {
        let base = table_size(count);
        &body[base + start(body, i)..base + end(body, i)]
    }

    /// Packed bytes of items `[from, to)`.
    #[must_use]
    pub fn items(body: &[u8], count: usize, from: usize, to: usize) -> &[u8] {
        let base = table_size(count);
        let s = start(body, from);
        let e = if to > from { end(body, to - 1) } else { s };
        &body[base + s..base + e]
    }

    fn reslot(body: &mut [u8], old_count: usize, new_count: usize, total: usize) {
        let (old, new) = (table_size(old_count), table_size(new_count));
        if old != new {
            body.copy_within(old..old + total, new);
        }
    }

    /// Insert items packed in `blob` at index `at`. `ends` yields each new
    /// item's cumulative end offset within `blob`.
    pub fn insert(
        body: &mut [u8],
        count: usize,
        at: usize,
        blob: &[u8],
        ends: impl ExactSizeIterator<Item = usize>,
    ) {
        let added = ends.len();
        let total = total(body, count);
        let s = start(body, at);
        let bytes = blob.len();

        reslot(body, count, count + added, total);
        let base = table_size(count + added);
        body.copy_within(base + s..base + total, base + s + bytes);
        body.copy_within(slot(at)..slot(count), slot(at + added));
        for i in at + added..count + added {
            let shifted = end(body, i) + bytes;
            write_offset(body, slot(i), shifted);
        }

        body[base + s..base + s + bytes].copy_from_slice(blob);
        for (k, e) in ends.enumerate() {
            write_offset(body, slot(at + k), s + e);
        }
    }

    /// Remove items `[from, to)`.
    pub fn remove(body: &mut [u8], count: usize, from: usize, to: usize) {
        if to <= from {
            return;
        }
        let removed_items = to - from;
        let total = total(body, count);
        let s = start(body, from);
        let e = end(body, to - 1);
        let removed = e - s;

        let base = table_size(count);
        body.copy_within(base + e..base + total, base + s);
        body.copy_within(slot(to)..slot(count), slot(from));
        for i in from..count - removed_items {
            let shifted = end(body, i) - removed;
            write_offset(body, slot(i), shifted);
        }
        reslot(body, count, count - removed_items, total - removed);
    }

    /// Replace item `i` with `item`, which may differ in length.
    pub fn replace(body: &mut [u8], count: usize, i: usize, item: &[u8]) {
        let total = total(body, count);
        let s = start(body, i);
        let e = end(body, i);
        let new_end = s + item.len();

        let base = table_size(count);
        body.copy_within(base + e..base + total, base + new_end);
        body[base + s..base + new_end].copy_from_slice(item);
        let diff = new_end as isize - e as isize;
        for k in i..count {
            let shifted = (end(body, k) as isize + diff) as usize;
            write_offset(body, slot(k), shifted);
        }
    }
}

/// Region growing backward from the end of the body.
pub mod back {
    use super::{OFFSET_SIZE, read_offset, table_size, write_offset};

    const fn slot(body: &[u8], i: usize) -> usize {
        body.len() - OFFSET_SIZE * (i + 1)
    }

    /// Right edge of the packed item bytes.
    const fn right_edge(body: &[u8], count: usize) -> usize {
        body.len() - table_size(count)
    }

    #[must_use]
    pub fn end(body: &[u8], i: usize) -> usize {
        read_offset(body, slot(body, i))
    }

    #[must_use]
    pub fn start(body: &[u8], i: usize) -> usize {
        if i == 0 { 0 } else { end(body, i - 1) }
    }

    #[must_use]
    pub fn total(body: &[u8], count: usize) -> usize {
        if count == 0 { 0 } else { end(body, count - 1) }
    }

    #[must_use]
    pub fn used(body: &[u8], count: usize) -> usize {
        table_size(count) + total(body, count)
    }

    #[must_use]
    pub fn item(body: &[u8], count: usize, i: usize) -> &[u8] {
        let edge = right_edge(body, count);
        &body[edge - end(body, i)..edge - start(body, i)]
    }

    /// Packed bytes of items `[from, to)`, in page order.
    #[must_use]
    pub fn items(body: &[u8], count: usize, from: usize, to: usize) -> &[u8] {
        let edge = right_edge(body, count);
        let s = start(body, from);
        let e = if to > from { end(body, to - 1) } else { s };
        &body[edge - e..edge - s]
    }

    fn reslot(body: &mut [u8], old_count: usize, new_count: usize, total: usize) {
        let old = right_edge(body, old_count);
        let new = right_edge(body, new_count);
        if old != new {
            body.copy_within(old - total..old, new - total);
        }
    }

    /// Insert items packed in `blob` (page order, as returned by [`items`])
    /// at index `at`. `ends` yields each new item's cumulative end offset.
    pub fn insert(
        body: &mut [u8],
        count: usize,
        at: usize,
        blob: &[u8],
        ends: impl ExactSizeIterator<Item = usize>,
    ) {
        let added = ends.len();
        let total = total(body, count);
        let s = start(body, at);
        let bytes = blob.len();
        let len = body.len();

        reslot(body, count, count + added, total);
        let edge = right_edge(body, count + added);
        body.copy_within(edge - total..edge - s, edge - total - bytes);
        let table = OFFSET_SIZE;
        body.copy_within(len - table * count..len - table * at, len - table * (count + added));
        for i in at + added..count + added {
            let shifted = end(body, i) + bytes;
            write_offset(body, slot(body, i), shifted);
        }

        body[edge - s - bytes..edge - s].copy_from_slice(blob);
        for (k, e) in ends.enumerate() {
            write_offset(body, slot(body, at + k), s + e);
        }
    }

    /// Remove items `[from, to)`.
    pub fn remove(body: &mut [u8], count: usize, from: usize, to: usize) {
        if to <= from {
            return;
        }
        let removed_items = to - from;
        let total = total(body, count);
        let s = start(body, from);
        let e = end(body, to - 1);
        let removed = e - s;
        let len = body.len();

        let edge = right_edge(body, count);
        body.copy_within(edge - total..edge - e, edge - total + removed);
        let table = OFFSET_SIZE;
        body.copy_within(
            len - table * count..len - table * to,
            len - table * (count - removed_items),
        );
        for i in from..count - removed_items {
            let shifted = end(body, i) - removed;
            write_offset(body, slot(body, i), shifted);
        }
        reslot(body, count, count - removed_items, total - removed);
    }

    /// Replace item `i` with `item`, which may differ in length.
    pub fn replace(body: &mut [u8], count: usize, i: usize, item: &[u8]) {
        let total = total(body, count);
        let s = start(body, i);
        let e = end(body, i);
        let new_end = s + item.len();
        let diff = new_end as isize - e as isize;

        let edge = right_edge(body, count);
        let dest = (edge - total) as isize - diff;
        body.copy_within(edge - total..edge - e, dest as usize);
        body[edge - new_end..edge - s].copy_from_slice(item);
        for k in i..count {
            let shifted = (end(body, k) as isize + diff) as usize;
            write_offset(body, slot(body, k), shifted);
        }
    }
}
