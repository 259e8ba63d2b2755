//! Tagged encoding of values stored in leaves.
//!
//! ```text
//! full:    [1][value bytes]
//! partial: [2][overflow head (i64 LE)][inline prefix]
//! ```
//!
//! A value is stored `full` when the key, the tag and the value together fit
//! in `MAX_INLINE_ENTRY`. Otherwise its tail is spilled into a chain of
//! overflow pages until the remaining prefix fits inline. The chain is built
//! back to front: the first page allocated holds the last bytes of the value
//! and the leaf points at the last page allocated.

use crate::leaf::MAX_INLINE_ENTRY;
use crate::overflow::Overflow;
use crate::page::{PageIndex, TypedPage};
use crate::pager::{Pager, PagerError};
use crate::tree::{TreeError, read_typed};

/// Encoded value tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValueTag {
    None = 0,
    Full = 1,
    Partial = 2,
}

/// Tag plus overflow head index.
pub const PARTIAL_HEADER_SIZE: usize = 1 + 8;

/// Encode `value` for storage next to a key of `key_len` bytes, appending
/// overflow pages to `pager` when it does not fit inline.
///
/// # Panics
///
/// Panics if an overflow page lands at index 0, which marks the end of a
/// chain. A tree always holds its meta page before any overflow page.
pub fn encode<P: Pager + ?Sized>(
    pager: &P,
    key_len: usize,
    value: &[u8],
) -> Result<Vec<u8>, PagerError> {
    if key_len + 1 + value.len() <= MAX_INLINE_ENTRY {
        let mut encoded = Vec::with_capacity(1 + value.len());
        encoded.push(ValueTag::Full as u8);
        encoded.extend_from_slice(value);
        return Ok(encoded);
    }

    let budget = MAX_INLINE_ENTRY - key_len;
    let mut rest = value;
    let mut head: PageIndex = 0;
    let mut pages = 0usize;
    while PARTIAL_HEADER_SIZE + rest.len() > budget {
        let mut page = Overflow::new(head);
        rest = page.set_value(rest);
        head = pager.append_page(page.as_page())?;
        assert_ne!(head, 0, "overflow page allocated at index 0");
        pages += 1;
    }
    tracing::debug!(
        "spilled {} value bytes to {} overflow pages (head {}, {} bytes inline)",
        value.len() - rest.len(),
        pages,
        head,
        rest.len()
    );

    let mut encoded = Vec::with_capacity(PARTIAL_HEADER_SIZE + rest.len());
    encoded.push(ValueTag::Partial as u8);
    encoded.extend_from_slice(&head.to_le_bytes());
    encoded.extend_from_slice(rest);
    Ok(encoded)
}

/// Decode a stored value, reading its overflow chain if it has one.
pub fn decode<P: Pager + ?Sized>(pager: &P, encoded: &[u8]) -> Result<Vec<u8>, TreeError> {
    let Some((&tag, body)) = encoded.split_first() else {
        return Err(TreeError::CorruptValue {
            reason: "empty encoding",
        });
    };

    if tag == ValueTag::Full as u8 {
        return Ok(body.to_vec());
    }
    if tag != ValueTag::Partial as u8 {
        return Err(TreeError::CorruptValue {
            reason: "unknown value tag",
        });
    }

    let mut next = overflow_head(encoded).ok_or(TreeError::CorruptValue {
        reason: "truncated overflow header",
    })?;
    let mut value = body[8..].to_vec();
    let limit = pager.page_count()?;
    let mut hops = 0u64;
    while next != 0 {
        hops += 1;
        if hops > limit {
            return Err(TreeError::CorruptValue {
                reason: "overflow chain does not terminate",
            });
        }
        match read_typed(pager, next)? {
            TypedPage::Overflow(page) => {
                value.extend_from_slice(page.data());
                next = page.next();
            }
            other => {
                return Err(TreeError::UnexpectedPage {
                    index: next,
                    kind: other.kind() as u8,
                });
            }
        }
    }
    Ok(value)
}

/// Head of the overflow chain of a `partial` encoding.
#[must_use]
pub fn overflow_head(encoded: &[u8]) -> Option<PageIndex> {
    if encoded.first() != Some(&(ValueTag::Partial as u8)) {
        return None;
    }
    let bytes: [u8; 8] = encoded.get(1..PARTIAL_HEADER_SIZE)?.try_into().ok()?;
    Some(PageIndex::from_le_bytes(bytes))
}
