use std::cmp::Ordering;

use crate::{
    index::{search, ChildRef, CHILD_REF_SIZE, NODE_CONTENT_LIMIT, NODE_SIZE_LIMIT},
    types::{
        error::{DatabaseError, Result},
        key::Key,
    },
    util::codec,
};

/*
 * Serialized node content:
 * - key count (u32)
 * - keys, each: key tag (u8) | key size (u32) | key bytes
 * - child references, key count + 1 of them: node id (u32) | node kind (u8)
 */

pub const INTERNAL_HEADER_SIZE: u32 = 4;
/// Splitting with fewer keys than this cannot leave both halves usable.
pub const MIN_SPLIT_KEYS: usize = 4;

/// Internal node: sorted separator keys with one more child than keys.
/// Child i covers keys less than or equal to keys[i]; the last child covers
/// everything greater than the last separator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InternalNode {
    keys: Vec<Key>,
    children: Vec<ChildRef>,
}

impl InternalNode {
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn children(&self) -> &[ChildRef] {
        &self.children
    }

    /// Serialized size of the node content, count header included.
    pub fn size(&self) -> u32 {
        INTERNAL_HEADER_SIZE
            + self.keys.iter().map(Key::encoded_size).sum::<u32>()
            + self.children.len() as u32 * CHILD_REF_SIZE
    }

    /// Whether one more separator (and its extra child) still fits.
    pub fn fit(&self, key: &Key) -> bool {
        self.size() + key.encoded_size() + CHILD_REF_SIZE <= NODE_CONTENT_LIMIT
    }

    /// Chooses the child index to descend into for the key. An exact match
    /// descends left of the separator; a miss lands on the child covering
    /// the insertion point, with the rightmost child catching keys greater
    /// than every separator.
    pub fn locate_slot(&self, key: &Key) -> Result<usize> {
        let (_, idx) = search(self.keys.len(), |i| &self.keys[i], key)?;
        Ok(idx)
    }

    /// Installs a split result: the separator key with the two children it
    /// divides. Re-attaches in place when the separator is already known.
    pub fn expand(&mut self, key: Key, left: ChildRef, right: ChildRef) -> Result<()> {
        let (exists, idx) = search(self.keys.len(), |i| &self.keys[i], &key)?;
        if exists {
            self.children[idx] = left;
            self.children[idx + 1] = right;
            return Ok(());
        }
        self.keys.insert(idx, key);
        if self.children.is_empty() {
            self.children.push(left);
        } else {
            self.children[idx] = left;
        }
        self.children.insert(idx + 1, right);
        Ok(())
    }

    /// Splits off the upper half. The middle key becomes the returned
    /// separator and is kept by neither side.
    pub fn split(&mut self) -> Result<(Key, InternalNode)> {
        if self.keys.len() < MIN_SPLIT_KEYS {
            return Err(DatabaseError::CorruptedNode {
                reason: format!("too few keys to split: {}", self.keys.len()),
            });
        }
        // find the middle key by accumulated (estimated) size
        let mut i = 0;
        let mut acc: u32 = 0;
        while i < self.keys.len() {
            if acc <= NODE_SIZE_LIMIT / 2 {
                acc += self.keys[i].encoded_size() + CHILD_REF_SIZE;
                i += 1;
            } else {
                break;
            }
        }
        // both halves must keep at least one key
        i = i.clamp(1, self.keys.len() - 2);

        let middle_key = self.keys[i].clone();
        let right_keys = self.keys.split_off(i + 1);
        self.keys.truncate(i);
        let right_children = self.children.split_off(i + 1);
        Ok((
            middle_key,
            InternalNode {
                keys: right_keys,
                children: right_children,
            },
        ))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.size() as usize);
        codec::put_u32(&mut data, self.keys.len() as u32);
        for key in &self.keys {
            key.write_to(&mut data);
        }
        for child in &self.children {
            child.write_to(&mut data);
        }
        data
    }

    pub fn from_bytes(data: &[u8]) -> Result<InternalNode> {
        let count = codec::get_u32(data, 0)? as usize;
        // every key takes at least its tag and size field
        if count > data.len() / 5 {
            return Err(DatabaseError::CorruptedNode {
                reason: format!("key count {} does not fit in {} bytes", count, data.len()),
            });
        }
        let mut offset = 4usize;
        let mut keys = Vec::with_capacity(count);
        for _ in 0..count {
            let (key, read) = Key::read_from(&data[offset..])?;
            offset += read;
            keys.push(key);
        }
        let mut children = Vec::with_capacity(count + 1);
        for _ in 0..count + 1 {
            children.push(ChildRef::read_from(data, offset)?);
            offset += CHILD_REF_SIZE as usize;
        }
        if offset != data.len() {
            return Err(DatabaseError::CorruptedNode {
                reason: "trailing bytes after the last child reference".to_string(),
            });
        }
        for pair in keys.windows(2) {
            if pair[0].compare(&pair[1])? != Ordering::Less {
                return Err(DatabaseError::CorruptedNode {
                    reason: "separator keys are not sorted".to_string(),
                });
            }
        }
        Ok(InternalNode { keys, children })
    }
}
