use std::cmp::Ordering;

use crate::{
    index::{search, NODE_CONTENT_LIMIT, NODE_ITEM_SIZE_LIMIT, NODE_SIZE_LIMIT},
    types::{
        error::{DatabaseError, Result},
        key::Key,
    },
    util::codec,
};

/*
 * Serialized node content:
 * - item count (u32)
 * - items, each: key tag (u8) | key size (u32) | key bytes |
 *                payload size (u32) | payload bytes
 * Items are kept sorted by key ascending.
 */

pub const LEAF_HEADER_SIZE: u32 = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct LeafItem {
    pub key: Key,
    pub payload: Vec<u8>,
}

impl LeafItem {
    pub fn size(&self) -> u32 {
        self.key.encoded_size() + 4 + self.payload.len() as u32
    }
}

fn item_size(key: &Key, payload: &[u8]) -> u32 {
    key.encoded_size() + 4 + payload.len() as u32
}

/// Leaf node: sorted key/payload items in one node slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeafNode {
    items: Vec<LeafItem>,
}

impl LeafNode {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn items(&self) -> &[LeafItem] {
        &self.items
    }

    /// Serialized size of the node content, count header included.
    pub fn size(&self) -> u32 {
        LEAF_HEADER_SIZE + self.items.iter().map(LeafItem::size).sum::<u32>()
    }

    /// Whether the key/payload pair can be added without overflowing the
    /// node's on-disk slot.
    pub fn fit(&self, key: &Key, payload: &[u8]) -> bool {
        self.size() + item_size(key, payload) <= NODE_CONTENT_LIMIT
    }

    /// Inserts a key/payload pair, overwriting the payload when the key is
    /// already present. Must only be called after fit returned true.
    pub fn insert(&mut self, key: Key, payload: Vec<u8>) -> Result<()> {
        let size = item_size(&key, &payload);
        if size > NODE_ITEM_SIZE_LIMIT {
            return Err(DatabaseError::ItemTooLarge {
                size,
                max: NODE_ITEM_SIZE_LIMIT,
            });
        }
        if !self.fit(&key, &payload) {
            return Err(DatabaseError::NodeFull);
        }
        let (exists, idx) = search(self.items.len(), |i| &self.items[i].key, &key)?;
        if exists {
            // same key, update its payload and done
            self.items[idx].payload = payload;
            return Ok(());
        }
        self.items.insert(idx, LeafItem { key, payload });
        Ok(())
    }

    pub fn lookup(&self, key: &Key) -> Result<Option<&[u8]>> {
        let (exists, idx) = search(self.items.len(), |i| &self.items[i].key, key)?;
        if exists {
            Ok(Some(&self.items[idx].payload))
        } else {
            Ok(None)
        }
    }

    /// Splits off the upper half of the items into a new leaf. Returns the
    /// first key of the right half as the separator, together with the
    /// right leaf.
    pub fn split(&mut self) -> Result<(Key, LeafNode)> {
        if self.items.len() < 2 {
            return Err(DatabaseError::CorruptedNode {
                reason: "not enough items to split".to_string(),
            });
        }
        // find the starting point of the right half by accumulated size
        let mut si = 0;
        let mut acc: u32 = 0;
        while si < self.items.len() {
            if acc <= NODE_SIZE_LIMIT / 2 {
                acc += self.items[si].size();
                si += 1;
            } else {
                break;
            }
        }
        // keep both halves non-empty
        si = si.clamp(1, self.items.len() - 1);
        let middle_key = self.items[si].key.clone();
        let right = LeafNode {
            items: self.items.split_off(si),
        };
        Ok((middle_key, right))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.size() as usize);
        codec::put_u32(&mut data, self.items.len() as u32);
        for item in &self.items {
            item.key.write_to(&mut data);
            codec::put_u32(&mut data, item.payload.len() as u32);
            data.extend_from_slice(&item.payload);
        }
        data
    }

    pub fn from_bytes(data: &[u8]) -> Result<LeafNode> {
        let count = codec::get_u32(data, 0)? as usize;
        // the smallest possible item is an empty-string key with an empty payload
        if count > data.len() / 9 {
            return Err(DatabaseError::CorruptedNode {
                reason: format!("item count {} does not fit in {} bytes", count, data.len()),
            });
        }
        let mut offset = 4usize;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            let (key, read) = Key::read_from(&data[offset..])?;
            offset += read;
            let payload_size = codec::get_u32(data, offset)? as usize;
            offset += 4;
            let payload = data
                .get(offset..offset + payload_size)
                .ok_or_else(|| DatabaseError::CorruptedNode {
                    reason: format!("item payload of {} bytes is incomplete", payload_size),
                })?
                .to_vec();
            offset += payload_size;
            items.push(LeafItem { key, payload });
        }
        if offset != data.len() {
            return Err(DatabaseError::CorruptedNode {
                reason: "trailing bytes after the last item".to_string(),
            });
        }
        // keys must come back strictly increasing
        for pair in items.windows(2) {
            if pair[0].key.compare(&pair[1].key)? != Ordering::Less {
                return Err(DatabaseError::CorruptedNode {
                    reason: "leaf items are not sorted".to_string(),
                });
            }
        }
        Ok(LeafNode { items })
    }
}
