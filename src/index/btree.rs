use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
    fs::File,
};

use crate::{
    index::{
        internal::InternalNode, leaf::LeafNode, ChildRef, NodeId, NodeKind, BTREE_HEADER_SIZE,
        NODE_ITEM_SIZE_LIMIT, NODE_SIZE_LIMIT,
    },
    types::{
        error::{DatabaseError, Result},
        key::Key,
    },
    util::{codec, io},
};

/*
 * Index file layout:
 * - header (5 bytes): root node id (u32) | root node kind (u8)
 * - node slots of NODE_SIZE_LIMIT bytes each, holding
 *   content size (u32) | node content | padding
 */

/// One B+Tree node held in memory.
#[derive(Debug, Clone)]
pub enum Node {
    Leaf(LeafNode),
    Internal(InternalNode),
}

impl Node {
    fn to_bytes(&self) -> Vec<u8> {
        match self {
            Node::Leaf(leaf) => leaf.to_bytes(),
            Node::Internal(internal) => internal.to_bytes(),
        }
    }

    fn empty(kind: NodeKind) -> Node {
        match kind {
            NodeKind::Leaf => Node::Leaf(LeafNode::new()),
            NodeKind::Internal => Node::Internal(InternalNode::new()),
        }
    }
}

/// Disk-backed B+Tree over typed keys and opaque payloads. Nodes live in
/// fixed-size slots after a small header; the tree grows upward only, by
/// installing a fresh internal root above a split root.
///
/// Mutations stay in the in-memory node cache until `flush`, which is the
/// tree's only durability point.
pub struct BTree {
    file: File,
    root: Option<ChildRef>,
    nodes: HashMap<NodeId, Node>,
    dirty: HashSet<NodeId>,
    next_id: NodeId,
}

impl BTree {
    /// Opens a tree over the given file, reading the header when present.
    /// An empty file means the tree has no root yet.
    pub fn open(file: File) -> Result<Self> {
        let len = file.metadata()?.len();
        let mut root = None;
        if len > 0 {
            let mut buffer = [0u8; BTREE_HEADER_SIZE as usize];
            io::read_at(&file, &mut buffer, 0)?;
            root = Some(ChildRef {
                id: codec::get_u32(&buffer, 0)?,
                kind: NodeKind::from_u8(buffer[4])?,
            });
        }
        let next_id = if len > BTREE_HEADER_SIZE {
            ((len - BTREE_HEADER_SIZE) / NODE_SIZE_LIMIT as u64) as NodeId
        } else {
            0
        };
        Ok(Self {
            file,
            root,
            nodes: HashMap::new(),
            dirty: HashSet::new(),
            next_id,
        })
    }

    pub fn root(&self) -> Option<ChildRef> {
        self.root
    }

    /// Inserts a key/payload pair, splitting nodes (and growing a new root)
    /// as needed. A key that is already present has its payload replaced.
    pub fn insert(&mut self, key: Key, payload: Vec<u8>) -> Result<()> {
        let item_size = key.encoded_size() + 4 + payload.len() as u32;
        if item_size > NODE_ITEM_SIZE_LIMIT {
            return Err(DatabaseError::ItemTooLarge {
                size: item_size,
                max: NODE_ITEM_SIZE_LIMIT,
            });
        }

        let mut root = match self.root {
            Some(root) => root,
            None => {
                let root = self.allocate_node(NodeKind::Leaf)?;
                self.root = Some(root);
                root
            }
        };

        if !self.fits(root, &key, &payload)? {
            let (middle_key, right) = self.split_node(root)?;
            let new_root = self.allocate_node(NodeKind::Internal)?;
            let mut node = InternalNode::new();
            node.expand(middle_key, root, right)?;
            self.store_node(new_root.id, Node::Internal(node), true);
            self.root = Some(new_root);
            root = new_root;
        }

        // the root fits now, drive the insert down from it
        self.insert_into(root, key, payload)
    }

    /// Looks up the payload stored for the key.
    pub fn lookup(&mut self, key: &Key) -> Result<Option<Vec<u8>>> {
        let Some(root) = self.root else {
            return Ok(None);
        };
        self.lookup_at(root, key)
    }

    /// Writes every dirty node and the header, then fsyncs.
    pub fn flush(&mut self) -> Result<()> {
        let mut ids: Vec<NodeId> = self.dirty.iter().copied().collect();
        ids.sort_unstable();
        for id in ids {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            let content = node.to_bytes();
            if content.len() as u32 + 4 > NODE_SIZE_LIMIT {
                return Err(DatabaseError::CorruptedNode {
                    reason: format!("node {} content does not fit its slot", id),
                });
            }
            let mut data = Vec::with_capacity(content.len() + 4);
            codec::put_u32(&mut data, content.len() as u32);
            data.extend_from_slice(&content);
            io::write_at(&self.file, &data, Self::node_offset(id))?;
        }
        if let Some(root) = self.root {
            let mut header = Vec::with_capacity(BTREE_HEADER_SIZE as usize);
            codec::put_u32(&mut header, root.id);
            header.push(root.kind.as_u8());
            io::write_at(&self.file, &header, 0)?;
        }
        self.file.sync_all()?;
        self.dirty.clear();
        Ok(())
    }

    /// Inserts into a node already known to fit the item.
    fn insert_into(&mut self, target: ChildRef, key: Key, payload: Vec<u8>) -> Result<()> {
        match self.load(target)?.clone() {
            Node::Leaf(mut leaf) => {
                leaf.insert(key, payload)?;
                self.store_node(target.id, Node::Leaf(leaf), true);
                Ok(())
            }
            Node::Internal(mut internal) => {
                let slot = internal.locate_slot(&key)?;
                let mut child = *internal.children().get(slot).ok_or_else(|| {
                    DatabaseError::CorruptedNode {
                        reason: format!("no child at slot {}", slot),
                    }
                })?;
                if !self.fits(child, &key, &payload)? {
                    let (middle_key, right) = self.split_node(child)?;
                    // decide which side receives the key before the
                    // separator is moved into the node
                    let go_right = key.compare(&middle_key)? == Ordering::Greater;
                    internal.expand(middle_key, child, right)?;
                    self.store_node(target.id, Node::Internal(internal), true);
                    if go_right {
                        child = right;
                    }
                }
                self.insert_into(child, key, payload)
            }
        }
    }

    fn lookup_at(&mut self, target: ChildRef, key: &Key) -> Result<Option<Vec<u8>>> {
        let child = {
            match self.load(target)? {
                Node::Leaf(leaf) => return Ok(leaf.lookup(key)?.map(<[u8]>::to_vec)),
                Node::Internal(internal) => {
                    let slot = internal.locate_slot(key)?;
                    *internal.children().get(slot).ok_or_else(|| {
                        DatabaseError::CorruptedNode {
                            reason: format!("no child at slot {}", slot),
                        }
                    })?
                }
            }
        };
        self.lookup_at(child, key)
    }

    /// Whether the node can accept the key (and payload, for leaves).
    fn fits(&mut self, target: ChildRef, key: &Key, payload: &[u8]) -> Result<bool> {
        Ok(match self.load(target)? {
            Node::Leaf(leaf) => leaf.fit(key, payload),
            Node::Internal(internal) => internal.fit(key),
        })
    }

    /// Splits the node in two, allocating a slot for the right half.
    /// Returns the separator key and a reference to the right node.
    fn split_node(&mut self, target: ChildRef) -> Result<(Key, ChildRef)> {
        let right_ref = self.allocate_node(target.kind)?;
        match self.load(target)?.clone() {
            Node::Leaf(mut leaf) => {
                let (middle_key, right) = leaf.split()?;
                self.store_node(target.id, Node::Leaf(leaf), true);
                self.store_node(right_ref.id, Node::Leaf(right), true);
                Ok((middle_key, right_ref))
            }
            Node::Internal(mut internal) => {
                let (middle_key, right) = internal.split()?;
                self.store_node(target.id, Node::Internal(internal), true);
                self.store_node(right_ref.id, Node::Internal(right), true);
                Ok((middle_key, right_ref))
            }
        }
    }

    /// Reserves the next node slot at the end of the file, zero-filled.
    fn allocate_node(&mut self, kind: NodeKind) -> Result<ChildRef> {
        if self.file.metadata()?.len() < BTREE_HEADER_SIZE {
            // reserve room for the header in front of the first slot
            io::write_at(&self.file, &[0u8; BTREE_HEADER_SIZE as usize], 0)?;
        }
        let id = self.next_id;
        self.next_id += 1;
        io::write_at(
            &self.file,
            &vec![0u8; NODE_SIZE_LIMIT as usize],
            Self::node_offset(id),
        )?;
        self.store_node(id, Node::empty(kind), true);
        Ok(ChildRef { id, kind })
    }

    fn load(&mut self, target: ChildRef) -> Result<&Node> {
        if !self.nodes.contains_key(&target.id) {
            let node = self.read_node(target)?;
            self.nodes.insert(target.id, node);
        }
        Ok(&self.nodes[&target.id])
    }

    fn read_node(&self, target: ChildRef) -> Result<Node> {
        let offset = Self::node_offset(target.id);
        let mut size_buffer = [0u8; 4];
        io::read_at(&self.file, &mut size_buffer, offset)?;
        let size = codec::get_u32(&size_buffer, 0)?;
        if size > NODE_SIZE_LIMIT {
            return Err(DatabaseError::CorruptedNode {
                reason: format!("node content size {} exceeds the slot size", size),
            });
        }
        if size == 0 {
            // freshly allocated slot that was never flushed
            return Ok(Node::empty(target.kind));
        }
        let mut buffer = vec![0u8; size as usize];
        io::read_at(&self.file, &mut buffer, offset + 4)?;
        match target.kind {
            NodeKind::Leaf => Ok(Node::Leaf(LeafNode::from_bytes(&buffer)?)),
            NodeKind::Internal => Ok(Node::Internal(InternalNode::from_bytes(&buffer)?)),
        }
    }

    fn store_node(&mut self, id: NodeId, node: Node, dirty: bool) {
        self.nodes.insert(id, node);
        if dirty {
            self.dirty.insert(id);
        }
    }

    fn node_offset(id: NodeId) -> u64 {
        BTREE_HEADER_SIZE + id as u64 * NODE_SIZE_LIMIT as u64
    }
}
