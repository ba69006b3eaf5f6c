use lumbung::{index::leaf::LeafNode, DatabaseError, Key};

fn hello(i: usize) -> Key {
    Key::String(format!("hello{:03}", i))
}

fn world(i: usize) -> Vec<u8> {
    format!("world{:03}", i).into_bytes()
}

#[test]
fn fill_reject_and_split_at_the_midpoint() {
    let mut node = LeafNode::new();

    // item size: tag(1) + key size(4) + key(8) + payload size(4) + payload(8) = 25,
    // header 4, so 327 items almost fill the node
    for i in 0..327 {
        node.insert(hello(i), world(i)).unwrap();
    }
    assert_eq!(node.items().len(), 327);
    assert_eq!(node.items()[0].key, hello(0));
    assert_eq!(node.items()[9].payload, world(9));

    // the node is full now, one more is rejected
    let err = node.insert(hello(327), world(327)).unwrap_err();
    assert!(matches!(err, DatabaseError::NodeFull));

    let (middle, right) = node.split().unwrap();
    assert_eq!(middle, hello(164));
    assert_eq!(node.items().len(), 164);
    assert_eq!(right.items().len(), 163);
    // the separator is the first key of the right half
    assert_eq!(right.items()[0].key, hello(164));
}

#[test]
fn inserts_keep_items_sorted() {
    let mut node = LeafNode::new();
    for i in [3usize, 0, 4, 1, 2] {
        node.insert(hello(i), world(i)).unwrap();
    }
    let keys: Vec<&Key> = node.items().iter().map(|item| &item.key).collect();
    assert_eq!(
        keys,
        vec![&hello(0), &hello(1), &hello(2), &hello(3), &hello(4)]
    );
}

#[test]
fn duplicate_keys_overwrite_the_payload() {
    let mut node = LeafNode::new();
    node.insert(Key::Int32(7), b"first".to_vec()).unwrap();
    node.insert(Key::Int32(7), b"second".to_vec()).unwrap();

    assert_eq!(node.items().len(), 1);
    assert_eq!(node.lookup(&Key::Int32(7)).unwrap(), Some(&b"second"[..]));
}

#[test]
fn lookup_misses_return_none() {
    let mut node = LeafNode::new();
    node.insert(Key::Int32(1), b"one".to_vec()).unwrap();
    assert_eq!(node.lookup(&Key::Int32(2)).unwrap(), None);
}

#[test]
fn oversized_items_are_rejected() {
    let mut node = LeafNode::new();
    let err = node
        .insert(Key::String("big".into()), vec![0u8; 4096])
        .unwrap_err();
    assert!(matches!(err, DatabaseError::ItemTooLarge { .. }));
}

#[test]
fn serialization_round_trip() {
    let mut node = LeafNode::new();
    for i in [2usize, 0, 1] {
        node.insert(hello(i), world(i)).unwrap();
    }

    let bytes = node.to_bytes();
    let decoded = LeafNode::from_bytes(&bytes).unwrap();
    assert_eq!(decoded, node);
    assert_eq!(decoded.lookup(&hello(1)).unwrap(), Some(&world(1)[..]));
}

#[test]
fn unsorted_bytes_are_corruption() {
    let mut sorted = LeafNode::new();
    sorted.insert(hello(0), world(0)).unwrap();
    sorted.insert(hello(1), world(1)).unwrap();

    // serialize the sorted node, then swap the two items by hand
    let good = sorted.to_bytes();
    let item_size = 25;
    let mut bad = good[..4].to_vec();
    bad.extend_from_slice(&good[4 + item_size..4 + 2 * item_size]);
    bad.extend_from_slice(&good[4..4 + item_size]);

    let err = LeafNode::from_bytes(&bad).unwrap_err();
    assert!(matches!(err, DatabaseError::CorruptedNode { .. }));
}
