//! End-to-end persistence scenarios: computing a trie, persisting its
//! nodes, and loading them back across key schemes.

use std::collections::BTreeMap;

use mpt::{
    encode_internal_node, patricialize, rlp_encode, trie_root, EncodedNode, Nibbles,
    EMPTY_TRIE_ROOT,
};
use mpt_storage::{
    InMemoryKVStore, KeyScheme, NodeLoader, ReadFlags, StorageConfig, TriePath, TrieNodeStorage,
    WriteFlags,
};

fn dogs_map() -> BTreeMap<Nibbles, Vec<u8>> {
    let entries: [(&[u8], &[u8]); 4] = [
        (b"do", b"verb"),
        (b"dog", b"puppy"),
        (b"doge", b"coin"),
        (b"horse", b"stallion"),
    ];
    entries
        .iter()
        .map(|(k, v)| (Nibbles::from_bytes(k), v.to_vec()))
        .collect()
}

#[test]
fn persist_root_node_and_load_it_back() {
    let storage = TrieNodeStorage::new(InMemoryKVStore::new());

    let root_node = patricialize(&dogs_map(), 0).unwrap().unwrap();
    let encoded = rlp_encode(&root_node.to_rlp_item().unwrap());
    let root_hash = storage.persist_encoded_node(&encoded).unwrap();

    // The persisted hash is the same root the pure computation yields.
    let expected_root = trie_root(
        vec![
            (b"do".to_vec(), b"verb".to_vec()),
            (b"dog".to_vec(), b"puppy".to_vec()),
            (b"doge".to_vec(), b"coin".to_vec()),
            (b"horse".to_vec(), b"stallion".to_vec()),
        ],
        false,
    )
    .unwrap();
    assert_eq!(root_hash, expected_root);

    let loader = NodeLoader::new(&storage);
    let loaded = loader
        .load(
            None,
            &TriePath::EMPTY,
            &EncodedNode::Hash(root_hash),
            ReadFlags::NONE,
        )
        .unwrap();
    assert_eq!(loaded, Some(root_node));
}

#[test]
fn scheme_migration_keeps_nodes_reachable() {
    // Nodes written before a scheme switch stay readable through the
    // cross-scheme fallback, in both directions.
    for (write_scheme, read_scheme) in [
        (KeyScheme::Hash, KeyScheme::HalfPath),
        (KeyScheme::HalfPath, KeyScheme::Hash),
    ] {
        let mut storage = TrieNodeStorage::with_config(
            InMemoryKVStore::new(),
            StorageConfig {
                scheme: write_scheme,
            },
        );

        let root_node = patricialize(&dogs_map(), 0).unwrap().unwrap();
        let encoded = rlp_encode(&root_node.to_rlp_item().unwrap());
        let root_hash = storage.persist_encoded_node(&encoded).unwrap();

        storage.set_scheme(read_scheme);
        assert_eq!(
            storage
                .get(None, &TriePath::EMPTY, &root_hash, ReadFlags::NONE)
                .unwrap(),
            Some(encoded.clone())
        );
        assert!(storage
            .key_exists(None, &TriePath::EMPTY, &root_hash)
            .unwrap());

        let loader = NodeLoader::new(&storage);
        let loaded = loader
            .load(
                None,
                &TriePath::EMPTY,
                &EncodedNode::Hash(root_hash),
                ReadFlags::NONE,
            )
            .unwrap();
        assert_eq!(loaded, Some(root_node));
    }
}

#[test]
fn account_storage_nodes_live_under_their_own_keys() {
    let storage = TrieNodeStorage::new(InMemoryKVStore::new());
    let address_hash = [0x22; 32];
    let node_hash = [0x42; 32];
    let path = TriePath::from_nibbles(&Nibbles(vec![0x1, 0x2, 0x3])).unwrap();

    storage
        .set(
            Some(&address_hash),
            &path,
            &node_hash,
            b"storage-node",
            WriteFlags::NONE,
        )
        .unwrap();

    assert_eq!(
        storage
            .get(Some(&address_hash), &path, &node_hash, ReadFlags::NONE)
            .unwrap(),
        Some(b"storage-node".to_vec())
    );

    // The same hash written for a different account is a different key.
    let other_account = [0x33; 32];
    assert_eq!(
        storage
            .get(Some(&other_account), &path, &node_hash, ReadFlags::NONE)
            .unwrap(),
        None
    );
}

#[test]
fn batched_subtree_persist_then_walk() {
    let storage = TrieNodeStorage::new(InMemoryKVStore::new());

    // Persist the root and every hashed child reference it carries.
    let root_node = patricialize(&dogs_map(), 0).unwrap().unwrap();
    let root_ref = encode_internal_node(Some(&root_node)).unwrap();
    let EncodedNode::Hash(root_hash) = root_ref else {
        panic!("fixture root must hash, got {root_ref:?}");
    };

    {
        let mut batch = storage.start_write_batch();
        batch
            .set(
                None,
                &TriePath::EMPTY,
                &root_hash,
                &rlp_encode(&root_node.to_rlp_item().unwrap()),
            )
            .unwrap();
        // Committed when the batch leaves scope.
    }

    let loader = NodeLoader::new(&storage);
    let loaded = loader
        .load(
            None,
            &TriePath::EMPTY,
            &EncodedNode::Hash(root_hash),
            ReadFlags::NONE,
        )
        .unwrap()
        .expect("root node must be loadable");
    assert_eq!(loaded, root_node);
}

#[test]
fn empty_trie_root_never_reaches_the_backend() {
    let storage = TrieNodeStorage::new(InMemoryKVStore::new());

    storage
        .set(
            None,
            &TriePath::EMPTY,
            &EMPTY_TRIE_ROOT,
            &[0x80],
            WriteFlags::NONE,
        )
        .unwrap();
    assert!(storage.store().is_empty());
    assert_eq!(
        storage
            .get(None, &TriePath::EMPTY, &EMPTY_TRIE_ROOT, ReadFlags::NONE)
            .unwrap(),
        Some(vec![0x80])
    );
}
