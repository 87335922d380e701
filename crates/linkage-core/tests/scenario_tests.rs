// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! End-to-end composition scenarios: one-to-many, hybrid, many-to-many.

#![allow(missing_docs)]
mod common;

use common::{assert_symmetric, Kind, HAS, OWNS, PEERS};
use linkage_core::{EndpointId, EndpointRef, LinkOutcome, LinkStore, Role};

const HELD_BY: Role = Role::new("held_by");

#[test]
fn owner_and_single_holder_share_b3() {
    let mut store = LinkStore::new();
    let c1 = store.insert(Kind::C);
    let a3 = store.insert(Kind::A);
    let owns = store.add_set(c1, OWNS).expect("owns");
    let has = store.add_single(a3, HAS).expect("has");

    let bs: Vec<_> = (0..3)
        .map(|_| {
            let b = store.insert(Kind::B);
            store.add_set(b, HELD_BY).expect("held_by")
        })
        .collect();
    for b in &bs {
        assert_eq!(store.add(owns, *b).expect("add"), LinkOutcome::Changed);
    }
    let b3 = bs[2];
    assert_eq!(store.connect(has, b3).expect("connect"), LinkOutcome::Changed);

    assert_eq!(store.len(b3).expect("len"), 2);
    assert!(store.contains(b3, owns).expect("contains owns"));
    assert!(store.contains(b3, has).expect("contains has"));
    let mut holders = store.peer_objects(b3).expect("view").to_vec();
    holders.sort();
    assert_eq!(holders, vec![c1, a3]);

    assert_eq!(store.remove(owns, b3).expect("remove"), LinkOutcome::Changed);
    assert_eq!(store.len(b3).expect("len"), 1);
    assert_eq!(&store.peer_objects(b3).expect("view")[..], &[a3]);
    assert!(!store.contains(owns, b3).expect("contains"));
    assert_eq!(store.len(owns).expect("len"), 2);

    let mut all: Vec<EndpointId> = bs.iter().map(|b| b.id()).collect();
    all.extend([owns.id(), has.id()]);
    assert_symmetric(&store, &all);
}

#[test]
fn many_to_many_sets_stay_symmetric() {
    let mut store = LinkStore::new();
    let ends: Vec<_> = (0..4)
        .map(|_| {
            let o = store.insert(Kind::A);
            store.add_set(o, PEERS).expect("peers")
        })
        .collect();

    store.add(ends[0], ends[1]).expect("0-1");
    store.add(ends[0], ends[2]).expect("0-2");
    store.add(ends[3], ends[0]).expect("3-0");
    store.add(ends[1], ends[2]).expect("1-2");
    assert_eq!(store.len(ends[0]).expect("len"), 3);
    assert_eq!(store.len(ends[2]).expect("len"), 2);

    store.remove(ends[2], ends[0]).expect("2-0");
    assert!(!store.contains(ends[0], ends[2]).expect("contains"));

    let ids: Vec<EndpointId> = ends.iter().map(|e| e.id()).collect();
    assert_symmetric(&store, &ids);
}

#[test]
fn self_loops_appear_once() {
    let mut store = LinkStore::new();
    let o = store.insert(Kind::A);
    let set = store.add_set(o, PEERS).expect("peers");
    let single = store.add_single(o, HAS).expect("has");

    assert_eq!(store.add(set, set).expect("self add"), LinkOutcome::Changed);
    assert_eq!(store.len(set).expect("len"), 1);
    assert_eq!(&store.peer_objects(set).expect("view")[..], &[o]);

    store.connect(single, single).expect("self connect");
    assert_eq!(store.peer(single).expect("peer"), Some(single.id()));
    store.disconnect(single).expect("disconnect");
    assert_eq!(store.peer(single).expect("peer"), None);

    store.connect(single, set).expect("cross-role loop");
    assert_eq!(store.len(set).expect("len"), 2);
    assert_symmetric(&store, &[set.id(), single.id()]);

    assert_eq!(store.remove(set, set).expect("self remove"), LinkOutcome::Changed);
    assert_eq!(store.peers(set).expect("peers"), vec![single.id()]);
    assert_symmetric(&store, &[set.id(), single.id()]);
}

#[test]
fn clear_leaves_no_dangling_reciprocal() {
    let mut store = LinkStore::new();
    let hub_obj = store.insert(Kind::C);
    let hub = store.add_set(hub_obj, OWNS).expect("owns");
    let mut spokes = Vec::new();
    for i in 0..5 {
        let o = store.insert(Kind::B);
        let id: EndpointId = if i % 2 == 0 {
            store.add_set(o, HELD_BY).expect("set").into()
        } else {
            store.add_single(o, HAS).expect("single").into()
        };
        spokes.push(id);
    }
    for s in &spokes {
        if let Ok(single) = store.single(store.owner_of(*s).expect("owner"), HAS) {
            store.connect(single, hub).expect("connect");
        } else {
            store.add(hub, *s).expect("add");
        }
    }
    assert_eq!(store.len(hub).expect("len"), 5);

    assert_eq!(store.clear(hub).expect("clear"), LinkOutcome::Changed);
    assert!(store.is_empty(hub).expect("empty"));
    for s in &spokes {
        assert!(store.is_empty(*s).expect("spoke empty"));
    }
    assert_eq!(store.clear(hub).expect("clear again"), LinkOutcome::Unchanged);
}

#[test]
fn for_each_peer_walks_owners_in_order() {
    let mut store = LinkStore::new();
    let list_obj = store.insert(Kind::C);
    let list = store.add_ordered(list_obj, OWNS).expect("ordered");
    let mut expected = Vec::new();
    for _ in 0..3 {
        let o = store.insert(Kind::B);
        let back = store.add_single(o, HAS).expect("single");
        store.add(list, back).expect("add");
        expected.push(o);
    }
    let mut seen = Vec::new();
    store
        .for_each_peer(list, |owner| seen.push(owner))
        .expect("walk");
    assert_eq!(seen, expected);
    assert_eq!(store.peer_objects(list).expect("view").to_vec(), expected);
}
