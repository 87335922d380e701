// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Unordered 0..* endpoints: uniqueness, idempotence, replace.

#![allow(missing_docs)]
mod common;

use common::{changes, record, Kind, MEMBERS, MEMBER_OF};
use linkage_core::{EndpointRef, LinkOutcome, LinkStore, PeerChange, SetEnd, SingleEnd};

fn group(store: &mut LinkStore<Kind>) -> SetEnd {
    let g = store.insert(Kind::C);
    store.add_set(g, MEMBERS).expect("members")
}

fn member(store: &mut LinkStore<Kind>) -> SingleEnd {
    let m = store.insert(Kind::B);
    store.add_single(m, MEMBER_OF).expect("member_of")
}

#[test]
fn add_twice_is_idempotent() {
    let mut store = LinkStore::new();
    let g = group(&mut store);
    let m = member(&mut store);
    let log = record(&mut store, g);

    assert_eq!(store.add(g, m).expect("first"), LinkOutcome::Changed);
    let digest = store.link_digest();
    assert_eq!(store.add(g, m).expect("second"), LinkOutcome::Unchanged);
    assert_eq!(store.link_digest(), digest);
    assert_eq!(changes(&log), vec![PeerChange::Added(m.id())]);
}

#[test]
fn removing_absent_peer_is_a_no_op() {
    let mut store = LinkStore::new();
    let g = group(&mut store);
    let m = member(&mut store);
    let log = record(&mut store, g);

    assert_eq!(store.remove(g, m).expect("remove"), LinkOutcome::Unchanged);
    assert!(log.borrow().is_empty());
}

#[test]
fn adding_a_member_moves_it_out_of_its_previous_group() {
    let mut store = LinkStore::new();
    let g1 = group(&mut store);
    let g2 = group(&mut store);
    let m = member(&mut store);
    store.add(g1, m).expect("g1");
    let g1_log = record(&mut store, g1);

    store.add(g2, m).expect("g2");
    assert!(!store.contains(g1, m).expect("g1 contains"));
    assert!(store.contains(g2, m).expect("g2 contains"));
    assert_eq!(store.peer(m).expect("peer"), Some(g2.id()));
    assert_eq!(changes(&g1_log), vec![PeerChange::Removed(m.id())]);
    store.verify().expect("audit");
}

#[test]
fn replace_swaps_with_single_notification() {
    let mut store = LinkStore::new();
    let g = group(&mut store);
    let x = member(&mut store);
    let y = member(&mut store);
    store.add(g, x).expect("x");
    let log = record(&mut store, g);

    assert_eq!(store.replace(g, x, y).expect("replace"), LinkOutcome::Changed);
    assert_eq!(store.peers(g).expect("peers"), vec![y.id()]);
    assert_eq!(store.peer(x).expect("x"), None);
    assert_eq!(store.peer(y).expect("y"), Some(g.id()));
    assert_eq!(
        changes(&log),
        vec![PeerChange::Replaced {
            old: x.id(),
            new: y.id()
        }]
    );
}

#[test]
fn replace_with_present_peer_degenerates_to_remove() {
    let mut store = LinkStore::new();
    let g = group(&mut store);
    let x = member(&mut store);
    let y = member(&mut store);
    store.add(g, x).expect("x");
    store.add(g, y).expect("y");
    let log = record(&mut store, g);

    assert_eq!(store.replace(g, x, y).expect("replace"), LinkOutcome::Changed);
    assert_eq!(store.peers(g).expect("peers"), vec![y.id()]);
    assert_eq!(changes(&log), vec![PeerChange::Removed(x.id())]);
    store.verify().expect("audit");
}

#[test]
fn replace_with_absent_old_peer_adds() {
    let mut store = LinkStore::new();
    let g = group(&mut store);
    let x = member(&mut store);
    let y = member(&mut store);
    let log = record(&mut store, g);

    assert_eq!(store.replace(g, x, y).expect("replace"), LinkOutcome::Changed);
    assert_eq!(store.peers(g).expect("peers"), vec![y.id()]);
    assert_eq!(changes(&log), vec![PeerChange::Added(y.id())]);
    assert_eq!(store.replace(g, y, y).expect("same"), LinkOutcome::Unchanged);
}
