// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use linkage_core::{EndpointId, LinkEvent, LinkStore, PeerChange, Role};

pub const OWNS: Role = Role::new("owns");
pub const OWNER: Role = Role::new("owner");
pub const HAS: Role = Role::new("has");
pub const MEMBERS: Role = Role::new("members");
pub const MEMBER_OF: Role = Role::new("member_of");
pub const PEERS: Role = Role::new("peers");

/// Domain objects used across the link tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    A,
    B,
    C,
}

/// Shared event log filled by [`record`].
pub type Log = Rc<RefCell<Vec<LinkEvent>>>;

/// Subscribes a listener on `endpoint` that appends every event to a log.
pub fn record<T>(store: &mut LinkStore<T>, endpoint: impl Into<EndpointId>) -> Log {
    let log: Log = Rc::default();
    let sink = Rc::clone(&log);
    store
        .subscribe(endpoint, move |_, event| sink.borrow_mut().push(*event))
        .expect("subscribe");
    log
}

/// The `change` part of every logged event, in delivery order.
pub fn changes(log: &Log) -> Vec<PeerChange> {
    log.borrow().iter().map(|event| event.change).collect()
}

/// Asserts `a` lists `b` iff `b` lists `a` for every pair of `endpoints`.
pub fn assert_symmetric<T>(store: &LinkStore<T>, endpoints: &[EndpointId]) {
    for a in endpoints {
        for b in endpoints {
            let ab = store.contains(*a, *b).expect("contains a->b");
            let ba = store.contains(*b, *a).expect("contains b->a");
            assert_eq!(ab, ba, "asymmetric link between {a} and {b}");
        }
    }
    store.verify().expect("store audit");
}
