// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
mod common;

use proptest::prelude::*;
use proptest::test_runner::{Config as PropConfig, RngAlgorithm, TestRng, TestRunner};

use common::{Kind, HAS, MEMBERS, OWNS};
use linkage_core::{EndpointId, EndpointRef, LinkStore, OrderedEnd, SetEnd, SingleEnd};

const SINGLES: usize = 4;
const SETS: usize = 3;
const LISTS: usize = 2;
const ALL: usize = SINGLES + SETS + LISTS;

#[derive(Debug, Clone)]
enum Op {
    Connect(usize, usize),
    Disconnect(usize),
    Add(usize, usize),
    Remove(usize, usize),
    Replace(usize, usize, usize),
    Clear(usize),
}

fn op() -> impl Strategy<Value = Op> {
    let many = 0..SETS + LISTS;
    prop_oneof![
        (0..SINGLES, 0..ALL).prop_map(|(s, p)| Op::Connect(s, p)),
        (0..SINGLES).prop_map(Op::Disconnect),
        (many.clone(), 0..ALL).prop_map(|(m, p)| Op::Add(m, p)),
        (many.clone(), 0..ALL).prop_map(|(m, p)| Op::Remove(m, p)),
        (many, 0..ALL, 0..ALL).prop_map(|(m, o, n)| Op::Replace(m, o, n)),
        (0..ALL).prop_map(Op::Clear),
    ]
}

#[derive(Clone, Copy)]
enum Many {
    Set(SetEnd),
    List(OrderedEnd),
}

struct Fixture {
    store: LinkStore<Kind>,
    singles: Vec<SingleEnd>,
    many: Vec<Many>,
    all: Vec<EndpointId>,
}

impl Fixture {
    fn new() -> Self {
        let mut store = LinkStore::new();
        let singles: Vec<SingleEnd> = (0..SINGLES)
            .map(|_| {
                let obj = store.insert(Kind::A);
                store.add_single(obj, HAS).expect("single")
            })
            .collect();
        let mut many: Vec<Many> = (0..SETS)
            .map(|_| {
                let obj = store.insert(Kind::B);
                Many::Set(store.add_set(obj, OWNS).expect("set"))
            })
            .collect();
        many.extend((0..LISTS).map(|_| {
            let obj = store.insert(Kind::C);
            Many::List(store.add_ordered(obj, MEMBERS).expect("list"))
        }));
        let mut all: Vec<EndpointId> = singles.iter().map(|s| s.id()).collect();
        all.extend(many.iter().map(|m| match m {
            Many::Set(end) => end.id(),
            Many::List(end) => end.id(),
        }));
        Self {
            store,
            singles,
            many,
            all,
        }
    }

    fn apply(&mut self, op: &Op) {
        let all = &self.all;
        let store = &mut self.store;
        let outcome = match *op {
            Op::Connect(s, p) => store.connect(self.singles[s], all[p]),
            Op::Disconnect(s) => store.disconnect(self.singles[s]),
            Op::Add(m, p) => match self.many[m] {
                Many::Set(end) => store.add(end, all[p]),
                Many::List(end) => store.add(end, all[p]),
            },
            Op::Remove(m, p) => match self.many[m] {
                Many::Set(end) => store.remove(end, all[p]),
                Many::List(end) => store.remove(end, all[p]),
            },
            Op::Replace(m, o, n) => match self.many[m] {
                Many::Set(end) => store.replace(end, all[o], all[n]),
                Many::List(end) => store.replace(end, all[o], all[n]),
            },
            Op::Clear(e) => {
                if e < SINGLES {
                    store.clear(self.singles[e])
                } else {
                    match self.many[e - SINGLES] {
                        Many::Set(end) => store.clear(end),
                        Many::List(end) => store.clear(end),
                    }
                }
            }
        };
        assert!(outcome.is_ok(), "{op:?} failed: {outcome:?}");
    }

    fn symmetric(&self) -> bool {
        self.all.iter().all(|a| {
            self.all.iter().all(|b| {
                self.store.contains(*a, *b).unwrap_or(false)
                    == self.store.contains(*b, *a).unwrap_or(false)
            })
        })
    }
}

#[test]
fn random_requests_keep_links_symmetric() {
    const SEED_BYTES: [u8; 32] = [
        0x5e, 0x1f, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 0, 0,
    ];
    let rng = TestRng::from_seed(RngAlgorithm::ChaCha, &SEED_BYTES);
    let mut runner = TestRunner::new_with_rng(PropConfig::default(), rng);

    runner
        .run(&prop::collection::vec(op(), 1..64), |ops| {
            let mut fixture = Fixture::new();
            let mut replay = Fixture::new();
            for op in &ops {
                fixture.apply(op);
                prop_assert!(fixture.symmetric(), "asymmetric after {:?}", op);
                prop_assert!(fixture.store.verify().is_ok(), "audit failed after {:?}", op);
                replay.apply(op);
            }
            prop_assert_eq!(fixture.store.link_digest(), replay.store.link_digest());
            for single in &fixture.singles {
                prop_assert!(fixture.store.len(*single).unwrap_or(0) <= 1);
            }
            Ok(())
        })
        .expect("symmetry property");
}
