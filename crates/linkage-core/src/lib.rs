// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! linkage-core: arena-backed bidirectional associations.
//!
//! Domain objects live in a [`LinkStore`]. Each role an object plays in a
//! relationship is an *endpoint* of one of three multiplicities:
//!
//! - [`SingleEnd`]: 0..1 peer, changed with [`LinkStore::connect`];
//! - [`SetEnd`]: unordered 0..* peers without duplicates;
//! - [`OrderedEnd`]: insertion-ordered 0..* peers, duplicates allowed.
//!
//! Linking two endpoints updates both sides: the requesting endpoint changes
//! its own peers and the store mirrors the change onto the peer. After every
//! successful request, `a` lists `b` iff `b` lists `a`.
//!
//! ```
//! use linkage_core::{LinkStore, Role};
//!
//! const OWNS: Role = Role::new("owns");
//! const OWNER: Role = Role::new("owner");
//!
//! let mut store = LinkStore::new();
//! let shelf = store.insert("shelf");
//! let book = store.insert("book");
//! let holds = store.add_set(shelf, OWNS)?;
//! let held_by = store.add_single(book, OWNER)?;
//!
//! store.add(holds, held_by)?;
//! assert_eq!(store.peer(held_by)?, Some(holds.into()));
//! assert_eq!(&store.peer_objects(holds)?[..], &[book]);
//! # Ok::<(), linkage_core::LinkError>(())
//! ```
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod arena;
mod config;
mod digest;
mod endpoint;
mod error;
mod event;
pub mod guard;
mod ident;
mod store;
mod telemetry;

// Re-exports for stable public API
pub use config::{StoreConfig, VerifyMode};
pub use endpoint::{
    Acceptor, Candidate, EndpointRef, ManyEnd, Multiplicity, OrderedEnd, PeerView, SetEnd,
    SingleEnd,
};
pub use error::{LinkError, LinkOutcome};
pub use event::{LinkEvent, Listener, PeerChange};
pub use guard::{BrokenInvariant, InvariantKind};
pub use ident::{EndpointId, Hash, ListenerId, ObjectId, Role};
pub use store::LinkStore;
