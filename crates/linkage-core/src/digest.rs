// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Canonical digest of the association state.
//!
//! Encoding
//! - Endpoints are visited in ascending `EndpointId` order.
//! - Per endpoint: id (8 bytes LE), multiplicity tag (1 byte), peer count
//!   (8 bytes LE), then each peer id (8 bytes LE) in stored order. Set
//!   endpoints store peers sorted, so the order in which set links were made
//!   does not affect the digest; ordered endpoints hash their sequence as is.
//! - Endpoints with no peers are skipped, so an object that plays a role it
//!   never uses hashes like one that does not play it.
//!
//! Changing this layout changes every digest and is a breaking change.

use blake3::Hasher;

use crate::arena::Endpoints;
use crate::ident::Hash;

pub(crate) fn link_digest<T>(arena: &Endpoints<T>) -> Hash {
    let mut hasher = Hasher::new();
    for (id, rec) in arena.iter() {
        if rec.peers.len() == 0 {
            continue;
        }
        hasher.update(&id.value().to_le_bytes());
        hasher.update(&[rec.multiplicity().tag()]);
        hasher.update(&(rec.peers.len() as u64).to_le_bytes());
        for peer in rec.peers.iter() {
            hasher.update(&peer.value().to_le_bytes());
        }
    }
    hasher.finalize().into()
}
