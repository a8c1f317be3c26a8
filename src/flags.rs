//! Object flags bitset (spec §3).
//!
//! Grounded on `esper_core`'s use of `bitflags` for compact per-object state
//! (examples/adamtc007-ob-poc/rust/crates/esper_core/src/state.rs), adapted
//! here for the three flags the table engine recognizes.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Flags: u8 {
        /// Object must not be cascade-removed by a neighbor's filtered `RemoveObject`.
        const PINNED = 0b001;
        /// An external value-interconnect slot is materialized for this object.
        const CREATE_IVA = 0b010;
        /// Engine-set: this is the last publication before removal.
        const IS_FINAL = 0b100;
    }
}

impl Flags {
    /// Flags a client is allowed to set directly through `AddObject`.
    pub const CLIENT_USABLE: Flags = Flags::PINNED.union(Flags::CREATE_IVA);

    /// Replace the client-usable bits, preserving engine-managed bits (`IS_FINAL`).
    pub fn with_client_flags(self, client_flags: Flags) -> Flags {
        (self - Flags::CLIENT_USABLE) | (client_flags & Flags::CLIENT_USABLE)
    }
}
