//! Port traits (hexagonal boundaries).

pub mod inbound;
pub mod outbound;
