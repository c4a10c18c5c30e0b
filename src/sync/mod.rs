//! Real-time coordination: lightweight action announcements that tell
//! peers to re-read the contract. Announcements are hints, never truth.

pub mod coordinator;
pub mod protocol;
