//! RFC 2032 control packets that predate the RFC 4585 feedback framework.
//! Some older endpoints still emit them.

pub mod full_intra_request;
pub mod nack;
