#![warn(rust_2018_idioms)]
#![allow(dead_code)]

mod cipher;
pub mod context;
pub mod key_derivation;
pub mod option;
pub mod protection_profile;

pub use context::Context;
pub use protection_profile::ProtectionProfile;
