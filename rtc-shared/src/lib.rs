#![warn(rust_2018_idioms)]
#![allow(dead_code)]

#[cfg(feature = "marshal")]
pub mod marshal;

#[cfg(feature = "replay")]
pub mod replay_detector;

pub mod error;
pub mod time;
mod transport;
pub mod util;

pub use transport::{TaggedBytesMut, TransportContext, TransportMessage};
