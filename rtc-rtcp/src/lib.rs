#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod application_defined;
pub mod extended_jitter_report;
pub mod goodbye;
pub mod header;
pub mod legacy;
pub mod packet;
pub mod payload_feedbacks;
pub mod receiver_report;
pub mod reception_report;
pub mod sender_report;
pub mod source_description;
pub mod transport_feedbacks;
mod util;

pub use packet::{Packet, marshal, unmarshal};
