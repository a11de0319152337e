//! RTPFB (PT 205) transport layer feedback messages, RFC 4585 section 6.2.

pub mod temporary_maximum_bitrate;
pub mod transport_layer_cc;
pub mod transport_layer_nack;
