#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod candidate;
pub mod config;
pub mod crypto;
pub mod dtls;
pub mod group;
pub mod handler;
pub mod ice;
pub mod listener;
pub mod loss_tracker;
pub mod packet;
pub mod registry;
pub mod retransmission_buffer;
pub mod rtp_map;
pub mod source;
pub mod transport;
pub mod twcc;

pub use config::{Properties, TransportConfig};
pub use crypto::SrtpKeyingMaterial;
pub use dtls::DtlsEngine;
pub use group::{GroupId, GroupInfo, IncomingSourceGroup, OutgoingSourceGroup, SourceKind};
pub use handler::{Delivery, TransportCommand, TransportHandler};
pub use listener::{RtcpObserver, StreamListener, TransportEvent};
pub use packet::{OutgoingPacket, ReceivedPacket};
pub use rtp_map::{Codec, MediaType};
pub use transport::{DatagramSender, SecureTransport};
