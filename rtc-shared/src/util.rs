use rand::{Rng, rng};

/// What a datagram on a multiplexed port carries, judged by its first bytes
/// (RFC 7983 with the RTP/RTCP split of RFC 5761).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PacketClass {
    Dtls,
    Rtp,
    Rtcp,
    Other,
}

const DTLS_FIRST_BYTE: std::ops::RangeInclusive<u8> = 20..=63;
const RTP_FIRST_BYTE: std::ops::RangeInclusive<u8> = 128..=191;
const RTCP_PACKET_TYPE: std::ops::RangeInclusive<u8> = 192..=223;

pub fn classify(buf: &[u8]) -> PacketClass {
    let Some(&first) = buf.first() else {
        return PacketClass::Other;
    };
    if DTLS_FIRST_BYTE.contains(&first) {
        PacketClass::Dtls
    } else if !RTP_FIRST_BYTE.contains(&first) {
        PacketClass::Other
    } else if buf.len() >= 4 && RTCP_PACKET_TYPE.contains(&buf[1]) {
        PacketClass::Rtcp
    } else {
        PacketClass::Rtp
    }
}

pub fn match_dtls(buf: &[u8]) -> bool {
    classify(buf) == PacketClass::Dtls
}

/// RTP, including buffers too short to tell RTP from RTCP.
pub fn match_srtp(buf: &[u8]) -> bool {
    classify(buf) == PacketClass::Rtp
}

pub fn match_srtcp(buf: &[u8]) -> bool {
    classify(buf) == PacketClass::Rtcp
}

const ALPHA_NUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Random string of `n` ASCII letters and digits, as used for ICE
/// credentials.
pub fn math_rand_alpha_number(n: usize) -> String {
    let mut rng = rng();
    (0..n)
        .map(|_| ALPHA_NUMERIC[rng.random_range(0..ALPHA_NUMERIC.len())] as char)
        .collect()
}
