use bytes::{Buf, BufMut, Bytes};
use log::trace;
use shared::{
    error::{Error, Result},
    marshal::{Marshal, MarshalSize, Unmarshal},
};

pub const HEADER_LENGTH: usize = 4;
pub const VERSION_SHIFT: u8 = 6;
pub const VERSION_MASK: u8 = 0x3;
pub const PADDING_SHIFT: u8 = 5;
pub const PADDING_MASK: u8 = 0x1;
pub const EXTENSION_SHIFT: u8 = 4;
pub const EXTENSION_MASK: u8 = 0x1;
pub const CC_MASK: u8 = 0xF;
pub const MARKER_SHIFT: u8 = 7;
pub const MARKER_MASK: u8 = 0x1;
pub const PT_MASK: u8 = 0x7F;
pub const SEQ_NUM_LENGTH: usize = 2;
pub const TIMESTAMP_LENGTH: usize = 4;
pub const SSRC_LENGTH: usize = 4;
pub const CSRC_LENGTH: usize = 4;
pub const FIXED_HEADER_LENGTH: usize = 12;

pub const EXTENSION_PROFILE_ONE_BYTE: u16 = 0xBEDE;
pub const EXTENSION_PROFILE_TWO_BYTE: u16 = 0x1000;
/// The low 4 bits of a two-byte profile carry application bits.
pub const EXTENSION_PROFILE_TWO_BYTE_MASK: u16 = 0xFFF0;
pub const EXTENSION_ID_RESERVED: u8 = 0xF;

/// A single header extension element.
///
/// For the one-byte profile `id` is the 4-bit element id and for the
/// two-byte profile the 8-bit one. Any other profile keeps the whole
/// extension block as one element with id 0.
#[derive(Debug, Eq, PartialEq, Default, Clone)]
pub struct Extension {
    pub id: u8,
    pub payload: Bytes,
}

/// RTP fixed header, CSRC list and header extensions.
#[derive(Debug, Eq, PartialEq, Default, Clone)]
pub struct Header {
    pub version: u8,
    pub padding: bool,
    pub extension: bool,
    pub marker: bool,
    pub payload_type: u8,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    pub csrc: Vec<u32>,
    pub extension_profile: u16,
    pub extensions: Vec<Extension>,
}

fn is_two_byte(profile: u16) -> bool {
    profile & EXTENSION_PROFILE_TWO_BYTE_MASK == EXTENSION_PROFILE_TWO_BYTE
}

impl Header {
    /// Returns the payload of the first element with `id`.
    pub fn get_extension(&self, id: u8) -> Option<Bytes> {
        if !self.extension {
            return None;
        }
        self.extensions
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.payload.clone())
    }

    /// Sets an extension element, replacing any element with the same id.
    /// Headers without two-byte elements use the one-byte profile.
    pub fn set_extension(&mut self, id: u8, payload: Bytes) -> Result<()> {
        if self.extension && is_two_byte(self.extension_profile) {
            if id == 0 {
                return Err(Error::ErrRfc8285twoByteHeaderIdrange);
            }
            if payload.len() > u8::MAX as usize {
                return Err(Error::ErrRfc8285twoByteHeaderSize);
            }
        } else {
            if id == 0 || id >= EXTENSION_ID_RESERVED {
                return Err(Error::ErrRfc8285oneByteHeaderIdrange);
            }
            if payload.is_empty() || payload.len() > 16 {
                return Err(Error::ErrRfc8285oneByteHeaderSize);
            }
            if self.extension && self.extension_profile != EXTENSION_PROFILE_ONE_BYTE {
                // a foreign profile is replaced by the one-byte profile
                self.extensions.clear();
            }
            self.extension_profile = EXTENSION_PROFILE_ONE_BYTE;
        }
        self.extension = true;

        if let Some(ext) = self.extensions.iter_mut().find(|e| e.id == id) {
            ext.payload = payload;
        } else {
            self.extensions.push(Extension { id, payload });
        }
        Ok(())
    }

    pub fn del_extension(&mut self, id: u8) -> bool {
        let before = self.extensions.len();
        self.extensions.retain(|e| e.id != id);
        if self.extensions.is_empty() {
            self.extension = false;
        }
        before != self.extensions.len()
    }

    /// Length of the extension block body, excluding its 4-byte preamble.
    fn extension_payload_len(&self) -> usize {
        let len: usize = if self.extension_profile == EXTENSION_PROFILE_ONE_BYTE {
            self.extensions.iter().map(|e| 1 + e.payload.len()).sum()
        } else if is_two_byte(self.extension_profile) {
            self.extensions.iter().map(|e| 2 + e.payload.len()).sum()
        } else {
            self.extensions.iter().map(|e| e.payload.len()).sum()
        };
        len.div_ceil(4) * 4
    }
}

impl MarshalSize for Header {
    fn marshal_size(&self) -> usize {
        let mut head_size = FIXED_HEADER_LENGTH + self.csrc.len() * CSRC_LENGTH;
        if self.extension {
            head_size += 4 + self.extension_payload_len();
        }
        head_size
    }
}

impl Unmarshal for Header {
    /// Parses a header. Extension elements whose declared length would
    /// overrun the extension block end extension parsing without failing
    /// the header.
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        if raw_packet.remaining() < FIXED_HEADER_LENGTH {
            return Err(Error::ErrHeaderSizeInsufficient);
        }
        /*
         *  0                   1                   2                   3
         *  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |V=2|P|X|  CC   |M|     PT      |       sequence number         |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |                           timestamp                           |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |           synchronization source (SSRC) identifier            |
         * +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
         * |            contributing source (CSRC) identifiers             |
         * |                             ....                              |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         */
        let b0 = raw_packet.get_u8();
        let version = (b0 >> VERSION_SHIFT) & VERSION_MASK;
        if version != 2 {
            return Err(Error::BadVersion);
        }
        let padding = (b0 >> PADDING_SHIFT) & PADDING_MASK > 0;
        let extension = (b0 >> EXTENSION_SHIFT) & EXTENSION_MASK > 0;
        let cc = (b0 & CC_MASK) as usize;

        let b1 = raw_packet.get_u8();
        let marker = (b1 >> MARKER_SHIFT) & MARKER_MASK > 0;
        let payload_type = b1 & PT_MASK;

        let sequence_number = raw_packet.get_u16();
        let timestamp = raw_packet.get_u32();
        let ssrc = raw_packet.get_u32();

        if raw_packet.remaining() < cc * CSRC_LENGTH {
            return Err(Error::ErrHeaderSizeInsufficient);
        }
        let mut csrc = Vec::with_capacity(cc);
        for _ in 0..cc {
            csrc.push(raw_packet.get_u32());
        }

        let mut extension_profile = 0;
        let mut extensions = vec![];
        if extension {
            if raw_packet.remaining() < 4 {
                return Err(Error::ErrHeaderSizeInsufficientForExtension);
            }
            extension_profile = raw_packet.get_u16();
            let extension_length = raw_packet.get_u16() as usize * 4;
            if raw_packet.remaining() < extension_length {
                return Err(Error::ErrHeaderSizeInsufficientForExtension);
            }
            let block = raw_packet.copy_to_bytes(extension_length);

            if extension_profile == EXTENSION_PROFILE_ONE_BYTE {
                let mut i = 0;
                while i < block.len() {
                    let b = block[i];
                    if b == 0x00 {
                        // padding
                        i += 1;
                        continue;
                    }

                    let id = b >> 4;
                    let len = ((b & 0x0F) + 1) as usize;
                    if id == EXTENSION_ID_RESERVED {
                        break;
                    }
                    i += 1;
                    if i + len > block.len() {
                        trace!("extension id {id} of {len} bytes overruns the extension block");
                        break;
                    }
                    extensions.push(Extension {
                        id,
                        payload: block.slice(i..i + len),
                    });
                    i += len;
                }
            } else if is_two_byte(extension_profile) {
                let mut i = 0;
                while i < block.len() {
                    let id = block[i];
                    i += 1;
                    if id == 0x00 {
                        // padding
                        continue;
                    }
                    if i >= block.len() {
                        trace!("extension id {id} has no length byte");
                        break;
                    }
                    let len = block[i] as usize;
                    i += 1;
                    if i + len > block.len() {
                        trace!("extension id {id} of {len} bytes overruns the extension block");
                        break;
                    }
                    extensions.push(Extension {
                        id,
                        payload: block.slice(i..i + len),
                    });
                    i += len;
                }
            } else {
                extensions.push(Extension {
                    id: 0,
                    payload: block,
                });
            }
        }

        Ok(Header {
            version,
            padding,
            extension,
            marker,
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
            csrc,
            extension_profile,
            extensions,
        })
    }
}

impl Marshal for Header {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        let size = self.marshal_size();
        if buf.remaining_mut() < size {
            return Err(Error::ErrBufferShort);
        }

        let mut b0 = (self.version << VERSION_SHIFT) | self.csrc.len() as u8;
        if self.padding {
            b0 |= 1 << PADDING_SHIFT;
        }
        if self.extension {
            b0 |= 1 << EXTENSION_SHIFT;
        }
        buf.put_u8(b0);

        let mut b1 = self.payload_type;
        if self.marker {
            b1 |= 1 << MARKER_SHIFT;
        }
        buf.put_u8(b1);

        buf.put_u16(self.sequence_number);
        buf.put_u32(self.timestamp);
        buf.put_u32(self.ssrc);
        for csrc in &self.csrc {
            buf.put_u32(*csrc);
        }

        if self.extension {
            let payload_len = self.extension_payload_len();
            buf.put_u16(self.extension_profile);
            buf.put_u16((payload_len / 4) as u16);

            let mut written = 0;
            if self.extension_profile == EXTENSION_PROFILE_ONE_BYTE {
                for ext in &self.extensions {
                    if ext.id == 0 || ext.id >= EXTENSION_ID_RESERVED {
                        return Err(Error::ErrRfc8285oneByteHeaderIdrange);
                    }
                    if ext.payload.is_empty() || ext.payload.len() > 16 {
                        return Err(Error::ErrRfc8285oneByteHeaderSize);
                    }
                    buf.put_u8((ext.id << 4) | (ext.payload.len() as u8 - 1));
                    buf.put_slice(&ext.payload);
                    written += 1 + ext.payload.len();
                }
            } else if is_two_byte(self.extension_profile) {
                for ext in &self.extensions {
                    if ext.id == 0 {
                        return Err(Error::ErrRfc8285twoByteHeaderIdrange);
                    }
                    if ext.payload.len() > u8::MAX as usize {
                        return Err(Error::ErrRfc8285twoByteHeaderSize);
                    }
                    buf.put_u8(ext.id);
                    buf.put_u8(ext.payload.len() as u8);
                    buf.put_slice(&ext.payload);
                    written += 2 + ext.payload.len();
                }
            } else {
                for ext in &self.extensions {
                    buf.put_slice(&ext.payload);
                    written += ext.payload.len();
                }
            }
            for _ in written..payload_len {
                buf.put_u8(0);
            }
        }

        Ok(size)
    }
}

#[cfg(test)]
mod header_test {
    use super::*;

    #[test]
    fn test_header_basic() -> Result<()> {
        let raw = Bytes::from_static(&[
            0x90, 0xe0, 0x69, 0x8f, 0xd9, 0xc2, 0x93, 0xda, 0x1c, 0x64, 0x27, 0x82, 0xBE, 0xDE,
            0x00, 0x01, 0x50, 0xAA, 0x00, 0x00, 0x98, 0x36, 0xbe, 0x88,
        ]);
        let buf = &mut raw.clone();
        let h = Header::unmarshal(buf)?;

        assert_eq!(h.version, 2);
        assert!(h.extension);
        assert!(h.marker);
        assert_eq!(h.payload_type, 96);
        assert_eq!(h.sequence_number, 27023);
        assert_eq!(h.timestamp, 3653407706);
        assert_eq!(h.ssrc, 476325762);
        assert_eq!(h.extension_profile, EXTENSION_PROFILE_ONE_BYTE);
        assert_eq!(h.get_extension(5), Some(Bytes::from_static(&[0xAA])));
        assert_eq!(buf.remaining(), 4);
        assert_eq!(h.marshal_size(), 20);

        let out = h.marshal()?;
        assert_eq!(&out[..], &raw[..20]);
        Ok(())
    }

    #[test]
    fn test_header_csrc() -> Result<()> {
        let raw = Bytes::from_static(&[
            0x82, 0x08, 0x00, 0x01, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x20, 0x00, 0x00,
            0x00, 0x01, 0x00, 0x00, 0x00, 0x02,
        ]);
        let h = Header::unmarshal(&mut raw.clone())?;
        assert_eq!(h.csrc, vec![1, 2]);
        assert_eq!(h.marshal()?, raw);
        Ok(())
    }

    #[test]
    fn test_header_too_short() {
        let raw = Bytes::from_static(&[0x80, 0x60, 0x00, 0x01, 0x00]);
        assert_eq!(
            Header::unmarshal(&mut raw.clone()),
            Err(Error::ErrHeaderSizeInsufficient)
        );

        // CC says 2 but only one CSRC follows
        let raw = Bytes::from_static(&[
            0x82, 0x60, 0x00, 0x01, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x20, 0x00, 0x00,
            0x00, 0x01,
        ]);
        assert_eq!(
            Header::unmarshal(&mut raw.clone()),
            Err(Error::ErrHeaderSizeInsufficient)
        );
    }

    #[test]
    fn test_header_bad_version() {
        let raw = Bytes::from_static(&[
            0x40, 0x60, 0x00, 0x01, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x20,
        ]);
        assert_eq!(Header::unmarshal(&mut raw.clone()), Err(Error::BadVersion));
    }

    #[test]
    fn test_header_extension_block_truncated() {
        // extension block declares two words but only one follows
        let raw = Bytes::from_static(&[
            0x90, 0x60, 0x00, 0x01, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x20, 0xBE, 0xDE,
            0x00, 0x02, 0x10, 0xAA, 0x00, 0x00,
        ]);
        assert_eq!(
            Header::unmarshal(&mut raw.clone()),
            Err(Error::ErrHeaderSizeInsufficientForExtension)
        );
    }

    #[test]
    fn test_header_extension_element_overrun() -> Result<()> {
        // element 1 holds one byte, element 2 claims 4 bytes past the block end
        let raw = Bytes::from_static(&[
            0x90, 0x60, 0x00, 0x01, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x20, 0xBE, 0xDE,
            0x00, 0x01, 0x10, 0xAA, 0x23, 0x01, 0xFF, 0xFF,
        ]);
        let buf = &mut raw.clone();
        let h = Header::unmarshal(buf)?;
        assert_eq!(h.extensions.len(), 1);
        assert_eq!(h.get_extension(1), Some(Bytes::from_static(&[0xAA])));
        assert_eq!(h.get_extension(2), None);
        assert_eq!(buf.remaining(), 2);
        Ok(())
    }

    #[test]
    fn test_header_extension_padding_skipped() -> Result<()> {
        let raw = Bytes::from_static(&[
            0x90, 0x60, 0x00, 0x01, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x20, 0xBE, 0xDE,
            0x00, 0x02, 0x00, 0x00, 0x11, 0xAA, 0xBB, 0x20, 0xCC, 0x00,
        ]);
        let h = Header::unmarshal(&mut raw.clone())?;
        assert_eq!(h.extensions.len(), 2);
        assert_eq!(h.get_extension(1), Some(Bytes::from_static(&[0xAA, 0xBB])));
        assert_eq!(h.get_extension(2), Some(Bytes::from_static(&[0xCC])));
        Ok(())
    }

    #[test]
    fn test_header_set_extension() -> Result<()> {
        let mut h = Header {
            version: 2,
            payload_type: 100,
            sequence_number: 7,
            ssrc: 0x1234,
            ..Default::default()
        };
        assert_eq!(
            h.set_extension(15, Bytes::from_static(&[1])),
            Err(Error::ErrRfc8285oneByteHeaderIdrange)
        );
        assert_eq!(
            h.set_extension(3, Bytes::new()),
            Err(Error::ErrRfc8285oneByteHeaderSize)
        );

        h.set_extension(3, Bytes::from_static(&[0x01, 0x02]))?;
        assert_eq!(h.marshal_size(), 20);
        h.set_extension(3, Bytes::from_static(&[0x03, 0x04]))?;
        assert_eq!(h.extensions.len(), 1);

        let raw = h.marshal()?;
        assert_eq!(&raw[12..], &[0xBE, 0xDE, 0x00, 0x01, 0x31, 0x03, 0x04, 0x00]);
        assert_eq!(Header::unmarshal(&mut raw.clone())?, h);

        assert!(h.del_extension(3));
        assert!(!h.extension);
        Ok(())
    }

    #[test]
    fn test_header_two_byte_extensions() -> Result<()> {
        // id 1 with one byte, padding, id 200 with no data, id 17 with two bytes
        let raw = Bytes::from_static(&[
            0x90, 0x60, 0x00, 0x01, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x20, 0x10, 0x00,
            0x00, 0x03, 0x01, 0x01, 0xAA, 0x00, 0xC8, 0x00, 0x11, 0x02, 0xBB, 0xCC, 0x00, 0x00,
        ]);
        let mut h = Header::unmarshal(&mut raw.clone())?;
        assert_eq!(h.extension_profile, EXTENSION_PROFILE_TWO_BYTE);
        assert_eq!(h.extensions.len(), 3);
        assert_eq!(h.get_extension(1), Some(Bytes::from_static(&[0xAA])));
        assert_eq!(h.get_extension(200), Some(Bytes::new()));
        assert_eq!(h.get_extension(17), Some(Bytes::from_static(&[0xBB, 0xCC])));

        // ids above 14 stay valid while the profile is two-byte
        h.set_extension(30, Bytes::from_static(&[0x01]))?;
        assert_eq!(h.extension_profile, EXTENSION_PROFILE_TWO_BYTE);
        assert_eq!(
            h.set_extension(0, Bytes::from_static(&[0x01])),
            Err(Error::ErrRfc8285twoByteHeaderIdrange)
        );

        let out = h.marshal()?;
        assert_eq!(out.len(), h.marshal_size());
        assert_eq!(Header::unmarshal(&mut out.clone())?, h);
        Ok(())
    }

    #[test]
    fn test_header_two_byte_element_overrun() -> Result<()> {
        let raw = Bytes::from_static(&[
            0x90, 0x60, 0x00, 0x01, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x20, 0x10, 0x01,
            0x00, 0x01, 0x05, 0x01, 0xAA, 0x06,
        ]);
        let h = Header::unmarshal(&mut raw.clone())?;
        assert_eq!(h.extensions.len(), 1);
        assert_eq!(h.get_extension(5), Some(Bytes::from_static(&[0xAA])));
        Ok(())
    }
}
