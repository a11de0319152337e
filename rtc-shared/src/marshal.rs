use bytes::{Buf, Bytes, BytesMut};

use crate::error::{Error, Result};

/// Number of bytes a value occupies on the wire.
pub trait MarshalSize {
    fn marshal_size(&self) -> usize;
}

/// Serializes a value into a caller-provided buffer.
pub trait Marshal: MarshalSize {
    /// Writes the wire form into `buf` and returns the number of bytes written.
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize>;

    fn marshal(&self) -> Result<Bytes> {
        let l = self.marshal_size();
        let mut buf = BytesMut::with_capacity(l);
        buf.resize(l, 0);
        let n = self.marshal_to(&mut buf)?;
        if n != l {
            Err(Error::WrongMarshalSize(l, n))
        } else {
            Ok(buf.freeze())
        }
    }
}

/// Parses a value from the front of a buffer, advancing it past the bytes consumed.
pub trait Unmarshal: MarshalSize {
    fn unmarshal<B>(buf: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf;
}
