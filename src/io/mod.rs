//! Byte/bit I/O primitives (spec §4.1) and the block wire framing (spec
//! §3 "Block framing", §6 "Wire format").

mod bitstream;
mod typed_stream;

pub use bitstream::{BitInputStream, BitOutputStream};
pub use typed_stream::{TypedStream, WordSize};

use crate::error::{GabacError, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::io::{Read, Write};

/// Write one length-prefixed sub-stream payload: a 4-byte little-endian
/// length followed by the payload bytes.
pub fn write_payload<W: Write>(out: &mut W, payload: &[u8]) -> Result<()> {
    let mut len_buf = [0u8; 4];
    LittleEndian::write_u32(&mut len_buf, payload.len() as u32);
    out.write_all(&len_buf)?;
    out.write_all(payload)?;
    Ok(())
}

/// Read one length-prefixed sub-stream payload.
pub fn read_payload<R: Read>(input: &mut R) -> Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    input
        .read_exact(&mut len_buf)
        .map_err(|_| GabacError::Truncated { expected: 4 })?;
    let len = LittleEndian::read_u32(&len_buf) as usize;
    let mut payload = vec![0u8; len];
    input
        .read_exact(&mut payload)
        .map_err(|_| GabacError::Truncated { expected: len })?;
    Ok(payload)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn payload_roundtrip() {
        let mut buf = Vec::new();
        write_payload(&mut buf, b"hello").unwrap();
        write_payload(&mut buf, b"").unwrap();

        let mut cursor = &buf[..];
        assert_eq!(read_payload(&mut cursor).unwrap(), b"hello");
        assert_eq!(read_payload(&mut cursor).unwrap(), b"");
    }
}
