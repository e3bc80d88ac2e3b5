use bytes::{Buf, BufMut, Bytes, BytesMut};
use pfcpsim_shared::{is_grouped_ie, Ie, IeValue};

use crate::error::{PfcpsimError, Result};

/// IE header length (type + length)
pub const IE_HEADER_LEN: usize = 4;

/// Deepest grouped IE nesting accepted from the wire
pub const MAX_GROUPED_DEPTH: usize = 8;

/// Serialize one IE, recursing into grouped IEs
pub fn encode_ie(ie: &Ie, buf: &mut BytesMut) {
    buf.put_u16(ie.ie_type);
    buf.put_u16(ie.payload_len() as u16);

    match &ie.value {
        IeValue::Raw(data) => buf.put_slice(data),
        IeValue::Grouped(children) => encode_ies(children, buf),
    }
}

pub fn encode_ies(ies: &[Ie], buf: &mut BytesMut) {
    for ie in ies {
        encode_ie(ie, buf);
    }
}

/// Parse one IE from the front of the buffer
pub fn decode_ie(buf: &mut Bytes) -> Result<Ie> {
    decode_ie_at(buf, 0)
}

fn decode_ie_at(buf: &mut Bytes, depth: usize) -> Result<Ie> {
    if buf.remaining() < IE_HEADER_LEN {
        return Err(PfcpsimError::BufferTooShort {
            needed: IE_HEADER_LEN,
            available: buf.remaining(),
        });
    }

    let ie_type = buf.get_u16();
    let length = buf.get_u16() as usize;
    if buf.remaining() < length {
        return Err(PfcpsimError::BufferTooShort {
            needed: length,
            available: buf.remaining(),
        });
    }

    let payload = buf.split_to(length);
    if is_grouped_ie(ie_type) {
        if depth >= MAX_GROUPED_DEPTH {
            return Err(PfcpsimError::InvalidPacket(format!(
                "grouped IE {ie_type} nested deeper than {MAX_GROUPED_DEPTH} levels"
            )));
        }
        Ok(Ie::grouped(ie_type, decode_ies_at(payload, depth + 1)?))
    } else {
        Ok(Ie::raw(ie_type, payload))
    }
}

/// Parse a sequence of IEs until the buffer is drained
pub fn decode_ies(buf: Bytes) -> Result<Vec<Ie>> {
    decode_ies_at(buf, 0)
}

fn decode_ies_at(mut buf: Bytes, depth: usize) -> Result<Vec<Ie>> {
    let mut ies = Vec::new();
    while buf.has_remaining() {
        ies.push(decode_ie_at(&mut buf, depth)?);
    }
    Ok(ies)
}
