//! Wire frames exchanged between registry peers.
//!
//! Every frame starts with a one-byte tag, so classifying an inbound payload
//! never requires attempting a full decode of each frame kind in turn.
//!
//! ## Wire Format Summary
//!
//! | Field | Size (bytes) | Description |
//! |---|---|---|
//! | Tag | 1 | `0x00` CREATE, `0x01` CREATED, `0x02` RESPONSE, `0x10` QUERY |
//! | Key length | 1 | Length of the public key |
//! | Key | Variable | The public key of the registry slot |
//!
//! Message frames (CREATE, CREATED, RESPONSE) continue with:
//!
//! | Field | Size (bytes) | Description |
//! |---|---|---|
//! | Revision | 8 | Big-endian `u64` |
//! | Data length | 1 | Length of the data |
//! | Data | Variable | Entry payload |
//! | Signature | 0 or 64 | Ed25519 signature (consumes remaining bytes) |
//!
//! Decoding accepts data up to 255 bytes; the 48-byte bound is a validation
//! rule, not a framing rule.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::entry::{SIGNATURE_SIZE, SignedRegistryEntry};

/// Tag byte of a QUERY frame.
pub const QUERY_TAG: u8 = 0x10;

/// The kind of a message frame.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MessageType {
    /// A peer asks the registry to store an entry.
    Create = 0x00,
    /// The registry answers a CREATE with the authoritative entry.
    Created = 0x01,
    /// The registry answers a QUERY with the stored entry.
    Response = 0x02,
}

impl TryFrom<u8> for MessageType {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(MessageType::Create),
            0x01 => Ok(MessageType::Created),
            0x02 => Ok(MessageType::Response),
            _ => Err(FrameError::UnknownTag(value)),
        }
    }
}

/// An entry-carrying frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub message_type: MessageType,
    pub public_key: Bytes,
    pub revision: u64,
    pub data: Bytes,
    pub signature: Option<Bytes>,
}

/// A lookup of the entry stored for `public_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub public_key: Bytes,
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Message(Message),
    Query(Query),
}

/// Errors that can occur while encoding or decoding frames.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum FrameError {
    #[error("empty frame")]
    Empty,

    #[error("unknown frame tag: {0:#04x}")]
    UnknownTag(u8),

    #[error("insufficient bytes for deserialization")]
    InsufficientBytes,

    #[error("invalid signature length: expected 0 or {expected}, got {actual}")]
    InvalidSignatureLength { expected: usize, actual: usize },

    #[error("{0} trailing bytes after query")]
    TrailingBytes(usize),

    #[error("{field} too large to encode: {size} bytes")]
    FieldTooLarge { field: &'static str, size: usize },
}

impl Message {
    /// Builds a message of the given type carrying `entry`.
    pub fn from_entry(message_type: MessageType, entry: &SignedRegistryEntry) -> Self {
        Self {
            message_type,
            public_key: entry.public_key.clone(),
            revision: entry.revision,
            data: entry.data.clone(),
            signature: entry.signature.clone(),
        }
    }

    /// Extracts the entry carried by this message.
    pub fn to_entry(&self) -> SignedRegistryEntry {
        SignedRegistryEntry {
            public_key: self.public_key.clone(),
            revision: self.revision,
            data: self.data.clone(),
            signature: self.signature.clone(),
        }
    }

    fn encoded_len(&self) -> usize {
        1 + 1
            + self.public_key.len()
            + 8
            + 1
            + self.data.len()
            + self.signature.as_ref().map_or(0, |s| s.len())
    }

    fn encode_into(&self, buf: &mut BytesMut) -> Result<(), FrameError> {
        buf.put_u8(self.message_type as u8);
        put_short_bytes(buf, "public key", &self.public_key)?;
        buf.put_u64(self.revision);
        put_short_bytes(buf, "data", &self.data)?;
        if let Some(signature) = &self.signature {
            if signature.len() != SIGNATURE_SIZE {
                return Err(FrameError::InvalidSignatureLength {
                    expected: SIGNATURE_SIZE,
                    actual: signature.len(),
                });
            }
            buf.put_slice(signature);
        }
        Ok(())
    }

    fn decode_body(message_type: MessageType, bytes: &mut Bytes) -> Result<Self, FrameError> {
        let public_key = get_short_bytes(bytes)?;

        if bytes.remaining() < 8 {
            return Err(FrameError::InsufficientBytes);
        }
        let revision = bytes.get_u64();
        let data = get_short_bytes(bytes)?;

        let signature = match bytes.remaining() {
            0 => None,
            SIGNATURE_SIZE => Some(bytes.split_to(SIGNATURE_SIZE)),
            actual => {
                return Err(FrameError::InvalidSignatureLength {
                    expected: SIGNATURE_SIZE,
                    actual,
                });
            }
        };

        Ok(Self {
            message_type,
            public_key,
            revision,
            data,
            signature,
        })
    }
}

impl Query {
    pub fn new(public_key: impl Into<Bytes>) -> Self {
        Self {
            public_key: public_key.into(),
        }
    }
}

impl Frame {
    /// Returns the tag byte this frame is encoded with.
    pub fn tag(&self) -> u8 {
        match self {
            Frame::Message(message) => message.message_type as u8,
            Frame::Query(_) => QUERY_TAG,
        }
    }

    /// Serializes the frame for the wire.
    pub fn encode(&self) -> Result<Bytes, FrameError> {
        match self {
            Frame::Message(message) => {
                let mut buf = BytesMut::with_capacity(message.encoded_len());
                message.encode_into(&mut buf)?;
                Ok(buf.freeze())
            }
            Frame::Query(query) => {
                let mut buf = BytesMut::with_capacity(2 + query.public_key.len());
                buf.put_u8(QUERY_TAG);
                put_short_bytes(&mut buf, "public key", &query.public_key)?;
                Ok(buf.freeze())
            }
        }
    }

    /// Deserializes a frame from its wire format.
    pub fn decode(mut bytes: Bytes) -> Result<Self, FrameError> {
        if !bytes.has_remaining() {
            return Err(FrameError::Empty);
        }

        match bytes.get_u8() {
            QUERY_TAG => {
                let public_key = get_short_bytes(&mut bytes)?;
                if bytes.has_remaining() {
                    return Err(FrameError::TrailingBytes(bytes.remaining()));
                }
                Ok(Frame::Query(Query { public_key }))
            }
            tag => {
                let message_type = MessageType::try_from(tag)?;
                Message::decode_body(message_type, &mut bytes).map(Frame::Message)
            }
        }
    }
}

impl From<Message> for Frame {
    fn from(message: Message) -> Self {
        Frame::Message(message)
    }
}

impl From<Query> for Frame {
    fn from(query: Query) -> Self {
        Frame::Query(query)
    }
}

fn put_short_bytes(buf: &mut BytesMut, field: &'static str, bytes: &[u8]) -> Result<(), FrameError> {
    let len = u8::try_from(bytes.len()).map_err(|_| FrameError::FieldTooLarge {
        field,
        size: bytes.len(),
    })?;
    buf.put_u8(len);
    buf.put_slice(bytes);
    Ok(())
}

fn get_short_bytes(bytes: &mut Bytes) -> Result<Bytes, FrameError> {
    if !bytes.has_remaining() {
        return Err(FrameError::InsufficientBytes);
    }
    let len = bytes.get_u8() as usize;
    if bytes.remaining() < len {
        return Err(FrameError::InsufficientBytes);
    }
    Ok(bytes.split_to(len))
}
