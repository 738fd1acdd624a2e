//! Discovery wire protocol.
//!
//! # Packet Layout
//!
//! ```text
//! type        u8   (PING=0x01, PONG=0x02, FINDNODE=0x03, NODES=0x04)
//! request_id  u64 BE
//! payload:
//!   PING / PONG   record_len u16 BE ‖ record
//!   FINDNODE      target node id (32)
//!   NODES         count u8 ‖ count × (record_len u16 BE ‖ record)
//! ```
//!
//! Records are in the binary form of `NodeRecord::to_bytes`.

use thiserror::Error;
use tracing::debug;

use crate::domain::enr::codec::Reader;
use crate::domain::{NodeId, NodeRecord, RecordError};

/// Receive buffer size. Larger datagrams are truncated and fail to decode.
pub const MAX_PACKET_SIZE: usize = 4096;

/// Most records carried by one NODES packet.
pub const MAX_NODES_PER_PACKET: usize = 12;

/// Largest record size for which a full NODES packet still fits the receive
/// buffer: type, request id and count, then a length prefix per record.
pub const MAX_RECORD_SIZE: usize = (MAX_PACKET_SIZE - 1 - 8 - 1) / MAX_NODES_PER_PACKET - 2;

/// Discovery message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// Liveness check carrying the sender's record.
    Ping = 0x01,
    /// Answer to PING carrying the responder's record.
    Pong = 0x02,
    /// Request for nodes close to a target id.
    FindNode = 0x03,
    /// Answer to FINDNODE.
    Nodes = 0x04,
}

impl TryFrom<u8> for MessageType {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Ping),
            0x02 => Ok(Self::Pong),
            0x03 => Ok(Self::FindNode),
            0x04 => Ok(Self::Nodes),
            other => Err(WireError::UnknownType(other)),
        }
    }
}

/// Malformed packet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// First byte is not a known message type.
    #[error("unknown message type {0:#04x}")]
    UnknownType(u8),

    /// Framing or embedded record error.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Too many records for one packet.
    #[error("{0} records exceed the per-packet limit")]
    TooManyNodes(usize),
}

/// A decoded discovery message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// PING with the sender's record.
    Ping {
        /// Echoed in the PONG.
        request_id: u64,
        /// Sender's record.
        record: NodeRecord,
    },
    /// PONG with the responder's record.
    Pong {
        /// Id of the PING being answered.
        request_id: u64,
        /// Responder's record.
        record: NodeRecord,
    },
    /// FINDNODE toward a target.
    FindNode {
        /// Echoed in the NODES answer.
        request_id: u64,
        /// Lookup target.
        target: NodeId,
    },
    /// NODES answer.
    Nodes {
        /// Id of the FINDNODE being answered.
        request_id: u64,
        /// Records that passed validation.
        records: Vec<NodeRecord>,
    },
}

impl Message {
    /// Request id of any message.
    pub fn request_id(&self) -> u64 {
        match self {
            Self::Ping { request_id, .. }
            | Self::Pong { request_id, .. }
            | Self::FindNode { request_id, .. }
            | Self::Nodes { request_id, .. } => *request_id,
        }
    }

    /// Encode for sending.
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let mut out = Vec::with_capacity(256);
        let (kind, request_id) = match self {
            Self::Ping { request_id, .. } => (MessageType::Ping, request_id),
            Self::Pong { request_id, .. } => (MessageType::Pong, request_id),
            Self::FindNode { request_id, .. } => (MessageType::FindNode, request_id),
            Self::Nodes { request_id, .. } => (MessageType::Nodes, request_id),
        };
        out.push(kind as u8);
        out.extend_from_slice(&request_id.to_be_bytes());

        match self {
            Self::Ping { record, .. } | Self::Pong { record, .. } => {
                put_record(&mut out, record)?;
            }
            Self::FindNode { target, .. } => out.extend_from_slice(target.as_bytes()),
            Self::Nodes { records, .. } => {
                if records.len() > MAX_NODES_PER_PACKET {
                    return Err(WireError::TooManyNodes(records.len()));
                }
                out.push(records.len() as u8);
                for record in records {
                    put_record(&mut out, record)?;
                }
            }
        }

        Ok(out)
    }

    /// Decode a received packet.
    ///
    /// Every embedded record is size-limited and signature-checked. A bad
    /// record in PING/PONG fails the packet; bad records inside NODES are
    /// dropped and the rest kept.
    pub fn decode(bytes: &[u8], max_record_size: usize) -> Result<Self, WireError> {
        let mut reader = Reader::new(bytes);
        let kind = MessageType::try_from(reader.u8()?)?;
        let request_id = reader.u64()?;

        let message = match kind {
            MessageType::Ping => Self::Ping {
                request_id,
                record: take_record(&mut reader, max_record_size)?,
            },
            MessageType::Pong => Self::Pong {
                request_id,
                record: take_record(&mut reader, max_record_size)?,
            },
            MessageType::FindNode => Self::FindNode {
                request_id,
                target: NodeId::new(reader.array()?),
            },
            MessageType::Nodes => {
                let count = reader.u8()? as usize;
                if count > MAX_NODES_PER_PACKET {
                    return Err(WireError::TooManyNodes(count));
                }
                let mut records = Vec::with_capacity(count);
                for _ in 0..count {
                    let len = reader.u16()? as usize;
                    let raw = reader.take(len)?;
                    match NodeRecord::from_untrusted(raw, max_record_size) {
                        Ok(record) => records.push(record),
                        Err(err) => debug!(error = %err, "dropping invalid record from NODES"),
                    }
                }
                Self::Nodes {
                    request_id,
                    records,
                }
            }
        };

        reader.finish()?;
        Ok(message)
    }
}

fn put_record(out: &mut Vec<u8>, record: &NodeRecord) -> Result<(), WireError> {
    let bytes = record.to_bytes()?;
    let len = u16::try_from(bytes.len()).map_err(|_| RecordError::TooLarge {
        size: bytes.len(),
        limit: u16::MAX as usize,
    })?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(&bytes);
    Ok(())
}

fn take_record(reader: &mut Reader<'_>, max_record_size: usize) -> Result<NodeRecord, WireError> {
    let len = reader.u16()? as usize;
    Ok(NodeRecord::from_untrusted(reader.take(len)?, max_record_size)?)
}
