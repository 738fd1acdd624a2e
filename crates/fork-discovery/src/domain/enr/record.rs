//! Signed node record.
//!
//! # Binary Layout
//!
//! ```text
//! seq            u64 BE
//! pubkey         33 bytes (compressed secp256k1)
//! ip             tag u8 (0 = none, 4, 6) followed by 0 / 4 / 16 bytes
//! udp            u16 BE (0 = unset)
//! tcp            u16 BE (0 = unset)
//! entry count    u8
//! entries        key_len u8 ‖ key (UTF-8) ‖ value_len u16 BE ‖ value, sorted by key
//! signature      64 bytes over everything above
//! ```
//!
//! The textual form is `enr:` followed by the unpadded base64url encoding.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use super::codec::Reader;
use super::security::{verify_signature, PublicKey, RecordSigner, Signature};
use crate::domain::{IdentityError, NodeId, RecordError, SigningError};

/// Prefix of the textual record form.
pub const ENR_PREFIX: &str = "enr:";

const IP_NONE: u8 = 0;
const IP_V4: u8 = 4;
const IP_V6: u8 = 6;

/// Self-signed node identity record.
///
/// Any mutation invalidates the signature until the record is re-signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    seq: u64,
    pubkey: PublicKey,
    ip: Option<IpAddr>,
    udp_port: Option<u16>,
    tcp_port: Option<u16>,
    entries: BTreeMap<String, Vec<u8>>,
    signature: Signature,
}

/// Configuration for creating a new NodeRecord
#[derive(Debug, Clone)]
pub struct NodeRecordConfig {
    /// Initial sequence number
    pub seq: u64,
    /// Public key of the signer that will own the record
    pub pubkey: PublicKey,
    /// Advertised IP address
    pub ip: Option<IpAddr>,
    /// Discovery (UDP) port
    pub udp_port: Option<u16>,
    /// Connection (TCP) port
    pub tcp_port: Option<u16>,
}

impl NodeRecord {
    /// Create a new unsigned record (for building).
    pub fn new_unsigned(config: NodeRecordConfig) -> Self {
        Self {
            seq: config.seq,
            pubkey: config.pubkey,
            ip: config.ip,
            udp_port: config.udp_port.filter(|p| *p != 0),
            tcp_port: config.tcp_port.filter(|p| *p != 0),
            entries: BTreeMap::new(),
            signature: Signature::empty(),
        }
    }

    /// Sequence number.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Public key.
    pub fn pubkey(&self) -> &PublicKey {
        &self.pubkey
    }

    /// Node id, `SHA-256(pubkey)`.
    pub fn node_id(&self) -> NodeId {
        NodeId::from_public_key(&self.pubkey.0)
    }

    /// Advertised IP.
    pub fn ip(&self) -> Option<IpAddr> {
        self.ip
    }

    /// Discovery port.
    pub fn udp_port(&self) -> Option<u16> {
        self.udp_port
    }

    /// Connection port.
    pub fn tcp_port(&self) -> Option<u16> {
        self.tcp_port
    }

    /// Discovery endpoint, if both IP and UDP port are set.
    pub fn udp_socket_addr(&self) -> Option<SocketAddr> {
        Some(SocketAddr::new(self.ip?, self.udp_port?))
    }

    /// Dialable endpoint, if both IP and TCP port are set.
    pub fn tcp_socket_addr(&self) -> Option<SocketAddr> {
        Some(SocketAddr::new(self.ip?, self.tcp_port?))
    }

    /// Signature as last computed.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Raw value of an entry.
    pub fn entry(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Set or overwrite an entry.
    pub fn set_entry(&mut self, key: impl Into<String>, value: Vec<u8>) {
        self.entries.insert(key.into(), value);
    }

    /// Set the advertised IP.
    pub fn set_ip(&mut self, ip: Option<IpAddr>) {
        self.ip = ip;
    }

    /// Set the discovery port (0 clears it).
    pub fn set_udp_port(&mut self, port: u16) {
        self.udp_port = (port != 0).then_some(port);
    }

    /// Set the connection port (0 clears it).
    pub fn set_tcp_port(&mut self, port: u16) {
        self.tcp_port = (port != 0).then_some(port);
    }

    /// Advance the sequence number. Call once per published change.
    pub fn bump_seq(&mut self) {
        self.seq = self.seq.saturating_add(1);
    }

    /// Everything covered by the signature.
    pub fn signing_payload(&self) -> Result<Vec<u8>, RecordError> {
        let mut payload = Vec::with_capacity(128);
        payload.extend_from_slice(&self.seq.to_be_bytes());
        payload.extend_from_slice(&self.pubkey.0);

        match self.ip {
            None => payload.push(IP_NONE),
            Some(IpAddr::V4(v4)) => {
                payload.push(IP_V4);
                payload.extend_from_slice(&v4.octets());
            }
            Some(IpAddr::V6(v6)) => {
                payload.push(IP_V6);
                payload.extend_from_slice(&v6.octets());
            }
        }

        payload.extend_from_slice(&self.udp_port.unwrap_or(0).to_be_bytes());
        payload.extend_from_slice(&self.tcp_port.unwrap_or(0).to_be_bytes());

        let count = u8::try_from(self.entries.len())
            .map_err(|_| RecordError::TooManyEntries(self.entries.len()))?;
        payload.push(count);

        for (key, value) in &self.entries {
            let key_len = u8::try_from(key.len())
                .ok()
                .filter(|len| *len > 0)
                .ok_or(RecordError::InvalidKey)?;
            let value_len =
                u16::try_from(value.len()).map_err(|_| RecordError::ValueTooLong(key.clone()))?;
            payload.push(key_len);
            payload.extend_from_slice(key.as_bytes());
            payload.extend_from_slice(&value_len.to_be_bytes());
            payload.extend_from_slice(value);
        }

        Ok(payload)
    }

    /// Sign the current contents.
    ///
    /// # Errors
    ///
    /// `SigningError::KeyMismatch` if the signer holds a different key than
    /// the record was built for; any backend failure from the signer.
    pub fn sign(&mut self, signer: &dyn RecordSigner) -> Result<(), IdentityError> {
        if signer.public_key() != self.pubkey {
            return Err(SigningError::KeyMismatch.into());
        }
        let payload = self.signing_payload()?;
        self.signature = signer.sign(&payload)?;
        Ok(())
    }

    /// Verify the signature against the record's own public key.
    pub fn verify_signature(&self) -> bool {
        match self.signing_payload() {
            Ok(payload) => verify_signature(&self.pubkey, &payload, &self.signature),
            Err(_) => false,
        }
    }

    /// Binary encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RecordError> {
        let mut bytes = self.signing_payload()?;
        bytes.extend_from_slice(&self.signature.0);
        Ok(bytes)
    }

    /// Decode the binary form. The signature is not checked.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        let mut reader = Reader::new(bytes);

        let seq = reader.u64()?;
        let pubkey = PublicKey(reader.array()?);

        let ip = match reader.u8()? {
            IP_NONE => None,
            IP_V4 => Some(IpAddr::V4(Ipv4Addr::from(reader.array::<4>()?))),
            IP_V6 => Some(IpAddr::V6(Ipv6Addr::from(reader.array::<16>()?))),
            tag => return Err(RecordError::InvalidIpTag(tag)),
        };

        let udp_port = Some(reader.u16()?).filter(|p| *p != 0);
        let tcp_port = Some(reader.u16()?).filter(|p| *p != 0);

        let count = reader.u8()?;
        let mut entries = BTreeMap::new();
        for _ in 0..count {
            let key_len = reader.u8()? as usize;
            if key_len == 0 {
                return Err(RecordError::InvalidKey);
            }
            let key = std::str::from_utf8(reader.take(key_len)?)
                .map_err(|_| RecordError::InvalidKey)?
                .to_string();
            let value_len = reader.u16()? as usize;
            let value = reader.take(value_len)?.to_vec();
            if entries.insert(key.clone(), value).is_some() {
                return Err(RecordError::DuplicateKey(key));
            }
        }

        let signature = Signature(reader.array()?);
        reader.finish()?;

        Ok(Self {
            seq,
            pubkey,
            ip,
            udp_port,
            tcp_port,
            entries,
            signature,
        })
    }

    /// Decode and enforce a size limit and a valid signature.
    ///
    /// This is the check applied to every record received from the network.
    pub fn from_untrusted(bytes: &[u8], max_size: usize) -> Result<Self, RecordError> {
        if bytes.len() > max_size {
            return Err(RecordError::TooLarge {
                size: bytes.len(),
                limit: max_size,
            });
        }
        let record = Self::from_bytes(bytes)?;
        if !record.verify_signature() {
            return Err(RecordError::InvalidSignature);
        }
        Ok(record)
    }

    /// Textual `enr:` form.
    pub fn to_text(&self) -> Result<String, RecordError> {
        Ok(format!("{ENR_PREFIX}{}", URL_SAFE_NO_PAD.encode(self.to_bytes()?)))
    }
}

impl FromStr for NodeRecord {
    type Err = RecordError;

    /// Parse the textual form. The signature must verify.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let encoded = s
            .trim()
            .strip_prefix(ENR_PREFIX)
            .ok_or(RecordError::MissingPrefix)?;
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| RecordError::InvalidBase64)?;
        let record = Self::from_bytes(&bytes)?;
        if !record.verify_signature() {
            return Err(RecordError::InvalidSignature);
        }
        Ok(record)
    }
}
