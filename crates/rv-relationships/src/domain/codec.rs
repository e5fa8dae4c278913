//! # Persisted Layout
//!
//! Little-endian binary layout of the relationship collection.
//!
//! ```text
//! collection := count:u64 record*
//! record     := version:u8 tx_id:32 key_type:u32 key_index:u32
//!               next_hash:32 next_index:u64
//!               seed_len:u16 seed flag_len:u16 flag
//!               encryption_type:u32 encryption_key:32 accepted:u8
//!               member_count:u64 member*
//! member     := base_key:33 next_hash:32 next_index:u64 accepted:u8
//! ```
//!
//! One-time keys are never written; decoding recomputes them from the base
//! keys. Our own base key is resolved through the caller-supplied lookup.

use super::entities::{EncryptionType, Member, Relationship};
use super::errors::{KVStoreError, RelationshipError};
use shared_crypto::{Hash32, PublicKey};
use shared_types::{KeyType, TxId};

/// Current record format version.
pub const RECORD_VERSION: u8 = 0;

const MEMBER_LEN: usize = 33 + 32 + 8 + 1;

fn corrupt(message: impl Into<String>) -> RelationshipError {
    RelationshipError::Storage(KVStoreError::CorruptionError {
        message: message.into(),
    })
}

/// Encode the full collection.
pub fn encode_relationships(relationships: &[Relationship]) -> Result<Vec<u8>, RelationshipError> {
    let mut out = Vec::new();
    out.extend_from_slice(&(relationships.len() as u64).to_le_bytes());
    for relationship in relationships {
        encode_record(relationship, &mut out)?;
    }
    Ok(out)
}

fn encode_record(r: &Relationship, out: &mut Vec<u8>) -> Result<(), RelationshipError> {
    out.push(RECORD_VERSION);
    out.extend_from_slice(r.tx_id.as_bytes());
    out.extend_from_slice(&u32::from(r.key_type).to_le_bytes());
    out.extend_from_slice(&r.key_index.to_le_bytes());
    out.extend_from_slice(r.next_hash());
    out.extend_from_slice(&r.next_index().to_le_bytes());
    put_short_bytes(out, "seed", &r.seed)?;
    put_short_bytes(out, "flag", &r.flag)?;
    out.extend_from_slice(&r.encryption_type.as_u32().to_le_bytes());
    out.extend_from_slice(&r.encryption_key.unwrap_or([0u8; 32]));
    out.push(r.accepted as u8);
    out.extend_from_slice(&(r.members.len() as u64).to_le_bytes());
    for member in &r.members {
        out.extend_from_slice(member.base_key.as_bytes());
        out.extend_from_slice(member.next_hash());
        out.extend_from_slice(&member.next_index().to_le_bytes());
        out.push(member.accepted as u8);
    }
    Ok(())
}

fn put_short_bytes(out: &mut Vec<u8>, field: &str, bytes: &[u8]) -> Result<(), RelationshipError> {
    let len = u16::try_from(bytes.len())
        .map_err(|_| RelationshipError::InvalidArgument(format!("{} longer than 65535 bytes", field)))?;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

/// Decode the full collection. `resolve_base` maps our key reference to our
/// static public key.
pub fn decode_relationships<F>(
    bytes: &[u8],
    mut resolve_base: F,
) -> Result<Vec<Relationship>, RelationshipError>
where
    F: FnMut(KeyType, u32) -> Result<PublicKey, RelationshipError>,
{
    let mut reader = Reader::new(bytes);
    let count = reader.u64()?;
    let mut relationships = Vec::new();
    for _ in 0..count {
        relationships.push(decode_record(&mut reader, &mut resolve_base)?);
    }
    if !reader.is_empty() {
        return Err(corrupt(format!("{} trailing bytes", reader.remaining())));
    }
    Ok(relationships)
}

fn decode_record<F>(reader: &mut Reader<'_>, resolve_base: &mut F) -> Result<Relationship, RelationshipError>
where
    F: FnMut(KeyType, u32) -> Result<PublicKey, RelationshipError>,
{
    let version = reader.u8()?;
    if version != RECORD_VERSION {
        return Err(RelationshipError::UnsupportedVersion {
            found: version,
            supported: RECORD_VERSION,
        });
    }

    let tx_id = TxId(reader.array()?);
    let key_type = KeyType::try_from(reader.u32()?).map_err(|e| corrupt(e.to_string()))?;
    let key_index = reader.u32()?;
    let next_hash: Hash32 = reader.array()?;
    let next_index = reader.u64()?;
    let seed = reader.short_bytes()?;
    let flag = reader.short_bytes()?;
    let encryption_type = reader.u32()?;
    let encryption_type = EncryptionType::from_u32(encryption_type)
        .ok_or_else(|| corrupt(format!("unknown encryption type {}", encryption_type)))?;
    let encryption_key: Hash32 = reader.array()?;
    let accepted = reader.bool()?;

    let member_count = reader.u64()?;
    if member_count > (reader.remaining() / MEMBER_LEN) as u64 {
        return Err(corrupt(format!("member count {} exceeds record", member_count)));
    }
    let mut members = Vec::with_capacity(member_count as usize);
    for _ in 0..member_count {
        let base_key = PublicKey::from_bytes(reader.array()?).map_err(|e| corrupt(e.to_string()))?;
        let member_hash: Hash32 = reader.array()?;
        let member_index = reader.u64()?;
        let member_accepted = reader.bool()?;
        members.push(Member::at_position(
            base_key,
            member_hash,
            member_index,
            member_accepted,
        )?);
    }

    let base_key = resolve_base(key_type, key_index)?;
    let mut relationship =
        Relationship::new(key_type, key_index, base_key, seed, flag, encryption_type)?;
    relationship.restore_chain(next_hash, next_index)?;
    relationship.tx_id = tx_id;
    relationship.accepted = accepted;
    relationship.members = members;
    relationship.encryption_key = match encryption_type {
        EncryptionType::Indirect => Some(encryption_key),
        EncryptionType::Direct => None,
    };
    Ok(relationship)
}

struct Reader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], RelationshipError> {
        if self.remaining() < len {
            return Err(corrupt(format!(
                "truncated at byte {}: need {}, have {}",
                self.position,
                len,
                self.remaining()
            )));
        }
        let slice = &self.bytes[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], RelationshipError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, RelationshipError> {
        Ok(self.take(1)?[0])
    }

    fn bool(&mut self) -> Result<bool, RelationshipError> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(corrupt(format!("invalid bool {}", other))),
        }
    }

    fn u32(&mut self) -> Result<u32, RelationshipError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, RelationshipError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn short_bytes(&mut self) -> Result<Vec<u8>, RelationshipError> {
        let len = u16::from_le_bytes(self.array()?) as usize;
        Ok(self.take(len)?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::PrivateKey;

    fn our_key() -> PrivateKey {
        PrivateKey::from_bytes([0x51u8; 32]).unwrap()
    }

    fn sample() -> Relationship {
        let mut r = Relationship::new(
            KeyType::RelateIn,
            4,
            our_key().public_key(),
            vec![3u8; 32],
            vec![8u8; 32],
            EncryptionType::Indirect,
        )
        .unwrap();
        r.tx_id = TxId([0xEE; 32]);
        r.encryption_key = Some([0x44; 32]);
        r.advance().unwrap();
        r.advance().unwrap();

        let seed_hash = r.seed_hash();
        let mut member = Member::new(PrivateKey::from_bytes([0x52u8; 32]).unwrap().public_key(), seed_hash).unwrap();
        member.advance().unwrap();
        member.accepted = true;
        r.members.push(member);
        r.members.push(Member::new(PrivateKey::from_bytes([0x53u8; 32]).unwrap().public_key(), seed_hash).unwrap());
        r
    }

    fn resolve(_: KeyType, _: u32) -> Result<PublicKey, RelationshipError> {
        Ok(our_key().public_key())
    }

    #[test]
    fn test_collection_roundtrip_recomputes_keys() {
        let original = sample();
        let bytes = encode_relationships(std::slice::from_ref(&original)).unwrap();
        let decoded = decode_relationships(&bytes, resolve).unwrap();

        assert_eq!(decoded.len(), 1);
        let r = &decoded[0];
        assert_eq!(r, &original);
        assert_eq!(r.next_index(), 3);
        assert_eq!(r.next_key(), original.next_key());
        assert_eq!(r.members[0].next_key(), original.members[0].next_key());
        assert!(r.members[0].accepted);
    }

    #[test]
    fn test_layout_header_fields() {
        let bytes = encode_relationships(&[sample()]).unwrap();

        assert_eq!(u64::from_le_bytes(bytes[0..8].try_into().unwrap()), 1);
        assert_eq!(bytes[8], RECORD_VERSION);
        assert_eq!(&bytes[9..41], &[0xEE; 32]);
        assert_eq!(u32::from_le_bytes(bytes[41..45].try_into().unwrap()), 3);
        assert_eq!(u32::from_le_bytes(bytes[45..49].try_into().unwrap()), 4);
    }

    #[test]
    fn test_direct_relationship_has_no_encryption_key_after_load() {
        let r = Relationship::new(
            KeyType::RelateOut,
            0,
            our_key().public_key(),
            vec![1u8; 32],
            Vec::new(),
            EncryptionType::Direct,
        )
        .unwrap();
        let bytes = encode_relationships(&[r]).unwrap();
        let decoded = decode_relationships(&bytes, resolve).unwrap();
        assert!(decoded[0].encryption_key.is_none());
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut bytes = encode_relationships(&[sample()]).unwrap();
        bytes[8] = 7;
        assert!(matches!(
            decode_relationships(&bytes, resolve),
            Err(RelationshipError::UnsupportedVersion {
                found: 7,
                supported: 0
            })
        ));
    }

    #[test]
    fn test_truncated_record_is_corruption() {
        let bytes = encode_relationships(&[sample()]).unwrap();
        let truncated = &bytes[..bytes.len() - 10];
        assert!(matches!(
            decode_relationships(truncated, resolve),
            Err(RelationshipError::Storage(KVStoreError::CorruptionError { .. }))
        ));
    }

    #[test]
    fn test_empty_collection() {
        let bytes = encode_relationships(&[]).unwrap();
        assert_eq!(bytes, 0u64.to_le_bytes());
        assert!(decode_relationships(&bytes, resolve).unwrap().is_empty());
    }

    #[test]
    fn test_resolver_failure_propagates() {
        let bytes = encode_relationships(&[sample()]).unwrap();
        let result = decode_relationships(&bytes, |_, _| Err(RelationshipError::NotFound));
        assert!(matches!(result, Err(RelationshipError::NotFound)));
    }
}
