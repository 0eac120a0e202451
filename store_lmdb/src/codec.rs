//! Key layouts and value encoding shared by the store implementations.
//!
//! Values are bincode. Integer key parts are big-endian so LMDB's byte order
//! matches numeric order. Variable-length address parts are terminated with
//! `0x00`, which never appears in base58 text, so prefix scans for one
//! address cannot match a longer address.

use serde::de::DeserializeOwned;
use serde::Serialize;

use fomo_types::{DayIndex, ProposalId, Timestamp, WalletAddress};
use uuid::Uuid;

use crate::LmdbError;

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, LmdbError> {
    Ok(bincode::serialize(value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LmdbError> {
    Ok(bincode::deserialize(bytes)?)
}

pub(crate) fn proposal_key(id: &ProposalId) -> [u8; 8] {
    id.sequence().to_be_bytes()
}

/// `voter ++ 0x00`
pub(crate) fn wallet_prefix(wallet: &WalletAddress) -> Vec<u8> {
    let mut key = Vec::with_capacity(wallet.as_str().len() + 1 + 8 + 16);
    key.extend_from_slice(wallet.as_str().as_bytes());
    key.push(0);
    key
}

/// `prefix ++ created_at ++ id`
pub(crate) fn timed_key(prefix: &[u8], at: Timestamp, id: &Uuid) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 8 + 16);
    key.extend_from_slice(prefix);
    key.extend_from_slice(&at.as_secs().to_be_bytes());
    key.extend_from_slice(id.as_bytes());
    key
}

/// `proposal_seq ++ day ++ voter`
pub(crate) fn vote_day_key(proposal: &ProposalId, day: DayIndex, voter: &WalletAddress) -> Vec<u8> {
    let mut key = Vec::with_capacity(16 + voter.as_str().len());
    key.extend_from_slice(&proposal_key(proposal));
    key.extend_from_slice(&day.as_u64().to_be_bytes());
    key.extend_from_slice(voter.as_str().as_bytes());
    key
}

pub(crate) fn read_u32(bytes: Option<&[u8]>) -> Result<u32, LmdbError> {
    match bytes {
        None => Ok(0),
        Some(b) => {
            let arr: [u8; 4] = b
                .try_into()
                .map_err(|_| LmdbError::Serialization("counter has unexpected byte length".into()))?;
            Ok(u32::from_be_bytes(arr))
        }
    }
}

pub(crate) fn read_u64(bytes: Option<&[u8]>) -> Result<u64, LmdbError> {
    match bytes {
        None => Ok(0),
        Some(b) => {
            let arr: [u8; 8] = b
                .try_into()
                .map_err(|_| LmdbError::Serialization("counter has unexpected byte length".into()))?;
            Ok(u64::from_be_bytes(arr))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fomo_nullables::test_wallet;

    #[test]
    fn timed_keys_sort_by_time() {
        let prefix = wallet_prefix(&test_wallet(1));
        let id = Uuid::new_v4();
        let early = timed_key(&prefix, Timestamp::new(9), &id);
        let late = timed_key(&prefix, Timestamp::new(300), &id);
        assert!(early < late);
    }

    #[test]
    fn wallet_prefix_does_not_match_longer_address() {
        let short = WalletAddress::new("1".repeat(43)).unwrap();
        let long = WalletAddress::new("1".repeat(44)).unwrap();
        assert!(!wallet_prefix(&long).starts_with(&wallet_prefix(&short)));
    }

    #[test]
    fn missing_counter_reads_as_zero() {
        assert_eq!(read_u32(None).unwrap(), 0);
        assert_eq!(read_u64(Some(&7u64.to_be_bytes())).unwrap(), 7);
        assert!(read_u32(Some(&[1, 2])).is_err());
    }
}
