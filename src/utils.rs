//! Utility functions for identifiers and serialization

use crate::error::LedgerError;
use bech32::Bech32m;
use uuid7::uuid7;

// construct a unique id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> Result<String, LedgerError> {
    let hrp = bech32::Hrp::parse(hrp).map_err(|e| LedgerError::Codec(e.to_string()))?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())
        .map_err(|e| LedgerError::Codec(e.to_string()))?;
    Ok(encode)
}

pub(crate) fn to_cbor<T: minicbor::Encode<()>>(value: &T) -> Result<Vec<u8>, LedgerError> {
    minicbor::to_vec(value).map_err(LedgerError::from)
}

pub(crate) fn from_cbor<T: for<'b> minicbor::Decode<'b, ()>>(
    bytes: &[u8],
) -> Result<T, LedgerError> {
    minicbor::decode(bytes).map_err(LedgerError::from)
}
