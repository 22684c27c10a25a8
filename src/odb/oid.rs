use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};
use crate::odb::ObjectKind;

pub const OID_RAW_LEN: usize = 20;
pub const OID_HEX_LEN: usize = OID_RAW_LEN * 2;

/// Content address of a stored object.
///
/// Minted from the object kind plus the object bytes, so the same bytes
/// under different kinds get different ids. Text form is 40 lowercase
/// hex characters; equality is byte equality.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Oid([u8; OID_RAW_LEN]);

impl Oid {
    /// Computes the id `bytes` of kind `kind` would be stored under,
    /// without writing anything.
    pub fn hash(kind: ObjectKind, data: &[u8]) -> Oid {
        let mut hasher = Sha1::new();
        hasher.update(kind.as_str().as_bytes());
        hasher.update(b" ");
        hasher.update(data.len().to_string().as_bytes());
        hasher.update(b"\0");
        hasher.update(data);
        Oid(hasher.finalize().into())
    }

    pub fn from_raw(raw: [u8; OID_RAW_LEN]) -> Oid {
        Oid(raw)
    }

    pub fn from_hex(hex_str: &str) -> Result<Oid> {
        let raw = hex::decode(hex_str)
            .map_err(|_| Error::InvalidOid(hex_str.to_string()))?;
        let raw: [u8; OID_RAW_LEN] = raw
            .try_into()
            .map_err(|_| Error::InvalidOid(hex_str.to_string()))?;
        Ok(Oid(raw))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; OID_RAW_LEN] {
        &self.0
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Oid({})", self.to_hex())
    }
}

impl FromStr for Oid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Oid> {
        Oid::from_hex(s)
    }
}
