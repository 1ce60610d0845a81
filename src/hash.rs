//! Digests and keyed hashes
//!
//! [`create`] returns the plain digest of the data when no salt is given and
//! the HMAC keyed by the salt otherwise, as lowercase hex.

use std::fmt;
use std::str::FromStr;

use hmac::digest::core_api::BlockSizeUser;
use hmac::digest::Digest;
use hmac::{Mac, SimpleHmac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};

use crate::error::{Error, Result};

/// Supported hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl Algorithm {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            "sha224" => Ok(Self::Sha224),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            _ => Err(Error::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Hash `data`, keyed by `salt` when it is not empty
pub fn create(
    algorithm: Algorithm,
    data: impl AsRef<[u8]>,
    salt: impl AsRef<[u8]>,
) -> Result<String> {
    let (data, salt) = (data.as_ref(), salt.as_ref());
    if salt.is_empty() {
        return Ok(match algorithm {
            Algorithm::Md5 => digest::<Md5>(data),
            Algorithm::Sha1 => digest::<Sha1>(data),
            Algorithm::Sha224 => digest::<Sha224>(data),
            Algorithm::Sha256 => digest::<Sha256>(data),
            Algorithm::Sha384 => digest::<Sha384>(data),
            Algorithm::Sha512 => digest::<Sha512>(data),
        });
    }
    match algorithm {
        Algorithm::Md5 => keyed::<Md5>(salt, data),
        Algorithm::Sha1 => keyed::<Sha1>(salt, data),
        Algorithm::Sha224 => keyed::<Sha224>(salt, data),
        Algorithm::Sha256 => keyed::<Sha256>(salt, data),
        Algorithm::Sha384 => keyed::<Sha384>(salt, data),
        Algorithm::Sha512 => keyed::<Sha512>(salt, data),
    }
}

fn digest<D: Digest>(data: &[u8]) -> String {
    hex::encode(D::digest(data))
}

fn keyed<D: Digest + BlockSizeUser>(key: &[u8], data: &[u8]) -> Result<String> {
    let mut mac = <SimpleHmac<D> as Mac>::new_from_slice(key).map_err(|_| Error::HmacKey)?;
    mac.update(data);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_digests() {
        assert_eq!(
            create(Algorithm::Md5, "", "").unwrap(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(
            create(Algorithm::Sha1, "abc", "").unwrap(),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(
            create(Algorithm::Sha256, "abc", "").unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hmac_sha256_rfc4231() {
        // Test case 1
        let key = [0x0b_u8; 20];
        assert_eq!(
            create(Algorithm::Sha256, "Hi There", key).unwrap(),
            "b0344c61d8db38535ca8afceaf0bf12b881dc200c9833da726e9376c2e32cff7"
        );
        // Test case 2
        assert_eq!(
            create(Algorithm::Sha256, "what do ya want for nothing?", "Jefe").unwrap(),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
        // Test case 6, key longer than the block size
        let key = [0xaa_u8; 131];
        assert_eq!(
            create(
                Algorithm::Sha256,
                "Test Using Larger Than Block-Size Key - Hash Key First",
                key
            )
            .unwrap(),
            "60e431591ee0b67f0d8a26aacbf5b77f8e0bc6213728c5140546040f0ee37f54"
        );
    }

    #[test]
    fn test_hmac_sha512_rfc4231() {
        assert_eq!(
            create(Algorithm::Sha512, "what do ya want for nothing?", "Jefe").unwrap(),
            "164b7a7bfcf819e2e395fbe73b56e0a387bd64222e831fd610270cd7ea250554\
             9758bf75c05a994a6d034f65f8f0e6fdcaeab1a34d4a6b4b636e070a38bce737"
        );
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!("SHA256".parse::<Algorithm>().unwrap(), Algorithm::Sha256);
        assert_eq!(Algorithm::Md5.to_string(), "md5");
        assert!(matches!(
            "whirlpool".parse::<Algorithm>(),
            Err(Error::UnknownAlgorithm(name)) if name == "whirlpool"
        ));
    }
}
