use argon2::{Algorithm, Argon2, Params, Version};
use base64ct::{Base64Unpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use subtle::ConstantTimeEq;

const SALT_LEN: usize = 16;
const DIGEST_LEN: usize = 32;
const MEMORY_KIB: u32 = 64 * 1024;
const TIME_COST: u32 = 1;
const PARALLELISM: u32 = 4;
const SEPARATOR: char = '$';

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("secure randomness unavailable: {0}")]
    Randomness(String),
    #[error("argon2 failure: {0}")]
    Kdf(String),
}

fn argon2() -> Result<Argon2<'static>, HashError> {
    let params = Params::new(MEMORY_KIB, TIME_COST, PARALLELISM, Some(DIGEST_LEN))
        .map_err(|e| HashError::Kdf(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

fn derive(plain: &str, salt: &[u8]) -> Result<[u8; DIGEST_LEN], HashError> {
    let mut out = [0u8; DIGEST_LEN];
    argon2()?
        .hash_password_into(plain.as_bytes(), salt, &mut out)
        .map_err(|e| HashError::Kdf(e.to_string()))?;
    Ok(out)
}

/// Hashes `plain` with a fresh random salt.
///
/// The result is `base64(salt)$base64(digest)`, standard alphabet, no padding.
pub fn hash_password(plain: &str) -> Result<String, HashError> {
    hash_password_with(&mut OsRng, plain)
}

fn hash_password_with<R: RngCore>(rng: &mut R, plain: &str) -> Result<String, HashError> {
    let mut salt = [0u8; SALT_LEN];
    rng.try_fill_bytes(&mut salt)
        .map_err(|e| HashError::Randomness(e.to_string()))?;
    let digest = derive(plain, &salt)?;
    Ok(format!(
        "{}{}{}",
        Base64Unpadded::encode_string(&salt),
        SEPARATOR,
        Base64Unpadded::encode_string(&digest)
    ))
}

/// Checks `plain` against an encoded digest. Malformed encodings never match.
pub fn verify_password(plain: &str, encoded: &str) -> bool {
    let mut parts = encoded.split(SEPARATOR);
    let (Some(salt), Some(digest), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (
        Base64Unpadded::decode_vec(salt),
        Base64Unpadded::decode_vec(digest),
    ) else {
        return false;
    };

    match derive(plain, &salt) {
        Ok(actual) => actual.as_slice().ct_eq(expected.as_slice()).into(),
        Err(_) => false,
    }
}
