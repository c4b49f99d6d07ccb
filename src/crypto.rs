use {
    crate::constants::SHA256_OUTPUT_LEN,
    base64::{engine::general_purpose::STANDARD as BASE64, Engine},
    hmac::{Hmac, Mac},
    sha2::Sha256,
};

type HmacSha256 = Hmac<Sha256>;

/// Wrapper function to form a HMAC-SHA256 operation.
#[inline]
pub(crate) fn hmac_sha256(key: &[u8], value: &[u8]) -> [u8; SHA256_OUTPUT_LEN] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(value);
    let mut tag = [0; SHA256_OUTPUT_LEN];
    tag.copy_from_slice(mac.finalize().into_bytes().as_slice());
    tag
}

/// HMAC-SHA256 the value and return the standard base64 encoding of the tag.
#[inline]
pub(crate) fn hmac_sha256_base64(key: &[u8], value: &[u8]) -> String {
    BASE64.encode(hmac_sha256(key, value))
}
