//! Identifier shapes used across the store.
//!
//! Two identifiers name a client: the record id (24 lowercase hex digits,
//! the repository primary key) and the client code (`C` followed by eight
//! ASCII alphanumerics, printed on receipts and badges). Both shapes are also
//! what the scan resolver recognises in raw QR text.

use rand_core::{OsRng, RngCore as _};

const CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Length of a record id in hex digits.
pub const RECORD_ID_LEN: usize = 24;

/// Number of alphanumerics after the leading `C` of a client code.
pub const CLIENT_CODE_SUFFIX_LEN: usize = 8;

/// Mint a fresh 96-bit record id, hex encoded.
pub fn new_record_id() -> String {
  let mut bytes = [0u8; RECORD_ID_LEN / 2];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

/// Mint a fresh client code, e.g. `C7K2M9Q0A`.
pub fn new_client_code() -> String {
  let mut code = String::with_capacity(CLIENT_CODE_SUFFIX_LEN + 1);
  code.push('C');
  while code.len() < CLIENT_CODE_SUFFIX_LEN + 1 {
    let mut byte = [0u8; 1];
    OsRng.fill_bytes(&mut byte);
    // Reject the tail of the byte range so every symbol is equally likely.
    if usize::from(byte[0]) >= 252 {
      continue;
    }
    code.push(char::from(CODE_ALPHABET[usize::from(byte[0]) % CODE_ALPHABET.len()]));
  }
  code
}

/// `true` if `s` is exactly 24 hex digits (either case).
pub fn is_record_id(s: &str) -> bool {
  s.len() == RECORD_ID_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// `true` if `s` is `C` followed by exactly eight ASCII alphanumerics.
pub fn is_client_code(s: &str) -> bool {
  s.strip_prefix('C').is_some_and(|rest| {
    rest.len() == CLIENT_CODE_SUFFIX_LEN
      && rest.bytes().all(|b| b.is_ascii_alphanumeric())
  })
}
