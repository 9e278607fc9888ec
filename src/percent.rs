//! Provides strict percent-decoding.
//!
//! The decoders here reject malformed input instead of passing it through,
//! because request construction needs to detect bad encodings (a bad query
//! parameter is skipped, a bad path is served undecoded).

fn percent_decode(raw: &str, plus_is_space: bool) -> Option<Vec<u8>> {
  let mut bytes = raw.bytes();
  let mut decoded = Vec::with_capacity(raw.len());

  while let Some(byte) = bytes.next() {
    match byte {
      b'%' => {
        let [hex_dig_1, hex_dig_2] = [bytes.next()?, bytes.next()?];
        let hex = [hex_dig_1, hex_dig_2];
        let hex = std::str::from_utf8(&hex).ok()?;
        decoded.push(u8::from_str_radix(hex, 16).ok()?);
      }
      b'+' if plus_is_space => decoded.push(b' '),
      other => decoded.push(other),
    }
  }

  Some(decoded)
}

/// Decodes a request path. `+` stays a literal plus.
/// Returns None if the input contains a malformed or non-utf8 escape.
pub fn decode_path(raw: &str) -> Option<String> {
  String::from_utf8(percent_decode(raw, false)?).ok()
}

/// Decodes a query parameter key or value. `+` becomes a space.
/// Returns None if the input contains a malformed or non-utf8 escape.
pub fn decode_query(raw: &str) -> Option<String> {
  String::from_utf8(percent_decode(raw, true)?).ok()
}
