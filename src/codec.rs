//! Characteristic Payload Codec
//!
//! Peripherals in this protocol exchange plain UTF-8 text over their
//! characteristics; the codec is the only place bytes become text and back.

/// Decode characteristic bytes into displayable text.
///
/// Decoding is best-effort: malformed UTF-8 sequences become U+FFFD
/// replacement characters rather than an error, since peripheral firmware
/// cannot be trusted to emit valid text.
pub fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Encode outbound text as UTF-8 bytes.
///
/// `decode_text(&encode_text(t)) == t` for any valid text `t`.
pub fn encode_text(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}
