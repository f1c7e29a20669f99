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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ascii() {
        assert_eq!(decode_text(&[0x48, 0x69]), "Hi");
    }

    #[test]
    fn test_encode_ascii() {
        assert_eq!(encode_text("Ping"), vec![0x50, 0x69, 0x6e, 0x67]);
    }

    #[test]
    fn test_round_trip() {
        for text in ["", "Hi", "Ping", "héllo wörld", "日本語テキスト", "mixed 123 ü"] {
            assert_eq!(decode_text(&encode_text(text)), text);
        }
    }

    #[test]
    fn test_invalid_utf8_decodes_lossily() {
        // 0xFF never appears in well-formed UTF-8
        assert_eq!(decode_text(&[0x48, 0xFF, 0x69]), "H\u{FFFD}i");
    }
}


