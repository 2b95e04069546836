//! # Identification Strings
//!
//! ATA IDENTIFY data stores model, serial and firmware text as 16-bit
//! words with the first character in the high byte. Read from memory on a
//! little-endian machine, every pair of bytes therefore comes out
//! reversed ("aMtxro" for "Maxtor"). These helpers put the text back in
//! reading order and strip the space padding the drive appends.

use core::fmt;

/// Capacity of a decoded identification string
///
/// The longest field (model number) is 40 bytes.
pub const IDENT_CAPACITY: usize = 64;

/// Decoded identification text
pub type IdentString = heapless::String<IDENT_CAPACITY>;

/// Identification bytes in reading order, exactly as stored
pub type IdentBytes = heapless::Vec<u8, IDENT_CAPACITY>;

/// Errors raised while decoding identification text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentError {
    /// Length is not a whole number of 16-bit words
    OddLength(usize),
    /// Length exceeds the bytes available
    OutOfBounds {
        /// Requested length
        len: usize,
        /// Bytes actually provided
        available: usize,
    },
    /// Result does not fit in an [`IdentString`]
    TooLong(usize),
}

impl fmt::Display for IdentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OddLength(len) => write!(f, "odd length {}", len),
            Self::OutOfBounds { len, available } => {
                write!(f, "length {} exceeds {} bytes", len, available)
            }
            Self::TooLong(len) => write!(f, "{} bytes exceed capacity {}", len, IDENT_CAPACITY),
        }
    }
}

fn check_len(available: usize, len: usize) -> Result<(), IdentError> {
    if len % 2 != 0 {
        return Err(IdentError::OddLength(len));
    }
    if len > available {
        return Err(IdentError::OutOfBounds { len, available });
    }
    Ok(())
}

/// Swap every byte pair of `raw[..len]` into `out`
///
/// Applying it twice gives back the original bytes.
pub fn swap_pairs(raw: &[u8], len: usize, out: &mut [u8]) -> Result<(), IdentError> {
    check_len(raw.len(), len)?;
    if out.len() < len {
        return Err(IdentError::OutOfBounds {
            len,
            available: out.len(),
        });
    }

    for (src, dst) in raw[..len].chunks_exact(2).zip(out.chunks_exact_mut(2)) {
        dst[0] = src[1];
        dst[1] = src[0];
    }
    Ok(())
}

/// Decode the first `len` bytes of a byte-swapped identification field
///
/// `len` must be even: a trailing half word has no defined partner and is
/// rejected rather than truncated. Every byte is kept, so decoding the
/// result again gives back the field.
pub fn decode_swapped(raw: &[u8], len: usize) -> Result<IdentBytes, IdentError> {
    check_len(raw.len(), len)?;
    if len > IDENT_CAPACITY {
        return Err(IdentError::TooLong(len));
    }

    let mut bytes = IdentBytes::new();
    // Capacity was checked against `len` above
    let _ = bytes.resize(len, 0);
    swap_pairs(raw, len, &mut bytes)?;
    Ok(bytes)
}

/// Printable form of decoded bytes
///
/// Text ends at the first NUL; non-ASCII bytes are shown as `?`.
pub fn ident_text(bytes: &[u8]) -> IdentString {
    let mut text = IdentString::new();
    for &byte in bytes.iter().take_while(|&&byte| byte != 0) {
        let ch = if byte.is_ascii() { byte as char } else { '?' };
        if text.push(ch).is_err() {
            break;
        }
    }
    text
}

/// Remove trailing spaces only
///
/// A string made only of spaces becomes empty.
pub fn trim_trailing_spaces(s: &str) -> &str {
    s.trim_end_matches(' ')
}

/// Remove every space, wherever it appears
pub fn compact_spaces(s: &str) -> Result<IdentString, IdentError> {
    let mut text = IdentString::new();
    for ch in s.chars().filter(|&ch| ch != ' ') {
        text.push(ch).map_err(|_| IdentError::TooLong(s.len()))?;
    }
    Ok(text)
}

/// Decode a whole field and drop its trailing padding
pub fn display_ident(raw: &[u8]) -> Result<IdentString, IdentError> {
    let decoded = ident_text(&decode_swapped(raw, raw.len())?);
    let trimmed = trim_trailing_spaces(&decoded);
    let mut text = IdentString::new();
    // A prefix of a string that fit always fits
    let _ = text.push_str(trimmed);
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_swapped() {
        let raw = b"aMtxro";
        assert_eq!(decode_swapped(raw, 6).as_deref(), Ok(&b"Maxtor"[..]));
        assert_eq!(decode_swapped(raw, 4).as_deref(), Ok(&b"Maxt"[..]));
        assert_eq!(decode_swapped(raw, 0).as_deref(), Ok(&b""[..]));
    }

    #[test]
    fn test_decode_rejects_bad_lengths() {
        assert_eq!(decode_swapped(b"aMtxro", 5), Err(IdentError::OddLength(5)));
        assert_eq!(
            decode_swapped(b"aM", 4),
            Err(IdentError::OutOfBounds { len: 4, available: 2 })
        );
        assert_eq!(
            decode_swapped(&[b' '; 66], 66),
            Err(IdentError::TooLong(66))
        );
    }

    #[test]
    fn test_decode_keeps_every_byte() {
        assert_eq!(
            decode_swapped(&[0x41, 0x00, 0x42, 0x43], 4).as_deref(),
            Ok(&[0x00, 0x41, 0x43, 0x42][..])
        );
        assert_eq!(
            decode_swapped(&[0xB5, 0x41, 0x42, 0x43], 4).as_deref(),
            Ok(&[0x41, 0xB5, 0x43, 0x42][..])
        );
    }

    #[test]
    fn test_decode_is_involution() {
        let fields: [&[u8]; 3] = [
            b"ST2000DM008-2FR102  ",
            &[0x41, 0x00, 0x42, 0x43],
            &[0xB5, 0x41, 0x42, 0x43, 0x00, 0xFF],
        ];
        for original in fields {
            let once = decode_swapped(original, original.len()).expect("first pass");
            let twice = decode_swapped(&once, once.len()).expect("second pass");
            assert_eq!(&twice[..], original);
        }

        let original = b"ST2000DM008-2FR102  ";
        let mut swapped = [0u8; 20];
        let mut restored = [0u8; 20];
        swap_pairs(original, 20, &mut swapped).expect("swap");
        swap_pairs(&swapped, 20, &mut restored).expect("swap back");
        assert_eq!(&restored, original);
    }

    #[test]
    fn test_ident_text() {
        assert_eq!(ident_text(b"AB\0C  ").as_str(), "AB");
        assert_eq!(ident_text(&[b'A', 0xFF]).as_str(), "A?");
        assert_eq!(ident_text(b"").as_str(), "");
    }

    #[test]
    fn test_swap_pairs_checks_output() {
        let mut out = [0u8; 2];
        assert_eq!(
            swap_pairs(b"abcd", 4, &mut out),
            Err(IdentError::OutOfBounds { len: 4, available: 2 })
        );
        assert_eq!(swap_pairs(b"abc", 3, &mut out), Err(IdentError::OddLength(3)));
    }

    #[test]
    fn test_trim_trailing_spaces() {
        assert_eq!(trim_trailing_spaces("ABC   "), "ABC");
        assert_eq!(trim_trailing_spaces("   "), "");
        assert_eq!(trim_trailing_spaces("  A B  "), "  A B");
        assert_eq!(trim_trailing_spaces(""), "");
    }

    #[test]
    fn test_compact_spaces() {
        assert_eq!(compact_spaces("A B C").as_deref(), Ok("ABC"));
        assert_eq!(compact_spaces("    WD-WCC4E1234567").as_deref(), Ok("WD-WCC4E1234567"));
        assert_eq!(compact_spaces("   ").as_deref(), Ok(""));
    }

    #[test]
    fn test_display_ident() {
        // "WDC WD10EZEX" padded to 16 bytes, stored swapped
        let raw = b"DWC DW01ZEXE    ";
        assert_eq!(display_ident(raw).as_deref(), Ok("WDC WD10EZEX"));
        assert_eq!(display_ident(b"abc"), Err(IdentError::OddLength(3)));

        // Text ends at the NUL, high bytes are masked
        assert_eq!(display_ident(&[b'B', b'A', 0, b'C']).as_deref(), Ok("AB"));
        assert_eq!(display_ident(&[0xFF, b'A']).as_deref(), Ok("A?"));
    }
}
