//! Frame codec: `PAYLOAD|HH`, where `HH` is the 8-bit truncated sum of the
//! payload bytes in hex.

use crate::error::Nack;

/// Field separator between payload and checksum. The last occurrence wins.
pub const SEPARATOR: char = '|';

/// 8-bit truncated sum of the payload bytes.
#[inline]
pub fn checksum(payload: &str) -> u8 {
    payload.bytes().fold(0u8, u8::wrapping_add)
}

/// Host-side encoder: appends the separator and uppercase two-digit checksum.
pub fn encode(payload: &str) -> String {
    format!("{payload}{SEPARATOR}{:02X}", checksum(payload))
}

/// Validate one received line and return its payload.
///
/// The line is trimmed first (this also drops a trailing CR). Only the first
/// two characters after the last separator form the checksum; anything after
/// them is ignored.
pub fn decode(line: &str) -> Result<&str, Nack> {
    let line = line.trim();
    if line.is_empty() {
        return Err(Nack::Empty);
    }
    let Some(sep) = line.rfind(SEPARATOR) else {
        return Err(Nack::CrcMissing);
    };
    let payload = &line[..sep];
    let mut digits = line[sep + SEPARATOR.len_utf8()..].chars();
    let (Some(hi), Some(lo)) = (digits.next(), digits.next()) else {
        return Err(Nack::CrcMissing);
    };
    let (Some(hi), Some(lo)) = (hi.to_digit(16), lo.to_digit(16)) else {
        return Err(Nack::CrcBadHex);
    };
    let received = hi * 16 + lo;
    if received != u32::from(checksum(payload)) {
        return Err(Nack::CrcFail);
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_checksum_matches_wire_example() {
        assert_eq!(checksum("PING"), 0x2E);
        assert_eq!(encode("PING"), "PING|2E");
    }

    #[test]
    fn empty_payload_has_zero_checksum() {
        assert_eq!(checksum(""), 0);
        assert_eq!(decode("|00"), Ok(""));
    }

    #[test]
    fn checksum_wraps_at_256() {
        // 3 * 0x7F = 0x17D
        let s = String::from_utf8(vec![0x7F, 0x7F, 0x7F]).unwrap();
        assert_eq!(checksum(&s), 0x7D);
    }
}
