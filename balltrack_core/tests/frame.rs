use balltrack_core::Nack;
use balltrack_core::frame::{checksum, decode, encode};
use rstest::rstest;

#[rstest]
#[case("PING|2E", Ok("PING"))]
#[case("PING|2e", Ok("PING"))]
#[case("  PING|2E \r", Ok("PING"))]
#[case("PING|2EXYZ", Ok("PING"))]
#[case("A|B|FF", Ok("A|B"))]
#[case("", Err(Nack::Empty))]
#[case(" \t\r", Err(Nack::Empty))]
#[case("PING", Err(Nack::CrcMissing))]
#[case("PING|", Err(Nack::CrcMissing))]
#[case("PING|2", Err(Nack::CrcMissing))]
#[case("PING|GG", Err(Nack::CrcBadHex))]
#[case("PING|2G", Err(Nack::CrcBadHex))]
#[case("PING|2F", Err(Nack::CrcFail))]
fn decode_cases(#[case] line: &str, #[case] expected: Result<&str, Nack>) {
    assert_eq!(decode(line), expected);
}

#[test]
fn encoded_frames_decode_to_their_payload() {
    for payload in ["PING", "TARGET(26.5)", "PID(3,2,1.5)", "ECHO(a|b)", ""] {
        let line = encode(payload);
        assert_eq!(decode(&line), Ok(payload), "{line}");
    }
}

#[test]
fn encode_uses_uppercase_two_digit_hex() {
    // 'A' = 0x41
    assert_eq!(encode("A"), "A|41");
    // 0x0A pads to two digits
    let s = String::from_utf8(vec![0x05, 0x05]).unwrap();
    assert!(encode(&s).ends_with("|0A"));
    assert_eq!(checksum("TARGET(26.5)"), 0xE3);
}
