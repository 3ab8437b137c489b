//! Command surface: a declarative verb table and the payload parser.
//!
//! Verbs match case-insensitively; argument text keeps its original case.

use crate::error::Nack;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ping,
    Echo(String),
    Target(f32),
    Pid { kp: f32, ki: f32, kd: f32 },
    Zero(i32),
    Test,
    Start,
    /// `STOP` or its legacy alias `B`.
    Stop,
    /// Accepted for compatibility, no effect.
    Legacy(&'static str),
}

impl Command {
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Ping => "PING",
            Self::Echo(_) => "ECHO",
            Self::Target(_) => "TARGET",
            Self::Pid { .. } => "PID",
            Self::Zero(_) => "ZERO",
            Self::Test => "TEST",
            Self::Start => "START",
            Self::Stop => "STOP",
            Self::Legacy(v) => v,
        }
    }
}

/// How the text after the verb is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// The verb is the whole payload.
    Bare,
    /// `VERB(arg)`; the closing parenthesis is optional and the argument may
    /// be empty.
    Paren,
    /// `VERB(arg)` with a non-empty argument and nothing after the `)`.
    StrictParen,
}

pub struct CommandSpec {
    pub verb: &'static str,
    pub arity: Arity,
    pub build: fn(&str) -> Result<Command, Nack>,
}

impl core::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("verb", &self.verb)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec { verb: "PING", arity: Arity::Bare, build: build_ping },
    CommandSpec { verb: "ECHO", arity: Arity::Paren, build: build_echo },
    CommandSpec { verb: "TARGET", arity: Arity::Paren, build: build_target },
    CommandSpec { verb: "PID", arity: Arity::Paren, build: build_pid },
    CommandSpec { verb: "ZERO", arity: Arity::Paren, build: build_zero },
    CommandSpec { verb: "TEST", arity: Arity::Bare, build: build_test },
    CommandSpec { verb: "START", arity: Arity::Bare, build: build_start },
    CommandSpec { verb: "STOP", arity: Arity::Bare, build: build_stop },
    CommandSpec { verb: "B", arity: Arity::Bare, build: build_stop },
    CommandSpec { verb: "S", arity: Arity::Bare, build: |_| Ok(Command::Legacy("S")) },
    CommandSpec { verb: "I", arity: Arity::Bare, build: |_| Ok(Command::Legacy("I")) },
    CommandSpec { verb: "M", arity: Arity::StrictParen, build: |_| Ok(Command::Legacy("M")) },
    CommandSpec { verb: "R", arity: Arity::StrictParen, build: |_| Ok(Command::Legacy("R")) },
    CommandSpec { verb: "V", arity: Arity::StrictParen, build: |_| Ok(Command::Legacy("V")) },
];

/// Parse a validated payload into a command.
pub fn parse(payload: &str) -> Result<Command, Nack> {
    // ASCII upper-casing keeps byte offsets aligned with `payload`.
    let upper = payload.to_ascii_uppercase();
    let open = upper.find('(');
    let verb = open.map_or(upper.as_str(), |i| &upper[..i]);
    let entry = COMMANDS
        .iter()
        .find(|c| c.verb == verb)
        .ok_or(Nack::UnknownCmd)?;

    let arg = match (entry.arity, open) {
        (Arity::Bare, None) => "",
        (Arity::Bare, Some(_)) | (_, None) => return Err(Nack::UnknownCmd),
        (Arity::Paren, Some(i)) => loose_arg(payload, i),
        (Arity::StrictParen, Some(i)) => strict_arg(payload, i).ok_or(Nack::UnknownCmd)?,
    };
    (entry.build)(arg)
}

/// Text between the first `(` and a trailing `)`, if present.
fn loose_arg(payload: &str, open: usize) -> &str {
    let rest = &payload[open + 1..];
    rest.strip_suffix(')').unwrap_or(rest)
}

fn strict_arg(payload: &str, open: usize) -> Option<&str> {
    let rest = &payload[open + 1..];
    let close = rest.find(')')?;
    let arg = &rest[..close];
    (!arg.is_empty() && close + 1 == rest.len()).then_some(arg)
}

fn build_ping(_: &str) -> Result<Command, Nack> {
    Ok(Command::Ping)
}

fn build_echo(arg: &str) -> Result<Command, Nack> {
    Ok(Command::Echo(arg.to_string()))
}

fn build_target(arg: &str) -> Result<Command, Nack> {
    Ok(Command::Target(parse_leading_f32(arg)))
}

fn build_pid(arg: &str) -> Result<Command, Nack> {
    let (kp, rest) = arg.split_once(',').ok_or(Nack::BadPidArgs)?;
    let (ki, kd) = rest.split_once(',').ok_or(Nack::BadPidArgs)?;
    Ok(Command::Pid {
        kp: parse_leading_f32(kp),
        ki: parse_leading_f32(ki),
        kd: parse_leading_f32(kd),
    })
}

fn build_zero(arg: &str) -> Result<Command, Nack> {
    Ok(Command::Zero(parse_leading_i32(arg)))
}

fn build_test(_: &str) -> Result<Command, Nack> {
    Ok(Command::Test)
}

fn build_start(_: &str) -> Result<Command, Nack> {
    Ok(Command::Start)
}

fn build_stop(_: &str) -> Result<Command, Nack> {
    Ok(Command::Stop)
}

/// Longest numeric prefix after leading whitespace, or 0.0 when there is none.
///
/// Accepts an optional sign, digits with at most one decimal point, and an
/// exponent only when it is followed by at least one digit.
pub fn parse_leading_f32(s: &str) -> f32 {
    let s = s.trim_start();
    let b = s.as_bytes();
    let mut i = 0;
    if matches!(b.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let int_start = i;
    while b.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    let mut digits = i - int_start;
    if b.get(i) == Some(&b'.') {
        let frac_start = i + 1;
        let mut j = frac_start;
        while b.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        digits += j - frac_start;
        i = j;
    }
    if digits == 0 {
        return 0.0;
    }
    if matches!(b.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(b.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_start = j;
        while b.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    s[..i].parse().unwrap_or(0.0)
}

/// Leading integer after whitespace, truncated at the first non-digit and
/// saturated to the `i32` range. No digits yields 0.
pub fn parse_leading_i32(s: &str) -> i32 {
    let s = s.trim_start();
    let (neg, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let mut acc: i64 = 0;
    for d in digits.bytes().take_while(u8::is_ascii_digit) {
        acc = (acc * 10 + i64::from(d - b'0')).min(i64::from(i32::MAX) + 1);
    }
    let v = if neg { -acc } else { acc };
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_table_verb_is_upper_case_and_unique() {
        for (i, c) in COMMANDS.iter().enumerate() {
            assert_eq!(c.verb, c.verb.to_ascii_uppercase());
            assert!(COMMANDS[..i].iter().all(|o| o.verb != c.verb), "{}", c.verb);
        }
    }

    #[test]
    fn lenient_float_prefix() {
        assert_eq!(parse_leading_f32("26.5"), 26.5);
        assert_eq!(parse_leading_f32("  -3.25cm"), -3.25);
        assert_eq!(parse_leading_f32(".5"), 0.5);
        assert_eq!(parse_leading_f32("7."), 7.0);
        assert_eq!(parse_leading_f32("1e2"), 100.0);
        assert_eq!(parse_leading_f32("2e"), 2.0);
        assert_eq!(parse_leading_f32("abc"), 0.0);
        assert_eq!(parse_leading_f32(""), 0.0);
        assert_eq!(parse_leading_f32("-"), 0.0);
    }

    #[test]
    fn lenient_int_prefix() {
        assert_eq!(parse_leading_i32("95"), 95);
        assert_eq!(parse_leading_i32("95.7"), 95);
        assert_eq!(parse_leading_i32(" -12x"), -12);
        assert_eq!(parse_leading_i32("x12"), 0);
        assert_eq!(parse_leading_i32("99999999999"), i32::MAX);
        assert_eq!(parse_leading_i32("-99999999999"), i32::MIN);
    }
}
