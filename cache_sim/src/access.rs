use std::fmt;

use nom::{
    character::complete::{char, space0, u32},
    combinator::{all_consuming, opt, rest},
    sequence::preceded,
    IResult,
};
use thiserror::Error;

use crate::addr::Addr;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AccessKind {
    Read,
    Write,
}

impl AccessKind {
    /// `"W"` is a write; anything else reads.
    pub fn from_token(token: &str) -> Self {
        if token.trim() == "W" {
            AccessKind::Write
        } else {
            AccessKind::Read
        }
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessKind::Read => write!(f, "read"),
            AccessKind::Write => write!(f, "write"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AccessRecord {
    pub address: Addr,
    pub kind: AccessKind,
}

impl AccessRecord {
    pub fn read(address: u32) -> Self {
        Self {
            address: Addr::new(address),
            kind: AccessKind::Read,
        }
    }
    pub fn write(address: u32) -> Self {
        Self {
            address: Addr::new(address),
            kind: AccessKind::Write,
        }
    }
}

impl fmt::Display for AccessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} access at address {}", self.kind, self.address)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    /// `position` is 1-based
    #[error("entry #{position}: invalid address in {text:?}")]
    InvalidAddress { position: usize, text: String },
    #[error("entry #{position} is empty")]
    EmptyEntry { position: usize },
}

fn entry(input: &str) -> IResult<&str, (u32, Option<&str>)> {
    let (input, _) = space0(input)?;
    let (input, address) = u32(input)?;
    let (input, _) = space0(input)?;
    let (input, kind) = opt(preceded(char(':'), rest))(input)?;
    Ok((input, (address, kind)))
}

/// Ordered accesses to replay, in the order they were listed.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct AccessSequence {
    seq: Vec<AccessRecord>,
}

impl AccessSequence {
    /// Parses one line of `<address>:<R|W>` entries separated by commas.
    pub fn parse_line(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Self::default());
        }
        let line = line.strip_suffix(',').unwrap_or(line);
        let seq = line
            .split(',')
            .enumerate()
            .map(|(i, e)| Self::parse_entry(i + 1, e))
            .collect::<Result<_, _>>()?;
        Ok(Self { seq })
    }

    fn parse_entry(position: usize, text: &str) -> Result<AccessRecord, ParseError> {
        if text.trim().is_empty() {
            return Err(ParseError::EmptyEntry { position });
        }
        let (_, (address, kind)) =
            all_consuming(entry)(text).map_err(|_| ParseError::InvalidAddress {
                position,
                text: text.to_owned(),
            })?;
        Ok(AccessRecord {
            address: Addr::new(address),
            kind: kind.map(AccessKind::from_token).unwrap_or(AccessKind::Read),
        })
    }

    /// Replays the first line only.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut lines = text.lines();
        let first = lines.next().unwrap_or_default();
        let ignored = lines.filter(|l| !l.trim().is_empty()).count();
        if ignored > 0 {
            log::warn!("ignoring {ignored} line(s) after the first line of the access sequence");
        }
        Self::parse_line(first)
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }
    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
    pub fn get(&self, index: usize) -> Option<AccessRecord> {
        self.seq.get(index).copied()
    }
    pub fn iter(&self) -> std::slice::Iter<'_, AccessRecord> {
        self.seq.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        let s = AccessSequence::parse_line("0:R,64:W,0:R").unwrap();
        assert_eq!(
            s.iter().copied().collect::<Vec<_>>(),
            vec![
                AccessRecord::read(0),
                AccessRecord::write(64),
                AccessRecord::read(0)
            ]
        );
    }

    #[test]
    fn test_kind_tokens() {
        let s = AccessSequence::parse_line("1:w, 2 : W ,3,4:X,5:").unwrap();
        let kinds: Vec<_> = s.iter().map(|r| r.kind).collect();
        use AccessKind::*;
        assert_eq!(kinds, vec![Read, Write, Read, Read, Read]);
    }

    #[test]
    fn test_trailing_comma_and_newline() {
        let s = AccessSequence::parse("128:W,\n").unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(s.get(0), Some(AccessRecord::write(128)));
    }

    #[test]
    fn test_empty() {
        assert!(AccessSequence::parse("").unwrap().is_empty());
        assert!(AccessSequence::parse("\n0:R\n").unwrap().is_empty());
    }

    #[test]
    fn test_only_first_line() {
        let s = AccessSequence::parse("4:R\n8:W,12:W\n").unwrap();
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_malformed() {
        assert_eq!(
            AccessSequence::parse_line("0:R,abc:W"),
            Err(ParseError::InvalidAddress {
                position: 2,
                text: "abc:W".into()
            })
        );
        assert!(matches!(
            AccessSequence::parse_line("-4:R"),
            Err(ParseError::InvalidAddress { position: 1, .. })
        ));
        assert!(matches!(
            AccessSequence::parse_line("12x:R"),
            Err(ParseError::InvalidAddress { .. })
        ));
        assert!(matches!(
            AccessSequence::parse_line("4294967296:R"),
            Err(ParseError::InvalidAddress { .. })
        ));
        assert_eq!(
            AccessSequence::parse_line("0:R,,4:R"),
            Err(ParseError::EmptyEntry { position: 2 })
        );
    }
}
