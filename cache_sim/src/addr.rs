use std::fmt::Display;

use thiserror::Error;

#[derive(Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Addr(u32);

impl Addr {
    pub fn new(v: u32) -> Self {
        Self(v)
    }
    pub fn inner(self) -> u32 {
        self.0
    }
}

impl Display for Addr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:#010x})", self.0, self.0)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("division by zero: {what} must be positive")]
    DivideByZero { what: &'static str },
}

/// `(address / line_size) % num_lines`
pub fn line_index(address: Addr, num_lines: u32, line_size: u32) -> Result<u32, DecodeError> {
    if num_lines == 0 {
        return Err(DecodeError::DivideByZero { what: "line count" });
    }
    Ok(tag_of(address, line_size)? % num_lines)
}

/// `address / line_size`
pub fn tag_of(address: Addr, line_size: u32) -> Result<u32, DecodeError> {
    if line_size == 0 {
        return Err(DecodeError::DivideByZero { what: "line size" });
    }
    Ok(address.inner() / line_size)
}

/// Line size and line count of a cache whose divisors are known to be nonzero.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Geometry {
    line_size: u32,
    num_lines: u32,
}

impl Geometry {
    pub fn new(line_size: u32, num_lines: u32) -> Result<Self, DecodeError> {
        if line_size == 0 {
            return Err(DecodeError::DivideByZero { what: "line size" });
        }
        if num_lines == 0 {
            return Err(DecodeError::DivideByZero { what: "line count" });
        }
        Ok(Self {
            line_size,
            num_lines,
        })
    }
    pub fn line_size(&self) -> u32 {
        self.line_size
    }
    pub fn num_lines(&self) -> u32 {
        self.num_lines
    }
    pub fn index_of(&self, address: Addr) -> usize {
        (self.tag_of(address) % self.num_lines) as usize
    }
    pub fn tag_of(&self, address: Addr) -> u32 {
        address.inner() / self.line_size
    }
    /// Both addresses compete for the same line.
    pub fn collide(&self, a: Addr, b: Addr) -> bool {
        self.index_of(a) == self.index_of(b)
    }
    /// Both addresses live in the same cached block.
    pub fn same_block(&self, a: Addr, b: Addr) -> bool {
        self.collide(a, b) && self.tag_of(a) == self.tag_of(b)
    }
}
