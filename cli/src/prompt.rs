use std::io::{BufRead, Write};

use anyhow::{anyhow, Result};
use cache_sim::config::{CacheConfig, WritePolicy, DEFAULT_MEMORY_PENALTY};

/// Fields of a configuration that were given on the command line or in a file.
#[derive(Default, Debug, Clone, Copy)]
pub struct PartialConfig {
    pub cache_size: Option<u32>,
    pub line_size: Option<u32>,
    pub access_cycles: Option<u32>,
    pub hit_policy: Option<WritePolicy>,
    pub miss_policy: Option<WritePolicy>,
    pub memory_penalty: Option<u32>,
}

impl PartialConfig {
    pub fn from_config(c: CacheConfig) -> Self {
        Self {
            cache_size: Some(c.cache_size),
            line_size: Some(c.line_size),
            access_cycles: Some(c.access_cycles),
            hit_policy: Some(c.hit_policy),
            miss_policy: Some(c.miss_policy),
            memory_penalty: Some(c.memory_penalty),
        }
    }
    /// Fields set in `other` win.
    pub fn overridden_by(self, other: Self) -> Self {
        Self {
            cache_size: other.cache_size.or(self.cache_size),
            line_size: other.line_size.or(self.line_size),
            access_cycles: other.access_cycles.or(self.access_cycles),
            hit_policy: other.hit_policy.or(self.hit_policy),
            miss_policy: other.miss_policy.or(self.miss_policy),
            memory_penalty: other.memory_penalty.or(self.memory_penalty),
        }
    }
    /// `None` while any field other than the memory penalty is missing.
    pub fn into_config(self) -> Option<CacheConfig> {
        Some(
            CacheConfig::new(
                self.cache_size?,
                self.line_size?,
                self.access_cycles?,
                self.hit_policy?,
                self.miss_policy?,
            )
            .with_memory_penalty(self.memory_penalty.unwrap_or(DEFAULT_MEMORY_PENALTY)),
        )
    }
    /// Asks for every missing field on `prompt`.
    pub fn complete<R: BufRead, W: Write>(self, prompt: &mut Prompt<R, W>) -> Result<CacheConfig> {
        let cache_size = match self.cache_size {
            Some(v) => v,
            None => prompt.ask_u32("Enter cache size (bytes): ")?,
        };
        let line_size = match self.line_size {
            Some(v) => v,
            None => prompt.ask_u32("Enter line size (bytes): ")?,
        };
        let access_cycles = match self.access_cycles {
            Some(v) => v,
            None => prompt.ask_u32("Enter cache access cycles: ")?,
        };
        let hit_policy = match self.hit_policy {
            Some(v) => v,
            None => prompt.ask_policy("Enter hit write policy (WT/WB): ")?,
        };
        let miss_policy = match self.miss_policy {
            Some(v) => v,
            None => prompt.ask_policy("Enter miss write policy (WT/WB): ")?,
        };
        Ok(
            CacheConfig::new(cache_size, line_size, access_cycles, hit_policy, miss_policy)
                .with_memory_penalty(self.memory_penalty.unwrap_or(DEFAULT_MEMORY_PENALTY)),
        )
    }
}

pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{question}")?;
        self.output.flush()?;
        let mut buf = String::new();
        if self.input.read_line(&mut buf)? == 0 {
            return Err(anyhow!("input closed while waiting for: {}", question.trim()));
        }
        Ok(buf.trim().to_owned())
    }

    pub fn ask_u32(&mut self, question: &str) -> Result<u32> {
        loop {
            let answer = self.ask(question)?;
            match answer.parse() {
                Ok(v) => break Ok(v),
                Err(e) => writeln!(self.output, "{answer:?} is not a number: {e}")?,
            }
        }
    }

    pub fn ask_policy(&mut self, question: &str) -> Result<WritePolicy> {
        Ok(WritePolicy::from_token(&self.ask(question)?))
    }
}
