// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSH wire encoding (RFC 4251 §5): length-prefixed strings and mpints

use super::KeyError;

/// Appends SSH wire-format fields to a buffer
#[derive(Debug, Default)]
pub struct SshWriter {
    buf: Vec<u8>,
}

impl SshWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_string(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Encode an unsigned big-endian integer as an mpint: leading zeros
    /// stripped, and a zero byte prepended when the high bit is set.
    pub fn put_mpint(&mut self, magnitude: &[u8]) -> &mut Self {
        let first_nonzero = magnitude.iter().position(|b| *b != 0).unwrap_or(magnitude.len());
        let digits = &magnitude[first_nonzero..];
        match digits.first() {
            Some(b) if b & 0x80 != 0 => {
                self.buf.extend_from_slice(&(digits.len() as u32 + 1).to_be_bytes());
                self.buf.push(0);
                self.buf.extend_from_slice(digits);
            }
            _ => {
                self.put_string(digits);
            }
        }
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Reads SSH wire-format fields from a byte slice
pub struct SshReader<'a> {
    rest: &'a [u8],
}

impl<'a> SshReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { rest: bytes }
    }

    /// Consume a fixed prefix such as a format magic
    pub fn expect_prefix(&mut self, prefix: &[u8]) -> Result<(), KeyError> {
        match self.rest.strip_prefix(prefix) {
            Some(rest) => {
                self.rest = rest;
                Ok(())
            }
            None => Err(KeyError::Invalid("unexpected key format magic".to_string())),
        }
    }

    pub fn read_u32(&mut self) -> Result<u32, KeyError> {
        let (head, rest) = self.split(4)?;
        self.rest = rest;
        Ok(u32::from_be_bytes([head[0], head[1], head[2], head[3]]))
    }

    pub fn read_string(&mut self) -> Result<&'a [u8], KeyError> {
        let len = self.read_u32()? as usize;
        let (head, rest) = self.split(len)?;
        self.rest = rest;
        Ok(head)
    }

    fn split(&self, n: usize) -> Result<(&'a [u8], &'a [u8]), KeyError> {
        if self.rest.len() < n {
            return Err(KeyError::Invalid("truncated key data".to_string()));
        }
        Ok(self.rest.split_at(n))
    }
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
