use nom::IResult;

use crate::errors::HprofGraphError;
use crate::errors::HprofGraphError::*;
use crate::parser::primitive_parsers::{parse_i32, parse_id, parse_u16, parse_u32, parse_u8};

/// Sequential reader over the raw bytes of a dump.
///
/// Every read goes through a streaming nom parser so that running out of input is always
/// reported as `UnexpectedEof` carrying the offset where the read started.
#[derive(Debug, Clone)]
pub struct DumpCursor<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> DumpCursor<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    pub fn at(input: &'a [u8], pos: usize) -> Self {
        Self {
            input,
            pos: pos.min(input.len()),
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn parse<O, P>(&mut self, mut parser: P) -> Result<O, HprofGraphError>
    where
        P: FnMut(&'a [u8]) -> IResult<&'a [u8], O>,
    {
        let input: &'a [u8] = self.input;
        match parser(&input[self.pos..]) {
            Ok((rest, output)) => {
                self.pos = input.len() - rest.len();
                Ok(output)
            }
            Err(nom::Err::Incomplete(_)) => Err(UnexpectedEof { offset: self.pos }),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(InvalidHprofFile {
                message: format!("{:?} at byte {}", e.code, self.pos),
            }),
        }
    }

    /// Moves forward `n` bytes; running past the end leaves the cursor at the end.
    pub fn skip(&mut self, n: usize) -> Result<(), HprofGraphError> {
        if n > self.remaining() {
            let offset = self.pos;
            self.pos = self.input.len();
            return Err(UnexpectedEof { offset });
        }
        self.pos += n;
        Ok(())
    }

    pub fn seek(&mut self, pos: usize) -> Result<(), HprofGraphError> {
        if pos > self.input.len() {
            let offset = self.pos;
            self.pos = self.input.len();
            return Err(UnexpectedEof { offset });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], HprofGraphError> {
        if n > self.remaining() {
            return Err(UnexpectedEof { offset: self.pos });
        }
        let input: &'a [u8] = self.input;
        let bytes = &input[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8, HprofGraphError> {
        self.parse(parse_u8)
    }

    pub fn read_u16(&mut self) -> Result<u16, HprofGraphError> {
        self.parse(parse_u16)
    }

    pub fn read_u32(&mut self) -> Result<u32, HprofGraphError> {
        self.parse(parse_u32)
    }

    pub fn read_i32(&mut self) -> Result<i32, HprofGraphError> {
        self.parse(parse_i32)
    }

    pub fn read_id(&mut self, id_size: u32) -> Result<u64, HprofGraphError> {
        self.parse(parse_id(id_size))
    }
}
