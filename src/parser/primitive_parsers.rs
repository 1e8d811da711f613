use nom::combinator::map;
use nom::number::streaming::{
    be_f32, be_f64, be_i16, be_i32, be_i64, be_i8, be_u16, be_u32, be_u64, be_u8,
};
use nom::IResult;

pub fn parse_u8(input: &[u8]) -> IResult<&[u8], u8> {
    be_u8(input)
}

pub fn parse_i8(input: &[u8]) -> IResult<&[u8], i8> {
    be_i8(input)
}

pub fn parse_u16(input: &[u8]) -> IResult<&[u8], u16> {
    be_u16(input)
}

pub fn parse_i16(input: &[u8]) -> IResult<&[u8], i16> {
    be_i16(input)
}

pub fn parse_u32(input: &[u8]) -> IResult<&[u8], u32> {
    be_u32(input)
}

pub fn parse_i32(input: &[u8]) -> IResult<&[u8], i32> {
    be_i32(input)
}

pub fn parse_u64(input: &[u8]) -> IResult<&[u8], u64> {
    be_u64(input)
}

pub fn parse_i64(input: &[u8]) -> IResult<&[u8], i64> {
    be_i64(input)
}

pub fn parse_f32(input: &[u8]) -> IResult<&[u8], f32> {
    be_f32(input)
}

pub fn parse_f64(input: &[u8]) -> IResult<&[u8], f64> {
    be_f64(input)
}

/// Identifiers are 4 or 8 bytes wide depending on the dump, 4 byte ones are widened unsigned.
pub fn parse_id(id_size: u32) -> impl Fn(&[u8]) -> IResult<&[u8], u64> {
    move |input| {
        if id_size == 4 {
            map(be_u32, u64::from)(input)
        } else {
            be_u64(input)
        }
    }
}
