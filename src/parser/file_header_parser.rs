use nom::bytes::streaming::{tag, take_until};
use nom::combinator::map;
use nom::sequence::{terminated, tuple};
use nom::IResult;

use crate::parser::primitive_parsers::{parse_u32, parse_u64};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub format: String,
    pub size_pointers: u32,
    pub timestamp: u64,
}

/// Format versions, in the order they appeared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HprofVersion {
    /// `JAVA PROFILE 1.0`: value types are signature characters.
    V1_0,
    /// `JAVA PROFILE 1.0.1`: value types are basic type codes.
    V1_0_1,
    /// `JAVA PROFILE 1.0.2`: adds heap dump segments and the heap dump end marker.
    V1_0_2,
}

impl HprofVersion {
    pub fn from_format(format: &str) -> Option<HprofVersion> {
        match format {
            "JAVA PROFILE 1.0" => Some(HprofVersion::V1_0),
            "JAVA PROFILE 1.0.1" => Some(HprofVersion::V1_0_1),
            "JAVA PROFILE 1.0.2" => Some(HprofVersion::V1_0_2),
            _ => None,
        }
    }

    pub fn format(&self) -> &'static str {
        match self {
            HprofVersion::V1_0 => "JAVA PROFILE 1.0",
            HprofVersion::V1_0_1 => "JAVA PROFILE 1.0.1",
            HprofVersion::V1_0_2 => "JAVA PROFILE 1.0.2",
        }
    }

    pub fn uses_type_codes(&self) -> bool {
        *self >= HprofVersion::V1_0_1
    }

    pub fn supports_segments(&self) -> bool {
        *self >= HprofVersion::V1_0_2
    }
}

fn parse_c_string(input: &[u8]) -> IResult<&[u8], &[u8]> {
    terminated(take_until("\0"), tag("\0"))(input)
}

pub fn parse_file_header(input: &[u8]) -> IResult<&[u8], FileHeader> {
    map(
        tuple((parse_c_string, parse_u32, parse_u64)),
        |(format, size_pointers, timestamp)| FileHeader {
            format: String::from_utf8_lossy(format).to_string(),
            size_pointers,
            timestamp,
        },
    )(input)
}
