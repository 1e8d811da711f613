use std::fmt;

use log::warn;
use nom::combinator::map;
use nom::IResult;

use crate::errors::HprofGraphError;
use crate::errors::HprofGraphError::*;
use crate::parser::cursor::DumpCursor;
use crate::parser::file_header_parser::HprofVersion;
use crate::parser::primitive_parsers::*;
use crate::utils::to_hex;

/// Value types, discriminants are the basic type codes used from format 1.0.1 onwards.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FieldType {
    Object = 2,
    Bool = 4,
    Char = 5,
    Float = 6,
    Double = 7,
    Byte = 8,
    Short = 9,
    Int = 10,
    Long = 11,
}

impl FieldType {
    pub fn from_type_code(code: u8) -> Option<FieldType> {
        match code {
            2 => Some(FieldType::Object),
            4 => Some(FieldType::Bool),
            5 => Some(FieldType::Char),
            6 => Some(FieldType::Float),
            7 => Some(FieldType::Double),
            8 => Some(FieldType::Byte),
            9 => Some(FieldType::Short),
            10 => Some(FieldType::Int),
            11 => Some(FieldType::Long),
            _ => None,
        }
    }

    /// Only the eight primitive codes, used to classify array element types.
    pub fn primitive_from_type_code(code: u64) -> Option<FieldType> {
        u8::try_from(code)
            .ok()
            .and_then(FieldType::from_type_code)
            .filter(|t| *t != FieldType::Object)
    }

    pub fn from_signature(signature: u8) -> Option<FieldType> {
        match signature {
            b'[' | b'L' => Some(FieldType::Object),
            b'Z' => Some(FieldType::Bool),
            b'C' => Some(FieldType::Char),
            b'F' => Some(FieldType::Float),
            b'D' => Some(FieldType::Double),
            b'B' => Some(FieldType::Byte),
            b'S' => Some(FieldType::Short),
            b'I' => Some(FieldType::Int),
            b'J' => Some(FieldType::Long),
            _ => None,
        }
    }

    pub fn signature(&self) -> char {
        match self {
            FieldType::Object => 'L',
            FieldType::Bool => 'Z',
            FieldType::Char => 'C',
            FieldType::Float => 'F',
            FieldType::Double => 'D',
            FieldType::Byte => 'B',
            FieldType::Short => 'S',
            FieldType::Int => 'I',
            FieldType::Long => 'J',
        }
    }

    pub fn type_code(&self) -> u8 {
        *self as u8
    }

    pub fn byte_size(&self, id_size: u32) -> usize {
        match self {
            FieldType::Object => id_size as usize,
            FieldType::Byte | FieldType::Bool => 1,
            FieldType::Char | FieldType::Short => 2,
            FieldType::Float | FieldType::Int => 4,
            FieldType::Double | FieldType::Long => 8,
        }
    }

    pub fn java_name(&self) -> &'static str {
        match self {
            FieldType::Object => "object",
            FieldType::Bool => "boolean",
            FieldType::Char => "char",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Byte => "byte",
            FieldType::Short => "short",
            FieldType::Int => "int",
            FieldType::Long => "long",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Object(u64),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Bool(_) => FieldType::Bool,
            FieldValue::Byte(_) => FieldType::Byte,
            FieldValue::Char(_) => FieldType::Char,
            FieldValue::Short(_) => FieldType::Short,
            FieldValue::Int(_) => FieldType::Int,
            FieldValue::Long(_) => FieldType::Long,
            FieldValue::Float(_) => FieldType::Float,
            FieldValue::Double(_) => FieldType::Double,
            FieldValue::Object(_) => FieldType::Object,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(v) => write!(f, "{}", v),
            FieldValue::Byte(v) => write!(f, "{}", v),
            FieldValue::Char(v) => match char::from_u32(u32::from(*v)) {
                Some(c) => write!(f, "'{}'", c),
                None => write!(f, "\\u{:04x}", v),
            },
            FieldValue::Short(v) => write!(f, "{}", v),
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Long(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Double(v) => write!(f, "{}", v),
            FieldValue::Object(0) => write!(f, "null"),
            FieldValue::Object(id) => write!(f, "{}", to_hex(*id)),
        }
    }
}

fn parse_bool(input: &[u8]) -> IResult<&[u8], FieldValue> {
    map(parse_u8, |b| {
        if b > 1 {
            warn!("Illegal boolean value {} read", b);
        }
        FieldValue::Bool(b != 0)
    })(input)
}

pub fn parse_field_value(
    field_type: FieldType,
    id_size: u32,
) -> impl Fn(&[u8]) -> IResult<&[u8], FieldValue> {
    move |input| match field_type {
        FieldType::Object => map(parse_id(id_size), FieldValue::Object)(input),
        FieldType::Bool => parse_bool(input),
        FieldType::Char => map(parse_u16, FieldValue::Char)(input),
        FieldType::Float => map(parse_f32, FieldValue::Float)(input),
        FieldType::Double => map(parse_f64, FieldValue::Double)(input),
        FieldType::Byte => map(parse_i8, FieldValue::Byte)(input),
        FieldType::Short => map(parse_i16, FieldValue::Short)(input),
        FieldType::Int => map(parse_i32, FieldValue::Int)(input),
        FieldType::Long => map(parse_i64, FieldValue::Long)(input),
    }
}

/// Decodes single values for one dump: the identifier width and the way type tags are
/// written are fixed by the file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueCodec {
    id_size: u32,
    type_codes: bool,
}

impl ValueCodec {
    pub fn new(id_size: u32, version: HprofVersion) -> Self {
        Self {
            id_size,
            type_codes: version.uses_type_codes(),
        }
    }

    pub fn id_size(&self) -> u32 {
        self.id_size
    }

    pub fn uses_type_codes(&self) -> bool {
        self.type_codes
    }

    /// Interprets a type tag as a basic type code or a signature character.
    pub fn field_type(&self, tag: u8) -> Result<FieldType, HprofGraphError> {
        let field_type = if self.type_codes {
            FieldType::from_type_code(tag)
        } else {
            FieldType::from_signature(tag)
        };
        field_type.ok_or(InvalidTypeTag { tag })
    }

    /// Returns the value and the number of bytes it occupied.
    pub fn read_value(
        &self,
        cursor: &mut DumpCursor<'_>,
        field_type: FieldType,
    ) -> Result<(FieldValue, usize), HprofGraphError> {
        let value = cursor.parse(parse_field_value(field_type, self.id_size))?;
        Ok((value, field_type.byte_size(self.id_size)))
    }

    /// Reads a type tag followed by a value of that type, the width includes the tag byte.
    pub fn read_tagged_value(
        &self,
        cursor: &mut DumpCursor<'_>,
    ) -> Result<(FieldType, FieldValue, usize), HprofGraphError> {
        let tag = cursor.read_u8()?;
        let field_type = self.field_type(tag)?;
        let (value, width) = self.read_value(cursor, field_type)?;
        Ok((field_type, value, 1 + width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_codes_and_signatures_agree() {
        for code in [2u8, 4, 5, 6, 7, 8, 9, 10, 11] {
            let from_code = FieldType::from_type_code(code).unwrap();
            let from_signature = FieldType::from_signature(from_code.signature() as u8).unwrap();
            assert_eq!(from_code, from_signature);
            assert_eq!(from_code.type_code(), code);
        }
        assert_eq!(FieldType::from_type_code(1), None);
        assert_eq!(FieldType::from_type_code(3), None);
        assert_eq!(FieldType::from_signature(b'['), Some(FieldType::Object));
        assert_eq!(FieldType::from_signature(b'X'), None);
    }

    #[test]
    fn primitive_codes_exclude_object() {
        assert_eq!(FieldType::primitive_from_type_code(2), None);
        assert_eq!(
            FieldType::primitive_from_type_code(10),
            Some(FieldType::Int)
        );
        assert_eq!(FieldType::primitive_from_type_code(0x1_0000_000a), None);
    }

    #[test]
    fn codec_follows_version() {
        let new_style = ValueCodec::new(8, HprofVersion::V1_0_2);
        let old_style = ValueCodec::new(8, HprofVersion::V1_0);
        assert_eq!(new_style.field_type(10).unwrap(), FieldType::Int);
        assert!(matches!(
            new_style.field_type(b'I'),
            Err(InvalidTypeTag { tag: b'I' })
        ));
        assert_eq!(old_style.field_type(b'I').unwrap(), FieldType::Int);
        assert!(matches!(
            old_style.field_type(10),
            Err(InvalidTypeTag { tag: 10 })
        ));
    }

    #[test]
    fn read_values_with_width() {
        let codec = ValueCodec::new(4, HprofVersion::V1_0_1);
        let mut bytes = vec![];
        bytes.extend_from_slice(&0x1234u32.to_be_bytes());
        bytes.extend_from_slice(&(-2i64).to_be_bytes());
        bytes.push(1);
        bytes.extend_from_slice(&0x41u16.to_be_bytes());
        bytes.extend_from_slice(&2.5f64.to_be_bytes());
        let mut cursor = DumpCursor::new(&bytes);

        assert_eq!(
            codec.read_value(&mut cursor, FieldType::Object).unwrap(),
            (FieldValue::Object(0x1234), 4)
        );
        assert_eq!(
            codec.read_value(&mut cursor, FieldType::Long).unwrap(),
            (FieldValue::Long(-2), 8)
        );
        assert_eq!(
            codec.read_value(&mut cursor, FieldType::Bool).unwrap(),
            (FieldValue::Bool(true), 1)
        );
        assert_eq!(
            codec.read_value(&mut cursor, FieldType::Char).unwrap(),
            (FieldValue::Char(0x41), 2)
        );
        assert_eq!(
            codec.read_value(&mut cursor, FieldType::Double).unwrap(),
            (FieldValue::Double(2.5), 8)
        );
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn illegal_boolean_still_decodes() {
        let codec = ValueCodec::new(8, HprofVersion::V1_0_2);
        let bytes = [7u8];
        let mut cursor = DumpCursor::new(&bytes);
        assert_eq!(
            codec.read_value(&mut cursor, FieldType::Bool).unwrap(),
            (FieldValue::Bool(true), 1)
        );
    }

    #[test]
    fn tagged_value_counts_tag_byte() {
        let codec = ValueCodec::new(8, HprofVersion::V1_0);
        let bytes = [b'S', 0xff, 0xfe];
        let mut cursor = DumpCursor::new(&bytes);
        let (field_type, value, width) = codec.read_tagged_value(&mut cursor).unwrap();
        assert_eq!(field_type, FieldType::Short);
        assert_eq!(value, FieldValue::Short(-2));
        assert_eq!(width, 3);
    }

    #[test]
    fn display_values() {
        assert_eq!(FieldValue::Object(0).to_string(), "null");
        assert_eq!(FieldValue::Object(0xab).to_string(), "0xab");
        assert_eq!(FieldValue::Char(0x41).to_string(), "'A'");
        assert_eq!(FieldValue::Int(-5).to_string(), "-5");
    }
}
