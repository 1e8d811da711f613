use thiserror::Error;

#[derive(Error, Debug)]
pub enum HprofGraphError {
    #[error("input file `{name:?}` not found")]
    InputFileNotFound { name: String },
    #[error("invalid argument `top` - the value should be strictly positive")]
    InvalidTopPositiveInt,
    #[error("invalid argument `dumpNumber` - the value should be strictly positive")]
    InvalidDumpNumber,
    #[error("invalid hprof file ({message})")]
    InvalidHprofFile { message: String },
    #[error("version string `{format}` not recognized")]
    UnrecognizedVersion { format: String },
    #[error("identifier size of {size} bytes is not supported (only 4 or 8)")]
    InvalidIdSize { size: u32 },
    #[error("bad record length of {length} at byte {offset} of file")]
    NegativeRecordLength { length: i32, offset: usize },
    #[error("record length of {length} is too small for its content")]
    InvalidRecordLength { length: u32 },
    #[error("repeated heap dump object id {id:#x}")]
    DuplicateHeapObject { id: u64 },
    #[error("thread {serial} not found")]
    UnknownThreadSerial { serial: u32 },
    #[error("stack frame {id:#x} not found")]
    UnknownStackFrame { id: u64 },
    #[error("bad value type tag {tag}")]
    InvalidTypeTag { tag: u8 },
    #[error("unrecognized array type code {code}")]
    UnrecognizedArrayTypeCode { code: u64 },
    #[error("unexpected end of data at byte {offset}")]
    UnexpectedEof { offset: usize },
    #[error("heap object {id:#x} not found")]
    ObjectNotFound { id: u64 },
    #[error("class {id:#x} not found")]
    ClassNotFound { id: u64 },
    #[error("heap object {id:#x} is not an instance")]
    NotAnInstance { id: u64 },
    #[error("heap object {id:#x} is not of kind {expected}")]
    NotAnArray { id: u64, expected: &'static str },
    #[error("error while decoding {record} record at byte {offset} ({source})")]
    RecordDecoding {
        record: String,
        offset: usize,
        #[source]
        source: Box<HprofGraphError>,
    },
    #[error("CLI argument error ({e})")]
    ClapError { e: clap::Error },
    #[error("standard I/O error ({e})")]
    StdIoError { e: std::io::Error },
}

impl HprofGraphError {
    /// Attaches the record being decoded, keeping the innermost context if already attached.
    pub fn in_record(self, record: impl Into<String>, offset: usize) -> Self {
        match self {
            HprofGraphError::RecordDecoding { .. } => self,
            other => HprofGraphError::RecordDecoding {
                record: record.into(),
                offset,
                source: Box::new(other),
            },
        }
    }

    pub fn root_cause(&self) -> &HprofGraphError {
        match self {
            HprofGraphError::RecordDecoding { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub fn is_unexpected_eof(&self) -> bool {
        matches!(self.root_cause(), HprofGraphError::UnexpectedEof { .. })
    }
}

impl From<std::io::Error> for HprofGraphError {
    fn from(e: std::io::Error) -> Self {
        HprofGraphError::StdIoError { e }
    }
}

impl From<clap::Error> for HprofGraphError {
    fn from(e: clap::Error) -> Self {
        HprofGraphError::ClapError { e }
    }
}
