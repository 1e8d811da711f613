use log::{debug, info, trace, warn};

use crate::errors::HprofGraphError;
use crate::errors::HprofGraphError::*;
use crate::model::{StackFrame, LINE_NUMBER_NATIVE, LINE_NUMBER_UNKNOWN};
use crate::options::DecodeOptions;
use crate::parser::cursor::DumpCursor;
use crate::parser::field_codec::ValueCodec;
use crate::parser::file_header_parser::{parse_file_header, HprofVersion};
use crate::parser::id_resolver::IdResolver;
use crate::parser::record::RecordTag;
use crate::snapshot::Snapshot;

/// Result of a decode pass that did not hit a fatal error.
#[derive(Debug)]
pub enum DecodeOutcome {
    Complete(Snapshot),
    /// The input ended inside a heap dump, objects decoded so far are kept.
    Incomplete(Snapshot),
}

impl DecodeOutcome {
    pub fn snapshot(&self) -> &Snapshot {
        match self {
            DecodeOutcome::Complete(snapshot) | DecodeOutcome::Incomplete(snapshot) => snapshot,
        }
    }

    pub fn into_snapshot(self) -> Snapshot {
        match self {
            DecodeOutcome::Complete(snapshot) | DecodeOutcome::Incomplete(snapshot) => snapshot,
        }
    }

    pub fn is_incomplete(&self) -> bool {
        matches!(self, DecodeOutcome::Incomplete(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Flow {
    Continue,
    Done,
}

/// Single pass decoder turning the records of a dump into a `Snapshot`.
pub struct HprofDecoder<'a> {
    pub(super) cursor: DumpCursor<'a>,
    pub(super) codec: ValueCodec,
    pub(super) version: HprofVersion,
    pub(super) resolver: IdResolver,
    pub(super) snapshot: Snapshot,
    dumps_to_skip: u32,
}

pub fn decode(input: &[u8], options: &DecodeOptions) -> Result<DecodeOutcome, HprofGraphError> {
    HprofDecoder::new(input, options)?.run()
}

impl<'a> HprofDecoder<'a> {
    /// Parses the file header, records are left for `run`.
    pub fn new(input: &'a [u8], options: &DecodeOptions) -> Result<Self, HprofGraphError> {
        let mut cursor = DumpCursor::new(input);
        let header = cursor.parse(parse_file_header).map_err(|e| match e {
            UnexpectedEof { .. } => InvalidHprofFile {
                message: "truncated file header".to_string(),
            },
            other => other,
        })?;
        let version =
            HprofVersion::from_format(&header.format).ok_or_else(|| UnrecognizedVersion {
                format: header.format.clone(),
            })?;
        // Invariants
        let id_size = header.size_pointers;
        if id_size != 4 && id_size != 8 {
            return Err(InvalidIdSize { size: id_size });
        }
        info!(
            "Dump file in '{}' format with {} bytes identifiers created at {} ms",
            header.format, id_size, header.timestamp
        );
        Ok(HprofDecoder {
            cursor,
            codec: ValueCodec::new(id_size, version),
            version,
            resolver: IdResolver::new(options.track_stack_traces),
            snapshot: Snapshot::new(id_size, version, header.timestamp),
            dumps_to_skip: options.dumps_to_skip,
        })
    }

    pub fn run(mut self) -> Result<DecodeOutcome, HprofGraphError> {
        // running out of input exactly between records is the normal way to stop
        while !self.cursor.is_exhausted() {
            let record_start = self.cursor.position();
            let (tag, length) = self
                .read_record_header()
                .map_err(|e| e.in_record("record header", record_start))?;
            trace!(
                "Read record type {} length {} at position {}",
                tag,
                length,
                record_start
            );
            let flow = match RecordTag::try_from(tag) {
                Ok(record_tag) => self
                    .read_record(record_tag, length)
                    .map_err(|e| e.in_record(format!("{:?}", record_tag), record_start))?,
                Err(_) => {
                    warn!("Ignoring unrecognized record type {}", tag);
                    self.snapshot.counters.unknown_records += 1;
                    self.skip_record(length)
                }
            };
            if flow == Flow::Done {
                break;
            }
        }
        if self.dumps_to_skip > 0 {
            warn!(
                "Reached the end of the file with {} heap dumps left to skip",
                self.dumps_to_skip
            );
        }
        Ok(self.finish())
    }

    fn read_record_header(&mut self) -> Result<(u8, u32), HprofGraphError> {
        let tag = self.cursor.read_u8()?;
        let _timestamp = self.cursor.read_u32()?;
        let length_offset = self.cursor.position();
        let length = self.cursor.read_i32()?;
        if length < 0 {
            return Err(NegativeRecordLength {
                length,
                offset: length_offset,
            });
        }
        Ok((tag, length as u32))
    }

    fn read_record(&mut self, tag: RecordTag, length: u32) -> Result<Flow, HprofGraphError> {
        let tracks_stacks = self.resolver.tracks_stack_traces();
        match tag {
            RecordTag::Utf8String => self.read_sized(tag, length, Self::read_utf8_string),
            RecordTag::LoadClass => self.read_sized(tag, length, Self::read_load_class),
            RecordTag::StackFrame if tracks_stacks => {
                self.read_sized(tag, length, Self::read_stack_frame)
            }
            RecordTag::StackTrace if tracks_stacks => {
                self.read_sized(tag, length, Self::read_stack_trace)
            }
            RecordTag::HeapDump => self.read_heap_dump_record(length),
            RecordTag::HeapDumpSegment => self.read_heap_dump_segment_record(length),
            RecordTag::HeapDumpEnd => self.read_heap_dump_end_record(length),
            _ => {
                if !tag.is_informational() {
                    debug!("Skipping {:?} record, stack traces are not tracked", tag);
                }
                self.snapshot.counters.skipped_records += 1;
                Ok(self.skip_record(length))
            }
        }
    }

    /// Skips a record body, a body cut short by the end of the file ends the pass.
    fn skip_record(&mut self, length: u32) -> Flow {
        match self.cursor.skip(length as usize) {
            Ok(()) => Flow::Continue,
            Err(e) => {
                warn!("Record body truncated ({}), stopping", e);
                Flow::Done
            }
        }
    }

    /// Runs a body decoder and realigns the cursor on the declared record length.
    fn read_sized<F>(
        &mut self,
        tag: RecordTag,
        length: u32,
        body_decoder: F,
    ) -> Result<Flow, HprofGraphError>
    where
        F: FnOnce(&mut Self, u32) -> Result<(), HprofGraphError>,
    {
        let body_start = self.cursor.position();
        body_decoder(self, length)?;
        let consumed = self.cursor.position() - body_start;
        if consumed != length as usize {
            warn!(
                "{:?} record decoded {} bytes instead of the declared {}",
                tag, consumed, length
            );
            self.cursor.seek(body_start + length as usize)?;
        }
        Ok(Flow::Continue)
    }

    pub(super) fn read_id(&mut self) -> Result<u64, HprofGraphError> {
        self.cursor.read_id(self.codec.id_size())
    }

    fn read_utf8_string(&mut self, length: u32) -> Result<(), HprofGraphError> {
        let id_size = self.codec.id_size();
        if length < id_size {
            return Err(InvalidRecordLength { length });
        }
        let id = self.read_id()?;
        let bytes = self.cursor.read_bytes((length - id_size) as usize)?;
        self.resolver.define_string(id, bytes);
        self.snapshot.counters.utf8_strings += 1;
        Ok(())
    }

    fn read_load_class(&mut self, _length: u32) -> Result<(), HprofGraphError> {
        let serial_number = self.cursor.read_u32()?;
        let class_object_id = self.read_id()?;
        let _stack_trace_serial_number = self.cursor.read_u32()?;
        let class_name_id = self.read_id()?;
        let name = self.resolver.lookup_string(class_name_id).replace('/', ".");
        debug!("Class {} loaded with serial #{}", name, serial_number);
        self.resolver
            .define_class_name(serial_number, class_object_id, name);
        self.snapshot.counters.classes_loaded += 1;
        Ok(())
    }

    fn read_stack_frame(&mut self, _length: u32) -> Result<(), HprofGraphError> {
        let stack_frame_id = self.read_id()?;
        let method_name = self.read_id()?;
        let method_signature = self.read_id()?;
        let source_file = self.read_id()?;
        let class_serial_number = self.cursor.read_u32()?;
        let mut line_number = self.cursor.read_i32()?;
        if line_number < LINE_NUMBER_NATIVE {
            warn!("Weird stack frame line number: {}", line_number);
            line_number = LINE_NUMBER_UNKNOWN;
        }
        let frame = StackFrame {
            method_name: self.resolver.lookup_string(method_name),
            method_signature: self.resolver.lookup_string(method_signature),
            class_name: self
                .resolver
                .lookup_class_name_by_serial(class_serial_number),
            source_file: self.resolver.lookup_string(source_file),
            line_number,
        };
        self.resolver.define_stack_frame(stack_frame_id, frame);
        self.snapshot.counters.stack_frames += 1;
        Ok(())
    }

    fn read_stack_trace(&mut self, _length: u32) -> Result<(), HprofGraphError> {
        let serial_number = self.cursor.read_u32()?;
        let _thread_serial_number = self.cursor.read_u32()?;
        let number_of_frames = self.cursor.read_u32()? as usize;
        let max_frames = self.cursor.remaining() / self.codec.id_size() as usize;
        let mut frames = Vec::with_capacity(number_of_frames.min(max_frames));
        for _ in 0..number_of_frames {
            let stack_frame_id = self.read_id()?;
            frames.push(self.resolver.lookup_stack_frame(stack_frame_id)?);
        }
        self.resolver.define_stack_trace(serial_number, frames);
        self.snapshot.counters.stack_traces += 1;
        Ok(())
    }

    fn read_heap_dump_record(&mut self, length: u32) -> Result<Flow, HprofGraphError> {
        self.snapshot.counters.heap_dumps += 1;
        if self.dumps_to_skip > 0 {
            self.dumps_to_skip -= 1;
            return Ok(self.skip_record(length));
        }
        self.read_dump_body(length)?;
        Ok(Flow::Done)
    }

    fn read_heap_dump_segment_record(&mut self, length: u32) -> Result<Flow, HprofGraphError> {
        if !self.version.supports_segments() {
            warn!(
                "Ignoring heap dump segment record in '{}' format",
                self.version.format()
            );
            self.snapshot.counters.unknown_records += 1;
            return Ok(self.skip_record(length));
        }
        self.snapshot.counters.heap_dump_segments += 1;
        if self.dumps_to_skip > 0 {
            // every segment of a skipped dump goes
            return Ok(self.skip_record(length));
        }
        if self.read_dump_body(length)? {
            Ok(Flow::Continue)
        } else {
            Ok(Flow::Done)
        }
    }

    fn read_heap_dump_end_record(&mut self, length: u32) -> Result<Flow, HprofGraphError> {
        if !self.version.supports_segments() {
            warn!(
                "Ignoring heap dump end record in '{}' format",
                self.version.format()
            );
            self.snapshot.counters.unknown_records += 1;
            return Ok(self.skip_record(length));
        }
        if self.dumps_to_skip == 0 {
            self.skip_record(length);
            return Ok(Flow::Done);
        }
        self.dumps_to_skip -= 1;
        Ok(self.skip_record(length))
    }

    /// Decodes the sub-records of a dump, returns false when the input was cut short.
    fn read_dump_body(&mut self, length: u32) -> Result<bool, HprofGraphError> {
        match self.read_heap_dump(length) {
            Ok(_) => Ok(true),
            Err(e) if e.is_unexpected_eof() => {
                warn!("Unexpected EOF ({}). Will miss information...", e);
                // references to objects that were never read are expected from now on
                self.snapshot.mark_incomplete();
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn finish(self) -> DecodeOutcome {
        let snapshot = self.snapshot;
        debug!(
            "Decoded {} classes, {} heap objects and {} roots from {} strings",
            snapshot.class_count(),
            snapshot.heap_object_count(),
            snapshot.roots().len(),
            self.resolver.string_count()
        );
        if snapshot.is_incomplete() {
            DecodeOutcome::Incomplete(snapshot)
        } else {
            DecodeOutcome::Complete(snapshot)
        }
    }
}
