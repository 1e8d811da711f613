use std::fmt;
use std::sync::Arc;

use crate::parser::field_codec::{FieldType, FieldValue};

pub const LINE_NUMBER_UNKNOWN: i32 = -1;
pub const LINE_NUMBER_COMPILED: i32 = -2;
pub const LINE_NUMBER_NATIVE: i32 = -3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub method_name: String,
    pub method_signature: String,
    pub class_name: String,
    pub source_file: String,
    pub line_number: i32,
}

impl StackFrame {
    pub fn is_native(&self) -> bool {
        self.line_number == LINE_NUMBER_NATIVE
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // >0: normal
        // -1: unknown
        // -2: compiled method
        // -3: native method
        let pretty_line_number = match self.line_number {
            LINE_NUMBER_UNKNOWN => "unknown line number".to_string(),
            LINE_NUMBER_COMPILED => "compiled method".to_string(),
            LINE_NUMBER_NATIVE => "native method".to_string(),
            number => format!("{}", number),
        };
        write!(
            f,
            "at {}.{} ({}:{})",
            self.class_name, self.method_name, self.source_file, pretty_line_number
        )
    }
}

/// Frames ordered from the innermost call outwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StackTrace {
    frames: Vec<Arc<StackFrame>>,
}

impl StackTrace {
    pub fn new(frames: Vec<Arc<StackFrame>>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[Arc<StackFrame>] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// The first `depth` frames, the trace itself when it is not deeper than that.
    pub fn trace_for_depth(self: &Arc<Self>, depth: usize) -> Arc<StackTrace> {
        if depth >= self.frames.len() {
            Arc::clone(self)
        } else {
            Arc::new(StackTrace::new(self.frames[..depth].to_vec()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
}

impl FieldDescriptor {
    pub fn new(name: String, field_type: FieldType) -> Self {
        Self { name, field_type }
    }

    pub fn signature(&self) -> char {
        self.field_type.signature()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaticField {
    pub field: FieldDescriptor,
    pub value: FieldValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JavaClass {
    pub id: u64,
    /// Dotted name, e.g. `java.lang.String`.
    pub name: String,
    pub super_class_id: u64,
    pub class_loader_id: u64,
    pub signers_id: u64,
    pub protection_domain_id: u64,
    pub instance_fields: Vec<FieldDescriptor>,
    pub static_fields: Vec<StaticField>,
    pub instance_size: u32,
    pub site_trace: Option<Arc<StackTrace>>,
}

impl JavaClass {
    pub fn has_super_class(&self) -> bool {
        self.super_class_id != 0
    }

    pub fn is_array_class(&self) -> bool {
        self.name.starts_with('[')
    }
}

/// Only the location of the payload is kept, values are decoded on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapObjectKind {
    Instance {
        class_id: u64,
        data_offset: usize,
        data_size: u32,
    },
    ObjectArray {
        element_class_id: u64,
        data_offset: usize,
        length: u32,
    },
    PrimitiveArray {
        element_type: FieldType,
        data_offset: usize,
        length: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeapObject {
    pub id: u64,
    pub kind: HeapObjectKind,
    pub site_trace: Option<Arc<StackTrace>>,
}

impl HeapObject {
    pub fn new(id: u64, kind: HeapObjectKind) -> Self {
        Self {
            id,
            kind,
            site_trace: None,
        }
    }

    pub fn data_offset(&self) -> usize {
        match self.kind {
            HeapObjectKind::Instance { data_offset, .. }
            | HeapObjectKind::ObjectArray { data_offset, .. }
            | HeapObjectKind::PrimitiveArray { data_offset, .. } => data_offset,
        }
    }

    /// Bytes of payload following `data_offset` in the dump.
    pub fn data_size(&self, id_size: u32) -> usize {
        match self.kind {
            HeapObjectKind::Instance { data_size, .. } => data_size as usize,
            HeapObjectKind::ObjectArray { length, .. } => length as usize * id_size as usize,
            HeapObjectKind::PrimitiveArray {
                element_type,
                length,
                ..
            } => length as usize * element_type.byte_size(id_size),
        }
    }

    pub fn is_array(&self) -> bool {
        !matches!(self.kind, HeapObjectKind::Instance { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootKind {
    Unknown,
    JniGlobal,
    JniLocal,
    JavaFrame,
    NativeStack,
    StickyClass,
    ThreadBlock,
    BusyMonitor,
    ThreadObject,
}

impl fmt::Display for RootKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RootKind::Unknown => "unknown",
            RootKind::JniGlobal => "JNI global",
            RootKind::JniLocal => "JNI local",
            RootKind::JavaFrame => "Java frame",
            RootKind::NativeStack => "native stack",
            RootKind::StickyClass => "sticky class",
            RootKind::ThreadBlock => "thread block",
            RootKind::BusyMonitor => "busy monitor",
            RootKind::ThreadObject => "thread object",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Root {
    pub object_id: u64,
    /// Heap id of the owning thread, 0 when the root is not thread scoped.
    pub thread_id: u64,
    pub kind: RootKind,
    pub stack_trace: Option<Arc<StackTrace>>,
}

impl Root {
    pub fn new(object_id: u64, kind: RootKind) -> Self {
        Self {
            object_id,
            thread_id: 0,
            kind,
            stack_trace: None,
        }
    }

    pub fn in_thread(
        object_id: u64,
        thread_id: u64,
        kind: RootKind,
        stack_trace: Option<Arc<StackTrace>>,
    ) -> Self {
        Self {
            object_id,
            thread_id,
            kind,
            stack_trace,
        }
    }
}
