use std::sync::Arc;

use ahash::AHashMap;
use log::warn;

use crate::errors::HprofGraphError;
use crate::errors::HprofGraphError::*;
use crate::model::{StackFrame, StackTrace};
use crate::utils::to_hex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadObject {
    pub thread_id: u64,
    pub stack_trace_serial_number: u32,
}

/// Lookup tables filled while records are decoded, discarded once decoding is over.
///
/// Heap ids name strings and classes, serial numbers name class loads, threads and stack
/// traces. Stack frames and traces are only tracked on demand.
#[derive(Debug, Default)]
pub struct IdResolver {
    utf8_strings_by_id: AHashMap<u64, Box<str>>,
    class_name_by_id: AHashMap<u64, String>,
    class_name_by_serial_number: AHashMap<u32, String>,
    thread_object_by_serial_number: AHashMap<u32, ThreadObject>,
    stack_frame_by_id: Option<AHashMap<u64, Arc<StackFrame>>>,
    stack_trace_by_serial_number: Option<AHashMap<u32, Arc<StackTrace>>>,
}

impl IdResolver {
    pub fn new(track_stack_traces: bool) -> Self {
        let (stack_frame_by_id, stack_trace_by_serial_number) = if track_stack_traces {
            (Some(AHashMap::new()), Some(AHashMap::new()))
        } else {
            (None, None)
        };
        Self {
            stack_frame_by_id,
            stack_trace_by_serial_number,
            ..Self::default()
        }
    }

    pub fn tracks_stack_traces(&self) -> bool {
        self.stack_trace_by_serial_number.is_some()
    }

    pub fn define_string(&mut self, id: u64, bytes: &[u8]) {
        self.utf8_strings_by_id
            .insert(id, String::from_utf8_lossy(bytes).into());
    }

    /// Never fails, an unknown id yields a placeholder.
    pub fn lookup_string(&self, id: u64) -> String {
        if id == 0 {
            return String::new();
        }
        match self.utf8_strings_by_id.get(&id) {
            Some(name) => name.to_string(),
            None => {
                warn!("Name not found at {}", to_hex(id));
                format!("unresolved name {}", to_hex(id))
            }
        }
    }

    pub fn string_count(&self) -> usize {
        self.utf8_strings_by_id.len()
    }

    pub fn define_class_name(&mut self, serial_number: u32, class_object_id: u64, name: String) {
        self.class_name_by_serial_number
            .insert(serial_number, name.clone());
        self.class_name_by_id.insert(class_object_id, name);
    }

    pub fn class_name_by_id(&self, class_object_id: u64) -> Option<&str> {
        self.class_name_by_id
            .get(&class_object_id)
            .map(String::as_str)
    }

    pub fn lookup_class_name_by_serial(&self, serial_number: u32) -> String {
        match self.class_name_by_serial_number.get(&serial_number) {
            Some(name) => name.clone(),
            None => {
                warn!("Class name not found for serial # {}", serial_number);
                format!("unresolved class serial #{}", serial_number)
            }
        }
    }

    pub fn define_thread(&mut self, serial_number: u32, thread_id: u64, stack_serial_number: u32) {
        self.thread_object_by_serial_number.insert(
            serial_number,
            ThreadObject {
                thread_id,
                stack_trace_serial_number: stack_serial_number,
            },
        );
    }

    pub fn lookup_thread(&self, serial_number: u32) -> Result<ThreadObject, HprofGraphError> {
        self.thread_object_by_serial_number
            .get(&serial_number)
            .copied()
            .ok_or(UnknownThreadSerial {
                serial: serial_number,
            })
    }

    pub fn define_stack_frame(&mut self, id: u64, frame: StackFrame) {
        if let Some(frames) = self.stack_frame_by_id.as_mut() {
            frames.insert(id, Arc::new(frame));
        }
    }

    pub fn lookup_stack_frame(&self, id: u64) -> Result<Arc<StackFrame>, HprofGraphError> {
        self.stack_frame_by_id
            .as_ref()
            .and_then(|frames| frames.get(&id))
            .cloned()
            .ok_or(UnknownStackFrame { id })
    }

    pub fn define_stack_trace(&mut self, serial_number: u32, frames: Vec<Arc<StackFrame>>) {
        if let Some(traces) = self.stack_trace_by_serial_number.as_mut() {
            traces.insert(serial_number, Arc::new(StackTrace::new(frames)));
        }
    }

    /// `None` when traces are not tracked or the serial number is unknown.
    pub fn lookup_stack_trace(&self, serial_number: u32) -> Option<Arc<StackTrace>> {
        let traces = self.stack_trace_by_serial_number.as_ref()?;
        let trace = traces.get(&serial_number).cloned();
        if trace.is_none() {
            warn!("Stack trace not found for serial # {}", serial_number);
        }
        trace
    }
}
