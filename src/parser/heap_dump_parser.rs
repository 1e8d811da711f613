use std::sync::Arc;

use log::warn;

use crate::errors::HprofGraphError;
use crate::errors::HprofGraphError::*;
use crate::model::{
    FieldDescriptor, HeapObject, HeapObjectKind, JavaClass, Root, RootKind, StackTrace,
    StaticField,
};
use crate::parser::field_codec::FieldType;
use crate::parser::gc_record::GcTag;
use crate::parser::record_parser::HprofDecoder;
use crate::snapshot::TracedEntity;
use crate::utils::to_hex;

impl<'a> HprofDecoder<'a> {
    /// Consumes the sub-records of a heap dump or heap dump segment of `length` bytes.
    ///
    /// Returns what is left of the byte budget once the last sub-record is read. Unread bytes
    /// are skipped up to the declared end, an overrun leaves the cursor after the last
    /// sub-record.
    pub(super) fn read_heap_dump(&mut self, length: u32) -> Result<i64, HprofGraphError> {
        let end_position = self.cursor.position() + length as usize;
        let mut bytes_left = i64::from(length);
        while bytes_left > 0 {
            let sub_record_start = self.cursor.position();
            let tag = self.cursor.read_u8()?;
            bytes_left -= 1;
            let gc_tag = match GcTag::try_from(tag) {
                Ok(gc_tag) => gc_tag,
                Err(_) => {
                    warn!(
                        "Unrecognized heap dump sub-record type {} at position {}, skipping {} bytes",
                        tag, sub_record_start, bytes_left
                    );
                    self.snapshot.counters.unknown_records += 1;
                    self.cursor.seek(end_position)?;
                    return Ok(bytes_left);
                }
            };
            self.snapshot.counters.heap_dump_all_sub_records += 1;
            if gc_tag.is_root() {
                self.snapshot.counters.gc_roots += 1;
            }
            let bytes_read = self
                .read_sub_record(gc_tag)
                .map_err(|e| e.in_record(format!("{:?}", gc_tag), sub_record_start))?;
            bytes_left -= bytes_read as i64;
        }
        if bytes_left != 0 {
            warn!(
                "Error reading heap dump or heap dump segment: byte count is {} instead of 0",
                bytes_left
            );
            if bytes_left > 0 {
                self.cursor.seek(end_position)?;
            }
        }
        Ok(bytes_left)
    }

    fn read_sub_record(&mut self, gc_tag: GcTag) -> Result<usize, HprofGraphError> {
        let id_size = self.codec.id_size() as usize;
        let counters = &mut self.snapshot.counters;
        match gc_tag {
            GcTag::RootUnknown => counters.gc_root_unknown += 1,
            GcTag::RootThreadObject => counters.gc_root_thread_object += 1,
            GcTag::RootJniGlobal => counters.gc_root_jni_global += 1,
            GcTag::RootJniLocal => counters.gc_root_jni_local += 1,
            GcTag::RootJavaFrame => counters.gc_root_java_frame += 1,
            GcTag::RootNativeStack => counters.gc_root_native_stack += 1,
            GcTag::RootStickyClass => counters.gc_root_sticky_class += 1,
            GcTag::RootThreadBlock => counters.gc_root_thread_block += 1,
            GcTag::RootMonitorUsed => counters.gc_root_monitor_used += 1,
            GcTag::ClassDump => counters.gc_class_dump += 1,
            GcTag::InstanceDump => counters.gc_instance_dump += 1,
            GcTag::ObjectArrayDump => counters.gc_object_array_dump += 1,
            GcTag::PrimitiveArrayDump => counters.gc_primitive_array_dump += 1,
        }

        match gc_tag {
            GcTag::RootUnknown => self.read_simple_root(RootKind::Unknown),
            GcTag::RootStickyClass => self.read_simple_root(RootKind::StickyClass),
            GcTag::RootMonitorUsed => self.read_simple_root(RootKind::BusyMonitor),
            GcTag::RootJniGlobal => {
                let object_id = self.read_id()?;
                let _jni_global_ref_id = self.read_id()?;
                self.snapshot
                    .add_root(Root::new(object_id, RootKind::JniGlobal));
                Ok(2 * id_size)
            }
            GcTag::RootThreadObject => {
                let thread_object_id = self.read_id()?;
                let thread_serial_number = self.cursor.read_u32()?;
                let stack_trace_serial_number = self.cursor.read_u32()?;
                self.resolver.define_thread(
                    thread_serial_number,
                    thread_object_id,
                    stack_trace_serial_number,
                );
                let stack_trace = self.resolver.lookup_stack_trace(stack_trace_serial_number);
                self.snapshot.add_root(Root::in_thread(
                    thread_object_id,
                    thread_object_id,
                    RootKind::ThreadObject,
                    stack_trace,
                ));
                Ok(id_size + 8)
            }
            GcTag::RootJniLocal => self.read_frame_root(RootKind::JniLocal),
            GcTag::RootJavaFrame => self.read_frame_root(RootKind::JavaFrame),
            GcTag::RootNativeStack => self.read_thread_root(RootKind::NativeStack),
            GcTag::RootThreadBlock => self.read_thread_root(RootKind::ThreadBlock),
            GcTag::ClassDump => self.read_class_dump(),
            GcTag::InstanceDump => self.read_instance_dump(),
            GcTag::ObjectArrayDump => self.read_array_dump(false),
            GcTag::PrimitiveArrayDump => self.read_array_dump(true),
        }
    }

    fn read_stack_trace_serial(&mut self) -> Result<Option<Arc<StackTrace>>, HprofGraphError> {
        let serial_number = self.cursor.read_u32()?;
        Ok(self.resolver.lookup_stack_trace(serial_number))
    }

    fn read_simple_root(&mut self, kind: RootKind) -> Result<usize, HprofGraphError> {
        let object_id = self.read_id()?;
        self.snapshot.add_root(Root::new(object_id, kind));
        Ok(self.codec.id_size() as usize)
    }

    /// Roots held by a thread as a whole, they get the full trace of the thread.
    fn read_thread_root(&mut self, kind: RootKind) -> Result<usize, HprofGraphError> {
        let object_id = self.read_id()?;
        let thread_serial_number = self.cursor.read_u32()?;
        let thread = self.resolver.lookup_thread(thread_serial_number)?;
        let stack_trace = self
            .resolver
            .lookup_stack_trace(thread.stack_trace_serial_number);
        self.snapshot.add_root(Root::in_thread(
            object_id,
            thread.thread_id,
            kind,
            stack_trace,
        ));
        Ok(self.codec.id_size() as usize + 4)
    }

    /// Roots held by a given frame, the thread trace is cut below that frame. Frame -1 keeps
    /// an empty trace.
    fn read_frame_root(&mut self, kind: RootKind) -> Result<usize, HprofGraphError> {
        let object_id = self.read_id()?;
        let thread_serial_number = self.cursor.read_u32()?;
        let frame_number = self.cursor.read_i32()?;
        let thread = self.resolver.lookup_thread(thread_serial_number)?;
        let depth = (i64::from(frame_number) + 1).max(0) as usize;
        let stack_trace = self
            .resolver
            .lookup_stack_trace(thread.stack_trace_serial_number)
            .map(|trace| trace.trace_for_depth(depth));
        self.snapshot.add_root(Root::in_thread(
            object_id,
            thread.thread_id,
            kind,
            stack_trace,
        ));
        Ok(self.codec.id_size() as usize + 8)
    }

    fn read_class_dump(&mut self) -> Result<usize, HprofGraphError> {
        let id_size = self.codec.id_size() as usize;
        let class_object_id = self.read_id()?;
        let stack_trace = self.read_stack_trace_serial()?;
        let super_class_id = self.read_id()?;
        let class_loader_id = self.read_id()?;
        let signers_id = self.read_id()?;
        let protection_domain_id = self.read_id()?;
        let _reserved_1 = self.read_id()?;
        let _reserved_2 = self.read_id()?;
        let instance_size = self.cursor.read_u32()?;
        let mut bytes_read = 7 * id_size + 8;

        // constants carry nothing for the graph but their width depends on their type
        let constant_pool_size = self.cursor.read_u16()?;
        bytes_read += 2;
        for _ in 0..constant_pool_size {
            let _const_pool_idx = self.cursor.read_u16()?;
            let (_, _, width) = self.codec.read_tagged_value(&mut self.cursor)?;
            bytes_read += 2 + width;
        }

        let static_fields_number = self.cursor.read_u16()?;
        bytes_read += 2;
        let mut static_fields = Vec::with_capacity(static_fields_number as usize);
        for _ in 0..static_fields_number {
            let name_id = self.read_id()?;
            let (field_type, value, width) = self.codec.read_tagged_value(&mut self.cursor)?;
            bytes_read += id_size + width;
            static_fields.push(StaticField {
                field: FieldDescriptor::new(self.resolver.lookup_string(name_id), field_type),
                value,
            });
        }

        let instance_fields_number = self.cursor.read_u16()?;
        bytes_read += 2;
        let mut instance_fields = Vec::with_capacity(instance_fields_number as usize);
        for _ in 0..instance_fields_number {
            let name_id = self.read_id()?;
            let field_type = self.codec.field_type(self.cursor.read_u8()?)?;
            bytes_read += id_size + 1;
            instance_fields.push(FieldDescriptor::new(
                self.resolver.lookup_string(name_id),
                field_type,
            ));
        }

        let name = match self.resolver.class_name_by_id(class_object_id) {
            Some(name) => name.to_string(),
            None => {
                warn!("Class name not found for {}", to_hex(class_object_id));
                format!("unknown-name@{}", to_hex(class_object_id))
            }
        };
        self.snapshot.add_class(JavaClass {
            id: class_object_id,
            name,
            super_class_id,
            class_loader_id,
            signers_id,
            protection_domain_id,
            instance_fields,
            static_fields,
            instance_size,
            site_trace: None,
        });
        self.snapshot
            .set_site_trace(TracedEntity::Class(class_object_id), stack_trace);
        Ok(bytes_read)
    }

    fn read_instance_dump(&mut self) -> Result<usize, HprofGraphError> {
        let id_size = self.codec.id_size() as usize;
        let object_id = self.read_id()?;
        let stack_trace = self.read_stack_trace_serial()?;
        let class_id = self.read_id()?;
        let data_size = self.cursor.read_u32()?;
        // field values stay in the dump until asked for
        let data_offset = self.cursor.position();
        self.cursor.skip(data_size as usize)?;
        self.snapshot.add_heap_object(HeapObject::new(
            object_id,
            HeapObjectKind::Instance {
                class_id,
                data_offset,
                data_size,
            },
        ))?;
        self.snapshot
            .set_site_trace(TracedEntity::HeapObject(object_id), stack_trace);
        Ok(2 * id_size + 8 + data_size as usize)
    }

    fn read_array_dump(&mut self, primitive: bool) -> Result<usize, HprofGraphError> {
        let id_size = self.codec.id_size() as usize;
        let object_id = self.read_id()?;
        let stack_trace = self.read_stack_trace_serial()?;
        let length = self.cursor.read_u32()?;
        let mut bytes_read = id_size + 8;
        let element_class_id = if primitive {
            bytes_read += 1;
            u64::from(self.cursor.read_u8()?)
        } else {
            bytes_read += id_size;
            self.read_id()?
        };

        // 1.0 dumps flag primitive arrays with a type code in place of the element class
        let element_type = if primitive || !self.version.uses_type_codes() {
            let element_type = FieldType::primitive_from_type_code(element_class_id);
            if element_type.is_none() && self.version.uses_type_codes() {
                return Err(UnrecognizedArrayTypeCode {
                    code: element_class_id,
                });
            }
            element_type
        } else {
            None
        };

        let data_offset = self.cursor.position();
        let kind = match element_type {
            Some(element_type) => HeapObjectKind::PrimitiveArray {
                element_type,
                data_offset,
                length,
            },
            None => HeapObjectKind::ObjectArray {
                element_class_id,
                data_offset,
                length,
            },
        };
        let object = HeapObject::new(object_id, kind);
        let data_size = object.data_size(self.codec.id_size());
        self.cursor.skip(data_size)?;
        self.snapshot.add_heap_object(object)?;
        self.snapshot
            .set_site_trace(TracedEntity::HeapObject(object_id), stack_trace);
        Ok(bytes_read + data_size)
    }
}
