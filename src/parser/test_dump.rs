//! Writes HPROF bytes for tests, records and heap dump sub-records alike.
//!
//! Type tags are passed as raw bytes so that both type codes and 1.0 signature characters
//! can be written.

pub const TIMESTAMP: u64 = 1_670_000_000_000;

pub struct DumpWriter {
    id_size: u32,
    bytes: Vec<u8>,
}

impl DumpWriter {
    /// Starts a dump file with its header.
    pub fn new(format: &str, id_size: u32) -> Self {
        let mut writer = Self::sub_records(id_size);
        writer.raw(format.as_bytes()).u8(0).u32(id_size).u64(TIMESTAMP);
        writer
    }

    /// Starts the body of a heap dump or heap dump segment record.
    pub fn sub_records(id_size: u32) -> Self {
        Self {
            id_size,
            bytes: Vec::new(),
        }
    }

    pub fn id_size(&self) -> u32 {
        self.id_size
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.bytes.push(value);
        self
    }

    pub fn u16(&mut self, value: u16) -> &mut Self {
        self.raw(&value.to_be_bytes())
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        self.raw(&value.to_be_bytes())
    }

    pub fn i32(&mut self, value: i32) -> &mut Self {
        self.raw(&value.to_be_bytes())
    }

    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.raw(&value.to_be_bytes())
    }

    pub fn id(&mut self, value: u64) -> &mut Self {
        if self.id_size == 4 {
            self.u32(value as u32)
        } else {
            self.u64(value)
        }
    }

    fn id_bytes(&self, value: u64) -> Vec<u8> {
        if self.id_size == 4 {
            (value as u32).to_be_bytes().to_vec()
        } else {
            value.to_be_bytes().to_vec()
        }
    }

    // Top level records

    pub fn record(&mut self, tag: u8, body: &[u8]) -> &mut Self {
        self.record_with_length(tag, body.len() as i32, body)
    }

    /// Declared length and actual body may disagree.
    pub fn record_with_length(&mut self, tag: u8, length: i32, body: &[u8]) -> &mut Self {
        self.u8(tag).u32(0).i32(length).raw(body)
    }

    pub fn string(&mut self, id: u64, value: &str) -> &mut Self {
        let mut body = self.id_bytes(id);
        body.extend_from_slice(value.as_bytes());
        self.record(0x01, &body)
    }

    pub fn load_class(&mut self, serial_number: u32, class_id: u64, name_id: u64) -> &mut Self {
        let mut body = serial_number.to_be_bytes().to_vec();
        body.extend(self.id_bytes(class_id));
        body.extend_from_slice(&0u32.to_be_bytes());
        body.extend(self.id_bytes(name_id));
        self.record(0x02, &body)
    }

    pub fn stack_frame(
        &mut self,
        frame_id: u64,
        method_name_id: u64,
        signature_id: u64,
        source_file_id: u64,
        class_serial_number: u32,
        line_number: i32,
    ) -> &mut Self {
        let mut body = self.id_bytes(frame_id);
        body.extend(self.id_bytes(method_name_id));
        body.extend(self.id_bytes(signature_id));
        body.extend(self.id_bytes(source_file_id));
        body.extend_from_slice(&class_serial_number.to_be_bytes());
        body.extend_from_slice(&line_number.to_be_bytes());
        self.record(0x04, &body)
    }

    pub fn stack_trace(
        &mut self,
        serial_number: u32,
        thread_serial_number: u32,
        frame_ids: &[u64],
    ) -> &mut Self {
        let mut body = serial_number.to_be_bytes().to_vec();
        body.extend_from_slice(&thread_serial_number.to_be_bytes());
        body.extend_from_slice(&(frame_ids.len() as u32).to_be_bytes());
        for frame_id in frame_ids {
            body.extend(self.id_bytes(*frame_id));
        }
        self.record(0x05, &body)
    }

    pub fn heap_dump(&mut self, body: &[u8]) -> &mut Self {
        self.record(0x0C, body)
    }

    pub fn heap_dump_segment(&mut self, body: &[u8]) -> &mut Self {
        self.record(0x1C, body)
    }

    pub fn heap_dump_end(&mut self) -> &mut Self {
        self.record(0x2C, &[])
    }

    // Heap dump sub-records

    pub fn unknown_root(&mut self, id: u64) -> &mut Self {
        self.u8(0xFF).id(id)
    }

    pub fn jni_global_root(&mut self, id: u64, global_ref_id: u64) -> &mut Self {
        self.u8(0x01).id(id).id(global_ref_id)
    }

    pub fn jni_local_root(&mut self, id: u64, thread_serial: u32, frame: i32) -> &mut Self {
        self.u8(0x02).id(id).u32(thread_serial).i32(frame)
    }

    pub fn java_frame_root(&mut self, id: u64, thread_serial: u32, frame: i32) -> &mut Self {
        self.u8(0x03).id(id).u32(thread_serial).i32(frame)
    }

    pub fn native_stack_root(&mut self, id: u64, thread_serial: u32) -> &mut Self {
        self.u8(0x04).id(id).u32(thread_serial)
    }

    pub fn sticky_class(&mut self, id: u64) -> &mut Self {
        self.u8(0x05).id(id)
    }

    pub fn thread_block_root(&mut self, id: u64, thread_serial: u32) -> &mut Self {
        self.u8(0x06).id(id).u32(thread_serial)
    }

    pub fn monitor_used_root(&mut self, id: u64) -> &mut Self {
        self.u8(0x07).id(id)
    }

    pub fn thread_object(&mut self, id: u64, thread_serial: u32, trace_serial: u32) -> &mut Self {
        self.u8(0x08).id(id).u32(thread_serial).u32(trace_serial)
    }

    /// Class dump without constants nor statics.
    pub fn class_dump(
        &mut self,
        id: u64,
        super_class_id: u64,
        instance_size: u32,
        fields: &[(u64, u8)],
    ) -> &mut Self {
        self.class_dump_with(id, super_class_id, instance_size, &[], &[], fields)
    }

    /// `constants` are (pool index, type tag, value), `statics` are (name id, type tag, value)
    /// and `fields` are (name id, type tag).
    pub fn class_dump_with(
        &mut self,
        id: u64,
        super_class_id: u64,
        instance_size: u32,
        constants: &[(u16, u8, Vec<u8>)],
        statics: &[(u64, u8, Vec<u8>)],
        fields: &[(u64, u8)],
    ) -> &mut Self {
        self.u8(0x20).id(id).u32(0).id(super_class_id);
        // loader, signers, protection domain and two reserved ids
        for _ in 0..5 {
            self.id(0);
        }
        self.u32(instance_size).u16(constants.len() as u16);
        for (index, tag, value) in constants {
            self.u16(*index).u8(*tag).raw(value);
        }
        self.u16(statics.len() as u16);
        for (name_id, tag, value) in statics {
            self.id(*name_id).u8(*tag).raw(value);
        }
        self.u16(fields.len() as u16);
        for (name_id, tag) in fields {
            self.id(*name_id).u8(*tag);
        }
        self
    }

    pub fn instance(&mut self, id: u64, class_id: u64, data: &[u8]) -> &mut Self {
        self.instance_traced(id, 0, class_id, data)
    }

    pub fn instance_traced(
        &mut self,
        id: u64,
        trace_serial: u32,
        class_id: u64,
        data: &[u8],
    ) -> &mut Self {
        self.u8(0x21)
            .id(id)
            .u32(trace_serial)
            .id(class_id)
            .u32(data.len() as u32)
            .raw(data)
    }

    pub fn object_array(&mut self, id: u64, element_class_id: u64, elements: &[u64]) -> &mut Self {
        self.u8(0x22)
            .id(id)
            .u32(0)
            .u32(elements.len() as u32)
            .id(element_class_id);
        for element in elements {
            self.id(*element);
        }
        self
    }

    /// `data` is written as is, `length` is the element count.
    pub fn primitive_array(&mut self, id: u64, type_code: u8, length: u32, data: &[u8]) -> &mut Self {
        self.u8(0x23).id(id).u32(0).u32(length).u8(type_code).raw(data)
    }
}
