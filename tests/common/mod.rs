#[allow(dead_code)]
#[path = "../../src/parser/test_dump.rs"]
mod test_dump;

#[allow(unused_imports)]
pub use test_dump::{DumpWriter, TIMESTAMP};

pub const FORMAT_1_0: &str = "JAVA PROFILE 1.0";
pub const FORMAT_1_0_1: &str = "JAVA PROFILE 1.0.1";
pub const FORMAT_1_0_2: &str = "JAVA PROFILE 1.0.2";

/// The smallest useful dump: class `com.Foo` (id 0x100) held by a sticky class root.
#[allow(dead_code)]
pub fn sticky_class_dump(id_size: u32) -> Vec<u8> {
    let mut body = DumpWriter::sub_records(id_size);
    body.class_dump(0x100, 0, 0, &[]).sticky_class(0x100);
    let mut dump = DumpWriter::new(FORMAT_1_0_2, id_size);
    dump.string(0x1, "com/Foo")
        .load_class(1, 0x100, 0x1)
        .heap_dump(&body.into_bytes());
    dump.into_bytes()
}
