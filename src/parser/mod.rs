pub mod cursor;
pub mod field_codec;
pub mod file_header_parser;
pub mod gc_record;
pub mod heap_dump_parser;
pub mod id_resolver;
pub mod instance_parser;
pub mod primitive_parsers;
pub mod record;
pub mod record_parser;

#[cfg(test)]
pub(crate) mod test_dump;
