use ahash::AHashSet;
use log::{debug, warn};

use crate::errors::HprofGraphError;
use crate::errors::HprofGraphError::*;
use crate::model::{HeapObject, HeapObjectKind};
use crate::parser::cursor::DumpCursor;
use crate::parser::field_codec::{FieldValue, ValueCodec};
use crate::snapshot::Snapshot;
use crate::utils::to_hex;

/// One decoded instance field, `class_id` is the class declaring it.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceFieldValue {
    pub class_id: u64,
    pub name: String,
    pub value: FieldValue,
}

fn lookup_object(snapshot: &Snapshot, id: u64) -> Result<&HeapObject, HprofGraphError> {
    snapshot.heap_object(id).ok_or(ObjectNotFound { id })
}

/// Cursor over the payload of `object`, bounded to the payload end.
fn payload_cursor<'a>(
    snapshot: &Snapshot,
    data: &'a [u8],
    object: &HeapObject,
) -> Result<DumpCursor<'a>, HprofGraphError> {
    let start = object.data_offset();
    let end = start + object.data_size(snapshot.identifier_size());
    let bounded = data.get(..end).ok_or(UnexpectedEof { offset: data.len() })?;
    Ok(DumpCursor::at(bounded, start))
}

/// Decodes the field values of instance `id` from the dump bytes it was decoded from.
///
/// Fields come in dump order: those declared by the class of the instance first, then those
/// of each super class up the chain.
pub fn read_instance_fields(
    snapshot: &Snapshot,
    data: &[u8],
    id: u64,
) -> Result<Vec<InstanceFieldValue>, HprofGraphError> {
    let object = lookup_object(snapshot, id)?;
    let class_id = match object.kind {
        HeapObjectKind::Instance { class_id, .. } => class_id,
        _ => return Err(NotAnInstance { id }),
    };
    let mut cursor = payload_cursor(snapshot, data, object)?;
    let codec = ValueCodec::new(snapshot.identifier_size(), snapshot.version());

    let mut fields = Vec::new();
    let mut seen = AHashSet::new();
    let mut current_id = class_id;
    while current_id != 0 && seen.insert(current_id) {
        let class = match snapshot.class(current_id) {
            Some(class) => class,
            None if snapshot.is_incomplete() => {
                warn!(
                    "Class {} of instance {} missing from incomplete dump",
                    to_hex(current_id),
                    to_hex(id)
                );
                break;
            }
            None => return Err(ClassNotFound { id: current_id }),
        };
        for field in &class.instance_fields {
            let (value, _) = codec.read_value(&mut cursor, field.field_type)?;
            fields.push(InstanceFieldValue {
                class_id: class.id,
                name: field.name.clone(),
                value,
            });
        }
        current_id = class.super_class_id;
    }
    if !cursor.is_exhausted() {
        debug!(
            "{} bytes of instance {} not covered by its fields",
            cursor.remaining(),
            to_hex(id)
        );
    }
    Ok(fields)
}

/// Element ids of object array `id`, 0 being a null slot.
pub fn read_object_array_elements(
    snapshot: &Snapshot,
    data: &[u8],
    id: u64,
) -> Result<Vec<u64>, HprofGraphError> {
    let object = lookup_object(snapshot, id)?;
    let length = match object.kind {
        HeapObjectKind::ObjectArray { length, .. } => length,
        _ => {
            return Err(NotAnArray {
                id,
                expected: "object array",
            })
        }
    };
    let mut cursor = payload_cursor(snapshot, data, object)?;
    let id_size = snapshot.identifier_size();
    (0..length).map(|_| cursor.read_id(id_size)).collect()
}

pub fn read_primitive_array_values(
    snapshot: &Snapshot,
    data: &[u8],
    id: u64,
) -> Result<Vec<FieldValue>, HprofGraphError> {
    let object = lookup_object(snapshot, id)?;
    let (element_type, length) = match object.kind {
        HeapObjectKind::PrimitiveArray {
            element_type,
            length,
            ..
        } => (element_type, length),
        _ => {
            return Err(NotAnArray {
                id,
                expected: "primitive array",
            })
        }
    };
    let mut cursor = payload_cursor(snapshot, data, object)?;
    let codec = ValueCodec::new(snapshot.identifier_size(), snapshot.version());
    (0..length)
        .map(|_| codec.read_value(&mut cursor, element_type).map(|(v, _)| v))
        .collect()
}
