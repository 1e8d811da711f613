use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use indoc::formatdoc;
use log::debug;
use rayon::prelude::*;

use crate::errors::HprofGraphError;
use crate::errors::HprofGraphError::*;
use crate::model::{FieldDescriptor, HeapObject, HeapObjectKind, JavaClass, Root, StackTrace};
use crate::parser::file_header_parser::HprofVersion;
use crate::utils::{pretty_bytes_size, to_hex};

/// Entities that can carry an allocation site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracedEntity {
    Class(u64),
    HeapObject(u64),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecordCounters {
    // Tag counters
    pub utf8_strings: u32,
    pub classes_loaded: u32,
    pub stack_frames: u32,
    pub stack_traces: u32,
    pub heap_dumps: u32,
    pub heap_dump_segments: u32,
    pub skipped_records: u32,
    pub unknown_records: u32,
    // GC tag counters
    pub heap_dump_all_sub_records: u32,
    pub gc_roots: u32,
    pub gc_root_unknown: u32,
    pub gc_root_thread_object: u32,
    pub gc_root_jni_global: u32,
    pub gc_root_jni_local: u32,
    pub gc_root_java_frame: u32,
    pub gc_root_native_stack: u32,
    pub gc_root_sticky_class: u32,
    pub gc_root_thread_block: u32,
    pub gc_root_monitor_used: u32,
    pub gc_class_dump: u32,
    pub gc_instance_dump: u32,
    pub gc_object_array_dump: u32,
    pub gc_primitive_array_dump: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassHistogramEntry {
    pub class_id: u64,
    pub class_name: String,
    pub instances: u64,
    pub data_bytes: u64,
}

/// The object graph of one heap dump.
///
/// Classes and heap objects live in dense tables indexed by heap id, edges between them are
/// plain ids resolved through the accessors.
#[derive(Debug)]
pub struct Snapshot {
    id_size: u32,
    version: HprofVersion,
    creation_timestamp: u64,
    classes: Vec<JavaClass>,
    class_index_by_id: AHashMap<u64, usize>,
    class_id_by_name: AHashMap<String, u64>,
    heap_objects: Vec<HeapObject>,
    heap_object_index_by_id: AHashMap<u64, usize>,
    roots: Vec<Root>,
    root_indexes_by_id: AHashMap<u64, Vec<usize>>,
    incomplete: bool,
    pub counters: RecordCounters,
}

impl Snapshot {
    pub fn new(id_size: u32, version: HprofVersion, creation_timestamp: u64) -> Self {
        Snapshot {
            id_size,
            version,
            creation_timestamp,
            classes: Vec::new(),
            class_index_by_id: AHashMap::new(),
            class_id_by_name: AHashMap::new(),
            heap_objects: Vec::new(),
            heap_object_index_by_id: AHashMap::new(),
            roots: Vec::new(),
            root_indexes_by_id: AHashMap::new(),
            incomplete: false,
            counters: RecordCounters::default(),
        }
    }

    /// A class registered twice replaces the earlier entry.
    pub fn add_class(&mut self, class: JavaClass) {
        let id = class.id;
        match self.class_index_by_id.get(&id) {
            Some(&index) => {
                debug!("Class {} registered again", to_hex(id));
                let previous = std::mem::replace(&mut self.classes[index], class);
                if self.class_id_by_name.get(&previous.name) == Some(&id) {
                    self.class_id_by_name.remove(&previous.name);
                }
                self.class_id_by_name
                    .insert(self.classes[index].name.clone(), id);
            }
            None => {
                self.class_id_by_name.insert(class.name.clone(), id);
                self.classes.push(class);
                self.class_index_by_id.insert(id, self.classes.len() - 1);
            }
        }
    }

    pub fn add_heap_object(&mut self, object: HeapObject) -> Result<(), HprofGraphError> {
        let id = object.id;
        if self.heap_object_index_by_id.contains_key(&id) {
            return Err(DuplicateHeapObject { id });
        }
        self.heap_objects.push(object);
        self.heap_object_index_by_id
            .insert(id, self.heap_objects.len() - 1);
        Ok(())
    }

    pub fn add_root(&mut self, root: Root) {
        self.root_indexes_by_id
            .entry(root.object_id)
            .or_default()
            .push(self.roots.len());
        self.roots.push(root);
    }

    /// Empty traces are not worth attaching.
    pub fn set_site_trace(&mut self, entity: TracedEntity, trace: Option<Arc<StackTrace>>) {
        let trace = match trace {
            Some(trace) if !trace.is_empty() => trace,
            _ => return,
        };
        match entity {
            TracedEntity::Class(id) => {
                if let Some(&index) = self.class_index_by_id.get(&id) {
                    self.classes[index].site_trace = Some(trace);
                }
            }
            TracedEntity::HeapObject(id) => {
                if let Some(&index) = self.heap_object_index_by_id.get(&id) {
                    self.heap_objects[index].site_trace = Some(trace);
                }
            }
        }
    }

    /// Set after truncated input: references to missing objects are expected.
    pub fn mark_incomplete(&mut self) {
        self.incomplete = true;
    }

    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }

    pub fn identifier_size(&self) -> u32 {
        self.id_size
    }

    pub fn version(&self) -> HprofVersion {
        self.version
    }

    pub fn creation_timestamp(&self) -> u64 {
        self.creation_timestamp
    }

    pub fn class(&self, id: u64) -> Option<&JavaClass> {
        self.class_index_by_id
            .get(&id)
            .map(|&index| &self.classes[index])
    }

    /// Classes sharing a name (one per class loader) resolve to the last one registered, use
    /// `classes` to see all of them.
    pub fn class_by_name(&self, name: &str) -> Option<&JavaClass> {
        self.class_id_by_name
            .get(name)
            .and_then(|id| self.class(*id))
    }

    pub fn classes(&self) -> &[JavaClass] {
        &self.classes
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn super_class(&self, class: &JavaClass) -> Option<&JavaClass> {
        if class.has_super_class() {
            self.class(class.super_class_id)
        } else {
            None
        }
    }

    /// The class itself followed by its known ancestors.
    pub fn class_hierarchy(&self, id: u64) -> Vec<&JavaClass> {
        let mut chain = Vec::new();
        let mut seen = AHashSet::new();
        let mut current = self.class(id);
        while let Some(class) = current {
            if !seen.insert(class.id) {
                break;
            }
            chain.push(class);
            current = self.super_class(class);
        }
        chain
    }

    pub fn subclasses(&self, id: u64) -> Vec<&JavaClass> {
        self.classes
            .iter()
            .filter(|c| c.super_class_id == id && c.id != id)
            .collect()
    }

    /// Instance field layout: own fields first, then those of each super class.
    pub fn instance_field_layout(&self, id: u64) -> Vec<&FieldDescriptor> {
        self.class_hierarchy(id)
            .into_iter()
            .flat_map(|class| class.instance_fields.iter())
            .collect()
    }

    pub fn heap_object(&self, id: u64) -> Option<&HeapObject> {
        self.heap_object_index_by_id
            .get(&id)
            .map(|&index| &self.heap_objects[index])
    }

    pub fn heap_objects(&self) -> &[HeapObject] {
        &self.heap_objects
    }

    pub fn heap_object_count(&self) -> usize {
        self.heap_objects.len()
    }

    /// Class of an instance or element class of an object array.
    pub fn class_of(&self, object_id: u64) -> Option<&JavaClass> {
        match self.heap_object(object_id)?.kind {
            HeapObjectKind::Instance { class_id, .. } => self.class(class_id),
            HeapObjectKind::ObjectArray {
                element_class_id, ..
            } => self.class(element_class_id),
            HeapObjectKind::PrimitiveArray { .. } => None,
        }
    }

    pub fn roots(&self) -> &[Root] {
        &self.roots
    }

    pub fn roots_of(&self, object_id: u64) -> Vec<&Root> {
        self.root_indexes_by_id
            .get(&object_id)
            .map(|indexes| indexes.iter().map(|&i| &self.roots[i]).collect())
            .unwrap_or_default()
    }

    pub fn is_root(&self, object_id: u64) -> bool {
        self.root_indexes_by_id.contains_key(&object_id)
    }

    pub fn root_ids(&self) -> AHashSet<u64> {
        self.root_indexes_by_id.keys().copied().collect()
    }

    /// Instances per class, most populated first.
    pub fn instance_histogram(&self) -> Vec<ClassHistogramEntry> {
        let counts: AHashMap<u64, (u64, u64)> = self
            .heap_objects
            .par_iter()
            .filter_map(|object| match object.kind {
                HeapObjectKind::Instance {
                    class_id,
                    data_size,
                    ..
                } => Some((class_id, data_size as u64)),
                _ => None,
            })
            .fold(AHashMap::new, |mut acc, (class_id, data_size)| {
                let entry = acc.entry(class_id).or_insert((0, 0));
                entry.0 += 1;
                entry.1 += data_size;
                acc
            })
            .reduce(AHashMap::new, |mut left, right| {
                for (class_id, (instances, data_bytes)) in right {
                    let entry = left.entry(class_id).or_insert((0, 0));
                    entry.0 += instances;
                    entry.1 += data_bytes;
                }
                left
            });

        let mut histogram: Vec<_> = counts
            .into_iter()
            .map(|(class_id, (instances, data_bytes))| ClassHistogramEntry {
                class_id,
                class_name: self
                    .class(class_id)
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| format!("unknown-class@{}", to_hex(class_id))),
                instances,
                data_bytes,
            })
            .collect();
        histogram.sort_by(|a, b| {
            b.instances
                .cmp(&a.instances)
                .then_with(|| a.class_name.cmp(&b.class_name))
        });
        histogram
    }

    pub fn render_summary(&self) -> String {
        let payload_bytes: u64 = self
            .heap_objects
            .par_iter()
            .map(|o| o.data_size(self.id_size) as u64)
            .sum();

        let top_summary = formatdoc!(
            "\nSnapshot summary:\n
            Format: {} ({} bytes identifiers)
            Complete: {}
            UTF-8 Strings: {}
            Classes loaded: {}
            Stack traces: {}
            Stack frames: {}
            Skipped records: {}
            Unknown records: {}",
            self.version.format(),
            self.id_size,
            if self.incomplete { "no" } else { "yes" },
            self.counters.utf8_strings,
            self.counters.classes_loaded,
            self.counters.stack_traces,
            self.counters.stack_frames,
            self.counters.skipped_records,
            self.counters.unknown_records,
        );

        let heap_summary = formatdoc!(
            "{} heap dumps and {} segments containing in total {} sub-records ({} GC roots):
            ..GC root unknown: {}
            ..GC root thread objects: {}
            ..GC root JNI global: {}
            ..GC root JNI local: {}
            ..GC root Java frame: {}
            ..GC root native stack: {}
            ..GC root sticky class: {}
            ..GC root thread block: {}
            ..GC root monitor used: {}
            ..GC primitive array dump: {}
            ..GC object array dump: {}
            ..GC class dump: {}
            ..GC instance dump: {}
            Graph: {} classes, {} heap objects ({} of field data), {} roots",
            self.counters.heap_dumps,
            self.counters.heap_dump_segments,
            self.counters.heap_dump_all_sub_records,
            self.counters.gc_roots,
            self.counters.gc_root_unknown,
            self.counters.gc_root_thread_object,
            self.counters.gc_root_jni_global,
            self.counters.gc_root_jni_local,
            self.counters.gc_root_java_frame,
            self.counters.gc_root_native_stack,
            self.counters.gc_root_sticky_class,
            self.counters.gc_root_thread_block,
            self.counters.gc_root_monitor_used,
            self.counters.gc_primitive_array_dump,
            self.counters.gc_object_array_dump,
            self.counters.gc_class_dump,
            self.counters.gc_instance_dump,
            self.classes.len(),
            self.heap_objects.len(),
            pretty_bytes_size(payload_bytes),
            self.roots.len(),
        );

        format!("{}\n{}", top_summary, heap_summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RootKind, StackFrame};
    use crate::parser::field_codec::FieldType;

    fn class(id: u64, name: &str, super_class_id: u64, fields: &[&str]) -> JavaClass {
        JavaClass {
            id,
            name: name.to_string(),
            super_class_id,
            class_loader_id: 0,
            signers_id: 0,
            protection_domain_id: 0,
            instance_fields: fields
                .iter()
                .map(|f| FieldDescriptor::new(f.to_string(), FieldType::Int))
                .collect(),
            static_fields: vec![],
            instance_size: 4 * fields.len() as u32,
            site_trace: None,
        }
    }

    fn instance(id: u64, class_id: u64, data_size: u32) -> HeapObject {
        HeapObject::new(
            id,
            HeapObjectKind::Instance {
                class_id,
                data_offset: 0,
                data_size,
            },
        )
    }

    fn snapshot() -> Snapshot {
        Snapshot::new(8, HprofVersion::V1_0_2, 0)
    }

    #[test]
    fn duplicate_heap_object_is_rejected() {
        let mut snapshot = snapshot();
        snapshot.add_heap_object(instance(0x10, 0x1, 4)).unwrap();
        assert!(matches!(
            snapshot.add_heap_object(instance(0x10, 0x2, 8)),
            Err(DuplicateHeapObject { id: 0x10 })
        ));
        assert_eq!(snapshot.heap_object_count(), 1);
        assert_eq!(snapshot.class_of(0x10), None);
    }

    #[test]
    fn class_registration_is_last_write_wins() {
        let mut snapshot = snapshot();
        snapshot.add_class(class(0x1, "com.Old", 0, &[]));
        snapshot.add_class(class(0x1, "com.New", 0, &["a"]));
        assert_eq!(snapshot.class_count(), 1);
        assert_eq!(snapshot.class(0x1).unwrap().name, "com.New");
        assert!(snapshot.class_by_name("com.Old").is_none());
        assert_eq!(snapshot.class_by_name("com.New").unwrap().id, 0x1);
    }

    #[test]
    fn same_name_from_two_loaders_resolves_to_last() {
        let mut snapshot = snapshot();
        let mut first = class(0x1, "com.Plugin", 0, &[]);
        first.class_loader_id = 0xA;
        let mut second = class(0x2, "com.Plugin", 0, &[]);
        second.class_loader_id = 0xB;
        snapshot.add_class(first);
        snapshot.add_class(second);
        assert_eq!(snapshot.class_by_name("com.Plugin").unwrap().id, 0x2);
        let named: Vec<_> = snapshot
            .classes()
            .iter()
            .filter(|c| c.name == "com.Plugin")
            .map(|c| c.class_loader_id)
            .collect();
        assert_eq!(named, vec![0xA, 0xB]);
    }

    #[test]
    fn hierarchy_and_field_layout() {
        let mut snapshot = snapshot();
        snapshot.add_class(class(0x1, "java.lang.Object", 0, &[]));
        snapshot.add_class(class(0x2, "com.Base", 0x1, &["base"]));
        snapshot.add_class(class(0x3, "com.Child", 0x2, &["child1", "child2"]));
        let names: Vec<_> = snapshot
            .class_hierarchy(0x3)
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["com.Child", "com.Base", "java.lang.Object"]);
        let layout: Vec<_> = snapshot
            .instance_field_layout(0x3)
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(layout, vec!["child1", "child2", "base"]);
        assert_eq!(snapshot.subclasses(0x1).len(), 1);
        assert_eq!(snapshot.subclasses(0x2)[0].name, "com.Child");
    }

    #[test]
    fn self_referencing_hierarchy_terminates() {
        let mut snapshot = snapshot();
        snapshot.add_class(class(0x1, "com.Loop", 0x1, &[]));
        assert_eq!(snapshot.class_hierarchy(0x1).len(), 1);
        assert!(snapshot.subclasses(0x1).is_empty());
    }

    #[test]
    fn roots_are_indexed_by_object() {
        let mut snapshot = snapshot();
        assert!(snapshot.root_ids().is_empty());
        snapshot.add_root(Root::new(0x100, RootKind::StickyClass));
        snapshot.add_root(Root::new(0x100, RootKind::JniGlobal));
        snapshot.add_root(Root::new(0x200, RootKind::BusyMonitor));
        assert_eq!(snapshot.roots().len(), 3);
        assert_eq!(snapshot.roots_of(0x100).len(), 2);
        assert!(snapshot.roots_of(0x300).is_empty());
        assert!(snapshot.is_root(0x200));
        assert_eq!(snapshot.root_ids().len(), 2);
    }

    #[test]
    fn site_traces_skip_empty() {
        let mut snapshot = snapshot();
        snapshot.add_class(class(0x1, "com.Foo", 0, &[]));
        snapshot.add_heap_object(instance(0x10, 0x1, 0)).unwrap();
        snapshot.set_site_trace(TracedEntity::HeapObject(0x10), Some(Arc::default()));
        assert!(snapshot.heap_object(0x10).unwrap().site_trace.is_none());

        let trace = Arc::new(StackTrace::new(vec![Arc::new(StackFrame {
            method_name: "<init>".to_string(),
            method_signature: "()V".to_string(),
            class_name: "com.Foo".to_string(),
            source_file: "Foo.java".to_string(),
            line_number: 3,
        })]));
        snapshot.set_site_trace(TracedEntity::HeapObject(0x10), Some(trace.clone()));
        snapshot.set_site_trace(TracedEntity::Class(0x1), Some(trace));
        assert!(snapshot.heap_object(0x10).unwrap().site_trace.is_some());
        assert!(snapshot.class(0x1).unwrap().site_trace.is_some());
    }

    #[test]
    fn incomplete_flag_sticks() {
        let mut snapshot = snapshot();
        assert!(!snapshot.is_incomplete());
        snapshot.mark_incomplete();
        snapshot.mark_incomplete();
        assert!(snapshot.is_incomplete());
    }

    #[test]
    fn histogram_counts_instances_per_class() {
        let mut snapshot = snapshot();
        snapshot.add_class(class(0x1, "com.A", 0, &["a"]));
        snapshot.add_class(class(0x2, "com.B", 0, &["b"]));
        for id in 0..10 {
            snapshot.add_heap_object(instance(0x100 + id, 0x1, 4)).unwrap();
        }
        for id in 0..3 {
            snapshot.add_heap_object(instance(0x200 + id, 0x2, 8)).unwrap();
        }
        snapshot
            .add_heap_object(HeapObject::new(
                0x300,
                HeapObjectKind::PrimitiveArray {
                    element_type: FieldType::Byte,
                    data_offset: 0,
                    length: 16,
                },
            ))
            .unwrap();
        let histogram = snapshot.instance_histogram();
        assert_eq!(histogram.len(), 2);
        assert_eq!(histogram[0].class_name, "com.A");
        assert_eq!(histogram[0].instances, 10);
        assert_eq!(histogram[0].data_bytes, 40);
        assert_eq!(histogram[1].class_name, "com.B");
        assert_eq!(histogram[1].data_bytes, 24);
    }

    #[test]
    fn summary_mentions_graph_sizes() {
        let mut snapshot = snapshot();
        snapshot.add_class(class(0x1, "com.A", 0, &[]));
        snapshot.add_root(Root::new(0x1, RootKind::StickyClass));
        let summary = snapshot.render_summary();
        assert!(summary.contains("Format: JAVA PROFILE 1.0.2 (8 bytes identifiers)"));
        assert!(summary.contains("Complete: yes"));
        assert!(summary.contains("Graph: 1 classes, 0 heap objects (0.00bytes of field data), 1 roots"));
    }
}
