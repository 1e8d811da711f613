use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use crate::errors::HprofGraphError;
use crate::errors::HprofGraphError::*;
use crate::options::DecodeOptions;
use crate::parser::field_codec::FieldValue;
use crate::parser::instance_parser::{
    read_instance_fields, read_object_array_elements, read_primitive_array_values,
    InstanceFieldValue,
};
use crate::parser::record_parser::{decode, DecodeOutcome};
use crate::snapshot::Snapshot;
use crate::utils::pretty_bytes_size;

/// A decoded dump together with the bytes it was decoded from.
///
/// Heap objects only point into the dump, field values and array elements are decoded from
/// the retained bytes when asked for.
#[derive(Debug)]
pub struct LoadedDump {
    data: Vec<u8>,
    outcome: DecodeOutcome,
}

impl LoadedDump {
    pub fn snapshot(&self) -> &Snapshot {
        self.outcome.snapshot()
    }

    pub fn outcome(&self) -> &DecodeOutcome {
        &self.outcome
    }

    pub fn is_incomplete(&self) -> bool {
        self.outcome.is_incomplete()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn instance_fields(&self, id: u64) -> Result<Vec<InstanceFieldValue>, HprofGraphError> {
        read_instance_fields(self.snapshot(), &self.data, id)
    }

    pub fn object_array_elements(&self, id: u64) -> Result<Vec<u64>, HprofGraphError> {
        read_object_array_elements(self.snapshot(), &self.data, id)
    }

    pub fn primitive_array_values(&self, id: u64) -> Result<Vec<FieldValue>, HprofGraphError> {
        read_primitive_array_values(self.snapshot(), &self.data, id)
    }
}

pub fn slurp_file(file_path: &str, options: &DecodeOptions) -> Result<LoadedDump, HprofGraphError> {
    if !Path::new(file_path).is_file() {
        return Err(InputFileNotFound {
            name: file_path.to_string(),
        });
    }
    let data = std::fs::read(file_path)?;
    info!(
        "Processing {} binary hprof file '{}'",
        pretty_bytes_size(data.len() as u64),
        file_path
    );

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("[{elapsed_precise}] {spinner} {msg}")
            .map_err(|e| InvalidHprofFile {
                message: format!("progress template: {}", e),
            })?,
    );
    pb.set_message(format!("decoding {}", file_path));
    pb.enable_steady_tick(Duration::from_millis(120));
    let result = slurp_bytes(data, options);
    pb.finish_and_clear();
    result
}

/// Decodes an in-memory dump, the bytes are kept for deferred decoding.
pub fn slurp_bytes(data: Vec<u8>, options: &DecodeOptions) -> Result<LoadedDump, HprofGraphError> {
    let outcome = decode(&data, options)?;
    Ok(LoadedDump { data, outcome })
}
