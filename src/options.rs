/// Knobs of a decode pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Number of heap dumps to pass over before the one to decode.
    pub dumps_to_skip: u32,
    /// When false, stack frame and stack trace records are skipped and no trace is attached.
    pub track_stack_traces: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            dumps_to_skip: 0,
            track_stack_traces: true,
        }
    }
}

impl DecodeOptions {
    pub fn with_dumps_to_skip(mut self, dumps_to_skip: u32) -> Self {
        self.dumps_to_skip = dumps_to_skip;
        self
    }

    pub fn with_stack_traces(mut self, track_stack_traces: bool) -> Self {
        self.track_stack_traces = track_stack_traces;
        self
    }
}
