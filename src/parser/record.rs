use num_enum::TryFromPrimitive;

/// Tags of the top-level records.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum RecordTag {
    Utf8String = 0x01,
    LoadClass = 0x02,
    UnloadClass = 0x03,
    StackFrame = 0x04,
    StackTrace = 0x05,
    AllocationSites = 0x06,
    HeapSummary = 0x07,
    StartThread = 0x0A,
    EndThread = 0x0B,
    HeapDump = 0x0C,
    CpuSamples = 0x0D,
    ControlSettings = 0x0E,
    LockStatsWaitTime = 0x10,
    LockStatsHoldTime = 0x11,
    // 1.0.2
    HeapDumpSegment = 0x1C,
    HeapDumpEnd = 0x2C,
}

impl RecordTag {
    /// Records that carry nothing for the object graph.
    pub fn is_informational(&self) -> bool {
        matches!(
            self,
            RecordTag::UnloadClass
                | RecordTag::AllocationSites
                | RecordTag::HeapSummary
                | RecordTag::StartThread
                | RecordTag::EndThread
                | RecordTag::CpuSamples
                | RecordTag::ControlSettings
                | RecordTag::LockStatsWaitTime
                | RecordTag::LockStatsHoldTime
        )
    }
}
