use num_enum::TryFromPrimitive;

/// Tags of the sub-records found inside heap dumps and heap dump segments.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum GcTag {
    RootUnknown = 0xFF,
    RootJniGlobal = 0x01,
    RootJniLocal = 0x02,
    RootJavaFrame = 0x03,
    RootNativeStack = 0x04,
    RootStickyClass = 0x05,
    RootThreadBlock = 0x06,
    RootMonitorUsed = 0x07,
    RootThreadObject = 0x08,
    ClassDump = 0x20,
    InstanceDump = 0x21,
    ObjectArrayDump = 0x22,
    PrimitiveArrayDump = 0x23,
}

impl GcTag {
    pub fn is_root(&self) -> bool {
        !matches!(
            self,
            GcTag::ClassDump | GcTag::InstanceDump | GcTag::ObjectArrayDump | GcTag::PrimitiveArrayDump
        )
    }
}
