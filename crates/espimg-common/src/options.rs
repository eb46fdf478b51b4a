//! Process-wide emission options, carried explicitly rather than as
//! module-level mutable state (§9 "Global flags").

/// FAT directory-entry date/time, §9 Decision 5: populated from a fixed
/// epoch rather than left zero, so repeated runs over the same input tree
/// produce byte-identical images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatTimestamp {
    pub date: u16,
    pub time: u16,
}

impl FatTimestamp {
    /// `2020-01-01T00:00:00`, encoded per the FAT date/time bit layout:
    /// date = `(year-1980)<<9 | month<<5 | day`, time = `hour<<11 | min<<5 | sec/2`.
    pub const EPOCH_2020: Self = Self {
        date: ((2020 - 1980) << 9) | (1 << 5) | 1,
        time: 0,
    };
}

impl Default for FatTimestamp {
    fn default() -> Self {
        Self::EPOCH_2020
    }
}

#[derive(Debug, Clone)]
pub struct Options {
    /// Keep directory/file names as given instead of uppercasing them.
    pub preserve_case: bool,
    /// Reuse an existing output file if it is already large enough.
    pub reformat: bool,
    /// Emit `tracing::debug!`/`trace!` events at phase boundaries.
    pub verbose: bool,
    pub label: String,
    pub timestamp: FatTimestamp,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            preserve_case: false,
            reformat: false,
            verbose: false,
            label: "NOLABEL".to_string(),
            timestamp: FatTimestamp::default(),
        }
    }
}
