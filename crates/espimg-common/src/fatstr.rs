//! Space-padded fixed-width ASCII strings used for FAT short names and BPB
//! labels, plus the 8.3 short-name composer.

#[repr(transparent)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FatStr<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> FatStr<N> {
    pub const SPACE: u8 = b' ';

    pub const fn blank() -> Self {
        Self { bytes: [Self::SPACE; N] }
    }

    /// Copies `value` into a space-padded `N`-byte field, uppercasing ASCII
    /// letters. Truncates silently only when called directly; short-name
    /// stems/extensions should go through [`compose_short_name`] instead,
    /// which rejects what it can't represent.
    pub fn from_str_padded(value: &str, uppercase: bool) -> Self {
        let mut bytes = [Self::SPACE; N];
        for (slot, byte) in bytes.iter_mut().zip(value.bytes()) {
            *slot = if uppercase { byte.to_ascii_uppercase() } else { byte };
        }
        Self { bytes }
    }

    pub const fn as_bytes(&self) -> &[u8; N] {
        &self.bytes
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.bytes).unwrap_or("")
    }
}

impl<const N: usize> Default for FatStr<N> {
    fn default() -> Self {
        Self::blank()
    }
}

impl<const N: usize> core::fmt::Debug for FatStr<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("FatStr").field(&self.as_str()).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ShortNameError {
    #[error("name has more than one '.': {0:?}")]
    MultipleDots(&'static str),
    #[error("extension longer than 3 characters")]
    ExtensionTooLong,
    #[error("stem longer than 8 characters")]
    StemTooLong,
}

/// A composed FAT 8.3 short name: an 8-byte stem and a 3-byte extension,
/// both space-padded and uppercased (unless `preserve_case` is set).
#[derive(Debug, Clone, Copy)]
pub struct ShortName {
    pub stem: FatStr<8>,
    pub extension: FatStr<3>,
}

impl ShortName {
    /// Writes `stem`+`extension` as the 11-byte `short_name` field of a
    /// directory entry (§6.6).
    pub fn to_field_bytes(&self) -> [u8; 11] {
        let mut out = [0u8; 11];
        out[..8].copy_from_slice(self.stem.as_bytes());
        out[8..].copy_from_slice(self.extension.as_bytes());
        out
    }
}

/// Converts a filesystem-tree name into a FAT short name, per §3/§4.6.1 and
/// §9 Decision 4: names with more than one dot, or an extension over three
/// characters, are rejected instead of silently truncated.
pub fn compose_short_name(name: &str, preserve_case: bool) -> Result<ShortName, ShortNameError> {
    let mut parts = name.split('.');
    let stem = parts.next().unwrap_or("");
    let extension = parts.next();
    if parts.next().is_some() {
        return Err(ShortNameError::MultipleDots("<name>"));
    }
    if stem.len() > 8 {
        return Err(ShortNameError::StemTooLong);
    }
    if let Some(ext) = extension {
        if ext.len() > 3 {
            return Err(ShortNameError::ExtensionTooLong);
        }
    }

    Ok(ShortName {
        stem: FatStr::from_str_padded(stem, !preserve_case),
        extension: FatStr::from_str_padded(extension.unwrap_or(""), !preserve_case),
    })
}
