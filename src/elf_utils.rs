//! ELF `.text` section loading for file-mode execution.
//!
//! Grounded on the teacher's `elf_utils::read_text_instructions`, adapted
//! from its panicking `.expect()` chain to an explicit `thiserror` error
//! type — this module is part of the core crate, not a CLI-only script, so
//! it follows the same no-panic discipline as the rest of the core.

use std::path::Path;

use elf::endian::AnyEndian;
use elf::ElfBytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ElfLoadError {
    #[error("could not read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{0}' is not a valid ELF file")]
    Parse(String),
    #[error("'{0}' has no .text section")]
    MissingTextSection(String),
    #[error("'{0}' has a compressed .text section, which is not supported")]
    CompressedTextSection(String),
}

/// Read the little-endian 32-bit words of an ELF file's `.text` section.
pub fn read_text_instructions(path: impl AsRef<Path>) -> Result<Vec<u32>, ElfLoadError> {
    let path = path.as_ref();
    let display = path.display().to_string();

    let file_data = std::fs::read(path).map_err(|source| ElfLoadError::Io {
        path: display.clone(),
        source,
    })?;

    let file = ElfBytes::<AnyEndian>::minimal_parse(&file_data)
        .map_err(|_| ElfLoadError::Parse(display.clone()))?;

    let text_shdr = file
        .section_header_by_name(".text")
        .map_err(|_| ElfLoadError::Parse(display.clone()))?
        .ok_or_else(|| ElfLoadError::MissingTextSection(display.clone()))?;

    let (data, compression) = file
        .section_data(&text_shdr)
        .map_err(|_| ElfLoadError::Parse(display.clone()))?;
    if compression.is_some() {
        return Err(ElfLoadError::CompressedTextSection(display));
    }

    Ok(data
        .chunks_exact(4)
        .map(|word| u32::from_le_bytes(word.try_into().expect("chunks_exact(4) yields len 4")))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_text_instructions("/nonexistent/path/to/nothing.elf").unwrap_err();
        assert!(matches!(err, ElfLoadError::Io { .. }));
    }
}
