//! Write-source buffer loading
//!
//! Materializes the data for a write phase into a width-typed buffer of
//! exactly `number` elements, either from a binary file (elements stored
//! big-endian on disk) or from literal numeric tokens. Any failure aborts
//! the whole load; a partially filled buffer is never handed out.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

use crate::params::{AddressingParams, ElementWidth};

/// Errors from write-source loading
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("a binary file is not compatible with a data sequence, give only one")]
    ConflictingSources,

    #[error("write mode needs a binary file or a data sequence")]
    NoSource,

    #[error("binary file {path} is too small, the minimum size is {min} bytes")]
    SourceTooSmall { path: PathBuf, min: u64 },

    #[error("short read in {path} at element {index}")]
    TruncatedSource { path: PathBuf, index: u64 },

    #[error("invalid data value [{index}]: \"{token}\"")]
    InvalidLiteral { index: usize, token: String },

    #[error("data sequence is too short, the minimum length is {min}")]
    InsufficientLiterals { min: u64 },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Owned buffer of `number` elements, each masked to the element width
///
/// Values wider than the element are truncated on store, matching the
/// narrowing-assignment behavior writes have always had. `300` stored at
/// width 1 becomes `44`.
#[derive(Debug)]
pub struct TypedBuffer {
    width: ElementWidth,
    values: Vec<u64>,
}

impl TypedBuffer {
    /// Load the write source for `params`, from exactly one of `bin_file`
    /// and `literals`.
    pub fn load(
        bin_file: Option<&Path>,
        literals: &[String],
        params: &AddressingParams,
    ) -> Result<Self, SourceError> {
        match (bin_file, literals.is_empty()) {
            (Some(_), false) => Err(SourceError::ConflictingSources),
            (None, true) => Err(SourceError::NoSource),
            (Some(path), true) => Self::from_binary_file(path, params),
            (None, false) => Self::from_literals(literals, params),
        }
    }

    /// Read `number` big-endian elements from the front of a binary file
    fn from_binary_file(path: &Path, params: &AddressingParams) -> Result<Self, SourceError> {
        let io_err = |source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        };

        let metadata = std::fs::metadata(path).map_err(io_err)?;
        if metadata.len() < params.size_min() {
            return Err(SourceError::SourceTooSmall {
                path: path.to_path_buf(),
                min: params.size_min(),
            });
        }

        let width = params.width;
        let mut file = File::open(path).map_err(io_err)?;
        let mut chunk = [0u8; 8];
        let mut values = Vec::with_capacity(params.number as usize);

        for i in 0..params.number {
            let chunk = &mut chunk[..width.bytes() as usize];
            file.read_exact(chunk).map_err(|err| {
                if err.kind() == io::ErrorKind::UnexpectedEof {
                    SourceError::TruncatedSource {
                        path: path.to_path_buf(),
                        index: i,
                    }
                } else {
                    io_err(err)
                }
            })?;

            let value = match width {
                ElementWidth::Byte => u64::from(chunk[0]),
                ElementWidth::Half => u64::from(BigEndian::read_u16(chunk)),
                ElementWidth::Word => u64::from(BigEndian::read_u32(chunk)),
                ElementWidth::Dword => BigEndian::read_u64(chunk),
            };
            values.push(value);
        }

        Ok(TypedBuffer { width, values })
    }

    /// Parse `number` literal tokens; extras beyond `number` are ignored
    fn from_literals(literals: &[String], params: &AddressingParams) -> Result<Self, SourceError> {
        if (literals.len() as u64) < params.number {
            return Err(SourceError::InsufficientLiterals { min: params.number });
        }

        let width = params.width;
        let mask = width_mask(width);
        let mut values = Vec::with_capacity(params.number as usize);

        for (i, token) in literals.iter().take(params.number as usize).enumerate() {
            let value = parse_integer(token).ok_or_else(|| SourceError::InvalidLiteral {
                index: i,
                token: token.clone(),
            })?;
            values.push(value & mask);
        }

        Ok(TypedBuffer { width, values })
    }

    pub fn width(&self) -> ElementWidth {
        self.width
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Element `i`, already masked to the element width
    pub fn get(&self, i: usize) -> u64 {
        self.values[i]
    }
}

fn width_mask(width: ElementWidth) -> u64 {
    match width {
        ElementWidth::Dword => u64::MAX,
        w => (1u64 << (w.bytes() * 8)) - 1,
    }
}

/// Parse an unsigned integer literal with an optional `0x`/`0o`/`0b` prefix
pub fn parse_integer(token: &str) -> Option<u64> {
    let (digits, radix) = match token.get(..2) {
        Some("0x") | Some("0X") => (&token[2..], 16),
        Some("0o") | Some("0O") => (&token[2..], 8),
        Some("0b") | Some("0B") => (&token[2..], 2),
        _ => (token, 10),
    };
    u64::from_str_radix(digits, radix).ok()
}
