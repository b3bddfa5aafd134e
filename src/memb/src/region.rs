//! Mapped region access
//!
//! Opens the backing resource, establishes a mapping of exactly the
//! minimum extent the addressing parameters can reach, and exposes
//! width-correct indexed loads and stores over it. The descriptor is
//! dropped as soon as the mapping exists; the mapping itself unmaps on
//! drop, on every exit path.

use std::ffi::CString;
use std::fs::OpenOptions;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, NativeEndian};
use memmap2::{Mmap, MmapMut, MmapOptions};
use thiserror::Error;

use crate::params::{AccessMode, AddressingParams, ElementWidth};

/// Errors from opening or mapping the backing resource
#[derive(Debug, Error)]
pub enum RegionError {
    #[error("file {path} is not {required}")]
    NotAccessible { path: PathBuf, required: &'static str },

    #[error("open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("mmap {path} offset {offset:#x}, size {size:#x}: {source}")]
    Map {
        path: PathBuf,
        offset: u64,
        size: u64,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug)]
enum Mapping {
    ReadOnly(Mmap),
    ReadWrite(MmapMut),
}

/// Live mapping of `size_min` bytes of the backing resource at `offset`
#[derive(Debug)]
pub struct MappedRegion {
    mapping: Mapping,
    params: AddressingParams,
}

impl MappedRegion {
    /// Check the access(2) precondition and establish the mapping.
    ///
    /// The descriptor is opened read-write regardless of mode; only the
    /// mapping protection is restricted for read-only access.
    pub fn open(
        path: &Path,
        mode: AccessMode,
        params: &AddressingParams,
    ) -> Result<Self, RegionError> {
        check_access(path, mode)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| RegionError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let map_err = |source| RegionError::Map {
            path: path.to_path_buf(),
            offset: params.offset,
            size: params.size_min(),
            source,
        };

        let mut options = MmapOptions::new();
        options
            .offset(params.offset)
            .len(params.size_min() as usize);

        // Safety: the mapping is file-backed and private to this run; the
        // caller owns the consequences of racing writers on shared targets
        // like /dev/mem.
        let mapping = if mode == AccessMode::ReadOnly {
            Mapping::ReadOnly(unsafe { options.map(&file) }.map_err(map_err)?)
        } else {
            Mapping::ReadWrite(unsafe { options.map_mut(&file) }.map_err(map_err)?)
        };
        drop(file);

        tracing::debug!(
            offset = params.offset,
            size = params.size_min(),
            "mapped {}",
            path.display()
        );

        Ok(MappedRegion {
            mapping,
            params: *params,
        })
    }

    /// Mapped length in bytes
    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    /// Raw view of the mapped bytes
    pub fn bytes(&self) -> &[u8] {
        match &self.mapping {
            Mapping::ReadOnly(map) => map,
            Mapping::ReadWrite(map) => map,
        }
    }

    /// Load element `i` as a single width-correct native-endian read
    pub fn get(&self, i: u64) -> u64 {
        let at = self.params.byte_offset(i) as usize;
        let bytes = self.bytes();
        match self.params.width {
            ElementWidth::Byte => u64::from(bytes[at]),
            ElementWidth::Half => u64::from(NativeEndian::read_u16(&bytes[at..at + 2])),
            ElementWidth::Word => u64::from(NativeEndian::read_u32(&bytes[at..at + 4])),
            ElementWidth::Dword => NativeEndian::read_u64(&bytes[at..at + 8]),
        }
    }

    /// Store element `i` as a single width-correct native-endian write
    pub fn set(&mut self, i: u64, value: u64) {
        let at = self.params.byte_offset(i) as usize;
        let bytes = match &mut self.mapping {
            Mapping::ReadWrite(map) => &mut map[..],
            // The write phase never runs in read-only mode
            Mapping::ReadOnly(_) => unreachable!("write to read-only mapping"),
        };
        match self.params.width {
            ElementWidth::Byte => bytes[at] = value as u8,
            ElementWidth::Half => NativeEndian::write_u16(&mut bytes[at..at + 2], value as u16),
            ElementWidth::Word => NativeEndian::write_u32(&mut bytes[at..at + 4], value as u32),
            ElementWidth::Dword => NativeEndian::write_u64(&mut bytes[at..at + 8], value),
        }
    }
}

/// access(2) precondition for the permissions the mode implies
fn check_access(path: &Path, mode: AccessMode) -> Result<(), RegionError> {
    let mut flags = 0;
    if mode.needs_read() {
        flags |= libc::R_OK;
    }
    if mode.needs_write() {
        flags |= libc::W_OK;
    }

    let required = match (mode.needs_read(), mode.needs_write()) {
        (true, true) => "readable and writable",
        (false, true) => "writable",
        _ => "readable",
    };

    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
        RegionError::NotAccessible {
            path: path.to_path_buf(),
            required,
        }
    })?;
    // Safety: c_path is a valid NUL-terminated path for the call duration.
    if unsafe { libc::access(c_path.as_ptr(), flags) } != 0 {
        return Err(RegionError::NotAccessible {
            path: path.to_path_buf(),
            required,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::TypedBuffer;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn params(width: u64, step: u64, index: u64, number: u64) -> AddressingParams {
        AddressingParams::resolve(
            0,
            ElementWidth::try_from(width).unwrap(),
            step,
            index,
            Some(number),
            None,
        )
        .unwrap()
    }

    fn backing_file(len: usize, fill: u8) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&vec![fill; len]).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_round_trip_each_width() {
        for width in [1u64, 2, 4, 8] {
            let params = params(width, 1, 0, 4);
            let file = backing_file(params.size as usize, 0);

            let tokens: Vec<String> = ["0x11", "0x22", "0x33", "0x44"]
                .iter()
                .map(|s| s.to_string())
                .collect();
            let buf = TypedBuffer::load(None, &tokens, &params).unwrap();

            let mut region =
                MappedRegion::open(file.path(), AccessMode::WriteRead, &params).unwrap();
            for i in 0..params.number {
                region.set(i, buf.get(i as usize));
            }
            for i in 0..params.number {
                assert_eq!(
                    region.get(i),
                    buf.get(i as usize),
                    "width {width} element {i}"
                );
            }
        }
    }

    #[test]
    fn test_mapping_spans_exactly_size_min() {
        let params = params(4, 3, 1, 5);
        let file = backing_file(params.size as usize + 32, 0);

        let region = MappedRegion::open(file.path(), AccessMode::ReadOnly, &params).unwrap();
        assert_eq!(region.len() as u64, params.size_min());
    }

    #[test]
    fn test_strided_write_leaves_gaps_untouched() {
        let params = params(1, 2, 1, 3);
        let file = backing_file(params.size as usize, 0xee);

        {
            let mut region =
                MappedRegion::open(file.path(), AccessMode::WriteOnly, &params).unwrap();
            for i in 0..3 {
                region.set(i, i + 1);
            }
        }

        let written = std::fs::read(file.path()).unwrap();
        assert_eq!(&written[..6], &[0xee, 0x01, 0xee, 0x02, 0xee, 0x03]);
    }

    #[test]
    fn test_strided_read_picks_lattice_elements() {
        let params = params(2, 2, 1, 2);
        let mut file = NamedTempFile::new().unwrap();
        let mut bytes = vec![0u8; params.size as usize];
        bytes[2..4].copy_from_slice(&0xbeefu16.to_ne_bytes());
        bytes[6..8].copy_from_slice(&0xcafeu16.to_ne_bytes());
        file.write_all(&bytes).unwrap();
        file.flush().unwrap();

        let region = MappedRegion::open(file.path(), AccessMode::ReadOnly, &params).unwrap();
        assert_eq!(region.get(0), 0xbeef);
        assert_eq!(region.get(1), 0xcafe);
    }

    #[test]
    fn test_missing_file_fails_precondition() {
        let params = params(1, 1, 0, 1);
        let err = MappedRegion::open(Path::new("/nonexistent/memb-test"), AccessMode::ReadOnly, &params)
            .unwrap_err();
        assert!(matches!(err, RegionError::NotAccessible { .. }));
    }
}
