//! Addressing parameter validation
//!
//! Resolves the raw offset/width/step/index/number/size inputs into a
//! consistent `AddressingParams` before any I/O happens. All sizing
//! arithmetic lives here so the mapping and dump layers can assume every
//! addressed byte fits inside the mapped extent.

use thiserror::Error;

/// Errors from addressing parameter resolution
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("invalid width {0}, must be 1, 2, 4 or 8")]
    InvalidWidth(u64),

    #[error("invalid step {0}, must be at least 1")]
    InvalidStep(u64),

    #[error("index ({index}) is larger or equal step ({step})")]
    IndexOutOfStep { index: u64, step: u64 },

    #[error("invalid number {0}, must be at least 1")]
    InvalidNumber(u64),

    #[error("invalid size {size}, the minimum value is {size_min}")]
    SizeTooSmall { size: u64, size_min: u64 },

    #[error("invalid mode {0}, must be 0 - 4")]
    InvalidMode(u64),

    #[error("at least one of size and number must be given")]
    MissingSizeOrNumber,

    #[error("addressing parameters overflow a 64-bit byte count")]
    SizeOverflow,
}

/// Byte width of one logical data element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementWidth {
    Byte = 1,
    Half = 2,
    Word = 4,
    Dword = 8,
}

impl ElementWidth {
    /// Width in bytes
    pub fn bytes(self) -> u64 {
        self as u64
    }

    /// Number of hex digits needed to print one element (two per byte)
    pub fn hex_digits(self) -> usize {
        self as usize * 2
    }
}

impl TryFrom<u64> for ElementWidth {
    type Error = ParamError;

    fn try_from(raw: u64) -> Result<Self, ParamError> {
        match raw {
            1 => Ok(ElementWidth::Byte),
            2 => Ok(ElementWidth::Half),
            4 => Ok(ElementWidth::Word),
            8 => Ok(ElementWidth::Dword),
            other => Err(ParamError::InvalidWidth(other)),
        }
    }
}

/// Which of the pre-read, write and post-read phases run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly = 0,
    WriteOnly = 1,
    ReadWrite = 2,
    WriteRead = 3,
    ReadWriteRead = 4,
}

impl AccessMode {
    /// Whether a dump of the region runs before any write
    pub fn reads_before(self) -> bool {
        matches!(
            self,
            AccessMode::ReadOnly | AccessMode::ReadWrite | AccessMode::ReadWriteRead
        )
    }

    /// Whether the write phase runs
    pub fn writes(self) -> bool {
        !matches!(self, AccessMode::ReadOnly)
    }

    /// Whether a dump of the region runs after the write
    pub fn reads_after(self) -> bool {
        matches!(self, AccessMode::WriteRead | AccessMode::ReadWriteRead)
    }

    /// Whether the backing resource must be readable
    pub fn needs_read(self) -> bool {
        self.reads_before() || self.reads_after()
    }

    /// Whether the backing resource must be writable
    pub fn needs_write(self) -> bool {
        self.writes()
    }
}

impl TryFrom<u64> for AccessMode {
    type Error = ParamError;

    fn try_from(raw: u64) -> Result<Self, ParamError> {
        match raw {
            0 => Ok(AccessMode::ReadOnly),
            1 => Ok(AccessMode::WriteOnly),
            2 => Ok(AccessMode::ReadWrite),
            3 => Ok(AccessMode::WriteRead),
            4 => Ok(AccessMode::ReadWriteRead),
            other => Err(ParamError::InvalidMode(other)),
        }
    }
}

/// Fully resolved addressing parameters
///
/// Element `i` (0-based, `i < number`) lives at byte offset
/// `(i * step + index) * width` inside the mapping. `size_min` is the
/// smallest extent containing every byte those offsets can reach, and the
/// mapping is established with exactly that length.
#[derive(Debug, Clone, Copy)]
pub struct AddressingParams {
    pub offset: u64,
    pub width: ElementWidth,
    pub step: u64,
    pub index: u64,
    pub number: u64,
    /// Caller-facing size after defaulting and width alignment
    pub size: u64,
    size_min: u64,
}

impl AddressingParams {
    /// Resolve and validate raw addressing inputs.
    ///
    /// `number` defaults to 1 when absent; `size` defaults to
    /// `number * width * step`. A supplied `size` that is not a multiple
    /// of `width` is aligned downward, never rejected. At least one of
    /// `size` and `number` must be supplied.
    pub fn resolve(
        offset: u64,
        width: ElementWidth,
        step: u64,
        index: u64,
        number: Option<u64>,
        size: Option<u64>,
    ) -> Result<Self, ParamError> {
        if number.is_none() && size.is_none() {
            return Err(ParamError::MissingSizeOrNumber);
        }
        if step == 0 {
            return Err(ParamError::InvalidStep(step));
        }
        if index >= step {
            return Err(ParamError::IndexOutOfStep { index, step });
        }

        let number = number.unwrap_or(1);
        if number == 0 {
            return Err(ParamError::InvalidNumber(number));
        }

        let group = width
            .bytes()
            .checked_mul(step)
            .ok_or(ParamError::SizeOverflow)?;
        let size_min = (number - 1)
            .checked_mul(group)
            .and_then(|n| n.checked_add(width.bytes() * (index + 1)))
            .ok_or(ParamError::SizeOverflow)?;

        let size = match size {
            Some(raw) => raw - raw % width.bytes(),
            None => number.checked_mul(group).ok_or(ParamError::SizeOverflow)?,
        };
        if size < size_min {
            return Err(ParamError::SizeTooSmall { size, size_min });
        }

        Ok(AddressingParams {
            offset,
            width,
            step,
            index,
            number,
            size,
            size_min,
        })
    }

    /// Smallest mapping length containing every addressed byte
    pub fn size_min(&self) -> u64 {
        self.size_min
    }

    /// Byte offset of element `i` inside the mapping
    pub fn byte_offset(&self, i: u64) -> u64 {
        (i * self.step + self.index) * self.width.bytes()
    }
}
