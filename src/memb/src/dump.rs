//! Hex dump rendering
//!
//! Renders the addressed elements as rows of zero-padded hex cells behind
//! a zero-padded address column, with an optional ASCII gutter. Rows are
//! built in a growable string and emitted one terminated line at a time.

use std::io;

use byteorder::{ByteOrder, NativeEndian};

use crate::params::{AddressingParams, ElementWidth};

/// Hard cap on elements per printed row
pub const PRINT_COUNT_ONE_LINE_MAX: usize = 32;
const PRINT_COUNT_ONE_LINE_DEFAULT: usize = 16;

/// Dump rendering options
#[derive(Debug, Clone, Copy, Default)]
pub struct DumpOptions {
    /// Elements per row; `None` picks a width-dependent default
    pub per_line: Option<usize>,
    /// Append the ASCII gutter after the hex cells
    pub print_char: bool,
}

/// Elements per row: default 16, halved for widths above 2 and again
/// above 4 so rows stay visually bounded; an explicit choice is honored
/// verbatim up to the hard cap.
fn row_width(width: ElementWidth, per_line: Option<usize>) -> usize {
    match per_line {
        Some(n) if n > 0 => n.min(PRINT_COUNT_ONE_LINE_MAX),
        _ => {
            let mut n = PRINT_COUNT_ONE_LINE_DEFAULT;
            if width.bytes() > 2 {
                n /= 2;
            }
            if width.bytes() > 4 {
                n /= 2;
            }
            n
        }
    }
}

/// Nibble count of the highest addressable byte offset, minimum one
fn address_width(max_offset: u64) -> usize {
    let bits = (64 - max_offset.leading_zeros()) as usize;
    bits.div_ceil(4).max(1)
}

fn element(bytes: &[u8], width: ElementWidth, at: usize) -> u64 {
    match width {
        ElementWidth::Byte => u64::from(bytes[at]),
        ElementWidth::Half => u64::from(NativeEndian::read_u16(&bytes[at..at + 2])),
        ElementWidth::Word => u64::from(NativeEndian::read_u32(&bytes[at..at + 4])),
        ElementWidth::Dword => NativeEndian::read_u64(&bytes[at..at + 8]),
    }
}

/// Render the elements addressed by `params` out of the mapped bytes.
pub fn dump<W: io::Write>(
    out: &mut W,
    bytes: &[u8],
    params: &AddressingParams,
    options: &DumpOptions,
) -> io::Result<()> {
    let width = params.width;
    let per_line = row_width(width, options.per_line) as u64;
    let addr_width = address_width(params.size_min() - 1);
    let digits = width.hex_digits();

    tracing::debug!(addr_width, per_line, "dump layout");

    let mut line = String::new();
    let mut row_start = 0;
    while row_start < params.number {
        let row_end = (row_start + per_line).min(params.number);
        line.clear();
        line.push_str(&format!(
            "{:0w$x}:",
            params.byte_offset(row_start),
            w = addr_width
        ));

        for i in row_start..row_end {
            let value = element(bytes, width, params.byte_offset(i) as usize);
            line.push_str(&format!(" {value:0digits$x}"));
        }

        if options.print_char {
            // Blank cells keep the gutter column fixed on a short last row
            for _ in row_end..row_start + per_line {
                line.push_str(&format!(" {:d$}", "", d = digits));
            }
            line.push_str(" | ");
            for i in row_start..row_end {
                let at = params.byte_offset(i) as usize;
                for &byte in &bytes[at..at + width.bytes() as usize] {
                    line.push(if byte.is_ascii_graphic() || byte == b' ' {
                        byte as char
                    } else {
                        '.'
                    });
                }
            }
        }

        writeln!(out, "{line}")?;
        row_start = row_end;
    }

    Ok(())
}
