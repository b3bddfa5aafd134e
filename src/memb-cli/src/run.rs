//! Operation orchestration
//!
//! Drives one run of the tool: resolve addressing parameters, load the
//! write source if the mode needs one, establish the mapping, then run
//! the pre-read, write and post-read phases the mode selects.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use thiserror::Error;

use memb::{
    dump, AccessMode, AddressingParams, DumpOptions, ElementWidth, MappedRegion, TypedBuffer,
    PRINT_COUNT_ONE_LINE_MAX,
};

use crate::cli::Cli;

/// Option combinations the parser alone cannot reject
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("mode 0 (read-only) is not compatible with --bin-file or a data sequence")]
    SourceWithReadOnly,

    #[error("invalid --print-count-one-line {0}, the maximum is {PRINT_COUNT_ONE_LINE_MAX}")]
    PrintCountTooLarge(u64),

    #[error("binary file {} is not readable", .0.display())]
    BinFileNotReadable(PathBuf),
}

pub fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<()> {
    let width = ElementWidth::try_from(cli.width)?;
    let mode = AccessMode::try_from(cli.mode)?;

    if let Some(count) = cli.print_count_one_line {
        if count as usize > PRINT_COUNT_ONE_LINE_MAX {
            return Err(UsageError::PrintCountTooLarge(count).into());
        }
    }

    // The binary source must be readable up front, before any sizing or
    // mapping work starts
    if let Some(path) = &cli.bin_file {
        if File::open(path).is_err() {
            return Err(UsageError::BinFileNotReadable(path.clone()).into());
        }
    }

    let params = AddressingParams::resolve(
        cli.offset,
        width,
        cli.step,
        cli.index,
        cli.number,
        cli.size,
    )?;
    tracing::debug!(
        size = params.size,
        size_min = params.size_min(),
        number = params.number,
        "resolved addressing parameters"
    );

    if !mode.writes() && (cli.bin_file.is_some() || !cli.data.is_empty()) {
        return Err(UsageError::SourceWithReadOnly.into());
    }

    // Load the write source before touching the target; a bad source must
    // never leave a mapping established.
    let buffer = if mode.writes() {
        Some(TypedBuffer::load(cli.bin_file.as_deref(), &cli.data, &params)?)
    } else {
        None
    };

    let mut region = MappedRegion::open(&cli.file, mode, &params)?;

    let options = DumpOptions {
        per_line: cli.print_count_one_line.map(|n| n as usize),
        print_char: cli.print_char,
    };

    if mode.reads_before() {
        dump(out, region.bytes(), &params, &options)?;
    }

    if let Some(buffer) = &buffer {
        for i in 0..params.number {
            region.set(i, buffer.get(i as usize));
        }
    }

    if mode.reads_after() {
        if mode == AccessMode::ReadWriteRead {
            writeln!(out, "---")?;
        }
        dump(out, region.bytes(), &params, &options)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::NamedTempFile;

    fn run_captured(args: &[&str]) -> Result<String> {
        let cli = Cli::parse_from(args);
        let mut out = Vec::new();
        run(&cli, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn backing_file(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_read_only_dump() {
        let file = backing_file(b"ABCDEFGH");
        let path = file.path().to_str().unwrap();

        let out = run_captured(&["memb", "-f", path, "-n", "8", "-c", "-P", "8"]).unwrap();
        assert_eq!(out, "0: 41 42 43 44 45 46 47 48 | ABCDEFGH\n");
    }

    #[test]
    fn test_write_only_applies_literals() {
        let file = backing_file(&[0u8; 4]);
        let path = file.path().to_str().unwrap();

        let out = run_captured(&["memb", "-f", path, "-m", "1", "-n", "2", "0x12", "0x34"]).unwrap();
        assert!(out.is_empty(), "write-only prints nothing: {out:?}");

        let written = std::fs::read(file.path()).unwrap();
        assert_eq!(&written[..2], &[0x12, 0x34]);
    }

    #[test]
    fn test_read_write_read_emits_separator() {
        let file = backing_file(&[0u8; 2]);
        let path = file.path().to_str().unwrap();

        let out = run_captured(&["memb", "-f", path, "-m", "4", "-n", "2", "1", "2"]).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, vec!["0: 00 00", "---", "0: 01 02"]);
    }

    #[test]
    fn test_write_read_has_no_separator() {
        let file = backing_file(&[0u8; 2]);
        let path = file.path().to_str().unwrap();

        let out = run_captured(&["memb", "-f", path, "-m", "3", "-n", "2", "5", "6"]).unwrap();
        assert_eq!(out, "0: 05 06\n");
    }

    #[test]
    fn test_read_only_rejects_data_sequence() {
        let file = backing_file(&[0u8; 2]);
        let path = file.path().to_str().unwrap();

        let err = run_captured(&["memb", "-f", path, "-n", "1", "7"]).unwrap_err();
        assert!(err.downcast_ref::<UsageError>().is_some());
    }

    #[test]
    fn test_print_count_cap() {
        let file = backing_file(&[0u8; 2]);
        let path = file.path().to_str().unwrap();

        let err = run_captured(&["memb", "-f", path, "-n", "1", "-P", "33"]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<UsageError>(),
            Some(UsageError::PrintCountTooLarge(33))
        ));
    }

    #[test]
    fn test_unreadable_bin_file_is_a_usage_error() {
        let file = backing_file(&[0u8; 2]);
        let path = file.path().to_str().unwrap();

        let err = run_captured(&[
            "memb",
            "-f",
            path,
            "-m",
            "1",
            "-n",
            "1",
            "-b",
            "/nonexistent/memb-source.bin",
        ])
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<UsageError>(),
            Some(UsageError::BinFileNotReadable(_))
        ));
    }

    #[test]
    fn test_missing_size_and_number() {
        let file = backing_file(&[0u8; 2]);
        let path = file.path().to_str().unwrap();

        let err = run_captured(&["memb", "-f", path]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<memb::ParamError>(),
            Some(memb::ParamError::MissingSizeOrNumber)
        ));
    }

    #[test]
    fn test_strided_write_read_back() {
        let file = backing_file(&[0xee; 8]);
        let path = file.path().to_str().unwrap();

        let out = run_captured(&[
            "memb", "-f", path, "-m", "3", "-n", "2", "-t", "2", "-i", "1", "0xaa", "0xbb",
        ])
        .unwrap();
        assert_eq!(out, "1: aa bb\n");

        let written = std::fs::read(file.path()).unwrap();
        assert_eq!(&written[..4], &[0xee, 0xaa, 0xee, 0xbb]);
    }
}
