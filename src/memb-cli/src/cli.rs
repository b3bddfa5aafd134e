//! CLI argument definitions for memb

use clap::Parser;
use std::path::PathBuf;

/// Read or write data elements of a file. Such as /dev/mem for access to
/// physical memory.
#[derive(Parser)]
#[command(name = "memb")]
#[command(about = "Read or write data elements of a file, such as /dev/mem", long_about = None)]
pub struct Cli {
    /// File to be accessed
    #[arg(short, long, default_value = "/dev/mem")]
    pub file: PathBuf,

    /// Byte offset into the file where the mapping begins
    #[arg(short, long, default_value = "0", value_parser = parse_u64_arg)]
    pub offset: u64,

    /// Width of one data element in bytes: 1, 2, 4 or 8
    #[arg(short, long, default_value = "1", value_parser = parse_u64_arg)]
    pub width: u64,

    /// Stride between successive elements, counted in elements
    #[arg(short = 't', long, default_value = "1", value_parser = parse_u64_arg)]
    pub step: u64,

    /// Size of the address space in bytes (default number * width * step)
    #[arg(short, long, value_parser = parse_nonzero_u64_arg)]
    pub size: Option<u64>,

    /// Number of data elements to access
    #[arg(short, long, value_parser = parse_nonzero_u64_arg)]
    pub number: Option<u64>,

    /// Print byte characters next to the hex cells
    #[arg(short = 'c', long = "char")]
    pub print_char: bool,

    /// Element index inside each stride group (step > 1)
    #[arg(short, long, default_value = "0", value_parser = parse_u64_arg)]
    pub index: u64,

    /// Access mode: 0 read, 1 write, 2 read-write, 3 write-read,
    /// 4 read-write-read
    #[arg(short, long, default_value = "0", value_parser = parse_u64_arg)]
    pub mode: u64,

    /// Data elements printed in one line (default auto, max 32)
    #[arg(short = 'P', long = "print-count-one-line", value_parser = parse_u64_arg)]
    pub print_count_one_line: Option<u64>,

    /// Binary file used as the data source in write modes
    #[arg(short, long)]
    pub bin_file: Option<PathBuf>,

    /// Log level (error, warn, info, debug or trace)
    #[arg(short = 'd', long, default_value = "warn")]
    pub log_level: String,

    /// Verbose output, same as --log-level debug
    #[arg(short, long)]
    pub verbose: bool,

    /// Data elements to write when no --bin-file is given.
    /// Numeric values here and in the options take 0x, 0o and 0b
    /// prefixes; a bare leading zero is still decimal, not octal
    #[arg(trailing_var_arg = true)]
    pub data: Vec<String>,
}

/// Accept 0x/0o/0b prefixed literals everywhere a number is expected
fn parse_u64_arg(raw: &str) -> Result<u64, String> {
    memb::parse_integer(raw).ok_or_else(|| format!("invalid numeric value \"{raw}\""))
}

fn parse_nonzero_u64_arg(raw: &str) -> Result<u64, String> {
    match parse_u64_arg(raw)? {
        0 => Err("value must be at least 1".to_string()),
        n => Ok(n),
    }
}
