//! memb - typed strided access to memory-mappable files
//!
//! The engine behind the `memb` tool: resolves a small set of addressing
//! parameters (offset, width, step, index, number, size) into a validated
//! minimum-sized memory mapping, performs strided typed reads and writes
//! against it, and renders elements as a hex dump. The typical target is
//! /dev/mem, but any mappable file works.

pub mod dump;
pub mod params;
pub mod region;
pub mod source;

pub use dump::{dump, DumpOptions, PRINT_COUNT_ONE_LINE_MAX};
pub use params::{AccessMode, AddressingParams, ElementWidth, ParamError};
pub use region::{MappedRegion, RegionError};
pub use source::{parse_integer, SourceError, TypedBuffer};
