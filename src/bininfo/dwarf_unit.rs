//! Minimal per-compile-unit DWARF index: just enough to answer
//! function-name-at-address and source-location-at-address queries,
//! via an entry walk plus line-row flattening, stripped down to the
//! handful of tags this filter actually needs — no variables, no
//! types, no lexical blocks.

use fallible_iterator::FallibleIterator;
use gimli::{AttributeValue, DW_AT_call_file, DW_AT_call_line, DW_AT_high_pc, DW_AT_low_pc};
use std::path::PathBuf;

use super::EndianArcSlice;
use crate::error::Result;

#[derive(Debug, Clone, Copy)]
pub(super) struct LineRow {
    pub address: u64,
    pub file_index: u64,
    pub line: u64,
}

/// A `DW_TAG_subprogram` covering `[low, high)`.
#[derive(Debug, Clone)]
pub(super) struct FunctionRange {
    pub low: u64,
    pub high: u64,
    pub name: Option<String>,
}

/// A `DW_TAG_inlined_subroutine` covering `[low, high)`, carrying the
/// call site it was inlined from ("returning the call site
/// for an inlined function").
#[derive(Debug, Clone)]
pub(super) struct InlineRange {
    pub low: u64,
    pub high: u64,
    pub call_file: Option<u64>,
    pub call_line: Option<u64>,
}

pub(super) struct ParsedUnit {
    pub files: Vec<PathBuf>,
    pub lines: Vec<LineRow>,
    pub functions: Vec<FunctionRange>,
    pub inlines: Vec<InlineRange>,
}

impl ParsedUnit {
    pub fn find_function(&self, addr: u64) -> Option<&FunctionRange> {
        self.functions
            .iter()
            .find(|f| f.low <= addr && addr < f.high)
    }

    /// Innermost inlined range containing `addr`, if any (there may be
    /// several nested; the last one found walking entries in
    /// depth-first order is the innermost, matching how `gimli`
    /// emits DIEs).
    pub fn find_inline(&self, addr: u64) -> Option<&InlineRange> {
        self.inlines
            .iter()
            .rev()
            .find(|r| r.low <= addr && addr < r.high)
    }

    pub fn find_exact_line(&self, addr: u64) -> Option<(&PathBuf, u64)> {
        let row = self.lines.iter().find(|l| l.address == addr)?;
        let file = self.files.get(row.file_index as usize)?;
        Some((file, row.line))
    }

    pub fn file(&self, idx: u64) -> Option<&PathBuf> {
        self.files.get(idx as usize)
    }
}

fn range_from_attrs(
    low_pc: Option<AttributeValue<EndianArcSlice>>,
    high_pc: Option<AttributeValue<EndianArcSlice>>,
) -> Option<(u64, u64)> {
    let low = match low_pc? {
        AttributeValue::Addr(a) => a,
        _ => return None,
    };
    let high = match high_pc? {
        AttributeValue::Addr(a) => a,
        AttributeValue::Udata(off) => low + off,
        _ => return None,
    };
    Some((low, high))
}

pub(super) fn parse_units(dwarf: &gimli::Dwarf<EndianArcSlice>) -> Result<Vec<ParsedUnit>> {
    let mut units = Vec::new();
    let mut headers = dwarf.units();
    while let Some(header) = headers.next()? {
        let unit = dwarf.unit(header)?;

        let mut files = Vec::new();
        let mut lines = Vec::new();
        if let Some(ref lp) = unit.line_program {
            let program = lp.clone();
            let header = program.header().clone();
            for file_entry in header.file_names() {
                let name = dwarf
                    .attr_string(&unit, file_entry.path_name())
                    .map(|s| s.to_string_lossy().map(|s| s.to_string()))
                    .unwrap_or_else(|_| Ok(String::new()))
                    .unwrap_or_default();
                files.push(PathBuf::from(name));
            }

            let mut rows = program.rows();
            while let Some((_, row)) = rows.next_row()? {
                if let Some(line) = row.line() {
                    lines.push(LineRow {
                        address: row.address(),
                        file_index: row.file_index(),
                        line: line.get(),
                    });
                }
            }
            lines.sort_unstable_by_key(|l| l.address);
        }

        let mut functions = Vec::new();
        let mut inlines = Vec::new();

        let mut cursor = unit.entries();
        while let Some((_, entry)) = cursor.next_dfs()? {
            match entry.tag() {
                gimli::DW_TAG_subprogram => {
                    let low_pc = entry.attr_value(DW_AT_low_pc)?;
                    let high_pc = entry.attr_value(DW_AT_high_pc)?;
                    if let Some((low, high)) = range_from_attrs(low_pc, high_pc) {
                        let name = entry
                            .attr(gimli::DW_AT_name)?
                            .and_then(|attr| dwarf.attr_string(&unit, attr.value()).ok())
                            .and_then(|s| s.to_string_lossy().map(|s| s.to_string()).ok());
                        functions.push(FunctionRange { low, high, name });
                    }
                }
                gimli::DW_TAG_inlined_subroutine => {
                    let low_pc = entry.attr_value(DW_AT_low_pc)?;
                    let high_pc = entry.attr_value(DW_AT_high_pc)?;
                    if let Some((low, high)) = range_from_attrs(low_pc, high_pc) {
                        let call_file = entry
                            .attr_value(DW_AT_call_file)?
                            .and_then(|v| v.udata_value());
                        let call_line = entry
                            .attr_value(DW_AT_call_line)?
                            .and_then(|v| v.udata_value());
                        inlines.push(InlineRange {
                            low,
                            high,
                            call_file,
                            call_line,
                        });
                    }
                }
                _ => {}
            }
        }

        units.push(ParsedUnit {
            files,
            lines,
            functions,
            inlines,
        });
    }
    Ok(units)
}
