//! Small CLI harness for resolving a single address against a single
//! binary, exercising `bininfo` end to end without a host graph.

use std::path::PathBuf;

use clap::Parser;
use debuginfo_filter::bininfo::fd_cache::FdCache;
use debuginfo_filter::bininfo::BinaryInfo;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the ELF binary or shared object to resolve against.
    binary: String,

    /// Instruction pointer to resolve, as recorded in a trace (hex or decimal).
    #[arg(value_parser = parse_addr)]
    address: u64,

    /// Load base address of the binary (0 for a non-PIC executable).
    #[arg(long, default_value_t = 0, value_parser = parse_addr)]
    load_base: u64,

    /// Whether `address` is file-relative (position-independent code).
    #[arg(long)]
    pic: bool,

    /// Root under which `.build-id/` and debug-link fallback paths are searched.
    #[arg(long, default_value = "/usr/lib/debug")]
    debug_info_dir: PathBuf,
}

fn parse_addr(s: &str) -> Result<u64, std::num::ParseIntError> {
    match s.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

fn main() {
    let logger = env_logger::Logger::from_default_env();
    let filter = logger.filter();
    debuginfo_filter::log::LOGGER_SWITCHER.switch(logger, filter);

    let args = Args::parse();
    let mut fd_cache = FdCache::new();

    // memsz is irrelevant for a one-shot lookup of a single address
    // already known to be in range; pick something generous.
    let memsz = u64::MAX - args.load_base;
    let mut bin = match BinaryInfo::create(&args.binary, args.load_base, memsz, args.pic, args.debug_info_dir, None) {
        Ok(bin) => bin,
        Err(e) => {
            eprintln!("failed to open {}: {e}", args.binary);
            std::process::exit(1);
        }
    };

    let addr = debuginfo_filter::address::TraceAddress::from(args.address);
    let func = bin.lookup_function_name(&mut fd_cache, addr);
    let src = bin.lookup_source_location(&mut fd_cache, addr);

    match func {
        Ok(Some(name)) => println!("function: {name}"),
        Ok(None) => println!("function: <unknown>"),
        Err(e) => println!("function: <error: {e}>"),
    }
    match src {
        Ok(Some(loc)) => println!("source: {}:{}", loc.filename, loc.line_no),
        Ok(None) => println!("source: <unknown>"),
        Err(e) => println!("source: <error: {e}>"),
    }
    println!("location: {}", bin.get_bin_loc(addr));
}
