use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use fwl_core::{RecordMetadata, Region, HEADER_END, MEMORY_SIZE_DEFAULT, PAGE_SIZE_DEFAULT};
use fwl_linux::FileFlash;
use fwl_store::{Recovery, RecordStore};
use log::info;

#[derive(Parser)]
#[command(about = "Append-only record log over a flash image file")]
struct Cli {
    #[arg(long, default_value = "flash.img")] image: PathBuf,
    #[arg(long, default_value = "0", value_parser = parse_u32)] start: u32,
    #[arg(long, default_value_t = MEMORY_SIZE_DEFAULT)] size: u32,
    #[arg(long, default_value_t = PAGE_SIZE_DEFAULT)] page_size: u16,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Erase the first page and start an empty log
    Format,
    /// Append a text record
    Write { text: String },
    /// Append a little-endian u32 record
    WriteU32 { #[arg(value_parser = parse_u32)] value: u32 },
    /// Print the current record as text
    Read,
    /// Print the current record as a u32
    ReadU32,
    /// Print the cursor header
    Info,
    /// List every record in the chain
    Scan,
}

fn parse_u32(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("{}: {}", s, e))
}

fn show(meta: &RecordMetadata) {
    let next = if meta.next_addr == HEADER_END {
        "END".to_string()
    } else {
        format!("{:#010x}", meta.next_addr)
    };
    println!(
        "{} len {:>3}  prev {:#010x}  next {}  crc {:#010x}",
        format!("{:#010x}", meta.addr).cyan(),
        meta.data_length,
        meta.prev_addr,
        next,
        meta.checksum
    );
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let region = Region::new(cli.start, cli.size, cli.page_size).context("bad region geometry")?;
    let flash = FileFlash::open(&cli.image, &region)?;
    info!(">>> FWL NODE: {} [{:#010x}..{:#010x}) page {} <<<",
        cli.image.display(), region.start_addr(), region.end(), region.page_size());

    let mut store: RecordStore<FileFlash> = RecordStore::new(flash, region)?;

    // format skips recovery
    if !matches!(cli.cmd, Cmd::Format) {
        match nb::block!(store.begin())? {
            Recovery::Empty => info!("Log empty."),
            Recovery::Positioned { records } => info!("Recovered {} record(s).", records),
        }
    }

    match cli.cmd {
        Cmd::Format => {
            nb::block!(store.format())?;
            println!("{}", "formatted".green());
        }
        Cmd::Write { text } => {
            let meta = nb::block!(store.write(text.as_bytes()))?;
            show(&meta);
        }
        Cmd::WriteU32 { value } => {
            let meta = nb::block!(store.write_entry(&value))?;
            show(&meta);
        }
        Cmd::Read => {
            let mut buf = [0u8; fwl_core::MAX_PAYLOAD];
            let n = nb::block!(store.read(&mut buf))?;
            println!("{}", String::from_utf8_lossy(&buf[..n]));
        }
        Cmd::ReadU32 => {
            let value: u32 = nb::block!(store.read_entry())?;
            println!("{}", value);
        }
        Cmd::Info => {
            if store.is_empty() {
                println!("{}", "empty".yellow());
            } else {
                show(&store.info());
            }
        }
        Cmd::Scan => {
            let records = nb::block!(store.walk(|meta| show(&meta)))?;
            println!("{} record(s)", records.to_string().bold());
        }
    }
    Ok(())
}
