mod parser;

use bencodec::*;
use std::io::{self, Read, Write};
use anyhow::{Context, Result};
use structopt::StructOpt;
use std::str::from_utf8;

/// Decode and print bencode documents
#[derive(StructOpt)]
#[structopt(name = "bq", author = "Liv Fischer")]
struct Opt {
    /// parse a textual representation and encode it into bencode instead
    #[structopt(short, long)]
    encode: bool,
    /// refuse documents with lists and dictionaries nested deeper than this
    #[structopt(short = "d", long, default_value = "512")]
    max_depth: usize,
}

fn main() -> Result<()> {
    let opt = Opt::from_args();
    if opt.encode {
        let mut buffer = Vec::new();
        io::stdin().read_to_end(&mut buffer).context("Failed to read stdin")?;
        encode(&buffer)
    } else {
        print(opt.max_depth)
    }
}

fn print(max_depth: usize) -> Result<()> {
    let stdin = io::stdin();
    let mut decoder = Decoder::from_reader(stdin.lock()).with_max_depth(max_depth);
    let value = decoder.as_value().context("Decoding error")?;
    println!("{}", &value);
    Ok(())
}

fn encode(buffer: &[u8]) -> Result<()> {
    let string = from_utf8(buffer).context("input is not utf-8")?;
    let value = parser::parse(string)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    Encoder::encode(&value, &mut out).context("Failed to write stdout")?;
    out.flush().context("Failed to write stdout")?;
    Ok(())
}
