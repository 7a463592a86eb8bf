use clap::Parser;
use sage_context::text::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, TextSplitter};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

/// Split a text file into overlapping chunks and print them as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input text file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Maximum length of each chunk, in characters.
    #[arg(short = 's', long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Characters shared by consecutive chunks.
    #[arg(short, long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
    overlap: usize,

    /// Comma-separated list of regex patterns for delimiters.
    /// Defaults to delimiters chosen from the input file extension.
    #[arg(short, long, value_delimiter = ',')]
    delimiters: Option<Vec<String>>,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let file_content = if let Some(input_path) = &args.input {
        fs::read_to_string(input_path)?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let splitter = match (&args.delimiters, &args.input) {
        (Some(patterns), _) => {
            let refs: Vec<&str> = patterns.iter().map(String::as_str).collect();
            TextSplitter::with_delimiters(args.chunk_size, args.overlap, &refs)
        }
        (None, Some(path)) => TextSplitter::for_path(path, args.chunk_size, args.overlap),
        (None, None) => TextSplitter::new(args.chunk_size, args.overlap),
    }
    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let chunks = splitter.get_chunks(&file_content);
    let json_output = serde_json::to_string_pretty(&chunks)?;
    println!("{}", json_output);

    Ok(())
}
