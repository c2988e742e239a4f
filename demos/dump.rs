use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process;

use oggvorbis::{Config, Event, StreamDecoder, VERSION};

/// Decodes an Ogg Vorbis file, prints the stream information and optionally writes the decoded
/// audio as raw interleaved 16-bit little endian PCM.
#[derive(Parser)]
#[command(name = "dump", version)]
struct Args {
    /// Ogg Vorbis file to decode
    input: PathBuf,

    /// Raw PCM output file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Treat malformed comment headers as errors
    #[arg(long)]
    strict: bool,

    /// Decode truncated audio packets instead of replacing them with silence
    #[arg(long)]
    lenient: bool,

    /// Don't verify Ogg page checksums
    #[arg(long)]
    no_crc: bool,

    /// Number of bytes read from the input at a time
    #[arg(long, default_value_t = 4096)]
    chunk_len: usize,
}

#[derive(Default)]
struct Stats {
    frames: u64,
    holes: usize,
    silences: usize,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config {
        strict: args.strict,
        lenient_packets: args.lenient,
        verify_crc: !args.no_crc,
        ..Config::default()
    };
    let mut input = File::open(&args.input)?;
    let mut output = match args.output {
        Some(ref path) => Some(BufWriter::new(File::create(path)?)),
        None => None,
    };

    println!("{}: decoding {}", VERSION, args.input.display());

    let mut decoder = StreamDecoder::new(config);
    let mut stats = Stats::default();
    let mut buf = vec![0; args.chunk_len.max(1)];
    'read: loop {
        let len = input.read(&mut buf)?;
        let done = len == 0;
        if done {
            decoder.finish();
        } else {
            decoder.feed(&buf[..len]);
        }
        while let Some(event) = decoder.next_event()? {
            match event {
                Event::Ready(_) => print_info(&decoder),
                Event::Audio(block) => {
                    stats.frames += block.frames() as u64;
                    if let Some(ref mut output) = output {
                        write_pcm(output, block.interleaved())?;
                    }
                }
                Event::Silence { error, block } => {
                    println!("Packet replaced with {} frames of silence: {}", block.frames(), error);
                    stats.silences += 1;
                    stats.frames += block.frames() as u64;
                    if let Some(ref mut output) = output {
                        write_pcm(output, block.interleaved())?;
                    }
                }
                Event::Hole(error) => {
                    println!("Hole in data: {}", error);
                    stats.holes += 1;
                }
                Event::EndOfStream => break 'read,
            }
        }
        if done {
            break;
        }
    }

    if let Some(ref mut output) = output {
        output.flush()?;
    }
    match decoder.format() {
        Some(format) => println!("Decoded {} frames ({:.3} s), {} holes, {} silenced packets",
            stats.frames, stats.frames as f64 / format.sample_rate as f64, stats.holes, stats.silences),
        None => println!("No Vorbis stream found"),
    }
    Ok(())
}

fn print_info(decoder: &StreamDecoder) {
    if let Some(header) = decoder.header() {
        println!("Stream serial: {:#010x}", decoder.serial().unwrap_or(0));
        println!("Channels: {}", header.channel_count());
        println!("Sample rate: {}", header.sample_rate());
        let bitrate = |v: Option<i32>| v.map(|v| v.to_string()).unwrap_or_else(|| "-".into());
        println!("Bitrate (min / nom / max): {} / {} / {}",
            bitrate(header.bitrates().min()),
            bitrate(header.bitrates().nom()),
            bitrate(header.bitrates().max()));
        println!("Frame lengths (short / long): {} / {}",
            header.frame_lens().short(), header.frame_lens().long());
    }
    if let Some(comments) = decoder.comments() {
        println!("Comments:");
        println!("  Vendor: {}", comments.vendor());
        for (tag, value) in comments {
            println!("  {}: {}", tag, if value.len() < 50 { value } else { "<value is too long>" });
        }
    }
}

fn write_pcm<W: Write>(output: &mut W, samples: &[f32]) -> io::Result<()> {
    for &s in samples {
        let v = (s * 32767.0 + 0.5).floor().max(-32768.0).min(32767.0) as i16;
        output.write_all(&v.to_le_bytes())?;
    }
    Ok(())
}
