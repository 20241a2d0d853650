use anyhow::{bail, Context, Result};
use capture::{DecodedSample, DecoderEvent, StreamDecoder};
use colored::Colorize;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// A decoded capture: samples plus the marker's byte count.
#[derive(Debug)]
pub struct Decoded {
    pub samples: Vec<DecodedSample>,
    pub announced: u32,
    pub received: u32,
}

pub fn run(input: &Path, analog: usize, decimation: u32, output: Option<&Path>) -> Result<()> {
    if decimation == 0 {
        bail!("decimation must be at least 1");
    }
    let bytes = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let decoded = decode_stream(&bytes, analog, decimation)?;

    match output {
        Some(path) => {
            let mut file = fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_csv(&mut file, &decoded, analog)?;
        }
        None => write_csv(&mut io::stdout().lock(), &decoded, analog)?,
    }

    eprintln!(
        "{}",
        format!(
            "✓ {} samples, {} data bytes",
            decoded.samples.len(),
            decoded.received
        )
        .green()
    );
    if decoded.announced != decoded.received {
        eprintln!(
            "{}",
            format!(
                "⚠ marker announced {} bytes but {} arrived",
                decoded.announced, decoded.received
            )
            .yellow()
        );
    }
    Ok(())
}

/// Decode one capture. Bytes after the completion marker are ignored; a
/// stream that ends in a `!reason` line instead of a marker is an error.
pub fn decode_stream(bytes: &[u8], analog: usize, decimation: u32) -> Result<Decoded> {
    let mut decoder = StreamDecoder::new(analog, decimation);
    let mut samples = Vec::new();
    for (offset, &byte) in bytes.iter().enumerate() {
        if byte == b'!' {
            let reason = String::from_utf8_lossy(bytes.get(offset..).unwrap_or_default());
            bail!("capture aborted by device: {}", reason.trim_end());
        }
        let event = decoder
            .push(byte)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("bad stream at byte {offset}"))?;
        match event {
            Some(DecoderEvent::Sample(sample)) => samples.push(sample),
            Some(DecoderEvent::End {
                announced,
                received,
            }) => {
                return Ok(Decoded {
                    samples,
                    announced,
                    received,
                })
            }
            None => {}
        }
    }
    bail!("stream ended without a completion marker after {} samples", samples.len())
}

#[allow(clippy::arithmetic_side_effects)] // shift < 8
pub fn write_csv(out: &mut impl Write, decoded: &Decoded, analog: usize) -> Result<()> {
    write!(out, "index")?;
    for line in 0..8 {
        write!(out, ",d{line}")?;
    }
    for channel in 0..analog {
        write!(out, ",a{channel}")?;
    }
    writeln!(out)?;

    for sample in &decoded.samples {
        write!(out, "{}", sample.index)?;
        for line in 0..8 {
            write!(out, ",{}", (sample.digital >> line) & 1)?;
        }
        for code in &sample.analog {
            write!(out, ",{code}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}
