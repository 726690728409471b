use anyhow::{Context, Result};
use std::io::Cursor;

/// Wrap raw 16-bit little-endian mono PCM into an in-memory WAV file
pub fn encode_wav(pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(pcm.len() + 44));
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).context("Failed to create WAV writer")?;

        for pair in pcm.chunks_exact(2) {
            writer
                .write_sample(i16::from_le_bytes([pair[0], pair[1]]))
                .context("Failed to write sample to WAV")?;
        }

        writer.finalize().context("Failed to finalize WAV data")?;
    }

    Ok(cursor.into_inner())
}
