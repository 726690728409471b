// WAV encoding tests for utterances sent to transcription

use anyhow::Result;
use loqa_voice::audio::encode_wav;
use std::io::Cursor;

#[test]
fn test_encode_wav_header_and_samples() -> Result<()> {
    let samples: Vec<i16> = vec![0, 1000, -1000, i16::MAX, i16::MIN];
    let pcm: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();

    let wav = encode_wav(&pcm, 8000)?;
    assert_eq!(&wav[..4], b"RIFF");
    assert_eq!(wav.len(), 44 + pcm.len());

    let mut reader = hound::WavReader::new(Cursor::new(wav))?;
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 8000);
    assert_eq!(spec.bits_per_sample, 16);

    let decoded: Vec<i16> = reader.samples::<i16>().collect::<Result<_, _>>()?;
    assert_eq!(decoded, samples);
    Ok(())
}

#[test]
fn test_encode_wav_ignores_trailing_odd_byte() -> Result<()> {
    let wav = encode_wav(&[1, 0, 2], 16000)?;
    let reader = hound::WavReader::new(Cursor::new(wav))?;
    assert_eq!(reader.spec().sample_rate, 16000);
    assert_eq!(reader.len(), 1);
    Ok(())
}

#[test]
fn test_encode_empty_pcm() -> Result<()> {
    let wav = encode_wav(&[], 8000)?;
    let reader = hound::WavReader::new(Cursor::new(wav))?;
    assert_eq!(reader.len(), 0);
    Ok(())
}
