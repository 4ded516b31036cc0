// Tests for WAV fixture loading

use anyhow::Result;
use parley::AudioFile;
use tempfile::TempDir;

fn write_wav(path: &std::path::Path, channels: u16, samples: &[i16]) -> Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

#[test]
fn test_open_mono_wav() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("mono.wav");

    // One second of a constant positive level
    let samples = vec![i16::MAX / 2; 16000];
    write_wav(&path, 1, &samples)?;

    let audio = AudioFile::open(&path)?;

    assert_eq!(audio.sample_rate, 16000);
    assert_eq!(audio.samples.len(), 16000);
    assert!((audio.duration_seconds - 1.0).abs() < 1e-9);
    assert!((audio.samples[0] - 0.5).abs() < 0.01);

    Ok(())
}

#[test]
fn test_stereo_wav_averaged_to_mono() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("stereo.wav");

    // Left at half scale, right silent: mono average is a quarter scale
    let mut interleaved = Vec::new();
    for _ in 0..8000 {
        interleaved.push(i16::MAX / 2);
        interleaved.push(0);
    }
    write_wav(&path, 2, &interleaved)?;

    let audio = AudioFile::open(&path)?;

    assert_eq!(audio.samples.len(), 8000);
    assert!((audio.samples[0] - 0.25).abs() < 0.01);

    Ok(())
}

#[test]
fn test_missing_file_is_an_error() {
    assert!(AudioFile::open("does/not/exist.wav").is_err());
}
