use anyhow::Context;
use ringbuf::HeapRb;
use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use std::io::Cursor;

/// Sample rate of the raw PCM16 audio returned by the speech synthesis API.
pub const TTS_PCM16_SAMPLE_RATE: f64 = 24000.0;
/// Sample rate recordings are converted to before transcription.
pub const TRANSCRIPTION_SAMPLE_RATE: u32 = 16000;

const RESAMPLER_CHUNK_SIZE: usize = 1024;

/// Creates a resampler to convert between audio sample rates.
pub fn create_resampler(
    in_sampling_rate: f64,
    out_sampling_rate: f64,
    chunk_size: usize,
) -> anyhow::Result<FastFixedIn<f32>> {
    let resampler = FastFixedIn::<f32>::new(
        out_sampling_rate / in_sampling_rate,
        1.0,
        PolynomialDegree::Cubic,
        chunk_size,
        1,
    )?;
    Ok(resampler)
}

/// Splits samples into fixed-size chunks, zero-padding the last one.
pub fn split_for_chunks(samples: &[f32], chunk_size: usize) -> Vec<Vec<f32>> {
    samples
        .chunks(chunk_size)
        .map(|chunk| {
            let mut chunk = chunk.to_vec();
            chunk.resize(chunk_size, 0.0);
            chunk
        })
        .collect()
}

/// Creates a new ring buffer on the heap for shared audio data.
pub fn shared_buffer(size: usize) -> HeapRb<f32> {
    HeapRb::new(size)
}

/// Decodes little-endian PCM16 bytes into normalized f32 samples.
/// A trailing odd byte is ignored.
pub fn decode_pcm16_le(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|chunk| {
            let v = i16::from_le_bytes([chunk[0], chunk[1]]);
            (v as f32 / 32768.0).clamp(-1.0, 1.0)
        })
        .collect()
}

/// Converts a slice of f32 samples to a vector of i16 samples.
pub fn convert_f32_to_i16(pcm32: &[f32]) -> Vec<i16> {
    pcm32
        .iter()
        .map(|&sample| (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16)
        .collect()
}

/// Averages interleaved frames down to one channel.
pub fn to_mono(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Resamples a whole mono buffer in one go.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> anyhow::Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler =
        create_resampler(from_rate as f64, to_rate as f64, RESAMPLER_CHUNK_SIZE)?;
    let expected = (samples.len() as f64 * to_rate as f64 / from_rate as f64).round() as usize;
    let mut output = Vec::with_capacity(expected + RESAMPLER_CHUNK_SIZE);

    for chunk in split_for_chunks(samples, resampler.input_frames_next()) {
        let frames = resampler
            .process(&[chunk.as_slice()], None)
            .context("Failed to resample audio chunk")?;
        if let Some(channel) = frames.into_iter().next() {
            output.extend(channel);
        }
    }

    // Drop what the zero padding of the last chunk produced.
    output.truncate(expected);
    Ok(output)
}

/// Encodes mono f32 samples as a 16-bit PCM WAV file held in memory.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> anyhow::Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).context("Failed to start WAV writer")?;
        for sample in convert_f32_to_i16(samples) {
            writer.write_sample(sample)?;
        }
        writer.finalize().context("Failed to finalize WAV data")?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_little_endian_pcm16() {
        let bytes = [0x00, 0x00, 0xff, 0x7f, 0x00, 0x80, 0x01];
        let samples = decode_pcm16_le(&bytes);
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], 0.0);
        assert!((samples[1] - 1.0).abs() < 1e-4);
        assert_eq!(samples[2], -1.0);
    }

    #[test]
    fn downmixes_interleaved_stereo() {
        let mono = to_mono(&[0.2, 0.4, -1.0, 1.0], 2);
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.3).abs() < 1e-6);
        assert_eq!(mono[1], 0.0);
        assert_eq!(to_mono(&[0.5, 0.25], 1), vec![0.5, 0.25]);
    }

    #[test]
    fn chunks_are_zero_padded() {
        let chunks = split_for_chunks(&[1.0, 2.0, 3.0], 2);
        assert_eq!(chunks, vec![vec![1.0, 2.0], vec![3.0, 0.0]]);
    }

    #[test]
    fn resampling_scales_length() {
        let samples = vec![0.1f32; 48000];
        let out = resample(&samples, 48000, 16000).unwrap();
        assert_eq!(out.len(), 16000);

        let same = resample(&samples[..10], 16000, 16000).unwrap();
        assert_eq!(same.len(), 10);
    }

    #[test]
    fn wav_encoding_is_readable() {
        let samples = vec![0.0, 0.5, -0.5, 0.25];
        let bytes = encode_wav(&samples, TRANSCRIPTION_SAMPLE_RATE).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");

        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, TRANSCRIPTION_SAMPLE_RATE);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.len(), 4);
    }
}
