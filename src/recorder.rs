use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

/// Upload format expected by the diagnosis service.
const TARGET_RATE: u32 = 16_000;

/// Pick a capture config, preferring 16kHz mono f32. Falls back to the
/// device default with integer downsampling.
fn pick_config(
    device: &cpal::Device,
) -> Result<(cpal::StreamConfig, u32, usize), Box<dyn std::error::Error>> {
    let supported: Vec<_> = device.supported_input_configs()?.collect();

    let native_16k = supported.iter().find(|c| {
        c.channels() == 1
            && c.min_sample_rate() <= TARGET_RATE
            && c.max_sample_rate() >= TARGET_RATE
            && c.sample_format() == cpal::SampleFormat::F32
    });

    if let Some(cfg) = native_16k {
        return Ok((cfg.with_sample_rate(TARGET_RATE).config(), TARGET_RATE, 1));
    }

    let default_config = device.default_input_config()?;
    let rate = default_config.sample_rate();
    let factor = (rate / TARGET_RATE).max(1) as usize;
    let effective_rate = rate / factor as u32;
    log::info!("Capturing at {rate}Hz, downsampling by {factor}x to ~{effective_rate}Hz");
    Ok((default_config.config(), effective_rate, factor))
}

/// Start capturing from the default input device into the shared buffer
/// (mono f32). Drop the returned `Stream` to stop. Fails when no microphone
/// is available or the device refuses to open.
pub fn start_capture(
    buffer: Arc<Mutex<Vec<f32>>>,
) -> Result<(cpal::Stream, u32), Box<dyn std::error::Error>> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or("No microphone found. Connect one and grant audio access.")?;

    log::info!("Capture device: {:?}", device.description());

    let (config, sample_rate, downsample_factor) = pick_config(&device)?;
    let channels = config.channels as usize;

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            let mut buf = buffer.lock().unwrap();
            for (i, frame) in data.chunks(channels).enumerate() {
                if i % downsample_factor == 0 {
                    let mono = frame.iter().sum::<f32>() / channels as f32;
                    buf.push(mono);
                }
            }
        },
        |err| log::error!("Capture stream error: {err}"),
        None,
    )?;

    stream.play()?;
    Ok((stream, sample_rate))
}

/// Encode captured samples as mono 16-bit PCM WAV for upload.
pub fn samples_to_wav(
    samples: &[f32],
    sample_rate: u32,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        writer.write_sample((clamped * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_encoding_produces_riff_header() {
        let samples = vec![0.0f32; 1600];
        let wav = samples_to_wav(&samples, 16_000).unwrap();
        assert_eq!(&wav[..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // 44-byte header + 2 bytes per sample
        assert_eq!(wav.len(), 44 + samples.len() * 2);
    }

    #[test]
    fn wav_encoding_clamps_out_of_range_samples() {
        let wav = samples_to_wav(&[2.0, -2.0], 16_000).unwrap();
        let first = i16::from_le_bytes([wav[44], wav[45]]);
        let second = i16::from_le_bytes([wav[46], wav[47]]);
        assert_eq!(first, i16::MAX);
        assert_eq!(second, -i16::MAX);
    }
}
