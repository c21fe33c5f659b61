use byteorder::{LittleEndian, WriteBytesExt};
use std::{f32::consts::PI, io::Write};

/// Deterministic PCM-like bytes for `sample_count` samples of `frame_bytes` each.
///
/// Every byte is non-zero, so any zero byte read back from a cache is known
/// to be padding rather than data.
pub fn make_pattern(sample_count: usize, frame_bytes: usize) -> Vec<u8> {
    (0..sample_count * frame_bytes)
        .map(|i| ((i.wrapping_mul(31) + i / 251 + 7) % 255) as u8 + 1)
        .collect()
}

/// Bytes `make_pattern` would have produced for `count` samples from `start`.
pub fn pattern_range(start: usize, count: usize, frame_bytes: usize) -> Vec<u8> {
    (start * frame_bytes..(start + count) * frame_bytes)
        .map(|i| ((i.wrapping_mul(31) + i / 251 + 7) % 255) as u8 + 1)
        .collect()
}

/// A 440Hz sine at 48kHz, `float_len` samples long (interleaved if `stereo`).
pub fn make_sine(float_len: usize, stereo: bool) -> Vec<f32> {
    let sample_len = if stereo { float_len / 2 } else { float_len };
    let mut out = Vec::with_capacity(float_len);

    for i in 0..sample_len {
        let x_val = (i as f32) * 440.0 * 2.0 * PI / 48_000.0;
        let s = x_val.sin();
        out.push(s);
        if stereo {
            out.push(s);
        }
    }

    out
}

/// Wraps interleaved `i16` PCM in a minimal RIFF/WAVE container.
pub fn make_pcm_wav(samples: &[i16], channels: u16, sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let block_align = channels * 2;
    let mut out = Vec::with_capacity(44 + data_len as usize);

    out.write_all(b"RIFF").unwrap();
    out.write_u32::<LittleEndian>(36 + data_len).unwrap();
    out.write_all(b"WAVE").unwrap();

    out.write_all(b"fmt ").unwrap();
    out.write_u32::<LittleEndian>(16).unwrap();
    out.write_u16::<LittleEndian>(1).unwrap();
    out.write_u16::<LittleEndian>(channels).unwrap();
    out.write_u32::<LittleEndian>(sample_rate).unwrap();
    out.write_u32::<LittleEndian>(sample_rate * u32::from(block_align))
        .unwrap();
    out.write_u16::<LittleEndian>(block_align).unwrap();
    out.write_u16::<LittleEndian>(16).unwrap();

    out.write_all(b"data").unwrap();
    out.write_u32::<LittleEndian>(data_len).unwrap();
    for s in samples {
        out.write_i16::<LittleEndian>(*s).unwrap();
    }

    out
}

/// `make_sine`, quantised to interleaved `i16`.
pub fn make_sine_i16(float_len: usize, stereo: bool) -> Vec<i16> {
    make_sine(float_len, stereo)
        .into_iter()
        .map(|s| (s * f32::from(i16::MAX)) as i16)
        .collect()
}
