// Offline artifact mode: render segment 0 to a 16-bit stereo WAV and print
// a digest of the PCM, so runs can be diffed without listening to them.
// This is the entry point external regression tooling drives.

use std::path::Path;

use anyhow::Context;
use rand_pcg::Pcg64;

use crate::music::params::MusicParams;
use crate::music::segment::render_segment;
use crate::shared::SAMPLE_RATE;

pub fn render_wav(params: &MusicParams, rng: &mut Pcg64, path: &Path) -> anyhow::Result<()> {
    let segment = render_segment(params, rng);

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("could not create {}", path.display()))?;

    let mut pcm = Vec::with_capacity(segment.frames.len() * 4);
    for frame in &segment.frames {
        let left = (frame.left * 32767.0) as i16;
        let right = (frame.right * 32767.0) as i16;
        writer.write_sample(left)?;
        writer.write_sample(right)?;
        pcm.extend_from_slice(&left.to_le_bytes());
        pcm.extend_from_slice(&right.to_le_bytes());
    }
    writer.finalize().context("could not finalize wav")?;

    println!(
        "Wrote {} ({} frames, {} bpm, {} root {:.2} Hz)",
        path.display(),
        segment.frames.len(),
        params.bpm,
        params.scale.label(),
        params.root_freq,
    );
    println!("pcm blake3: {}", blake3::hash(&pcm).to_hex());
    Ok(())
}
