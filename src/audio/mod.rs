use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};

use crate::audio_api::AudioCommand;
use crate::shared::SAMPLE_RATE;

mod engine;
mod frame;

pub use frame::StereoFrame;

use engine::Engine;

pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    active_clips: Arc<AtomicUsize>,
    _output_stream: Option<cpal::Stream>, // None only for the deviceless test handle
}

impl AudioHandle {
    pub fn send(&self, cmd: AudioCommand) {
        let _ = self.tx.try_send(cmd);
    }

    // still producing sound? (any live clip, fading ones included)
    pub fn is_playing(&self) -> bool {
        self.active_clips.load(Ordering::Relaxed) > 0
    }

    #[cfg(test)]
    pub fn mock() -> (Self, Receiver<AudioCommand>) {
        let (tx, rx) = crossbeam_channel::bounded(64);
        let handle = Self {
            tx,
            active_clips: Arc::new(AtomicUsize::new(0)),
            _output_stream: None,
        };
        (handle, rx)
    }
}

pub fn start_audio() -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(64);

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("no default output device")?;

    // segments are rendered at a fixed rate; ask the device for exactly that
    let supported = device
        .supported_output_configs()
        .context("no output configs on default device")?
        .find(|cfg| {
            cfg.sample_format() == cpal::SampleFormat::F32
                && cfg.channels() >= 2
                && cfg.min_sample_rate() <= SAMPLE_RATE
                && SAMPLE_RATE <= cfg.max_sample_rate()
        })
        .map(|cfg| cfg.with_sample_rate(SAMPLE_RATE))
        .context("device has no f32 stereo config at 44100 Hz")?;

    let channels = supported.channels() as usize;
    let active = Arc::new(AtomicUsize::new(0));

    let stream = build_output_stream_f32(&device, &supported.into(), rx, channels, active.clone())?;
    stream.play().context("failed to play output stream")?;

    Ok(AudioHandle {
        tx,
        active_clips: active,
        _output_stream: Some(stream),
    })
}

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    channels: usize,
    active: Arc<AtomicUsize>,
) -> anyhow::Result<cpal::Stream> {
    let mut engine = Engine::new(active);
    // scratch mix buffer lives outside the callback so steady-state
    // rendering never allocates
    let mut mix = vec![StereoFrame::zero(); 4096];

    let err_fn = |err| eprintln!("audio output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info| {
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }

            let n_frames = data.len() / channels;
            if mix.len() < n_frames {
                mix.resize(n_frames, StereoFrame::zero());
            }
            engine.render_block(&mut mix[..n_frames]);

            for (i, out) in data.chunks_exact_mut(channels).enumerate() {
                out[0] = mix[i].left;
                out[1] = mix[i].right;
                for extra in out.iter_mut().skip(2) {
                    *extra = 0.0;
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
