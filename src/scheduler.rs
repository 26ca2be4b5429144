// Double-buffered segment streaming. While the device plays segment N, one
// background thread renders segment N+1 and hands back (audio, rng
// continuation) over a bounded channel. A little before segment N ends the
// scheduler crossfades to N+1 and immediately starts producing N+2. The rng
// checkpoint the producer started from is kept around, so if the producer
// ever misses the window the same segment can be re-rendered inline,
// bit-identically, and the late result just lands in a closed channel.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, bounded};
use rand_pcg::Pcg64;

use crate::audio::AudioHandle;
use crate::audio_api::AudioCommand;
use crate::music::params::MusicParams;
use crate::music::segment::{Segment, render_segment};
use crate::shared::{CROSSFADE_MS, DisplayState, SAMPLE_RATE, VISUAL_FPS};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayState {
    Idle,
    Priming,
    Playing,
    Crossfading,
    Stopped,
}

impl PlayState {
    pub fn label(self) -> &'static str {
        match self {
            PlayState::Idle => "idle",
            PlayState::Priming => "priming",
            PlayState::Playing => "playing",
            PlayState::Crossfading => "crossfading",
            PlayState::Stopped => "stopped",
        }
    }
}

struct Rendered {
    segment: Segment,
    rng: Pcg64,
}

pub struct Scheduler {
    params: Arc<MusicParams>,
    audio: AudioHandle,
    state: PlayState,
    segment_start: Instant,
    crossfade_start: Instant,
    current_rms: Arc<Vec<f32>>,
    inflight: Option<Receiver<Rendered>>,
    checkpoint: Pcg64, // rng state the in-flight producer started from
    segment_index: u64,
    backpressure_events: u64,
}

impl Scheduler {
    pub fn new(params: MusicParams, rng: Pcg64, audio: AudioHandle) -> Self {
        let now = Instant::now();
        Self {
            params: Arc::new(params),
            audio,
            state: PlayState::Idle,
            segment_start: now,
            crossfade_start: now,
            current_rms: Arc::new(Vec::new()),
            inflight: None,
            checkpoint: rng, // holds the boot stream until start()
            segment_index: 0,
            backpressure_events: 0,
        }
    }

    // Renders segment 0 on the caller's thread, starts playback, and kicks
    // off production of segment 1.
    pub fn start(&mut self) {
        if self.state != PlayState::Idle {
            return;
        }
        self.state = PlayState::Priming;

        let mut rng = self.checkpoint.clone();
        let first = render_segment(&self.params, &mut rng);

        self.audio.send(AudioCommand::Play {
            frames: Arc::new(first.frames),
            fade_in: 0,
        });
        self.current_rms = Arc::new(first.rms);
        self.segment_start = Instant::now();
        self.state = PlayState::Playing;
        self.spawn_producer(rng);
    }

    pub fn tick(&mut self, now: Instant) {
        match self.state {
            PlayState::Playing => {
                if now.duration_since(self.segment_start) >= self.handoff_after() {
                    self.crossfade_to_next(now);
                }
            }
            PlayState::Crossfading => {
                if now.duration_since(self.crossfade_start) >= crossfade_window() {
                    self.state = PlayState::Playing;
                    // the handoff deadline keeps counting from segment_start,
                    // so a re-check this tick is harmless
                    self.tick(now);
                }
            }
            PlayState::Idle | PlayState::Priming | PlayState::Stopped => {}
        }
    }

    pub fn stop(&mut self) {
        self.state = PlayState::Stopped;
        self.audio.send(AudioCommand::FadeOut { fade: crossfade_samples() });
        // abandon any in-flight render; the thread finishes into a closed
        // channel and the process is free to exit
        self.inflight = None;
    }

    // RMS of the visual frame nearest to `now`, for level-driven display.
    pub fn level_at(&self, now: Instant) -> f32 {
        if self.current_rms.is_empty() {
            return 0.0;
        }
        let elapsed = now.duration_since(self.segment_start).as_secs_f64();
        let idx = (elapsed * VISUAL_FPS as f64) as usize % self.current_rms.len();
        self.current_rms[idx]
    }

    pub fn display_state(&self, now: Instant) -> DisplayState {
        DisplayState {
            seed: self.params.seed,
            bpm: self.params.bpm,
            scale_label: self.params.scale.label(),
            root_freq: self.params.root_freq,
            bass_label: self.params.bass.label(),
            delay_beats: self.params.delay_beats,
            state_label: self.state.label(),
            segment_index: self.segment_index,
            backpressure_events: self.backpressure_events,
            level: self.level_at(now),
            playing: self.audio.is_playing(),
        }
    }

    fn handoff_after(&self) -> Duration {
        Duration::from_secs_f64(self.params.segment_secs) - crossfade_window()
    }

    fn crossfade_to_next(&mut self, now: Instant) {
        let next = self.take_or_render_next();
        let fade = crossfade_samples();

        self.audio.send(AudioCommand::FadeOut { fade });
        self.audio.send(AudioCommand::Play {
            frames: Arc::new(next.segment.frames),
            fade_in: fade,
        });

        self.current_rms = Arc::new(next.segment.rms);
        self.segment_start = now;
        self.crossfade_start = now;
        self.segment_index += 1;
        self.state = PlayState::Crossfading;
        self.spawn_producer(next.rng);
    }

    // The producer had a whole segment of wall time; if it still isn't done,
    // render inline rather than let playback starve. Same checkpoint, same
    // draws, same samples.
    fn take_or_render_next(&mut self) -> Rendered {
        if let Some(rx) = self.inflight.take() {
            match rx.try_recv() {
                Ok(rendered) => return rendered,
                Err(_) => {
                    self.backpressure_events += 1;
                    eprintln!("seedbeat: producer missed the crossfade window, rendering inline");
                }
            }
        }
        let mut rng = self.checkpoint.clone();
        let segment = render_segment(&self.params, &mut rng);
        Rendered { segment, rng }
    }

    fn spawn_producer(&mut self, rng: Pcg64) {
        self.checkpoint = rng.clone();
        let (tx, rx) = bounded(1);
        let params = self.params.clone();
        thread::spawn(move || {
            let mut rng = rng;
            let segment = render_segment(&params, &mut rng);
            // receiver may already be gone on shutdown or after a fallback
            let _ = tx.send(Rendered { segment, rng });
        });
        self.inflight = Some(rx);
    }
}

fn crossfade_window() -> Duration {
    Duration::from_millis(CROSSFADE_MS)
}

fn crossfade_samples() -> usize {
    (SAMPLE_RATE as u64 * CROSSFADE_MS / 1000) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::params::derive;

    fn started(seed: u64) -> (Scheduler, crossbeam_channel::Receiver<AudioCommand>) {
        let (params, rng) = derive(seed);
        let (audio, rx) = AudioHandle::mock();
        let mut scheduler = Scheduler::new(params, rng, audio);
        scheduler.start();
        (scheduler, rx)
    }

    #[test]
    fn scheduler_begins_idle_until_started() {
        let (params, rng) = derive(0xACE1);
        let (audio, rx) = AudioHandle::mock();
        let mut scheduler = Scheduler::new(params, rng, audio);
        assert_eq!(scheduler.state, PlayState::Idle);
        assert_eq!(scheduler.level_at(Instant::now()), 0.0);
        scheduler.tick(Instant::now() + Duration::from_secs(60));
        assert!(rx.try_recv().is_err(), "idle scheduler stays silent");
        scheduler.start();
        assert_eq!(scheduler.state, PlayState::Playing);
        // a second start is a no-op
        scheduler.start();
        let _ = rx.try_recv();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn start_plays_segment_zero_without_a_fade() {
        let (scheduler, rx) = started(0xACE1);
        match rx.try_recv().expect("segment 0 queued") {
            AudioCommand::Play { frames, fade_in } => {
                assert_eq!(fade_in, 0);
                assert!(!frames.is_empty());
            }
            other => panic!("expected Play, got {other:?}"),
        }
        assert!(rx.try_recv().is_err(), "no extra commands at start");
        assert_eq!(scheduler.state, PlayState::Playing);
        assert_eq!(scheduler.segment_index, 0);
    }

    #[test]
    fn no_handoff_before_the_deadline() {
        let (mut scheduler, rx) = started(0xACE1);
        let _ = rx.try_recv();
        scheduler.tick(scheduler.segment_start + Duration::from_millis(10));
        assert!(rx.try_recv().is_err());
        assert_eq!(scheduler.segment_index, 0);
    }

    #[test]
    fn handoff_crossfades_and_chains_the_next_producer() {
        let (mut scheduler, rx) = started(0xACE1);
        let _ = rx.try_recv();

        let deadline = scheduler.segment_start + scheduler.handoff_after();
        scheduler.tick(deadline);

        assert_eq!(scheduler.state, PlayState::Crossfading);
        assert_eq!(scheduler.segment_index, 1);
        let fade = crossfade_samples();
        match rx.try_recv().expect("fade-out sent") {
            AudioCommand::FadeOut { fade: sent } => assert_eq!(sent, fade),
            other => panic!("expected FadeOut, got {other:?}"),
        }
        match rx.try_recv().expect("next segment sent") {
            AudioCommand::Play { fade_in, .. } => assert_eq!(fade_in, fade),
            other => panic!("expected Play, got {other:?}"),
        }
        assert!(scheduler.inflight.is_some(), "production of segment 2 chained");

        // fade window elapses, back to steady playing
        scheduler.tick(scheduler.crossfade_start + crossfade_window());
        assert_eq!(scheduler.state, PlayState::Playing);
    }

    #[test]
    fn fallback_render_matches_the_producer_exactly() {
        let (mut scheduler, rx) = started(7);
        let _ = rx.try_recv();

        // what the producer will (or would) deliver for segment 1
        let mut expected_rng = scheduler.checkpoint.clone();
        let expected = render_segment(&scheduler.params, &mut expected_rng);

        // whether the thread won the race or the inline fallback ran, the
        // handoff result must be the same bits
        let deadline = scheduler.segment_start + scheduler.handoff_after();
        scheduler.tick(deadline);

        let _ = rx.try_recv(); // FadeOut
        match rx.try_recv().expect("segment 1 queued") {
            AudioCommand::Play { frames, .. } => assert_eq!(*frames, expected.frames),
            other => panic!("expected Play, got {other:?}"),
        }
        assert_eq!(*scheduler.current_rms, expected.rms);
        // and the chained producer starts from the matching continuation
        assert_eq!(scheduler.checkpoint, expected_rng);
    }

    #[test]
    fn stop_fades_out_and_abandons_production() {
        let (mut scheduler, rx) = started(0xACE1);
        let _ = rx.try_recv();
        scheduler.stop();
        assert_eq!(scheduler.state, PlayState::Stopped);
        assert!(scheduler.inflight.is_none());
        match rx.try_recv().expect("fade-out sent") {
            AudioCommand::FadeOut { .. } => {}
            other => panic!("expected FadeOut, got {other:?}"),
        }
        // ticking a stopped scheduler does nothing
        scheduler.tick(Instant::now() + Duration::from_secs(3600));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn level_feed_indexes_by_elapsed_frames() {
        let (scheduler, _rx) = started(0xACE1);
        let level = scheduler.level_at(scheduler.segment_start + Duration::from_millis(500));
        let expected = scheduler.current_rms[(0.5 * VISUAL_FPS as f64) as usize];
        assert_eq!(level, expected);
    }
}
