mod audio;
mod audio_api;
mod export;
mod music;
mod scheduler;
mod shared;
mod tui;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use crossterm::terminal;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use music::params;
use scheduler::Scheduler;
use tui::input::InputEvent;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

struct Options {
    seed: u64,
    render: Option<PathBuf>,
}

// seedbeat [seed] [--render out.wav]
// the seed takes decimal or 0x-prefixed hex
fn parse_args() -> anyhow::Result<Options> {
    let mut seed = None;
    let mut render = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--render" => {
                let path = args.next().context("--render needs an output path")?;
                render = Some(PathBuf::from(path));
            }
            s => {
                if seed.is_some() {
                    bail!("unexpected argument {s:?}");
                }
                seed = Some(params::parse_seed(s)?);
            }
        }
    }

    Ok(Options {
        seed: seed.unwrap_or(0x42),
        render,
    })
}

fn run() -> anyhow::Result<()> {
    // the seed must be valid before any audio state exists
    let opts = parse_args()?;
    let (piece, mut rng) = params::derive(opts.seed);

    // offline artifact mode never touches the device
    if let Some(path) = opts.render {
        return export::render_wav(&piece, &mut rng, &path);
    }

    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope

    let audio = audio::start_audio()?;
    let mut scheduler = Scheduler::new(piece, rng, audio);
    scheduler.start();

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let accent = tui::view::accent_for_seed(opts.seed);
    let tick_rate = Duration::from_millis(16); // ~60fps
    loop {
        let now = Instant::now();
        scheduler.tick(now);

        let ds = scheduler.display_state(now);
        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds, accent);
        })?;

        for event in tui::input::poll_input(tick_rate)? {
            if event == InputEvent::Quit {
                scheduler.stop();
                drop(term);
                return Ok(());
            }
        }
    }
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
