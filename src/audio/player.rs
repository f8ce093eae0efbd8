// src/audio/player.rs
//! Playback engine using rodio. Everything it plays is captured for analysis.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{Context, Result};
use rodio::source::SineWave;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tracing::{debug, info, warn};

use super::sample_capture::SampleCapture;
use super::spectrum::SampleProducer;

/// Test tone amplitude, -6 dBFS.
const TONE_AMPLITUDE: f32 = 0.5;

/// Commands sent to the audio playback thread.
enum PlayerCommand {
    Play(PathBuf),
    Tone(f32),
    Pause,
    Resume,
    Stop,
}

/// Flags mirrored from the audio thread for quick UI access.
#[derive(Default)]
struct PlaybackFlags {
    playing: AtomicBool,
    paused: AtomicBool,
}

/// Plays a file or a sine test tone on the default output device, one source
/// at a time, stopping any prior playback.
pub struct Player {
    cmd_tx: Sender<PlayerCommand>,
    flags: Arc<PlaybackFlags>,
}

impl Player {
    /// Spawn the audio thread. Played samples go to `producer`.
    pub fn new(producer: SampleProducer) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<PlayerCommand>();
        let flags = Arc::new(PlaybackFlags::default());
        let thread_flags = Arc::clone(&flags);
        let producer = Arc::new(Mutex::new(producer));

        thread::Builder::new()
            .name("audio-output".into())
            .spawn(move || run_audio_thread(cmd_rx, &thread_flags, &producer))
            .context("failed to spawn audio thread")?;

        Ok(Self { cmd_tx, flags })
    }

    /// Stop any current playback and start decoding `path`.
    pub fn play(&self, path: &Path) {
        self.send(PlayerCommand::Play(path.to_path_buf()));
    }

    /// Stop any current playback and play a sine tone at `freq_hz`.
    pub fn tone(&self, freq_hz: f32) {
        self.send(PlayerCommand::Tone(freq_hz));
    }

    pub fn pause(&self) {
        self.send(PlayerCommand::Pause);
    }

    pub fn resume(&self) {
        self.send(PlayerCommand::Resume);
    }

    pub fn stop(&self) {
        self.send(PlayerCommand::Stop);
    }

    /// True while there is an active sink, paused or not.
    pub fn is_playing(&self) -> bool {
        self.flags.playing.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.flags.paused.load(Ordering::SeqCst)
    }

    fn send(&self, cmd: PlayerCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            warn!("audio thread is gone, command dropped");
        }
    }
}

fn run_audio_thread(
    rx: Receiver<PlayerCommand>,
    flags: &PlaybackFlags,
    producer: &Arc<Mutex<SampleProducer>>,
) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(output) => output,
        Err(err) => {
            warn!(%err, "no audio output available, playback disabled");
            // Keep draining so senders never see a closed channel early.
            while rx.recv().is_ok() {}
            return;
        }
    };

    let mut sink: Option<Sink> = None;

    while let Ok(cmd) = rx.recv() {
        match cmd {
            PlayerCommand::Play(path) => {
                if let Some(s) = sink.take() {
                    s.stop();
                }
                match open_file(&path) {
                    Ok(source) => {
                        info!(path = %path.display(), "playing file");
                        sink = start(&handle, SampleCapture::new(source, Arc::clone(producer)));
                    }
                    Err(err) => warn!(path = %path.display(), "{err:#}"),
                }
            }
            PlayerCommand::Tone(freq_hz) => {
                if let Some(s) = sink.take() {
                    s.stop();
                }
                debug!(freq_hz, "playing test tone");
                let source = SineWave::new(freq_hz).amplify(TONE_AMPLITUDE);
                sink = start(&handle, SampleCapture::new(source, Arc::clone(producer)));
            }
            PlayerCommand::Pause => {
                if let Some(s) = &sink {
                    s.pause();
                    flags.paused.store(true, Ordering::SeqCst);
                }
            }
            PlayerCommand::Resume => {
                if let Some(s) = &sink {
                    s.play();
                    flags.paused.store(false, Ordering::SeqCst);
                }
            }
            PlayerCommand::Stop => {
                if let Some(s) = sink.take() {
                    s.stop();
                }
            }
        }
        flags.playing.store(sink.is_some(), Ordering::SeqCst);
        if sink.is_none() {
            flags.paused.store(false, Ordering::SeqCst);
        }
    }

    if let Some(s) = sink.take() {
        s.stop();
    }
}

fn open_file(path: &Path) -> Result<impl Source<Item = f32> + Send + 'static + use<>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let decoder = Decoder::new(BufReader::new(file))
        .with_context(|| format!("cannot decode {}", path.display()))?;
    Ok(decoder.convert_samples::<f32>())
}

fn start<S>(handle: &OutputStreamHandle, source: S) -> Option<Sink>
where
    S: Source<Item = f32> + Send + 'static,
{
    match Sink::try_new(handle) {
        Ok(sink) => {
            sink.append(source);
            sink.play();
            Some(sink)
        }
        Err(err) => {
            warn!(%err, "cannot open output sink");
            None
        }
    }
}
