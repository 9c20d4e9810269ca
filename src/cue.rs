use std::{
    fs,
    io::{self, Cursor},
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use flume::Receiver;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rodio::{decoder::DecoderError, Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const STOP_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Default)]
struct CueFlags {
    playing: AtomicBool,
    pending: AtomicBool,
}

/// Flags shared between the game loop and whichever thread plays the light
/// cue. The loop calls `begin`, `take_pending` and `clear`; the audio side
/// only ever calls `finish`.
#[derive(Clone, Default)]
pub struct CueSignal(Arc<CueFlags>);

impl CueSignal {
    pub fn begin(&self) {
        self.0.pending.store(false, Ordering::SeqCst);
        self.0.playing.store(true, Ordering::SeqCst);
    }

    /// Ends playback. A cue that ran to completion leaves a light flip pending.
    pub fn finish(&self, completed: bool) {
        if completed {
            self.0.pending.store(true, Ordering::SeqCst);
        }
        self.0.playing.store(false, Ordering::SeqCst);
    }

    pub fn take_pending(&self) -> bool {
        self.0.pending.swap(false, Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.0.playing.store(false, Ordering::SeqCst);
        self.0.pending.store(false, Ordering::SeqCst);
    }

    pub fn is_playing(&self) -> bool {
        self.0.playing.load(Ordering::SeqCst)
    }

    pub fn is_pending(&self) -> bool {
        self.0.pending.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    /// The song whose end flips the light.
    Song,
    Win,
    Lose,
}

impl Cue {
    pub fn file_name(&self) -> &'static str {
        match self {
            Cue::Song => "RLGLsong.mp3",
            Cue::Win => "squidWin.mp3",
            Cue::Lose => "kill.mp3",
        }
    }
}

#[derive(clap::ArgEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Play the cue on the game loop thread.
    Blocking,
    /// Play the cue on a worker thread at normal speed.
    FixedRate,
    /// Play the cue on a worker thread at a random speed.
    VariableRate,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedRange {
    pub min: f32,
    pub max: f32,
}

impl Default for SpeedRange {
    fn default() -> Self {
        SpeedRange { min: 1.0, max: 2.0 }
    }
}

impl SpeedRange {
    pub fn draw<R: Rng>(&self, rng: &mut R) -> f32 {
        if self.max <= self.min {
            return self.min;
        }

        rng.gen_range(self.min..=self.max)
    }
}

impl PlaybackMode {
    pub fn rate<R: Rng>(&self, speed: &SpeedRange, rng: &mut R) -> f32 {
        match self {
            PlaybackMode::Blocking | PlaybackMode::FixedRate => 1.0,
            PlaybackMode::VariableRate => speed.draw(rng),
        }
    }
}

pub trait CuePlayer {
    /// Starts the light cue. Completion is reported through `signal`.
    fn start_cue(&mut self, signal: &CueSignal);
    /// Stops any running cue and plays a one-off effect.
    fn play_effect(&mut self, cue: Cue);
    fn is_playing(&self) -> bool;
    fn stop(&mut self);
}

/// Encoded audio assets, read once at startup.
#[derive(Clone)]
pub struct CueLibrary {
    song: Arc<[u8]>,
    win: Arc<[u8]>,
    lose: Arc<[u8]>,
}

impl CueLibrary {
    pub fn load(dir: &Path) -> Result<CueLibrary> {
        Ok(CueLibrary {
            song: load_cue(dir, Cue::Song)?,
            win: load_cue(dir, Cue::Win)?,
            lose: load_cue(dir, Cue::Lose)?,
        })
    }

    pub fn decoder(
        &self,
        cue: Cue,
    ) -> std::result::Result<Decoder<Cursor<Arc<[u8]>>>, DecoderError> {
        let bytes = match cue {
            Cue::Song => self.song.clone(),
            Cue::Win => self.win.clone(),
            Cue::Lose => self.lose.clone(),
        };

        Decoder::new(Cursor::new(bytes))
    }
}

fn load_cue(dir: &Path, cue: Cue) -> Result<Arc<[u8]>> {
    let path = dir.join(cue.file_name());
    let bytes: Arc<[u8]> = fs::read(&path).map_err(|e| Error::asset(&path, e))?.into();

    Decoder::new(Cursor::new(bytes.clone())).map_err(|e| Error::asset(&path, e))?;
    debug!("loaded cue {}\t{} bytes", path.display(), bytes.len());

    Ok(bytes)
}

/// Thread that waits for a light cue to end and reports it to the signal.
struct Worker {
    stop: Arc<AtomicBool>,
    done: Receiver<()>,
}

impl Worker {
    /// Polls `playing` until it reports the end of the cue or the worker is
    /// stopped. Only a cue that ran out on its own leaves a flip pending.
    fn spawn<P>(playing: P, signal: CueSignal) -> io::Result<Worker>
    where
        P: Fn() -> bool + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let (done_sender, done) = flume::bounded(1);
        let worker_stop = stop.clone();

        thread::Builder::new()
            .name("cue".to_string())
            .spawn(move || {
                while !worker_stop.load(Ordering::SeqCst) && playing() {
                    thread::sleep(POLL_INTERVAL);
                }

                signal.finish(!worker_stop.load(Ordering::SeqCst));
                let _ = done_sender.send(());
            })?;

        Ok(Worker { stop, done })
    }

    fn is_running(&self) -> bool {
        self.done.is_empty()
    }

    /// Returns false if the worker did not report back within `timeout`.
    fn stop(&self, timeout: Duration) -> bool {
        self.stop.store(true, Ordering::SeqCst);
        self.done.recv_timeout(timeout).is_ok()
    }
}

struct PlayingCue {
    sink: Arc<Sink>,
    worker: Worker,
}

/// rodio-backed cue player.
pub struct Speaker {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    library: CueLibrary,
    mode: PlaybackMode,
    speed: SpeedRange,
    cue: Option<PlayingCue>,
    effect: Option<Sink>,
    rng: StdRng,
}

impl Speaker {
    pub fn new(library: CueLibrary, mode: PlaybackMode, speed: SpeedRange) -> Result<Speaker> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| Error::Audio(e.to_string()))?;

        Ok(Speaker {
            _stream: stream,
            handle,
            library,
            mode,
            speed,
            cue: None,
            effect: None,
            rng: StdRng::from_entropy(),
        })
    }

    fn cue_sink(&self, cue: Cue, rate: f32) -> std::result::Result<Sink, String> {
        let sink = Sink::try_new(&self.handle).map_err(|e| e.to_string())?;
        let source = self.library.decoder(cue).map_err(|e| e.to_string())?;

        sink.append(source.speed(rate));

        Ok(sink)
    }

    fn stop_cue(&mut self) {
        if let Some(cue) = self.cue.take() {
            cue.sink.stop();

            if !cue.worker.stop(STOP_TIMEOUT) {
                warn!("cue worker did not stop within {}ms", STOP_TIMEOUT.as_millis());
            }
        }
    }
}

impl CuePlayer for Speaker {
    fn start_cue(&mut self, signal: &CueSignal) {
        if let Some(sink) = self.effect.take() {
            sink.stop();
        }

        if self.cue.as_ref().map_or(false, |c| c.worker.is_running()) {
            warn!("cue requested while another one is playing, stopping it");
            self.stop_cue();
            // the stopped worker reported on the same signal
            signal.begin();
        }
        self.cue = None;

        let rate = self.mode.rate(&self.speed, &mut self.rng);
        debug!("starting cue\tmode {:?}\trate {:.2}", self.mode, rate);

        let sink = match self.cue_sink(Cue::Song, rate) {
            Ok(sink) => sink,
            Err(e) => {
                warn!("cue playback failed: {}", e);
                signal.finish(true);
                return;
            }
        };

        match self.mode {
            PlaybackMode::Blocking => {
                sink.sleep_until_end();
                signal.finish(true);
            }
            PlaybackMode::FixedRate | PlaybackMode::VariableRate => {
                let sink = Arc::new(sink);
                let worker_sink = sink.clone();

                match Worker::spawn(move || !worker_sink.empty(), signal.clone()) {
                    Ok(worker) => self.cue = Some(PlayingCue { sink, worker }),
                    Err(e) => {
                        warn!("cue worker failed to start: {}", e);
                        sink.stop();
                        signal.finish(true);
                    }
                }
            }
        }
    }

    fn play_effect(&mut self, cue: Cue) {
        self.stop();

        let sink = match self.cue_sink(cue, 1.0) {
            Ok(sink) => sink,
            Err(e) => {
                warn!("effect {:?} failed: {}", cue, e);
                return;
            }
        };

        if self.mode == PlaybackMode::Blocking {
            sink.sleep_until_end();
        } else {
            self.effect = Some(sink);
        }
    }

    fn is_playing(&self) -> bool {
        let cue = self
            .cue
            .as_ref()
            .map_or(false, |c| !c.sink.empty() && c.worker.is_running());
        let effect = self.effect.as_ref().map_or(false, |s| !s.empty());

        cue || effect
    }

    fn stop(&mut self) {
        self.stop_cue();

        if let Some(sink) = self.effect.take() {
            sink.stop();
        }
    }
}

impl Drop for Speaker {
    fn drop(&mut self) {
        self.stop();
    }
}
