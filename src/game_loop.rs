use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use crate::{
    camera::FrameSource,
    cue::{Cue, CuePlayer},
    detect::MotionSource,
    display::{Color, Overlay, Scene, Screen, ESCAPE},
    error::Result,
    session::{Event, Phase, Session},
};

pub const WINDOW_TITLE: &str = "Red Light Green Light";

const START_KEY: char = 'q';
const POLL_TIMEOUT_MS: i32 = 1;

/// The outer per-frame loop: pull a frame, observe the player, tick the
/// session, react to what happened and draw the result.
pub struct Game<S, M, C, D> {
    source: S,
    motion: M,
    cues: C,
    screen: D,
    session: Session,
    stop: Arc<AtomicBool>,
    last_key: Option<char>,
}

impl<S, M, C, D> Game<S, M, C, D>
where
    S: FrameSource,
    M: MotionSource<S::Frame>,
    C: CuePlayer,
    D: Screen<S::Frame>,
{
    pub fn new(
        source: S,
        motion: M,
        cues: C,
        screen: D,
        session: Session,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Game {
            source,
            motion,
            cues,
            screen,
            session,
            stop,
            last_key: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Runs until the player quits, the stop flag is raised or the frame
    /// source dries up. Returns the final score.
    pub fn run(&mut self) -> Result<u32> {
        let result = self.run_loop();

        self.shutdown();

        result.map(|_| self.session.score())
    }

    fn run_loop(&mut self) -> Result<()> {
        while !self.stop.load(Ordering::SeqCst) {
            let now = Instant::now();
            let key = self.last_key.take();

            match self.session.phase() {
                Phase::Idle => self
                    .screen
                    .present(Scene::Intro, &Overlay::prompt("Press Q to start"))?,
                Phase::Won | Phase::Lost => self.present_result()?,
                Phase::Active => {
                    let frame = match self.source.read_frame()? {
                        Some(frame) => frame,
                        None => {
                            info!("frame source ended, leaving game loop");
                            break;
                        }
                    };

                    let observation = self.motion.observe(&frame, key)?;
                    let events = self.session.tick(observation, now);
                    self.handle_events(&events);

                    if self.session.is_active() {
                        let overlay = self.hud(now);
                        let light = self.session.light();
                        self.screen
                            .present(Scene::Live { frame: &frame, light }, &overlay)?;
                    } else {
                        self.present_result()?;
                    }
                }
            }

            match self.screen.poll_key(POLL_TIMEOUT_MS)? {
                Some(k) if k.eq_ignore_ascii_case(&START_KEY) => match self.session.phase() {
                    Phase::Idle => self.session.start(Instant::now()),
                    Phase::Won | Phase::Lost => {
                        self.cues.stop();
                        self.session.reset(Instant::now());
                    }
                    Phase::Active => {
                        info!("player quit during a round");
                        break;
                    }
                },
                Some(ESCAPE) => break,
                other => self.last_key = other,
            }
        }

        Ok(())
    }

    fn handle_events(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::CueRequested => {
                    let signal = self.session.signal().clone();
                    self.cues.start_cue(&signal);
                }
                Event::LightChanged(light) => info!("light is now {}", light),
                Event::Scored(score) => debug!("score {}", score),
                Event::Won => self.end_round(Cue::Win),
                Event::Lost => self.end_round(Cue::Lose),
            }
        }
    }

    fn end_round(&mut self, effect: Cue) {
        self.cues.stop();
        self.session.signal().clear();
        self.cues.play_effect(effect);
    }

    fn hud(&self, now: Instant) -> Overlay {
        let light = self.session.light();
        let mut overlay = Overlay::default()
            .line(format!("Light: {}", light), Color::for_light(light))
            .line(format!("Score: {}", self.session.score()), Color::White);

        if let Some(remaining) = self.session.remaining(now) {
            overlay = overlay.line(format!("Time: {}s", remaining.as_secs()), Color::Yellow);
        }

        overlay
    }

    fn present_result(&mut self) -> Result<()> {
        let scene = match self.session.phase() {
            Phase::Won => Scene::Won,
            _ => Scene::Lost,
        };

        self.screen
            .present(scene, &Overlay::prompt("Press Q to try again"))
    }

    fn shutdown(&mut self) {
        if self.cues.is_playing() {
            debug!("stopping audio before exit");
        }
        self.cues.stop();
        self.session.signal().clear();

        if let Err(e) = self.source.release() {
            warn!("failed to release frame source: {}", e);
        }
        if let Err(e) = self.screen.close() {
            warn!("failed to close window: {}", e);
        }
    }
}
