use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::available_parallelism,
    time::{Duration, Instant},
};

use clap::Parser;
use opencv::core::{get_num_threads, set_num_threads};

use crate::{
    camera::Camera,
    cue::{CueLibrary, CueSignal, PlaybackMode, Speaker, SpeedRange},
    detect::{dnn::make_person_detector, KeyboardMotion, PersonMotion},
    display::{Backdrop, HighGui},
    error::{Error, Result},
    game_loop::{Game, WINDOW_TITLE},
    img::SceneImages,
    session::{DurationRange, Rules, Session, WinRule},
};

extern crate pretty_env_logger;
#[macro_use]
extern crate log;

pub mod camera;
pub mod cue;
pub mod detect;
pub mod display;
pub mod error;
pub mod game_loop;
pub mod img;
pub mod motion;
pub mod session;

#[derive(clap::ArgEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameMode {
    /// Track the player with the person detector.
    Camera,
    /// Count presses of the W key as movement in a timed round.
    Keyboard,
}

/// Red Light, Green Light
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Config {
    /// Index of the camera device.
    #[clap(short, long, default_value_t = 0)]
    pub camera: i32,

    #[clap(short, long, arg_enum, default_value = "camera")]
    pub mode: GameMode,

    /// How the light cue is played.
    #[clap(short, long, arg_enum, default_value = "variable-rate")]
    pub playback: PlaybackMode,

    /// Detection model weights.
    #[clap(long, parse(from_os_str), default_value = "models/yolov4-tiny.weights")]
    pub model: PathBuf,

    /// Detection model network description.
    #[clap(long, parse(from_os_str), default_value = "models/yolov4-tiny.cfg")]
    pub model_config: PathBuf,

    #[clap(long, default_value_t = 0.5)]
    pub confidence: f32,

    /// Run the detector on CUDA.
    #[clap(long)]
    pub cuda: bool,

    #[clap(long, parse(from_os_str), default_value = "frames")]
    pub frames_dir: PathBuf,

    #[clap(long, parse(from_os_str), default_value = "sounds")]
    pub sounds_dir: PathBuf,

    /// Centroid displacement, in pixels, that counts as movement.
    #[clap(long, default_value_t = 30.0)]
    pub movement_threshold: f64,

    #[clap(long, default_value_t = 100)]
    pub win_score: u32,

    #[clap(long, default_value_t = 2.0)]
    pub min_light_secs: f64,

    #[clap(long, default_value_t = 5.0)]
    pub max_light_secs: f64,

    #[clap(long, default_value_t = 1.0)]
    pub min_speed: f32,

    #[clap(long, default_value_t = 2.0)]
    pub max_speed: f32,

    /// Round length in keyboard mode.
    #[clap(long, default_value_t = 10)]
    pub round_secs: u64,

    /// Keyboard mode is won with more points than this.
    #[clap(long, default_value_t = 15)]
    pub min_score: u32,

    #[clap(long, default_value_t = 0)]
    pub num_opencv_threads: i32,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        let floats = [
            ("min-light-secs", self.min_light_secs),
            ("max-light-secs", self.max_light_secs),
            ("min-speed", self.min_speed as f64),
            ("max-speed", self.max_speed as f64),
            ("movement-threshold", self.movement_threshold),
            ("confidence", self.confidence as f64),
        ];
        if let Some((name, value)) = floats.iter().find(|(_, v)| !v.is_finite()) {
            return Err(Error::Config(format!("{} must be a finite number, got {}", name, value)));
        }

        if self.min_light_secs < 0. || self.min_light_secs > self.max_light_secs {
            return Err(Error::Config(format!(
                "light duration range {}..{} is invalid",
                self.min_light_secs, self.max_light_secs
            )));
        }

        if self.min_speed <= 0. || self.min_speed > self.max_speed {
            return Err(Error::Config(format!(
                "speed range {}..{} is invalid",
                self.min_speed, self.max_speed
            )));
        }

        if self.movement_threshold < 0. {
            return Err(Error::Config("movement threshold must not be negative".to_string()));
        }

        if !(0. ..=1.).contains(&self.confidence) {
            return Err(Error::Config("confidence must be within 0..1".to_string()));
        }

        if self.win_score == 0 || self.round_secs == 0 {
            return Err(Error::Config("win score and round length must be positive".to_string()));
        }

        Ok(())
    }

    pub fn rules(&self) -> Rules {
        let win = match self.mode {
            GameMode::Camera => WinRule::Score {
                target: self.win_score,
            },
            GameMode::Keyboard => WinRule::Timed {
                round: Duration::from_secs(self.round_secs),
                min_score: self.min_score,
            },
        };

        Rules {
            movement_threshold: self.movement_threshold,
            win,
            light_duration: DurationRange::from_secs(self.min_light_secs, self.max_light_secs),
        }
    }

    pub fn speed_range(&self) -> SpeedRange {
        SpeedRange {
            min: self.min_speed,
            max: self.max_speed,
        }
    }
}

pub async fn start() -> Result<u32> {
    pretty_env_logger::init_timed();

    let mut config = Config::parse();
    config.validate()?;

    configure_opencv(&mut config)?;

    let stop = Arc::new(AtomicBool::new(false));
    let ctrl_c_stop = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, stopping game");
            ctrl_c_stop.store(true, Ordering::SeqCst);
        }
    });

    let score = tokio::task::block_in_place(|| run(&config, stop))?;

    println!("Game Over! Your Score: {}", score);

    Ok(score)
}

fn configure_opencv(config: &mut Config) -> Result<()> {
    if config.num_opencv_threads == 0 {
        let total_threads = available_parallelism().map_or(1, |n| n.get()) as i32 / 2;
        config.num_opencv_threads = total_threads.max(1);
    }

    if !opencv::core::use_optimized()? {
        debug!("changing opencv to use optimized code");
        opencv::core::set_use_optimized(true)?;
    } else {
        debug!("opencv is using optimized code")
    }

    set_num_threads(config.num_opencv_threads)?;

    let opencv_threads = get_num_threads()?;
    debug!("opencv is using {} threads", opencv_threads);

    Ok(())
}

fn run(config: &Config, stop: Arc<AtomicBool>) -> Result<u32> {
    let images = SceneImages::load(&config.frames_dir)?;
    let library = CueLibrary::load(&config.sounds_dir)?;
    let camera = Camera::open(config.camera)?;
    let speaker = Speaker::new(library, config.playback, config.speed_range())?;
    let session = Session::new(config.rules(), CueSignal::default(), Instant::now());

    info!(
        "starting {:?} game\tplayback {:?}\tcamera {}",
        config.mode,
        config.playback,
        camera.device()
    );

    match config.mode {
        GameMode::Camera => {
            let detector = make_person_detector(
                &config.model,
                &config.model_config,
                config.confidence,
                config.cuda,
            )?;
            let screen = HighGui::new(WINDOW_TITLE, images, Backdrop::Camera)?;
            let motion = PersonMotion::new(detector);

            Game::new(camera, motion, speaker, screen, session, stop).run()
        }
        GameMode::Keyboard => {
            let screen = HighGui::new(WINDOW_TITLE, images, Backdrop::Lights)?;
            let motion = KeyboardMotion::default();

            Game::new(camera, motion, speaker, screen, session, stop).run()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["red-light"];
        argv.extend_from_slice(args);

        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_describe_the_camera_game() {
        let config = parse(&[]);

        assert_eq!(config.mode, GameMode::Camera);
        assert_eq!(config.playback, PlaybackMode::VariableRate);
        assert!(config.validate().is_ok());
        assert_eq!(config.rules(), Rules::default());
    }

    #[test]
    fn keyboard_mode_plays_a_timed_round() {
        let config = parse(&["--mode", "keyboard", "--playback", "blocking"]);

        assert_eq!(config.playback, PlaybackMode::Blocking);
        assert_eq!(
            config.rules().win,
            WinRule::Timed {
                round: Duration::from_secs(10),
                min_score: 15
            }
        );
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        let config = parse(&["--min-light-secs", "6", "--max-light-secs", "5"]);
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = parse(&["--min-speed", "0"]);
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = parse(&["--confidence", "1.5"]);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        let cases: &[&[&str]] = &[
            &["--min-light-secs", "NaN"],
            &["--max-light-secs", "inf"],
            &["--min-speed", "NaN"],
            &["--max-speed", "inf"],
            &["--movement-threshold", "NaN"],
            &["--confidence", "NaN"],
        ];

        for args in cases {
            let config = parse(args);
            assert!(
                matches!(config.validate(), Err(Error::Config(_))),
                "{:?} was accepted",
                args
            );
        }
    }

    #[test]
    fn unknown_modes_fail_to_parse() {
        assert!(Config::try_parse_from(["red-light", "--mode", "mouse"]).is_err());
    }
}
