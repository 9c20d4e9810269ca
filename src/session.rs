use std::{
    fmt,
    time::{Duration, Instant},
};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    cue::CueSignal,
    motion::{MotionTracker, Position},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Light {
    Red,
    Green,
}

impl Light {
    pub fn flipped(self) -> Light {
        match self {
            Light::Red => Light::Green,
            Light::Green => Light::Red,
        }
    }
}

impl fmt::Display for Light {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Light::Red => write!(f, "red"),
            Light::Green => write!(f, "green"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Active,
    Won,
    Lost,
}

/// What the motion source saw during one loop iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Observation {
    Nothing,
    /// Player centroid, qualified against the previous one.
    Position(Position),
    /// Movement reported directly, e.g. by a key press.
    Moved,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// The light timer ran out; the caller should start the cue.
    CueRequested,
    LightChanged(Light),
    Scored(u32),
    Won,
    Lost,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WinRule {
    /// Win as soon as the score reaches `target`.
    Score { target: u32 },
    /// The round lasts `round`; more than `min_score` points at the end wins.
    Timed { round: Duration, min_score: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DurationRange {
    pub min: Duration,
    pub max: Duration,
}

impl DurationRange {
    pub fn from_secs(min: f64, max: f64) -> Self {
        DurationRange {
            min: Duration::from_secs_f64(min),
            max: Duration::from_secs_f64(max),
        }
    }

    pub fn draw<R: Rng>(&self, rng: &mut R) -> Duration {
        if self.max <= self.min {
            return self.min;
        }

        Duration::from_secs_f64(rng.gen_range(self.min.as_secs_f64()..=self.max.as_secs_f64()))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Rules {
    pub movement_threshold: f64,
    pub win: WinRule,
    pub light_duration: DurationRange,
}

impl Default for Rules {
    fn default() -> Self {
        Rules {
            movement_threshold: 30.0,
            win: WinRule::Score { target: 100 },
            light_duration: DurationRange::from_secs(2.0, 5.0),
        }
    }
}

/// The red/green light state machine for one player.
pub struct Session {
    phase: Phase,
    light: Light,
    score: u32,
    tracker: MotionTracker,
    light_changed_at: Instant,
    light_duration: Duration,
    round_started_at: Instant,
    signal: CueSignal,
    rules: Rules,
    rng: StdRng,
}

impl Session {
    pub fn new(rules: Rules, signal: CueSignal, now: Instant) -> Self {
        Self::with_rng(rules, signal, StdRng::from_entropy(), now)
    }

    pub fn with_rng(rules: Rules, signal: CueSignal, mut rng: StdRng, now: Instant) -> Self {
        let light_duration = rules.light_duration.draw(&mut rng);

        Session {
            phase: Phase::Idle,
            light: Light::Red,
            score: 0,
            tracker: MotionTracker::new(rules.movement_threshold),
            light_changed_at: now,
            light_duration,
            round_started_at: now,
            signal,
            rules,
            rng,
        }
    }

    /// Leaves the idle screen. Does nothing once a round has been played.
    pub fn start(&mut self, now: Instant) {
        if self.phase == Phase::Idle {
            self.reset(now);
        }
    }

    pub fn reset(&mut self, now: Instant) {
        self.phase = Phase::Active;
        self.light = Light::Red;
        self.score = 0;
        self.tracker.clear();
        self.signal.clear();
        self.light_changed_at = now;
        self.light_duration = self.rules.light_duration.draw(&mut self.rng);
        self.round_started_at = now;

        debug!(
            "round started\tlight {}\tduration {}ms",
            self.light,
            self.light_duration.as_millis()
        );
    }

    pub fn tick(&mut self, observation: Observation, now: Instant) -> Vec<Event> {
        let mut events = Vec::new();

        if self.phase != Phase::Active {
            return events;
        }

        if let WinRule::Timed { round, min_score } = self.rules.win {
            if now.saturating_duration_since(self.round_started_at) >= round {
                let event = self.finish(self.score > min_score);
                events.push(event);
                return events;
            }
        }

        if !self.signal.is_playing()
            && !self.signal.is_pending()
            && now.saturating_duration_since(self.light_changed_at) > self.light_duration
        {
            self.signal.begin();
            events.push(Event::CueRequested);
        }

        if self.signal.take_pending() {
            self.light = self.light.flipped();
            self.tracker.clear();
            self.light_changed_at = now;
            self.light_duration = self.rules.light_duration.draw(&mut self.rng);

            debug!(
                "light changed\tlight {}\tduration {}ms",
                self.light,
                self.light_duration.as_millis()
            );
            events.push(Event::LightChanged(self.light));
        }

        let moved = match observation {
            Observation::Nothing => false,
            Observation::Position(position) => self.tracker.observe(position),
            Observation::Moved => true,
        };

        if moved {
            match self.light {
                Light::Red => events.push(self.finish(false)),
                Light::Green => {
                    self.score += 1;
                    events.push(Event::Scored(self.score));

                    if let WinRule::Score { target } = self.rules.win {
                        if self.score >= target {
                            events.push(self.finish(true));
                        }
                    }
                }
            }
        }

        events
    }

    fn finish(&mut self, won: bool) -> Event {
        info!("round over\twon {}\tscore {}", won, self.score);

        if won {
            self.phase = Phase::Won;
            Event::Won
        } else {
            self.phase = Phase::Lost;
            Event::Lost
        }
    }

    /// Time left in a timed round, `None` under a score rule or outside a round.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        match self.rules.win {
            WinRule::Timed { round, .. } if self.phase == Phase::Active => {
                Some(round.saturating_sub(now.saturating_duration_since(self.round_started_at)))
            }
            _ => None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn light(&self) -> Light {
        self.light
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_started(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    pub fn last_position(&self) -> Option<Position> {
        self.tracker.last()
    }

    pub fn light_duration(&self) -> Duration {
        self.light_duration
    }

    pub fn signal(&self) -> &CueSignal {
        &self.signal
    }
}
