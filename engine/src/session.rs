use std::{
    path::PathBuf,
    sync::{Arc, Weak},
    time::Duration,
};

use rand::{SeedableRng, rngs::StdRng};
use supermine_common::{
    models::{Pos, RoundSummary, ScenarioParams},
    protocol::{CellUpdate, ClientMessage, ServerMessage},
};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, instrument, warn};

use crate::{
    config::Config,
    countdown::{Ticking, spawn_countdown},
    error::{GameError, RecorderError},
    generator::{BoardGenerator, write_mine_snapshot},
    logic::GameEngine,
    recorder::RoundRecorder,
};

pub type SharedSession = Arc<Mutex<Session>>;

/// Drives rounds of one scenario. Every player action and every countdown tick goes through
/// the session's mutex.
pub struct Session {
    params: ScenarioParams,
    generator: BoardGenerator,
    engine: GameEngine,
    rng: StdRng,
    recorder: Arc<RoundRecorder>,
    mines_file: PathBuf,
    tick: Duration,
    events: Option<mpsc::UnboundedSender<ServerMessage>>,
    this: Weak<Mutex<Session>>,
}

impl Session {
    pub fn create(params: ScenarioParams, config: &Config) -> SharedSession {
        Self::create_with_rng(params, config, StdRng::from_os_rng())
    }

    pub fn create_with_rng(
        params: ScenarioParams,
        config: &Config,
        mut rng: StdRng,
    ) -> SharedSession {
        let generator = BoardGenerator::from_scenario(&params);
        let recorder = Arc::new(RoundRecorder::new(&config.rounds_dir));
        let board = generator.generate(&mut rng);
        let engine = GameEngine::new(board, params.max_time, recorder.clone());
        info!(
            "Created session: {}x{} board with {} mines, {}s, supermine: {}",
            generator.size(),
            generator.size(),
            params.mines,
            params.max_time,
            params.has_supermine
        );

        Arc::new_cyclic(|this| {
            Mutex::new(Self {
                params,
                generator,
                engine,
                rng,
                recorder,
                mines_file: config.mines_file.clone(),
                tick: config.tick,
                events: None,
                this: this.clone(),
            })
        })
    }

    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    /// Subscribe to state changes. The current board is sent right away.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let _ = sender.send(self.init_message());
        self.events = Some(sender);
        receiver
    }

    /// Drops the subscriber so its receiver ends after draining pending messages.
    pub fn unsubscribe(&mut self) {
        self.events = None;
    }

    pub fn init_message(&self) -> ServerMessage {
        ServerMessage::Init {
            size: self.engine.size(),
            mines: self.engine.mines(),
            time_left: self.engine.time_left(),
            field: self.engine.board().field(),
        }
    }

    /// Dispatches a player message, reporting failures to the subscriber.
    pub fn handle(&mut self, message: ClientMessage) {
        let result = match message {
            ClientMessage::Reveal { pos } => self.reveal(pos),
            ClientMessage::Flag { pos } => self.flag(pos),
            ClientMessage::Solution => self.solution(),
            ClientMessage::Restart => {
                self.restart();
                Ok(())
            }
            ClientMessage::Rounds => match self.history() {
                Ok(rounds) => {
                    self.publish(ServerMessage::History { rounds });
                    Ok(())
                }
                Err(e) => {
                    warn!("Failed to read round history: {}", e);
                    self.publish(ServerMessage::Error {
                        message: e.to_string(),
                    });
                    Ok(())
                }
            },
        };

        if let Err(e) = result {
            debug!("Rejected player action: {}", e);
            self.publish(ServerMessage::Error {
                message: e.to_string(),
            });
        }
    }

    /// Left click. A mine under the very first attempt re-rolls the board until it is safe.
    #[instrument(level = "trace", skip(self))]
    pub fn reveal(&mut self, pos: Pos) -> Result<(), GameError> {
        let mut rerolled = false;
        while self.engine.is_unsafe_first_click(pos)? {
            debug!("First click at {} hit a mine, regenerating board", pos);
            self.new_round();
            rerolled = true;
        }
        if rerolled {
            self.publish(self.init_message());
        }

        if self.engine.attempts() == 0 && !self.engine.is_finished() {
            match write_mine_snapshot(self.engine.board(), &self.mines_file) {
                Ok(()) => debug!("Wrote mine snapshot to {}", self.mines_file.display()),
                Err(e) => warn!(
                    "Failed to write mine snapshot to {}: {}",
                    self.mines_file.display(),
                    e
                ),
            }
        }

        let updates = self.engine.add_reveal_click(pos)?;
        self.arm_countdown();
        self.publish_update(updates);
        Ok(())
    }

    #[instrument(level = "trace", skip(self))]
    pub fn flag(&mut self, pos: Pos) -> Result<(), GameError> {
        let updates = self.engine.flag_tile(pos)?;
        self.arm_countdown();
        self.publish_update(updates);
        Ok(())
    }

    #[instrument(level = "trace", skip(self))]
    pub fn solution(&mut self) -> Result<(), GameError> {
        let updates = self.engine.solution()?;
        self.publish_update(updates);
        Ok(())
    }

    /// Throws the current round away and deals a new board for the same scenario.
    pub fn restart(&mut self) {
        self.new_round();
        info!("Round restarted");
        self.publish(self.init_message());
    }

    pub fn history(&self) -> Result<Vec<RoundSummary>, RecorderError> {
        self.recorder.history()
    }

    fn new_round(&mut self) {
        let board = self.generator.generate(&mut self.rng);
        // replacing the engine drops its countdown
        self.engine = GameEngine::new(board, self.params.max_time, self.recorder.clone());
    }

    fn arm_countdown(&mut self) {
        if !self.engine.needs_countdown() {
            return;
        }
        if let Some(this) = self.this.upgrade() {
            let handle = spawn_countdown(this, self.tick);
            self.engine.attach_countdown(handle);
            debug!("Countdown started");
        }
    }

    fn publish_update(&mut self, updates: Vec<CellUpdate>) {
        let message = ServerMessage::Update {
            updates,
            status: self.engine.status(),
            attempts: self.engine.attempts(),
            marked: self.engine.marked(),
        };
        self.publish(message);
    }

    fn publish(&mut self, message: ServerMessage) {
        if let Some(sender) = &self.events
            && sender.send(message).is_err()
        {
            debug!("Event subscriber went away");
            self.events = None;
        }
    }
}

impl Ticking for Session {
    fn tick(&mut self) -> bool {
        let running = self.engine.tick();
        let message = ServerMessage::Tick {
            time_left: self.engine.time_left(),
            status: self.engine.status(),
        };
        self.publish(message);
        running
    }
}
