//! Simulated client sessions
//!
//! One session owns one WebSocket connection and one simulated player. The
//! outbound tick and the inbound snapshot handler are branches of a single
//! `tokio::select!` loop, so both mutate the session state from one task and
//! never race.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::sim::{ClockSync, MovementPlanner, NavGrid, PredictionEvaluator};
use crate::util::time::{elapsed_secs, epoch_millis};
use crate::ws::client::{connect, WsStream};
use crate::ws::protocol::{ClientUpdate, GameSnapshot, GameStatus, Vector2};

/// Connection lifecycle of a simulated client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connecting,
    AwaitingIdentity,
    AwaitingGameStart,
    Active,
    Ended,
}

/// Per-session configuration, one value per simulated client.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub server_url: String,
    pub display_name: String,
    pub tick_interval: Duration,
    /// Movement speed in world units per second.
    pub move_speed: f64,
    pub rng_seed: u64,
    /// Directory for measurement logs; no logs are written when unset.
    pub output_dir: Option<PathBuf>,
}

/// Mutable per-client state. Created at connection start, dropped when the
/// session ends; only the owning task touches it.
#[derive(Debug)]
struct ClientState {
    id: String,
    last_position: Option<Vector2>,
    last_message_at: DateTime<Utc>,
    /// Wall-clock time of the most recent accepted movement, the common
    /// reference instant for prediction evaluation.
    last_position_update_at: DateTime<Utc>,
    alive: bool,
    game_started: bool,
}

/// What applying an inbound snapshot did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SnapshotOutcome {
    Continue,
    GameEnded,
}

/// One simulated connection: state machine, tick loop and snapshot handling.
pub struct ClientSession {
    config: SessionConfig,
    grid: Arc<NavGrid>,
    phase: SessionPhase,
    state: ClientState,
    planner: MovementPlanner,
    clock: ClockSync,
    evaluator: PredictionEvaluator,
    prediction_log: Option<BufWriter<File>>,
    cadence_log: Option<BufWriter<File>>,
    last_inbound_at: Option<DateTime<Utc>>,
}

impl ClientSession {
    pub fn new(config: SessionConfig, grid: Arc<NavGrid>) -> anyhow::Result<Self> {
        let (prediction_log, cadence_log) = match &config.output_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("creating output dir {}", dir.display()))?;
                let pred = File::create(dir.join(format!("pred-{}.txt", config.display_name)))?;
                let cadence =
                    File::create(dir.join(format!("cadence-{}.txt", config.display_name)))?;
                (Some(BufWriter::new(pred)), Some(BufWriter::new(cadence)))
            }
            None => (None, None),
        };

        let now = Utc::now();
        Ok(Self {
            planner: MovementPlanner::new(config.rng_seed),
            clock: ClockSync::new(),
            evaluator: PredictionEvaluator::new(config.move_speed),
            phase: SessionPhase::Connecting,
            state: ClientState {
                id: String::new(),
                last_position: None,
                last_message_at: now,
                last_position_update_at: now,
                alive: true,
                game_started: false,
            },
            grid,
            config,
            prediction_log,
            cadence_log,
            last_inbound_at: None,
        })
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Drive the session to completion. Any I/O failure ends this session
    /// only; there is no retry.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let name = self.config.display_name.clone();

        let mut ws = connect(&self.config.server_url, &name).await?;
        self.phase = SessionPhase::AwaitingIdentity;
        debug!(client = %name, "connected");

        let id = self.await_identity(&mut ws).await?;
        info!(client = %name, id = %id, "identity assigned");
        self.state.id = id;
        self.phase = SessionPhase::AwaitingGameStart;

        let mut ticker = interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let update = self.plan_outbound(Utc::now());
                    let json = serde_json::to_string(&update).context("encoding update")?;
                    if let Err(e) = ws.send(Message::Text(json)).await {
                        error!(client = %name, error = %e, "send failed, ending session");
                        break;
                    }
                }
                frame = ws.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            let now = Utc::now();
                            self.record_cadence(now);
                            match serde_json::from_str::<GameSnapshot>(&text) {
                                Ok(snapshot) => {
                                    if self.apply_snapshot(&snapshot, now) == SnapshotOutcome::GameEnded {
                                        info!(client = %name, "game ended");
                                        break;
                                    }
                                }
                                Err(e) => {
                                    warn!(client = %name, error = %e, "malformed snapshot, skipping");
                                }
                            }
                        }
                        Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                        Some(Ok(Message::Binary(_))) => {
                            warn!(client = %name, "unexpected binary frame, ignoring");
                        }
                        Some(Ok(Message::Close(_))) => {
                            info!(client = %name, "server closed connection");
                            break;
                        }
                        Some(Err(e)) => {
                            error!(client = %name, error = %e, "receive failed, ending session");
                            break;
                        }
                        None => {
                            info!(client = %name, "connection stream ended");
                            break;
                        }
                    }
                }
            }
        }

        self.phase = SessionPhase::Ended;
        self.flush_logs();
        // Completes the close handshake so in-flight sends settle before the
        // socket drops.
        let _ = ws.close(None).await;
        Ok(())
    }

    /// The first frame after the handshake is a bare JSON string with the
    /// assigned player id.
    async fn await_identity(&mut self, ws: &mut WsStream) -> anyhow::Result<String> {
        while let Some(frame) = ws.next().await {
            match frame.context("receive failed while awaiting identity")? {
                Message::Text(text) => match serde_json::from_str::<String>(&text) {
                    Ok(id) if !id.is_empty() => return Ok(id),
                    _ => warn!(
                        client = %self.config.display_name,
                        "expected identity frame, skipping"
                    ),
                },
                Message::Close(_) => anyhow::bail!("server closed before assigning identity"),
                _ => {}
            }
        }
        anyhow::bail!("connection ended before identity was assigned")
    }

    /// Build the next outbound frame: a movement update while actively
    /// playing, a heartbeat otherwise.
    fn plan_outbound(&mut self, now: DateTime<Utc>) -> ClientUpdate {
        let drift = self.clock.drift_ms();

        let movement = match self.state.last_position {
            Some(position) if self.state.game_started && self.state.alive => {
                let dt = elapsed_secs(self.state.last_message_at, now).max(0.0);
                let planned = self
                    .planner
                    .plan(position, dt, self.config.move_speed, &self.grid);
                let next = Vector2::new(
                    position.x + planned.displacement.x,
                    position.y + planned.displacement.y,
                );
                self.state.last_position = Some(next);
                self.state.last_position_update_at = now;
                Some((next, planned.direction))
            }
            _ => None,
        };
        self.state.last_message_at = now;

        let (position, direction) = match movement {
            Some((position, direction)) => (Some(position), Some(direction)),
            None => (None, None),
        };
        ClientUpdate {
            player_id: self.state.id.clone(),
            time_stamp: now,
            drift,
            position,
            direction,
        }
    }

    /// Fold an inbound snapshot into the session state, feeding the clock
    /// and the prediction evaluator.
    fn apply_snapshot(&mut self, snapshot: &GameSnapshot, now: DateTime<Utc>) -> SnapshotOutcome {
        if let Some(own) = snapshot.players.get(&self.state.id) {
            self.state.alive = own.is_alive;
            self.clock
                .update(own.drift, epoch_millis(snapshot.timestamp), epoch_millis(now));
        }

        match snapshot.status {
            GameStatus::Started => {
                if !self.state.game_started {
                    self.state.game_started = true;
                    self.phase = SessionPhase::Active;
                    if self.state.last_position.is_none() {
                        if let Some(own) = snapshot.players.get(&self.state.id) {
                            self.state.last_position = Some(own.position);
                        }
                        self.state.last_message_at = now;
                        self.state.last_position_update_at = now;
                    }
                    info!(client = %self.config.display_name, "game started");
                }
            }
            GameStatus::Ended | GameStatus::Aborted => return SnapshotOutcome::GameEnded,
            GameStatus::NotStarted => {}
        }

        if self.state.game_started {
            let reference_ms = epoch_millis(self.state.last_position_update_at);
            let samples =
                self.evaluator
                    .observe(snapshot, &self.state.id, self.clock.drift_ms(), reference_ms);
            if let Some(log) = &mut self.prediction_log {
                for sample in &samples {
                    if let Err(e) = writeln!(log, "{} {}", sample.error, sample.direction_change) {
                        warn!(
                            client = %self.config.display_name,
                            error = %e,
                            "prediction log write failed"
                        );
                        break;
                    }
                }
                let _ = log.flush();
            }
        }

        SnapshotOutcome::Continue
    }

    /// Log the gap in seconds since the previous inbound frame.
    fn record_cadence(&mut self, now: DateTime<Utc>) {
        let Some(previous) = self.last_inbound_at.replace(now) else {
            return;
        };
        if let Some(log) = &mut self.cadence_log {
            if let Err(e) = writeln!(log, "{}", elapsed_secs(previous, now)) {
                warn!(
                    client = %self.config.display_name,
                    error = %e,
                    "cadence log write failed"
                );
            }
            let _ = log.flush();
        }
    }

    fn flush_logs(&mut self) {
        if let Some(log) = &mut self.prediction_log {
            let _ = log.flush();
        }
        if let Some(log) = &mut self.cadence_log {
            let _ = log.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::PlayerSnapshot;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn test_session() -> ClientSession {
        let grid = Arc::new(
            NavGrid::load(&vec![vec![1; 64]; 64]).unwrap(),
        );
        let mut session = ClientSession::new(
            SessionConfig {
                server_url: "ws://localhost:10000/connect".to_string(),
                display_name: "client-0".to_string(),
                tick_interval: Duration::from_millis(50),
                move_speed: 120.0,
                rng_seed: 1,
                output_dir: None,
            },
            grid,
        )
        .unwrap();
        session.state.id = "me".to_string();
        session.phase = SessionPhase::AwaitingGameStart;
        session
    }

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
    }

    fn own_entry(position: Vector2, alive: bool, drift: f64) -> PlayerSnapshot {
        PlayerSnapshot {
            position,
            direction: Vector2::default(),
            is_alive: alive,
            drift,
            last_heard: at(0),
        }
    }

    fn snapshot(status: GameStatus, own: PlayerSnapshot, ts: DateTime<Utc>) -> GameSnapshot {
        let mut players = HashMap::new();
        players.insert("me".to_string(), own);
        GameSnapshot {
            status,
            timestamp: ts,
            players,
        }
    }

    #[test]
    fn sends_heartbeats_until_the_game_starts() {
        let mut session = test_session();
        let update = session.plan_outbound(at(0));
        assert!(update.is_heartbeat());
        assert_eq!(update.player_id, "me");
        assert_eq!(session.phase(), SessionPhase::AwaitingGameStart);
    }

    #[test]
    fn start_snapshot_latches_position_and_activates() {
        let mut session = test_session();
        let spawn = Vector2::new(32.0, 32.0);

        let outcome = session.apply_snapshot(
            &snapshot(GameStatus::Started, own_entry(spawn, true, 0.0), at(0)),
            at(0),
        );
        assert_eq!(outcome, SnapshotOutcome::Continue);
        assert_eq!(session.phase(), SessionPhase::Active);
        assert_eq!(session.state.last_position, Some(spawn));

        // 50ms later the tick produces a movement frame on a walkable cell.
        let update = session.plan_outbound(at(50));
        assert!(!update.is_heartbeat());
        let position = update.position.unwrap();
        assert!(session.grid.is_walkable(position.x, position.y));
        assert_eq!(session.state.last_position, Some(position));
    }

    #[test]
    fn a_second_start_snapshot_does_not_relatch() {
        let mut session = test_session();
        let spawn = Vector2::new(10.0, 10.0);
        session.apply_snapshot(
            &snapshot(GameStatus::Started, own_entry(spawn, true, 0.0), at(0)),
            at(0),
        );
        session.plan_outbound(at(50));
        let moved = session.state.last_position;

        session.apply_snapshot(
            &snapshot(GameStatus::Started, own_entry(spawn, true, 0.0), at(100)),
            at(100),
        );
        assert_eq!(session.state.last_position, moved);
    }

    #[test]
    fn ended_snapshot_is_terminal() {
        let mut session = test_session();
        let here = Vector2::new(5.0, 5.0);
        session.apply_snapshot(
            &snapshot(GameStatus::Started, own_entry(here, true, 0.0), at(0)),
            at(0),
        );

        let outcome = session.apply_snapshot(
            &snapshot(GameStatus::Ended, own_entry(here, true, 0.0), at(100)),
            at(100),
        );
        assert_eq!(outcome, SnapshotOutcome::GameEnded);

        let aborted = session.apply_snapshot(
            &snapshot(GameStatus::Aborted, own_entry(here, true, 0.0), at(150)),
            at(150),
        );
        assert_eq!(aborted, SnapshotOutcome::GameEnded);
    }

    #[test]
    fn death_falls_back_to_heartbeats() {
        let mut session = test_session();
        let here = Vector2::new(5.0, 5.0);
        session.apply_snapshot(
            &snapshot(GameStatus::Started, own_entry(here, true, 0.0), at(0)),
            at(0),
        );
        assert!(!session.plan_outbound(at(50)).is_heartbeat());

        session.apply_snapshot(
            &snapshot(GameStatus::Started, own_entry(here, false, 0.0), at(100)),
            at(100),
        );
        assert!(session.plan_outbound(at(150)).is_heartbeat());
    }

    #[test]
    fn every_snapshot_recomputes_drift() {
        let mut session = test_session();
        let here = Vector2::new(5.0, 5.0);

        // Server timestamp 80ms ahead of local receive time, echoed drift 0.
        session.apply_snapshot(
            &snapshot(GameStatus::Started, own_entry(here, true, 0.0), at(80)),
            at(0),
        );
        assert_eq!(session.clock.drift_ms(), 40.0);

        // Echoed drift now participates in the two-sample mean.
        session.apply_snapshot(
            &snapshot(GameStatus::Started, own_entry(here, true, 40.0), at(180)),
            at(100),
        );
        assert_eq!(session.clock.drift_ms(), 60.0);

        let update = session.plan_outbound(at(150));
        assert_eq!(update.drift, 60.0);
    }

    #[test]
    fn snapshot_without_own_entry_keeps_last_good_state() {
        let mut session = test_session();
        let here = Vector2::new(5.0, 5.0);
        session.apply_snapshot(
            &snapshot(GameStatus::Started, own_entry(here, true, 0.0), at(0)),
            at(0),
        );
        let drift_before = session.clock.drift_ms();

        let empty = GameSnapshot {
            status: GameStatus::Started,
            timestamp: at(100),
            players: HashMap::new(),
        };
        let outcome = session.apply_snapshot(&empty, at(100));
        assert_eq!(outcome, SnapshotOutcome::Continue);
        assert_eq!(session.clock.drift_ms(), drift_before);
        assert!(session.state.alive);
    }
}
