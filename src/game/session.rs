//! Session state and authoritative tick loop

use dashmap::DashMap;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::AbortHandle;
use tokio::time::interval;
use tracing::{debug, error, info};

use crate::store::results::{MatchResult, ResultRecorder};
use crate::util::time::{tick_duration, ticks_for_millis, SERVE_DELAY_MS};
use crate::ws::protocol::{FinishReason, ServerMsg};

use super::physics::{Ball, Paddles, PhysicsSystem};
use super::scoring::{ScoreOutcome, Scoreboard};
use super::snapshot::SnapshotBuilder;
use super::{ConnectionId, IntentCell, PaddleIntent, SessionId, Side};

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Ball in flight, paddles follow intent
    Active,
    /// Ball held at center until the serve delay runs out
    Serving { ticks_remaining: u32 },
    /// Terminal
    Finished { winner: Side, reason: FinishReason },
}

/// Point-in-time transitions produced by a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A point was scored; the announced round is served after the delay
    RoundStarted { round: u32 },
    /// The match is over
    Finished { winner: Side, reason: FinishReason },
}

/// What a disconnecting member means for a running session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisconnectPolicy {
    /// The remaining member wins immediately
    #[default]
    Forfeit,
    /// The departed paddle stops moving and play continues
    Freeze,
}

/// Mutable match state (owned by the session task)
pub struct SessionState {
    pub id: SessionId,
    pub left: ConnectionId,
    pub right: ConnectionId,
    pub ball: Ball,
    pub paddles: Paddles,
    pub scores: Scoreboard,
    pub round: u32,
    pub phase: SessionPhase,
    pub serve_delay_ticks: u32,
    rng: ChaCha8Rng,
}

impl SessionState {
    pub fn new(left: ConnectionId, right: ConnectionId, seed: u64) -> Self {
        Self {
            id: SessionId::from_members(left, right),
            left,
            right,
            ball: Ball::opening(),
            paddles: Paddles::default(),
            scores: Scoreboard::default(),
            round: 1,
            phase: SessionPhase::Active,
            serve_delay_ticks: ticks_for_millis(SERVE_DELAY_MS),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn member(&self, side: Side) -> ConnectionId {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn side_of(&self, id: ConnectionId) -> Option<Side> {
        if id == self.left {
            Some(Side::Left)
        } else if id == self.right {
            Some(Side::Right)
        } else {
            None
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, SessionPhase::Finished { .. })
    }

    /// Advance the session by one tick
    pub fn tick(&mut self, left_intent: PaddleIntent, right_intent: PaddleIntent) -> Option<SessionEvent> {
        match self.phase {
            SessionPhase::Finished { .. } => None,
            SessionPhase::Serving { ticks_remaining } => {
                if ticks_remaining <= 1 {
                    self.serve();
                } else {
                    self.phase = SessionPhase::Serving {
                        ticks_remaining: ticks_remaining - 1,
                    };
                }
                None
            }
            SessionPhase::Active => {
                let scorer = PhysicsSystem::step(
                    &mut self.ball,
                    &mut self.paddles,
                    left_intent,
                    right_intent,
                )?;
                Some(self.point_scored(scorer))
            }
        }
    }

    /// End the match in favour of the member who stayed
    pub fn forfeit(&mut self, leaver: ConnectionId) -> Option<SessionEvent> {
        if self.is_finished() {
            return None;
        }
        let winner = self.side_of(leaver)?.opponent();
        let reason = FinishReason::Forfeit;
        self.phase = SessionPhase::Finished { winner, reason };
        Some(SessionEvent::Finished { winner, reason })
    }

    /// Outcome record for persistence; `None` until finished
    pub fn result(&self) -> Option<MatchResult> {
        match self.phase {
            SessionPhase::Finished { winner, .. } => Some(MatchResult::new(
                self.left,
                self.right,
                self.member(winner),
                self.scores.left,
                self.scores.right,
            )),
            _ => None,
        }
    }

    fn point_scored(&mut self, scorer: Side) -> SessionEvent {
        match self.scores.award(scorer) {
            ScoreOutcome::Won(winner) => {
                let reason = FinishReason::Score;
                self.phase = SessionPhase::Finished { winner, reason };
                SessionEvent::Finished { winner, reason }
            }
            ScoreOutcome::Continue => {
                self.ball = Ball::held();
                self.phase = SessionPhase::Serving {
                    ticks_remaining: self.serve_delay_ticks,
                };
                SessionEvent::RoundStarted { round: self.round }
            }
        }
    }

    fn serve(&mut self) {
        self.round += 1;
        let rightward = self.rng.gen_bool(0.5);
        let downward = self.rng.gen_bool(0.5);
        self.ball.launch(rightward, downward);
        self.phase = SessionPhase::Active;
    }
}

/// Messages delivered to a running session from outside its task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionControl {
    /// A member's connection went away
    MemberLeft(ConnectionId),
}

/// Handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub id: SessionId,
    pub members: [ConnectionId; 2],
    pub control_tx: mpsc::Sender<SessionControl>,
    pub events_tx: broadcast::Sender<ServerMsg>,
    abort: Arc<Mutex<Option<AbortHandle>>>,
}

impl SessionHandle {
    /// Join this session's broadcast channel
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.events_tx.subscribe()
    }

    /// Attach the task running this session so it can be stopped
    pub fn attach(&self, handle: AbortHandle) {
        *self.abort.lock() = Some(handle);
    }

    /// Stop the tick task. Safe to call any number of times.
    pub fn stop(&self) -> bool {
        match self.abort.lock().take() {
            Some(handle) => {
                handle.abort();
                info!(session_id = %self.id, "Session stopped");
                true
            }
            None => false,
        }
    }

    /// Whether both handles point at the same running session.
    /// Ids repeat when the same pair is matched again.
    pub fn same_session(&self, other: &SessionHandle) -> bool {
        Arc::ptr_eq(&self.abort, &other.abort)
    }

    /// Forward a control message; a finished session ignores it
    pub fn notify(&self, control: SessionControl) {
        if self.control_tx.try_send(control).is_err() {
            debug!(session_id = %self.id, ?control, "Session no longer accepting control messages");
        }
    }
}

/// Registry of all running sessions
pub struct SessionRegistry {
    sessions: DashMap<SessionId, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn get(&self, id: &SessionId) -> Option<SessionHandle> {
        self.sessions.get(id).map(|s| s.value().clone())
    }

    pub fn insert(&self, handle: SessionHandle) {
        self.sessions.insert(handle.id.clone(), handle);
    }

    /// Remove `handle`'s entry unless a newer session took over its id
    pub fn remove_handle(&self, handle: &SessionHandle) -> bool {
        self.sessions
            .remove_if(&handle.id, |_, current| current.same_session(handle))
            .is_some()
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Stop every running session
    pub fn stop_all(&self) {
        for entry in self.sessions.iter() {
            entry.value().stop();
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The authoritative session
pub struct GameSession {
    state: SessionState,
    intents: [IntentCell; 2],
    departed: [bool; 2],
    policy: DisconnectPolicy,
    control_rx: mpsc::Receiver<SessionControl>,
    events_tx: broadcast::Sender<ServerMsg>,
    snapshot_builder: SnapshotBuilder,
    recorder: Arc<dyn ResultRecorder>,
}

impl GameSession {
    /// Create a new session for a pairing
    pub fn new(
        state: SessionState,
        intents: [IntentCell; 2],
        policy: DisconnectPolicy,
        recorder: Arc<dyn ResultRecorder>,
    ) -> (Self, SessionHandle) {
        let (control_tx, control_rx) = mpsc::channel(8);
        let (events_tx, _) = broadcast::channel(64);

        let handle = SessionHandle {
            id: state.id.clone(),
            members: [state.left, state.right],
            control_tx,
            events_tx: events_tx.clone(),
            abort: Arc::new(Mutex::new(None)),
        };

        let session = Self {
            snapshot_builder: SnapshotBuilder::new(state.left, state.right),
            state,
            intents,
            departed: [false; 2],
            policy,
            control_rx,
            events_tx,
            recorder,
        };

        (session, handle)
    }

    /// Run the tick loop until the match finishes or both members are gone
    pub async fn run(mut self) {
        info!(session_id = %self.state.id, "Session started");

        let mut tick_interval = interval(tick_duration());
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    let event = self.state.tick(self.intents[0].load(), self.intents[1].load());

                    // Snapshot goes out every tick, transition or not
                    self.broadcast(self.snapshot_builder.game_state(&self.state));

                    if let Some(event) = event {
                        self.handle_event(event);
                    }
                }
                Some(control) = self.control_rx.recv() => {
                    self.handle_control(control);
                }
            }

            if self.state.is_finished() {
                break;
            }

            if self.departed == [true, true] {
                info!(session_id = %self.state.id, "Both members left, stopping session");
                break;
            }
        }
    }

    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::RoundStarted { round } => {
                info!(
                    session_id = %self.state.id,
                    round,
                    left_score = self.state.scores.left,
                    right_score = self.state.scores.right,
                    "Point scored, serving next round"
                );
                self.broadcast(ServerMsg::RoundStart { round });
            }
            SessionEvent::Finished { winner, reason } => {
                self.finish(winner, reason);
            }
        }
    }

    fn handle_control(&mut self, control: SessionControl) {
        match control {
            SessionControl::MemberLeft(id) => {
                let Some(side) = self.state.side_of(id) else {
                    return;
                };
                let idx = match side {
                    Side::Left => 0,
                    Side::Right => 1,
                };
                self.departed[idx] = true;
                info!(session_id = %self.state.id, connection_id = %id, policy = ?self.policy, "Member left session");

                match self.policy {
                    DisconnectPolicy::Forfeit => {
                        if let Some(SessionEvent::Finished { winner, reason }) = self.state.forfeit(id) {
                            self.finish(winner, reason);
                        }
                    }
                    DisconnectPolicy::Freeze => {
                        self.intents[idx].store(PaddleIntent::None);
                    }
                }
            }
        }
    }

    /// Terminal side effects: notify clients, then hand off the result
    fn finish(&mut self, winner: Side, reason: FinishReason) {
        let winner_id = self.state.member(winner);
        info!(
            session_id = %self.state.id,
            winner = %winner_id,
            ?reason,
            left_score = self.state.scores.left,
            right_score = self.state.scores.right,
            "Match finished"
        );

        self.broadcast(self.snapshot_builder.game_over(&self.state, winner_id, reason));

        if let Some(result) = self.state.result() {
            let recorder = self.recorder.clone();
            let session_id = self.state.id.clone();
            tokio::spawn(async move {
                match recorder.record(result).await {
                    Ok(()) => info!(session_id = %session_id, "Match result recorded"),
                    Err(e) => error!(session_id = %session_id, error = %e, "Failed to record match result"),
                }
            });
        }
    }

    fn broadcast(&self, msg: ServerMsg) {
        // No receivers is fine: state is fire-and-forget per tick
        let _ = self.events_tx.send(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::physics::{FIELD_HEIGHT, FIELD_WIDTH, SERVE_SPEED};
    use crate::game::scoring::WIN_SCORE;
    use crate::store::results::testing::{FailingRecorder, MemoryRecorder};
    use std::time::Duration;
    use tokio::time::timeout;
    use uuid::Uuid;

    fn new_state() -> SessionState {
        SessionState::new(Uuid::new_v4(), Uuid::new_v4(), 7)
    }

    /// Put the ball one tick from passing the left goal line with the left paddle out of the way
    fn set_up_left_miss(state: &mut SessionState) {
        state.ball = Ball { x: 0.0, y: 50.0, dx: -2.0, dy: 0.0 };
        state.paddles.left = 70.0;
    }

    fn run_until_active(state: &mut SessionState) -> u32 {
        let mut ticks = 0;
        while matches!(state.phase, SessionPhase::Serving { .. }) {
            assert_eq!(state.tick(PaddleIntent::None, PaddleIntent::None), None);
            ticks += 1;
        }
        ticks
    }

    #[test]
    fn new_session_starts_active_with_opening_ball() {
        let state = new_state();
        assert_eq!(state.phase, SessionPhase::Active);
        assert_eq!(state.round, 1);
        assert_eq!(state.ball, Ball::opening());
        assert_eq!(state.scores, Scoreboard::default());
        assert_ne!(state.left, state.right);
    }

    #[test]
    fn paddle_return_keeps_rally_going() {
        let mut state = new_state();
        state.ball = Ball { x: 0.0, y: 50.0, dx: -2.0, dy: 0.0 };
        state.paddles.left = 40.0;

        assert_eq!(state.tick(PaddleIntent::None, PaddleIntent::None), None);
        assert!(state.ball.dx > 0.0);
        assert!(state.ball.x >= 0.0);
        assert_eq!(state.phase, SessionPhase::Active);
    }

    #[test]
    fn missed_ball_scores_and_enters_serving() {
        let mut state = new_state();
        set_up_left_miss(&mut state);

        let event = state.tick(PaddleIntent::None, PaddleIntent::None);

        assert_eq!(event, Some(SessionEvent::RoundStarted { round: 1 }));
        assert_eq!(state.round, 1);
        assert_eq!(state.scores.right, 1);
        assert_eq!(state.scores.left, 0);
        assert!(matches!(state.phase, SessionPhase::Serving { .. }));
        assert_eq!(state.ball, Ball::held());
    }

    #[test]
    fn ball_and_paddles_are_frozen_while_serving() {
        let mut state = new_state();
        set_up_left_miss(&mut state);
        state.tick(PaddleIntent::None, PaddleIntent::None);

        let paddles = state.paddles;
        state.tick(PaddleIntent::Up, PaddleIntent::Down);
        assert_eq!(state.paddles, paddles);
        assert_eq!(state.ball, Ball::held());
    }

    #[test]
    fn serve_launches_after_delay_with_fixed_speed_every_round() {
        let mut state = new_state();

        for round in 0..4 {
            set_up_left_miss(&mut state);
            let announced = state.tick(PaddleIntent::None, PaddleIntent::None);
            assert_eq!(announced, Some(SessionEvent::RoundStarted { round: round + 1 }));

            let waited = run_until_active(&mut state);
            assert_eq!(waited, state.serve_delay_ticks);
            assert_eq!(state.ball.x, FIELD_WIDTH / 2.0);
            assert_eq!(state.ball.y, FIELD_HEIGHT / 2.0);
            assert_eq!(state.ball.dx.abs(), SERVE_SPEED);
            assert_eq!(state.ball.dy.abs(), SERVE_SPEED);
            assert_eq!(state.round, round + 2);
        }
    }

    #[test]
    fn serve_directions_vary_with_seed() {
        let mut seen = std::collections::HashSet::new();
        for seed in 0..32 {
            let mut state = SessionState::new(Uuid::new_v4(), Uuid::new_v4(), seed);
            set_up_left_miss(&mut state);
            state.tick(PaddleIntent::None, PaddleIntent::None);
            run_until_active(&mut state);
            seen.insert((state.ball.dx > 0.0, state.ball.dy > 0.0));
        }
        assert!(seen.len() > 1);
    }

    #[test]
    fn first_to_five_finishes_match() {
        let mut state = new_state();
        state.scores = Scoreboard { left: 4, right: 4 };
        set_up_left_miss(&mut state);

        let event = state.tick(PaddleIntent::None, PaddleIntent::None);

        assert_eq!(
            event,
            Some(SessionEvent::Finished { winner: Side::Right, reason: FinishReason::Score })
        );
        assert_eq!(state.scores.right, WIN_SCORE);
        assert!(state.scores.left < WIN_SCORE);

        let result = state.result().unwrap();
        assert_eq!(result.winner, state.right);
        assert_eq!((result.left_score, result.right_score), (4, 5));
    }

    #[test]
    fn fourth_point_does_not_finish() {
        let mut state = new_state();
        state.scores = Scoreboard { left: 3, right: 0 };
        state.ball = Ball { x: 100.0, y: 50.0, dx: 2.0, dy: 0.0 };
        state.paddles.right = 0.0;

        assert_eq!(state.tick(PaddleIntent::None, PaddleIntent::None), Some(SessionEvent::RoundStarted { round: 1 }));
        assert_eq!(state.scores.left, 4);
        assert!(!state.is_finished());
        assert!(state.result().is_none());
    }

    #[test]
    fn finished_session_no_longer_mutates() {
        let mut state = new_state();
        state.scores = Scoreboard { left: 0, right: 4 };
        set_up_left_miss(&mut state);
        state.tick(PaddleIntent::None, PaddleIntent::None);
        assert!(state.is_finished());

        let ball = state.ball;
        let paddles = state.paddles;
        for _ in 0..10 {
            assert_eq!(state.tick(PaddleIntent::Down, PaddleIntent::Up), None);
        }
        assert_eq!(state.ball, ball);
        assert_eq!(state.paddles, paddles);
        assert_eq!(state.scores, Scoreboard { left: 0, right: 5 });
    }

    #[test]
    fn forfeit_awards_match_to_remaining_member() {
        let mut state = new_state();
        state.scores = Scoreboard { left: 3, right: 1 };

        let event = state.forfeit(state.left);
        assert_eq!(
            event,
            Some(SessionEvent::Finished { winner: Side::Right, reason: FinishReason::Forfeit })
        );
        assert_eq!(state.result().unwrap().winner, state.right);

        // Second departure changes nothing
        assert_eq!(state.forfeit(state.right), None);
        assert_eq!(state.forfeit(Uuid::new_v4()), None);
    }

    #[test]
    fn forfeit_by_stranger_is_ignored() {
        let mut state = new_state();
        assert_eq!(state.forfeit(Uuid::new_v4()), None);
        assert_eq!(state.phase, SessionPhase::Active);
    }

    fn spawn_session(
        state: SessionState,
        policy: DisconnectPolicy,
        recorder: Arc<dyn ResultRecorder>,
    ) -> (SessionHandle, broadcast::Receiver<ServerMsg>, tokio::task::JoinHandle<()>, [IntentCell; 2]) {
        let intents = [IntentCell::new(), IntentCell::new()];
        let (session, handle) = GameSession::new(state, intents.clone(), policy, recorder);
        let rx = handle.subscribe();
        let task = tokio::spawn(session.run());
        handle.attach(task.abort_handle());
        (handle, rx, task, intents)
    }

    async fn next_game_over(rx: &mut broadcast::Receiver<ServerMsg>) -> ServerMsg {
        timeout(Duration::from_secs(2), async {
            loop {
                match rx.recv().await {
                    Ok(msg @ ServerMsg::GameOver { .. }) => return msg,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => panic!("session closed without game_over"),
                }
            }
        })
        .await
        .expect("game_over within timeout")
    }

    #[tokio::test]
    async fn winning_point_broadcasts_state_then_game_over_and_records() {
        let mut state = new_state();
        let (left, right) = (state.left, state.right);
        state.scores = Scoreboard { left: 4, right: 2 };
        state.ball = Ball { x: 100.0, y: 50.0, dx: 2.0, dy: 0.0 };
        state.paddles.right = 0.0;

        let recorder = Arc::new(MemoryRecorder::default());
        let (_handle, mut rx, task, _) = spawn_session(state, DisconnectPolicy::Forfeit, recorder.clone());

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, ServerMsg::GameState { .. }));

        match next_game_over(&mut rx).await {
            ServerMsg::GameOver { winner, scores, reason } => {
                assert_eq!(winner, left);
                assert_eq!(scores[&left], 5);
                assert_eq!(scores[&right], 2);
                assert_eq!(reason, FinishReason::Score);
            }
            other => panic!("unexpected {:?}", other),
        }

        timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
        let recorded = recorder.wait_for(1).await;
        assert_eq!(recorded[0].winner, left);
        assert_eq!((recorded[0].left_score, recorded[0].right_score), (5, 2));
    }

    #[tokio::test]
    async fn non_winning_point_broadcasts_round_start_after_state() {
        let mut state = new_state();
        let right = state.right;
        set_up_left_miss(&mut state);

        let (handle, mut rx, _task, _) =
            spawn_session(state, DisconnectPolicy::Forfeit, Arc::new(MemoryRecorder::default()));

        match rx.recv().await.unwrap() {
            ServerMsg::GameState { scores, .. } => assert_eq!(scores[&right], 1),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(rx.recv().await.unwrap(), ServerMsg::RoundStart { round: 1 });

        // Held for the serve delay: no second announcement follows
        match rx.recv().await.unwrap() {
            ServerMsg::GameState { ball, .. } => assert_eq!(ball, Ball::held()),
            other => panic!("unexpected {:?}", other),
        }
        handle.stop();
    }

    #[tokio::test]
    async fn recorder_failure_does_not_retract_game_over() {
        let state = new_state();
        let left = state.left;
        let right = state.right;
        let (handle, mut rx, task, _) = spawn_session(state, DisconnectPolicy::Forfeit, Arc::new(FailingRecorder));

        handle.notify(SessionControl::MemberLeft(left));

        match next_game_over(&mut rx).await {
            ServerMsg::GameOver { winner, reason, .. } => {
                assert_eq!(winner, right);
                assert_eq!(reason, FinishReason::Forfeit);
            }
            other => panic!("unexpected {:?}", other),
        }
        timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn freeze_policy_keeps_playing_until_both_leave() {
        let state = new_state();
        let (left, right) = (state.left, state.right);
        let recorder = Arc::new(MemoryRecorder::default());
        let (handle, mut rx, task, intents) = spawn_session(state, DisconnectPolicy::Freeze, recorder.clone());

        intents[0].store(PaddleIntent::Up);
        handle.notify(SessionControl::MemberLeft(left));

        // Play continues and the departed paddle no longer moves
        let mut offsets = Vec::new();
        while offsets.len() < 5 {
            if let Ok(ServerMsg::GameState { paddles, .. }) = rx.recv().await {
                offsets.push(paddles[&left]);
            }
        }
        assert!(offsets.windows(2).skip(2).all(|w| w[0] == w[1]));
        assert_eq!(intents[0].load(), PaddleIntent::None);

        handle.notify(SessionControl::MemberLeft(right));
        timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
        assert!(recorder.results().is_empty());
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_ends_broadcasts() {
        let state = new_state();
        let (handle, mut rx, task, _) = spawn_session(state, DisconnectPolicy::Forfeit, Arc::new(MemoryRecorder::default()));

        assert!(rx.recv().await.is_ok());
        assert!(handle.stop());
        assert!(!handle.stop());

        let joined = timeout(Duration::from_secs(1), task).await.unwrap();
        assert!(joined.unwrap_err().is_cancelled());
        drop(handle);

        // Drain whatever was sent before the abort, then the channel is closed
        loop {
            match rx.recv().await {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    #[test]
    fn registry_tracks_sessions() {
        let state = new_state();
        let id = state.id.clone();
        let (_session, handle) = GameSession::new(
            state,
            [IntentCell::new(), IntentCell::new()],
            DisconnectPolicy::Forfeit,
            Arc::new(MemoryRecorder::default()),
        );

        let registry = SessionRegistry::new();
        registry.insert(handle.clone());
        assert_eq!(registry.active_sessions(), 1);
        assert!(registry.get(&id).is_some());
        registry.stop_all();
        assert!(registry.remove_handle(&handle));
        assert_eq!(registry.active_sessions(), 0);
    }

    #[test]
    fn stale_handle_does_not_remove_rematch() {
        let (left, right) = (Uuid::new_v4(), Uuid::new_v4());
        let new_handle = |seed| {
            GameSession::new(
                SessionState::new(left, right, seed),
                [IntentCell::new(), IntentCell::new()],
                DisconnectPolicy::Forfeit,
                Arc::new(MemoryRecorder::default()),
            )
            .1
        };
        let first = new_handle(1);
        let rematch = new_handle(2);
        assert_eq!(first.id, rematch.id);
        assert!(!first.same_session(&rematch));

        let registry = SessionRegistry::new();
        registry.insert(first.clone());
        registry.insert(rematch.clone());

        assert!(!registry.remove_handle(&first));
        assert_eq!(registry.active_sessions(), 1);
        assert!(registry.remove_handle(&rematch));
        assert_eq!(registry.active_sessions(), 0);
    }
}
