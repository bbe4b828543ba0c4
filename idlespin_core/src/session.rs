use crate::config::GameRules;
use crate::engine::{scaled, spin_once, SpinOutcome};
use crate::error::{ClaimError, PrestigeError, SessionError, SinkError, SpinError};
use crate::history::HistoryEntry;
use crate::machine::MachineConfig;
use crate::offline;
use crate::prestige::{self, PrestigeOutcome, PrestigeState};
use crate::progression::{self, PlayerProgressState, SpinEvent};
use crate::rng::RandomSource;
use crate::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, TryLockError};
use std::time::{Duration, Instant};
use tracing::warn;

/// Where accepted results go after the core is done with them. Failures are
/// logged by the session and never undo the result.
pub trait ProgressSink: Send + Sync {
    fn save(&self, player_id: &str, state: &PlayerProgressState) -> Result<(), SinkError>;

    fn record_spin(&self, _player_id: &str, _entry: &HistoryEntry) -> Result<(), SinkError> {
        Ok(())
    }
}

pub struct NullSink;

impl ProgressSink for NullSink {
    fn save(&self, _player_id: &str, _state: &PlayerProgressState) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Keeps everything in memory. Can be told to fail for testing rollback rules.
#[derive(Default)]
pub struct MemorySink {
    saves: Mutex<Vec<(String, PlayerProgressState)>>,
    spins: Mutex<Vec<(String, HistoryEntry)>>,
    failing: bool,
}

impl MemorySink {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn saved(&self) -> Vec<(String, PlayerProgressState)> {
        self.saves.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn spins(&self) -> Vec<(String, HistoryEntry)> {
        self.spins.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ProgressSink for MemorySink {
    fn save(&self, player_id: &str, state: &PlayerProgressState) -> Result<(), SinkError> {
        if self.failing {
            return Err(SinkError::Unavailable("memory sink set to fail".into()));
        }
        self.saves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((player_id.to_string(), state.clone()));
        Ok(())
    }

    fn record_spin(&self, player_id: &str, entry: &HistoryEntry) -> Result<(), SinkError> {
        if self.failing {
            return Err(SinkError::Unavailable("memory sink set to fail".into()));
        }
        self.spins
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((player_id.to_string(), entry.clone()));
        Ok(())
    }
}

/// Collaborators for one call, owned by the host.
pub struct SessionContext<'a> {
    pub rng: &'a mut dyn RandomSource,
    pub sink: &'a dyn ProgressSink,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpinReport {
    pub outcome: SpinOutcome,
    pub credited: Amount,
    pub coins: Amount,
    pub newly_claimable: Vec<String>,
    pub daily_completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfflineReport {
    pub credited_seconds: u64,
    pub credited: Amount,
    pub coins: Amount,
    pub newly_claimable: Vec<String>,
}

/// One player's state. A spin runs validate, draw, evaluate, credit,
/// progression, history and save as one sequence on `&mut self`.
#[derive(Debug)]
pub struct PlayerSession {
    player_id: String,
    state: PlayerProgressState,
}

impl PlayerSession {
    pub fn new(player_id: impl Into<String>, state: PlayerProgressState) -> Self {
        Self {
            player_id: player_id.into(),
            state,
        }
    }

    /// A brand-new player under `rules`.
    pub fn fresh(player_id: impl Into<String>, rules: &GameRules) -> Self {
        let state = PlayerProgressState::new(rules.prestige.base_starting_coins)
            .with_history_cap(rules.history_cap);
        Self::new(player_id, state)
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub fn state(&self) -> &PlayerProgressState {
        &self.state
    }

    pub fn into_state(self) -> PlayerProgressState {
        self.state
    }

    pub fn prestige_state(&self, rules: &GameRules) -> PrestigeState {
        PrestigeState::from_points(self.state.prestige_points, &rules.prestige)
    }

    fn persist(&self, sink: &dyn ProgressSink, spin: Option<&HistoryEntry>) {
        if let Some(entry) = spin {
            if let Err(e) = sink.record_spin(&self.player_id, entry) {
                warn!(player = %self.player_id, error = %e, "spin log write failed");
            }
        }
        if let Err(e) = sink.save(&self.player_id, &self.state) {
            warn!(player = %self.player_id, error = %e, "progress save failed");
        }
    }

    /// Rejections happen before any randomness is consumed and leave the
    /// state untouched.
    pub fn spin(
        &mut self,
        machine: &MachineConfig,
        bet: Amount,
        rules: &GameRules,
        ctx: &mut SessionContext<'_>,
    ) -> Result<SpinReport, SpinError> {
        if !machine.accepts_bet(bet) {
            return Err(SpinError::InvalidBet {
                machine: machine.id.clone(),
                bet,
            });
        }
        if self.state.coins < bet {
            return Err(SpinError::InsufficientFunds {
                coins: self.state.coins,
                bet,
            });
        }

        let outcome = spin_once(machine, bet, &rules.tiers, &mut *ctx.rng);
        let multiplier = rules.prestige.multiplier_for_points(self.state.prestige_points);
        let credited = scaled(outcome.win, multiplier);

        let event = SpinEvent {
            outcome: &outcome,
            bet,
            credited,
        };
        let today = ctx.now.date_naive();
        let update = progression::apply_spin(std::mem::take(&mut self.state), &event, today);
        self.state = update.state;

        let entry = HistoryEntry::from_outcome(ctx.now, &machine.id, bet, &outcome, credited);
        self.state.history.push(entry.clone());
        self.state.last_active = Some(ctx.now);
        self.persist(ctx.sink, Some(&entry));

        Ok(SpinReport {
            coins: self.state.coins,
            outcome,
            credited,
            newly_claimable: update.newly_claimable,
            daily_completed: update.daily_completed,
        })
    }

    pub fn claim_achievement(
        &mut self,
        id: &str,
        ctx: &mut SessionContext<'_>,
    ) -> Result<Amount, ClaimError> {
        let reward = progression::claim_achievement(&mut self.state, id)?;
        self.persist(ctx.sink, None);
        Ok(reward)
    }

    pub fn claim_daily(&mut self, ctx: &mut SessionContext<'_>) -> Result<Amount, ClaimError> {
        let reward = progression::claim_daily(&mut self.state, ctx.now.date_naive())?;
        self.persist(ctx.sink, None);
        Ok(reward)
    }

    pub fn prestige(
        &mut self,
        rules: &GameRules,
        ctx: &mut SessionContext<'_>,
    ) -> Result<PrestigeOutcome, PrestigeError> {
        let outcome = prestige::reset_in_place(&mut self.state, &rules.prestige)?;
        self.persist(ctx.sink, None);
        Ok(outcome)
    }

    /// Credits idle income for the time since the last activity, clamped to
    /// the configured maximum, and stamps the session active.
    pub fn collect_offline(&mut self, rules: &GameRules, ctx: &mut SessionContext<'_>) -> OfflineReport {
        let elapsed = offline::elapsed_since(self.state.last_active, ctx.now);
        let credited_seconds = offline::credited_seconds(elapsed, rules.max_offline_hours);
        let rate = rules.idle_coins_per_second
            * rules.prestige.multiplier_for_points(self.state.prestige_points);
        let credited = offline::offline_earnings(elapsed, rate, rules.max_offline_hours);

        let update = progression::apply_income(std::mem::take(&mut self.state), credited, ctx.now.date_naive());
        self.state = update.state;
        self.state.last_active = Some(ctx.now);
        self.persist(ctx.sink, None);

        OfflineReport {
            credited_seconds,
            credited,
            coins: self.state.coins,
            newly_claimable: update.newly_claimable,
        }
    }
}

struct Slot {
    session: Arc<Mutex<PlayerSession>>,
    last_used: Instant,
}

/// Live sessions keyed by player id. One caller at a time per player; a
/// concurrent caller gets [`SessionError::SpinInProgress`].
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Slot>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<String, Slot>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.map().contains_key(player_id)
    }

    /// Registers `state` unless the player already has a live session.
    pub fn insert_if_absent(&self, player_id: &str, state: PlayerProgressState) {
        self.map().entry(player_id.to_string()).or_insert_with(|| Slot {
            session: Arc::new(Mutex::new(PlayerSession::new(player_id, state))),
            last_used: Instant::now(),
        });
    }

    /// Drops the live session. The next request reloads it from storage.
    pub fn remove(&self, player_id: &str) -> bool {
        self.map().remove(player_id).is_some()
    }

    /// Drops sessions unused for at least `max_idle`. Sessions busy with a
    /// caller are kept. Returns how many were dropped.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut map = self.map();
        let before = map.len();
        map.retain(|_, slot| {
            let busy = matches!(slot.session.try_lock(), Err(TryLockError::WouldBlock));
            busy || slot.last_used.elapsed() < max_idle
        });
        before - map.len()
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    /// Runs `f` with exclusive access to the player's session. A second caller
    /// arriving while `f` runs is turned away instead of queued.
    pub fn with_session<R>(
        &self,
        player_id: &str,
        f: impl FnOnce(&mut PlayerSession) -> R,
    ) -> Result<R, SessionError> {
        let session = {
            let mut map = self.map();
            let slot = map
                .get_mut(player_id)
                .ok_or_else(|| SessionError::UnknownPlayer(player_id.to_string()))?;
            slot.last_used = Instant::now();
            Arc::clone(&slot.session)
        };
        let mut guard = match session.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(SessionError::SpinInProgress),
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
        };
        Ok(f(&mut guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::MachineCatalog;
    use crate::rng::ScriptedRandom;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    // Draws three sevens (last weight bucket) and misses both jackpot rolls.
    fn sevens() -> ScriptedRandom {
        ScriptedRandom::new(vec![0.99, 0.99, 0.99, 0.9, 0.9])
    }

    #[test]
    fn spin_credits_and_persists() {
        let rules = GameRules::default();
        let catalog = MachineCatalog::builtin();
        let machine = catalog.get("classic").unwrap();
        let sink = MemorySink::default();
        let mut rng = sevens();
        let mut ctx = SessionContext { rng: &mut rng, sink: &sink, now: now() };
        let mut session = PlayerSession::fresh("p1", &rules);

        let report = session.spin(machine, 10, &rules, &mut ctx).unwrap();
        assert_eq!(report.outcome.win, 200);
        assert_eq!(report.credited, 200);
        assert_eq!(report.coins, 1_000 - 10 + 200);
        assert_eq!(session.state().history.len(), 1);
        assert_eq!(sink.saved().len(), 1);
        assert_eq!(sink.spins().len(), 1);
    }

    #[test]
    fn rejected_spin_consumes_nothing() {
        let rules = GameRules::default();
        let catalog = MachineCatalog::builtin();
        let machine = catalog.get("classic").unwrap();
        let sink = MemorySink::default();
        let mut rng = sevens();
        let mut session = PlayerSession::fresh("p1", &rules);
        let before = session.state().clone();
        {
            let mut ctx = SessionContext { rng: &mut rng, sink: &sink, now: now() };
            assert!(matches!(
                session.spin(machine, 7, &rules, &mut ctx),
                Err(SpinError::InvalidBet { bet: 7, .. })
            ));
            let mut broke = PlayerSession::new("p2", PlayerProgressState::new(3));
            assert_eq!(
                broke.spin(machine, 5, &rules, &mut ctx),
                Err(SpinError::InsufficientFunds { coins: 3, bet: 5 })
            );
        }
        assert_eq!(rng.consumed(), 0);
        assert_eq!(session.state(), &before);
        assert!(sink.saved().is_empty());
    }

    #[test]
    fn sink_failure_does_not_roll_back() {
        let rules = GameRules::default();
        let catalog = MachineCatalog::builtin();
        let machine = catalog.get("classic").unwrap();
        let sink = MemorySink::failing();
        let mut rng = sevens();
        let mut ctx = SessionContext { rng: &mut rng, sink: &sink, now: now() };
        let mut session = PlayerSession::fresh("p1", &rules);
        let report = session.spin(machine, 10, &rules, &mut ctx).unwrap();
        assert_eq!(session.state().coins, report.coins);
        assert_eq!(session.state().lifetime.spins, 1);
    }

    #[test]
    fn prestige_multiplier_scales_credit() {
        let rules = GameRules::default();
        let catalog = MachineCatalog::builtin();
        let machine = catalog.get("classic").unwrap();
        let mut rng = sevens();
        let mut ctx = SessionContext { rng: &mut rng, sink: &NullSink, now: now() };
        let mut state = PlayerProgressState::new(100);
        state.prestige_points = 5; // 1 + 0.5 + 0.25 bronze
        let mut session = PlayerSession::new("p1", state);
        let report = session.spin(machine, 10, &rules, &mut ctx).unwrap();
        assert_eq!(report.outcome.win, 200);
        assert_eq!(report.credited, 350);
    }

    #[test]
    fn offline_catch_up_is_clamped() {
        let rules = GameRules::default();
        let mut state = PlayerProgressState::new(0);
        state.last_active = Some(now() - Duration::days(10));
        let mut session = PlayerSession::new("p1", state);
        let mut rng = ScriptedRandom::new(vec![]);
        let mut ctx = SessionContext { rng: &mut rng, sink: &NullSink, now: now() };
        let report = session.collect_offline(&rules, &mut ctx);
        assert_eq!(report.credited_seconds, 4 * 3_600);
        assert_eq!(report.credited, 7_200);
        assert_eq!(session.state().last_active, Some(now()));

        let again = session.collect_offline(&rules, &mut ctx);
        assert_eq!(again.credited, 0);
    }

    #[test]
    fn prestige_through_session() {
        let rules = GameRules::default();
        let mut state = PlayerProgressState::new(50_000);
        state.run.earnings = 50_000;
        let mut session = PlayerSession::new("p1", state);
        let mut rng = ScriptedRandom::new(vec![]);
        let mut ctx = SessionContext { rng: &mut rng, sink: &NullSink, now: now() };
        let outcome = session.prestige(&rules, &mut ctx).unwrap();
        assert_eq!(outcome.points_awarded, 1);
        assert_eq!(session.state().coins, 1_100);
        assert!(session.prestige(&rules, &mut ctx).is_err());
        assert_eq!(session.state().prestige_points, 1);
        assert_eq!(session.state().coins, 1_100);
        assert_eq!(session.state().prestige_count, 1);
    }

    #[test]
    fn registry_turns_away_concurrent_callers() {
        let registry = SessionRegistry::new();
        registry.insert_if_absent("p1", PlayerProgressState::new(10));
        let nested = registry
            .with_session("p1", |_| registry.with_session("p1", |_| ()))
            .unwrap();
        assert_eq!(nested, Err(SessionError::SpinInProgress));
        assert_eq!(registry.with_session("p1", |s| s.state().coins), Ok(10));
        assert_eq!(
            registry.with_session("ghost", |_| ()),
            Err(SessionError::UnknownPlayer("ghost".into()))
        );
    }

    #[test]
    fn evicted_player_reloads_saved_state() {
        let rules = GameRules::default();
        let catalog = MachineCatalog::builtin();
        let machine = catalog.get("classic").unwrap();
        let sink = MemorySink::default();
        let registry = SessionRegistry::new();
        registry.insert_if_absent("p1", PlayerProgressState::new(1_000));

        let coins = registry
            .with_session("p1", |session| {
                let mut rng = sevens();
                let mut ctx = SessionContext { rng: &mut rng, sink: &sink, now: now() };
                session.spin(machine, 10, &rules, &mut ctx).map(|r| r.coins)
            })
            .unwrap()
            .unwrap();

        assert_eq!(registry.evict_idle(std::time::Duration::ZERO), 1);
        assert!(!registry.contains("p1"));
        assert!(registry.with_session("p1", |_| ()).is_err());

        let (_, stored) = sink.saved().pop().unwrap();
        registry.insert_if_absent("p1", stored);
        assert_eq!(registry.with_session("p1", |s| s.state().coins), Ok(coins));
        assert_eq!(registry.with_session("p1", |s| s.state().history.len()), Ok(1));
    }

    #[test]
    fn eviction_keeps_busy_and_recent_sessions() {
        let registry = SessionRegistry::new();
        registry.insert_if_absent("busy", PlayerProgressState::new(1));
        registry.insert_if_absent("recent", PlayerProgressState::new(1));
        let evicted = registry
            .with_session("busy", |_| registry.evict_idle(std::time::Duration::from_secs(3_600)))
            .unwrap();
        assert_eq!(evicted, 0);
        let evicted = registry
            .with_session("busy", |_| registry.evict_idle(std::time::Duration::ZERO))
            .unwrap();
        assert_eq!(evicted, 1);
        assert!(registry.contains("busy"));
        assert!(!registry.contains("recent"));
        assert!(registry.remove("busy"));
        assert!(registry.is_empty());
    }

    #[test]
    fn zero_history_cap_in_stored_state_does_not_stall_spins() {
        let rules = GameRules::default();
        let catalog = MachineCatalog::builtin();
        let machine = catalog.get("classic").unwrap();
        let state: PlayerProgressState =
            serde_json::from_str(r#"{"coins":100,"history":{"cap":0}}"#).unwrap();
        let mut session = PlayerSession::new("p1", state);
        let mut rng = sevens();
        let mut ctx = SessionContext { rng: &mut rng, sink: &NullSink, now: now() };
        session.spin(machine, 10, &rules, &mut ctx).unwrap();
        assert_eq!(session.state().history.len(), 1);
    }

    #[test]
    fn insert_if_absent_keeps_live_session() {
        let registry = SessionRegistry::new();
        registry.insert_if_absent("p1", PlayerProgressState::new(10));
        registry.insert_if_absent("p1", PlayerProgressState::new(99));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.with_session("p1", |s| s.state().coins), Ok(10));
    }
}
