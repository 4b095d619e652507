//! Machine à états du vote temporel.
//!
//! | État                  | Condition                                                        | Suivant                   |
//! |-----------------------|------------------------------------------------------------------|---------------------------|
//! | `Idle`                | candidat ≠ dernière polarité, ancien vote opposé, série atteinte | `Locked`, debounce armé   |
//! | `Idle`                | sinon                                                            | `Idle`                    |
//! | `Locked { candidate }`| vote récent change de polarité, ou série opposée atteinte        | `Idle`, debounce réarmé   |
//! | `Locked { candidate }`| debounce > 1                                                     | `Locked`, debounce - 1    |
//! | `Locked { candidate }`| debounce atteint 0                                               | `Idle`, événement émis    |
//!
//! Le candidat est la polarité du vote récent (somme de l'historique). Le
//! vote ancien est l'argmax de `pool - historique` : les vecteurs vus depuis
//! la dernière confirmation mais déjà sortis de l'anneau.

use pc_core::config::PassConfig;
use pc_core::error::CoreError;
use pc_core::event::{ClassificationEvent, ConfirmedPolarity, Polarity};
use pc_core::window::{ScoreVector, argmax};

use crate::history::VoteHistory;
use crate::pool::VotingPool;
use crate::streak::StreakState;

/// Paramètres du moteur de vote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VotingConfig {
    /// Scores per vector.
    pub num_classes: usize,
    /// Class meaning "no vehicle".
    pub background_index: usize,
    /// Ring capacity `K`.
    pub history_len: usize,
    /// Consecutive windows required before a polarity counts.
    pub confirm_streak: u32,
    /// Locked cycles before a candidate is confirmed.
    pub min_votes_before_classify: u32,
}

impl VotingConfig {
    /// Voting parameters from the `[model]` and `[voting]` sections.
    #[must_use]
    pub fn from_config(config: &PassConfig) -> Self {
        Self {
            num_classes: config.num_classes(),
            background_index: config.background_index,
            history_len: config.history_len,
            confirm_streak: config.confirm_streak,
            min_votes_before_classify: config.min_votes_before_classify,
        }
    }

    /// # Errors
    /// [`CoreError::Config`] on a zero class count, history length or
    /// confirm streak, or a background index out of range.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.num_classes == 0 {
            return Err(CoreError::Config("aucune classe".into()));
        }
        if self.background_index >= self.num_classes {
            return Err(CoreError::Config(format!(
                "background_index {} hors bornes ({} classes)",
                self.background_index, self.num_classes
            )));
        }
        if self.history_len == 0 {
            return Err(CoreError::Config("history_len doit être >= 1".into()));
        }
        if self.confirm_streak == 0 {
            return Err(CoreError::Config("confirm_streak doit être >= 1".into()));
        }
        Ok(())
    }
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self::from_config(&PassConfig::default())
    }
}

/// État de la machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EngineState {
    /// Watching for a candidate transition.
    #[default]
    Idle,
    /// Debounce running for a candidate polarity.
    Locked {
        /// Polarity waiting for confirmation.
        candidate: Polarity,
    },
}

/// Trace d'un cycle, pour la télémétrie.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoteOutcome {
    /// Window observed this cycle.
    pub window_index: u64,
    /// Argmax of this cycle's vector.
    pub instantaneous: usize,
    /// Argmax of the history sum.
    pub vote_recent: usize,
    /// Argmax of the older part of the pool, if any.
    pub vote_older: Option<usize>,
    /// State after the cycle.
    pub state: EngineState,
    /// Streaks after the cycle.
    pub streaks: StreakState,
    /// Debounce counter after the cycle.
    pub debounce: u32,
    /// Confirmed event, if this cycle confirmed one.
    pub event: Option<ClassificationEvent>,
}

/// Moteur de vote : seul état conservé d'un cycle à l'autre.
///
/// Tous les buffers sont alloués à la construction ; [`observe`](Self::observe)
/// n'alloue pas.
///
/// # Example
/// ```
/// use pc_core::window::ScoreVector;
/// use pc_vote::{VotingConfig, VotingEngine};
///
/// let mut engine = VotingEngine::new(VotingConfig::default()).unwrap();
/// let background = ScoreVector::from(vec![0.9, 0.05, 0.03, 0.02]);
/// let car = ScoreVector::from(vec![0.05, 0.9, 0.03, 0.02]);
///
/// let mut events = Vec::new();
/// for i in 0..20u64 {
///     let s = if i < 10 { &background } else { &car };
///     if let Some(e) = engine.observe(i, s).event {
///         events.push(e);
///     }
/// }
/// assert_eq!(events.len(), 1);
/// assert_eq!(events[0].class_index, 1);
/// ```
#[derive(Clone, Debug)]
pub struct VotingEngine {
    config: VotingConfig,
    history: VoteHistory,
    pool: VotingPool,
    streaks: StreakState,
    state: EngineState,
    last_confirmed: ConfirmedPolarity,
    debounce: u32,
    recent_sum: Vec<f32>,
    older: Vec<f32>,
}

impl VotingEngine {
    /// Build an engine in its initial state.
    ///
    /// # Errors
    /// [`CoreError::Config`] if `config` is invalid.
    pub fn new(config: VotingConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let n = config.num_classes;
        Ok(Self {
            history: VoteHistory::new(config.history_len, n),
            pool: VotingPool::new(n),
            streaks: StreakState::default(),
            state: EngineState::Idle,
            last_confirmed: ConfirmedPolarity::Unknown,
            debounce: config.min_votes_before_classify,
            recent_sum: vec![0.0; n],
            older: vec![0.0; n],
            config,
        })
    }

    /// Restaure l'état initial sans réallouer.
    pub fn reset(&mut self) {
        self.history.clear();
        self.pool.clear();
        self.streaks = StreakState::default();
        self.state = EngineState::Idle;
        self.last_confirmed = ConfirmedPolarity::Unknown;
        self.debounce = self.config.min_votes_before_classify;
        self.recent_sum.fill(0.0);
        self.older.fill(0.0);
    }

    /// Un cycle de vote pour le vecteur de la fenêtre `window_index`.
    ///
    /// Retourne la trace du cycle ; `event` est `Some` exactement quand une
    /// transition est confirmée.
    pub fn observe(&mut self, window_index: u64, scores: &ScoreVector) -> VoteOutcome {
        debug_assert_eq!(scores.len(), self.config.num_classes);
        let bg = self.config.background_index;
        let confirm = self.config.confirm_streak;

        self.history.push(scores.scores());
        self.pool.add(scores.scores());

        let instantaneous = scores.argmax();
        self.streaks.update(Polarity::of(instantaneous, bg), confirm);

        self.history.sum_into(&mut self.recent_sum);
        let vote_recent = argmax(&self.recent_sum);
        let vote_older = self
            .pool
            .older_into(&self.recent_sum, &mut self.older)
            .then(|| argmax(&self.older));

        let recent_polarity = Polarity::of(vote_recent, bg);
        let mut event = None;

        match self.state {
            EngineState::Idle => {
                let older_disagrees =
                    vote_older.is_some_and(|c| Polarity::of(c, bg) != recent_polarity);
                if self.last_confirmed.differs_from(recent_polarity)
                    && older_disagrees
                    && self.streaks.reached(recent_polarity, confirm)
                {
                    log::debug!(
                        "fenêtre {window_index} : candidat {recent_polarity:?} (classe {vote_recent})"
                    );
                    self.state = EngineState::Locked {
                        candidate: recent_polarity,
                    };
                    self.debounce = self.config.min_votes_before_classify;
                }
            }
            EngineState::Locked { candidate } => {
                if recent_polarity != candidate
                    || self.streaks.reached(candidate.opposite(), confirm)
                {
                    log::debug!("fenêtre {window_index} : candidat {candidate:?} abandonné");
                    self.state = EngineState::Idle;
                    self.debounce = self.config.min_votes_before_classify;
                } else {
                    self.debounce = self.debounce.saturating_sub(1);
                    if self.debounce == 0 {
                        event = Some(self.confirm(candidate, vote_recent, window_index));
                    }
                }
            }
        }

        VoteOutcome {
            window_index,
            instantaneous,
            vote_recent,
            vote_older,
            state: self.state,
            streaks: self.streaks,
            debounce: self.debounce,
            event,
        }
    }

    fn confirm(
        &mut self,
        candidate: Polarity,
        class_index: usize,
        window_index: u64,
    ) -> ClassificationEvent {
        self.last_confirmed = candidate.into();
        self.pool.reseed(&self.recent_sum);
        self.debounce = self.config.min_votes_before_classify;
        self.state = EngineState::Idle;
        log::debug!("fenêtre {window_index} : transition confirmée, classe {class_index}");
        ClassificationEvent {
            class_index,
            window_index,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Last confirmed polarity.
    #[must_use]
    pub fn last_confirmed(&self) -> ConfirmedPolarity {
        self.last_confirmed
    }

    /// Current streaks.
    #[must_use]
    pub fn streaks(&self) -> StreakState {
        self.streaks
    }

    /// Remaining debounce cycles.
    #[must_use]
    pub fn debounce(&self) -> u32 {
        self.debounce
    }

    /// Recent-history ring.
    #[must_use]
    pub fn history(&self) -> &VoteHistory {
        &self.history
    }

    /// Pool since the last confirmation.
    #[must_use]
    pub fn pool(&self) -> &VotingPool {
        &self.pool
    }

    /// Engine parameters.
    #[must_use]
    pub fn config(&self) -> &VotingConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKGROUND: [f32; 4] = [0.85, 0.05, 0.05, 0.05];
    const CAR: [f32; 4] = [0.05, 0.85, 0.05, 0.05];
    const MOTORCYCLE: [f32; 4] = [0.05, 0.1, 0.8, 0.05];

    fn engine() -> VotingEngine {
        VotingEngine::new(VotingConfig {
            num_classes: 4,
            background_index: 0,
            history_len: 3,
            confirm_streak: 2,
            min_votes_before_classify: 5,
        })
        .unwrap()
    }

    /// Rejoue `seq` ; retourne (cycle 1-based, événement).
    fn run(engine: &mut VotingEngine, seq: &[[f32; 4]]) -> Vec<(usize, ClassificationEvent)> {
        seq.iter()
            .enumerate()
            .filter_map(|(i, s)| {
                let v = ScoreVector::from(s.to_vec());
                engine.observe(i as u64, &v).event.map(|e| (i + 1, e))
            })
            .collect()
    }

    fn repeat(v: [f32; 4], n: usize) -> Vec<[f32; 4]> {
        vec![v; n]
    }

    #[test]
    fn background_then_car_counts_once() {
        let mut seq = repeat(BACKGROUND, 10);
        seq.extend(repeat(CAR, 10));
        let events = run(&mut engine(), &seq);
        assert_eq!(events.len(), 1, "{events:?}");
        let (cycle, event) = events[0];
        assert_eq!(event.class_index, 1);
        assert!(cycle >= 15, "confirmé trop tôt au cycle {cycle}");
        assert_eq!(event.window_index, (cycle - 1) as u64);
    }

    #[test]
    fn single_spurious_motorcycle_is_ignored() {
        let mut seq = repeat(CAR, 20);
        seq[9] = MOTORCYCLE;
        let events = run(&mut engine(), &seq);
        assert!(events.iter().all(|(_, e)| e.class_index != 2));
        assert!(events.is_empty());
    }

    #[test]
    fn spurious_motorcycle_during_pass_keeps_car() {
        let mut seq = repeat(BACKGROUND, 10);
        seq.extend(repeat(CAR, 10));
        seq[13] = MOTORCYCLE;
        let events = run(&mut engine(), &seq);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].1.class_index, 1);
    }

    #[test]
    fn mixed_pass_takes_class_of_last_windows_at_confirmation() {
        // Voiture au début du passage, moto sur les fenêtres qui confirment :
        // la classe retenue est la pluralité des `history_len` dernières.
        let mut seq = repeat(BACKGROUND, 10);
        seq.extend(repeat(CAR, 3));
        seq.extend(repeat(MOTORCYCLE, 7));
        let events = run(&mut engine(), &seq);
        assert_eq!(events.len(), 1, "{events:?}");
        let (cycle, event) = events[0];
        assert_eq!(cycle, 17);
        assert_eq!(event.class_index, 2);
    }

    #[test]
    fn recording_starting_mid_pass_is_not_counted() {
        let events = run(&mut engine(), &repeat(CAR, 30));
        assert!(events.is_empty());
    }

    #[test]
    fn pass_clear_pass() {
        let mut seq = repeat(BACKGROUND, 10);
        seq.extend(repeat(CAR, 10));
        seq.extend(repeat(BACKGROUND, 10));
        seq.extend(repeat(CAR, 10));
        let events = run(&mut engine(), &seq);
        let classes: Vec<usize> = events.iter().map(|(_, e)| e.class_index).collect();
        assert_eq!(classes, vec![1, 0, 1]);
    }

    #[test]
    fn isolated_windows_never_trigger() {
        // Alternance : aucune série n'atteint confirm_streak côté véhicule.
        let mut e = engine();
        let mut seq = repeat(BACKGROUND, 10);
        for i in 0..20 {
            seq.push(if i % 2 == 0 { CAR } else { BACKGROUND });
        }
        let events = run(&mut e, &seq);
        assert!(events.is_empty(), "{events:?}");
    }

    #[test]
    fn no_event_while_both_streaks_below_confirm() {
        let mut e = VotingEngine::new(VotingConfig {
            confirm_streak: 3,
            ..VotingConfig::default()
        })
        .unwrap();
        let mut seq = repeat(BACKGROUND, 10);
        for _ in 0..10 {
            seq.push(CAR);
            seq.push(CAR);
            seq.push(BACKGROUND);
        }
        for (i, s) in seq.iter().enumerate() {
            let out = e.observe(i as u64, &ScoreVector::from(s.to_vec()));
            if out.streaks.positive() < 3 && out.streaks.negative() < 3 {
                assert!(out.event.is_none());
                assert_eq!(out.state, EngineState::Idle);
            }
        }
    }

    #[test]
    fn pool_is_sum_until_confirmation() {
        let mut e = engine();
        let seq = [BACKGROUND, CAR, MOTORCYCLE, BACKGROUND, CAR];
        let mut expected = [0.0f32; 4];
        for (i, s) in seq.iter().enumerate() {
            let out = e.observe(i as u64, &ScoreVector::from(s.to_vec()));
            assert!(out.event.is_none());
            for (acc, v) in expected.iter_mut().zip(s) {
                *acc += v;
            }
            for (got, want) in e.pool().totals().iter().zip(&expected) {
                assert!((got - want).abs() < 1e-6);
            }
        }
        assert_eq!(e.history().len(), 3);
    }

    #[test]
    fn confirmation_reseeds_pool_from_history() {
        let mut e = engine();
        let mut seq = repeat(BACKGROUND, 10);
        seq.extend(repeat(CAR, 7));
        let events = run(&mut e, &seq);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, 17);
        let mut recent = [0.0; 4];
        e.history().sum_into(&mut recent);
        assert_eq!(e.pool().totals(), &recent);
        assert_eq!(e.last_confirmed(), ConfirmedPolarity::Positive);
        assert_eq!(e.debounce(), 5);
    }

    #[test]
    fn lock_aborts_when_recent_vote_flips() {
        let mut e = engine();
        let mut seq = repeat(BACKGROUND, 10);
        seq.extend(repeat(CAR, 3));
        seq.extend(repeat(BACKGROUND, 10));
        let mut locked = false;
        for (i, s) in seq.iter().enumerate() {
            let out = e.observe(i as u64, &ScoreVector::from(s.to_vec()));
            locked |= matches!(out.state, EngineState::Locked { .. });
            assert!(out.event.is_none(), "événement inattendu au cycle {}", i + 1);
        }
        assert!(locked);
        assert_eq!(e.state(), EngineState::Idle);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut e = engine();
        let mut seq = repeat(BACKGROUND, 10);
        seq.extend(repeat(CAR, 10));
        run(&mut e, &seq);
        e.reset();
        assert_eq!(e.state(), EngineState::Idle);
        assert_eq!(e.last_confirmed(), ConfirmedPolarity::Unknown);
        assert_eq!(e.streaks(), StreakState::default());
        assert!(e.history().is_empty());
        assert_eq!(e.pool().totals(), &[0.0; 4]);
        // Même séquence, même résultat
        assert_eq!(run(&mut e, &seq).len(), 1);
    }

    #[test]
    fn invalid_config_rejected() {
        let bad = VotingConfig {
            background_index: 4,
            ..VotingConfig::default()
        };
        assert!(VotingEngine::new(bad).is_err());
        let bad = VotingConfig {
            history_len: 0,
            ..VotingConfig::default()
        };
        assert!(VotingEngine::new(bad).is_err());
        let bad = VotingConfig {
            confirm_streak: 0,
            ..VotingConfig::default()
        };
        assert!(VotingEngine::new(bad).is_err());
    }
}
