use std::str::FromStr;
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::heuristics::evaluate;
use crate::game::{
    apply, end_turn, enumerate_actions, Action, GameEvent, GameState, Match, PlayerId, RuleError,
};

/// Upper bound on actions the agent takes before the turn is forced to end.
pub const MAX_ACTIONS_PER_TURN: usize = 32;

#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy)]
struct Stopwatch {
    started_ms: f64,
}

#[cfg(target_arch = "wasm32")]
impl Stopwatch {
    fn start() -> Self {
        Self {
            started_ms: web_sys::js_sys::Date::now(),
        }
    }

    fn elapsed(&self) -> Duration {
        let elapsed_ms = web_sys::js_sys::Date::now() - self.started_ms;
        Duration::from_millis(elapsed_ms.max(0.0) as u64)
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone, Copy)]
struct Stopwatch {
    started: std::time::Instant,
}

#[cfg(not(target_arch = "wasm32"))]
impl Stopwatch {
    fn start() -> Self {
        Self {
            started: std::time::Instant::now(),
        }
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AiDifficulty {
    Easy,
    Normal,
    Hard,
    Expert,
}

impl FromStr for AiDifficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(AiDifficulty::Easy),
            "normal" | "medium" => Ok(AiDifficulty::Normal),
            "hard" => Ok(AiDifficulty::Hard),
            "expert" | "extreme" => Ok(AiDifficulty::Expert),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Opponent replies kept per candidate. Zero scores candidates greedily.
    pub max_replies: usize,
    /// Half-width of the uniform noise added to each candidate score.
    pub jitter: f64,
    /// Zero means unbounded.
    pub time_limit: Duration,
}

impl AiConfig {
    pub fn from_difficulty(difficulty: AiDifficulty) -> Self {
        match difficulty {
            // Noise on the scale of a unit's worth, so Easy often misplays.
            AiDifficulty::Easy => Self {
                max_replies: 0,
                jitter: 60.0,
                time_limit: Duration::from_millis(80),
            },
            AiDifficulty::Normal => Self {
                max_replies: 8,
                jitter: 0.1,
                time_limit: Duration::from_millis(300),
            },
            AiDifficulty::Hard => Self {
                max_replies: 16,
                jitter: 0.1,
                time_limit: Duration::from_millis(600),
            },
            AiDifficulty::Expert => Self {
                max_replies: 32,
                jitter: 0.0,
                time_limit: Duration::from_millis(1200),
            },
        }
    }

    pub fn greedy() -> Self {
        Self {
            max_replies: 0,
            jitter: 0.0,
            time_limit: Duration::ZERO,
        }
    }

    pub fn with_max_replies(mut self, max_replies: usize) -> Self {
        self.max_replies = max_replies;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.max(0.0);
        self
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig::from_difficulty(AiDifficulty::Normal)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiDecision {
    pub action: Action,
    /// Worst-case evaluation of `action`, without jitter.
    pub score: f64,
    pub candidates: usize,
    pub replies: usize,
    pub timed_out: bool,
    pub duration_ms: u64,
}

#[derive(Default)]
struct SearchStats {
    candidates: usize,
    replies: usize,
    timed_out: bool,
}

pub struct AiAgent {
    config: AiConfig,
    rng: SmallRng,
}

impl AiAgent {
    pub fn new(config: AiConfig) -> Self {
        Self {
            config,
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(config: AiConfig, seed: u64) -> Self {
        Self {
            config,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    /// One-ply search: every own action is scored by the worst position the
    /// opponent can reach with one of its strongest replies.
    pub fn decide_action(&mut self, state: &GameState, player: PlayerId) -> AiDecision {
        let clock = Stopwatch::start();
        let mut stats = SearchStats::default();

        let mut candidates = enumerate_actions(state, player);
        if candidates.len() > 1 {
            candidates.retain(|action| !action.is_pass());
        }

        let mut best: Option<(Action, f64, f64)> = None;
        for action in candidates {
            if !self.config.time_limit.is_zero() && clock.elapsed() >= self.config.time_limit {
                stats.timed_out = true;
                break;
            }

            // Stale or illegal candidates are skipped, never fatal.
            let Ok((after, _)) = apply(state, &action) else {
                continue;
            };
            stats.candidates += 1;

            let score = self.worst_reply(&after, player, &mut stats);
            let ranked = score + self.random_noise();
            if best.as_ref().map_or(true, |(_, _, top)| ranked > *top) {
                best = Some((action, score, ranked));
            }
        }

        let (action, score) = match best {
            Some((action, score, _)) => (action, score),
            None => (Action::Pass { player }, evaluate(state, player)),
        };

        AiDecision {
            action,
            score,
            candidates: stats.candidates,
            replies: stats.replies,
            timed_out: stats.timed_out,
            duration_ms: clock.elapsed().as_millis() as u64,
        }
    }

    pub fn choose_action(&mut self, state: &GameState, player: PlayerId) -> Action {
        self.decide_action(state, player).action
    }

    /// Plays the current player's whole turn on `game`, then ends it.
    pub fn play_turn(&mut self, game: &mut Match) -> Result<Vec<GameEvent>, RuleError> {
        let player = game.current_player();
        let mut events = Vec::new();

        for _ in 0..MAX_ACTIONS_PER_TURN {
            if game.is_finished() || game.auto_end_pending() {
                break;
            }
            let decision = self.decide_action(game.state(), player);
            if decision.action.is_pass() {
                break;
            }
            events.extend(game.submit(decision.action)?);
        }

        if !game.is_finished() {
            events.extend(game.end_turn()?);
        }
        Ok(events)
    }

    fn worst_reply(&self, after: &GameState, player: PlayerId, stats: &mut SearchStats) -> f64 {
        if self.config.max_replies == 0 || after.is_finished() {
            return evaluate(after, player);
        }
        let Ok((projected, _)) = end_turn(after) else {
            return evaluate(after, player);
        };

        let enemy = player.opponent();
        let mut outcomes: Vec<(f64, f64)> = enumerate_actions(&projected, enemy)
            .iter()
            .filter_map(|reply| apply(&projected, reply).ok())
            .map(|(reached, _)| (evaluate(&reached, enemy), evaluate(&reached, player)))
            .collect();

        if outcomes.len() > self.config.max_replies {
            outcomes.sort_by(|a, b| b.0.total_cmp(&a.0));
            outcomes.truncate(self.config.max_replies);
        }
        stats.replies += outcomes.len();

        outcomes
            .iter()
            .map(|(_, ours)| *ours)
            .reduce(f64::min)
            .unwrap_or_else(|| evaluate(after, player))
    }

    fn random_noise(&mut self) -> f64 {
        if self.config.jitter <= 0.0 {
            0.0
        } else {
            (self.rng.gen::<f64>() - 0.5) * 2.0 * self.config.jitter
        }
    }
}

/// Picks an action for `player` with the default configuration.
pub fn choose_action(state: &GameState, player: PlayerId) -> Action {
    AiAgent::new(AiConfig::default()).choose_action(state, player)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{AttackTarget, Board, Position, Unit, UnitClass};

    fn skirmish() -> GameState {
        let board = Board::from_rows(&["......", "..~...", "......", "......"]).expect("board");
        let mut state = GameState::new(board, Position::new(0, 0), Position::new(5, 3));
        let raptor = state.allocate_id();
        state.units.push(Unit::new(
            raptor,
            PlayerId::One,
            UnitClass::Raptor,
            Position::new(3, 2),
        ));
        let parasaur = state.allocate_id();
        state.units.push(Unit::new(
            parasaur,
            PlayerId::Two,
            UnitClass::Parasaur,
            Position::new(3, 0),
        ));
        state.player_mut(PlayerId::One).steaks = 30;
        state.player_mut(PlayerId::Two).steaks = 30;
        state
    }

    #[test]
    fn only_easy_plays_noisily() {
        let easy = AiConfig::from_difficulty(AiDifficulty::Easy);
        let normal = AiConfig::from_difficulty(AiDifficulty::Normal);
        let hard = AiConfig::from_difficulty(AiDifficulty::Hard);
        assert!(normal.jitter <= 0.1);
        assert!(hard.jitter <= 0.1);
        assert_eq!(AiConfig::default().max_replies, normal.max_replies);
        assert!(easy.jitter > normal.jitter);
        assert_eq!(easy.max_replies, 0);
    }

    #[test]
    fn difficulty_names_parse() {
        assert_eq!("Hard".parse::<AiDifficulty>(), Ok(AiDifficulty::Hard));
        assert_eq!("medium".parse::<AiDifficulty>(), Ok(AiDifficulty::Normal));
        assert!("impossible".parse::<AiDifficulty>().is_err());
        assert_eq!(AiConfig::default().max_replies, 8);
    }

    #[test]
    fn zero_replies_is_greedy_one_ply() {
        let state = skirmish();
        let mut agent = AiAgent::with_seed(AiConfig::greedy(), 7);
        let decision = agent.decide_action(&state, PlayerId::One);

        let mut expected: Option<(Action, f64)> = None;
        for action in enumerate_actions(&state, PlayerId::One) {
            if action.is_pass() {
                continue;
            }
            let (after, _) = apply(&state, &action).expect("legal action applies");
            let score = evaluate(&after, PlayerId::One);
            if expected.as_ref().map_or(true, |(_, best)| score > *best) {
                expected = Some((action, score));
            }
        }
        let (action, score) = expected.expect("candidates exist");
        assert_eq!(decision.action, action);
        assert_eq!(decision.score, score);
        assert_eq!(decision.replies, 0);
    }

    #[test]
    fn takes_the_winning_hit() {
        let mut state = skirmish();
        state.player_mut(PlayerId::Two).egg.health = 30;
        state.units[0].position = Position::new(4, 3);

        let mut agent = AiAgent::with_seed(AiConfig::default().with_time_limit(Duration::ZERO), 1);
        let decision = agent.decide_action(&state, PlayerId::One);
        assert!(matches!(
            decision.action,
            Action::Attack {
                target: AttackTarget::Egg,
                ..
            }
        ));
        assert_eq!(decision.score, crate::ai::heuristics::WIN_SCORE);
    }

    #[test]
    fn reply_scores_are_worst_case() {
        let state = skirmish();
        let config = AiConfig::greedy().with_max_replies(usize::MAX);
        let mut agent = AiAgent::with_seed(config, 3);
        let decision = agent.decide_action(&state, PlayerId::One);

        let (after, _) = apply(&state, &decision.action).expect("chosen action applies");
        let (projected, _) = end_turn(&after).expect("turn ends");
        let worst = enumerate_actions(&projected, PlayerId::Two)
            .iter()
            .filter_map(|reply| apply(&projected, reply).ok())
            .map(|(reached, _)| evaluate(&reached, PlayerId::One))
            .fold(f64::INFINITY, f64::min);
        assert_eq!(decision.score, worst);
        assert!(decision.replies > 0);
    }

    #[test]
    fn falls_back_to_pass() {
        let mut state = skirmish();
        state.units.retain(|unit| unit.owner == PlayerId::Two);
        state.player_mut(PlayerId::One).steaks = 0;
        let mut agent = AiAgent::with_seed(AiConfig::default(), 5);
        let decision = agent.decide_action(&state, PlayerId::One);
        assert_eq!(
            decision.action,
            Action::Pass {
                player: PlayerId::One
            }
        );
        assert_eq!(decision.candidates, 1);
    }

    #[test]
    fn finished_match_yields_pass() {
        let mut state = skirmish();
        state.player_mut(PlayerId::One).egg.health = 0;
        state.evaluate_victory();
        let action = choose_action(&state, PlayerId::One);
        assert!(action.is_pass());
    }

    #[test]
    fn seeded_agents_agree() {
        let state = skirmish();
        let config = AiConfig::default()
            .with_jitter(5.0)
            .with_time_limit(Duration::ZERO);
        let first = AiAgent::with_seed(config.clone(), 42).decide_action(&state, PlayerId::One);
        let second = AiAgent::with_seed(config, 42).decide_action(&state, PlayerId::One);
        assert_eq!(first.action, second.action);
        assert_eq!(first.score, second.score);
    }

    #[test]
    fn search_never_touches_its_input() {
        let state = skirmish();
        let snapshot = state.clone();
        let mut agent = AiAgent::with_seed(AiConfig::default().with_time_limit(Duration::ZERO), 9);
        agent.decide_action(&state, PlayerId::One);
        assert_eq!(state, snapshot);
    }

    #[test]
    fn plays_a_full_turn_and_hands_over() {
        let mut game = Match::new(skirmish());
        let mut agent = AiAgent::with_seed(AiConfig::default().with_time_limit(Duration::ZERO), 11);
        let events = agent.play_turn(&mut game).expect("turn plays out");

        assert_eq!(game.current_player(), PlayerId::Two);
        assert!(events
            .iter()
            .any(|event| matches!(event, GameEvent::TurnEnded { player: PlayerId::One })));
        assert!(game.log().len() >= 2);
    }
}
