use serde::{Deserialize, Serialize};

use super::{
    actions::{enumerate_actions, Action},
    board::{Board, Position},
    entities::{IncubationStage, PlayerId, Unit},
    rules::{self, RuleError},
    state::{GameEvent, GameState, VictoryState},
};

pub const TURN_INCOME: u32 = 20;
/// How long the front-end waits before closing a turn after a spawn or trap.
pub const AUTO_END_DELAY_MS: u32 = 1000;
/// Presentation only; hatching is already resolved when the turn ends.
pub const HATCH_ANIMATION_MS: u32 = 500;

/// Hands the turn over. See [`end_turn_in_place`].
pub fn end_turn(state: &GameState) -> Result<(GameState, Vec<GameEvent>), RuleError> {
    let mut next = state.clone();
    let events = end_turn_in_place(&mut next)?;
    Ok((next, events))
}

/// Closes the current player's turn: pays income, ticks their cooldowns,
/// advances every incubator and hatches the finished ones, then readies the
/// other player's units and gives them the turn.
pub fn end_turn_in_place(state: &mut GameState) -> Result<Vec<GameEvent>, RuleError> {
    if state.is_finished() {
        return Err(RuleError::GameFinished);
    }

    let ending = state.current_player;
    let next = ending.opponent();
    let mut events = vec![GameEvent::TurnEnded { player: ending }];

    let player = state.player_mut(ending);
    player.steaks += TURN_INCOME;
    player.tick_cooldowns();
    events.push(GameEvent::SteaksGranted {
        player: ending,
        amount: TURN_INCOME,
    });

    for incubator in &mut state.incubators {
        incubator.advance();
    }
    let (hatching, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut state.incubators)
        .into_iter()
        .partition(|incubator| incubator.stage == IncubationStage::Hatching);
    state.incubators = waiting;
    for incubator in hatching {
        let unit_id = state.allocate_id();
        state.units.push(Unit::new(
            unit_id,
            incubator.owner,
            incubator.class,
            incubator.position,
        ));
        events.push(GameEvent::EggHatched {
            owner: incubator.owner,
            incubator_id: incubator.id,
            unit_id,
            class: incubator.class,
            position: incubator.position,
        });
    }

    for unit in state.units.iter_mut().filter(|unit| unit.owner == next) {
        unit.has_acted = false;
        unit.immobilized_turns = unit.immobilized_turns.saturating_sub(1);
    }

    state.current_player = next;
    if next == PlayerId::One {
        state.turn += 1;
    }
    state.special_action_used = false;
    state.auto_end_pending = false;
    events.push(GameEvent::TurnStarted {
        player: next,
        turn: state.turn,
    });

    if let Some(outcome) = state.evaluate_victory() {
        events.push(GameEvent::GameWon {
            winner: outcome.winner,
            reason: outcome.reason,
        });
    }

    Ok(events)
}

/// One entry of the match history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnRecord {
    pub turn: u32,
    pub player: PlayerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    pub events: Vec<GameEvent>,
}

/// A live match: the state, whose turn it is, and what has happened so far.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Match {
    state: GameState,
    #[serde(default)]
    log: Vec<TurnRecord>,
}

impl Match {
    pub fn new(state: GameState) -> Self {
        Self {
            state,
            log: Vec::new(),
        }
    }

    pub fn standard() -> Self {
        Self::new(GameState::standard())
    }

    pub fn on_board(board: Board, egg_one: Position, egg_two: Position) -> Self {
        Self::new(GameState::new(board, egg_one, egg_two))
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn into_state(self) -> GameState {
        self.state
    }

    pub fn current_player(&self) -> PlayerId {
        self.state.current_player
    }

    pub fn turn(&self) -> u32 {
        self.state.turn
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    pub fn outcome(&self) -> Option<&VictoryState> {
        self.state.outcome.as_ref()
    }

    /// The current player spawned or trapped and the turn should close soon.
    pub fn auto_end_pending(&self) -> bool {
        self.state.auto_end_pending
    }

    pub fn log(&self) -> &[TurnRecord] {
        &self.log
    }

    pub fn legal_actions(&self) -> Vec<Action> {
        enumerate_actions(&self.state, self.state.current_player)
    }

    /// Plays `action` for the current player. A pass also ends the turn.
    pub fn submit(&mut self, action: Action) -> Result<Vec<GameEvent>, RuleError> {
        if self.state.is_finished() {
            return Err(RuleError::GameFinished);
        }
        let expected = self.state.current_player;
        let actual = action.actor();
        if actual != expected {
            return Err(RuleError::NotPlayerTurn { expected, actual });
        }
        rules::ensure_integrity(&self.state)?;

        let turn = self.state.turn;
        let mut events = rules::apply_in_place(&mut self.state, &action)?;
        if action.is_pass() {
            events.extend(end_turn_in_place(&mut self.state)?);
        }

        self.log.push(TurnRecord {
            turn,
            player: expected,
            action: Some(action),
            events: events.clone(),
        });
        Ok(events)
    }

    pub fn end_turn(&mut self) -> Result<Vec<GameEvent>, RuleError> {
        let turn = self.state.turn;
        let player = self.state.current_player;
        let events = end_turn_in_place(&mut self.state)?;
        self.log.push(TurnRecord {
            turn,
            player,
            action: None,
            events: events.clone(),
        });
        Ok(events)
    }
}
