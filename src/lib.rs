pub mod ai;
pub mod game;
#[macro_use]
pub mod utils;

use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

use gloo_timers::future::TimeoutFuture;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{choose_action, evaluate, AiAgent, AiConfig, AiDecision, AiDifficulty};
pub use game::{
    apply, apply_in_place, end_turn, end_turn_in_place, enumerate_actions, Action, AttackTarget,
    Board, GameEvent, GameState, IntegrityError, Match, PlayerId, Position, RuleError,
    RuleResolution, TurnRecord, UnitClass, UnitRef, VictoryReason, VictoryState,
};

use game::turn::{AUTO_END_DELAY_MS, HATCH_ANIMATION_MS};
use utils::set_panic_hook;

#[cfg(all(feature = "wee_alloc", target_arch = "wasm32"))]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
}

fn to_js_error(error: RuleError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn load_state(json: &str) -> Result<GameState, JsValue> {
    let state: GameState = serde_json::from_str(json).map_err(serde_to_js_error)?;
    state
        .integrity_check()
        .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))?;
    Ok(state)
}

fn player_from_js(player_id: u8) -> Result<PlayerId, JsValue> {
    PlayerId::try_from(player_id).map_err(|message| JsValue::from_str(&message))
}

fn config_for(difficulty: Option<String>) -> AiConfig {
    let difficulty = difficulty
        .as_deref()
        .and_then(|value| AiDifficulty::from_str(value).ok())
        .unwrap_or(AiDifficulty::Normal);
    AiConfig::from_difficulty(difficulty)
}

fn make_resolution_json(state: &GameState, events: Vec<GameEvent>) -> Result<String, JsValue> {
    let resolution = RuleResolution::new(state.clone(), events);
    serde_json::to_string(&resolution).map_err(serde_to_js_error)
}

fn log_decision(player: PlayerId, decision: &AiDecision) {
    console_log!(
        "ai {player}: {:?} scored {:.1} ({} candidates, {} replies, {} ms{})",
        decision.action,
        decision.score,
        decision.candidates,
        decision.replies,
        decision.duration_ms,
        if decision.timed_out { ", timed out" } else { "" }
    );
}

#[derive(Serialize)]
struct AiMoveResponse {
    decision: AiDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    applied: Option<RuleResolution>,
}

/// A live match for the front end. State goes in and out as JSON.
#[wasm_bindgen]
pub struct GameEngine {
    game: Rc<RefCell<Match>>,
}

#[wasm_bindgen]
impl GameEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(initial_state_json: Option<String>) -> Result<GameEngine, JsValue> {
        let state = match initial_state_json {
            Some(json) => load_state(&json)?,
            None => GameState::standard(),
        };
        Ok(GameEngine {
            game: Rc::new(RefCell::new(Match::new(state))),
        })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.game.borrow().state()).map_err(serde_to_js_error)
    }

    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        let state = load_state(json)?;
        *self.game.borrow_mut() = Match::new(state);
        Ok(())
    }

    pub fn log_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.game.borrow().log()).map_err(serde_to_js_error)
    }

    pub fn legal_actions_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.game.borrow().legal_actions()).map_err(serde_to_js_error)
    }

    pub fn submit_json(&mut self, action_json: &str) -> Result<String, JsValue> {
        let action: Action = serde_json::from_str(action_json).map_err(serde_to_js_error)?;
        let mut game = self.game.borrow_mut();
        let events = game.submit(action).map_err(to_js_error)?;
        make_resolution_json(game.state(), events)
    }

    pub fn end_turn(&mut self) -> Result<String, JsValue> {
        let mut game = self.game.borrow_mut();
        let events = game.end_turn().map_err(to_js_error)?;
        make_resolution_json(game.state(), events)
    }

    pub fn auto_end_pending(&self) -> bool {
        self.game.borrow().auto_end_pending()
    }

    pub fn evaluate(&self, player_id: u8) -> Result<f64, JsValue> {
        let player = player_from_js(player_id)?;
        Ok(evaluate(self.game.borrow().state(), player))
    }

    /// Lets the computer take one action for the current player.
    pub fn apply_ai_move(&mut self, difficulty: Option<String>) -> Result<String, JsValue> {
        let mut game = self.game.borrow_mut();
        let player = game.current_player();
        let mut agent = AiAgent::new(config_for(difficulty));
        let decision = agent.decide_action(game.state(), player);
        log_decision(player, &decision);

        let events = game.submit(decision.action).map_err(to_js_error)?;
        let applied = Some(RuleResolution::new(game.state().clone(), events));
        let response = AiMoveResponse { decision, applied };
        serde_json::to_string(&response).map_err(serde_to_js_error)
    }

    /// Lets the computer play out the current player's turn and end it.
    pub fn play_ai_turn(&mut self, difficulty: Option<String>) -> Result<String, JsValue> {
        let mut game = self.game.borrow_mut();
        let mut agent = AiAgent::new(config_for(difficulty));
        let events = agent.play_turn(&mut game).map_err(to_js_error)?;
        make_resolution_json(game.state(), events)
    }

    /// Resolves to the decision JSON after `delay_ms`, without applying it.
    pub fn think_ai(&self, difficulty: Option<String>, delay_ms: Option<u32>) -> Promise {
        let state = self.game.borrow().state().clone();
        let config = config_for(difficulty);
        let delay = delay_ms.unwrap_or(0);

        future_to_promise(async move {
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let player = state.current_player;
            let mut agent = AiAgent::new(config);
            let decision = agent.decide_action(&state, player);
            log_decision(player, &decision);
            let json = serde_json::to_string(&decision).map_err(serde_to_js_error)?;
            Ok(JsValue::from_str(&json))
        })
    }

    /// Ends the turn after the auto-end delay if it is still the same turn
    /// and still pending. Resolves to the resolution JSON, or `null`.
    pub fn schedule_auto_end(&self) -> Promise {
        let game = Rc::clone(&self.game);
        let (turn, player) = {
            let current = game.borrow();
            (current.turn(), current.current_player())
        };

        future_to_promise(async move {
            TimeoutFuture::new(AUTO_END_DELAY_MS).await;
            let mut game = game.borrow_mut();
            let unchanged = game.turn() == turn && game.current_player() == player;
            if !unchanged || !game.auto_end_pending() {
                return Ok(JsValue::NULL);
            }
            let events = game.end_turn().map_err(to_js_error)?;
            console_log!("auto-ended turn {turn} for {player}");
            let json = make_resolution_json(game.state(), events)?;
            Ok(JsValue::from_str(&json))
        })
    }
}

/// How long the front end waits before ending a turn closed by a spawn or trap.
#[wasm_bindgen(js_name = "autoEndDelayMs")]
pub fn auto_end_delay_ms() -> u32 {
    AUTO_END_DELAY_MS
}

/// Length of the hatch animation the front end plays when an incubator opens.
#[wasm_bindgen(js_name = "hatchAnimationMs")]
pub fn hatch_animation_ms() -> u32 {
    HATCH_ANIMATION_MS
}

/// Fresh match on the standard board.
#[wasm_bindgen(js_name = "createGameState")]
pub fn create_game_state() -> Result<JsValue, JsValue> {
    to_value(&GameState::standard()).map_err(JsValue::from)
}

/// A mid-game position, handy for front-end debugging.
#[wasm_bindgen(js_name = "createSampleState")]
pub fn create_sample_state() -> Result<JsValue, JsValue> {
    to_value(&GameState::sample()).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "enumerateActions")]
pub fn enumerate_actions_js(state: JsValue, player_id: u8) -> Result<JsValue, JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    let player = player_from_js(player_id)?;
    to_value(&enumerate_actions(&state, player)).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "applyAction")]
pub fn apply_action(state: JsValue, action: JsValue) -> Result<JsValue, JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    let action: Action = from_value(action).map_err(JsValue::from)?;
    match apply(&state, &action) {
        Ok((next, events)) => to_value(&RuleResolution::new(next, events)).map_err(JsValue::from),
        Err(error) => Err(to_js_error(error)),
    }
}

#[wasm_bindgen(js_name = "endTurn")]
pub fn end_turn_js(state: JsValue) -> Result<JsValue, JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    match end_turn(&state) {
        Ok((next, events)) => to_value(&RuleResolution::new(next, events)).map_err(JsValue::from),
        Err(error) => Err(to_js_error(error)),
    }
}

#[wasm_bindgen(js_name = "evaluateState")]
pub fn evaluate_state(state: JsValue, player_id: u8) -> Result<f64, JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    let player = player_from_js(player_id)?;
    Ok(evaluate(&state, player))
}

#[wasm_bindgen(js_name = "chooseAction")]
pub fn choose_action_js(
    state: JsValue,
    player_id: u8,
    difficulty: Option<String>,
) -> Result<JsValue, JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    let player = player_from_js(player_id)?;
    let mut agent = AiAgent::new(config_for(difficulty));
    let decision = agent.decide_action(&state, player);
    log_decision(player, &decision);
    to_value(&decision).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    state
        .integrity_check()
        .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn front_end_delays_are_exposed() {
        assert_eq!(auto_end_delay_ms(), 1000);
        assert_eq!(hatch_animation_ms(), 500);
    }
}
