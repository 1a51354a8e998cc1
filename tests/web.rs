//! Browser smoke tests, run with `wasm-pack test --headless --chrome`.
#![cfg(target_arch = "wasm32")]

use egg_fortress::{
    auto_end_delay_ms, create_game_state, enumerate_actions_js, hatch_animation_ms, evaluate_state, validate_state, Action, GameEngine,
    GameState, PlayerId,
};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn engine_round_trips_state_json() {
    let engine = GameEngine::new(None).expect("engine");
    let json = engine.state_json().expect("state json");
    let state: GameState = serde_json::from_str(&json).expect("state parses");
    assert_eq!(state, GameState::standard());
}

#[wasm_bindgen_test]
fn engine_rejects_out_of_turn_actions() {
    let mut engine = GameEngine::new(None).expect("engine");
    let pass = serde_json::to_string(&Action::Pass {
        player: PlayerId::Two,
    })
    .expect("action json");
    assert!(engine.submit_json(&pass).is_err());
}

#[wasm_bindgen_test]
fn ai_move_is_applied() {
    let mut engine = GameEngine::new(None).expect("engine");
    engine
        .apply_ai_move(Some("easy".into()))
        .expect("ai move applies");
    assert!(engine.legal_actions_json().is_ok());
}

#[wasm_bindgen_test]
fn free_functions_accept_js_values() {
    let state = create_game_state().expect("state");
    validate_state(state.clone()).expect("standard state is valid");
    let actions = enumerate_actions_js(state.clone(), 1).expect("actions");
    assert!(!actions.is_undefined());
    assert_eq!(evaluate_state(state, 2).expect("score"), 0.0);
}

#[wasm_bindgen_test]
fn engine_rejects_inconsistent_initial_state() {
    let mut state = GameState::standard();
    state.players.swap(0, 1);
    let json = serde_json::to_string(&state).expect("state json");
    assert!(GameEngine::new(Some(json)).is_err());

    let truncated = r#"{"board":{"width":16,"height":12,"cells":["Open"]}}"#;
    assert!(GameEngine::new(Some(truncated.into())).is_err());
}

#[wasm_bindgen_test]
fn delays_are_readable_from_js() {
    assert_eq!(auto_end_delay_ms(), 1000);
    assert_eq!(hatch_animation_ms(), 500);
}
