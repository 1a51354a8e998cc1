//! Rules of the match: board, pieces, legal actions and turn flow.

pub mod actions;
pub mod board;
pub mod entities;
pub mod rules;
pub mod state;
pub mod turn;

pub use actions::{enumerate_actions, Action, AttackTarget, UnitRef};
pub use board::{Board, BoardError, Position, Terrain};
pub use entities::{
    Egg,
    EntityId,
    IncubationStage,
    Incubator,
    PlayerId,
    Trap,
    Unit,
    UnitClass,
    UnitStats,
};
pub use rules::{apply, apply_in_place, RuleError, RuleResolution};
pub use state::{
    GameEvent,
    GameState,
    IntegrityError,
    Player,
    VictoryReason,
    VictoryState,
};
pub use turn::{end_turn, end_turn_in_place, Match, TurnRecord};
