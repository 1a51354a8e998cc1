use std::fmt;

use serde::{Deserialize, Serialize};

use super::{
    actions::{self, Action, AttackTarget, UnitRef},
    board::Position,
    entities::{
        EntityId, Incubator, PlayerId, Trap, UnitClass, TRAP_DAMAGE, TRAP_IMMOBILIZE_TURNS,
    },
    state::{GameEvent, GameState, IntegrityError, VictoryReason, VictoryState},
};

pub const UNIT_KILL_BOUNTY: u32 = 20;
pub const INCUBATOR_KILL_BOUNTY: u32 = 15;
pub const TRAP_COST: u32 = 30;
/// Spawns must land within this many steps of the spawner's egg.
pub const SPAWN_RADIUS: u8 = 3;
pub const ATTACK_REACH: u16 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RuleError {
    GameFinished,
    NotPlayerTurn {
        expected: PlayerId,
        actual: PlayerId,
    },
    SpecialActionUsed {
        player: PlayerId,
    },
    UnitNotFound {
        unit: UnitRef,
    },
    UnitAlreadyActed {
        unit_id: EntityId,
    },
    UnitImmobilized {
        unit_id: EntityId,
        turns: u8,
    },
    OutOfBounds {
        position: Position,
    },
    OutOfRange {
        distance: u16,
        range: u16,
    },
    CellBlocked {
        position: Position,
    },
    NoTarget {
        position: Position,
    },
    OnCooldown {
        class: UnitClass,
        turns: u8,
    },
    InsufficientSteaks {
        required: u32,
        available: u32,
    },
    IntegrityViolation {
        error: IntegrityError,
    },
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::GameFinished => write!(f, "the match is already over"),
            RuleError::NotPlayerTurn { expected, actual } => {
                write!(f, "it is {expected}'s turn, not {actual}'s")
            }
            RuleError::SpecialActionUsed { player } => {
                write!(f, "{player} already spawned or trapped this turn")
            }
            RuleError::UnitNotFound { unit } => write!(
                f,
                "no class {} unit of {} at ({}, {})",
                u8::from(unit.class),
                unit.owner,
                unit.at.x,
                unit.at.y
            ),
            RuleError::UnitAlreadyActed { unit_id } => {
                write!(f, "unit {unit_id} has already acted")
            }
            RuleError::UnitImmobilized { unit_id, turns } => {
                write!(f, "unit {unit_id} is immobilized for {turns} more turn(s)")
            }
            RuleError::OutOfBounds { position } => {
                write!(f, "({}, {}) is off the board", position.x, position.y)
            }
            RuleError::OutOfRange { distance, range } => {
                write!(f, "distance {distance} exceeds range {range}")
            }
            RuleError::CellBlocked { position } => {
                write!(f, "({}, {}) is occupied", position.x, position.y)
            }
            RuleError::NoTarget { position } => {
                write!(f, "nothing to attack at ({}, {})", position.x, position.y)
            }
            RuleError::OnCooldown { class, turns } => write!(
                f,
                "class {} can be spawned again in {turns} turn(s)",
                u8::from(*class)
            ),
            RuleError::InsufficientSteaks {
                required,
                available,
            } => write!(f, "needs {required} steaks, has {available}"),
            RuleError::IntegrityViolation { error } => {
                write!(f, "state failed integrity check: {error:?}")
            }
        }
    }
}

impl std::error::Error for RuleError {}

/// New state plus what happened, as handed to the front-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResolution {
    pub state: GameState,
    pub events: Vec<GameEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub victory: Option<VictoryState>,
}

impl RuleResolution {
    pub fn new(state: GameState, mut events: Vec<GameEvent>) -> Self {
        let victory = state.outcome.clone();
        if let Some(ref outcome) = victory {
            let has_event = events
                .iter()
                .any(|event| matches!(event, GameEvent::GameWon { .. }));
            if !has_event {
                events.push(GameEvent::GameWon {
                    winner: outcome.winner,
                    reason: outcome.reason.clone(),
                });
            }
        }

        Self {
            state,
            events,
            victory,
        }
    }
}

pub(crate) fn ensure_integrity(state: &GameState) -> Result<(), RuleError> {
    state
        .integrity_check()
        .map_err(|error| RuleError::IntegrityViolation { error })
}

/// Applies `action` to a copy of `state`. The input is never touched.
pub fn apply(state: &GameState, action: &Action) -> Result<(GameState, Vec<GameEvent>), RuleError> {
    let mut next = state.clone();
    let events = apply_in_place(&mut next, action)?;
    Ok((next, events))
}

/// Validates `action` against `state`, then mutates. On `Err` the state is
/// exactly as it was.
pub fn apply_in_place(state: &mut GameState, action: &Action) -> Result<Vec<GameEvent>, RuleError> {
    match *action {
        Action::Move { unit, to } => {
            let index = actions::resolve_unit(state, &unit)?;
            actions::check_move(state, index, to)?;
            Ok(execute_move(state, index, to))
        }
        Action::Attack { unit, target } => {
            let index = actions::resolve_unit(state, &unit)?;
            actions::check_attack(state, index, target)?;
            Ok(execute_attack(state, index, target))
        }
        Action::Spawn { player, class, at } => {
            actions::check_spawn(state, player, class, at)?;
            Ok(execute_spawn(state, player, class, at))
        }
        Action::PlaceTrap { player, at } => {
            actions::check_trap(state, player, at)?;
            Ok(execute_trap(state, player, at))
        }
        Action::Pass { player } => Ok(vec![GameEvent::Passed { player }]),
    }
}

fn execute_move(state: &mut GameState, index: usize, to: Position) -> Vec<GameEvent> {
    let mut events = Vec::new();
    let unit = &mut state.units[index];
    let from = unit.position;
    let owner = unit.owner;
    let unit_id = unit.id;
    unit.position = to;
    unit.has_acted = true;
    events.push(GameEvent::UnitMoved {
        owner,
        unit_id,
        from,
        to,
    });

    let Some(trap_index) = state
        .traps
        .iter()
        .position(|trap| trap.position == to && trap.is_armed_against(owner))
    else {
        return events;
    };
    let trap = state.traps.remove(trap_index);

    let unit = &mut state.units[index];
    unit.take_damage(TRAP_DAMAGE);
    unit.immobilized_turns = TRAP_IMMOBILIZE_TURNS;
    let remaining = unit.health;
    events.push(GameEvent::TrapTriggered {
        trap_owner: trap.owner,
        trap_id: trap.id,
        unit_id,
        position: to,
        damage: TRAP_DAMAGE,
    });
    events.push(GameEvent::UnitDamaged {
        owner,
        unit_id,
        amount: TRAP_DAMAGE,
        remaining,
    });

    if remaining <= 0 {
        let dead = state.units.remove(index);
        events.push(GameEvent::UnitKilled {
            owner,
            unit_id,
            class: dead.class,
            position: to,
            bounty: 0,
        });
    }
    events
}

fn execute_attack(state: &mut GameState, index: usize, target: AttackTarget) -> Vec<GameEvent> {
    let mut events = Vec::new();
    let attacker = &mut state.units[index];
    attacker.has_acted = true;
    let damage = attacker.attack();
    let owner = attacker.owner;
    let enemy = owner.opponent();

    match target {
        AttackTarget::Unit { at } => {
            let Some(defender_index) = state
                .units
                .iter()
                .position(|unit| unit.position == at && unit.owner == enemy)
            else {
                return events;
            };
            let defender = &mut state.units[defender_index];
            defender.take_damage(damage);
            events.push(GameEvent::UnitDamaged {
                owner: enemy,
                unit_id: defender.id,
                amount: damage,
                remaining: defender.health,
            });
            if defender.health <= 0 {
                let dead = state.units.remove(defender_index);
                state.player_mut(owner).steaks += UNIT_KILL_BOUNTY;
                events.push(GameEvent::UnitKilled {
                    owner: enemy,
                    unit_id: dead.id,
                    class: dead.class,
                    position: dead.position,
                    bounty: UNIT_KILL_BOUNTY,
                });
            }
        }
        AttackTarget::Egg => {
            let egg = &mut state.player_mut(enemy).egg;
            egg.take_damage(damage);
            events.push(GameEvent::EggDamaged {
                owner: enemy,
                amount: damage,
                remaining: egg.health,
            });
            if egg.is_destroyed() {
                let reason = VictoryReason::EggDestroyed { loser: enemy };
                let outcome = state.declare_victory(owner, reason);
                events.push(GameEvent::GameWon {
                    winner: outcome.winner,
                    reason: outcome.reason,
                });
            }
        }
        AttackTarget::Incubator { at } => {
            let Some(incubator_index) = state
                .incubators
                .iter()
                .position(|incubator| incubator.position == at && incubator.owner == enemy)
            else {
                return events;
            };
            let incubator = &mut state.incubators[incubator_index];
            incubator.take_damage(damage);
            events.push(GameEvent::IncubatorDamaged {
                owner: enemy,
                incubator_id: incubator.id,
                amount: damage,
                remaining: incubator.health.max(0),
            });
            if incubator.health <= 0 {
                let destroyed = state.incubators.remove(incubator_index);
                state.player_mut(owner).steaks += INCUBATOR_KILL_BOUNTY;
                events.push(GameEvent::IncubatorDestroyed {
                    owner: enemy,
                    incubator_id: destroyed.id,
                    position: destroyed.position,
                    bounty: INCUBATOR_KILL_BOUNTY,
                });
            }
        }
    }
    events
}

fn close_turn_for(state: &mut GameState, player: PlayerId) {
    if state.current_player == player {
        state.special_action_used = true;
        state.auto_end_pending = true;
    }
}

fn execute_spawn(
    state: &mut GameState,
    player: PlayerId,
    class: UnitClass,
    at: Position,
) -> Vec<GameEvent> {
    let stats = class.stats();
    let id = state.allocate_id();
    state.incubators.push(Incubator::new(id, player, class, at));

    let spawner = state.player_mut(player);
    spawner.steaks -= stats.cost;
    spawner.cooldowns[class.index()] = stats.spawn_cooldown;
    close_turn_for(state, player);

    vec![GameEvent::SpawnStarted {
        owner: player,
        incubator_id: id,
        class,
        position: at,
        cost: stats.cost,
    }]
}

fn execute_trap(state: &mut GameState, player: PlayerId, at: Position) -> Vec<GameEvent> {
    let id = state.allocate_id();
    state.traps.push(Trap::new(id, player, at));
    state.player_mut(player).steaks -= TRAP_COST;
    close_turn_for(state, player);

    vec![GameEvent::TrapPlaced {
        owner: player,
        trap_id: id,
        position: at,
        cost: TRAP_COST,
    }]
}
