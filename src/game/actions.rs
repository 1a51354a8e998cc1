use serde::{Deserialize, Serialize};

use super::board::Position;
use super::entities::{PlayerId, Unit, UnitClass};
use super::rules::{RuleError, ATTACK_REACH, SPAWN_RADIUS, TRAP_COST};
use super::state::GameState;

/// Names a unit by what it is and where it stands, so an action built
/// against one copy of the state can be re-resolved against another.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct UnitRef {
    pub owner: PlayerId,
    pub class: UnitClass,
    pub at: Position,
}

impl From<&Unit> for UnitRef {
    fn from(unit: &Unit) -> Self {
        Self {
            owner: unit.owner,
            class: unit.class,
            at: unit.position,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind")]
pub enum AttackTarget {
    Unit { at: Position },
    Egg,
    Incubator { at: Position },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type")]
pub enum Action {
    Move {
        unit: UnitRef,
        to: Position,
    },
    Attack {
        unit: UnitRef,
        target: AttackTarget,
    },
    Spawn {
        player: PlayerId,
        class: UnitClass,
        at: Position,
    },
    PlaceTrap {
        player: PlayerId,
        at: Position,
    },
    Pass {
        player: PlayerId,
    },
}

impl Action {
    pub fn actor(&self) -> PlayerId {
        match self {
            Action::Move { unit, .. } | Action::Attack { unit, .. } => unit.owner,
            Action::Spawn { player, .. }
            | Action::PlaceTrap { player, .. }
            | Action::Pass { player } => *player,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Action::Pass { .. })
    }

    /// Spawns and traps use up the player's turn.
    pub fn is_special(&self) -> bool {
        matches!(self, Action::Spawn { .. } | Action::PlaceTrap { .. })
    }
}

pub(crate) fn ensure_turn_open(state: &GameState, player: PlayerId) -> Result<(), RuleError> {
    if state.is_finished() {
        return Err(RuleError::GameFinished);
    }
    if player == state.current_player && state.special_action_used {
        return Err(RuleError::SpecialActionUsed { player });
    }
    Ok(())
}

pub(crate) fn resolve_unit(state: &GameState, unit: &UnitRef) -> Result<usize, RuleError> {
    state
        .find_unit(unit.owner, unit.class, unit.at)
        .ok_or(RuleError::UnitNotFound { unit: *unit })
}

fn ensure_ready(unit: &Unit) -> Result<(), RuleError> {
    if unit.has_acted {
        return Err(RuleError::UnitAlreadyActed { unit_id: unit.id });
    }
    if unit.immobilized_turns > 0 {
        return Err(RuleError::UnitImmobilized {
            unit_id: unit.id,
            turns: unit.immobilized_turns,
        });
    }
    Ok(())
}

pub(crate) fn check_move(state: &GameState, index: usize, to: Position) -> Result<(), RuleError> {
    let unit = &state.units[index];
    ensure_turn_open(state, unit.owner)?;
    ensure_ready(unit)?;
    if !state.board.in_bounds(to) {
        return Err(RuleError::OutOfBounds { position: to });
    }
    let range = unit.effective_range(&state.board);
    let distance = unit.position.manhattan(to);
    if distance == 0 || distance > u16::from(range) {
        return Err(RuleError::OutOfRange {
            distance,
            range: u16::from(range),
        });
    }
    if state.blocks_movement(to) {
        return Err(RuleError::CellBlocked { position: to });
    }
    Ok(())
}

pub(crate) fn check_attack(
    state: &GameState,
    index: usize,
    target: AttackTarget,
) -> Result<(), RuleError> {
    let unit = &state.units[index];
    ensure_turn_open(state, unit.owner)?;
    ensure_ready(unit)?;
    let enemy = unit.owner.opponent();

    let (position, reach) = match target {
        AttackTarget::Unit { at } => {
            let defender = state.unit_at(at).filter(|defender| defender.owner == enemy);
            if defender.is_none() {
                return Err(RuleError::NoTarget { position: at });
            }
            (at, ATTACK_REACH)
        }
        AttackTarget::Egg => (state.egg(enemy).position, ATTACK_REACH),
        AttackTarget::Incubator { at } => {
            let incubator = state
                .incubator_at(at)
                .filter(|incubator| incubator.owner == enemy);
            if incubator.is_none() {
                return Err(RuleError::NoTarget { position: at });
            }
            (at, u16::from(unit.class.stats().move_range))
        }
    };

    let distance = unit.position.manhattan(position);
    if distance > reach {
        return Err(RuleError::OutOfRange {
            distance,
            range: reach,
        });
    }
    Ok(())
}

fn ensure_placeable(state: &GameState, at: Position) -> Result<(), RuleError> {
    if !state.board.in_bounds(at) {
        return Err(RuleError::OutOfBounds { position: at });
    }
    if state.is_occupied(at) {
        return Err(RuleError::CellBlocked { position: at });
    }
    Ok(())
}

fn ensure_affordable(state: &GameState, player: PlayerId, cost: u32) -> Result<(), RuleError> {
    let available = state.player(player).steaks;
    if available < cost {
        return Err(RuleError::InsufficientSteaks {
            required: cost,
            available,
        });
    }
    Ok(())
}

pub(crate) fn check_spawn(
    state: &GameState,
    player: PlayerId,
    class: UnitClass,
    at: Position,
) -> Result<(), RuleError> {
    ensure_turn_open(state, player)?;
    let turns = state.player(player).cooldown(class);
    if turns > 0 {
        return Err(RuleError::OnCooldown { class, turns });
    }
    ensure_affordable(state, player, class.stats().cost)?;
    ensure_placeable(state, at)?;
    let distance = state.egg(player).position.manhattan(at);
    if distance > u16::from(SPAWN_RADIUS) {
        return Err(RuleError::OutOfRange {
            distance,
            range: u16::from(SPAWN_RADIUS),
        });
    }
    Ok(())
}

pub(crate) fn check_trap(state: &GameState, player: PlayerId, at: Position) -> Result<(), RuleError> {
    ensure_turn_open(state, player)?;
    ensure_affordable(state, player, TRAP_COST)?;
    ensure_placeable(state, at)
}

/// Every action `player` may take in `state`. Always ends with `Pass`.
///
/// Ownership of the turn is not checked here, so the search can ask what
/// the opponent could do; the [`Match`](super::turn::Match) enforces it for
/// live play.
pub fn enumerate_actions(state: &GameState, player: PlayerId) -> Vec<Action> {
    let mut actions = Vec::new();
    let pass = Action::Pass { player };

    if ensure_turn_open(state, player).is_err() {
        actions.push(pass);
        return actions;
    }

    let board = &state.board;
    let enemy = player.opponent();

    for (index, unit) in state.units.iter().enumerate() {
        if unit.owner != player || !unit.is_ready() {
            continue;
        }
        let unit_ref = UnitRef::from(unit);

        let range = unit.effective_range(board);
        for to in unit.position.within(range, board) {
            if to != unit.position && !state.blocks_movement(to) {
                actions.push(Action::Move { unit: unit_ref, to });
            }
        }

        for cell in unit.position.within(ATTACK_REACH as u8, board) {
            if state.unit_at(cell).is_some_and(|other| other.owner == enemy) {
                actions.push(Action::Attack {
                    unit: unit_ref,
                    target: AttackTarget::Unit { at: cell },
                });
            }
        }
        if unit.position.manhattan(state.egg(enemy).position) <= ATTACK_REACH {
            actions.push(Action::Attack {
                unit: unit_ref,
                target: AttackTarget::Egg,
            });
        }
        for incubator in state.incubators_of(enemy) {
            let target = AttackTarget::Incubator {
                at: incubator.position,
            };
            if check_attack(state, index, target).is_ok() {
                actions.push(Action::Attack {
                    unit: unit_ref,
                    target,
                });
            }
        }
    }

    let egg = state.egg(player).position;
    for at in egg.within(SPAWN_RADIUS, board) {
        if state.is_occupied(at) {
            continue;
        }
        for class in UnitClass::ALL {
            if check_spawn(state, player, class, at).is_ok() {
                actions.push(Action::Spawn { player, class, at });
            }
        }
    }

    if state.player(player).can_afford(TRAP_COST) {
        for at in board.cells() {
            if !state.is_occupied(at) {
                actions.push(Action::PlaceTrap { player, at });
            }
        }
    }

    actions.push(pass);
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::Board;
    use crate::game::entities::{Incubator, Trap};

    fn arena(rows: &[&str], egg_one: (u8, u8), egg_two: (u8, u8)) -> GameState {
        let board = Board::from_rows(rows).expect("board");
        GameState::new(
            board,
            Position::new(egg_one.0, egg_one.1),
            Position::new(egg_two.0, egg_two.1),
        )
    }

    fn add_unit(state: &mut GameState, owner: PlayerId, class: UnitClass, x: u8, y: u8) {
        let id = state.allocate_id();
        state
            .units
            .push(Unit::new(id, owner, class, Position::new(x, y)));
    }

    #[test]
    fn pass_is_always_offered() {
        let mut state = GameState::standard();
        assert!(enumerate_actions(&state, PlayerId::One).contains(&Action::Pass {
            player: PlayerId::One
        }));

        state.player_mut(PlayerId::One).steaks = 0;
        assert_eq!(
            enumerate_actions(&state, PlayerId::One),
            vec![Action::Pass {
                player: PlayerId::One
            }]
        );

        state.player_mut(PlayerId::Two).egg.health = 0;
        state.evaluate_victory();
        assert_eq!(enumerate_actions(&state, PlayerId::Two).len(), 1);
    }

    #[test]
    fn moves_respect_range_and_blockers() {
        let mut state = arena(
            &[
                ".......", //
                ".......", //
                "...#...", //
                ".......", //
                ".......", //
            ],
            (0, 0),
            (6, 4),
        );
        state.player_mut(PlayerId::One).steaks = 0;
        add_unit(&mut state, PlayerId::One, UnitClass::Raptor, 3, 3);
        add_unit(&mut state, PlayerId::Two, UnitClass::Rex, 4, 3);

        let before = state.clone();
        let actions = enumerate_actions(&state, PlayerId::One);
        let moves: Vec<Position> = actions
            .iter()
            .filter_map(|action| match action {
                Action::Move { to, .. } => Some(*to),
                _ => None,
            })
            .collect();

        assert!(!moves.is_empty());
        for to in &moves {
            assert!(to.manhattan(Position::new(3, 3)) <= 3);
            assert!(!before.blocks_movement(*to));
        }
        assert!(!moves.contains(&Position::new(3, 2)), "obstacle");
        assert!(!moves.contains(&Position::new(4, 3)), "enemy unit");
        assert!(!moves.contains(&Position::new(0, 0)), "own egg");
        assert!(actions.iter().any(|action| matches!(
            action,
            Action::Attack {
                target: AttackTarget::Unit { at },
                ..
            } if *at == Position::new(4, 3)
        )));
    }

    #[test]
    fn rough_ground_halves_moves() {
        let mut state = arena(&["~....", ".....", "....."], (4, 2), (4, 0));
        state.player_mut(PlayerId::One).steaks = 0;
        add_unit(&mut state, PlayerId::One, UnitClass::Raptor, 0, 0);
        let moves = enumerate_actions(&state, PlayerId::One)
            .into_iter()
            .filter(|action| matches!(action, Action::Move { .. }))
            .count();
        assert_eq!(moves, 2);
    }

    #[test]
    fn traps_do_not_block_moves_but_are_not_placeable() {
        let mut state = arena(&["....", "....", "...."], (0, 0), (3, 2));
        add_unit(&mut state, PlayerId::One, UnitClass::Raptor, 1, 1);
        let trap = state.allocate_id();
        state
            .traps
            .push(Trap::new(trap, PlayerId::Two, Position::new(2, 1)));

        let actions = enumerate_actions(&state, PlayerId::One);
        assert!(actions.contains(&Action::Move {
            unit: UnitRef {
                owner: PlayerId::One,
                class: UnitClass::Raptor,
                at: Position::new(1, 1),
            },
            to: Position::new(2, 1),
        }));
        assert!(!actions.contains(&Action::PlaceTrap {
            player: PlayerId::One,
            at: Position::new(2, 1),
        }));
    }

    #[test]
    fn spawns_need_steaks_cooldown_and_egg_proximity() {
        let mut state = GameState::standard();
        state.player_mut(PlayerId::One).steaks = 80;
        state.player_mut(PlayerId::One).cooldowns = [1, 0, 0];

        let spawns: Vec<Action> = enumerate_actions(&state, PlayerId::One)
            .into_iter()
            .filter(|action| matches!(action, Action::Spawn { .. }))
            .collect();
        assert!(!spawns.is_empty());
        for spawn in &spawns {
            let Action::Spawn { class, at, .. } = spawn else {
                unreachable!();
            };
            assert_eq!(*class, UnitClass::Parasaur);
            assert!(at.manhattan(Position::new(1, 1)) <= 3);
            assert!(!state.is_occupied(*at));
        }
    }

    #[test]
    fn special_action_closes_the_turn() {
        let mut state = GameState::sample();
        state.special_action_used = true;
        assert_eq!(
            enumerate_actions(&state, PlayerId::One),
            vec![Action::Pass {
                player: PlayerId::One
            }]
        );
        // The flag belongs to the current player only.
        assert!(enumerate_actions(&state, PlayerId::Two).len() > 1);
    }

    #[test]
    fn incubators_are_attackable_within_full_move_range() {
        let mut state = arena(&["~.....", "......"], (0, 1), (5, 1));
        state.player_mut(PlayerId::One).steaks = 0;
        add_unit(&mut state, PlayerId::One, UnitClass::Raptor, 0, 0);
        let id = state.allocate_id();
        state.incubators.push(Incubator::new(
            id,
            PlayerId::Two,
            UnitClass::Rex,
            Position::new(3, 0),
        ));

        let actions = enumerate_actions(&state, PlayerId::One);
        assert!(actions.iter().any(|action| matches!(
            action,
            Action::Attack {
                target: AttackTarget::Incubator { .. },
                ..
            }
        )));
    }

    #[test]
    fn enumeration_is_stable() {
        let state = GameState::sample();
        assert_eq!(
            enumerate_actions(&state, PlayerId::Two),
            enumerate_actions(&state, PlayerId::Two)
        );
    }
}
