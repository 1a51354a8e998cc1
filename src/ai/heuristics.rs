use crate::game::{GameState, PlayerId, UnitClass};

pub const WIN_SCORE: f64 = 100_000.0;

pub const EGG_HEALTH_WEIGHT: f64 = 10.0;
pub const UNIT_COUNT_WEIGHT: f64 = 50.0;
pub const UNIT_HEALTH_WEIGHT: f64 = 2.0;
pub const STEAK_WEIGHT: f64 = 0.5;
/// Per cell between each own unit and the enemy egg.
pub const ADVANCE_PENALTY: f64 = 3.0;
/// Per cell between each enemy unit and the own egg.
pub const THREAT_DISTANCE_BONUS: f64 = 2.0;
pub const SIEGE_BONUS: f64 = 30.0;
pub const SIEGE_RADIUS: u16 = 2;
pub const INCUBATOR_WEIGHT: f64 = 40.0;
pub const INCUBATOR_HEALTH_WEIGHT: f64 = 1.0;

/// Scores `state` from `player`'s point of view. Higher is better.
pub fn evaluate(state: &GameState, player: PlayerId) -> f64 {
    let enemy = player.opponent();
    let own_egg = state.egg(player);
    let enemy_egg = state.egg(enemy);

    if enemy_egg.is_destroyed() {
        return WIN_SCORE;
    }
    if own_egg.is_destroyed() {
        return -WIN_SCORE;
    }

    let mut score = f64::from(own_egg.health - enemy_egg.health) * EGG_HEALTH_WEIGHT;
    score += f64::from(state.player(player).steaks) * STEAK_WEIGHT;
    score -= f64::from(state.player(enemy).steaks) * STEAK_WEIGHT;

    for unit in &state.units {
        let value = UNIT_COUNT_WEIGHT + f64::from(unit.health) * UNIT_HEALTH_WEIGHT;
        if unit.owner == player {
            score += value;
            let distance = unit.position.manhattan(enemy_egg.position);
            score -= f64::from(distance) * ADVANCE_PENALTY;
            if unit.class == UnitClass::Rex && distance <= SIEGE_RADIUS {
                score += SIEGE_BONUS;
            }
        } else {
            score -= value;
            score += f64::from(unit.position.manhattan(own_egg.position)) * THREAT_DISTANCE_BONUS;
        }
    }

    for incubator in &state.incubators {
        let value =
            INCUBATOR_WEIGHT + f64::from(incubator.health.max(0)) * INCUBATOR_HEALTH_WEIGHT;
        if incubator.owner == player {
            score += value;
        } else {
            score -= value;
        }
    }

    score
}
