use std::fmt;

use serde::{Deserialize, Serialize};

use super::board::{Board, Position};

/// Arena identifier, unique within one match.
pub type EntityId = u32;

pub const EGG_MAX_HEALTH: i16 = 100;
pub const TRAP_DAMAGE: i16 = 50;
pub const TRAP_IMMOBILIZE_TURNS: u8 = 2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "u8", into = "u8")]
pub enum PlayerId {
    One,
    Two,
}

impl PlayerId {
    pub const BOTH: [PlayerId; 2] = [PlayerId::One, PlayerId::Two];

    pub fn opponent(self) -> PlayerId {
        match self {
            PlayerId::One => PlayerId::Two,
            PlayerId::Two => PlayerId::One,
        }
    }

    pub fn index(self) -> usize {
        match self {
            PlayerId::One => 0,
            PlayerId::Two => 1,
        }
    }
}

impl TryFrom<u8> for PlayerId {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(PlayerId::One),
            2 => Ok(PlayerId::Two),
            other => Err(format!("player id must be 1 or 2, got {other}")),
        }
    }
}

impl From<PlayerId> for u8 {
    fn from(player: PlayerId) -> Self {
        match player {
            PlayerId::One => 1,
            PlayerId::Two => 2,
        }
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player {}", u8::from(*self))
    }
}

/// Fixed stat line of a unit class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitStats {
    pub cost: u32,
    pub max_health: i16,
    pub attack: i16,
    pub move_range: u8,
    pub incubation_turns: u8,
    pub incubator_health: i16,
    pub spawn_cooldown: u8,
}

const RAPTOR: UnitStats = UnitStats {
    cost: 40,
    max_health: 60,
    attack: 30,
    move_range: 3,
    incubation_turns: 2,
    incubator_health: 30,
    spawn_cooldown: 1,
};

const PARASAUR: UnitStats = UnitStats {
    cost: 80,
    max_health: 80,
    attack: 45,
    move_range: 2,
    incubation_turns: 4,
    incubator_health: 40,
    spawn_cooldown: 2,
};

const REX: UnitStats = UnitStats {
    cost: 100,
    max_health: 120,
    attack: 60,
    move_range: 1,
    incubation_turns: 8,
    incubator_health: 60,
    spawn_cooldown: 3,
};

/// Unit class 1 (fast, fragile), 2 (balanced) or 3 (slow, durable).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "u8", into = "u8")]
pub enum UnitClass {
    Raptor,
    Parasaur,
    Rex,
}

impl UnitClass {
    pub const ALL: [UnitClass; 3] = [UnitClass::Raptor, UnitClass::Parasaur, UnitClass::Rex];

    pub fn stats(self) -> &'static UnitStats {
        match self {
            UnitClass::Raptor => &RAPTOR,
            UnitClass::Parasaur => &PARASAUR,
            UnitClass::Rex => &REX,
        }
    }

    pub fn index(self) -> usize {
        match self {
            UnitClass::Raptor => 0,
            UnitClass::Parasaur => 1,
            UnitClass::Rex => 2,
        }
    }

    /// Heavy units keep their full stride on rough ground.
    pub fn ignores_rough_terrain(self) -> bool {
        matches!(self, UnitClass::Rex)
    }
}

impl TryFrom<u8> for UnitClass {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(UnitClass::Raptor),
            2 => Ok(UnitClass::Parasaur),
            3 => Ok(UnitClass::Rex),
            other => Err(format!("unit class must be 1, 2 or 3, got {other}")),
        }
    }
}

impl From<UnitClass> for u8 {
    fn from(class: UnitClass) -> Self {
        match class {
            UnitClass::Raptor => 1,
            UnitClass::Parasaur => 2,
            UnitClass::Rex => 3,
        }
    }
}

/// A player's fortress egg. Losing it loses the match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Egg {
    pub owner: PlayerId,
    pub position: Position,
    pub health: i16,
    pub max_health: i16,
}

impl Egg {
    pub fn new(owner: PlayerId, position: Position) -> Self {
        Self {
            owner,
            position,
            health: EGG_MAX_HEALTH,
            max_health: EGG_MAX_HEALTH,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.health <= 0
    }

    pub fn take_damage(&mut self, amount: i16) {
        self.health = (self.health - amount.max(0)).max(0);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Unit {
    pub id: EntityId,
    pub owner: PlayerId,
    pub class: UnitClass,
    pub position: Position,
    pub health: i16,
    #[serde(default)]
    pub has_acted: bool,
    #[serde(default)]
    pub immobilized_turns: u8,
}

impl Unit {
    pub fn new(id: EntityId, owner: PlayerId, class: UnitClass, position: Position) -> Self {
        Self {
            id,
            owner,
            class,
            position,
            health: class.stats().max_health,
            has_acted: false,
            immobilized_turns: 0,
        }
    }

    pub fn max_health(&self) -> i16 {
        self.class.stats().max_health
    }

    pub fn attack(&self) -> i16 {
        self.class.stats().attack
    }

    pub fn is_ready(&self) -> bool {
        !self.has_acted && self.immobilized_turns == 0
    }

    /// Movement range from the unit's current cell.
    pub fn effective_range(&self, board: &Board) -> u8 {
        let range = self.class.stats().move_range;
        if board.is_rough(self.position) && !self.class.ignores_rough_terrain() {
            range / 2
        } else {
            range
        }
    }

    pub fn take_damage(&mut self, amount: i16) {
        self.health = (self.health - amount.max(0)).max(0);
    }

    pub fn matches(&self, owner: PlayerId, class: UnitClass, position: Position) -> bool {
        self.owner == owner && self.class == class && self.position == position
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum IncubationStage {
    #[default]
    Incubating,
    Hatching,
}

/// A spawn in progress; becomes a [`Unit`] once incubation completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Incubator {
    pub id: EntityId,
    pub owner: PlayerId,
    pub class: UnitClass,
    pub position: Position,
    pub turns_elapsed: u8,
    pub turns_required: u8,
    pub health: i16,
    pub max_health: i16,
    #[serde(default)]
    pub stage: IncubationStage,
}

impl Incubator {
    pub fn new(id: EntityId, owner: PlayerId, class: UnitClass, position: Position) -> Self {
        let stats = class.stats();
        Self {
            id,
            owner,
            class,
            position,
            turns_elapsed: 0,
            turns_required: stats.incubation_turns,
            health: stats.incubator_health,
            max_health: stats.incubator_health,
            stage: IncubationStage::Incubating,
        }
    }

    pub fn turns_remaining(&self) -> u8 {
        self.turns_required.saturating_sub(self.turns_elapsed)
    }

    /// Advances one turn; returns `true` when this step starts the hatch.
    pub fn advance(&mut self) -> bool {
        if self.stage == IncubationStage::Hatching {
            return false;
        }
        self.turns_elapsed = self.turns_elapsed.saturating_add(1);
        if self.turns_elapsed >= self.turns_required {
            self.stage = IncubationStage::Hatching;
            return true;
        }
        false
    }

    pub fn progress(&self) -> f64 {
        if self.turns_required == 0 {
            return 1.0;
        }
        (f64::from(self.turns_elapsed) / f64::from(self.turns_required)).min(1.0)
    }

    pub fn take_damage(&mut self, amount: i16) {
        self.health -= amount.max(0);
    }
}

/// Hidden single-use snare. Removed from play once sprung.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Trap {
    pub id: EntityId,
    pub owner: PlayerId,
    pub position: Position,
}

impl Trap {
    pub fn new(id: EntityId, owner: PlayerId, position: Position) -> Self {
        Self {
            id,
            owner,
            position,
        }
    }

    pub fn is_armed_against(&self, victim: PlayerId) -> bool {
        self.owner != victim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_table_matches_profiles() {
        let raptor = UnitClass::Raptor.stats();
        assert_eq!(
            (raptor.cost, raptor.max_health, raptor.attack, raptor.move_range),
            (40, 60, 30, 3)
        );
        let rex = UnitClass::Rex.stats();
        assert_eq!((rex.cost, rex.max_health, rex.attack, rex.move_range), (100, 120, 60, 1));
        for class in UnitClass::ALL {
            let stats = class.stats();
            assert_eq!(stats.incubator_health * 2, stats.max_health);
            assert!(stats.spawn_cooldown < stats.incubation_turns);
        }
    }

    #[test]
    fn rough_terrain_halves_range_except_for_rex() {
        let board = Board::from_rows(&["~~", ".."]).expect("board");
        let on_rough = Unit::new(1, PlayerId::One, UnitClass::Raptor, Position::new(0, 0));
        assert_eq!(on_rough.effective_range(&board), 1);
        let on_open = Unit::new(2, PlayerId::One, UnitClass::Parasaur, Position::new(0, 1));
        assert_eq!(on_open.effective_range(&board), 2);
        let rex = Unit::new(3, PlayerId::One, UnitClass::Rex, Position::new(1, 0));
        assert_eq!(rex.effective_range(&board), 1);
    }

    #[test]
    fn incubator_hatches_after_required_turns() {
        let mut incubator = Incubator::new(1, PlayerId::Two, UnitClass::Raptor, Position::new(0, 0));
        assert_eq!(incubator.health, 30);
        assert!(!incubator.advance());
        assert_eq!(incubator.turns_remaining(), 1);
        assert!(incubator.advance());
        assert_eq!(incubator.stage, IncubationStage::Hatching);
        assert!(!incubator.advance());
        assert_eq!(incubator.progress(), 1.0);
    }

    #[test]
    fn ids_round_trip_through_serde_as_numbers() {
        let json = serde_json::to_string(&(PlayerId::Two, UnitClass::Rex)).expect("serialize");
        assert_eq!(json, "[2,3]");
        assert!(serde_json::from_str::<PlayerId>("3").is_err());
    }
}
