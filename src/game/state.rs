use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::board::{Board, Position};
use super::entities::{Egg, EntityId, Incubator, PlayerId, Trap, Unit, UnitClass};

pub const STARTING_STEAKS: u32 = 100;

const STANDARD_EGG_ONE: Position = Position::new(1, 1);
const STANDARD_EGG_TWO: Position = Position::new(14, 10);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum VictoryReason {
    EggDestroyed { loser: PlayerId },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VictoryState {
    pub winner: PlayerId,
    pub reason: VictoryReason,
}

/// Per-player economy and objective.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub steaks: u32,
    /// Remaining own turns before each class can be spawned again.
    #[serde(default)]
    pub cooldowns: [u8; 3],
    pub egg: Egg,
}

impl Player {
    pub fn new(id: PlayerId, egg_position: Position) -> Self {
        Self {
            id,
            steaks: STARTING_STEAKS,
            cooldowns: [0; 3],
            egg: Egg::new(id, egg_position),
        }
    }

    pub fn cooldown(&self, class: UnitClass) -> u8 {
        self.cooldowns[class.index()]
    }

    pub fn can_afford(&self, cost: u32) -> bool {
        self.steaks >= cost
    }

    pub fn tick_cooldowns(&mut self) {
        for cooldown in &mut self.cooldowns {
            *cooldown = cooldown.saturating_sub(1);
        }
    }
}

/// Everything that happened while applying an action or ending a turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    UnitMoved {
        owner: PlayerId,
        unit_id: EntityId,
        from: Position,
        to: Position,
    },
    TrapTriggered {
        trap_owner: PlayerId,
        trap_id: EntityId,
        unit_id: EntityId,
        position: Position,
        damage: i16,
    },
    UnitDamaged {
        owner: PlayerId,
        unit_id: EntityId,
        amount: i16,
        remaining: i16,
    },
    UnitKilled {
        owner: PlayerId,
        unit_id: EntityId,
        class: UnitClass,
        position: Position,
        bounty: u32,
    },
    EggDamaged {
        owner: PlayerId,
        amount: i16,
        remaining: i16,
    },
    IncubatorDamaged {
        owner: PlayerId,
        incubator_id: EntityId,
        amount: i16,
        remaining: i16,
    },
    IncubatorDestroyed {
        owner: PlayerId,
        incubator_id: EntityId,
        position: Position,
        bounty: u32,
    },
    SpawnStarted {
        owner: PlayerId,
        incubator_id: EntityId,
        class: UnitClass,
        position: Position,
        cost: u32,
    },
    TrapPlaced {
        owner: PlayerId,
        trap_id: EntityId,
        position: Position,
        cost: u32,
    },
    Passed {
        player: PlayerId,
    },
    SteaksGranted {
        player: PlayerId,
        amount: u32,
    },
    EggHatched {
        owner: PlayerId,
        incubator_id: EntityId,
        unit_id: EntityId,
        class: UnitClass,
        position: Position,
    },
    TurnEnded {
        player: PlayerId,
    },
    TurnStarted {
        player: PlayerId,
        turn: u32,
    },
    GameWon {
        winner: PlayerId,
        reason: VictoryReason,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    EntityOutOfBounds { position: Position },
    EntityOnObstacle { position: Position },
    OverlappingEntities { position: Position },
    DuplicateEntityId { id: EntityId },
    HealthOutOfRange { id: EntityId, value: i16 },
    EggHealthOutOfRange { player: PlayerId, value: i16 },
    PlayerSlotMismatch { slot: usize, id: PlayerId },
    EggOwnerMismatch { player: PlayerId, owner: PlayerId },
}

/// The whole match as plain data. Cloning it gives an independent copy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "GameStateRecord")]
pub struct GameState {
    pub board: Board,
    pub players: [Player; 2],
    pub units: Vec<Unit>,
    pub incubators: Vec<Incubator>,
    pub traps: Vec<Trap>,
    pub current_player: PlayerId,
    pub turn: u32,
    /// A spawn or trap was placed this turn; nothing else is allowed.
    pub special_action_used: bool,
    /// The current turn should end on its own after the UI delay.
    pub auto_end_pending: bool,
    pub next_id: EntityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<VictoryState>,
}

/// Wire form of [`GameState`]. Optional fields may be left out by callers.
#[derive(Deserialize)]
struct GameStateRecord {
    board: Board,
    players: [Player; 2],
    #[serde(default)]
    units: Vec<Unit>,
    #[serde(default)]
    incubators: Vec<Incubator>,
    #[serde(default)]
    traps: Vec<Trap>,
    current_player: PlayerId,
    turn: u32,
    #[serde(default)]
    special_action_used: bool,
    #[serde(default)]
    auto_end_pending: bool,
    #[serde(default)]
    next_id: EntityId,
    #[serde(default)]
    outcome: Option<VictoryState>,
}

impl From<GameStateRecord> for GameState {
    fn from(record: GameStateRecord) -> Self {
        let mut state = Self {
            board: record.board,
            players: record.players,
            units: record.units,
            incubators: record.incubators,
            traps: record.traps,
            current_player: record.current_player,
            turn: record.turn,
            special_action_used: record.special_action_used,
            auto_end_pending: record.auto_end_pending,
            next_id: record.next_id,
            outcome: record.outcome,
        };
        state.reserve_existing_ids();
        state
    }
}

impl GameState {
    pub fn new(board: Board, egg_one: Position, egg_two: Position) -> Self {
        Self {
            board,
            players: [
                Player::new(PlayerId::One, egg_one),
                Player::new(PlayerId::Two, egg_two),
            ],
            units: Vec::new(),
            incubators: Vec::new(),
            traps: Vec::new(),
            current_player: PlayerId::One,
            turn: 1,
            special_action_used: false,
            auto_end_pending: false,
            next_id: 1,
            outcome: None,
        }
    }

    pub fn standard() -> Self {
        Self::new(Board::standard(), STANDARD_EGG_ONE, STANDARD_EGG_TWO)
    }

    pub fn player(&self, id: PlayerId) -> &Player {
        &self.players[id.index()]
    }

    pub fn player_mut(&mut self, id: PlayerId) -> &mut Player {
        &mut self.players[id.index()]
    }

    pub fn egg(&self, owner: PlayerId) -> &Egg {
        &self.player(owner).egg
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Moves `next_id` past every id already in play.
    pub fn reserve_existing_ids(&mut self) {
        let highest = self
            .units
            .iter()
            .map(|unit| unit.id)
            .chain(self.incubators.iter().map(|incubator| incubator.id))
            .chain(self.traps.iter().map(|trap| trap.id))
            .max();
        if let Some(highest) = highest {
            self.next_id = self.next_id.max(highest.saturating_add(1));
        }
    }

    pub fn allocate_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    pub fn unit_at(&self, pos: Position) -> Option<&Unit> {
        self.units.iter().find(|unit| unit.position == pos)
    }

    pub fn egg_at(&self, pos: Position) -> Option<&Egg> {
        self.players
            .iter()
            .map(|player| &player.egg)
            .find(|egg| egg.position == pos)
    }

    pub fn incubator_at(&self, pos: Position) -> Option<&Incubator> {
        self.incubators.iter().find(|incubator| incubator.position == pos)
    }

    pub fn trap_at(&self, pos: Position) -> Option<&Trap> {
        self.traps.iter().find(|trap| trap.position == pos)
    }

    /// Any entity, obstacle, or the board edge makes a cell occupied.
    pub fn is_occupied(&self, pos: Position) -> bool {
        self.board.is_obstacle(pos)
            || self.egg_at(pos).is_some()
            || self.unit_at(pos).is_some()
            || self.incubator_at(pos).is_some()
            || self.trap_at(pos).is_some()
    }

    /// Traps are hidden, so they never stop a unit from entering a cell.
    pub fn blocks_movement(&self, pos: Position) -> bool {
        self.board.is_obstacle(pos)
            || self.egg_at(pos).is_some()
            || self.unit_at(pos).is_some()
            || self.incubator_at(pos).is_some()
    }

    pub fn units_of(&self, owner: PlayerId) -> impl Iterator<Item = &Unit> + '_ {
        self.units.iter().filter(move |unit| unit.owner == owner)
    }

    pub fn incubators_of(&self, owner: PlayerId) -> impl Iterator<Item = &Incubator> + '_ {
        self.incubators
            .iter()
            .filter(move |incubator| incubator.owner == owner)
    }

    /// Traps the given player is allowed to see: only their own.
    pub fn visible_traps(&self, viewer: PlayerId) -> Vec<&Trap> {
        self.traps
            .iter()
            .filter(|trap| trap.owner == viewer)
            .collect()
    }

    /// Resolves a unit by identity rather than by arena slot.
    pub fn find_unit(&self, owner: PlayerId, class: UnitClass, at: Position) -> Option<usize> {
        self.units
            .iter()
            .position(|unit| unit.matches(owner, class, at))
    }

    pub fn evaluate_victory(&mut self) -> Option<VictoryState> {
        if let Some(outcome) = &self.outcome {
            return Some(outcome.clone());
        }

        let loser = PlayerId::BOTH
            .into_iter()
            .find(|id| self.egg(*id).is_destroyed())?;
        Some(self.declare_victory(loser.opponent(), VictoryReason::EggDestroyed { loser }))
    }

    pub fn declare_victory(&mut self, winner: PlayerId, reason: VictoryReason) -> VictoryState {
        let victory = VictoryState { winner, reason };
        if self.outcome.is_none() {
            self.outcome = Some(victory.clone());
        }
        victory
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        let mut occupied = HashSet::new();
        let mut ids = HashSet::new();

        for (slot, player) in self.players.iter().enumerate() {
            if player.id != PlayerId::BOTH[slot] {
                return Err(IntegrityError::PlayerSlotMismatch {
                    slot,
                    id: player.id,
                });
            }
            let egg = &player.egg;
            if egg.owner != player.id {
                return Err(IntegrityError::EggOwnerMismatch {
                    player: player.id,
                    owner: egg.owner,
                });
            }
            if egg.health < 0 || egg.health > egg.max_health {
                return Err(IntegrityError::EggHealthOutOfRange {
                    player: player.id,
                    value: egg.health,
                });
            }
            self.check_cell(egg.position, &mut occupied)?;
        }

        for unit in &self.units {
            if unit.health <= 0 || unit.health > unit.max_health() {
                return Err(IntegrityError::HealthOutOfRange {
                    id: unit.id,
                    value: unit.health,
                });
            }
            if !ids.insert(unit.id) {
                return Err(IntegrityError::DuplicateEntityId { id: unit.id });
            }
            self.check_cell(unit.position, &mut occupied)?;
        }

        for incubator in &self.incubators {
            if incubator.health <= 0 || incubator.health > incubator.max_health {
                return Err(IntegrityError::HealthOutOfRange {
                    id: incubator.id,
                    value: incubator.health,
                });
            }
            if !ids.insert(incubator.id) {
                return Err(IntegrityError::DuplicateEntityId { id: incubator.id });
            }
            self.check_cell(incubator.position, &mut occupied)?;
        }

        // Traps may share a cell with a unit standing on its owner's trap.
        for trap in &self.traps {
            if !ids.insert(trap.id) {
                return Err(IntegrityError::DuplicateEntityId { id: trap.id });
            }
            if !self.board.in_bounds(trap.position) {
                return Err(IntegrityError::EntityOutOfBounds {
                    position: trap.position,
                });
            }
        }

        Ok(())
    }

    fn check_cell(
        &self,
        position: Position,
        occupied: &mut HashSet<Position>,
    ) -> Result<(), IntegrityError> {
        if !self.board.in_bounds(position) {
            return Err(IntegrityError::EntityOutOfBounds { position });
        }
        if self.board.is_obstacle(position) {
            return Err(IntegrityError::EntityOnObstacle { position });
        }
        if !occupied.insert(position) {
            return Err(IntegrityError::OverlappingEntities { position });
        }
        Ok(())
    }

    /// A mid-game position for front-end debugging.
    pub fn sample() -> Self {
        let mut state = Self::standard();
        let raptor = state.allocate_id();
        state.units.push(Unit::new(
            raptor,
            PlayerId::One,
            UnitClass::Raptor,
            Position::new(4, 3),
        ));
        let rex = state.allocate_id();
        state.units.push(Unit::new(
            rex,
            PlayerId::Two,
            UnitClass::Rex,
            Position::new(12, 9),
        ));
        let incubator = state.allocate_id();
        state.incubators.push(Incubator::new(
            incubator,
            PlayerId::Two,
            UnitClass::Parasaur,
            Position::new(13, 8),
        ));
        let trap = state.allocate_id();
        state
            .traps
            .push(Trap::new(trap, PlayerId::Two, Position::new(9, 6)));
        state.player_mut(PlayerId::Two).steaks = 30;
        state
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::standard()
    }
}
