use crate::error::JoinError;
use log::{debug, info};
use rand::Rng;
use snake_shared::{
    Direction, Food, PlayerSnapshot, Position, Snapshot, FOOD_VALUE_MAX, FOOD_VALUE_MIN,
    SPAWN_MARGIN,
};
use std::collections::{BTreeMap, VecDeque};

pub type SessionId = u32;

pub const MAX_SPAWN_ATTEMPTS: usize = 1000;

/// Fixed grid bounds. Border cells are lethal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arena {
    pub width: i32,
    pub height: i32,
}

impl Arena {
    /// Creates an arena of `width` x `height` cells
    ///
    /// The outermost ring of cells is wall, so the playable interior spans
    /// `1..=width-2` by `1..=height-2`. Sizes are checked by
    /// [`ServerConfig::validate`](crate::config::ServerConfig::validate), not here.
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// True for any cell on or beyond the border ring
    pub fn is_wall(&self, (x, y): Position) -> bool {
        x <= 0 || x >= self.width - 1 || y <= 0 || y >= self.height - 1
    }

    /// Uniformly random non-wall cell, used for food placement
    pub fn random_interior<R: Rng + ?Sized>(&self, rng: &mut R) -> Position {
        (
            rng.gen_range(1..=self.width - 2),
            rng.gen_range(1..=self.height - 2),
        )
    }

    /// Random cell in the inset spawn region, `None` if the arena has no such region.
    pub fn random_spawn<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Position> {
        let max_x = self.width - SPAWN_MARGIN;
        let max_y = self.height - SPAWN_MARGIN;
        if max_x < SPAWN_MARGIN || max_y < SPAWN_MARGIN {
            return None;
        }
        Some((
            rng.gen_range(SPAWN_MARGIN..=max_x),
            rng.gen_range(SPAWN_MARGIN..=max_y),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snake {
    pub name: String,
    /// Head first. Never empty.
    pub body: VecDeque<Position>,
    /// Direction used on the last tick.
    pub heading: Direction,
    /// Direction the next tick will use.
    pub next_heading: Direction,
    pub score: u32,
    pub alive: bool,
}

impl Snake {
    /// Creates a live one-cell snake at `spawn`
    ///
    /// The pending heading starts equal to `heading`, so the snake keeps
    /// going that way until it is steered.
    pub fn new(name: impl Into<String>, spawn: Position, heading: Direction) -> Self {
        Self::from_parts(name.into(), VecDeque::from([spawn]), heading)
    }

    /// Creates a live snake from an explicit body, head first
    ///
    /// Returns `None` for an empty body. Cells are taken as given; nothing
    /// checks that they are contiguous.
    pub fn with_body(
        name: impl Into<String>,
        body: impl IntoIterator<Item = Position>,
        heading: Direction,
    ) -> Option<Self> {
        let body: VecDeque<Position> = body.into_iter().collect();
        if body.is_empty() {
            return None;
        }
        Some(Self::from_parts(name.into(), body, heading))
    }

    fn from_parts(name: String, body: VecDeque<Position>, heading: Direction) -> Self {
        Self {
            name,
            body,
            heading,
            next_heading: heading,
            score: 0,
            alive: true,
        }
    }

    /// Cell at the front of the body
    pub fn head(&self) -> Position {
        self.body[0]
    }

    /// Number of cells in the body
    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn occupies(&self, pos: Position) -> bool {
        self.body.contains(&pos)
    }

    /// Queues a turn for the next tick
    ///
    /// The reversal check compares against `heading`, the direction the snake
    /// moved on the last tick, and not against a turn already queued for the
    /// coming one. Moving Right, `w` then `s` within one tick ends up moving
    /// Down: `s` only reverses the queued Up, which was never travelled.
    /// The latest accepted request wins. Dead snakes ignore steering.
    pub fn steer(&mut self, direction: Direction) -> bool {
        if !self.alive || direction == self.heading.opposite() {
            return false;
        }
        self.next_heading = direction;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    Wall,
    OwnBody,
    /// Moved into a snake at least as long.
    Crashed { into: SessionId },
    /// A longer snake moved into this one.
    RunOver { by: SessionId },
}

/// What happened during one [`GameState::tick`]
///
/// Deaths are listed in the order they were resolved, which follows
/// registration order of the movers.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub deaths: Vec<(SessionId, DeathCause)>,
    pub food_eaten: usize,
}

/// Authoritative world: arena, snakes in registration order, and food.
#[derive(Debug, Clone)]
pub struct GameState {
    pub tick: u64,
    arena: Arena,
    max_foods: usize,
    players: BTreeMap<SessionId, Snake>,
    foods: Vec<Food>,
}

impl GameState {
    /// Creates an empty world with no players and no food
    ///
    /// Food is laid out by the first [`refill_food`](Self::refill_food) or
    /// [`tick`](Self::tick) call, which keeps construction free of randomness.
    pub fn new(arena: Arena, max_foods: usize) -> Self {
        Self {
            tick: 0,
            arena,
            max_foods,
            players: BTreeMap::new(),
            foods: Vec::new(),
        }
    }

    pub fn arena(&self) -> Arena {
        self.arena
    }

    pub fn player(&self, id: SessionId) -> Option<&Snake> {
        self.players.get(&id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Players still moving. Corpses stay listed until their session leaves.
    pub fn alive_count(&self) -> usize {
        self.players.values().filter(|s| s.alive).count()
    }

    pub fn foods(&self) -> &[Food] {
        &self.foods
    }

    fn is_occupied(&self, pos: Position) -> bool {
        self.players.values().any(|s| s.occupies(pos))
    }

    /// Spawns a one-cell snake with a random heading on a free cell.
    pub fn add_player<R: Rng + ?Sized>(
        &mut self,
        id: SessionId,
        name: &str,
        rng: &mut R,
    ) -> Result<Position, JoinError> {
        for _ in 0..MAX_SPAWN_ATTEMPTS {
            let spawn = self
                .arena
                .random_spawn(rng)
                .ok_or(JoinError::NoSpawnCell)?;
            if self.is_occupied(spawn) {
                continue;
            }

            let heading = Direction::ALL[rng.gen_range(0..Direction::ALL.len())];
            self.place_player(id, Snake::new(name, spawn, heading));
            info!(
                "Added player {} '{}' at {:?} heading {:?}",
                id, name, spawn, heading
            );
            return Ok(spawn);
        }

        Err(JoinError::NoSpawnCell)
    }

    pub fn place_player(&mut self, id: SessionId, snake: Snake) {
        self.players.insert(id, snake);
    }

    pub fn remove_player(&mut self, id: &SessionId) -> Option<Snake> {
        let removed = self.players.remove(id);
        if let Some(snake) = &removed {
            info!("Removed player {} '{}'", id, snake.name);
        }
        removed
    }

    pub fn steer(&mut self, id: SessionId, direction: Direction) -> bool {
        self.players
            .get_mut(&id)
            .map_or(false, |snake| snake.steer(direction))
    }

    /// Adds food unless the cell already holds some.
    pub fn place_food(&mut self, food: Food) -> bool {
        if self.foods.iter().any(|f| f.pos == food.pos) {
            return false;
        }
        self.foods.push(food);
        true
    }

    /// Tops food up to the target count. Snake bodies are not avoided.
    pub fn refill_food<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        while self.foods.len() < self.max_foods {
            let food = Food {
                pos: self.arena.random_interior(rng),
                value: rng.gen_range(FOOD_VALUE_MIN..=FOOD_VALUE_MAX),
            };
            self.place_food(food);
        }
    }

    /// Advances every live snake once, in registration order, then refills food.
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> TickReport {
        let mut report = TickReport::default();
        let ids: Vec<SessionId> = self.players.keys().copied().collect();

        for id in ids {
            self.advance(id, &mut report);
        }

        self.refill_food(rng);
        self.tick += 1;

        for (id, cause) in &report.deaths {
            debug!("Tick {}: player {} died ({:?})", self.tick, id, cause);
        }
        report
    }

    fn advance(&mut self, id: SessionId, report: &mut TickReport) {
        let (new_head, mover_len) = match self.players.get_mut(&id) {
            Some(snake) if snake.alive => {
                snake.heading = snake.next_heading;
                (snake.heading.step(snake.head()), snake.len())
            }
            _ => return,
        };

        if self.arena.is_wall(new_head) {
            self.kill(id, DeathCause::Wall, report);
            return;
        }

        if self.players[&id].occupies(new_head) {
            self.kill(id, DeathCause::OwnBody, report);
            return;
        }

        let mut bonus = 0;
        let mut crashed_into = None;
        for (&other_id, other) in self.players.iter_mut() {
            if other_id == id || !other.alive || !other.occupies(new_head) {
                continue;
            }

            if mover_len <= other.len() {
                other.score += mover_len as u32;
                crashed_into = Some(other_id);
                break;
            }

            other.alive = false;
            bonus += other.len() as u32;
            report.deaths.push((other_id, DeathCause::RunOver { by: id }));
        }

        let Some(snake) = self.players.get_mut(&id) else {
            return;
        };
        snake.score += bonus;

        if let Some(other_id) = crashed_into {
            snake.alive = false;
            report
                .deaths
                .push((id, DeathCause::Crashed { into: other_id }));
            return;
        }

        snake.body.push_front(new_head);
        match self.foods.iter().position(|f| f.pos == new_head) {
            Some(index) => {
                let food = self.foods.remove(index);
                snake.score += food.value;
                report.food_eaten += 1;
            }
            None => {
                snake.body.pop_back();
            }
        }
    }

    fn kill(&mut self, id: SessionId, cause: DeathCause, report: &mut TickReport) {
        if let Some(snake) = self.players.get_mut(&id) {
            snake.alive = false;
            report.deaths.push((id, cause));
        }
    }

    /// Copies the broadcast view of the world
    ///
    /// Players appear in registration order with their bodies head first.
    /// Dead snakes are included with `alive: false`.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            width: self.arena.width,
            height: self.arena.height,
            players: self
                .players
                .values()
                .map(|snake| PlayerSnapshot {
                    name: snake.name.clone(),
                    body: snake.body.iter().copied().collect(),
                    score: snake.score,
                    alive: snake.alive,
                })
                .collect(),
            foods: self.foods.clone(),
        }
    }
}
