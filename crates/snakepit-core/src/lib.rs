//! Deterministic simulation core for Snakepit.
//!
//! The world owns every mutable piece of the simulation: the snake arena, the
//! food bag, the tick counter, and one seeded generator. A call to
//! [`World::step`] advances the whole population exactly one tick through
//! three fixed phases (decide, commit, resolve), and every random draw flows
//! through the single generator in a fixed order. Two worlds built from the
//! same [`SimConfig`] therefore replay the same history bit for bit,
//! independent of platform, wall clock, or host frame rate.
//!
//! Hosts drive the world by calling [`World::step`] in a loop, reading
//! [`World::snapshot`] for rendering or persistence, and optionally steering
//! individual snakes with [`World::set_direction`] between ticks.

use std::collections::VecDeque;
use std::fmt;

use rand::{RngCore, SeedableRng, rand_core::impls};
use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap};
use thiserror::Error;

pub use snakepit_grid::{Cell, Direction, torus_manhattan, wrap, wrap_delta};

/// Multiplier of the Numerical Recipes 32-bit LCG.
const LCG_MULTIPLIER: u32 = 1_664_525;
/// Increment of the Numerical Recipes 32-bit LCG.
const LCG_INCREMENT: u32 = 1_013_904_223;
/// `2^32` as a float, the scale factor turning a state into a unit draw.
const LCG_SCALE: f64 = 4_294_967_296.0;

/// Base food-sensing radius in cells. A snake chases food whose toroidal
/// Manhattan distance from its head is at most twice this value.
pub const FOOD_SENSE_THRESHOLD: u32 = 100;

/// Monotonic tick counter. Starts at zero for a freshly built world and
/// increments once per [`World::step`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Tick(pub u64);

impl Tick {
    /// The tick after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// The tick a fresh world starts on.
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }
}

/// The single random stream of a world: a linear congruential generator with
/// the classic Numerical Recipes parameters,
/// `state' = state * 1664525 + 1013904223 (mod 2^32)`.
///
/// Statistical quality is deliberately traded for portability. The whole
/// stream is pinned by a 32-bit seed, and [`Lcg32::next_unit`] maps each
/// state to `state / 2^32`, which is exact in an `f64`, so every platform
/// sees identical draws and identical floor results when the draws are
/// scaled to grid coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lcg32 {
    state: u32,
}

impl Lcg32 {
    /// Starts the stream at `seed`. The seed itself is never emitted; the
    /// first draw is already one advance past it.
    #[must_use]
    pub const fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Current raw state, for checkpoint logs and diagnostics.
    #[must_use]
    pub const fn state(&self) -> u32 {
        self.state
    }

    fn advance(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(LCG_MULTIPLIER)
            .wrapping_add(LCG_INCREMENT);
        self.state
    }

    /// Next draw in `[0, 1)`.
    pub fn next_unit(&mut self) -> f64 {
        f64::from(self.advance()) / LCG_SCALE
    }
}

impl RngCore for Lcg32 {
    fn next_u32(&mut self) -> u32 {
        self.advance()
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        impls::fill_bytes_via_next(self, dst)
    }
}

impl SeedableRng for Lcg32 {
    /// Little-endian bytes of the 32-bit seed.
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }

    /// Truncates to the low 32 bits rather than mixing, so seeds that fit in
    /// a `u32` produce the same stream through either constructor.
    fn seed_from_u64(state: u64) -> Self {
        Self::new(state as u32)
    }
}

slotmap::new_key_type! {
    /// Stable handle to a snake. Handles stay valid for the life of the
    /// world; snakes are truncated by cuts but never removed.
    pub struct SnakeId;
}

/// Per-snake side table keyed by [`SnakeId`].
pub type SnakeMap<T> = SecondaryMap<SnakeId, T>;

/// One snake: an ordered body (head first), a heading, and its frozen state.
///
/// The body always holds at least one cell while the snake lives inside a
/// [`World`]; cuts shorten it but stop at the head. `frozen_ticks_remaining`
/// only means something while `frozen` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snake {
    pub body: VecDeque<Cell>,
    pub direction: Direction,
    pub frozen: bool,
    pub frozen_ticks_remaining: u32,
}

impl Snake {
    /// A one-cell snake at `head`, unfrozen.
    #[must_use]
    pub fn new(head: Cell, direction: Direction) -> Self {
        Self {
            body: VecDeque::from([head]),
            direction,
            frozen: false,
            frozen_ticks_remaining: 0,
        }
    }

    /// A snake with an explicit body, head first, unfrozen.
    #[must_use]
    pub fn with_body<I>(body: I, direction: Direction) -> Self
    where
        I: IntoIterator<Item = Cell>,
    {
        Self {
            body: body.into_iter().collect(),
            direction,
            frozen: false,
            frozen_ticks_remaining: 0,
        }
    }

    /// The head cell, if the body is non-empty.
    #[must_use]
    pub fn head(&self) -> Option<Cell> {
        self.body.front().copied()
    }
}

/// The loose food items on the grid, in insertion order.
///
/// Duplicates are allowed (two items may share a cell and an item may sit
/// under a snake); consumption removes the oldest item on the eaten cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodBag {
    items: Vec<Cell>,
}

impl FoodBag {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All items, oldest first.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.items
    }

    pub fn push(&mut self, cell: Cell) {
        self.items.push(cell);
    }

    /// Removes the oldest item sitting on `cell`. Returns whether one was
    /// found.
    pub fn take_first(&mut self, cell: Cell) -> bool {
        match self.items.iter().position(|&item| item == cell) {
            Some(index) => {
                let _ = self.items.remove(index);
                true
            }
            None => false,
        }
    }

    /// Toroidal Manhattan distance from `from` to the closest item, if any.
    #[must_use]
    pub fn nearest_distance(&self, from: Cell, size: u16) -> Option<u32> {
        self.items
            .iter()
            .map(|&item| torus_manhattan(from, item, size))
            .min()
    }
}

/// Everything needed to build a reproducible world.
///
/// Missing keys in a serialized config fall back to the defaults below,
/// which reproduce the classic 150-cell arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Side length of the square torus, in cells.
    pub world_size: u16,
    /// Snakes spawned at world creation.
    pub snake_count: u32,
    /// Food items spawned at world creation.
    pub food_count: u32,
    /// Seed of the single random stream.
    pub seed: u32,
    /// Whether running into your own body truncates you at the impact cell.
    pub cut_self_on_collision: bool,
    /// Whether running into another snake truncates that snake.
    pub cut_other_on_collision: bool,
    /// Exempts the tail cell from self-collision, since it vacates the cell
    /// on the same tick. The decision pass still treats the tail as blocked.
    pub self_collision_excludes_tail: bool,
    /// Ticks a snake sits out after being cut.
    pub freeze_ticks: u32,
    /// Whether eaten food is immediately replaced by a fresh random item.
    pub replenish_food: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            world_size: 150,
            snake_count: 25,
            food_count: 4000,
            seed: 2,
            cut_self_on_collision: true,
            cut_other_on_collision: true,
            self_collision_excludes_tail: false,
            freeze_ticks: 30,
            replenish_food: true,
        }
    }
}

impl SimConfig {
    /// Checks the configuration before any world state or random draw
    /// exists, so a bad config can never consume part of the stream.
    pub fn validate(&self) -> Result<(), WorldError> {
        if self.world_size == 0 {
            return Err(WorldError::InvalidConfig("world_size must be at least 1"));
        }
        Ok(())
    }
}

/// Errors surfaced by world construction and host mutations.
#[derive(Debug, Error)]
pub enum WorldError {
    /// The configuration failed validation; the message names the field.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// A spawned snake must occupy at least one cell.
    #[error("snake body is empty")]
    EmptyBody,
}

/// Counters describing what a single tick did, returned by [`World::step`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// The tick these counters describe (1 for the first step).
    pub tick: Tick,
    /// Food items consumed this tick.
    pub food_eaten: u32,
    /// Food items spawned back by replenishment this tick.
    pub food_spawned: u32,
    /// Snakes that ran into their own body.
    pub self_cuts: u32,
    /// Truncations inflicted on other snakes.
    pub cross_cuts: u32,
    /// Snakes frozen at the end of the tick.
    pub frozen_snakes: u32,
}

/// Copy of one snake's visible state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnakeSnapshot {
    pub id: SnakeId,
    /// Body cells, head first.
    pub body: Vec<Cell>,
    pub direction: Direction,
    pub frozen: bool,
    pub frozen_ticks_remaining: u32,
}

/// Serializable copy of everything a host can observe. Snakes appear in
/// spawn order, food in insertion order, so equal worlds produce equal
/// snapshots byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: Tick,
    pub world_size: u16,
    pub snakes: Vec<SnakeSnapshot>,
    pub food: Vec<Cell>,
}

/// Storage for the snake population: a slot map for stable ids plus a handle
/// list preserving spawn order.
///
/// Spawn order is the resolution order of every tick, which makes it part of
/// the deterministic contract rather than a storage detail.
#[derive(Debug, Clone, Default)]
pub struct SnakePen {
    slots: SlotMap<SnakeId, Snake>,
    handles: Vec<SnakeId>,
}

impl SnakePen {
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: SnakeId) -> Option<&Snake> {
        self.slots.get(id)
    }

    pub fn get_mut(&mut self, id: SnakeId) -> Option<&mut Snake> {
        self.slots.get_mut(id)
    }

    /// Ids in spawn order.
    pub fn ids(&self) -> impl Iterator<Item = SnakeId> + '_ {
        self.handles.iter().copied()
    }

    /// Snakes with their ids, in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = (SnakeId, &Snake)> + '_ {
        self.handles
            .iter()
            .filter_map(|&id| self.slots.get(id).map(|snake| (id, snake)))
    }

    /// Whether any body, frozen or not, covers `cell`.
    #[must_use]
    pub fn contains_cell(&self, cell: Cell) -> bool {
        self.slots.values().any(|snake| snake.body.contains(&cell))
    }

    #[must_use]
    pub fn frozen_count(&self) -> u32 {
        self.slots.values().filter(|snake| snake.frozen).count() as u32
    }

    fn insert(&mut self, snake: Snake) -> SnakeId {
        let id = self.slots.insert(snake);
        self.handles.push(id);
        id
    }
}

/// What one snake's resolution produced, folded into the [`TickReport`].
#[derive(Debug, Clone, Copy, Default)]
struct ResolveOutcome {
    ate: bool,
    replenished: bool,
    cut_self: bool,
    cross_cuts: u32,
}

/// The authoritative simulation state.
///
/// All mutation goes through [`World::step`] and the explicit host
/// operations ([`World::set_direction`], [`World::spawn_snake`],
/// [`World::insert_food`]); accessors hand out shared references only. The
/// world is `Clone`, so hosts can checkpoint cheaply and replay forks.
#[derive(Clone)]
pub struct World {
    config: SimConfig,
    rng: Lcg32,
    tick: Tick,
    snakes: SnakePen,
    food: FoodBag,
    staged: SnakeMap<Direction>,
}

impl World {
    /// Builds a world from `config`.
    ///
    /// Validation runs before the generator is touched. Seeding then draws
    /// in a fixed order: two draws (`x`, `y`) per food item for every item,
    /// followed by three draws (`x`, `y`, heading) per snake. Initial
    /// placements are independent and may overlap.
    pub fn new(config: SimConfig) -> Result<Self, WorldError> {
        config.validate()?;
        let mut world = Self {
            rng: Lcg32::new(config.seed),
            tick: Tick::zero(),
            snakes: SnakePen::default(),
            food: FoodBag::with_capacity(config.food_count as usize),
            staged: SnakeMap::new(),
            config,
        };
        for _ in 0..world.config.food_count {
            let cell = world.random_cell();
            world.food.push(cell);
        }
        for _ in 0..world.config.snake_count {
            let head = world.random_cell();
            let direction = world.random_direction();
            world.snakes.insert(Snake::new(head, direction));
        }
        Ok(world)
    }

    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    #[must_use]
    pub fn snakes(&self) -> &SnakePen {
        &self.snakes
    }

    #[must_use]
    pub fn snake_count(&self) -> usize {
        self.snakes.len()
    }

    #[must_use]
    pub fn snake(&self, id: SnakeId) -> Option<&Snake> {
        self.snakes.get(id)
    }

    /// Ids in spawn order, which is also the per-tick resolution order.
    pub fn snake_ids(&self) -> impl Iterator<Item = SnakeId> + '_ {
        self.snakes.ids()
    }

    #[must_use]
    pub fn food(&self) -> &FoodBag {
        &self.food
    }

    /// Steers a snake for the coming tick. Rejects the 180-degree reversal
    /// of the current heading and unknown ids; returns whether the heading
    /// was applied.
    pub fn set_direction(&mut self, id: SnakeId, direction: Direction) -> bool {
        let Some(snake) = self.snakes.get_mut(id) else {
            return false;
        };
        if direction == snake.direction.opposite() {
            return false;
        }
        snake.direction = direction;
        true
    }

    /// Adds a snake mid-run. Body cells are wrapped onto the torus; the new
    /// snake resolves after all existing ones. Consumes no random draw.
    pub fn spawn_snake(&mut self, mut snake: Snake) -> Result<SnakeId, WorldError> {
        if snake.body.is_empty() {
            return Err(WorldError::EmptyBody);
        }
        let size = self.config.world_size;
        for cell in &mut snake.body {
            *cell = cell.wrapped(size);
        }
        Ok(self.snakes.insert(snake))
    }

    /// Drops a food item onto the grid, wrapping the cell onto the torus.
    /// Consumes no random draw.
    pub fn insert_food(&mut self, cell: Cell) {
        let wrapped = cell.wrapped(self.config.world_size);
        self.food.push(wrapped);
    }

    /// Advances the whole world one tick.
    ///
    /// Three phases, each visiting snakes in spawn order:
    ///
    /// 1. **Decide** - every snake (frozen ones included, to keep the draw
    ///    sequence stable) picks a heading from pre-tick state.
    /// 2. **Commit** - all staged headings are written back at once, so no
    ///    decision can see a neighbour's new heading.
    /// 3. **Resolve** - snakes move one by one; food, cuts, and freezes from
    ///    earlier snakes are visible to later ones in the same tick.
    pub fn step(&mut self) -> TickReport {
        let next_tick = self.tick.next();
        let order = self.snakes.handles.clone();

        self.stage_decisions(&order);
        self.commit_directions(&order);

        let mut report = TickReport {
            tick: next_tick,
            ..TickReport::default()
        };
        self.resolve_moves(&order, &mut report);

        self.tick = next_tick;
        report
    }

    /// Copies the visible state for rendering, persistence, or comparison.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick,
            world_size: self.config.world_size,
            snakes: self
                .snakes
                .handles
                .iter()
                .filter_map(|&id| self.snapshot_snake(id))
                .collect(),
            food: self.food.cells().to_vec(),
        }
    }

    #[must_use]
    pub fn snapshot_snake(&self, id: SnakeId) -> Option<SnakeSnapshot> {
        let snake = self.snakes.get(id)?;
        Some(SnakeSnapshot {
            id,
            body: snake.body.iter().copied().collect(),
            direction: snake.direction,
            frozen: snake.frozen,
            frozen_ticks_remaining: snake.frozen_ticks_remaining,
        })
    }

    fn stage_decisions(&mut self, order: &[SnakeId]) {
        self.staged.clear();
        for &id in order {
            if let Some(direction) = self.decide(id) {
                self.staged.insert(id, direction);
            }
        }
    }

    fn commit_directions(&mut self, order: &[SnakeId]) {
        for &id in order {
            if let Some(direction) = self.staged.remove(id)
                && let Some(snake) = self.snakes.get_mut(id)
            {
                snake.direction = direction;
            }
        }
    }

    fn resolve_moves(&mut self, order: &[SnakeId], report: &mut TickReport) {
        for &id in order {
            let outcome = self.resolve(id);
            report.food_eaten += u32::from(outcome.ate);
            report.food_spawned += u32::from(outcome.replenished);
            report.self_cuts += u32::from(outcome.cut_self);
            report.cross_cuts += outcome.cross_cuts;
        }
        report.frozen_snakes = self.snakes.frozen_count();
    }

    /// Picks the heading a snake will commit this tick.
    ///
    /// The scan walks the three admissible headings in the fixed
    /// [`Direction::ALL`] order (the reversal is never admissible) and keeps
    /// those whose target cell no body covers, the snake's own tail and
    /// frozen snakes included. Then:
    ///
    /// * if the nearest food is within sensing range and a safe heading
    ///   strictly shortens the distance, the first such heading wins and no
    ///   draw is consumed;
    /// * otherwise one uniform draw picks among the safe headings;
    /// * with no safe heading the snake keeps its heading, consuming no draw.
    fn decide(&mut self, id: SnakeId) -> Option<Direction> {
        let size = self.config.world_size;
        let snake = self.snakes.get(id)?;
        let head = snake.head()?;
        let facing = snake.direction;

        let mut safe: Vec<(Direction, Cell)> = Vec::with_capacity(3);
        for direction in Direction::ALL {
            if direction == facing.opposite() {
                continue;
            }
            let target = head.step(direction, size);
            if self.snakes.contains_cell(target) {
                continue;
            }
            safe.push((direction, target));
        }
        if safe.is_empty() {
            return Some(facing);
        }

        if let Some(current) = self.food.nearest_distance(head, size)
            && current <= 2 * FOOD_SENSE_THRESHOLD
        {
            let mut best = current;
            let mut toward_food = None;
            for &(direction, target) in &safe {
                if let Some(distance) = self.food.nearest_distance(target, size)
                    && distance < best
                {
                    best = distance;
                    toward_food = Some(direction);
                }
            }
            if toward_food.is_some() {
                return toward_food;
            }
        }

        let index = (self.rng.next_unit() * safe.len() as f64) as usize;
        Some(safe[index].0)
    }

    /// Applies one snake's tick: grace countdown if frozen, otherwise food,
    /// cuts, and the move itself, in that order.
    ///
    /// Eating shields the mover for the tick; a head landing on food skips
    /// both collision checks. Cuts truncate bodies in place and never remove
    /// a snake, so the smallest surviving body is a single cell.
    fn resolve(&mut self, id: SnakeId) -> ResolveOutcome {
        let mut outcome = ResolveOutcome::default();
        let size = self.config.world_size;

        {
            let Some(snake) = self.snakes.get_mut(id) else {
                return outcome;
            };
            if snake.frozen {
                snake.frozen_ticks_remaining = snake.frozen_ticks_remaining.saturating_sub(1);
                if snake.frozen_ticks_remaining == 0 {
                    snake.frozen = false;
                }
                return outcome;
            }
        }

        let Some((head, facing)) = self
            .snakes
            .get(id)
            .and_then(|snake| snake.head().map(|head| (head, snake.direction)))
        else {
            return outcome;
        };
        let new_head = head.step(facing, size);

        outcome.ate = self.food.take_first(new_head);
        if outcome.ate && self.config.replenish_food {
            let cell = self.random_cell();
            self.food.push(cell);
            outcome.replenished = true;
        }
        let mut suppress_pop = outcome.ate;

        if !outcome.ate && self.config.cut_self_on_collision {
            let hit = self.snakes.get(id).and_then(|snake| {
                let index = snake.body.iter().position(|&cell| cell == new_head)?;
                let tail = snake.body.len() - 1;
                if index == 0 || (self.config.self_collision_excludes_tail && index == tail) {
                    None
                } else {
                    Some(index)
                }
            });
            if let Some(index) = hit
                && let Some(snake) = self.snakes.get_mut(id)
            {
                // Keep the cells before the impact; the new head replaces
                // this tick's tail adjustment.
                snake.body.truncate(index);
                snake.frozen = true;
                snake.frozen_ticks_remaining = self.config.freeze_ticks;
                suppress_pop = true;
                outcome.cut_self = true;
            }
        }

        if !outcome.ate && self.config.cut_other_on_collision {
            let victims: Vec<(SnakeId, usize)> = self
                .snakes
                .handles
                .iter()
                .filter(|&&other| other != id)
                .filter_map(|&other| {
                    let snake = self.snakes.get(other)?;
                    if snake.frozen {
                        return None;
                    }
                    let index = snake.body.iter().position(|&cell| cell == new_head)?;
                    Some((other, index))
                })
                .collect();
            for (other, index) in victims {
                if let Some(snake) = self.snakes.get_mut(other) {
                    snake.body.truncate(index + 1);
                    snake.frozen = true;
                    snake.frozen_ticks_remaining = self.config.freeze_ticks;
                    outcome.cross_cuts += 1;
                }
            }
        }

        if let Some(snake) = self.snakes.get_mut(id) {
            snake.body.push_front(new_head);
            if !suppress_pop {
                snake.body.pop_back();
            }
        }
        outcome
    }

    fn random_coord(&mut self) -> u16 {
        (self.rng.next_unit() * f64::from(self.config.world_size)) as u16
    }

    /// One random cell: an `x` draw followed by a `y` draw.
    fn random_cell(&mut self) -> Cell {
        let x = self.random_coord();
        let y = self.random_coord();
        Cell::new(x, y)
    }

    fn random_direction(&mut self) -> Direction {
        let index = (self.rng.next_unit() * 4.0) as usize;
        Direction::ALL[index]
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("tick", &self.tick)
            .field("snakes", &self.snakes.len())
            .field("food", &self.food.len())
            .field("rng", &self.rng)
            .finish_non_exhaustive()
    }
}
