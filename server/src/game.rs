//! Authoritative world state and the per-tick simulation step.
//!
//! All world mutation funnels through [`GameState`]; network code only
//! stages intents that the orchestrator feeds in at tick boundaries.

use crate::level::Level;
use log::{debug, info};
use rand::Rng;
use shared::{Direction, PlayerId, Point, SnakeState, Snapshot};
use std::collections::{HashMap, HashSet, VecDeque};

pub const WALL_GLYPH: char = '#';
pub const FLOOR_GLYPH: char = ' ';
pub const HEAD_GLYPH: char = 'O';

/// Board glyph for a fruit, encoding its value.
pub fn fruit_glyph(value: u32) -> char {
    match value {
        1 => '·',
        2 => '*',
        _ => '♦',
    }
}

/// Random coordinate strictly inside the border. Boards too narrow to
/// have an interior fall back to the midpoint instead of panicking.
fn interior_draw(rng: &mut impl Rng, extent: i32) -> i32 {
    if extent > 2 {
        rng.gen_range(1..extent - 1)
    } else {
        extent / 2
    }
}

#[derive(Debug, Clone)]
pub struct Snake {
    pub name: String,
    /// Single-character body glyph, derived from the player name.
    pub glyph: char,
    /// Head at the front; insertion order is positional order along the body.
    pub body: VecDeque<Point>,
    /// Ticks on which the tail must be retained instead of removed.
    pub growth_pending: u32,
}

impl Snake {
    fn new(name: String, spawn: Point) -> Self {
        let glyph = name
            .trim()
            .chars()
            .next()
            .map(|c| c.to_ascii_lowercase())
            .unwrap_or('o');
        let mut body = VecDeque::new();
        body.push_back(spawn);
        Self {
            name,
            glyph,
            body,
            growth_pending: 0,
        }
    }

    pub fn head(&self) -> Point {
        // non-empty while the player is registered
        *self.body.front().expect("snake body is never empty")
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fruit {
    pub at: Point,
    pub value: u32,
}

#[derive(Debug)]
pub struct GameState {
    level: Level,
    level_count: usize,
    snakes: HashMap<PlayerId, Snake>,
    headings: HashMap<PlayerId, Direction>,
    scores: HashMap<PlayerId, u32>,
    fruits: Vec<Fruit>,
    /// Keep a dead player's score entry for display instead of dropping it.
    preserve_scores: bool,
}

impl GameState {
    pub fn new(level: Level, level_count: usize, preserve_scores: bool) -> Self {
        let mut state = Self {
            level,
            level_count,
            snakes: HashMap::new(),
            headings: HashMap::new(),
            scores: HashMap::new(),
            fruits: Vec::new(),
            preserve_scores,
        };
        state.refill_fruits();
        state
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn has_players(&self) -> bool {
        !self.snakes.is_empty()
    }

    /// Registers a player with a length-1 snake on a random interior cell,
    /// heading right, score 0. The draw is blind: it is not checked against
    /// walls or other snakes, so an unlucky spawn can die on its first
    /// step. A second call for the same id overwrites the first.
    pub fn add_player(&mut self, id: PlayerId, name: &str) {
        let mut rng = rand::thread_rng();
        let spawn = Point::new(
            interior_draw(&mut rng, self.level.width),
            interior_draw(&mut rng, self.level.height),
        );
        info!("Added player {} ({}) at ({}, {})", id, name, spawn.x, spawn.y);
        self.snakes.insert(id, Snake::new(name.to_string(), spawn));
        self.headings.insert(id, Direction::Right);
        self.scores.insert(id, 0);
    }

    /// Deletes the snake, heading and score entries. No-op if absent.
    pub fn remove_player(&mut self, id: PlayerId) {
        if self.snakes.remove(&id).is_some() {
            info!("Removed player {}", id);
        }
        self.headings.remove(&id);
        self.scores.remove(&id);
    }

    /// Stages a heading change, to take effect on the next [`step`].
    /// Reversing into the body is rejected unless the snake is length 1,
    /// where reversal cannot self-collide.
    ///
    /// [`step`]: GameState::step
    pub fn set_heading(&mut self, id: PlayerId, requested: Direction) {
        let Some(snake) = self.snakes.get(&id) else {
            return;
        };
        let current = self.headings.get(&id).copied().unwrap_or(Direction::Right);
        if requested == current.opposite() && snake.len() > 1 {
            debug!(
                "Player {} reversal {} -> {} blocked",
                id, current, requested
            );
            return;
        }
        self.headings.insert(id, requested);
    }

    /// Advances the world by exactly one tick.
    pub fn step(&mut self) {
        let mut dead: HashSet<PlayerId> = HashSet::new();
        let mut new_heads: HashMap<PlayerId, Point> = HashMap::new();

        // Candidate heads with per-axis wrap-around; a wall cell kills.
        for (&id, snake) in &self.snakes {
            let dir = self.headings.get(&id).copied().unwrap_or(Direction::Right);
            let (dx, dy) = dir.delta();
            let head = snake.head();
            let candidate = Point::new(
                (head.x + dx).rem_euclid(self.level.width),
                (head.y + dy).rem_euclid(self.level.height),
            );
            if self.level.is_wall(candidate) {
                debug!("Player {} hit a wall at ({}, {})", id, candidate.x, candidate.y);
                dead.insert(id);
            } else {
                new_heads.insert(id, candidate);
            }
        }

        // Simultaneous head-on collisions kill every claimant of the cell.
        let mut claims: HashMap<Point, u32> = HashMap::new();
        for candidate in new_heads.values() {
            *claims.entry(*candidate).or_insert(0) += 1;
        }
        for (&id, candidate) in &new_heads {
            if claims[candidate] > 1 {
                debug!("Player {} lost a head-on collision", id);
                dead.insert(id);
            }
        }

        // Body collisions: own current head excluded, everything else counts.
        for (&id, candidate) in &new_heads {
            if dead.contains(&id) {
                continue;
            }
            let collided = self.snakes.iter().any(|(&other_id, other)| {
                other
                    .body
                    .iter()
                    .enumerate()
                    .filter(|&(i, _)| !(other_id == id && i == 0))
                    .any(|(_, seg)| *seg == *candidate)
            });
            if collided {
                debug!("Player {} ran into a snake body", id);
                dead.insert(id);
            }
        }

        for &id in &dead {
            self.snakes.remove(&id);
            self.headings.remove(&id);
            if !self.preserve_scores {
                self.scores.remove(&id);
            }
            info!("Player {} died", id);
        }

        // Survivors advance. The tail is retained only when growth was
        // already pending entering the tick, so a fruit worth N grows the
        // snake over the N ticks that follow the eat tick.
        let survivors: Vec<PlayerId> = new_heads
            .keys()
            .copied()
            .filter(|id| !dead.contains(id))
            .collect();
        for id in survivors {
            let candidate = new_heads[&id];
            let eaten = self
                .fruits
                .iter()
                .position(|f| f.at == candidate)
                .map(|i| self.fruits.remove(i));

            let Some(snake) = self.snakes.get_mut(&id) else {
                continue;
            };
            let growing = snake.growth_pending > 0;
            snake.body.push_front(candidate);
            if let Some(fruit) = eaten {
                snake.growth_pending += fruit.value;
                let score = self.scores.entry(id).or_insert(0);
                *score += fruit.value;
                info!(
                    "Player {} ate a fruit worth {} (score {}, growth pending {})",
                    id, fruit.value, score, snake.growth_pending
                );
            }
            if growing {
                snake.growth_pending -= 1;
            } else {
                snake.body.pop_back();
            }
        }

        self.refill_fruits();
    }

    /// Tops the fruit list up to the level maximum. Placement is bounded by
    /// an attempt budget, so a full board softly skips spawning this tick.
    fn refill_fruits(&mut self) {
        while self.fruits.len() < self.level.max_fruits {
            if !self.spawn_fruit() {
                debug!("No free cell for a fruit, skipping spawn this tick");
                break;
            }
        }
    }

    fn spawn_fruit(&mut self) -> bool {
        let mut rng = rand::thread_rng();
        let budget = (self.level.width * self.level.height).max(1);
        for _ in 0..budget {
            let at = Point::new(
                rng.gen_range(0..self.level.width),
                rng.gen_range(0..self.level.height),
            );
            if self.level.is_wall(at) || self.cell_occupied(at) {
                continue;
            }
            let value = rng.gen_range(1..=3);
            debug!("Spawned fruit at ({}, {}) worth {}", at.x, at.y, value);
            self.fruits.push(Fruit { at, value });
            return true;
        }
        false
    }

    fn cell_occupied(&self, at: Point) -> bool {
        self.snakes
            .values()
            .any(|s| s.body.iter().any(|seg| *seg == at))
            || self.fruits.iter().any(|f| f.at == at)
    }

    /// Deterministic ASCII render of the current world. Pure query.
    pub fn render_board(&self) -> String {
        let w = self.level.width as usize;
        let h = self.level.height as usize;
        let mut board = vec![vec![FLOOR_GLYPH; w]; h];

        for y in 0..h {
            for x in 0..w {
                if self.level.is_wall(Point::new(x as i32, y as i32)) {
                    board[y][x] = WALL_GLYPH;
                }
            }
        }
        for fruit in &self.fruits {
            board[fruit.at.y as usize][fruit.at.x as usize] = fruit_glyph(fruit.value);
        }
        for snake in self.snakes.values() {
            for (i, seg) in snake.body.iter().enumerate() {
                board[seg.y as usize][seg.x as usize] =
                    if i == 0 { HEAD_GLYPH } else { snake.glyph };
            }
        }

        let mut out = String::with_capacity(h * (w + 1));
        for row in board {
            out.extend(row);
            out.push('\n');
        }
        out
    }

    /// Human-readable score listing plus level info.
    pub fn render_scores(&self) -> String {
        let mut out = format!(
            "=== Level {} of {} ===\n\n",
            self.level.number, self.level_count
        );
        if self.snakes.is_empty() {
            out.push_str("No players connected");
            return out;
        }
        out.push_str("=== SCORES ===\n");
        let mut ids: Vec<&PlayerId> = self.snakes.keys().collect();
        ids.sort();
        for id in ids {
            let snake = &self.snakes[id];
            let score = self.scores.get(id).copied().unwrap_or(0);
            out.push_str(&format!(
                "Player {} ({}): {} points\n",
                id, snake.name, score
            ));
        }
        out.push_str("\nFruit legend:\n");
        out.push_str("· = 1 pt | * = 2 pts | ♦ = 3 pts\n");
        out.push_str("Walls: # (deadly) | Open edges wrap around\n");
        out.push_str("Snakes: O = head | lowercase letter = body");
        out
    }

    /// Structured snapshot of the world, for the `STATE` broadcast.
    pub fn snapshot(&self) -> Snapshot {
        let mut snakes: Vec<SnakeState> = self
            .snakes
            .iter()
            .map(|(&id, snake)| SnakeState {
                id,
                body: snake.body.iter().copied().collect(),
            })
            .collect();
        snakes.sort_by_key(|s| s.id);
        Snapshot {
            width: self.level.width,
            height: self.level.height,
            snakes,
            fruits: self.fruits.iter().map(|f| f.at).collect(),
            scores: self.scores.clone(),
            walls: self.level.wall_points(),
        }
    }

    /// Replaces the board, clears all fruit and refills to the new level's
    /// maximum. Snakes, scores and pending growth are left untouched; a
    /// snake now standing inside a wall dies on its next step.
    pub fn change_level(&mut self, level: Level) {
        info!("Switching to level {}", level.number);
        self.level = level;
        self.fruits.clear();
        self.refill_fruits();
    }
}
