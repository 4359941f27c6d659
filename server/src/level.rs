//! Level source: embedded maps plus per-level pacing metadata.
//!
//! Each level is a rectangular character grid where `#` is an impassable
//! wall and anything else is open floor, paired with the tick rate and the
//! maximum number of simultaneous fruit for that map. An empty or missing
//! map falls back to a built-in bordered rectangle.

use log::{info, warn};
use shared::Point;

pub const DEFAULT_WIDTH: i32 = 30;
pub const DEFAULT_HEIGHT: i32 = 12;

const LEVEL_1: &str = "\
##############################
#                            #
#                            #
#                            #
#                            #
#                            #
#                            #
#                            #
#                            #
#                            #
#                            #
##############################";

const LEVEL_2: &str = "\
##############################
#                            #
#                            #
#    ########    ########    #
#                            #
#                            #
#                            #
#                            #
#    ########    ########    #
#                            #
#                            #
##############################";

const LEVEL_3: &str = "\
##############################




            ######
            ######




##############################";

const LEVEL_4: &str = "\


  ####                  ####
  ####                  ####




  ####                  ####
  ####                  ####

";

const LEVEL_5: &str = "\
##############################
#                            #
#  ####   ####   ####   #### #
#                            #
#      ##############        #
#                            #
#                            #
#        ##############      #
#                            #
#  ####   ####   ####   #### #
#                            #
##############################";

struct LevelDef {
    map: &'static str,
    tick_rate_hz: u32,
    max_fruits: usize,
}

const LEVELS: &[LevelDef] = &[
    LevelDef {
        map: LEVEL_1,
        tick_rate_hz: 3,
        max_fruits: 3,
    },
    LevelDef {
        map: LEVEL_2,
        tick_rate_hz: 3,
        max_fruits: 3,
    },
    LevelDef {
        map: LEVEL_3,
        tick_rate_hz: 5,
        max_fruits: 5,
    },
    LevelDef {
        map: LEVEL_4,
        tick_rate_hz: 10,
        max_fruits: 7,
    },
    LevelDef {
        map: LEVEL_5,
        tick_rate_hz: 12,
        max_fruits: 10,
    },
];

/// An immutable board. Replaced wholesale on a level change.
#[derive(Debug, Clone)]
pub struct Level {
    /// 1-based level number, for display.
    pub number: usize,
    pub width: i32,
    pub height: i32,
    pub tick_rate_hz: u32,
    pub max_fruits: usize,
    walls: Vec<bool>,
}

impl Level {
    /// Parses a map grid. Ragged rows are right-padded with floor; an empty
    /// map yields the default bordered rectangle.
    pub fn from_map(number: usize, map: &str, tick_rate_hz: u32, max_fruits: usize) -> Level {
        let rows: Vec<&str> = map.lines().collect();
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        if rows.is_empty() || width == 0 {
            warn!("Level {} has no map data, using default board", number);
            return Level::default_bordered(number, tick_rate_hz, max_fruits);
        }

        let height = rows.len();
        let mut walls = vec![false; width * height];
        for (y, row) in rows.iter().enumerate() {
            for (x, cell) in row.chars().enumerate() {
                walls[y * width + x] = cell == '#';
            }
        }
        info!("Level {} loaded ({}x{})", number, width, height);

        Level {
            number,
            width: width as i32,
            height: height as i32,
            tick_rate_hz,
            max_fruits,
            walls,
        }
    }

    /// Fallback board: a bordered 30x12 rectangle.
    pub fn default_bordered(number: usize, tick_rate_hz: u32, max_fruits: usize) -> Level {
        let (w, h) = (DEFAULT_WIDTH, DEFAULT_HEIGHT);
        let mut walls = vec![false; (w * h) as usize];
        for y in 0..h {
            for x in 0..w {
                if y == 0 || y == h - 1 || x == 0 || x == w - 1 {
                    walls[(y * w + x) as usize] = true;
                }
            }
        }
        Level {
            number,
            width: w,
            height: h,
            tick_rate_hz,
            max_fruits,
            walls,
        }
    }

    /// True if the cell holds a wall. Out-of-range coordinates are treated
    /// as open floor; callers wrap before asking.
    pub fn is_wall(&self, p: Point) -> bool {
        if p.x < 0 || p.y < 0 || p.x >= self.width || p.y >= self.height {
            return false;
        }
        self.walls[(p.y * self.width + p.x) as usize]
    }

    /// All wall cells, for the structured snapshot.
    pub fn wall_points(&self) -> Vec<Point> {
        let mut points = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                let p = Point::new(x, y);
                if self.is_wall(p) {
                    points.push(p);
                }
            }
        }
        points
    }
}

/// Rotating selection over the embedded level list.
pub struct LevelSet {
    current: usize,
}

impl LevelSet {
    pub fn new() -> Self {
        info!("Levels available: {}", LEVELS.len());
        Self { current: 0 }
    }

    pub fn len(&self) -> usize {
        LEVELS.len()
    }

    pub fn is_empty(&self) -> bool {
        LEVELS.is_empty()
    }

    fn build(&self) -> Level {
        let def = &LEVELS[self.current];
        Level::from_map(self.current + 1, def.map, def.tick_rate_hz, def.max_fruits)
    }

    pub fn current(&self) -> Level {
        self.build()
    }

    /// Advances to the next level, wrapping around at the end of the list.
    pub fn next(&mut self) -> Level {
        self.current = (self.current + 1) % LEVELS.len();
        self.build()
    }

    /// Selects a specific level, 1-based. Out-of-range numbers are rejected
    /// and leave the current selection untouched.
    pub fn set(&mut self, number: u32) -> Option<Level> {
        if number >= 1 && (number as usize) <= LEVELS.len() {
            self.current = number as usize - 1;
            Some(self.build())
        } else {
            None
        }
    }
}

impl Default for LevelSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_levels_parse_rectangular() {
        let mut set = LevelSet::new();
        for _ in 0..set.len() {
            let level = set.current();
            assert!(level.width > 0 && level.height > 0);
            assert_eq!(
                level.wall_points().len(),
                (0..level.height)
                    .flat_map(|y| (0..level.width).map(move |x| Point::new(x, y)))
                    .filter(|p| level.is_wall(*p))
                    .count()
            );
            set.next();
        }
    }

    #[test]
    fn test_level_one_is_bordered() {
        let level = LevelSet::new().current();
        for x in 0..level.width {
            assert!(level.is_wall(Point::new(x, 0)));
            assert!(level.is_wall(Point::new(x, level.height - 1)));
        }
        for y in 0..level.height {
            assert!(level.is_wall(Point::new(0, y)));
            assert!(level.is_wall(Point::new(level.width - 1, y)));
        }
        assert!(!level.is_wall(Point::new(1, 1)));
    }

    #[test]
    fn test_empty_map_falls_back_to_default() {
        let level = Level::from_map(1, "", 3, 3);
        assert_eq!(level.width, DEFAULT_WIDTH);
        assert_eq!(level.height, DEFAULT_HEIGHT);
        assert!(level.is_wall(Point::new(0, 0)));
        assert!(!level.is_wall(Point::new(5, 5)));
    }

    #[test]
    fn test_ragged_rows_right_padded_with_floor() {
        let level = Level::from_map(1, "####\n#\n####", 3, 3);
        assert_eq!(level.width, 4);
        assert_eq!(level.height, 3);
        assert!(level.is_wall(Point::new(0, 1)));
        assert!(!level.is_wall(Point::new(3, 1)));
    }

    #[test]
    fn test_next_wraps_around() {
        let mut set = LevelSet::new();
        let total = set.len();
        for expected in 2..=total {
            assert_eq!(set.next().number, expected);
        }
        assert_eq!(set.next().number, 1);
    }

    #[test]
    fn test_set_bounds() {
        let mut set = LevelSet::new();
        assert!(set.set(0).is_none());
        assert!(set.set(set.len() as u32 + 1).is_none());
        let level = set.set(3).expect("level 3 exists");
        assert_eq!(level.number, 3);
        assert_eq!(level.tick_rate_hz, 5);
        assert_eq!(level.max_fruits, 5);
        // a rejected set leaves the selection untouched
        assert!(set.set(99).is_none());
        assert_eq!(set.current().number, 3);
    }

    #[test]
    fn test_out_of_range_cells_are_open_floor() {
        let level = LevelSet::new().current();
        assert!(!level.is_wall(Point::new(-1, 0)));
        assert!(!level.is_wall(Point::new(0, level.height)));
    }
}
