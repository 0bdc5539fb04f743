//! Grid geometry: half-integer tile coordinates, entity footprints, the
//! concentric-ring addressing scheme, and the wire reach predicate.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn shift(self, x: f64, y: f64) -> Self {
        Self {
            x: self.x + x,
            y: self.y + y,
        }
    }

    pub fn shift_x(self, d: f64) -> Self {
        Self {
            x: self.x + d,
            y: self.y,
        }
    }

    pub fn shift_y(self, d: f64) -> Self {
        Self {
            x: self.x,
            y: self.y + d,
        }
    }

    pub fn abs(self) -> (f64, f64) {
        (self.x.abs(), self.y.abs())
    }

    /// The index of the ring this position belongs to.
    pub fn ring_index(self) -> usize {
        let (x, y) = self.abs();

        if x >= y {
            x as usize
        } else {
            y as usize
        }
    }

    /// Which of the eight ring areas this position falls in, along with the
    /// ring radius (the larger of |x| and |y|).
    pub fn ring_area(self) -> (RingArea, f64) {
        let (x, y) = self.abs();

        if x == y {
            match (self.x < 0.0, self.y < 0.0) {
                (true, true) => return (RingArea::BottomLeft, x),
                (false, true) => return (RingArea::BottomRight, x),
                (true, false) => return (RingArea::TopLeft, x),
                (false, false) => return (RingArea::TopRight, x),
            }
        }

        if x > y {
            if self.x < 0.0 {
                return (RingArea::Left, x);
            }

            return (RingArea::Right, x);
        }

        if self.y < 0.0 {
            return (RingArea::Bottom, y);
        }

        (RingArea::Top, y)
    }

    pub fn distance_xy(self, other: Position) -> (f64, f64) {
        ((self.x - other.x).abs(), (self.y - other.y).abs())
    }

    /// Whether a wire can span from this position to `other`. The table maps
    /// the whole-tile horizontal distance to the exclusive vertical limit;
    /// note the strict `<`: at |dx| = 10 only |dy| < 1 connects, and |dx| = 11
    /// never does.
    pub fn can_connect(self, other: Position) -> bool {
        let (dx, dy) = self.distance_xy(other);

        if dx as usize >= WIRE_REACH.len() {
            return false;
        }

        (dy as usize) < WIRE_REACH[dx as usize]
    }

    /// Bounds of a footprint centered here with the given half-extents
    /// (`length` along y, `width` along x).
    pub fn bounds(self, length: f64, width: f64) -> Bounds {
        Bounds {
            tr: Position {
                x: self.x + width,
                y: self.y + length,
            },
            bl: Position {
                x: self.x - width,
                y: self.y - length,
            },
        }
    }
}

const WIRE_REACH: [usize; 11] = [10, 10, 9, 9, 9, 9, 8, 7, 6, 5, 1];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingArea {
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    North,
    East,
    South,
    West,
}

impl Direction {
    /// The wire-format encoding (0 = N, 2 = E, 4 = S, 6 = W).
    pub fn value(self) -> u8 {
        match self {
            Direction::North => 0,
            Direction::East => 2,
            Direction::South => 4,
            Direction::West => 6,
        }
    }

    fn from_value(value: u8) -> Direction {
        match value % 8 {
            0 => Direction::North,
            2 => Direction::East,
            4 => Direction::South,
            6 => Direction::West,
            _ => unreachable!("direction values are even"),
        }
    }

    /// Rotates by `eighths` steps of the wire-format encoding.
    pub fn rotate(self, eighths: u8) -> Direction {
        Direction::from_value((self.value() + eighths) % 8)
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::North | Direction::South)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub tr: Position,
    pub bl: Position,
}

impl Bounds {
    /// Visits the center of every tile inside the bounds, column by column.
    /// Stops early when the callback returns `true`.
    pub fn iterate(self, mut cb: impl FnMut(Position) -> bool) {
        let mut x = self.bl.x + 0.5;

        while x < self.tr.x {
            let mut y = self.bl.y + 0.5;

            while y < self.tr.y {
                if cb(Position { x, y }) {
                    return;
                }

                y += 1.0;
            }

            x += 1.0;
        }
    }

    pub fn tiles(self) -> Vec<Position> {
        let mut tiles = Vec::new();
        self.iterate(|pos| {
            tiles.push(pos);
            false
        });
        tiles
    }

    pub fn contains(self, p: Position) -> bool {
        self.tr.x >= p.x && self.tr.y >= p.y && self.bl.x <= p.x && self.bl.y <= p.y
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn reach_boundaries() {
        let origin = Position::new(0.5, 0.5);

        // |dx| = 10, |dy| = 0 connects
        assert!(origin.can_connect(Position::new(10.5, 0.5)));
        // |dx| = 10, |dy| = 1 does not
        assert!(!origin.can_connect(Position::new(10.5, 1.5)));
        // |dx| = 11 never connects
        assert!(!origin.can_connect(Position::new(11.5, 0.5)));
        // the table is symmetric in axes
        assert!(origin.can_connect(Position::new(0.5, 10.5)));
        assert!(origin.can_connect(Position::new(5.5, 8.5)));
        assert!(!origin.can_connect(Position::new(6.5, 9.5)));
    }

    #[test]
    fn ring_index_boundaries() {
        assert_eq!(Position::new(-10.5, 0.5).ring_index(), 10);
        assert_eq!(Position::new(10.5, -10.5).ring_index(), 10);
        assert_eq!(Position::new(0.5, 0.5).ring_index(), 0);
        assert_eq!(Position::new(-0.5, -0.5).ring_index(), 0);
        assert_eq!(Position::new(3.5, 1.5).ring_index(), 3);
    }

    #[test]
    fn ring_area_classification() {
        assert_eq!(
            Position::new(10.5, -10.5).ring_area(),
            (RingArea::BottomRight, 10.5)
        );
        assert_eq!(Position::new(-3.5, 1.5).ring_area(), (RingArea::Left, 3.5));
        assert_eq!(Position::new(3.5, 1.5).ring_area(), (RingArea::Right, 3.5));
        assert_eq!(Position::new(1.5, 3.5).ring_area(), (RingArea::Top, 3.5));
        assert_eq!(
            Position::new(1.5, -3.5).ring_area(),
            (RingArea::Bottom, 3.5)
        );
        assert_eq!(
            Position::new(-2.5, 2.5).ring_area(),
            (RingArea::TopLeft, 2.5)
        );
    }

    #[test]
    fn bounds_iteration_covers_footprints() {
        // 1x1 footprint
        assert_eq!(Position::new(0.5, 0.5).bounds(0.5, 0.5).tiles().len(), 1);
        // 1x2 combinator, vertical
        assert_eq!(Position::new(0.5, 0.0).bounds(1.0, 0.5).tiles().len(), 2);
        // 2x2 substation centered on a whole coordinate
        assert_eq!(Position::new(0.0, 0.0).bounds(1.0, 1.0).tiles().len(), 4);
        // 4x4 roboport
        assert_eq!(Position::new(0.0, 0.0).bounds(2.0, 2.0).tiles().len(), 16);
    }

    #[test]
    fn direction_rotation() {
        assert_eq!(Direction::South.rotate(6), Direction::East);
        assert_eq!(Direction::North.rotate(6), Direction::West);
        assert_eq!(Direction::East.rotate(6), Direction::North);
        assert_eq!(Direction::West.rotate(6), Direction::South);
        assert_eq!(Direction::North.rotate(2), Direction::East);
    }
}
