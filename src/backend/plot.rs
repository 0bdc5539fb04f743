//! The plot: an occupancy map organized as concentric rings around the
//! origin, growing outward on demand. Expansion lays down the power and
//! logistics lattices — substations every 18 tiles, roboports every 50 —
//! with irregular substation pairs flanking any roboport they collide with.
//!
//! Ring `k` holds `8k + 4` tile slots. The important bits of the slot math:
//! the greater of |x| and |y| names the edge a coordinate is on and is half
//! the edge length, so corner positions fall out of the ring length alone.

use log::debug;

use crate::backend::{
    entity::{EntityArena, EntityId, EntityKind},
    geometry::{Bounds, Direction, Position, RingArea},
};

#[derive(Debug)]
pub struct Ring {
    slots: Vec<Option<EntityId>>,
}

impl Ring {
    pub fn new(index: usize) -> Self {
        Self {
            slots: vec![None; index * 8 + 4],
        }
    }

    pub fn radius(&self) -> f64 {
        ((self.slots.len() - 4) / 8) as f64 + 0.5
    }

    /// Slot counts per vertical and horizontal edge (corners fused into the
    /// vertical edges).
    fn size_even(&self) -> (usize, usize) {
        let base = (self.slots.len() - 4) / 4;

        (base + 2, base)
    }

    fn slot_index(area: RingArea, radius: f64, pos: Position) -> usize {
        match area {
            RingArea::BottomLeft => 0,
            RingArea::TopLeft => 1,
            RingArea::BottomRight => 2,
            RingArea::TopRight => 3,
            RingArea::Left => (radius + 3.0 + pos.y) as usize,
            RingArea::Right => (radius * 3.0 + 2.0 + pos.y) as usize,
            RingArea::Bottom => (5.0 * radius + pos.x + 1.0) as usize,
            RingArea::Top => (7.0 * radius + pos.x) as usize,
        }
    }

    /// The canonical traversal position of 2x1 slot cursor `pl`: left edge
    /// top-to-bottom, then top, right reversed, bottom reversed. Even ring
    /// indices swap the axes and rotate the direction; callers never see the
    /// convention, only the resulting coordinates.
    pub fn next_slot(&self, pl: usize, ring_index: usize) -> (Position, Direction, bool) {
        let (v, h) = self.size_even();
        let radius = self.radius();

        let mut pl = pl;

        let (mut pos, mut dir, is_full) = if pl < v {
            // left
            (
                Position::new(-radius, pl as f64 - radius + 0.5),
                Direction::South,
                false,
            )
        } else {
            pl -= v;

            if pl < h {
                // top
                (
                    Position::new(pl as f64 - radius + 1.5, radius),
                    Direction::East,
                    false,
                )
            } else {
                pl -= h;

                if pl < v {
                    // right, top to bottom
                    (
                        Position::new(radius, -(pl as f64 - radius + 0.5)),
                        Direction::North,
                        false,
                    )
                } else {
                    pl -= v;

                    // bottom, right to left
                    (
                        Position::new(-(pl as f64 - radius + 1.5), -radius),
                        Direction::West,
                        pl + 2 == h,
                    )
                }
            }
        };

        if ring_index % 2 == 0 {
            pos = Position::new(pos.y, pos.x);
            dir = dir.rotate(6);
        }

        (pos, dir, is_full)
    }
}

#[derive(Debug, Default)]
pub struct Plot {
    rings: Vec<Ring>,
    /// Every placed entity, in placement order; this is the serialization
    /// order of the final blueprint.
    pub placements: Vec<EntityId>,
}

impl Plot {
    /// The initial plot: five rings, the logistics hub on the origin, and an
    /// irregular substation pair flanking it.
    pub fn bootstrap(arena: &mut EntityArena) -> Self {
        let mut plot = Self {
            rings: (0..5).map(Ring::new).collect(),
            placements: Vec::new(),
        };

        let hub = arena.create(EntityKind::Roboport);
        plot.place(arena, hub, Position::new(0.0, 0.0), Direction::North);

        let upper = plot.place_irregular_substation(
            arena,
            Position::new(0.0, 3.0),
            Position::default(),
            true,
            true,
        );
        let lower = plot.place_irregular_substation(
            arena,
            Position::new(0.0, -3.0),
            Position::default(),
            true,
            false,
        );
        plot.add_neighbor(arena, upper, lower);

        plot
    }

    pub fn ring_count(&self) -> usize {
        self.rings.len()
    }

    pub fn ring(&self, index: usize) -> Option<&Ring> {
        self.rings.get(index)
    }

    /// Resolves a position to its ring and slot index. Positions on whole
    /// coordinates (footprint centers of even-sized entities) are nudged to
    /// the tile center they cover.
    fn locate(&self, pos: Position) -> Option<(usize, usize)> {
        let mut pos = pos;

        if pos.x == pos.x.floor() {
            pos.x += 0.5;
        }

        if pos.y == pos.y.floor() {
            pos.y += 0.5;
        }

        let (area, radius) = pos.ring_area();
        let ring_index = radius as usize;

        let ring = self.rings.get(ring_index)?;
        let slot = Ring::slot_index(area, radius, pos);

        if slot >= ring.slots.len() {
            return None;
        }

        Some((ring_index, slot))
    }

    pub fn get(&self, pos: Position) -> Option<EntityId> {
        let (ring, slot) = self.locate(pos)?;
        self.rings[ring].slots[slot]
    }

    pub fn can_place(&self, bounds: Bounds) -> bool {
        let mut free = true;

        bounds.iterate(|pos| {
            if self.get(pos).is_some() {
                free = false;
                return true;
            }

            false
        });

        free
    }

    /// Puts `entity` on the plot, assigning its blueprint number and filling
    /// every tile of its footprint.
    pub fn place(&mut self, arena: &mut EntityArena, entity: EntityId, pos: Position, dir: Direction) {
        arena.number(entity);

        {
            let e = &mut arena[entity];
            e.position = Some(pos);
            e.direction = dir;
        }

        self.placements.push(entity);

        for tile in arena[entity].bounds().tiles() {
            let (ring, slot) = self
                .locate(tile)
                .expect("placement outside the allocated rings");

            debug_assert!(
                self.rings[ring].slots[slot].is_none(),
                "overwriting an occupied tile at {tile:?}"
            );

            self.rings[ring].slots[slot] = Some(entity);
        }
    }

    /// Takes `entity` back off the plot, clearing its tiles and dropping it
    /// from the placement order.
    pub fn remove(&mut self, arena: &mut EntityArena, entity: EntityId) {
        for tile in arena[entity].bounds().tiles() {
            let (ring, slot) = self
                .locate(tile)
                .expect("removal outside the allocated rings");

            debug_assert!(
                self.rings[ring].slots[slot] == Some(entity),
                "removing a tile the entity does not occupy"
            );

            self.rings[ring].slots[slot] = None;
        }

        let index = self
            .placements
            .iter()
            .rposition(|id| *id == entity)
            .expect("removing an entity that was never placed");
        self.placements.remove(index);

        let e = &mut arena[entity];
        e.position = None;
        e.direction = Direction::North;
    }

    /* Power lattice */

    fn substation_reaches(&self, arena: &EntityArena, substation: EntityId, pos: Position) -> bool {
        let s = arena[substation]
            .position
            .expect("placed substations have positions");

        if s.x == pos.x {
            return (s.y - pos.y).abs() <= 18.0;
        }

        if s.y == pos.y {
            return (s.x - pos.x).abs() <= 18.0;
        }

        false
    }

    /// Finds a substation around `neighbor_pos` that can pair with a
    /// substation at `from`. A roboport found there redirects the search to
    /// the irregular substations flanking it.
    fn get_substation(
        &self,
        arena: &EntityArena,
        neighbor_pos: Position,
        from: Position,
    ) -> Option<EntityId> {
        let mut found = None;

        neighbor_pos.bounds(1.0, 1.0).iterate(|pos| {
            let Some(entity) = self.get(pos) else {
                return false;
            };

            match &arena[entity].kind {
                EntityKind::Substation { .. } => {
                    if !self.substation_reaches(arena, entity, from) {
                        return false;
                    }

                    found = Some(entity);
                    true
                }
                EntityKind::Roboport => {
                    let hub = arena[entity].position.expect("placed roboport");

                    let flank = if neighbor_pos.x == from.x && from.y > hub.y {
                        Position::new(neighbor_pos.x, hub.y + 3.0)
                    } else if neighbor_pos.x == from.x && from.y < hub.y {
                        Position::new(neighbor_pos.x, hub.y - 3.0)
                    } else if neighbor_pos.y == from.y && from.x > hub.x {
                        Position::new(hub.x + 3.0, neighbor_pos.y)
                    } else if neighbor_pos.y == from.y && from.x < hub.x {
                        Position::new(hub.x - 3.0, neighbor_pos.y)
                    } else {
                        return false;
                    };

                    match self.get(flank) {
                        Some(candidate)
                            if matches!(
                                arena[candidate].kind,
                                EntityKind::Substation { .. }
                            ) =>
                        {
                            found = Some(candidate);
                            true
                        }
                        _ => false,
                    }
                }
                _ => false,
            }
        });

        found
    }

    fn adjacent_substations(&self, arena: &EntityArena, pos: Position) -> Vec<EntityId> {
        let mut stations = Vec::new();

        for probe in [
            pos.shift_x(18.0),
            pos.shift_x(-18.0),
            pos.shift_y(18.0),
            pos.shift_y(-18.0),
        ] {
            if let Some(substation) = self.get_substation(arena, probe, pos) {
                stations.push(substation);
            }
        }

        stations
    }

    pub fn add_neighbor(&mut self, arena: &mut EntityArena, a: EntityId, b: EntityId) {
        arena.number(a);
        arena.number(b);

        let push = |arena: &mut EntityArena, host: EntityId, peer: EntityId| {
            match &mut arena[host].kind {
                EntityKind::Substation { neighbors } => neighbors.push(peer),
                other => panic!("neighboring a non-substation: {other:?}"),
            }
        };

        push(arena, a, b);
        push(arena, b, a);
    }

    /// Places one substation of an irregular pair flanking a roboport and
    /// links it to the lattice neighbor it stands in for.
    pub fn place_irregular_substation(
        &mut self,
        arena: &mut EntityArena,
        at: Position,
        original: Position,
        was_placed_vertical: bool,
        is_offset_positive: bool,
    ) -> EntityId {
        let substation = arena.create(EntityKind::Substation {
            neighbors: Vec::new(),
        });
        self.place(arena, substation, at, Direction::North);

        let probe = match (was_placed_vertical, is_offset_positive) {
            (true, true) => original.shift_y(18.0),
            (true, false) => original.shift_y(-18.0),
            (false, true) => original.shift_x(18.0),
            (false, false) => original.shift_x(-18.0),
        };

        if let Some(neighbor) = self.get_substation(arena, probe, original) {
            self.add_neighbor(arena, substation, neighbor);
        }

        substation
    }

    /// Appends rings. Whenever the new perimeter lands on the substation
    /// lattice (every 18 rings) or the roboport lattice (every 50, with a
    /// small nudge so the two coexist), the corresponding ring of hardware is
    /// placed on the new boundary.
    pub fn expand(&mut self, arena: &mut EntityArena) {
        let old_len = self.rings.len();
        let mut new_len = old_len + 1;

        let mut substation_distance = 0usize;
        let mut roboport_distance = 0usize;

        if new_len % 18 == 0 {
            substation_distance = new_len;
            new_len += 2;
        }

        if new_len % 50 >= 48 || new_len % 50 == 0 {
            roboport_distance = match new_len % 50 {
                48 => new_len + 2,
                49 => new_len + 1,
                _ => new_len,
            };

            for _ in 0..6 {
                new_len += 1;

                if substation_distance == 0 && new_len % 18 == 0 {
                    substation_distance = new_len;
                    new_len += 2;
                }
            }
        }

        for index in old_len..new_len {
            self.rings.push(Ring::new(index));
        }

        debug!(
            "expanded plot to {} rings (substations at {substation_distance}, roboports at {roboport_distance})",
            self.rings.len()
        );

        if roboport_distance != 0 {
            iterate_edges(roboport_distance as f64, 50.0, |pos| {
                let roboport = arena.create(EntityKind::Roboport);
                self.place(arena, roboport, pos, Direction::North);
            });
        }

        if substation_distance != 0 {
            iterate_edges(substation_distance as f64, 18.0, |pos| {
                // A lattice slot owned by a roboport gets an irregular pair
                // flanking the roboport instead.
                let mut roboport = None;

                pos.bounds(1.0, 1.0).iterate(|tile| {
                    if let Some(entity) = self.get(tile) {
                        match arena[entity].kind {
                            EntityKind::Roboport => roboport = Some(entity),
                            ref other => panic!("expected roboport, found {other:?}"),
                        }

                        return true;
                    }

                    false
                });

                if let Some(roboport) = roboport {
                    let hub = arena[roboport].position.expect("placed roboport");
                    let (x, y) = pos.abs();

                    if y > x {
                        let a = self.place_irregular_substation(
                            arena,
                            Position::new(hub.x + 3.0, pos.y),
                            pos,
                            false,
                            true,
                        );
                        let b = self.place_irregular_substation(
                            arena,
                            Position::new(hub.x - 3.0, pos.y),
                            pos,
                            false,
                            false,
                        );
                        self.add_neighbor(arena, a, b);
                    } else {
                        let a = self.place_irregular_substation(
                            arena,
                            Position::new(pos.x, hub.y + 3.0),
                            pos,
                            true,
                            true,
                        );
                        let b = self.place_irregular_substation(
                            arena,
                            Position::new(pos.x, hub.y - 3.0),
                            pos,
                            true,
                            false,
                        );
                        self.add_neighbor(arena, a, b);
                    }

                    return;
                }

                let substation = arena.create(EntityKind::Substation {
                    neighbors: Vec::new(),
                });
                self.place(arena, substation, pos, Direction::North);

                for neighbor in self.adjacent_substations(arena, pos) {
                    self.add_neighbor(arena, substation, neighbor);
                }
            });
        }
    }

    /// Expands until the outermost rings sit inside a substation ring's
    /// supply area, so nothing near the perimeter is left unpowered.
    pub fn ensure_outer_power(&mut self, arena: &mut EntityArena) {
        while self.rings.len() % 18 > 9 {
            self.expand(arena);
        }
    }

    /// A glyph-per-tile dump of the plot for debug logging.
    pub fn render_ascii(&self, arena: &EntityArena) -> String {
        let Some(outer) = self.rings.last() else {
            return "<empty plot>".to_owned();
        };

        let radius = outer.radius();
        let mut out = String::new();

        let mut y = -radius + 0.5;
        while y < radius - 0.5 {
            let mut x = -radius + 0.5;

            while x < radius - 0.5 {
                let glyph = match self.get(Position::new(x, y)) {
                    None => '.',
                    Some(entity) => match arena[entity].kind {
                        EntityKind::Substation { .. } => 'S',
                        EntityKind::Arithmetic(_) => 'a',
                        EntityKind::Decider(_) => 'd',
                        EntityKind::Constant(_) => 'c',
                        EntityKind::Lamp(_) => 'l',
                        EntityKind::Roboport => 'R',
                    },
                };

                out.push(glyph);
                x += 1.0;
            }

            out.push('\n');
            y += 1.0;
        }

        out
    }
}

/// Visits the edge and corner positions of the square of the given radius at
/// the given spacing.
pub fn iterate_edges(distance: f64, step: f64, mut cb: impl FnMut(Position)) {
    let mut x = -distance + step;

    while x < distance {
        cb(Position::new(x, distance));
        cb(Position::new(x, -distance));
        cb(Position::new(distance, x));
        cb(Position::new(-distance, x));

        x += step;
    }

    cb(Position::new(distance, distance));
    cb(Position::new(distance, -distance));
    cb(Position::new(-distance, distance));
    cb(Position::new(-distance, -distance));
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::backend::entity::{EntityArena, EntityKind};

    fn footprint_tiles(arena: &EntityArena, plot: &Plot) -> usize {
        plot.placements
            .iter()
            .map(|id| arena[*id].bounds().tiles().len())
            .sum()
    }

    fn occupied_tiles(plot: &Plot) -> usize {
        plot.rings
            .iter()
            .map(|ring| ring.slots.iter().filter(|s| s.is_some()).count())
            .sum()
    }

    #[test]
    fn bootstrap_places_hub_and_irregular_pair() {
        let mut arena = EntityArena::new();
        let plot = Plot::bootstrap(&mut arena);

        assert_eq!(plot.placements.len(), 3);

        let hub = plot.placements[0];
        assert!(matches!(arena[hub].kind, EntityKind::Roboport));
        assert_eq!(arena[hub].position, Some(Position::new(0.0, 0.0)));

        let upper = plot.placements[1];
        let lower = plot.placements[2];
        assert_eq!(arena[upper].position, Some(Position::new(0.0, 3.0)));
        assert_eq!(arena[lower].position, Some(Position::new(0.0, -3.0)));

        // Mutual neighbors
        let EntityKind::Substation { neighbors } = &arena[upper].kind else {
            panic!("expected substation");
        };
        assert_eq!(neighbors, &vec![lower]);

        let EntityKind::Substation { neighbors } = &arena[lower].kind else {
            panic!("expected substation");
        };
        assert_eq!(neighbors, &vec![upper]);
    }

    #[test]
    fn occupancy_matches_placements() {
        let mut arena = EntityArena::new();
        let mut plot = Plot::bootstrap(&mut arena);

        assert_eq!(occupied_tiles(&plot), footprint_tiles(&arena, &plot));

        let extra = arena.create(EntityKind::Constant(Vec::new()));
        plot.place(&mut arena, extra, Position::new(5.5, 5.5), Direction::North);
        assert_eq!(occupied_tiles(&plot), footprint_tiles(&arena, &plot));

        plot.remove(&mut arena, extra);
        assert_eq!(occupied_tiles(&plot), footprint_tiles(&arena, &plot));
        assert!(arena[extra].position.is_none());
    }

    #[test]
    fn slot_lookup_round_trips() {
        let mut arena = EntityArena::new();
        let mut plot = Plot::bootstrap(&mut arena);

        for pos in [
            Position::new(2.5, -1.5),
            Position::new(-3.5, 3.5),
            Position::new(0.5, 4.5),
            Position::new(-4.5, 0.5),
            Position::new(4.5, 4.5),
        ] {
            assert_eq!(plot.get(pos), None, "expected {pos:?} free");

            let marker = arena.create(EntityKind::Constant(Vec::new()));
            plot.place(&mut arena, marker, pos, Direction::North);
            assert_eq!(plot.get(pos), Some(marker));
            plot.remove(&mut arena, marker);
        }
    }

    #[test]
    fn expansion_to_the_roboport_lattice() {
        let mut arena = EntityArena::new();
        let mut plot = Plot::bootstrap(&mut arena);

        // Grow until the 50-ring roboport lattice has been laid down
        while plot.ring_count() < 50 {
            plot.expand(&mut arena);
        }

        let roboports = plot
            .placements
            .iter()
            .filter(|id| matches!(arena[**id].kind, EntityKind::Roboport))
            .count();

        // The central hub plus a full ring of roboports
        assert!(roboports > 1, "expected a roboport ring, found {roboports}");

        let substations = plot
            .placements
            .iter()
            .filter(|id| matches!(arena[**id].kind, EntityKind::Substation { .. }))
            .count();
        assert!(substations > 2);

        // Every substation outside the bootstrap pair is linked into the mesh
        for id in &plot.placements {
            if let EntityKind::Substation { neighbors } = &arena[*id].kind {
                assert!(
                    !neighbors.is_empty(),
                    "substation {:?} at {:?} has no neighbors",
                    id,
                    arena[*id].position
                );
            }
        }
    }

    #[test]
    fn substation_lattice_spacing_held_across_expansions() {
        let mut arena = EntityArena::new();
        let mut plot = Plot::bootstrap(&mut arena);

        for _ in 0..40 {
            plot.expand(&mut arena);
        }

        // Every regular substation sits within 18 tiles (along an axis) of a
        // peer it is registered with
        for id in &plot.placements {
            let EntityKind::Substation { neighbors } = &arena[*id].kind else {
                continue;
            };

            let here = arena[*id].position.unwrap();

            for peer in neighbors {
                let there = arena[*peer].position.unwrap();
                let (dx, dy) = here.distance_xy(there);

                assert!(
                    (dx == 0.0 && dy <= 18.0) || (dy == 0.0 && dx <= 18.0),
                    "neighbors {here:?} and {there:?} are not collinear within reach"
                );
            }
        }
    }

    #[test]
    fn ascii_render_shows_the_bootstrap() {
        let mut arena = EntityArena::new();
        let plot = Plot::bootstrap(&mut arena);

        let render = plot.render_ascii(&arena);

        assert!(render.contains('R'));
        assert!(render.contains('S'));

        // One row per tile of the outermost ring's span
        let rows = render.lines().count();
        assert_eq!(rows, 8);
    }

    #[test]
    fn slot_cursor_walks_the_ring() {
        let ring = Ring::new(3);

        // Odd ring: canonical order, starting down the left edge
        let (pos, dir, full) = ring.next_slot(0, 3);
        assert_eq!(pos, Position::new(-3.5, -3.0));
        assert_eq!(dir, Direction::South);
        assert!(!full);

        // Even rings swap axes and rotate the direction
        let ring = Ring::new(4);
        let (pos, dir, _) = ring.next_slot(0, 4);
        assert_eq!(pos, Position::new(-4.0, -4.5));
        assert_eq!(dir, Direction::East);
    }
}
