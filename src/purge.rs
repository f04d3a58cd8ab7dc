use crate::geom::Pt;

/// Half-length of one wipe trail, in mm.
pub const PURGE_TRAIL_HALF_LENGTH: f64 = 10.0;

/// Adjacent trails per extruder.
pub const PURGE_PASSES: usize = 3;

/// Waypoints of one purge, as (high end, pass).
pub const PURGE_SEQUENCE: [(bool, usize); 5] = [(false, 0), (true, 0), (true, 1), (false, 1), (false, 2)];

/// Lays out purge trails next to a fixed dump point.
///
/// Trails run along whichever axis the dump point sits farther out on from
/// the bed centre. Each extruder owns `PURGE_PASSES` parallel trails one
/// nozzle width apart, so extruders never wipe over each other's trails.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PurgePlanner {
    pub dump: Pt,
    pub bed_center: Pt,
}

impl PurgePlanner {
    pub fn new(dump: Pt, bed_center: Pt) -> Self {
        Self { dump, bed_center }
    }

    pub fn x_oriented(&self) -> bool {
        (self.dump.x - self.bed_center.x).abs() > (self.dump.y - self.bed_center.y).abs()
    }

    /// One waypoint: `high` picks the trail end, `pass` the trail.
    pub fn waypoint(&self, extruder: usize, pass: usize, high: bool, nozzle_width: f64) -> Pt {
        let along = if high { PURGE_TRAIL_HALF_LENGTH } else { -PURGE_TRAIL_HALF_LENGTH };
        let ordinal = (extruder * PURGE_PASSES + pass) as f64;
        let across = 4.0 * nozzle_width - ordinal * nozzle_width;
        if self.x_oriented() {
            self.dump + Pt::new(across, along)
        } else {
            self.dump + Pt::new(along, across)
        }
    }

    /// The full zig-zag for one extruder switch.
    pub fn waypoints(&self, extruder: usize, nozzle_width: f64) -> Vec<Pt> {
        PURGE_SEQUENCE
            .iter()
            .map(|&(high, pass)| self.waypoint(extruder, pass, high, nozzle_width))
            .collect()
    }
}
