// ==============================================================================
// track.rs — TRACK LAYOUT (WALLS, SENSORS, SPAWN)
// ------------------------------------------------------------------------------
// Pure layout data in 2D world units (top-down, x right, y down-track).
// physics.rs turns these rectangles into fixed rapier colliders; sensors become
// sensor colliders whose overlaps drive lap timing (lap.rs).
//
// Layout: rectangular ring, outer 3000 x 2000, inner island 2000 x 1000,
// centred in a 4000 x 4000 world. Finish on the bottom straight (right of
// centre), cp1 bottom-left, cp2 on the top straight.
// ==============================================================================

use crate::drift::Pose;

pub const WORLD_SIZE: f32 = 4000.0;

const CENTER_X: f32 = 2000.0;
const CENTER_Y: f32 = 2000.0;
const OUTER_W: f32 = 3000.0;
const OUTER_H: f32 = 2000.0;
const INNER_W: f32 = 2000.0;
const INNER_H: f32 = 1000.0;
const WALL_THICKNESS: f32 = 100.0;
const SENSOR_DEPTH: f32 = 20.0;

pub const FINISH_LABEL: &str = "finish";

/// Axis-aligned rectangle, centre + full size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        (px - self.x).abs() <= self.w * 0.5 && (py - self.y).abs() <= self.h * 0.5
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    pub label: String,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackLayout {
    pub walls: Vec<Rect>,
    pub sensors: Vec<Sensor>,
    pub spawn: Pose,
}

impl TrackLayout {
    /// Number of checkpoints (every sensor except the finish line).
    pub fn checkpoint_count(&self) -> usize {
        self.sensors.iter().filter(|s| s.label != FINISH_LABEL).count()
    }

    /// The default ring track.
    pub fn ring() -> Self {
        let t = WALL_THICKNESS;
        let mut walls = Vec::with_capacity(12);

        // outer
        walls.push(Rect::new(CENTER_X, CENTER_Y - OUTER_H / 2.0, OUTER_W + t, t));
        walls.push(Rect::new(CENTER_X, CENTER_Y + OUTER_H / 2.0, OUTER_W + t, t));
        walls.push(Rect::new(CENTER_X - OUTER_W / 2.0, CENTER_Y, t, OUTER_H + t));
        walls.push(Rect::new(CENTER_X + OUTER_W / 2.0, CENTER_Y, t, OUTER_H + t));

        // inner island
        walls.push(Rect::new(CENTER_X, CENTER_Y - INNER_H / 2.0, INNER_W + t, t));
        walls.push(Rect::new(CENTER_X, CENTER_Y + INNER_H / 2.0, INNER_W + t, t));
        walls.push(Rect::new(CENTER_X - INNER_W / 2.0, CENTER_Y, t, INNER_H + t));
        walls.push(Rect::new(CENTER_X + INNER_W / 2.0, CENTER_Y, t, INNER_H + t));

        // world bounds
        let s = WORLD_SIZE;
        walls.push(Rect::new(s / 2.0, -t / 2.0, s + 2.0 * t, t));
        walls.push(Rect::new(s / 2.0, s + t / 2.0, s + 2.0 * t, t));
        walls.push(Rect::new(-t / 2.0, s / 2.0, t, s));
        walls.push(Rect::new(s + t / 2.0, s / 2.0, t, s));

        // straights are (OUTER_H - INNER_H) / 2 wide, centred between the walls
        let lane = (OUTER_H - INNER_H) / 2.0;
        let lane_mid = (OUTER_H + INNER_H) / 4.0;
        let sensors = vec![
            Sensor {
                label: FINISH_LABEL.to_string(),
                rect: Rect::new(CENTER_X + 500.0, CENTER_Y + lane_mid, SENSOR_DEPTH, lane),
            },
            Sensor {
                label: "cp1".to_string(),
                rect: Rect::new(CENTER_X - 500.0, CENTER_Y + lane_mid, SENSOR_DEPTH, lane),
            },
            Sensor {
                label: "cp2".to_string(),
                rect: Rect::new(CENTER_X, CENTER_Y - lane_mid, SENSOR_DEPTH, lane),
            },
        ];

        Self {
            walls,
            sensors,
            spawn: Pose::new(2500.0, 2750.0, 0.0),
        }
    }
}
