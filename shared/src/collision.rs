//! Collision body interface used by the motion integrator, plus a kinematic
//! box-against-AABB implementation that the server simulates with.

use glam::Vec3;
use serde::{Deserialize, Serialize};

pub const DEFAULT_STEP_OFFSET: f32 = 0.3;
pub const DEFAULT_HALF_WIDTH: f32 = 0.5;
pub const DEFAULT_HEIGHT: f32 = 2.0;

/// Tolerance for contact and overlap tests.
const CONTACT_EPS: f32 = 1e-4;

/// The physical body a character controller drives.
///
/// `move_by` may clip the requested displacement against world geometry;
/// after it returns, `position` reflects the displacement actually applied.
pub trait CollisionBody {
    fn is_grounded(&self) -> bool;
    fn step_offset(&self) -> f32;
    fn position(&self) -> Vec3;
    fn move_by(&mut self, delta: Vec3);
}

/// Static axis-aligned box in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Box with its base centered on `base` and the given size.
    pub fn from_base(base: Vec3, size: Vec3) -> Self {
        let half = Vec3::new(size.x / 2.0, 0.0, size.z / 2.0);
        Self::new(base - half, base + half + Vec3::Y * size.y)
    }
}

/// Upright box standing on a ground plane among static obstacles.
///
/// `position` is the center of the box's bottom face (the feet).
#[derive(Debug, Clone)]
pub struct KinematicBody {
    position: Vec3,
    half_width: f32,
    height: f32,
    step_offset: f32,
    ground_y: f32,
    obstacles: Vec<Aabb>,
    grounded: bool,
}

impl KinematicBody {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            half_width: DEFAULT_HALF_WIDTH,
            height: DEFAULT_HEIGHT,
            step_offset: DEFAULT_STEP_OFFSET,
            ground_y: 0.0,
            obstacles: Vec::new(),
            grounded: position.y <= 0.0,
        }
    }

    pub fn with_step_offset(mut self, step_offset: f32) -> Self {
        self.step_offset = step_offset.max(0.0);
        self
    }

    pub fn with_obstacles(mut self, obstacles: Vec<Aabb>) -> Self {
        self.obstacles = obstacles;
        self
    }

    pub fn add_obstacle(&mut self, obstacle: Aabb) {
        self.obstacles.push(obstacle);
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.grounded = position.y <= self.ground_y;
    }

    pub fn bounds_at(&self, feet: Vec3) -> Aabb {
        Aabb {
            min: Vec3::new(feet.x - self.half_width, feet.y, feet.z - self.half_width),
            max: Vec3::new(
                feet.x + self.half_width,
                feet.y + self.height,
                feet.z + self.half_width,
            ),
        }
    }

    fn overlaps_xz(a: &Aabb, b: &Aabb) -> bool {
        a.max.x - CONTACT_EPS > b.min.x
            && a.min.x + CONTACT_EPS < b.max.x
            && a.max.z - CONTACT_EPS > b.min.z
            && a.min.z + CONTACT_EPS < b.max.z
    }

    fn overlaps(a: &Aabb, b: &Aabb) -> bool {
        Self::overlaps_xz(a, b) && a.max.y - CONTACT_EPS > b.min.y && a.min.y + CONTACT_EPS < b.max.y
    }

    fn blocked_at(&self, feet: Vec3) -> bool {
        let bounds = self.bounds_at(feet);
        self.obstacles.iter().any(|o| Self::overlaps(&bounds, o))
    }

    /// Moves along one horizontal axis (0 = x, 2 = z), clipping against
    /// obstacles or climbing those low enough to step onto.
    fn move_horizontal(&mut self, axis: usize, distance: f32) {
        if distance == 0.0 {
            return;
        }

        let start = self.bounds_at(self.position);
        let mut target = self.position;
        target[axis] += distance;
        let end = self.bounds_at(target);
        let swept = Aabb {
            min: start.min.min(end.min),
            max: start.max.max(end.max),
        };

        for obstacle in &self.obstacles {
            // Already interpenetrating: let the body move out freely.
            if !Self::overlaps(&swept, obstacle) || Self::overlaps(&start, obstacle) {
                continue;
            }

            let rise = obstacle.max.y - self.position.y;
            let mut stepped = target;
            stepped.y = stepped.y.max(obstacle.max.y);
            if rise > 0.0 && rise <= self.step_offset + CONTACT_EPS && !self.blocked_at(stepped) {
                target = stepped;
                continue;
            }

            target[axis] = if distance > 0.0 {
                target[axis].min(obstacle.min[axis] - self.half_width)
            } else {
                target[axis].max(obstacle.max[axis] + self.half_width)
            };
        }

        self.position = target;
    }

    fn move_vertical(&mut self, distance: f32) {
        if distance == 0.0 {
            return;
        }

        let bounds = self.bounds_at(self.position);
        let mut target_y = self.position.y + distance;

        if distance < 0.0 {
            let mut floor = self.ground_y;
            for obstacle in &self.obstacles {
                if Self::overlaps_xz(&bounds, obstacle)
                    && obstacle.max.y <= self.position.y + CONTACT_EPS
                {
                    floor = floor.max(obstacle.max.y);
                }
            }
            if target_y <= floor {
                target_y = floor;
                self.grounded = true;
            }
        } else {
            let head = self.position.y + self.height;
            for obstacle in &self.obstacles {
                if Self::overlaps_xz(&bounds, obstacle) && obstacle.min.y >= head - CONTACT_EPS {
                    target_y = target_y.min(obstacle.min.y - self.height);
                }
            }
        }

        self.position.y = target_y;
    }
}

impl CollisionBody for KinematicBody {
    fn is_grounded(&self) -> bool {
        self.grounded
    }

    fn step_offset(&self) -> f32 {
        self.step_offset
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn move_by(&mut self, delta: Vec3) {
        self.grounded = false;
        self.move_horizontal(0, delta.x);
        self.move_horizontal(2, delta.z);
        self.move_vertical(delta.y);
    }
}
