// src/physics.rs
// ==============================================================================
// physics.rs — RAPIER BRIDGE (POSE OUT, MOTION IN, SENSOR EDGES)
// ------------------------------------------------------------------------------
// rapier3d owns shapes, contacts and position integration. The drift solver
// owns velocity. Per tick:
//   pose(id)            -> Pose read before the drift solve
//   apply_motion(id, m) -> velocity written verbatim (overrides rapier's own)
//   step(dt)            -> rapier step + sensor / wall edge events
//
// Plane mapping (top-down):
//   2D (x, y)  <->  rapier (x, z), y is up and locked
//   heading h  <->  yaw about +Y of -h  (so forward = (cos h, sin h))
//   drift velocities are per reference tick (1/60 s); rapier wants per second
// ==============================================================================

use std::collections::{HashMap, HashSet};

use rapier3d::prelude::*;

use crate::drift::{Motion, Pose, REFERENCE_TICK_HZ};
use crate::track::{Rect, TrackLayout, WORLD_SIZE};

const GROUP_WALL: Group = Group::from_bits_truncate(0b0001);
const GROUP_CAR: Group = Group::from_bits_truncate(0b0010);
const GROUP_SENSOR: Group = Group::from_bits_truncate(0b0100);

pub const CAR_MASS: f32 = 1.0;
const CAR_HALF_LENGTH: f32 = 35.0;     // along forward
const CAR_HALF_WIDTH: f32 = 17.5;
const SLAB_HALF_HEIGHT: f32 = 5.0;     // y thickness, irrelevant top-down
const WALL_HALF_HEIGHT: f32 = 50.0;

/// Distance outside the world at which a body is considered lost.
const ESCAPE_MARGIN: f32 = 1_000.0;

#[derive(Debug, Clone, PartialEq)]
pub enum PhysicsEvent {
    SensorEntered { player_id: String, label: String },
    WallHit { player_id: String },
    OutOfBounds { player_id: String },
}

struct CarBody {
    body: RigidBodyHandle,
    collider: ColliderHandle,
    sensors_inside: HashSet<ColliderHandle>,
    touching_wall: bool,
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd: CCDSolver,
    walls: HashSet<ColliderHandle>,
    sensors: HashMap<ColliderHandle, String>,
    cars: HashMap<String, CarBody>, // playerId -> car
}

#[inline]
fn to_rapier(x: f32, y: f32, height: f32) -> Vector<Real> {
    vector![x, height, y]
}

#[inline]
fn yaw_rotation(heading: f32) -> Rotation<Real> {
    Rotation::from_scaled_axis(vector![0.0, -heading, 0.0])
}

fn slab(rect: &Rect, half_height: f32) -> ColliderBuilder {
    ColliderBuilder::cuboid(rect.w * 0.5, half_height, rect.h * 0.5)
        .translation(to_rapier(rect.x, rect.y, 0.0))
}

impl PhysicsWorld {
    pub fn new(track: &TrackLayout) -> Self {
        let mut colliders = ColliderSet::new();
        let mut walls = HashSet::new();
        let mut sensors = HashMap::new();

        for rect in &track.walls {
            let collider = slab(rect, WALL_HALF_HEIGHT)
                .collision_groups(InteractionGroups::new(GROUP_WALL, GROUP_CAR))
                .friction(0.5)
                .restitution(0.1)
                .build();
            walls.insert(colliders.insert(collider));
        }

        for sensor in &track.sensors {
            let collider = slab(&sensor.rect, WALL_HALF_HEIGHT)
                .sensor(true)
                .collision_groups(InteractionGroups::new(GROUP_SENSOR, GROUP_CAR))
                .build();
            sensors.insert(colliders.insert(collider), sensor.label.clone());
        }

        tracing::info!(
            walls = walls.len(),
            sensors = sensors.len(),
            "track colliders inserted"
        );

        Self {
            gravity: vector![0.0, 0.0, 0.0], // top-down
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders,
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            walls,
            sensors,
            cars: HashMap::new(),
        }
    }

    pub fn car_count(&self) -> usize {
        self.cars.len()
    }

    /// Dynamic car body: planar (y translation locked, yaw only), no built-in
    /// damping since drag is applied by the drift solver.
    pub fn spawn_car(&mut self, id: &str, pose: Pose) {
        let rb = RigidBodyBuilder::dynamic()
            .translation(to_rapier(pose.position.x, pose.position.y, 0.0))
            .rotation(vector![0.0, -pose.heading, 0.0])
            .locked_axes(
                LockedAxes::TRANSLATION_LOCKED_Y
                    | LockedAxes::ROTATION_LOCKED_X
                    | LockedAxes::ROTATION_LOCKED_Z,
            )
            .linear_damping(0.0)
            .angular_damping(0.0)
            .ccd_enabled(true)
            .build();

        let collider = ColliderBuilder::cuboid(CAR_HALF_LENGTH, SLAB_HALF_HEIGHT, CAR_HALF_WIDTH)
            .collision_groups(InteractionGroups::new(
                GROUP_CAR,
                GROUP_WALL | GROUP_CAR | GROUP_SENSOR,
            ))
            .mass(CAR_MASS)
            .friction(0.1)
            .restitution(0.0)
            .build();

        let body = self.bodies.insert(rb);
        let collider = self.colliders.insert_with_parent(collider, body, &mut self.bodies);

        self.cars.insert(
            id.to_string(),
            CarBody {
                body,
                collider,
                sensors_inside: HashSet::new(),
                touching_wall: false,
            },
        );

        tracing::debug!(player_id = %id, x = pose.position.x, y = pose.position.y, "car body spawned");
    }

    pub fn remove_car(&mut self, id: &str) {
        if let Some(car) = self.cars.remove(id) {
            self.bodies.remove(
                car.body,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.joints,
                &mut self.multibody_joints,
                true,
            );
        }
    }

    /// Position + heading as the solver currently has them.
    pub fn pose(&self, id: &str) -> Option<Pose> {
        let body = self.bodies.get(self.cars.get(id)?.body)?;
        let t = body.translation();
        let fwd = body.rotation().transform_vector(&vector![1.0, 0.0, 0.0]);
        Some(Pose::new(t.x, t.z, fwd.z.atan2(fwd.x)))
    }

    pub fn mass(&self, id: &str) -> Option<f32> {
        let body = self.bodies.get(self.cars.get(id)?.body)?;
        Some(body.mass())
    }

    /// Push drift-owned motion into the body, replacing whatever rapier had.
    pub fn apply_motion(&mut self, id: &str, motion: Motion) {
        let Some(car) = self.cars.get(id) else { return };
        let Some(body) = self.bodies.get_mut(car.body) else { return };

        let v = motion.velocity * REFERENCE_TICK_HZ;
        body.set_linvel(to_rapier(v.x, v.y, 0.0), true);
        body.set_angvel(vector![0.0, -motion.angular_velocity * REFERENCE_TICK_HZ, 0.0], true);
    }

    pub fn teleport(&mut self, id: &str, pose: Pose) {
        let Some(car) = self.cars.get(id) else { return };
        let Some(body) = self.bodies.get_mut(car.body) else { return };

        body.set_translation(to_rapier(pose.position.x, pose.position.y, 0.0), true);
        body.set_rotation(yaw_rotation(pose.heading), true);
        body.set_linvel(vector![0.0, 0.0, 0.0], true);
        body.set_angvel(vector![0.0, 0.0, 0.0], true);
    }

    pub fn step(&mut self, dt: Real) -> Vec<PhysicsEvent> {
        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters {
                dt,
                ..IntegrationParameters::default()
            },
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            None,
            &(),
            &(),
        );

        let mut events = Vec::new();
        self.collect_sensor_edges(&mut events);
        self.collect_wall_hits(&mut events);
        self.collect_escaped(&mut events);
        events
    }

    // --------------------------------------------------
    // Sensor overlap edges (enter only)
    // --------------------------------------------------
    fn collect_sensor_edges(&mut self, events: &mut Vec<PhysicsEvent>) {
        for (id, car) in self.cars.iter_mut() {
            let inside: HashSet<ColliderHandle> = self
                .narrow_phase
                .intersection_pairs_with(car.collider)
                .filter(|(_, _, intersecting)| *intersecting)
                .map(|(a, b, _)| if a == car.collider { b } else { a })
                .filter(|h| self.sensors.contains_key(h))
                .collect();

            for handle in inside.difference(&car.sensors_inside) {
                if let Some(label) = self.sensors.get(handle) {
                    events.push(PhysicsEvent::SensorEntered {
                        player_id: id.clone(),
                        label: label.clone(),
                    });
                }
            }
            car.sensors_inside = inside;
        }
    }

    // --------------------------------------------------
    // Wall contact start
    // --------------------------------------------------
    fn collect_wall_hits(&mut self, events: &mut Vec<PhysicsEvent>) {
        for (id, car) in self.cars.iter_mut() {
            let touching = self
                .narrow_phase
                .contact_pairs_with(car.collider)
                .filter(|pair| pair.has_any_active_contact)
                .any(|pair| {
                    let other = if pair.collider1 == car.collider { pair.collider2 } else { pair.collider1 };
                    self.walls.contains(&other)
                });

            if touching && !car.touching_wall {
                events.push(PhysicsEvent::WallHit { player_id: id.clone() });
            }
            car.touching_wall = touching;
        }
    }

    // --------------------------------------------------
    // Safety: bodies that left the world or went non-finite
    // --------------------------------------------------
    fn collect_escaped(&self, events: &mut Vec<PhysicsEvent>) {
        for (id, car) in self.cars.iter() {
            let Some(body) = self.bodies.get(car.body) else { continue };
            let pos = body.translation();

            let bad = !pos.x.is_finite()
                || !pos.z.is_finite()
                || pos.x < -ESCAPE_MARGIN
                || pos.z < -ESCAPE_MARGIN
                || pos.x > WORLD_SIZE + ESCAPE_MARGIN
                || pos.z > WORLD_SIZE + ESCAPE_MARGIN;

            if bad {
                events.push(PhysicsEvent::OutOfBounds { player_id: id.clone() });
            }
        }
    }
}
