//! Scripted physics scene for unit tests.

use bevy::prelude::*;

use crate::backend::PhysicsQuery;
use crate::collision::{CollisionData, LayerMask, ProximityContact};

#[derive(Debug, Clone, Copy)]
struct SceneBox {
    entity: Entity,
    min: Vec3,
    max: Vec3,
    layers: LayerMask,
    grabbable: bool,
}

impl SceneBox {
    fn clamp(&self, point: Vec3) -> Vec3 {
        point.clamp(self.min, self.max)
    }

    fn raycast(&self, origin: Vec3, direction: Vec3) -> Option<(f32, Vec3)> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;
        let mut normal = -direction;

        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            if d.abs() < 1e-8 {
                if o < self.min[axis] || o > self.max[axis] {
                    return None;
                }
                continue;
            }
            let t1 = (self.min[axis] - o) / d;
            let t2 = (self.max[axis] - o) / d;
            let (near, far) = if t1 < t2 { (t1, t2) } else { (t2, t1) };
            if near > t_min {
                t_min = near;
                normal = Vec3::ZERO;
                normal[axis] = -d.signum();
            }
            t_max = t_max.min(far);
            if t_min > t_max {
                return None;
            }
        }

        if t_max < 0.0 {
            return None;
        }
        if t_min < 0.0 {
            // Origin inside the box.
            return Some((0.0, -direction));
        }
        Some((t_min, normal))
    }
}

/// A world made of axis-aligned boxes.
#[derive(Debug, Default)]
pub(crate) struct TestScene {
    boxes: Vec<SceneBox>,
}

impl TestScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_box(
        &mut self,
        center: Vec3,
        half_extents: Vec3,
        layers: LayerMask,
        grabbable: bool,
    ) -> Entity {
        let entity = Entity::from_raw(self.boxes.len() as u32 + 1);
        self.boxes.push(SceneBox {
            entity,
            min: center - half_extents,
            max: center + half_extents,
            layers,
            grabbable,
        });
        entity
    }

    /// Large slab whose top surface is at `y`.
    pub fn add_floor(&mut self, y: f32) -> Entity {
        self.add_box(
            Vec3::new(0.0, y - 0.5, 0.0),
            Vec3::new(100.0, 0.5, 100.0),
            LayerMask::ALL,
            false,
        )
    }

    /// Large wall whose front face is the plane `z = z`, facing +Z.
    pub fn add_wall(&mut self, z: f32, grabbable: bool) -> Entity {
        self.add_box(
            Vec3::new(0.0, 0.0, z - 0.5),
            Vec3::new(100.0, 100.0, 0.5),
            LayerMask::ALL,
            grabbable,
        )
    }
}

impl PhysicsQuery for TestScene {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layers: LayerMask,
    ) -> Option<CollisionData> {
        self.boxes
            .iter()
            .filter(|b| b.layers.intersects(layers))
            .filter_map(|b| {
                let (distance, normal) = b.raycast(origin, direction)?;
                (distance <= max_distance).then(|| {
                    CollisionData::new(
                        distance,
                        normal,
                        origin + direction * distance,
                        Some(b.entity),
                    )
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn overlap_capsule(
        &self,
        a: Vec3,
        b: Vec3,
        radius: f32,
        layers: LayerMask,
    ) -> Vec<ProximityContact> {
        let center = (a + b) * 0.5;
        let segment = b - a;
        let closest_on_segment = |p: Vec3| {
            let len_sq = segment.length_squared();
            if len_sq <= f32::EPSILON {
                return a;
            }
            a + segment * ((p - a).dot(segment) / len_sq).clamp(0.0, 1.0)
        };

        self.boxes
            .iter()
            .filter(|bx| bx.layers.intersects(layers))
            .filter(|bx| {
                let mut on_box = bx.clamp(center);
                let mut on_segment = closest_on_segment(on_box);
                for _ in 0..4 {
                    on_box = bx.clamp(on_segment);
                    on_segment = closest_on_segment(on_box);
                }
                on_box.distance(on_segment) <= radius
            })
            .map(|bx| ProximityContact::new(bx.entity, bx.clamp(center)))
            .collect()
    }

    fn is_grabbable(&self, entity: Entity) -> bool {
        self.boxes
            .iter()
            .any(|b| b.entity == entity && b.grabbable)
    }
}

#[test]
fn scene_raycast_reports_face_normal() {
    let mut scene = TestScene::new();
    let floor = scene.add_floor(0.0);

    let hit = scene
        .raycast(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Y, 2.0, LayerMask::ALL)
        .unwrap();
    assert_eq!(hit.entity, Some(floor));
    assert!((hit.distance - 1.0).abs() < 1e-5);
    assert_eq!(hit.normal, Vec3::Y);

    assert!(scene
        .raycast(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Y, 0.5, LayerMask::ALL)
        .is_none());
}

#[test]
fn scene_capsule_overlap() {
    let mut scene = TestScene::new();
    let wall = scene.add_wall(-1.0, true);

    let near = scene.overlap_capsule(
        Vec3::new(0.0, 0.5, -0.8),
        Vec3::new(0.0, -0.5, -0.8),
        0.3,
        LayerMask::ALL,
    );
    assert_eq!(near.len(), 1);
    assert_eq!(near[0].entity, wall);

    let far = scene.overlap_capsule(
        Vec3::new(0.0, 0.5, 0.0),
        Vec3::new(0.0, -0.5, 0.0),
        0.3,
        LayerMask::ALL,
    );
    assert!(far.is_empty());
}
