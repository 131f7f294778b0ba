//! Generated tracking feed: a person walking a circle around a floor plane,
//! a table top that shows up later, and a poster image anchor the session
//! should ignore. Poses carry a little seeded jitter.

use anchor_sync_core::{AnchorEvent, AnchorId, PlaneGeometry, TrackingCallback};
use anchor_sync_spatial::{PoseMatrix, Quaternion, Vector3D};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;
use std::time::Duration;

use crate::script::TimedFrame;

#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub frames: usize,
    pub interval: Duration,
    /// Radius of the walked circle, in meters
    pub radius: f32,
    /// Frames per full lap
    pub lap_frames: usize,
    /// Frame at which the table plane is first reported
    pub table_at: usize,
    pub jitter: f32,
    pub seed: u64,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            frames: 120,
            interval: Duration::from_millis(16),
            radius: 1.5,
            lap_frames: 90,
            table_at: 30,
            jitter: 0.005,
            seed: 7,
        }
    }
}

struct Walk {
    body: AnchorId,
    floor: AnchorId,
    table: AnchorId,
    poster: AnchorId,
    rng: StdRng,
    options: WalkOptions,
}

impl Walk {
    fn noise(&mut self) -> Vector3D {
        if self.options.jitter <= 0.0 {
            return Vector3D::ZERO;
        }
        let j = self.options.jitter;
        Vector3D::new(
            self.rng.gen_range(-j..=j),
            self.rng.gen_range(-j..=j),
            self.rng.gen_range(-j..=j),
        )
    }

    fn body(&mut self, frame: usize) -> AnchorEvent {
        let theta = TAU * frame as f32 / self.options.lap_frames.max(1) as f32;
        let r = self.options.radius;
        let position = Vector3D::new(r * theta.cos(), 0.0, -2.0 + r * theta.sin()) + self.noise();
        // Facing along the direction of travel
        let heading = Quaternion::from_axis_angle(Vector3D::UP, -theta);
        AnchorEvent::body(self.body, PoseMatrix::from_rotation_translation(heading, position))
    }

    fn floor(&mut self) -> AnchorEvent {
        let position = Vector3D::new(0.0, -1.2, -2.0) + self.noise();
        AnchorEvent::plane(
            self.floor,
            PlaneGeometry::horizontal(4.0, 4.0),
            PoseMatrix::from_translation(position),
        )
    }

    fn table(&mut self) -> AnchorEvent {
        let position = Vector3D::new(0.8, -0.45, -1.0) + self.noise();
        AnchorEvent::plane(
            self.table,
            PlaneGeometry::horizontal(1.2, 0.6),
            PoseMatrix::from_translation(position),
        )
    }

    fn poster(&self) -> AnchorEvent {
        AnchorEvent::other(
            self.poster,
            "image",
            PoseMatrix::from_translation(Vector3D::new(0.0, 0.3, -3.5)),
        )
    }
}

/// Build the walk: one `AnchorsAdded` for the initial anchors, then one
/// `AnchorsUpdated` per frame.
pub fn walking_feed(options: WalkOptions) -> Vec<TimedFrame> {
    let mut walk = Walk {
        body: AnchorId::new(),
        floor: AnchorId::new(),
        table: AnchorId::new(),
        poster: AnchorId::new(),
        rng: StdRng::seed_from_u64(options.seed),
        options,
    };
    let interval = walk.options.interval;
    let mut frames = Vec::with_capacity(walk.options.frames + 2);

    let initial = vec![walk.body(0), walk.floor(), walk.poster()];
    frames.push(TimedFrame {
        at: Duration::ZERO,
        callback: TrackingCallback::AnchorsAdded(initial),
    });

    for frame in 1..=walk.options.frames {
        let at = interval * frame as u32;
        if frame == walk.options.table_at {
            let table = walk.table();
            frames.push(TimedFrame {
                at,
                callback: TrackingCallback::AnchorsAdded(vec![table]),
            });
        }

        let mut batch = vec![walk.body(frame)];
        if frame % 10 == 0 {
            batch.push(walk.floor());
            batch.push(walk.poster());
        }
        if frame > walk.options.table_at && frame % 15 == 0 {
            batch.push(walk.table());
        }
        frames.push(TimedFrame {
            at,
            callback: TrackingCallback::AnchorsUpdated(batch),
        });
    }

    frames
}
