//! Classifies anchor batches and routes each event to its anchor node.

use anchor_sync_spatial::{decompose, Vector3D};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::attachment::AttachmentStateMachine;
use crate::composition::SceneRoot;
use crate::config::PlanePolicy;
use crate::error::{Result, SessionError};
use crate::event::{AnchorEvent, AnchorId, AnchorKind, PlaneGeometry};
use crate::scene::SceneGraph;

/// Running counters across every batch a dispatcher has seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub added: u64,
    pub body_updates: u64,
    pub plane_updates: u64,
    pub ignored: u64,
    pub dropped: u64,
}

/// Per-batch result. Errors are collected, never propagated.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub applied: usize,
    pub ignored: usize,
    pub errors: Vec<SessionError>,
}

/// Routes anchor events by kind. Events are handled in delivery order and
/// later writes to the same node overwrite earlier ones.
#[derive(Debug)]
pub struct AnchorDispatcher {
    reference_plane: Option<AnchorId>,
    plane_policy: PlanePolicy,
    character_offset: Vector3D,
    stats: DispatchStats,
}

impl AnchorDispatcher {
    pub fn new(plane_policy: PlanePolicy, character_offset: Vector3D) -> Self {
        Self {
            reference_plane: None,
            plane_policy,
            character_offset,
            stats: DispatchStats::default(),
        }
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Plane currently driving the reality anchor under `FirstPlaneWins`
    pub fn reference_plane(&self) -> Option<AnchorId> {
        self.reference_plane
    }

    /// First observation of anchors. Diagnostics only: no node moves.
    pub fn anchors_added(&mut self, batch: &[AnchorEvent]) -> BatchReport {
        let mut report = BatchReport::default();

        for event in batch {
            if let Err(err) = validate(event) {
                warn!("Dropping added anchor: {}", err);
                self.stats.dropped += 1;
                report.errors.push(err);
                continue;
            }

            self.stats.added += 1;
            let t = event.transform.translation();
            info!(
                kind = event.kind.label(),
                id = %event.id,
                "Anchor added at X: {:.3}, Y: {:.3}, Z: {:.3}",
                t.x,
                t.y,
                t.z
            );

            if let AnchorKind::Plane(geometry) = &event.kind {
                self.claim_plane(event.id);
                log_plane_geometry(event.id, geometry);
            }
            report.applied += 1;
        }

        report
    }

    /// Subsequent observations: write poses and drive attachment.
    pub fn anchors_updated(
        &mut self,
        batch: &[AnchorEvent],
        root: &mut SceneRoot,
        links: &mut AttachmentStateMachine,
        scene: &mut dyn SceneGraph,
    ) -> BatchReport {
        let mut report = BatchReport::default();

        for event in batch {
            if let Err(err) = validate(event) {
                warn!("Dropping updated anchor: {}", err);
                self.stats.dropped += 1;
                report.errors.push(err);
                continue;
            }

            match &event.kind {
                AnchorKind::Body => {
                    let (position, orientation) = decompose(&event.transform);
                    root.character_mut()
                        .set_pose(position + self.character_offset, orientation);
                    self.stats.body_updates += 1;
                    links.body_observed(scene);
                    report.applied += 1;
                }
                AnchorKind::Plane(_) => {
                    if !self.claim_plane(event.id) {
                        trace!(id = %event.id, "Ignoring update for non-reference plane");
                        self.stats.ignored += 1;
                        report.ignored += 1;
                        continue;
                    }
                    let (position, _) = decompose(&event.transform);
                    root.reality_mut().set_position(position);
                    self.stats.plane_updates += 1;
                    report.applied += 1;
                }
                AnchorKind::Other { type_name } => {
                    trace!(id = %event.id, "Ignoring {} anchor", type_name);
                    self.stats.ignored += 1;
                    report.ignored += 1;
                }
            }
        }

        report
    }

    /// Whether this plane may drive the reality anchor; the first plane
    /// offered becomes the reference under `FirstPlaneWins`.
    fn claim_plane(&mut self, id: AnchorId) -> bool {
        match self.plane_policy {
            PlanePolicy::LastWriterWins => true,
            PlanePolicy::FirstPlaneWins => match self.reference_plane {
                Some(reference) => reference == id,
                None => {
                    info!(id = %id, "Plane selected as reality reference");
                    self.reference_plane = Some(id);
                    true
                }
            },
        }
    }
}

fn validate(event: &AnchorEvent) -> Result<()> {
    event
        .transform
        .validate()
        .map_err(|e| SessionError::MalformedAnchorEvent {
            id: event.id,
            reason: e.to_string(),
        })
}

/// Plane visualization stays inert; only the geometry it would use is logged.
fn log_plane_geometry(id: AnchorId, geometry: &PlaneGeometry) {
    let (width, height) = geometry.extent;
    debug!(
        id = %id,
        alignment = ?geometry.alignment,
        "Plane geometry {:.2} x {:.2} centered at ({:.2}, {:.2}, {:.2})",
        width,
        height,
        geometry.center.x,
        geometry.center.y,
        geometry.center.z
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnchorNames;
    use crate::scene::InMemoryScene;
    use crate::test_utils::{body_event, plane_event, StaticSceneDescription};
    use anchor_sync_spatial::{PoseMatrix, Quaternion};

    struct Fixture {
        scene: InMemoryScene,
        root: SceneRoot,
        links: AttachmentStateMachine,
        dispatcher: AnchorDispatcher,
    }

    impl Fixture {
        fn new(policy: PlanePolicy) -> Self {
            let mut scene = InMemoryScene::new();
            let root = SceneRoot::compose(
                &AnchorNames::default(),
                &StaticSceneDescription::boxed_prop(),
                &mut scene,
            )
            .unwrap();
            let links = AttachmentStateMachine::new(
                root.character().entity(),
                root.reality().entity(),
                root.prop().entity,
            );
            Self {
                scene,
                root,
                links,
                dispatcher: AnchorDispatcher::new(policy, Vector3D::ZERO),
            }
        }

        fn update(&mut self, batch: &[AnchorEvent]) -> BatchReport {
            self.dispatcher
                .anchors_updated(batch, &mut self.root, &mut self.links, &mut self.scene)
        }
    }

    #[test]
    fn test_empty_batches_change_nothing() {
        let mut fx = Fixture::new(PlanePolicy::FirstPlaneWins);
        let added = fx.dispatcher.anchors_added(&[]);
        let updated = fx.update(&[]);

        assert_eq!(added.applied + updated.applied, 0);
        assert!(!fx.root.character().has_pose());
        assert!(!fx.root.reality().has_pose());
        assert_eq!(fx.dispatcher.stats(), DispatchStats::default());
    }

    #[test]
    fn test_last_body_event_in_batch_wins() {
        let mut fx = Fixture::new(PlanePolicy::FirstPlaneWins);
        let id = AnchorId::new();
        let first_rotation = Quaternion::from_axis_angle(Vector3D::UP, 0.2);
        let second_rotation = Quaternion::from_axis_angle(Vector3D::UP, 1.1);
        let batch = [
            body_event(id, Vector3D::new(1.0, 0.0, -1.0), first_rotation),
            body_event(id, Vector3D::new(3.0, 0.0, -2.0), second_rotation),
        ];

        let report = fx.update(&batch);

        assert_eq!(report.applied, 2);
        let node = fx.root.character();
        assert_eq!(node.position(), Vector3D::new(3.0, 0.0, -2.0));
        assert!(node.orientation().angle_to(&second_rotation) < 1e-4);
        assert_eq!(fx.dispatcher.stats().body_updates, 2);
    }

    #[test]
    fn test_plane_added_is_inert_and_update_moves_position_only() {
        let mut fx = Fixture::new(PlanePolicy::FirstPlaneWins);
        let id = AnchorId::new();
        let tilted = Quaternion::from_axis_angle(Vector3D::UP, 0.9);

        fx.dispatcher
            .anchors_added(&[plane_event(id, Vector3D::new(5.0, 0.0, 5.0), tilted)]);
        assert!(!fx.root.reality().has_pose());
        assert_eq!(fx.root.reality().position(), Vector3D::ZERO);

        fx.update(&[plane_event(id, Vector3D::new(1.0, 0.0, 2.0), tilted)]);
        assert_eq!(fx.root.reality().position(), Vector3D::new(1.0, 0.0, 2.0));
        assert_eq!(fx.root.reality().orientation(), Quaternion::IDENTITY);
    }

    #[test]
    fn test_first_plane_wins() {
        let mut fx = Fixture::new(PlanePolicy::FirstPlaneWins);
        let (floor, table) = (AnchorId::new(), AnchorId::new());

        fx.dispatcher.anchors_added(&[
            plane_event(floor, Vector3D::ZERO, Quaternion::IDENTITY),
            plane_event(table, Vector3D::ZERO, Quaternion::IDENTITY),
        ]);
        let report = fx.update(&[
            plane_event(floor, Vector3D::new(0.0, -1.0, 0.0), Quaternion::IDENTITY),
            plane_event(table, Vector3D::new(0.5, -0.2, 1.0), Quaternion::IDENTITY),
        ]);

        assert_eq!(fx.dispatcher.reference_plane(), Some(floor));
        assert_eq!(report.ignored, 1);
        assert_eq!(fx.root.reality().position(), Vector3D::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn test_last_writer_wins_policy() {
        let mut fx = Fixture::new(PlanePolicy::LastWriterWins);
        let (floor, table) = (AnchorId::new(), AnchorId::new());

        fx.update(&[
            plane_event(floor, Vector3D::new(0.0, -1.0, 0.0), Quaternion::IDENTITY),
            plane_event(table, Vector3D::new(0.5, -0.2, 1.0), Quaternion::IDENTITY),
        ]);

        assert_eq!(fx.root.reality().position(), Vector3D::new(0.5, -0.2, 1.0));
        assert_eq!(fx.dispatcher.stats().plane_updates, 2);
    }

    #[test]
    fn test_malformed_event_does_not_abort_batch() {
        let mut fx = Fixture::new(PlanePolicy::FirstPlaneWins);
        let id = AnchorId::new();
        let mut broken = PoseMatrix::IDENTITY;
        broken.columns[3][0] = f32::INFINITY;

        let report = fx.update(&[
            AnchorEvent::body(id, broken),
            body_event(id, Vector3D::new(0.0, 1.0, 0.0), Quaternion::IDENTITY),
        ]);

        assert_eq!(report.errors.len(), 1);
        assert!(matches!(
            report.errors[0],
            SessionError::MalformedAnchorEvent { .. }
        ));
        assert_eq!(report.applied, 1);
        assert_eq!(fx.root.character().position(), Vector3D::new(0.0, 1.0, 0.0));
        assert_eq!(fx.dispatcher.stats().dropped, 1);
    }

    #[test]
    fn test_other_kinds_are_ignored() {
        let mut fx = Fixture::new(PlanePolicy::FirstPlaneWins);
        let report = fx.update(&[AnchorEvent::other(
            AnchorId::new(),
            "image",
            PoseMatrix::from_translation(Vector3D::new(9.0, 9.0, 9.0)),
        )]);

        assert_eq!(report.ignored, 1);
        assert!(!fx.root.character().has_pose());
        assert!(!fx.root.reality().has_pose());
    }

    #[test]
    fn test_update_for_unannounced_anchor_is_applied() {
        let mut fx = Fixture::new(PlanePolicy::FirstPlaneWins);
        let report = fx.update(&[body_event(
            AnchorId::new(),
            Vector3D::new(0.0, 0.0, -3.0),
            Quaternion::IDENTITY,
        )]);

        assert_eq!(report.applied, 1);
        assert_eq!(fx.root.character().position(), Vector3D::new(0.0, 0.0, -3.0));
        assert_eq!(fx.dispatcher.stats().added, 0);
    }

    #[test]
    fn test_character_offset_is_applied() {
        let mut fx = Fixture::new(PlanePolicy::FirstPlaneWins);
        fx.dispatcher = AnchorDispatcher::new(PlanePolicy::FirstPlaneWins, Vector3D::new(0.0, 0.5, 0.0));
        fx.update(&[body_event(AnchorId::new(), Vector3D::new(1.0, 0.0, 0.0), Quaternion::IDENTITY)]);

        assert_eq!(fx.root.character().position(), Vector3D::new(1.0, 0.5, 0.0));
    }
}
