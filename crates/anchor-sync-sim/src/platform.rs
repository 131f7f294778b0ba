//! Desktop stand-ins for the device: tracking host, asset store and the
//! authored scene.

use anchor_sync_core::{
    AssetError, AssetSource, AuthoredProp, EntityId, LoadedEntity, SceneDescription,
    SessionHost, Skeleton, TrackingConfiguration,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

const ROBOT_JOINTS: &[&str] = &[
    "root",
    "hips_joint",
    "spine_1_joint",
    "spine_4_joint",
    "neck_1_joint",
    "head_joint",
    "left_shoulder_1_joint",
    "left_arm_joint",
    "left_hand_joint",
    "right_shoulder_1_joint",
    "right_arm_joint",
    "right_hand_joint",
    "left_upLeg_joint",
    "left_leg_joint",
    "left_foot_joint",
    "right_upLeg_joint",
    "right_leg_joint",
    "right_foot_joint",
];

/// Host that only logs. Body tracking support is configurable.
#[derive(Debug)]
pub struct SimulatedHost {
    body_tracking: bool,
    running: bool,
}

impl SimulatedHost {
    pub fn new(body_tracking: bool) -> Self {
        Self {
            body_tracking,
            running: false,
        }
    }
}

impl SessionHost for SimulatedHost {
    fn supports_body_tracking(&self) -> bool {
        self.body_tracking
    }

    fn run(&mut self, configuration: &TrackingConfiguration) {
        self.running = true;
        info!("host: tracking started with {:?}", configuration);
    }

    fn pause(&mut self) {
        if self.running {
            info!("host: tracking paused");
        }
        self.running = false;
    }

    fn set_idle_timer_disabled(&mut self, disabled: bool) {
        info!("host: idle timer {}", if disabled { "disabled" } else { "restored" });
    }
}

/// Asset store with a fixed latency. Only the robot asset is present.
#[derive(Debug, Clone)]
pub struct SimulatedAssetSource {
    delay: Duration,
    missing: bool,
}

impl SimulatedAssetSource {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            missing: false,
        }
    }

    /// Every load fails with `NotFound`
    pub fn missing(delay: Duration) -> Self {
        Self {
            delay,
            missing: true,
        }
    }
}

#[async_trait]
impl AssetSource for SimulatedAssetSource {
    async fn load_entity(&self, name: &str) -> Result<LoadedEntity, AssetError> {
        tokio::time::sleep(self.delay).await;

        if self.missing {
            warn!("asset store: '{}' not present", name);
            return Err(AssetError::NotFound(name.to_string()));
        }

        Ok(LoadedEntity {
            entity: EntityId::allocate(),
            name: name.to_string(),
            skeleton: Some(Skeleton {
                joint_names: ROBOT_JOINTS.iter().map(|j| j.to_string()).collect(),
            }),
        })
    }
}

/// The authored scene: one toy box under its own anchor.
#[derive(Debug, Clone)]
pub struct AuthoredScene {
    prop: AuthoredProp,
}

impl AuthoredScene {
    pub fn toy_box() -> Self {
        Self {
            prop: AuthoredProp {
                entity: EntityId::allocate(),
                name: "toy box".to_string(),
                default_anchor: Some(EntityId::allocate()),
            },
        }
    }
}

impl SceneDescription for AuthoredScene {
    fn load_prop(&self) -> anchor_sync_core::Result<AuthoredProp> {
        Ok(self.prop.clone())
    }
}
