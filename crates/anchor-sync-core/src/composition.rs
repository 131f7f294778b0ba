//! Scene composition root: owns the two anchor nodes for a session.

use tracing::{debug, info};

use crate::config::AnchorNames;
use crate::error::Result;
use crate::scene::{AnchorNode, AnchorRole, EntityId, SceneGraph};

/// A statically authored prop and the anchor it was authored under.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthoredProp {
    pub entity: EntityId,
    pub name: String,
    /// Anchor the prop sat under in the authored scene. Informational only:
    /// the prop is always re-parented under the reality anchor.
    pub default_anchor: Option<EntityId>,
}

/// Source of pre-authored scene content, available synchronously.
pub trait SceneDescription {
    fn load_prop(&self) -> Result<AuthoredProp>;
}

/// Owns the character and reality anchor nodes for the lifetime of a session.
#[derive(Debug)]
pub struct SceneRoot {
    character: AnchorNode,
    reality: AnchorNode,
    prop: AuthoredProp,
}

impl SceneRoot {
    /// Build both anchors, load the authored prop, and register the anchors
    /// with the live scene. Nothing is registered if the prop cannot load.
    pub fn compose(
        names: &AnchorNames,
        description: &dyn SceneDescription,
        scene: &mut dyn SceneGraph,
    ) -> Result<Self> {
        let prop = description.load_prop()?;
        debug!(
            "Loaded authored prop '{}' ({}), authored under {:?}",
            prop.name, prop.entity, prop.default_anchor
        );

        let character = AnchorNode::new(AnchorRole::Character, names.character_name.clone());
        let reality = AnchorNode::new(AnchorRole::Reality, names.reality_name.clone());

        scene.add_anchor(reality.entity(), reality.name());
        scene.add_anchor(character.entity(), character.name());
        info!(
            "Registered anchors '{}' ({}) and '{}' ({})",
            reality.name(),
            reality.entity(),
            character.name(),
            character.entity()
        );

        Ok(Self {
            character,
            reality,
            prop,
        })
    }

    pub fn character(&self) -> &AnchorNode {
        &self.character
    }

    pub fn character_mut(&mut self) -> &mut AnchorNode {
        &mut self.character
    }

    pub fn reality(&self) -> &AnchorNode {
        &self.reality
    }

    pub fn reality_mut(&mut self) -> &mut AnchorNode {
        &mut self.reality
    }

    pub fn node(&self, role: AnchorRole) -> &AnchorNode {
        match role {
            AnchorRole::Character => &self.character,
            AnchorRole::Reality => &self.reality,
        }
    }

    pub fn prop(&self) -> &AuthoredProp {
        &self.prop
    }

    /// Unregister both anchors from the live scene
    pub fn dismantle(self, scene: &mut dyn SceneGraph) {
        scene.remove_anchor(self.character.entity());
        scene.remove_anchor(self.reality.entity());
        debug!("Removed anchors '{}' and '{}'", self.character.name(), self.reality.name());
    }
}
