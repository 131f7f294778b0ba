//! Attach-once links between visual entities and anchor nodes.
//!
//! A link re-parents its child under its parent anchor exactly once, at the
//! first check where both the anchor has been observed and the child exists.
//! Either prerequisite may arrive first.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::loader::RiggedCharacter;
use crate::scene::{EntityId, SceneGraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    Detached,
    Attached,
}

impl LinkState {
    pub fn is_attached(&self) -> bool {
        matches!(self, LinkState::Attached)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// Rigged character under the body-driven anchor
    CharacterToBody,
    /// Authored prop under the surface-driven anchor
    PropToPlane,
}

/// Result of one attachment check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// This check performed the re-parent
    Attached,
    /// Already attached earlier; nothing done
    AlreadyAttached,
    /// Parent anchor has not received a pose yet
    AwaitingAnchor,
    /// Child entity is not available yet
    AwaitingChild,
}

/// One child/parent relation with its readiness flags.
#[derive(Debug, Clone)]
pub struct AttachmentLink {
    kind: LinkKind,
    parent: EntityId,
    child: Option<EntityId>,
    anchor_ready: bool,
    state: LinkState,
}

impl AttachmentLink {
    pub fn new(kind: LinkKind, parent: EntityId) -> Self {
        Self {
            kind,
            parent,
            child: None,
            anchor_ready: false,
            state: LinkState::Detached,
        }
    }

    pub fn kind(&self) -> LinkKind {
        self.kind
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn child(&self) -> Option<EntityId> {
        self.child
    }

    /// Provide the child entity. Set at most once; returns false if a child
    /// was already present.
    pub fn offer_child(&mut self, child: EntityId) -> bool {
        if self.child.is_some() {
            debug!("{:?}: child already set, ignoring {}", self.kind, child);
            return false;
        }
        self.child = Some(child);
        true
    }

    /// Record that the parent anchor has a pose of the right kind
    pub fn mark_anchor_ready(&mut self) {
        self.anchor_ready = true;
    }

    /// Check-and-transition. Performs the re-parent when both prerequisites
    /// hold and the link is still detached. Callers hold `&mut self`, so the
    /// check and the transition cannot interleave with another check.
    pub fn try_attach(&mut self, scene: &mut dyn SceneGraph) -> AttachOutcome {
        if self.state.is_attached() {
            return AttachOutcome::AlreadyAttached;
        }
        if !self.anchor_ready {
            return AttachOutcome::AwaitingAnchor;
        }
        let Some(child) = self.child else {
            return AttachOutcome::AwaitingChild;
        };

        scene.set_parent(child, self.parent);
        self.state = LinkState::Attached;
        info!("{:?}: attached {} under {}", self.kind, child, self.parent);
        AttachOutcome::Attached
    }
}

/// Both links of a session plus the loaded character they depend on.
#[derive(Debug)]
pub struct AttachmentStateMachine {
    character_link: AttachmentLink,
    prop_link: AttachmentLink,
    character: Option<RiggedCharacter>,
}

impl AttachmentStateMachine {
    /// `prop` is attached under the reality anchor without waiting on any
    /// load; the character link waits for both body pose and asset.
    pub fn new(character_anchor: EntityId, reality_anchor: EntityId, prop: EntityId) -> Self {
        let mut prop_link = AttachmentLink::new(LinkKind::PropToPlane, reality_anchor);
        prop_link.offer_child(prop);
        prop_link.mark_anchor_ready();

        Self {
            character_link: AttachmentLink::new(LinkKind::CharacterToBody, character_anchor),
            prop_link,
            character: None,
        }
    }

    pub fn character_link(&self) -> &AttachmentLink {
        &self.character_link
    }

    pub fn prop_link(&self) -> &AttachmentLink {
        &self.prop_link
    }

    pub fn character(&self) -> Option<&RiggedCharacter> {
        self.character.as_ref()
    }

    pub fn attach_prop(&mut self, scene: &mut dyn SceneGraph) -> AttachOutcome {
        self.prop_link.try_attach(scene)
    }

    /// Store the loaded character (first one wins), apply its scale, and
    /// attach if the body anchor has already been seen.
    pub fn character_loaded(
        &mut self,
        character: RiggedCharacter,
        scene: &mut dyn SceneGraph,
    ) -> AttachOutcome {
        if self.character.is_none() && self.character_link.offer_child(character.entity()) {
            scene.set_scale(character.entity(), character.scale());
            self.character = Some(character);
        }
        self.character_link.try_attach(scene)
    }

    /// A body pose has been written to the character anchor
    pub fn body_observed(&mut self, scene: &mut dyn SceneGraph) -> AttachOutcome {
        self.character_link.mark_anchor_ready();
        self.character_link.try_attach(scene)
    }
}
