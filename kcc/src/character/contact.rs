//! Per-tick contact list.
//!
//! Contacts are rebuilt from scratch every tick. The only state kept across ticks is
//! the set of bodies touched during the previous frame, which is enough to tag each
//! contact as Enter or Stay and to report the bodies that were left (Exit).

use std::collections::BTreeMap;

use crate::character::stability::{contact_tag, slope_angle};
use crate::collision::types::{BodyId, BodyKind, HitInfo, Vec3};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContactTag {
    Wall,
    Head,
    Ground,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContactPhase {
    Enter,
    Stay,
    Exit,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    pub point: Vec3,
    pub normal: Vec3,
    /// Angle between the normal and up (degrees).
    pub slope_angle: f32,
    pub tag: ContactTag,
    pub body: BodyId,
    pub kind: BodyKind,
    pub phase: ContactPhase,
}

#[derive(Default, Debug)]
pub struct ContactList {
    contacts: Vec<Contact>,
    previous: BTreeMap<BodyId, Contact>,
    exits: Vec<Contact>,
}

impl ContactList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a contact for the frame being gathered.
    pub fn record(
        &mut self,
        point: Vec3,
        normal: Vec3,
        body: BodyId,
        kind: BodyKind,
        up: &Vec3,
        slope_limit: f32,
    ) {
        let angle = slope_angle(&normal, up);
        let phase = if self.previous.contains_key(&body) {
            ContactPhase::Stay
        } else {
            ContactPhase::Enter
        };
        self.contacts.push(Contact {
            point,
            normal,
            slope_angle: angle,
            tag: contact_tag(angle, slope_limit),
            body,
            kind,
            phase,
        });
    }

    #[inline]
    pub fn record_hit(&mut self, hit: &HitInfo, up: &Vec3, slope_limit: f32) {
        self.record(hit.point, hit.normal, hit.body, hit.kind, up, slope_limit);
    }

    /// Contacts gathered for the current frame, in insertion order.
    #[inline]
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Bodies touched in the frame before the last roll-over but not in it, sorted by id.
    #[inline]
    pub fn exits(&self) -> &[Contact] {
        &self.exits
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Close the gathered frame and start a new one.
    ///
    /// The first contact per body becomes the "previous" set for phase tagging.
    pub fn roll_over(&mut self) {
        let mut current: BTreeMap<BodyId, Contact> = BTreeMap::new();
        for contact in self.contacts.drain(..) {
            current.entry(contact.body).or_insert(contact);
        }
        self.exits = self
            .previous
            .iter()
            .filter(|(id, _)| !current.contains_key(id))
            .map(|(_, contact)| Contact {
                phase: ContactPhase::Exit,
                ..*contact
            })
            .collect();
        self.previous = current;
    }

    /// Forget everything, including the previous frame.
    pub fn clear(&mut self) {
        self.contacts.clear();
        self.previous.clear();
        self.exits.clear();
    }
}
