//! Stored scenes

use lightify_protocol::Target;

/// A scene stored on the gateway, owned by one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scene {
    index: u8,
    group: u8,
    serial: u64,
    name: String,
    deleted: bool,
}

impl Scene {
    #[must_use]
    pub fn new(index: u8, group: u8, name: &str, serial: u64) -> Self {
        Self {
            index,
            group,
            serial,
            name: name.to_string(),
            deleted: false,
        }
    }

    /// Whether a fresh scene record describes this same scene
    #[must_use]
    pub fn matches(&self, index: u8, group: u8) -> bool {
        self.index == index && self.group == group
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    #[must_use]
    pub fn target(&self) -> Target {
        Target::Index(self.index)
    }

    #[must_use]
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Index of the owning group
    #[must_use]
    pub fn group(&self) -> u8 {
        self.group
    }

    #[must_use]
    pub fn serial(&self) -> u64 {
        self.serial
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn deleted(&self) -> bool {
        self.deleted
    }
}
