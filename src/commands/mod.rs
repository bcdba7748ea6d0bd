//! Resource command families.

pub mod attachments;
pub mod projects;
pub mod version;

use crate::framework::command::Command;

/// Attach every command family to the root.
pub fn register(root: &mut Command) {
    projects::register(root);
    attachments::register(root);
    version::register(root);
}
