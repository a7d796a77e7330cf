//! Data model shared by the tree, the ports and the CLI.

pub mod access;
pub mod node;
pub mod version;

pub use access::{AccessEntry, AccessRole};
pub use node::{Label, NodeId, NodePatch, ParseEnumError, Status, TreeNode};
pub use version::Version;
