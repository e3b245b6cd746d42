//! Encodings of an access policy used to share the ciphertext secret among
//! attributes.

use serde::{Deserialize, Serialize};

pub mod lsss;
pub mod tree;

pub use lsss::{LsssMatrix, LsssRow};
pub use tree::{AccessTree, Witness};

/// Selects the access structure built at encryption time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessStructureKind {
    /// Linear secret sharing matrix, reconstructed by linear algebra.
    #[default]
    Matrix,
    /// Threshold tree, recombined with Lagrange interpolation.
    Tree,
}
