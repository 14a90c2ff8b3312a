//! Opaque identity handles.
//!
//! Every node in a parsed model carries a uuid-backed handle rather than a
//! reference to its neighbours. Cross-references (part → logic block,
//! part → source file, sibling links) are stored as ids and resolved against
//! the owning container, so the cyclic relationships of the document model
//! never turn into cyclic ownership.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random handle.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identity of a single command-level node in a control file.
    PartId
);

id_type!(
    /// Identity of a conditional (If/Else/Define) block in a control file.
    LogicId
);

id_type!(
    /// Provenance hash of an originating source file.
    ///
    /// Parts and logic blocks record the `FileId` of the control file that
    /// introduced them, forming a tree when multiple files are composed into
    /// one model.
    FileId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = PartId::new();
        let b = PartId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn ids_are_copy_and_hashable() {
        use std::collections::HashSet;
        let id = FileId::new();
        let copy = id;
        let mut set = HashSet::new();
        set.insert(id);
        assert!(set.contains(&copy));
    }

    #[test]
    fn display_is_hyphenated_uuid() {
        let id = LogicId::new();
        let text = id.to_string();
        assert_eq!(text.len(), 36);
        assert_eq!(text.matches('-').count(), 4);
    }
}
