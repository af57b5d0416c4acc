//! The closed set of object categories

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One of the two supported object categories.
///
/// The numeric ids (`58` for trees, `-1` for buildings) only exist at the
/// serialization boundary for compatibility with existing consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum Category {
    Tree,
    Building,
}

/// Raised when a class id outside `{58, -1}` is converted into a [`Category`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unsupported class id {0}, expected 58 (tree) or -1 (building)")]
pub struct UnknownCategory(pub i32);

impl Category {
    pub const ALL: [Category; 2] = [Category::Tree, Category::Building];

    pub const TREE_ID: i32 = 58;
    pub const BUILDING_ID: i32 = -1;

    /// Wire id of the category
    pub fn class_id(self) -> i32 {
        match self {
            Category::Tree => Self::TREE_ID,
            Category::Building => Self::BUILDING_ID,
        }
    }

    /// Human readable label, also used as `className` on the wire
    pub fn label(self) -> &'static str {
        match self {
            Category::Tree => "tree",
            Category::Building => "building",
        }
    }

    pub fn from_class_id(id: i32) -> Option<Self> {
        match id {
            Self::TREE_ID => Some(Category::Tree),
            Self::BUILDING_ID => Some(Category::Building),
            _ => None,
        }
    }

    /// Normalize a free-form label coming from an external collaborator.
    ///
    /// "building" wins over "tree" when a label mentions both.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.to_lowercase();
        if label.contains("building") {
            Some(Category::Building)
        } else if label.contains("tree") {
            Some(Category::Tree)
        } else {
            None
        }
    }

    pub fn is_tree(self) -> bool {
        matches!(self, Category::Tree)
    }
}

impl From<Category> for i32 {
    fn from(category: Category) -> Self {
        category.class_id()
    }
}

impl TryFrom<i32> for Category {
    type Error = UnknownCategory;

    fn try_from(id: i32) -> Result<Self, Self::Error> {
        Category::from_class_id(id).ok_or(UnknownCategory(id))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_ids() {
        assert_eq!(Category::Tree.class_id(), 58);
        assert_eq!(Category::Building.class_id(), -1);
        assert_eq!(Category::try_from(58), Ok(Category::Tree));
        assert_eq!(Category::try_from(3), Err(UnknownCategory(3)));
    }

    #[test]
    fn test_label_normalization() {
        assert_eq!(Category::from_label("Office Building"), Some(Category::Building));
        assert_eq!(Category::from_label("palm tree"), Some(Category::Tree));
        assert_eq!(Category::from_label("potted plant"), None);
    }
}
