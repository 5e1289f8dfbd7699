use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// The two purchasable product kinds. The tag doubles as the leading
/// segment of a checkout reference, so it must stay stable on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Course,
    Masterclass,
}

impl ProductType {
    pub fn tag(&self) -> &'static str {
        match self {
            ProductType::Course => "course",
            ProductType::Masterclass => "masterclass",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "course" => Some(ProductType::Course),
            "masterclass" => Some(ProductType::Masterclass),
            _ => None,
        }
    }
}

impl Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}
