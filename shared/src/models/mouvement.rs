//! Warehouse movement models

use serde::{Deserialize, Serialize};

/// Direction of a warehouse ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeMouvement {
    Entree,
    Sortie,
}

impl TypeMouvement {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeMouvement::Entree => "entree",
            TypeMouvement::Sortie => "sortie",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "entree" => Some(TypeMouvement::Entree),
            "sortie" => Some(TypeMouvement::Sortie),
            _ => None,
        }
    }
}
