use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A marketplace user as seen by messaging. Owned elsewhere; never written here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
}

/// Denormalized sender fields attached to every message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderProfile {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
}

impl From<&User> for SenderProfile {
    fn from(user: &User) -> Self {
        Self { id: user.id, name: user.name.clone(), image: user.image.clone() }
    }
}
