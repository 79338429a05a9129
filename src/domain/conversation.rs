use crate::error::{AppError, Result};
use time::OffsetDateTime;
use uuid::Uuid;

/// Two distinct user ids in ascending order.
///
/// Lookup and creation of a direct conversation always go through this type so
/// that `(a, b)` and `(b, a)` address the same row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticipantPair([Uuid; 2]);

impl ParticipantPair {
    /// Canonicalizes a sender/receiver pair.
    ///
    /// # Errors
    /// Returns `AppError::Validation` if both ids are the same user.
    pub fn new(a: Uuid, b: Uuid) -> Result<Self> {
        if a == b {
            return Err(AppError::Validation("cannot open a direct conversation with yourself".into()));
        }
        Ok(if a < b { Self([a, b]) } else { Self([b, a]) })
    }

    #[must_use]
    pub const fn ids(&self) -> [Uuid; 2] {
        self.0
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Uuid> {
        self.0.to_vec()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: Uuid,
    pub participant_ids: Vec<Uuid>,
    pub last_message_at: OffsetDateTime,
    pub reservation_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
}

impl Conversation {
    /// The first participant that is not `user_id`, if any.
    #[must_use]
    pub fn other_participant(&self, user_id: Uuid) -> Option<Uuid> {
        self.participant_ids.iter().copied().find(|id| *id != user_id)
    }

    #[must_use]
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.participant_ids.contains(&user_id)
    }
}

/// Where a new message should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationTarget {
    /// An explicitly referenced conversation; it must exist.
    Existing(Uuid),
    /// The direct conversation with `receiver_id`, created on first contact.
    Direct { receiver_id: Uuid, reservation_id: Option<Uuid> },
}

impl ConversationTarget {
    /// Builds the target from the optional request identifiers. An explicit conversation id wins.
    ///
    /// # Errors
    /// Returns `AppError::Validation` if neither identifier is present.
    pub fn from_parts(
        conversation_id: Option<Uuid>,
        receiver_id: Option<Uuid>,
        reservation_id: Option<Uuid>,
    ) -> Result<Self> {
        match (conversation_id, receiver_id) {
            (Some(id), _) => Ok(Self::Existing(id)),
            (None, Some(receiver_id)) => Ok(Self::Direct { receiver_id, reservation_id }),
            (None, None) => Err(AppError::Validation("conversationId or receiverId is required".into())),
        }
    }
}

/// Which conversation's history to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryTarget {
    Conversation(Uuid),
    /// Any conversation containing both the caller and this user.
    Receiver(Uuid),
}

impl HistoryTarget {
    /// # Errors
    /// Returns `AppError::Validation` if neither identifier is present.
    pub fn from_parts(conversation_id: Option<Uuid>, receiver_id: Option<Uuid>) -> Result<Self> {
        match (conversation_id, receiver_id) {
            (Some(id), _) => Ok(Self::Conversation(id)),
            (None, Some(receiver_id)) => Ok(Self::Receiver(receiver_id)),
            (None, None) => Err(AppError::Validation("conversationId or receiverId is required".into())),
        }
    }
}
