pub mod conversation;
pub mod message;
pub mod notification;
pub mod user;

pub use conversation::ConversationRecord;
pub use message::MessageWithSenderRecord;
pub use notification::NotificationRecord;
pub use user::UserRecord;
