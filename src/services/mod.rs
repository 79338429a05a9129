pub mod context_service;
pub mod conversation_service;
pub mod gateway;
pub mod health_service;
pub mod identity_service;
pub mod message_service;
pub mod notification_service;
pub mod realtime;
