pub mod chat;
pub mod quick_ask;
pub mod window;
