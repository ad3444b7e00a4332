pub mod command;
pub mod decode;
pub mod events;
pub mod info;
pub mod session;
