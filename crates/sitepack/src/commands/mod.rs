pub mod build;
pub mod config;
pub mod init;
pub mod stage;
pub mod verify;
