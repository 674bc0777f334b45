pub mod init;
pub mod push;
pub mod render;
