pub mod init;
pub mod server;
pub mod storage;
