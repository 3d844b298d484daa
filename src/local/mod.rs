pub mod client;
pub mod process_file;
pub mod server;
