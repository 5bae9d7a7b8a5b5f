pub mod file_name;
pub mod mime;
pub mod key_lock;
