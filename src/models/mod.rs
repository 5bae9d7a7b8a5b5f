// Re-export all model types for ease of use

pub mod book;
pub mod search;
pub mod responses;

pub use book::*;
pub use search::*;
pub use responses::*;
