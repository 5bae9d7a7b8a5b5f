pub mod book_service;
pub mod cloudinary_service;
pub mod pdf_metadata;
