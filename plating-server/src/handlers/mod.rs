pub mod info;
pub mod score;
pub mod upload;
