pub mod config;
pub mod editor;
pub mod error;
pub mod media;
pub mod navigation;
pub mod project;
pub mod segments;
pub mod timecode;
pub mod types;
