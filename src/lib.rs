pub mod api;
pub mod auth;
pub mod directory;
pub mod engine;
pub mod entities;
pub mod error;
pub mod fare;
pub mod matching;
pub mod server;

pub mod simulation;
