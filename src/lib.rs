pub mod auth;
pub mod clients;
pub mod database;
pub mod directory;
pub mod handlers;
pub mod locations;
pub mod models;
