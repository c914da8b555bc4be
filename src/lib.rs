pub mod board;
pub mod board_clients;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod group_config;
pub mod store;
pub mod stores;
pub mod tags;
