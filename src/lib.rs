pub mod app;
pub mod card;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod language;
pub mod mana;
pub mod output;
pub mod parser;
pub mod partition;
pub mod pipeline;
pub mod store;
