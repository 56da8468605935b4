//! marketcache library
//!
//! Tiered (memory + file) response cache with per-category TTLs, a retrying
//! upstream fetcher, and a background refresher for the token dashboard's
//! market data. The binary in `main.rs` is a thin JSON front end over
//! [`service::MarketService`] and [`refresh::Refresher`].

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod refresh;
pub mod response;
pub mod service;
