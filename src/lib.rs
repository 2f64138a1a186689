//! Rupture Explorer library exports

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod geometry;
pub mod map;
pub mod models;
pub mod query;
pub mod routes;
pub mod scaling;
pub mod state;
pub mod views;
