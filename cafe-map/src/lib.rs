//! Cafe map aggregator.
//!
//! Combines a cafe-attribute catalog (wifi, seating, quietness, price)
//! with place-search results (identifier, rating, location) into
//! validated records, and summarizes them per city.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod mapper;
pub mod normalize;
pub mod pipeline;
pub mod place;
pub mod stats;
pub mod web;
