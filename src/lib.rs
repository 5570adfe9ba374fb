//! Dealerdesk - lead tracking analytics and vehicle photo intake for a
//! used-car dealership website.
//!
//! # Overview
//!
//! The public site reports visitor activity (page views, phone and email
//! clicks, form submissions) and captures sales leads. Dealerdesk stores
//! both and turns them into a dashboard report: counts by type, source and
//! hour, the most viewed vehicles, and conversion rates through the sales
//! funnel (appointment set, showed up, closed).
//!
//! It also checks vehicle photo filenames against the lot's naming
//! convention (`2021TB_FDS.jpg`) before accepting an upload.
//!
//! # Modules
//!
//! - [`photos`]: Photo filename parsing, validation and display order
//! - [`catalog`]: Model-code to make/model lookup table
//! - [`model`]: Data types for events, leads and photos
//! - [`aggregation`]: Dashboard report computation
//! - [`storage`]: SQLite storage layer
//! - [`config`]: Environment configuration
//! - [`api`]: HTTP API handlers

pub mod aggregation;
pub mod api;
pub mod catalog;
pub mod config;
pub mod model;
pub mod photos;
pub mod storage;
