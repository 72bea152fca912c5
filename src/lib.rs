//! StitchTrack: back-office API for a garment manufacturing workshop.
//!
//! Clients place sample orders and purchase orders; both move through the
//! same production status pipeline. The API is a JSON REST surface backed
//! by an embedded Sled store, with JWT auth and local-disk file uploads.

pub mod auth;
pub mod clients;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod files;
pub mod models;
pub mod orders;
pub mod purchase;
pub mod rest;
pub mod samples;
pub mod storage;
pub mod users;
