//! Kompenzo backend library
//!
//! Registers travelers' train/bus tickets, watches carrier-reported delays,
//! and files compensation claims according to per-carrier refund rules.

pub mod app_state;
pub mod auth;
pub mod carrier_api;
pub mod claim_service;
pub mod config;
pub mod delay_monitor;
pub mod handlers;
pub mod models;
pub mod notifications;
pub mod refund;
pub mod routes;
pub mod ticket_service;
