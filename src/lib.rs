//! Pressroom - Newsroom Audience Synchronization Service
//!
//! Keeps subscriber and contact data in step with a pluggable set of
//! email service providers, and reconciles WooCommerce commerce and
//! membership state with provider contact lists.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
