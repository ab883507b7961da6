//! HTTP infrastructure - shared client for remote providers

mod client;

pub use client::{HttpClient, HttpClientTrait};
