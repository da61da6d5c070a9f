//! Minimal GitHub REST client: repository contents, trees, collaborators, labels,
//! issue comments, pull request files and webhook payloads.

pub mod client;
pub mod models;
pub mod webhook;

pub use client::{Client, ClientBuilder, ClientError, ClientResult, Credentials, Response};
