//! Integration tests for the scraping pipeline
//!
//! These tests use wiremock to serve pages, feeds, robots.txt files and a fake
//! chat-completions endpoint, and drive the fetcher, crawler and pipeline
//! end-to-end against them.

mod common;
mod fetch_tests;
mod pipeline_tests;
