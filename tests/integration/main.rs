//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the Reddit JSON API and run full
//! passes against an on-disk SQLite database.

mod harvest_tests;
