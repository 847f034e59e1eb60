#![allow(dead_code)]

pub mod fixtures;

pub use fixtures::{fixture_path, load_fixture, TestHome};
