//! sk-portal terminal client

pub mod api;
pub mod cli;
pub mod controller;
mod logging;
pub mod navigation;
pub mod paths;
pub mod pending;
pub mod screen;
pub mod settings;
