//! The customizer's own systems. Nothing in here touches the game, so all of it can be tested
//! away from it.

pub mod config;
pub mod customizer;
pub mod label;
pub mod resources;
