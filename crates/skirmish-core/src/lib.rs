//! Core types and definitions for the SKIRMISH turn-resolution engine.
//!
//! This crate defines the vocabulary shared by the simulation crate and any
//! host application: components, commands, events, snapshots, configuration
//! and the trajectory seam. It has no dependency on an ECS or runtime.

pub mod commands;
pub mod components;
pub mod config;
pub mod constants;
pub mod cooldown;
pub mod enums;
pub mod events;
pub mod heat;
pub mod state;
pub mod trajectory;
pub mod types;
