//! # petrinet-core
//!
//! Petri net definition and firing engine.
//!
//! This crate provides:
//! - Net declarations (procedural DSL and JSON) and their validation
//! - Arc indexing into per-transition delta vectors and guards
//! - Firing with general, elementary and workflow commit policies
//! - Structural editing that keeps the index consistent
//! - An event stream that sequences firings and routes them to handlers

pub mod definition;
pub mod editor;
pub mod error;
pub mod firing;
pub mod index;
pub mod label;
pub mod model;
pub mod net;
pub mod stream;

pub use definition::{Declaration, Dsl, PlaceNode, TransitionNode, DECLARATION_VERSION};
pub use error::CoreError;
pub use firing::{vector_add, VectorSum};
pub use model::{Arc, FireResult, Guard, NetType, Node, Place, Position, Role, Transition, Vector};
pub use net::Net;
pub use stream::{Event, EventLog, Stream, StreamEvent, StreamView};
