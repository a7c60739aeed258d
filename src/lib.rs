//! SmartHealth - streaming clinical-records question answering
//!
//! Clients open an authenticated WebSocket channel, ask questions about one
//! patient and receive the answer as an ordered stream of frames, generated
//! by a language model from the patient's retrieved clinical context.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
