//! Integration layer for a digital-human chat demo.
//!
//! Wires four collaborators together: a third-party avatar renderer
//! (injected capability, [`avatar`]), an OpenAI-compatible streaming
//! chat-completion API ([`llm`]), microphone capture with speech
//! recognition ([`asr`]), and a connection self-check ([`diagnostic`]).
//! The streaming chat client is the only piece with real protocol logic;
//! everything else is a thin pass-through to an external capability.

pub mod asr;
pub mod avatar;
pub mod config;
pub mod diagnostic;
pub mod llm;
