pub mod armor;
pub mod classify;
pub mod engine;
pub mod render;
pub mod report;
pub mod structure;

#[cfg(test)]
pub(crate) mod fixtures;

pub use armor::{Armor, Armored, PemBlock};
pub use classify::{PemKind, SupportedKind};
pub use engine::{BlockPolicy, DecodeEngine, DiagnosticSink, EngineOptions, LogSink, NullSink};
pub use render::render;
pub use report::{DiagnosticEntry, DiagnosticLevel, Report};
pub use structure::{Structure, parse_certificate, parse_request};
