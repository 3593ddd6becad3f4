use std::sync::Arc;
use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};

use super::armor::{self, Armor, Armored};
use super::classify::{PemKind, SupportedKind};
use super::render::render;
use super::report::{DiagnosticEntry, DiagnosticLevel, Report};
use super::structure::{Structure, parse_certificate, parse_request};
use crate::errors::AppError;

pub const LOG_TARGET: &str = "pemview/decoder";

/// Receives the diagnostics of every decode.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, entry: DiagnosticEntry);
}

/// Forwards diagnostics to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&self, entry: DiagnosticEntry) {
        let level: log::Level = entry.level.into();
        if !log::log_enabled!(target: LOG_TARGET, level) {
            return;
        }
        let phase = entry.phase.as_deref().map(|p| format!("/{p}")).unwrap_or_default();
        match &entry.details {
            Some(details) => log::log!(
                target: LOG_TARGET,
                level,
                "[{}] {}{phase} +{}ms: {} {details}",
                entry.request_id,
                entry.category,
                entry.elapsed_ms,
                entry.message
            ),
            None => log::log!(
                target: LOG_TARGET,
                level,
                "[{}] {}{phase} +{}ms: {}",
                entry.request_id,
                entry.category,
                entry.elapsed_ms,
                entry.message
            ),
        }
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&self, _entry: DiagnosticEntry) {}
}

/// How many armored blocks one submission may carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockPolicy {
    /// Exactly one block; anything else alongside it is rejected.
    #[default]
    Single,
    /// Every block is decoded, in submission order.
    Chain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub policy: BlockPolicy,
    pub fingerprints: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            policy: BlockPolicy::Single,
            fingerprints: true,
        }
    }
}

#[derive(Clone)]
struct DecodeLogger {
    sink: Arc<dyn DiagnosticSink>,
    request_id: Arc<String>,
    start: Instant,
}

impl DecodeLogger {
    fn new(sink: Arc<dyn DiagnosticSink>, request_id: &str) -> Self {
        Self {
            sink,
            request_id: Arc::new(request_id.to_string()),
            start: Instant::now(),
        }
    }

    fn event(
        &self,
        level: DiagnosticLevel,
        category: &str,
        phase: Option<&str>,
        message: impl Into<String>,
        details: Option<Value>,
    ) {
        self.sink.emit(DiagnosticEntry {
            request_id: self.request_id.to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level,
            category: category.to_string(),
            phase: phase.map(str::to_string),
            message: message.into(),
            elapsed_ms: self.start.elapsed().as_millis() as u64,
            details,
        });
    }

    fn debug(&self, category: &str, phase: Option<&str>, message: impl Into<String>, details: Option<Value>) {
        self.event(DiagnosticLevel::Debug, category, phase, message, details);
    }

    fn info(&self, category: &str, phase: Option<&str>, message: impl Into<String>, details: Option<Value>) {
        self.event(DiagnosticLevel::Info, category, phase, message, details);
    }

    fn failure(&self, category: &str, err: &AppError) {
        let level = if err.is_user_error() {
            DiagnosticLevel::Warning
        } else {
            DiagnosticLevel::Error
        };
        let mut details = json!({ "kind": err.kind });
        if let Some(context) = &err.context {
            details["context"] = json!(context);
        }
        if let Some(cause) = err.trace.as_ref().and_then(|t| t.cause.as_ref()) {
            details["cause"] = json!(cause);
        }
        self.event(level, category, Some("failed"), err.message.clone(), Some(details));
    }
}

/// Stateless decoder shared across requests.
pub struct DecodeEngine {
    sink: Arc<dyn DiagnosticSink>,
    options: EngineOptions,
}

impl DecodeEngine {
    pub fn new(sink: Arc<dyn DiagnosticSink>, options: EngineOptions) -> Self {
        Self { sink, options }
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Decode a submission that must hold exactly one PEM block.
    pub fn decode(&self, input: &[u8]) -> Result<Report, AppError> {
        let logger = DecodeLogger::new(self.sink.clone(), &new_request_id());
        self.decode_single(&logger, input)
    }

    /// Decode every PEM block of a submission, in order.
    pub fn decode_chain(&self, input: &[u8]) -> Result<Vec<Report>, AppError> {
        let logger = DecodeLogger::new(self.sink.clone(), &new_request_id());
        self.decode_all(&logger, input)
    }

    /// Decode according to the configured policy, tagging diagnostics with `request_id`.
    pub fn submit(&self, request_id: &str, input: &[u8]) -> Result<Vec<Report>, AppError> {
        let logger = DecodeLogger::new(self.sink.clone(), request_id);
        match self.options.policy {
            BlockPolicy::Single => self.decode_single(&logger, input).map(|report| vec![report]),
            BlockPolicy::Chain => self.decode_all(&logger, input),
        }
    }

    fn decode_single(&self, logger: &DecodeLogger, input: &[u8]) -> Result<Report, AppError> {
        let result = scan(logger, input)
            .and_then(Armored::into_single)
            .and_then(|armor| self.decode_block(logger, armor));
        finish(logger, result)
    }

    fn decode_all(&self, logger: &DecodeLogger, input: &[u8]) -> Result<Vec<Report>, AppError> {
        let result = scan(logger, input).and_then(|armored| {
            if armored.trailing {
                return Err(AppError::malformed_input().with_trace(
                    None,
                    Some("data remains after the last PEM block".to_string()),
                    None,
                ));
            }
            armored
                .blocks
                .into_iter()
                .map(|armor| self.decode_block(logger, armor))
                .collect::<Result<Vec<_>, _>>()
        });
        let result = finish(logger, result);
        if let Ok(reports) = &result {
            logger.debug("outcome", None, "chain decoded", Some(json!({ "blocks": reports.len() })));
        }
        result
    }

    fn decode_block(&self, logger: &DecodeLogger, armor: Armor<'_>) -> Result<Report, AppError> {
        let kind = PemKind::classify(armor.label).guard()?;
        logger.debug("classify", None, "label accepted", Some(json!({ "label": armor.label })));

        let block = armor.decode()?;
        logger.debug("armor", Some("decoded"), "body decoded", Some(json!({ "derBytes": block.bytes.len() })));

        let fingerprints = self.options.fingerprints;
        let structure = match kind {
            SupportedKind::Certificate => {
                Structure::Certificate(parse_certificate(&block.bytes, fingerprints)?)
            }
            SupportedKind::CertificateRequest => {
                Structure::Request(parse_request(&block.bytes, fingerprints)?)
            }
        };
        logger.debug("parse", None, "structure parsed", None);

        let text = render(&structure).inspect_err(|err| logger.failure("render", err))?;
        Ok(Report::new(block.label, text, structure))
    }
}

/// Scan for armor and refuse the whole submission if any block is a private key.
///
/// BEGIN lines are checked before the blocks are collected, so a private key
/// that was cut off before its END line is refused too.
fn scan<'a>(logger: &DecodeLogger, input: &'a [u8]) -> Result<Armored<'a>, AppError> {
    logger.debug("armor", Some("scan"), "scanning submission", Some(json!({ "bytes": input.len() })));
    if let Some(private) = armor::begin_labels(input)
        .into_iter()
        .find(|label| PemKind::classify(label).is_private_key())
    {
        // Only the label is recorded for this path.
        logger.event(
            DiagnosticLevel::Warning,
            "classify",
            Some("private-key"),
            "private key submitted",
            Some(json!({ "label": private })),
        );
        return Err(AppError::private_key_submitted());
    }
    let armored = armor::scan(input)?;
    logger.debug(
        "armor",
        Some("scan"),
        "armor found",
        Some(json!({ "blocks": armored.blocks.len(), "trailing": armored.trailing })),
    );
    Ok(armored)
}

fn finish<T>(logger: &DecodeLogger, result: Result<T, AppError>) -> Result<T, AppError> {
    match &result {
        Ok(_) => logger.info("outcome", None, "decoded", None),
        Err(err) => logger.failure("outcome", err),
    }
    result
}

fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
