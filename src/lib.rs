//! Constraint Layout - an incremental box-constraint layout kernel
//!
//! Layouts are re-declared on every evaluation pass; the kernel diffs each
//! pass against the previous one, feeds only the changes to a Cassowary
//! solver and publishes (optionally interpolated) values per frame. A small
//! scene format drives the kernel from text.
//!
//! # Example
//!
//! ```rust
//! use constraint_layout::run;
//!
//! let report = run(r#"
//!     measure a 100 20
//!     constrain a.left = 10
//!     constrain a.top = 0
//! "#).unwrap();
//! assert!(report.to_string().contains("a: x=10 y=0 w=100 h=20"));
//! ```

pub mod error;
pub mod layout;
pub mod parser;
pub mod scene;

pub use error::ParseError;
pub use layout::{Layout, LayoutConfig, LayoutError};
pub use parser::{parse, Scene};
pub use scene::{run_scene, FrameReport, PassReport, SceneConfig, SceneReport};

use thiserror::Error;

pub use parser::lexer::Span;

/// Errors that can occur while running a scene
#[derive(Debug, Error)]
pub enum SceneError {
    /// Error during parsing
    #[error("parse errors: {}", format_parse_errors(.0))]
    Parse(Vec<ParseError>),

    /// A statement that parsed but cannot be evaluated
    #[error("{message}")]
    Invalid { span: Span, message: String },

    /// A pass was rejected; the layout kept the previous pass
    #[error("pass {pass}: {source}")]
    Layout {
        pass: usize,
        /// Statement that failed, if the failure came from one
        span: Option<Span>,
        source: LayoutError,
    },
}

impl From<Vec<ParseError>> for SceneError {
    fn from(errors: Vec<ParseError>) -> Self {
        SceneError::Parse(errors)
    }
}

impl SceneError {
    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        match self {
            SceneError::Parse(errors) => errors
                .iter()
                .map(|e| e.format(source, filename))
                .collect::<Vec<_>>()
                .join("\n"),
            SceneError::Invalid { span, message } => {
                error::report(source, filename, span.clone(), message, message)
            }
            SceneError::Layout {
                pass,
                span: Some(span),
                source: err,
            } => error::report(
                source,
                filename,
                span.clone(),
                &format!("pass {} was rejected", pass),
                &err.to_string(),
            ),
            SceneError::Layout { span: None, .. } => format!("{}: {}", filename, self),
        }
    }
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Parse and run a scene with default configuration
pub fn run(source: &str) -> Result<SceneReport, SceneError> {
    run_with_config(source, &SceneConfig::default())
}

/// Parse and run a scene with custom configuration
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use constraint_layout::{run_with_config, SceneConfig};
///
/// let config = SceneConfig::new()
///     .with_frame_interval(Duration::from_millis(50))
///     .with_record_frames(true);
///
/// let report = run_with_config("constrain x = 5 [enter: 100]", &config).unwrap();
/// assert_eq!(report.passes[0].frames.len(), 3);
/// ```
pub fn run_with_config(source: &str, config: &SceneConfig) -> Result<SceneReport, SceneError> {
    let scene = parse(source)?;
    run_scene(&scene, config)
}
