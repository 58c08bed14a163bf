//! Human-facing observations derived from a finished analysis.
//!
//! Everything here is a pure read of the fetch resolutions and the two
//! matrices. The list is ordered for display: source paths first, then
//! per-symbol coverage, then pair-level findings.

use cryptoa_core::analytics::{CorrelationMatrix, OverlapMatrix};
use cryptoa_core::data::{DataSource, Resolution};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// One observation for the caller to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The symbol's chain produced a series.
    SourceLoaded {
        symbol: String,
        source: DataSource,
        /// Failures of earlier links, empty when the first link worked.
        fallback_path: Vec<String>,
    },
    /// Every link of the symbol's chain failed.
    SourceFailed {
        symbol: String,
        attempted: usize,
        reasons: Vec<String>,
    },
    /// Valid return observations for a symbol, 0 when it has no column.
    ObservationCount { symbol: String, count: usize },
    /// Mutually valid returns for a configured pair of interest.
    PairOverlap { a: String, b: String, count: usize },
    LowCorrelation {
        a: String,
        b: String,
        correlation: f64,
        overlap: usize,
        threshold: f64,
    },
    /// Fewer than two mutually valid returns, or a flat series.
    UndefinedCorrelation { a: String, b: String, overlap: usize },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Self::SourceLoaded { fallback_path, .. } if fallback_path.is_empty() => Severity::Info,
            Self::SourceLoaded { .. } => Severity::Warning,
            Self::SourceFailed { .. } => Severity::Error,
            Self::ObservationCount { count, .. } if *count < 2 => Severity::Warning,
            Self::ObservationCount { .. } | Self::PairOverlap { .. } => Severity::Info,
            Self::LowCorrelation { .. } | Self::UndefinedCorrelation { .. } => Severity::Warning,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceLoaded {
                symbol,
                source,
                fallback_path,
            } => {
                write!(f, "{symbol}: loaded via {source}")?;
                if !fallback_path.is_empty() {
                    write!(f, " after {}", fallback_path.join(" → "))?;
                }
                Ok(())
            }
            Self::SourceFailed {
                symbol,
                attempted,
                reasons,
            } => write!(
                f,
                "{symbol}: all {attempted} sources failed: {}",
                reasons.join(" → ")
            ),
            Self::ObservationCount { symbol, count } => {
                write!(f, "{symbol}: {count} valid return observations")
            }
            Self::PairOverlap { a, b, count } => {
                write!(f, "{a} / {b}: {count} overlapping return days")
            }
            Self::LowCorrelation {
                a,
                b,
                correlation,
                overlap,
                threshold,
            } => write!(
                f,
                "{a} / {b}: correlation {correlation:.3} is below {threshold} over {overlap} \
                 overlapping days (possible data-coverage or decoupling)"
            ),
            Self::UndefinedCorrelation { a, b, overlap } => write!(
                f,
                "{a} / {b}: correlation undefined ({overlap} overlapping days)"
            ),
        }
    }
}

/// Derive the diagnostic list for one run.
///
/// `symbols` is the requested order; `focus_pairs` are reported only when
/// both members were requested.
pub fn diagnose(
    symbols: &[String],
    resolutions: &[Resolution],
    correlation: &CorrelationMatrix,
    overlap: &OverlapMatrix,
    low_correlation_threshold: f64,
    focus_pairs: &[[String; 2]],
) -> Vec<Diagnostic> {
    let mut out = Vec::new();

    for resolution in resolutions {
        out.push(source_summary(resolution));
    }

    for symbol in symbols {
        let count = overlap.get(symbol, symbol).copied().unwrap_or(0);
        out.push(Diagnostic::ObservationCount {
            symbol: symbol.clone(),
            count,
        });
    }

    for [a, b] in focus_pairs {
        if symbols.contains(a) && symbols.contains(b) {
            out.push(Diagnostic::PairOverlap {
                a: a.clone(),
                b: b.clone(),
                count: overlap.get(a, b).copied().unwrap_or(0),
            });
        }
    }

    let mut undefined = Vec::new();
    for (i, j) in correlation.upper_pairs() {
        let a = &correlation.symbols()[i];
        let b = &correlation.symbols()[j];
        let count = *overlap.at(i, j);
        match *correlation.at(i, j) {
            Some(r) if r.abs() < low_correlation_threshold => out.push(Diagnostic::LowCorrelation {
                a: a.clone(),
                b: b.clone(),
                correlation: r,
                overlap: count,
                threshold: low_correlation_threshold,
            }),
            Some(_) => {}
            None => undefined.push(Diagnostic::UndefinedCorrelation {
                a: a.clone(),
                b: b.clone(),
                overlap: count,
            }),
        }
    }
    out.extend(undefined);

    out
}

fn source_summary(resolution: &Resolution) -> Diagnostic {
    let reasons: Vec<String> = resolution.failures.iter().map(ToString::to_string).collect();
    match resolution.source() {
        Some(source) => Diagnostic::SourceLoaded {
            symbol: resolution.symbol.clone(),
            source,
            fallback_path: reasons,
        },
        None => Diagnostic::SourceFailed {
            symbol: resolution.symbol.clone(),
            attempted: resolution.chain_len,
            reasons,
        },
    }
}
