//! Command implementations for the Annox CLI

pub mod config;
pub mod convert;
pub mod decode;
pub mod styles;
pub mod variant;

use annox_core::{Span, Strand};

/// Parses `start-end` (1-based, inclusive) into a span.
pub fn parse_span(s: &str) -> Result<Span, String> {
    let (start, end) = s
        .split_once('-')
        .ok_or_else(|| format!("expected START-END, got {:?}", s))?;
    let parse = |v: &str| {
        v.trim()
            .replace(',', "")
            .parse::<i64>()
            .map_err(|e| format!("{:?}: {}", v, e))
    };
    let (start, end) = (parse(start)?, parse(end)?);
    if start < 1 || end < 1 {
        return Err(format!("coordinates are 1-based, got {:?}", s));
    }
    Ok(Span::new(start, end))
}

/// Parses `+`, `-` or `.` into a strand.
pub fn parse_strand(s: &str) -> Result<Strand, String> {
    match s {
        "+" | "-" | "." => Ok(Strand::from(s.chars().next().unwrap_or('.'))),
        _ => Err(format!("expected +, - or ., got {:?}", s)),
    }
}
