//! Variant command implementation - apply one sequence edit

use annox_core::dna::apply_variation;
use annox_core::{Feature, Span};

use crate::error::{CliError, CliResult};

pub fn execute(sequence: String, start: i64, at: Span, edit: String) -> CliResult<()> {
    let (edited, delta) = apply(&sequence, start, at, &edit)?;
    log::info!("Applied {} at {}: {} bases", edit, at, delta);
    println!("{}", edited);
    println!("delta\t{:+}", delta);
    Ok(())
}

pub fn apply(sequence: &str, start: i64, at: Span, edit: &str) -> CliResult<(String, i64)> {
    let end = start + sequence.len() as i64 - 1;
    if at.x1 < start || at.x2 > end {
        return Err(CliError::invalid_argument(
            "--at".to_string(),
            format!("{} lies outside the sequence at {}-{}", at, start, end),
        ));
    }
    let mut edited = sequence.to_string();
    let variation = Feature::variation(at.x1, at.x2, edit);
    let delta = apply_variation(&mut edited, start, &variation, 0)?;
    Ok((edited, delta))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_reports_delta() {
        let (seq, delta) = apply("aacgtt", 10, Span::new(12, 13), "AC>A").unwrap();
        assert_eq!(seq, "aaAtt");
        assert_eq!(delta, -1);

        let (seq, delta) = apply("aacgtt", 10, Span::new(12, 13), ">AT").unwrap();
        assert_eq!(seq, "aacATgtt");
        assert_eq!(delta, 2);
    }

    #[test]
    fn test_apply_rejects_bad_edits() {
        assert!(matches!(
            apply("aacgtt", 10, Span::new(12, 14), "AC>A"),
            Err(CliError::Variation { .. })
        ));
        assert!(matches!(
            apply("aacgtt", 10, Span::new(1, 2), "A>G"),
            Err(CliError::InvalidArgument { .. })
        ));
    }
}
