//! Convert command implementation - rewrite an alignment string in another dialect

use annox_core::{canonicalize, AlignFormat};

use crate::error::CliResult;

pub fn execute(align: String, from: AlignFormat, to: AlignFormat) -> CliResult<()> {
    log::info!("Converting {} string to {}", from, to);
    println!("{}", convert(&align, from, to)?);
    Ok(())
}

pub fn convert(align: &str, from: AlignFormat, to: AlignFormat) -> CliResult<String> {
    let canon = canonicalize(align, from)?;
    log::debug!("{} canonical operators", canon.len());
    Ok(canon.to_format(to)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;

    #[test]
    fn test_convert_between_dialects() {
        let out = convert("M 10 D 2 M 5", AlignFormat::ExonerateCigar, AlignFormat::Gff3Gap).unwrap();
        assert_eq!(out, "M10 D2 M5");
    }

    #[test]
    fn test_decode_failure_is_reported() {
        let err = convert("5H10M", AlignFormat::BamCigar, AlignFormat::ExonerateCigar).unwrap_err();
        assert!(matches!(err, CliError::Decode { .. }));
    }
}
