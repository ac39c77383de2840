//! Styles command implementation - show and check who masks whom

use annox_core::{Style, StyleRegistry};

use crate::config::Config;
use crate::error::{CliError, CliResult};

pub fn execute(config: &Config, strict: bool) -> CliResult<()> {
    let registry = config.registry();
    log::info!("{} styles configured", registry.len());

    let mut styles: Vec<&Style> = registry.iter().map(|s| s.as_ref()).collect();
    styles.sort_by_key(|s| s.id());
    for style in styles {
        println!("{}", describe(style));
    }

    let unknown = registry_problems(&registry);
    for problem in &unknown {
        log::warn!("{}", problem);
    }
    if strict && !unknown.is_empty() {
        return Err(CliError::validation(format!(
            "{} mask list entries name no configured style",
            unknown.len()
        )));
    }
    Ok(())
}

fn describe(style: &Style) -> String {
    let id = style.id();
    if !style.is_masked() {
        return format!("{}\t{:?}\tmasker", id, style.mode);
    }
    format!(
        "{}\t{:?}\tmasked by {}",
        id,
        style.mode,
        style.masker_ids(&id).join(", ")
    )
}

fn registry_problems(registry: &StyleRegistry) -> Vec<String> {
    registry
        .unknown_maskers()
        .into_iter()
        .map(|(style, masker)| format!("style {} is masked by unknown featureset {}", style, masker))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use annox_core::FeatureMode;

    #[test]
    fn test_describe_resolves_self() {
        let style = Style::new("EST_Human", FeatureMode::Alignment).with_masked_by(["vertebrate_mRNA", "self"]);
        assert_eq!(describe(&style), "est_human\tAlignment\tmasked by vertebrate_mrna, est_human");
        let masker = Style::new("vertebrate_mRNA", FeatureMode::Alignment);
        assert_eq!(describe(&masker), "vertebrate_mrna\tAlignment\tmasker");
    }

    #[test]
    fn test_strict_rejects_unknown_maskers() {
        let config = Config {
            styles: vec![Style::new("EST_Human", FeatureMode::Alignment).with_masked_by(["mRNA"])],
            ..Config::default()
        };
        assert!(execute(&config, false).is_ok());
        assert!(matches!(execute(&config, true), Err(CliError::Validation { .. })));
    }
}
