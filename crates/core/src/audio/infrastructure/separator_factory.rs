use super::demucs_separator::{DemucsSeparator, DEFAULT_DEMUCS_MODEL};
use super::spleeter_separator::{SpleeterSeparator, DEFAULT_SPLEETER_MODEL};
use crate::audio::domain::vocal_separator::VocalSeparator;
use crate::shared::config::{SeparatorKind, SeparatorSettings};

/// Build the one separation engine selected by configuration, if any.
pub fn create_separator(settings: &SeparatorSettings) -> Option<Box<dyn VocalSeparator>> {
    match settings.kind {
        SeparatorKind::Demucs => {
            let model = settings.model.as_deref().unwrap_or(DEFAULT_DEMUCS_MODEL);
            log::info!("Using Demucs vocal separation (model={model})");
            Some(Box::new(DemucsSeparator::new(
                settings.command.clone().unwrap_or_else(|| "demucs".into()),
                model,
                settings.device.clone(),
            )))
        }
        SeparatorKind::Spleeter => {
            let model = settings.model.as_deref().unwrap_or(DEFAULT_SPLEETER_MODEL);
            log::info!("Using Spleeter vocal separation (model={model})");
            Some(Box::new(SpleeterSeparator::new(
                settings.command.clone().unwrap_or_else(|| "spleeter".into()),
                model,
            )))
        }
        SeparatorKind::None => {
            log::info!("Vocal separation disabled");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SeparatorKind::Demucs, Some("demucs"))]
    #[case(SeparatorKind::Spleeter, Some("spleeter"))]
    #[case(SeparatorKind::None, None)]
    fn test_factory_selects_exactly_one(#[case] kind: SeparatorKind, #[case] name: Option<&str>) {
        let settings = SeparatorSettings {
            kind,
            ..SeparatorSettings::default()
        };
        let sep = create_separator(&settings);
        assert_eq!(sep.as_ref().map(|s| s.name()), name);
    }
}
