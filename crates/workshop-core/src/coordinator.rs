use crate::host::ExternalAutomation;

/// Suppresses competing automation features while a run is active and puts
/// them back afterwards.
///
/// `suppress` records each feature's prior flag exactly once; repeated calls
/// while already suppressed are no-ops. `restore` re-enables only features
/// that were enabled when suppressed, then forgets the saved flags.
#[derive(Debug, Default)]
pub struct ExternalAutomationCoordinator {
    features: Vec<Box<dyn ExternalAutomation>>,
    saved: Option<Vec<Option<bool>>>,
}

impl ExternalAutomationCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feature(mut self, feature: Box<dyn ExternalAutomation>) -> Self {
        self.add_feature(feature);
        self
    }

    pub fn add_feature(&mut self, feature: Box<dyn ExternalAutomation>) {
        self.features.push(feature);
    }

    pub fn is_suppressed(&self) -> bool {
        self.saved.is_some()
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|feature| feature.name())
    }

    pub fn suppress(&mut self) {
        if self.saved.is_some() {
            return;
        }
        let saved = self
            .features
            .iter_mut()
            .map(|feature| {
                let previous = feature.disable_if_enabled();
                tracing::debug!(feature = feature.name(), ?previous, "suppressed external automation");
                previous
            })
            .collect();
        self.saved = Some(saved);
    }

    pub fn restore(&mut self) {
        let Some(saved) = self.saved.take() else {
            return;
        };
        for (feature, previous) in self.features.iter_mut().zip(saved) {
            if previous == Some(true) {
                tracing::debug!(feature = feature.name(), "restoring external automation");
                feature.enable();
            }
        }
    }
}
