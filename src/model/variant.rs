use serde::Deserialize;

/// Provisioning flavours sharing a single step plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// General development container.
    #[default]
    General,
    /// General container plus GPU monitoring tooling.
    Gpu,
}

impl Variant {
    pub fn label(&self) -> &'static str {
        match self {
            Variant::General => "general",
            Variant::Gpu => "gpu",
        }
    }

    /// An empty filter means "every variant".
    pub fn matches(&self, filter: &[Variant]) -> bool {
        filter.is_empty() || filter.contains(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_matches_every_variant() {
        assert!(Variant::General.matches(&[]));
        assert!(Variant::Gpu.matches(&[]));
    }

    #[test]
    fn gpu_only_filter() {
        assert!(Variant::Gpu.matches(&[Variant::Gpu]));
        assert!(!Variant::General.matches(&[Variant::Gpu]));
    }
}
