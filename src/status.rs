//! Pipeline stage model for progress reporting.
//!
//! Unlike the localization-backed stage descriptions this is descended
//! from, messages here are plain English: this core has no localization
//! layer (spec's ambient stack keeps user-facing text in `tracing`/
//! `indicatif` output, not a message catalogue).

/// Total number of stages in the driver's pipeline.
pub const PIPELINE_STAGE_TOTAL: u32 = 6;

/// Enumerates pipeline stages in user-visible execution order (spec 4.G).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    /// Stage 1: read and parse the manifest.
    ManifestParsing = 1,
    /// Stage 2: resolve the dependency graph to exact versions.
    VersionResolution = 2,
    /// Stage 3: ensure every resolved package's source is present locally.
    SourceMaterialization = 3,
    /// Stage 4: discover the C++ toolchain.
    ToolchainDiscovery = 4,
    /// Stage 5: plan compile/archive/link build edges.
    BuildPlanning = 5,
    /// Stage 6: emit `build.ninja` and hand off to the `ninja` executable.
    NinjaSynthesisAndExecution = 6,
}

impl PipelineStage {
    /// All stages in pipeline order.
    pub const ALL: [Self; 6] = [
        Self::ManifestParsing,
        Self::VersionResolution,
        Self::SourceMaterialization,
        Self::ToolchainDiscovery,
        Self::BuildPlanning,
        Self::NinjaSynthesisAndExecution,
    ];

    /// Return the 1-based stage index for this variant.
    #[must_use]
    pub const fn index(self) -> u32 {
        self as u32
    }

    /// A short, human-readable description of this stage.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::ManifestParsing => "Reading manifest",
            Self::VersionResolution => "Resolving versions",
            Self::SourceMaterialization => "Fetching sources",
            Self::ToolchainDiscovery => "Locating toolchain",
            Self::BuildPlanning => "Planning build",
            Self::NinjaSynthesisAndExecution => "Running ninja",
        }
    }
}

/// Reports pipeline progress to the user. Implemented for a real terminal
/// via [`crate::driver`]'s `indicatif` progress bar, and trivially for
/// tests that don't care about progress output.
pub trait StatusReporter {
    /// Report entry into `stage`.
    fn report_stage(&self, stage: PipelineStage);
}

/// A [`StatusReporter`] that discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl StatusReporter for NullReporter {
    fn report_stage(&self, _stage: PipelineStage) {}
}

/// A [`StatusReporter`] that drives a single `indicatif` progress bar
/// through the pipeline's fixed stage count.
pub struct TerminalReporter {
    bar: indicatif::ProgressBar,
}

impl TerminalReporter {
    /// Create a reporter with a bar sized to the whole pipeline.
    #[must_use]
    pub fn new() -> Self {
        let bar = indicatif::ProgressBar::new(u64::from(PIPELINE_STAGE_TOTAL));
        bar.set_style(
            indicatif::ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar()),
        );
        Self { bar }
    }
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusReporter for TerminalReporter {
    fn report_stage(&self, stage: PipelineStage) {
        self.bar.set_position(u64::from(stage.index()) - 1);
        self.bar.set_message(stage.description());
        if stage.index() == PIPELINE_STAGE_TOTAL {
            self.bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_indices_are_one_based_and_ordered() {
        for (position, stage) in PipelineStage::ALL.iter().enumerate() {
            assert_eq!(stage.index(), u32::try_from(position + 1).unwrap());
        }
    }
}
