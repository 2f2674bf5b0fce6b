//! Advisory progress reporting for imports.

use tracing::debug;

/// Fixed stages of the import pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ImportStage {
    Read,
    Parse,
    Validate,
    Diff,
    Merge,
    Save,
    Done,
}

impl ImportStage {
    /// Percentage shown when the stage starts.
    #[must_use]
    pub const fn percent(&self) -> u8 {
        match self {
            ImportStage::Read => 10,
            ImportStage::Parse => 30,
            ImportStage::Validate => 40,
            ImportStage::Diff => 50,
            ImportStage::Merge => 70,
            ImportStage::Save => 90,
            ImportStage::Done => 100,
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            ImportStage::Read => "reading file",
            ImportStage::Parse => "parsing",
            ImportStage::Validate => "validating",
            ImportStage::Diff => "comparing with local data",
            ImportStage::Merge => "merging",
            ImportStage::Save => "saving",
            ImportStage::Done => "done",
        }
    }
}

/// Observer for import progress. Purely informational.
pub trait ImportProgress: Send + Sync {
    fn on_stage(&self, stage: ImportStage);
}

/// Discards progress updates.
pub struct NoopProgress;

impl ImportProgress for NoopProgress {
    fn on_stage(&self, _stage: ImportStage) {}
}

/// Logs progress updates at debug level.
pub struct TracingProgress;

impl ImportProgress for TracingProgress {
    fn on_stage(&self, stage: ImportStage) {
        debug!("import {}% ({})", stage.percent(), stage.label());
    }
}
