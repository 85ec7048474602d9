use std::fmt;

/// One ordered step of the reconstruction pipeline.
///
/// The declaration order is the execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    LoadExisting,
    ConvertInput,
    GenerateMasks,
    Reconstruct,
    ConvertOutput,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 5] = [
        Stage::LoadExisting,
        Stage::ConvertInput,
        Stage::GenerateMasks,
        Stage::Reconstruct,
        Stage::ConvertOutput,
    ];

    /// 1-based position of this stage in the pipeline.
    pub fn number(self) -> usize {
        self as usize + 1
    }

    pub fn total() -> usize {
        Self::ALL.len()
    }

    pub fn description(self) -> &'static str {
        match self {
            Stage::LoadExisting => "Loading existing files",
            Stage::ConvertInput => "Converting DICOMs to NifTI",
            Stage::GenerateMasks => "Generating masks from NifTI images",
            Stage::Reconstruct => "Reconstruct high resolution 3D volume from input NifTI",
            Stage::ConvertOutput => "Convert NifTI output to DICOM",
        }
    }

    /// Human-readable progress label, e.g. `"2/5 Converting DICOMs to NifTI"`.
    pub fn label(self) -> String {
        format!("{}/{} {}", self.number(), Self::total(), self.description())
    }

    pub fn next(self) -> Option<Stage> {
        Self::ALL.get(self.number()).copied()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::LoadExisting => "load-existing",
            Stage::ConvertInput => "convert-input",
            Stage::GenerateMasks => "generate-masks",
            Stage::Reconstruct => "reconstruct",
            Stage::ConvertOutput => "convert-output",
        };
        f.write_str(name)
    }
}

/// How a pipeline run ended.
///
/// The view only ever sees a single completion signal; this value is
/// returned to whoever owns the background run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// All five stages ran successfully.
    Finished,
    /// A stop was requested and honoured at a stage boundary.
    Stopped,
    /// A stage raised a domain error; the remaining stages were skipped.
    Failed,
}
