use clap::ValueEnum;
use kiln_build::{CyclePolicy, DynamicImportPolicy, HashAlgorithm, VersionPlacement};

/// Digest algorithm
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum HashArg {
    #[value(name = "blake3")]
    Blake3,
    #[value(name = "sha256")]
    Sha256,
}

/// Version placement in public URLs
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum PlacementArg {
    /// `lazy.js?v=1a2b3c4d`
    ///
    /// File names stay stable; caches key on the full URL.
    #[value(name = "query")]
    Query,

    /// `lazy-1a2b3c4d.js`
    #[value(name = "filename")]
    Filename,
}

/// Dynamic import edges and versioning
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum DynamicImportsArg {
    /// Lazily loaded code does not invalidate its importer; it is reached
    /// through the emitted import map instead
    #[value(name = "exclude")]
    Exclude,

    /// Dynamic targets invalidate their importers like static ones
    #[value(name = "include")]
    Include,
}

/// Static import cycles
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum CyclesArg {
    /// Version every member of a cycle from the cycle's raw content
    #[value(name = "seed-with-raw-hash")]
    SeedWithRawHash,

    /// Fail the build
    #[value(name = "reject")]
    Reject,
}

impl From<HashArg> for HashAlgorithm {
    fn from(arg: HashArg) -> Self {
        match arg {
            HashArg::Blake3 => HashAlgorithm::Blake3,
            HashArg::Sha256 => HashAlgorithm::Sha256,
        }
    }
}

impl From<PlacementArg> for VersionPlacement {
    fn from(arg: PlacementArg) -> Self {
        match arg {
            PlacementArg::Query => VersionPlacement::Query,
            PlacementArg::Filename => VersionPlacement::Filename,
        }
    }
}

impl From<DynamicImportsArg> for DynamicImportPolicy {
    fn from(arg: DynamicImportsArg) -> Self {
        match arg {
            DynamicImportsArg::Exclude => DynamicImportPolicy::Exclude,
            DynamicImportsArg::Include => DynamicImportPolicy::Include,
        }
    }
}

impl From<CyclesArg> for CyclePolicy {
    fn from(arg: CyclesArg) -> Self {
        match arg {
            CyclesArg::SeedWithRawHash => CyclePolicy::SeedWithRawHash,
            CyclesArg::Reject => CyclePolicy::Reject,
        }
    }
}
