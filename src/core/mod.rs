mod distributor;
pub(crate) mod errors;
mod platform;
pub(crate) mod types;
mod uploader;

pub use distributor::{Distributor, DistributorBuilder};
pub use errors::{DistributeError, Result};
pub use platform::{CredentialKind, FormSelectors, PlatformSpec};
pub use types::{
    DispatchId,
    ExternalSummary,
    OutcomeStatus,
    PersistenceCounts,
    TrackMetadata,
    UploadOutcome,
    UploadRequest,
};
pub use uploader::PlatformUploader;
