pub mod core;
pub mod browser;
pub mod vault;
pub mod session;
pub mod alert;
pub mod audit;
pub mod status;
pub mod reconcile;
pub mod utils;
pub mod config;

// 重新导出核心类型
pub use crate::core::{
    Distributor,
    DistributorBuilder,
    DispatchId,
    DistributeError,
    OutcomeStatus,
    PlatformSpec,
    PlatformUploader,
    Result,
    TrackMetadata,
    UploadOutcome,
    UploadRequest,
};

pub use config::{DistributionConfig, OperatingMode};
pub use reconcile::{Mismatch, ReconcileReport, reconcile};
pub use status::{StatusAggregator, StatusSnapshot};
