pub mod alignment;
pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::HarvestError;
pub use types::{
    AlignmentAxis, AlignmentVector, BusinessRecord, DuplicateGroup, GroupMember, RawBusiness,
    StateConfig, ValidationReport,
};
