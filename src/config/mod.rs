//! Manifest module for the reconciliation host.
//!
//! This module handles all manifest-related functionality:
//! - Parsing and deserializing `converge.yaml`
//! - Validation of declared resources
//! - Payload fingerprints for plans and reports

mod hash;
mod parser;
mod spec;
mod validator;

pub use hash::PayloadHasher;
pub use parser::{
    DEFAULT_MANIFEST_FILES, ENV_CLUSTER_NAME, ENV_CLUSTER_URL, ENV_DRY_RUN, ManifestParser,
    find_manifest_file,
};
pub use spec::{
    Defaults, IamGroupDecl, IamResourceDecl, IamUserDecl, Manifest, MarathonDecl, PackageDecl,
    PackageRepoDecl, Presence, QuotaDecl, ResourceDecl, SecretDecl,
};
pub use validator::{ManifestValidator, ValidationError, ValidationResult};
