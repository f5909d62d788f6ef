pub mod completeness;
pub mod documents;
pub mod domain;
pub mod error;
pub mod observable;
pub mod ports;
pub mod profile;
pub mod session;

pub use completeness::compute_completeness;
pub use documents::DocumentUploader;
pub use domain::{
    AuthSession, Document, FinancialGoals, FinancialProfile, Identity, InvestmentStrategy,
    OAuthProvider, PersonalInfo, ProfileSnapshot, ProfileVersion, VersionKind,
};
pub use error::{ProfileError, ProfileResult};
pub use observable::{Observable, Subscription};
pub use ports::{BlobStorage, IdentityGateway, PortError, PortResult, ProfileRepository, UploadOptions};
pub use profile::ProfileStore;
pub use session::SessionStore;
