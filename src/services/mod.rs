pub mod binding;
pub use binding::BindingDecision;

pub mod expiry;
pub use expiry::ExpiryState;

pub mod keygen;

pub mod license_service;
pub mod license_service_impl;
pub use license_service::{
    ExpiryView, LicenseError, LicenseService, LicenseView, Rejection, Verdict,
};
pub use license_service_impl::SeaOrmLicenseService;

pub mod admin_service;
pub mod admin_service_impl;
pub use admin_service::{AdminAction, AdminError, AdminService, MutationResult};
pub use admin_service_impl::SeaOrmAdminService;

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, LoginResult, RegisterResult};
pub use auth_service_impl::SeaOrmAuthService;
