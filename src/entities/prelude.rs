pub use super::licenses::Entity as Licenses;
pub use super::users::Entity as Users;
