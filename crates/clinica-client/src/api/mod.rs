//! API endpoint implementations.

mod auth;
mod odontologos;
mod pacientes;
mod usuarios;

pub use auth::AuthApi;
pub use odontologos::OdontologosApi;
pub use pacientes::PacientesApi;
pub use usuarios::UsuariosApi;
