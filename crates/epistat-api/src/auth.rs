//! HTTP Basic-auth guard for `/reset`.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;

use crate::{AppState, error::ApiError};

/// Credentials accepted for administrative routes.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

impl AuthConfig {
  /// Whether `username:password` matches. An unparsable stored hash
  /// matches nothing.
  fn accepts(&self, username: &str, password: &str) -> bool {
    username == self.username
      && PasswordHash::new(&self.password_hash).is_ok_and(|hash| {
        Argon2::default().verify_password(password.as_bytes(), &hash).is_ok()
      })
  }
}

/// The `user:password` pair from a `Basic` authorization header.
fn basic_credentials(parts: &Parts) -> Option<(String, String)> {
  let encoded = parts.headers.get(AUTHORIZATION)?.to_str().ok()?.strip_prefix("Basic ")?;
  let decoded = String::from_utf8(B64.decode(encoded).ok()?).ok()?;
  let (user, password) = decoded.split_once(':')?;
  Some((user.to_owned(), password.to_owned()))
}

/// Present in a handler's arguments when the caller may use administrative
/// routes. Always granted when no [`AuthConfig`] is set.
pub struct Admin;

impl<S, C> FromRequestParts<AppState<S, C>> for Admin
where
  S: Send + Sync,
  C: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, C>,
  ) -> Result<Self, Self::Rejection> {
    let Some(config) = &state.admin else { return Ok(Admin) };
    match basic_credentials(parts) {
      Some((user, password)) if config.accepts(&user, &password) => Ok(Admin),
      _ => Err(ApiError::Unauthorized),
    }
  }
}
