//! Auth collection operations: token refresh and account unlock

use super::{after_operation, before_operation};
use crate::access::{AccessArgs, execute_access};
use crate::app::Folio;
use crate::config::CollectionConfig;
use crate::fields::flatten_scope;
use crate::hooks::{AfterRefreshArgs, OperationArgs, OperationResult, run_hooks};
use crate::operations::collections::FindByIdArgs;
use crate::request::Request;
use crate::transaction::with_transaction;
use chrono::{DateTime, Duration, Utc};
use folio_core::types::ID_KEY;
use folio_core::{ApiKind, Document, Error, Operation, Result, Where};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cookie a transport should set after a refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenCookie {
	pub name: String,
	pub value: String,
	/// Expiry in RFC 2822 form
	pub expires: String,
	pub path: String,
	pub http_only: bool,
	pub secure: bool,
	pub same_site: String,
	pub domain: Option<String>,
}

/// Outcome of [`Folio::refresh`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshResult {
	/// New token; `None` when the collection keeps tokens out of responses
	pub refreshed_token: Option<String>,
	/// Expiry as a unix timestamp
	pub exp: i64,
	pub user: Document,
	pub cookie: Option<TokenCookie>,
}

/// Arguments of [`Folio::unlock`]
#[derive(Debug, Clone, Default)]
pub struct UnlockArgs {
	pub email: Option<String>,
	pub override_access: bool,
}

impl UnlockArgs {
	pub fn new(email: impl Into<String>) -> Self {
		Self {
			email: Some(email.into()),
			override_access: false,
		}
	}

	pub fn with_override_access(mut self, override_access: bool) -> Self {
		self.override_access = override_access;
		self
	}
}

fn auth_collection<'a>(folio: &'a Folio, slug: &str) -> Result<&'a CollectionConfig> {
	let collection = folio.collection(slug)?;
	if !collection.is_auth() {
		return Err(Error::Api(format!("Collection '{slug}' does not have auth enabled")));
	}
	Ok(collection)
}

fn secret(folio: &Folio) -> Result<&[u8]> {
	let secret = folio.settings().secret.as_bytes();
	if secret.is_empty() {
		return Err(Error::Api("A secret is required to sign tokens".to_string()));
	}
	Ok(secret)
}

/// Claims carried by a token: id, collection, and every `save_to_jwt` field
fn token_claims(collection: &CollectionConfig, user: &Document, exp: i64) -> Document {
	let mut claims = Document::new();
	for field in flatten_scope(&collection.fields) {
		if field.options.save_to_jwt
			&& let Some(value) = user.get(field.name())
		{
			claims.insert(field.name().to_string(), value.clone());
		}
	}
	claims.insert(
		ID_KEY.to_string(),
		user.get(ID_KEY).cloned().unwrap_or(Value::Null),
	);
	claims.insert("collection".to_string(), Value::String(collection.slug.clone()));
	claims.insert("exp".to_string(), Value::from(exp));
	claims
}

impl Folio {
	/// Sign a token for `user`, returning it with its expiry
	///
	/// # Examples
	///
	/// ```
	/// use folio_cms::prelude::*;
	/// use folio_conf::Settings;
	/// use serde_json::json;
	///
	/// let folio = Folio::builder()
	///     .settings(Settings { secret: "s3cret".into(), ..Default::default() })
	///     .collection(CollectionConfig::new("users").auth(AuthConfig::default()))
	///     .database(folio_db::MemoryAdapter::new())
	///     .build()
	///     .unwrap();
	///
	/// let user = json!({"id": "u1", "email": "a@b.co"}).as_object().cloned().unwrap();
	/// let (token, exp) = folio.sign_token("users", &user).unwrap();
	/// let claims = folio.verify_token(&token).unwrap();
	/// assert_eq!(claims["email"], json!("a@b.co"));
	/// assert_eq!(claims["exp"], json!(exp));
	/// ```
	pub fn sign_token(&self, slug: &str, user: &Document) -> Result<(String, i64)> {
		let collection = auth_collection(self, slug)?;
		let lifetime = collection.auth.as_ref().map_or(0, |auth| auth.token_expiration);
		let exp = (Utc::now() + Duration::seconds(lifetime)).timestamp();
		let claims = token_claims(collection, user, exp);
		let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret(self)?))
			.map_err(|e| Error::Api(format!("Failed to sign token: {e}")))?;
		Ok((token, exp))
	}

	/// Check a token's signature and expiry, returning its claims
	pub fn verify_token(&self, token: &str) -> Result<Document> {
		decode::<Document>(
			token,
			&DecodingKey::from_secret(secret(self)?),
			&Validation::default(),
		)
		.map(|data| data.claims)
		.map_err(|e| {
			tracing::debug!(error = %e, "token rejected");
			Error::Forbidden(self.t("error:invalidToken"))
		})
	}

	/// Issue a fresh token for the request's user
	///
	/// The user is reloaded at the collection's auth depth (0 for GraphQL).
	/// The result describes the cookie to set instead of writing it.
	pub async fn refresh(&self, req: &Request, slug: &str) -> Result<RefreshResult> {
		let collection = auth_collection(self, slug)?;
		let Some(auth) = collection.auth.as_ref() else {
			return Err(Error::Api(format!("Collection '{slug}' does not have auth enabled")));
		};
		with_transaction(self, req, async {
			before_operation(
				req,
				&collection.hooks.before_operation,
				OperationArgs {
					collection: slug.to_string(),
					operation: Operation::Refresh,
					id: None,
					data: None,
					where_: None,
				},
			)
			.await?;

			let forbidden = || Error::Forbidden(self.t("error:notAllowedToPerformAction"));
			let user = req.user().ok_or_else(forbidden)?;
			let token = req.token().ok_or_else(forbidden)?;
			let claims = self.verify_token(token)?;
			if claims.get("collection").and_then(Value::as_str) != Some(slug) {
				return Err(forbidden());
			}

			let depth = if req.api() == ApiKind::GraphQl { 0 } else { auth.depth };
			let user_doc = self
				.find_by_id(
					req,
					slug,
					FindByIdArgs::new(user.id.clone())
						.with_depth(depth)
						.with_override_access(true),
				)
				.await?
				.ok_or_else(forbidden)?;

			let (refreshed, exp) = self.sign_token(slug, &user_doc)?;
			let expires = DateTime::<Utc>::from_timestamp(exp, 0)
				.map(|at| at.to_rfc2822())
				.unwrap_or_default();
			let result = RefreshResult {
				refreshed_token: Some(refreshed.clone()),
				exp,
				user: user_doc,
				cookie: Some(TokenCookie {
					name: self.settings().token_cookie_name(),
					value: refreshed.clone(),
					expires,
					path: "/".to_string(),
					http_only: true,
					secure: auth.cookies.secure,
					same_site: auth.cookies.same_site.as_str().to_string(),
					domain: auth.cookies.domain.clone(),
				}),
			};
			tracing::debug!(collection = %slug, exp, "refreshed token");

			let result = run_hooks("afterRefresh", &collection.hooks.after_refresh, result, |result| {
				AfterRefreshArgs {
					result: result.clone(),
					token: refreshed.clone(),
					exp,
					req: req.clone(),
				}
			})
			.await?;

			let mut result = match after_operation(
				req,
				&collection.hooks.after_operation,
				Operation::Refresh,
				OperationResult::Refresh(result),
			)
			.await?
			{
				OperationResult::Refresh(result) => result,
				_ => {
					return Err(Error::hook(
						"afterOperation",
						"hook replaced a refresh result with a different kind",
					));
				}
			};
			if auth.remove_token_from_responses {
				result.refreshed_token = None;
			}
			Ok(result)
		})
		.await
	}

	/// Clear the login lockout of the user with the given email
	///
	/// Returns whether a user was found and unlocked.
	pub async fn unlock(&self, req: &Request, slug: &str, args: UnlockArgs) -> Result<bool> {
		let collection = auth_collection(self, slug)?;
		with_transaction(self, req, async {
			let mut data = Document::new();
			if let Some(email) = &args.email {
				data.insert("email".to_string(), Value::String(email.clone()));
			}
			before_operation(
				req,
				&collection.hooks.before_operation,
				OperationArgs {
					collection: slug.to_string(),
					operation: Operation::Unlock,
					id: None,
					data: Some(data),
					where_: None,
				},
			)
			.await?;

			if !args.override_access {
				execute_access(self, &collection.access.unlock, AccessArgs::new(req), false).await?;
			}

			let Some(email) = args.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) else {
				return Err(Error::Api(self.t("error:missingEmail")));
			};
			let transaction = req.transaction();
			let user = self
				.db()
				.find_one(
					slug,
					&Where::field("email").equals(email.to_lowercase()),
					transaction.as_ref(),
				)
				.await?;

			let unlocked = match user.as_ref().and_then(|u| u.get(ID_KEY)) {
				Some(id) => {
					let mut reset = Document::new();
					reset.insert("loginAttempts".to_string(), Value::from(0));
					reset.insert("lockUntil".to_string(), Value::Null);
					self.db()
						.update_one(slug, id, reset, transaction.as_ref())
						.await?;
					tracing::debug!(collection = %slug, id = %id, "unlocked user");
					true
				}
				None => false,
			};

			match after_operation(
				req,
				&collection.hooks.after_operation,
				Operation::Unlock,
				OperationResult::Unlocked(unlocked),
			)
			.await?
			{
				OperationResult::Unlocked(unlocked) => Ok(unlocked),
				_ => Err(Error::hook(
					"afterOperation",
					"hook replaced an unlock result with a different kind",
				)),
			}
		})
		.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::AuthConfig;
	use crate::request::User;
	use folio_conf::Settings;
	use folio_db::{FindArgs, MemoryAdapter};
	use rstest::{fixture, rstest};
	use serde_json::json;

	#[fixture]
	fn folio() -> Folio {
		Folio::builder()
			.settings(Settings {
				secret: "test-secret".to_string(),
				..Default::default()
			})
			.collection(
				CollectionConfig::new("users")
					.auth(AuthConfig::default().with_remove_token_from_responses())
					.unlock_access(true),
			)
			.database(MemoryAdapter::new())
			.build()
			.unwrap()
	}

	async fn seed_user(folio: &Folio) -> Document {
		let data = json!({"id": "u1", "email": "ann@example.com", "loginAttempts": 5, "lockUntil": "2999-01-01T00:00:00.000Z"});
		folio
			.db()
			.create("users", data.as_object().cloned().unwrap(), None)
			.await
			.unwrap()
	}

	#[rstest]
	#[tokio::test]
	async fn test_refresh_requires_token(folio: Folio) {
		seed_user(&folio).await;
		let req = Request::builder(&folio).user(User::new("u1", "users")).build();
		assert!(matches!(folio.refresh(&req, "users").await, Err(Error::Forbidden(_))));
	}

	#[rstest]
	#[tokio::test]
	async fn test_refresh_strips_token_but_keeps_cookie(folio: Folio) {
		let user = seed_user(&folio).await;
		let (token, _) = folio.sign_token("users", &user).unwrap();
		let req = Request::builder(&folio)
			.user(User::new("u1", "users"))
			.token(token)
			.build();

		let result = folio.refresh(&req, "users").await.unwrap();
		assert!(result.refreshed_token.is_none());
		let cookie = result.cookie.unwrap();
		assert_eq!(cookie.name, "folio-token");
		assert_eq!(folio.verify_token(&cookie.value).unwrap()["id"], json!("u1"));
		assert!(!result.user.contains_key("loginAttempts"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_unlock(folio: Folio) {
		seed_user(&folio).await;
		let req = Request::builder(&folio).build();

		let missing = folio.unlock(&req, "users", UnlockArgs::default()).await;
		assert!(matches!(missing, Err(Error::Api(_))));

		assert!(folio.unlock(&req, "users", UnlockArgs::new("Ann@Example.com")).await.unwrap());
		let stored = folio.db().find("users", FindArgs::new()).await.unwrap().docs;
		assert_eq!(stored[0]["loginAttempts"], json!(0));
		assert_eq!(stored[0]["lockUntil"], json!(null));

		assert!(!folio.unlock(&req, "users", UnlockArgs::new("nobody@example.com")).await.unwrap());
	}
}
