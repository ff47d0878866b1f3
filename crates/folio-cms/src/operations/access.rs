//! Permission introspection
//!
//! Evaluates every rule that applies to the request's user and reports the
//! outcome as a tree, so a client can hide what the user cannot do.

use crate::access::{Access, AccessArgs, AccessResult};
use crate::app::Folio;
use crate::fields::{Field, FieldKind, flatten_scope};
use crate::request::Request;
use folio_core::Where;
use futures::FutureExt;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde::Serialize;

/// Outcome of one rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Permission {
	pub permission: bool,
	/// Present when the rule allows only matching documents
	#[serde(rename = "where", skip_serializing_if = "Option::is_none")]
	pub where_: Option<Where>,
}

impl Permission {
	fn from_result(result: AccessResult) -> Self {
		match result {
			AccessResult::Bool(permission) => Self {
				permission,
				where_: None,
			},
			AccessResult::Where(w) => Self {
				permission: true,
				where_: Some(w),
			},
		}
	}
}

/// Permissions of one field; nested fields appear under `fields`, block
/// fields per block slug under `blocks`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldPermissions {
	pub create: Permission,
	pub read: Permission,
	pub update: Permission,
	#[serde(skip_serializing_if = "IndexMap::is_empty")]
	pub fields: IndexMap<String, FieldPermissions>,
	#[serde(skip_serializing_if = "IndexMap::is_empty")]
	pub blocks: IndexMap<String, IndexMap<String, FieldPermissions>>,
}

/// Permissions of a collection or global
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityPermissions {
	/// Keyed by operation name
	pub operations: IndexMap<String, Permission>,
	pub fields: IndexMap<String, FieldPermissions>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
	pub can_access_admin: bool,
	pub collections: IndexMap<String, EntityPermissions>,
	pub globals: IndexMap<String, EntityPermissions>,
}

/// Evaluate a rule for introspection; a failing predicate denies
async fn evaluate(rule: &Access, req: &Request) -> Permission {
	match rule.evaluate(AccessArgs::new(req)).await {
		Ok(result) => Permission::from_result(result),
		Err(err) => {
			tracing::debug!(error = %err, "access predicate failed during introspection");
			Permission {
				permission: false,
				where_: None,
			}
		}
	}
}

/// Entity-level outcomes a field without its own rule inherits
#[derive(Clone, Copy)]
struct Inherited<'a> {
	create: &'a Permission,
	read: &'a Permission,
	update: &'a Permission,
}

async fn field_rule(rule: Option<&Access>, inherited: &Permission, req: &Request) -> Permission {
	match rule {
		Some(rule) => evaluate(rule, req).await,
		None => inherited.clone(),
	}
}

fn field_permissions<'a>(
	req: &'a Request,
	fields: &'a [Field],
	inherited: Inherited<'a>,
) -> BoxFuture<'a, IndexMap<String, FieldPermissions>> {
	async move {
		let mut out = IndexMap::new();
		for field in flatten_scope(fields) {
			let access = &field.options.access;
			let mut permissions = FieldPermissions {
				create: field_rule(access.create.as_ref(), inherited.create, req).await,
				read: field_rule(access.read.as_ref(), inherited.read, req).await,
				update: field_rule(access.update.as_ref(), inherited.update, req).await,
				fields: IndexMap::new(),
				blocks: IndexMap::new(),
			};
			match &field.kind {
				FieldKind::Group { fields } | FieldKind::Array { fields, .. } => {
					permissions.fields = field_permissions(req, fields, inherited).await;
				}
				FieldKind::Blocks { blocks, .. } => {
					for block in blocks {
						let nested = field_permissions(req, &block.fields, inherited).await;
						permissions.blocks.insert(block.slug.clone(), nested);
					}
				}
				_ => {}
			}
			out.insert(field.name().to_string(), permissions);
		}
		for field in fields {
			if let FieldKind::Tabs { tabs } = &field.kind {
				for tab in tabs {
					if let Some(name) = &tab.name {
						let nested = field_permissions(req, &tab.fields, inherited).await;
						out.insert(
							name.clone(),
							FieldPermissions {
								create: inherited.create.clone(),
								read: inherited.read.clone(),
								update: inherited.update.clone(),
								fields: nested,
								blocks: IndexMap::new(),
							},
						);
					}
				}
			}
		}
		out
	}
	.boxed()
}

impl Folio {
	/// Everything the request's user may do
	///
	/// # Examples
	///
	/// ```
	/// use folio_cms::prelude::*;
	///
	/// # tokio_test::block_on(async {
	/// let folio = Folio::builder()
	///     .collection(
	///         CollectionConfig::new("posts")
	///             .field(Field::text("notes").read_access(Access::deny()))
	///             .read_access(Access::allow()),
	///     )
	///     .database(folio_db::MemoryAdapter::new())
	///     .build()
	///     .unwrap();
	/// let req = Request::builder(&folio).build();
	///
	/// let permissions = folio.access(&req).await;
	/// let posts = &permissions.collections["posts"];
	/// assert!(posts.operations["read"].permission);
	/// assert!(!posts.operations["create"].permission);
	/// assert!(!posts.fields["notes"].read.permission);
	/// # });
	/// ```
	pub async fn access(&self, req: &Request) -> Permissions {
		let can_access_admin = match (req.user(), self.admin_user()) {
			(Some(user), Some(admin)) if user.collection == admin.slug => match &admin.access.admin {
				Some(rule) => evaluate(rule, req).await.permission,
				None => true,
			},
			_ => false,
		};

		let mut collections = IndexMap::new();
		for collection in self.collections() {
			let rules = &collection.access;
			let create = evaluate(&rules.create, req).await;
			let read = evaluate(&rules.read, req).await;
			let update = evaluate(&rules.update, req).await;
			let delete = evaluate(&rules.delete, req).await;

			let fields = field_permissions(
				req,
				&collection.fields,
				Inherited {
					create: &create,
					read: &read,
					update: &update,
				},
			)
			.await;
			let mut operations = IndexMap::new();
			operations.insert("create".to_string(), create);
			operations.insert("read".to_string(), read);
			operations.insert("update".to_string(), update);
			operations.insert("delete".to_string(), delete);
			if collection.is_auth() {
				operations.insert("unlock".to_string(), evaluate(&rules.unlock, req).await);
			}
			collections.insert(collection.slug.clone(), EntityPermissions { operations, fields });
		}

		let mut globals = IndexMap::new();
		for global in self.globals() {
			let read = evaluate(&global.access.read, req).await;
			let update = evaluate(&global.access.update, req).await;
			let fields = field_permissions(
				req,
				&global.fields,
				Inherited {
					create: &update,
					read: &read,
					update: &update,
				},
			)
			.await;
			let mut operations = IndexMap::new();
			operations.insert("read".to_string(), read);
			operations.insert("update".to_string(), update);
			globals.insert(global.slug.clone(), EntityPermissions { operations, fields });
		}

		tracing::debug!(
			collections = collections.len(),
			globals = globals.len(),
			can_access_admin,
			"evaluated permissions"
		);
		Permissions {
			can_access_admin,
			collections,
			globals,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::access::AccessResult;
	use crate::config::{AuthConfig, CollectionConfig};
	use crate::fields::{Block, Tab};
	use crate::request::User;
	use folio_db::MemoryAdapter;
	use rstest::rstest;
	use serde_json::json;

	fn folio() -> Folio {
		let owner_only = Access::from_fn(|args: AccessArgs| async move {
			Ok(match args.req.user() {
				Some(user) => AccessResult::Where(Where::field("owner").equals(user.id.clone())),
				None => AccessResult::Bool(false),
			})
		});
		Folio::builder()
			.collection(
				CollectionConfig::new("users")
					.auth(AuthConfig::default())
					.admin_access(Access::from_fn(|args: AccessArgs| async move {
						Ok(AccessResult::Bool(
							args.req.user().and_then(|u| u.get("role")) == Some(&json!("admin")),
						))
					})),
			)
			.collection(
				CollectionConfig::new("pages")
					.update_access(owner_only)
					.fields([
						Field::blocks(
							"layout",
							vec![Block::new("quote", vec![Field::text("text").update_access(false)])],
						),
						Field::tabs(vec![Tab::named("seo", vec![Field::text("title")])]),
					]),
			)
			.database(MemoryAdapter::new())
			.build()
			.unwrap()
	}

	#[rstest]
	#[tokio::test]
	async fn test_partial_and_nested_permissions() {
		let folio = folio();
		let user = User::new("u1", "users").with_data(json!({"role": "editor"}).as_object().cloned().unwrap());
		let req = Request::builder(&folio).user(user).build();
		let permissions = folio.access(&req).await;

		assert!(!permissions.can_access_admin);
		let pages = &permissions.collections["pages"];
		assert_eq!(
			pages.operations["update"].where_,
			Some(Where::field("owner").equals("u1"))
		);
		let quote = &pages.fields["layout"].blocks["quote"];
		assert!(!quote["text"].update.permission);
		assert!(pages.fields["seo"].fields.contains_key("title"));
		assert!(permissions.collections["users"].operations.contains_key("unlock"));

		let json = serde_json::to_value(&permissions).unwrap();
		assert_eq!(json["canAccessAdmin"], json!(false));
		assert_eq!(json["collections"]["pages"]["operations"]["read"], json!({"permission": true}));
	}

	#[rstest]
	#[tokio::test]
	async fn test_admin_access_rule() {
		let folio = folio();
		let admin = User::new("u2", "users").with_data(json!({"role": "admin"}).as_object().cloned().unwrap());
		let req = Request::builder(&folio).user(admin).build();
		assert!(folio.access(&req).await.can_access_admin);
	}
}
