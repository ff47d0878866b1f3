//! The database adapter contract
//!
//! The engine treats storage as an opaque collaborator. Documents are stored
//! exactly as the engine hands them over (localized fields keep their
//! `{locale: value}` maps), so adapters never interpret field schemas.

use crate::error::DbResult;
use crate::transaction::TransactionId;
use async_trait::async_trait;
use folio_core::{Document, Where};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sort order for `find`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
	pub field: String,
	pub descending: bool,
}

impl Sort {
	/// Parse `field` or `-field`
	///
	/// # Examples
	///
	/// ```
	/// use folio_db::Sort;
	///
	/// let sort = Sort::parse("-createdAt");
	/// assert_eq!(sort.field, "createdAt");
	/// assert!(sort.descending);
	/// ```
	pub fn parse(input: &str) -> Self {
		match input.strip_prefix('-') {
			Some(field) => Self {
				field: field.to_string(),
				descending: true,
			},
			None => Self {
				field: input.to_string(),
				descending: false,
			},
		}
	}
}

/// Arguments of a collection query
#[derive(Debug, Clone, Default)]
pub struct FindArgs {
	pub where_: Option<Where>,
	pub sort: Option<Sort>,
	/// Page size; `None` returns every match on one page
	pub limit: Option<usize>,
	/// One-based page number
	pub page: Option<usize>,
	pub locale: Option<String>,
	pub transaction: Option<TransactionId>,
}

impl FindArgs {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_where(mut self, where_: Option<Where>) -> Self {
		self.where_ = where_;
		self
	}

	pub fn with_sort(mut self, sort: Option<Sort>) -> Self {
		self.sort = sort;
		self
	}

	pub fn with_limit(mut self, limit: Option<usize>) -> Self {
		self.limit = limit;
		self
	}

	pub fn with_page(mut self, page: Option<usize>) -> Self {
		self.page = page;
		self
	}

	pub fn with_locale(mut self, locale: Option<String>) -> Self {
		self.locale = locale;
		self
	}

	pub fn with_transaction(mut self, transaction: Option<TransactionId>) -> Self {
		self.transaction = transaction;
		self
	}
}

/// One page of query results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedDocs {
	pub docs: Vec<Document>,
	pub total_docs: usize,
	pub limit: usize,
	pub page: usize,
	pub total_pages: usize,
	pub has_prev_page: bool,
	pub has_next_page: bool,
}

impl PaginatedDocs {
	/// Slice `all` into the requested page
	pub fn paginate(all: Vec<Document>, limit: Option<usize>, page: Option<usize>) -> Self {
		let total_docs = all.len();
		let page = page.unwrap_or(1).max(1);
		let limit = limit.filter(|l| *l > 0).unwrap_or(total_docs.max(1));
		let total_pages = total_docs.div_ceil(limit).max(1);
		let docs = all
			.into_iter()
			.skip((page - 1) * limit)
			.take(limit)
			.collect();
		Self {
			docs,
			total_docs,
			limit,
			page,
			total_pages,
			has_prev_page: page > 1,
			has_next_page: page < total_pages,
		}
	}
}

/// Arguments of a global lookup
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
	pub where_: Option<Where>,
	pub locale: Option<String>,
	pub transaction: Option<TransactionId>,
}

/// Operations the engine needs from a storage backend
///
/// Every call takes the request's transaction, if one is open; writes made
/// under a transaction become visible to other callers only once it commits.
#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
	/// Open a transaction, or `None` when the backend does not support them
	async fn begin_transaction(&self) -> DbResult<Option<TransactionId>>;

	async fn commit_transaction(&self, transaction: &TransactionId) -> DbResult<()>;

	async fn rollback_transaction(&self, transaction: &TransactionId) -> DbResult<()>;

	async fn find(&self, collection: &str, args: FindArgs) -> DbResult<PaginatedDocs>;

	/// First document matching `where_`
	async fn find_one(
		&self,
		collection: &str,
		where_: &Where,
		transaction: Option<&TransactionId>,
	) -> DbResult<Option<Document>>;

	/// Insert a document, assigning an id when `data` carries none
	async fn create(
		&self,
		collection: &str,
		data: Document,
		transaction: Option<&TransactionId>,
	) -> DbResult<Document>;

	/// Replace the stored fields present in `data`
	async fn update_one(
		&self,
		collection: &str,
		id: &Value,
		data: Document,
		transaction: Option<&TransactionId>,
	) -> DbResult<Document>;

	async fn delete_one(
		&self,
		collection: &str,
		id: &Value,
		transaction: Option<&TransactionId>,
	) -> DbResult<Document>;

	/// Delete every matching document, returning how many were removed
	async fn delete_many(
		&self,
		collection: &str,
		where_: &Where,
		transaction: Option<&TransactionId>,
	) -> DbResult<usize>;

	async fn find_global(&self, slug: &str, args: GlobalArgs) -> DbResult<Option<Document>>;

	/// Create or replace a global's document
	async fn upsert_global(
		&self,
		slug: &str,
		data: Document,
		transaction: Option<&TransactionId>,
	) -> DbResult<Document>;
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	fn docs(n: usize) -> Vec<Document> {
		(0..n)
			.map(|i| json!({"id": i}).as_object().cloned().unwrap())
			.collect()
	}

	#[rstest]
	#[case(25, Some(10), Some(3), 5, 3, true, false)]
	#[case(25, Some(10), Some(1), 10, 3, false, true)]
	#[case(4, None, None, 4, 1, false, false)]
	#[case(0, Some(10), None, 0, 1, false, false)]
	fn test_paginate(
		#[case] total: usize,
		#[case] limit: Option<usize>,
		#[case] page: Option<usize>,
		#[case] on_page: usize,
		#[case] total_pages: usize,
		#[case] has_prev: bool,
		#[case] has_next: bool,
	) {
		let result = PaginatedDocs::paginate(docs(total), limit, page);
		assert_eq!(result.docs.len(), on_page);
		assert_eq!(result.total_docs, total);
		assert_eq!(result.total_pages, total_pages);
		assert_eq!(result.has_prev_page, has_prev);
		assert_eq!(result.has_next_page, has_next);
	}
}
