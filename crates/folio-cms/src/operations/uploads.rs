//! Upload file storage
//!
//! Files of an upload collection live under `config_dir/static_dir`. The
//! document records the stored `filename`; generated sizes are recorded
//! under `sizes.<name>.filename`.

use crate::app::Folio;
use crate::config::UploadConfig;
use crate::request::UploadedFile;
use folio_core::{Document, Error, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;

fn upload_dir(folio: &Folio, upload: &UploadConfig) -> PathBuf {
	folio.settings().config_dir.join(&upload.static_dir)
}

fn file_io(folio: &Folio, key: &str, source: std::io::Error) -> Error {
	Error::FileIo {
		message: folio.t(key),
		source,
	}
}

/// Strip directories from a client-supplied name
fn sanitize_filename(name: &str) -> String {
	let base = Path::new(name)
		.file_name()
		.and_then(|n| n.to_str())
		.unwrap_or_default()
		.trim();
	if base.is_empty() || base.starts_with('.') {
		format!("file{base}")
	} else {
		base.to_string()
	}
}

/// First free name in `dir`: `a.png`, `a-1.png`, `a-2.png`, ...
async fn unique_filename(dir: &Path, name: &str) -> std::io::Result<String> {
	let (stem, ext) = match name.rsplit_once('.') {
		Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
		_ => (name, None),
	};
	let mut candidate = name.to_string();
	let mut counter = 0;
	while fs::try_exists(dir.join(&candidate)).await? {
		counter += 1;
		candidate = match ext {
			Some(ext) => format!("{stem}-{counter}.{ext}"),
			None => format!("{stem}-{counter}"),
		};
	}
	Ok(candidate)
}

/// Write the request's file and describe it for the document
pub(crate) async fn store_file(
	folio: &Folio,
	upload: &UploadConfig,
	file: &UploadedFile,
) -> Result<Document> {
	let dir = upload_dir(folio, upload);
	fs::create_dir_all(&dir)
		.await
		.map_err(|e| file_io(folio, "error:uploadingFile", e))?;

	let filename = unique_filename(&dir, &sanitize_filename(&file.name))
		.await
		.map_err(|e| file_io(folio, "error:uploadingFile", e))?;
	fs::write(dir.join(&filename), &file.data)
		.await
		.map_err(|e| file_io(folio, "error:uploadingFile", e))?;
	tracing::debug!(filename = %filename, size = file.data.len(), "stored upload");

	let mut data = Document::new();
	data.insert("filename".to_string(), Value::String(filename));
	data.insert("mimeType".to_string(), Value::String(file.mime_type.clone()));
	data.insert("filesize".to_string(), Value::from(file.data.len()));
	Ok(data)
}

/// Stored file names of a document: the main file and every size
fn associated_filenames(doc: &Document) -> Vec<String> {
	let mut names: Vec<String> = doc
		.get("filename")
		.and_then(Value::as_str)
		.map(str::to_string)
		.into_iter()
		.collect();
	if let Some(Value::Object(sizes)) = doc.get("sizes") {
		names.extend(
			sizes
				.values()
				.filter_map(|size| size.get("filename").and_then(Value::as_str))
				.map(str::to_string),
		);
	}
	names
}

/// Remove the files of a deleted document
///
/// Files already gone are skipped.
pub(crate) async fn delete_associated_files(
	folio: &Folio,
	upload: &UploadConfig,
	doc: &Document,
) -> Result<()> {
	let dir = upload_dir(folio, upload);
	for name in associated_filenames(doc) {
		let path = dir.join(sanitize_filename(&name));
		let exists = fs::try_exists(&path)
			.await
			.map_err(|e| file_io(folio, "error:deletingFile", e))?;
		if !exists {
			tracing::debug!(path = %path.display(), "upload already absent");
			continue;
		}
		fs::remove_file(&path)
			.await
			.map_err(|e| file_io(folio, "error:deletingFile", e))?;
	}
	Ok(())
}
