//! Hybrid metadata + vector store
//!
//! Owns the relational tables for files and chunks plus the in-memory ANN
//! index over file summary vectors. The relational store is authoritative;
//! the index is rebuilt from it and search/rebuild serialize on a
//! reader-writer lock.

use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use rusqlite::{OptionalExtension, Row};
use tracing::{debug, info, warn};

use magicfolder_common::FileType;

use crate::ann::AnnIndex;
use crate::error::{DatabaseErrorExt, MetaDataError, MetaDataResult, text_conversion_error};
use crate::models::{
    BasicFileMetadata, ChunkSearchResult, FileMetadata, FileSearchResult, ProcessedChunk,
    ProcessingStatus, format_timestamp, parse_timestamp,
};
use crate::pool::ConnectionPool;
use crate::vector::{VECTOR_BLOB_LEN, decode_vector, encode_vector, validate_dimension};

const FILE_COLUMNS: &str = "id, path, original_path, file_hash, processing_status, tags, \
     last_modified, created_at, file_type, file_size, summary_vector_blob, \
     suggested_category, suggested_filename";

/// Metadata store over the shared connection pool
pub struct MetadataStore {
    pool: Arc<ConnectionPool>,
    file_index: RwLock<AnnIndex>,
}

impl MetadataStore {
    /// Create the store and build the file-level ANN index from the database
    ///
    /// # Errors
    ///
    /// Returns classified database errors if the initial index rebuild fails.
    pub fn new(pool: Arc<ConnectionPool>) -> MetaDataResult<Self> {
        let store = Self {
            pool,
            file_index: RwLock::new(AnnIndex::new(0)),
        };
        store.rebuild_file_index()?;
        Ok(store)
    }

    /// Insert or update a file row by path, returning its stable id
    ///
    /// On update the AI-derived fields (summary vector, suggested category and
    /// filename) are cleared: the content identity has changed and they no
    /// longer describe it. `created_at` is preserved across updates.
    ///
    /// # Errors
    ///
    /// Returns classified database errors.
    pub fn upsert_file_stub(&self, metadata: &BasicFileMetadata) -> MetaDataResult<i64> {
        let conn = self.pool.acquire()?;
        conn.execute(
            "INSERT INTO files (path, original_path, file_hash, processing_status, tags,
                                last_modified, created_at, file_type, file_size)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(path) DO UPDATE SET
                 original_path = excluded.original_path,
                 file_hash = excluded.file_hash,
                 processing_status = excluded.processing_status,
                 tags = excluded.tags,
                 last_modified = excluded.last_modified,
                 file_type = excluded.file_type,
                 file_size = excluded.file_size,
                 summary_vector_blob = NULL,
                 suggested_category = NULL,
                 suggested_filename = NULL",
            rusqlite::params![
                metadata.path,
                metadata.original_path,
                metadata.content_hash,
                metadata.processing_status.to_string(),
                metadata.tags,
                format_timestamp(metadata.last_modified),
                format_timestamp(metadata.created_at),
                metadata.file_type.to_string(),
                metadata.file_size,
            ],
        )
        .map_db_err("upsert_file_stub")?;

        conn.query_row(
            "SELECT id FROM files WHERE path = ?1",
            [metadata.path.as_str()],
            |row| row.get(0),
        )
        .map_db_err("upsert_file_stub")
    }

    /// Persist the AI analysis results for a file
    ///
    /// Pass `None` for the vector to clear it (failure path). The vector is
    /// validated before anything is written; a wrong dimension leaves the row
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns [`MetaDataError::VectorDimension`] for a wrong-size vector and
    /// [`MetaDataError::FileNotFound`] if the id does not exist.
    pub fn update_file_ai_analysis(
        &self,
        file_id: i64,
        summary_vector: Option<&[f32]>,
        suggested_category: &str,
        suggested_filename: &str,
        status: ProcessingStatus,
    ) -> MetaDataResult<()> {
        let blob = summary_vector.map(encode_vector).transpose()?;
        let conn = self.pool.acquire()?;
        let changed = conn
            .execute(
                "UPDATE files
                 SET summary_vector_blob = ?1, suggested_category = ?2,
                     suggested_filename = ?3, processing_status = ?4
                 WHERE id = ?5",
                rusqlite::params![
                    blob,
                    suggested_category,
                    suggested_filename,
                    status.to_string(),
                    file_id
                ],
            )
            .map_db_err("update_file_ai_analysis")?;
        if changed == 0 {
            return Err(MetaDataError::FileNotFound(format!("id {file_id}")));
        }
        Ok(())
    }

    /// Narrow status update; does not touch the vector or suggestions
    ///
    /// # Errors
    ///
    /// Returns [`MetaDataError::FileNotFound`] if the id does not exist.
    pub fn update_file_processing_status(
        &self,
        file_id: i64,
        status: ProcessingStatus,
    ) -> MetaDataResult<()> {
        let conn = self.pool.acquire()?;
        let changed = conn
            .execute(
                "UPDATE files SET processing_status = ?1 WHERE id = ?2",
                rusqlite::params![status.to_string(), file_id],
            )
            .map_db_err("update_file_processing_status")?;
        if changed == 0 {
            return Err(MetaDataError::FileNotFound(format!("id {file_id}")));
        }
        Ok(())
    }

    /// Record the extracted-content hash for a file
    ///
    /// # Errors
    ///
    /// Returns [`MetaDataError::FileNotFound`] if the id does not exist.
    pub fn update_file_hash(&self, file_id: i64, content_hash: &str) -> MetaDataResult<()> {
        let conn = self.pool.acquire()?;
        let changed = conn
            .execute(
                "UPDATE files SET file_hash = ?1 WHERE id = ?2",
                rusqlite::params![content_hash, file_id],
            )
            .map_db_err("update_file_hash")?;
        if changed == 0 {
            return Err(MetaDataError::FileNotFound(format!("id {file_id}")));
        }
        Ok(())
    }

    /// Replace chunk rows for a file in one transaction
    ///
    /// Each chunk replaces any previous row with the same
    /// `(file_id, chunk_index)`. Empty input is a no-op. All vectors are
    /// validated before the first write so a bad batch leaves state unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`MetaDataError::VectorDimension`] or classified database
    /// errors.
    pub fn upsert_chunk_metadata(
        &self,
        file_id: i64,
        chunks: &[ProcessedChunk],
    ) -> MetaDataResult<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        for chunk in chunks {
            validate_dimension(&chunk.vector)?;
        }

        let mut conn = self.pool.acquire()?;
        let tx = conn.transaction().map_db_err("upsert_chunk_metadata")?;
        {
            let mut stmt = tx
                .prepare(
                    "REPLACE INTO chunks (file_id, chunk_index, content, vector_blob)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_db_err("upsert_chunk_metadata")?;
            for chunk in chunks {
                let blob = encode_vector(&chunk.vector)?;
                stmt.execute(rusqlite::params![
                    file_id,
                    chunk.chunk_index,
                    chunk.compressed_content,
                    blob
                ])
                .map_db_err("upsert_chunk_metadata")?;
            }
        }
        tx.commit().map_db_err("upsert_chunk_metadata")?;
        debug!(file_id, count = chunks.len(), "chunk batch persisted");
        Ok(())
    }

    /// Look up a file row by path
    ///
    /// # Errors
    ///
    /// Returns classified database errors; an unknown path is `Ok(None)`.
    pub fn get_file_metadata(&self, path: &str) -> MetaDataResult<Option<FileMetadata>> {
        let conn = self.pool.acquire()?;
        conn.query_row(
            &format!("SELECT {FILE_COLUMNS} FROM files WHERE path = ?1"),
            [path],
            file_from_row,
        )
        .optional()
        .map_db_err("get_file_metadata")
    }

    /// Look up a file row by id
    ///
    /// # Errors
    ///
    /// Returns classified database errors; an unknown id is `Ok(None)`.
    pub fn get_file_metadata_by_id(&self, file_id: i64) -> MetaDataResult<Option<FileMetadata>> {
        let conn = self.pool.acquire()?;
        conn.query_row(
            &format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?1"),
            [file_id],
            file_from_row,
        )
        .optional()
        .map_db_err("get_file_metadata")
    }

    /// Whether a row exists for the path
    ///
    /// # Errors
    ///
    /// Returns classified database errors.
    pub fn file_exists(&self, path: &str) -> MetaDataResult<bool> {
        let conn = self.pool.acquire()?;
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM files WHERE path = ?1", [path], |row| {
                row.get(0)
            })
            .optional()
            .map_db_err("file_exists")?;
        Ok(found.is_some())
    }

    /// All file rows, ordered by path
    ///
    /// # Errors
    ///
    /// Returns classified database errors.
    pub fn list_all_files(&self) -> MetaDataResult<Vec<FileMetadata>> {
        let conn = self.pool.acquire()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {FILE_COLUMNS} FROM files ORDER BY path"))
            .map_db_err("list_all_files")?;
        let rows = stmt
            .query_map([], file_from_row)
            .map_db_err("list_all_files")?;
        let mut files = Vec::new();
        for row in rows {
            files.push(row.map_db_err("list_all_files")?);
        }
        Ok(files)
    }

    /// Delete a file row; chunks go with it via the FK cascade
    ///
    /// # Errors
    ///
    /// Returns [`MetaDataError::FileNotFound`] if no row matches the path.
    pub fn delete_file_metadata(&self, path: &str) -> MetaDataResult<()> {
        if self.delete_file_metadata_if_exists(path)? {
            Ok(())
        } else {
            Err(MetaDataError::FileNotFound(path.to_string()))
        }
    }

    /// Delete a file row if present; `false` when there was nothing to delete
    ///
    /// # Errors
    ///
    /// Returns classified database errors.
    pub fn delete_file_metadata_if_exists(&self, path: &str) -> MetaDataResult<bool> {
        let conn = self.pool.acquire()?;
        let deleted = conn
            .execute("DELETE FROM files WHERE path = ?1", [path])
            .map_db_err("delete_file_metadata")?;
        Ok(deleted > 0)
    }

    /// Re-point a file row at a new path, keeping its id
    ///
    /// Returns `false` when no row exists at the old path.
    ///
    /// # Errors
    ///
    /// Returns classified database errors (including a constraint error when
    /// the new path is already taken by another row).
    pub fn update_path_if_exists(&self, from: &str, to: &str) -> MetaDataResult<bool> {
        let conn = self.pool.acquire()?;
        let changed = conn
            .execute(
                "UPDATE files SET path = ?2 WHERE path = ?1",
                rusqlite::params![from, to],
            )
            .map_db_err("update_path")?;
        Ok(changed > 0)
    }

    /// Search the file-level ANN index
    ///
    /// Returns at most `min(k, index size)` hits, ascending by distance. Hits
    /// whose id no longer resolves in the database are logged and skipped
    /// rather than failing the call.
    ///
    /// # Errors
    ///
    /// Returns [`MetaDataError::VectorDimension`] for a wrong-size query and
    /// classified database errors from metadata hydration.
    pub fn search_similar_files(
        &self,
        query_vector: &[f32],
        k: usize,
    ) -> MetaDataResult<Vec<FileSearchResult>> {
        validate_dimension(query_vector)?;
        let hits = {
            let index = self
                .file_index
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            index.search(query_vector, k)
        };

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            match self.get_file_metadata_by_id(hit.id)? {
                Some(file) => results.push(FileSearchResult {
                    id: hit.id,
                    distance: hit.distance,
                    file,
                }),
                None => {
                    warn!(
                        id = hit.id,
                        "ANN index returned an id with no matching file row"
                    );
                }
            }
        }
        Ok(results)
    }

    /// Search chunk vectors restricted to the given file ids
    ///
    /// The candidate chunks are filtered at query time: their vectors are
    /// pulled from the database, indexed into an ephemeral structure, and
    /// searched with the same query vector. Results come back hydrated.
    ///
    /// # Errors
    ///
    /// Returns [`MetaDataError::VectorDimension`] for a wrong-size query and
    /// classified database errors.
    pub fn search_similar_chunks(
        &self,
        file_ids: &[i64],
        query_vector: &[f32],
        k: usize,
    ) -> MetaDataResult<Vec<ChunkSearchResult>> {
        validate_dimension(query_vector)?;
        if file_ids.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let candidates = self.chunk_vectors_for_files(file_ids)?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut index = AnnIndex::new(candidates.len());
        for (id, vector) in &candidates {
            index.insert(*id, vector);
        }

        let mut results: Vec<ChunkSearchResult> = index
            .search(query_vector, k)
            .into_iter()
            .map(|hit| ChunkSearchResult {
                id: hit.id,
                distance: hit.distance,
                file_id: 0,
                chunk_index: 0,
                compressed_content: Vec::new(),
            })
            .collect();
        self.fill_chunk_metadata(&mut results)?;
        Ok(results)
    }

    /// Hydrate chunk rows for results whose id is set
    ///
    /// # Errors
    ///
    /// Returns classified database errors. Ids that no longer resolve are
    /// logged and left unhydrated.
    pub fn fill_chunk_metadata(&self, chunks: &mut [ChunkSearchResult]) -> MetaDataResult<()> {
        let conn = self.pool.acquire()?;
        let mut stmt = conn
            .prepare("SELECT file_id, chunk_index, content FROM chunks WHERE id = ?1")
            .map_db_err("fill_chunk_metadata")?;
        for chunk in chunks.iter_mut().filter(|c| c.id > 0) {
            let row = stmt
                .query_row([chunk.id], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                    ))
                })
                .optional()
                .map_db_err("fill_chunk_metadata")?;
            match row {
                Some((file_id, chunk_index, content)) => {
                    chunk.file_id = file_id;
                    chunk.chunk_index = chunk_index;
                    chunk.compressed_content = content;
                }
                None => warn!(id = chunk.id, "chunk search hit has no matching row"),
            }
        }
        Ok(())
    }

    /// Rebuild the file-level ANN index from the database
    ///
    /// Streams `(id, summary_vector_blob)` rows, keeping only blobs of the
    /// exact expected length, then swaps the fresh index in under the write
    /// lock. Searches block only for the swap, not the build.
    ///
    /// # Errors
    ///
    /// Returns classified database errors.
    pub fn rebuild_file_index(&self) -> MetaDataResult<()> {
        let rows = {
            let conn = self.pool.acquire()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, summary_vector_blob FROM files
                     WHERE summary_vector_blob IS NOT NULL",
                )
                .map_db_err("rebuild_file_index")?;
            let mapped = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
                })
                .map_db_err("rebuild_file_index")?;

            let mut rows: Vec<(i64, Vec<f32>)> = Vec::new();
            for entry in mapped {
                let (id, blob) = entry.map_db_err("rebuild_file_index")?;
                match decode_vector(&blob) {
                    Some(vector) => rows.push((id, vector)),
                    None => warn!(
                        id,
                        blob_len = blob.len(),
                        expected = VECTOR_BLOB_LEN,
                        "skipping file with mismatched vector blob during index rebuild"
                    ),
                }
            }
            rows
        };

        let mut fresh = AnnIndex::new(rows.len());
        for (id, vector) in &rows {
            fresh.insert(*id, vector);
        }

        let mut index = self
            .file_index
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *index = fresh;
        info!(vectors = rows.len(), "file index rebuilt");
        Ok(())
    }

    /// Current number of vectors in the file-level index
    pub fn file_index_size(&self) -> usize {
        self.file_index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn chunk_vectors_for_files(&self, file_ids: &[i64]) -> MetaDataResult<Vec<(i64, Vec<f32>)>> {
        let id_list = file_ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let conn = self.pool.acquire()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT id, vector_blob FROM chunks WHERE file_id IN ({id_list})"
            ))
            .map_db_err("search_similar_chunks")?;
        let mapped = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<Vec<u8>>>(1)?,
                ))
            })
            .map_db_err("search_similar_chunks")?;

        let mut vectors = Vec::new();
        for entry in mapped {
            let (id, blob) = entry.map_db_err("search_similar_chunks")?;
            let Some(blob) = blob else { continue };
            match decode_vector(&blob) {
                Some(vector) => vectors.push((id, vector)),
                None => warn!(id, "skipping chunk with mismatched vector blob"),
            }
        }
        Ok(vectors)
    }
}

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<FileMetadata> {
    let processing_status: String = row.get("processing_status")?;
    let file_type: String = row.get("file_type")?;
    let last_modified: String = row.get("last_modified")?;
    let created_at: String = row.get("created_at")?;

    let id: i64 = row.get("id")?;
    let summary_vector = row
        .get::<_, Option<Vec<u8>>>("summary_vector_blob")?
        .and_then(|blob| {
            let decoded = decode_vector(&blob);
            if decoded.is_none() {
                warn!(
                    id,
                    blob_len = blob.len(),
                    expected = VECTOR_BLOB_LEN,
                    "file row has a vector blob of unexpected size"
                );
            }
            decoded
        });

    Ok(FileMetadata {
        id,
        path: row.get("path")?,
        original_path: row.get::<_, Option<String>>("original_path")?.unwrap_or_default(),
        content_hash: row.get("file_hash")?,
        file_type: FileType::from_str(&file_type).map_err(text_conversion_error)?,
        file_size: row.get("file_size")?,
        created_at: parse_timestamp(&created_at).map_err(text_conversion_error)?,
        last_modified: parse_timestamp(&last_modified).map_err(text_conversion_error)?,
        processing_status: ProcessingStatus::from_str(&processing_status)
            .map_err(text_conversion_error)?,
        tags: row.get::<_, Option<String>>("tags")?.unwrap_or_default(),
        summary_vector,
        suggested_category: row
            .get::<_, Option<String>>("suggested_category")?
            .unwrap_or_default(),
        suggested_filename: row
            .get::<_, Option<String>>("suggested_filename")?
            .unwrap_or_default(),
    })
}
