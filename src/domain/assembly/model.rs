use crate::domain::shared::DocumentId;
use crate::domain::text::{SizeMetric, SourcePosition};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Deterministic naming of a batch's artifacts: `<document>_<YYYYMMDD>_batch_<NNN>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    pub document_id: DocumentId,
    pub run_date: NaiveDate,
    pub batch_index: u32,
}

impl ArtifactName {
    pub fn new(document_id: DocumentId, run_date: NaiveDate, batch_index: u32) -> Self {
        Self {
            document_id,
            run_date,
            batch_index,
        }
    }

    pub fn stem(&self) -> String {
        format!(
            "{}_{}_batch_{:03}",
            self.document_id,
            self.run_date.format("%Y%m%d"),
            self.batch_index
        )
    }

    pub fn audio_file(&self) -> String {
        format!("{}.wav", self.stem())
    }

    pub fn metadata_file(&self) -> String {
        format!("{}.json", self.stem())
    }

    pub fn chunk_dir(&self) -> String {
        format!("{}_chunks", self.stem())
    }

    pub fn chunk_file(chunk_index: usize) -> String {
        format!("chunk_{:04}.wav", chunk_index)
    }
}

/// Written next to every batch audio file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchMetadata {
    pub batch_index: u32,
    pub audio_file: String,
    pub chunk_count: usize,
    pub first_chunk: usize,
    pub last_chunk: usize,
    pub char_count: usize,
    pub size: usize,
    pub metric: SizeMetric,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_position: Option<SourcePosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_position: Option<SourcePosition>,
    pub sample_rate: u32,
    pub sample_count: usize,
    pub duration_secs: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub batch_index: u32,
    pub audio_file: String,
    pub metadata_file: String,
    pub chunk_count: usize,
    pub char_count: usize,
    pub duration_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_position: Option<SourcePosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_position: Option<SourcePosition>,
}

impl ManifestEntry {
    pub fn from_metadata(metadata: &BatchMetadata, metadata_file: String) -> Self {
        Self {
            batch_index: metadata.batch_index,
            audio_file: metadata.audio_file.clone(),
            metadata_file,
            chunk_count: metadata.chunk_count,
            char_count: metadata.char_count,
            duration_secs: metadata.duration_secs,
            first_position: metadata.first_position,
            last_position: metadata.last_position,
        }
    }
}

/// Completed batches in index order, for sequential playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub document_id: DocumentId,
    pub run_date: NaiveDate,
    pub total_batches: u32,
    pub entries: Vec<ManifestEntry>,
    pub updated_at: DateTime<Utc>,
}

impl Manifest {
    pub fn new(document_id: DocumentId, run_date: NaiveDate, total_batches: u32) -> Self {
        Self {
            document_id,
            run_date,
            total_batches,
            entries: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Insert keeping index order; an entry for the same batch is replaced.
    pub fn upsert(&mut self, entry: ManifestEntry) {
        match self
            .entries
            .binary_search_by_key(&entry.batch_index, |e| e.batch_index)
        {
            Ok(position) => self.entries[position] = entry,
            Err(position) => self.entries.insert(position, entry),
        }
        self.updated_at = Utc::now();
    }

    pub fn total_duration_secs(&self) -> f64 {
        self.entries.iter().map(|e| e.duration_secs).sum()
    }

    /// Extended M3U playlist with paths relative to the document directory.
    pub fn to_m3u(&self) -> String {
        let mut playlist = String::from("#EXTM3U\n");
        for entry in &self.entries {
            playlist.push_str(&format!(
                "#EXTINF:{},{} - batch {:03}\n{}\n",
                entry.duration_secs.round() as u64,
                self.document_id,
                entry.batch_index,
                entry.audio_file
            ));
        }
        playlist
    }
}
