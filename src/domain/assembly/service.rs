use super::error::AssemblyError;
use super::model::{ArtifactName, BatchMetadata, Manifest, ManifestEntry};
use crate::domain::batch::{Batch, BatchPlan};
use crate::domain::shared::DocumentId;
use crate::domain::synthesis::{AudioClip, PartialResults};
use crate::domain::text::SizeMetric;
use crate::infrastructure::repositories::ArtifactRepository;
use chrono::{NaiveDate, Utc};
use std::collections::BTreeSet;
use std::io::Cursor;
use std::sync::Arc;

/// Used when a batch holds no audible chunk at all.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Encode clips back to back as one mono 16-bit WAV. Empty clips contribute nothing.
pub fn encode_wav(sample_rate: u32, clips: &[&AudioClip]) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for clip in clips {
            for &sample in &clip.samples {
                writer.write_sample(sample)?;
            }
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Turns a batch's ordered clips into durable artifacts and keeps the manifest in step.
pub struct BatchAssembler {
    artifacts: Arc<dyn ArtifactRepository>,
    keep_chunks: bool,
}

impl BatchAssembler {
    pub fn new(artifacts: Arc<dyn ArtifactRepository>, keep_chunks: bool) -> Self {
        Self {
            artifacts,
            keep_chunks,
        }
    }

    /// Write the batch audio, then its metadata. Neither is referenced by the manifest until
    /// [`append_to_manifest`](Self::append_to_manifest) is called with the returned metadata.
    pub async fn assemble(
        &self,
        name: &ArtifactName,
        batch: &Batch,
        metric: SizeMetric,
        clips: &[AudioClip],
    ) -> Result<BatchMetadata, AssemblyError> {
        if clips.len() != batch.chunk_count() {
            return Err(AssemblyError::ClipCountMismatch {
                batch_index: batch.index,
                clips: clips.len(),
                chunks: batch.chunk_count(),
            });
        }

        let sample_rate = common_sample_rate(batch, clips)?;
        let ordered: Vec<&AudioClip> = clips.iter().collect();
        let wav = encode_wav(sample_rate, &ordered)?;
        self.artifacts.write_batch_audio(name, &wav).await?;

        if self.keep_chunks {
            for (chunk_index, clip) in batch.chunks.clone().zip(clips) {
                let wav = encode_wav(sample_rate, &[clip])?;
                self.artifacts
                    .write_chunk_audio(name, chunk_index, &wav)
                    .await?;
            }
        } else {
            // Leftovers of an earlier failed attempt.
            self.artifacts.remove_chunk_audio(name).await?;
        }

        let sample_count: usize = clips.iter().map(|c| c.samples.len()).sum();
        let metadata = BatchMetadata {
            batch_index: batch.index,
            audio_file: name.audio_file(),
            chunk_count: batch.chunk_count(),
            first_chunk: batch.first_chunk(),
            last_chunk: batch.last_chunk(),
            char_count: batch.char_count,
            size: batch.size,
            metric,
            first_position: batch.first_position,
            last_position: batch.last_position,
            sample_rate,
            sample_count,
            duration_secs: sample_count as f64 / sample_rate as f64,
            created_at: Utc::now(),
        };
        self.artifacts.write_batch_metadata(name, &metadata).await?;

        tracing::info!(
            batch_index = batch.index,
            audio_file = %metadata.audio_file,
            chunk_count = metadata.chunk_count,
            duration_secs = format!("{:.1}", metadata.duration_secs),
            "Batch assembled"
        );

        Ok(metadata)
    }

    pub async fn append_to_manifest(
        &self,
        manifest: &mut Manifest,
        name: &ArtifactName,
        metadata: &BatchMetadata,
    ) -> Result<(), AssemblyError> {
        let mut next = manifest.clone();
        next.upsert(ManifestEntry::from_metadata(metadata, name.metadata_file()));
        self.artifacts.save_manifest(&next).await?;
        *manifest = next;
        Ok(())
    }

    /// Rebuild the manifest from the completed batch set and the metadata files on disk.
    pub async fn reconcile_manifest(
        &self,
        document: &DocumentId,
        run_date: NaiveDate,
        plan: &BatchPlan,
        completed: &BTreeSet<u32>,
    ) -> Result<Manifest, AssemblyError> {
        let mut manifest = Manifest::new(document.clone(), run_date, plan.total_batches());

        for &batch_index in completed {
            let name = ArtifactName::new(document.clone(), run_date, batch_index);
            let metadata = self
                .artifacts
                .load_batch_metadata(&name)
                .await?
                .ok_or(AssemblyError::MissingArtifact {
                    batch_index,
                    artifact: "metadata file",
                })?;
            if !self.artifacts.batch_audio_exists(&name).await? {
                return Err(AssemblyError::MissingArtifact {
                    batch_index,
                    artifact: "audio file",
                });
            }
            manifest.upsert(ManifestEntry::from_metadata(&metadata, name.metadata_file()));
        }

        self.artifacts.save_manifest(&manifest).await?;
        tracing::debug!(
            document_id = %manifest.document_id,
            entries = manifest.entries.len(),
            "Manifest reconciled"
        );
        Ok(manifest)
    }

    /// Keep the clips of a failed batch for diagnostics; no-op unless chunk retention is on.
    pub async fn retain_partial(
        &self,
        name: &ArtifactName,
        partial: &PartialResults,
    ) -> Result<(), AssemblyError> {
        if !self.keep_chunks {
            return Ok(());
        }
        for (chunk_index, clip) in partial.iter() {
            let sample_rate = if clip.sample_rate == 0 {
                DEFAULT_SAMPLE_RATE
            } else {
                clip.sample_rate
            };
            let wav = encode_wav(sample_rate, &[clip])?;
            self.artifacts
                .write_chunk_audio(name, *chunk_index, &wav)
                .await?;
        }
        Ok(())
    }
}

fn common_sample_rate(batch: &Batch, clips: &[AudioClip]) -> Result<u32, AssemblyError> {
    let mut rate: Option<u32> = None;
    for (chunk_index, clip) in batch.chunks.clone().zip(clips) {
        if clip.is_empty() {
            continue;
        }
        match rate {
            None => rate = Some(clip.sample_rate),
            Some(expected) if expected != clip.sample_rate => {
                return Err(AssemblyError::SampleRateMismatch {
                    batch_index: batch.index,
                    chunk_index,
                    expected,
                    found: clip.sample_rate,
                });
            }
            Some(_) => {}
        }
    }
    Ok(rate.unwrap_or(DEFAULT_SAMPLE_RATE))
}
