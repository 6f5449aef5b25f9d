//! Record batch upload
//!
//! Streams node, relationship, or triplet batches into an open import
//! session. Incoming batches are re-chunked to a fixed row count before
//! shipping, so callers can hand over arbitrarily sized batches without
//! controlling the wire framing themselves.

use arrow::record_batch::RecordBatch;
use arrow_flight::encode::FlightDataEncoderBuilder;
use arrow_flight::FlightDescriptor;
use bytes::Bytes;
use futures::{stream, TryStreamExt};
use serde_json::json;
use tracing::debug;

use graphlink_core::error::Result;
use graphlink_core::retry::retry_with_backoff;

use crate::client::{map_flight_error, put_command_envelope, FlightConnection};

/// Row count per shipped batch when the caller does not override it.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

impl FlightConnection {
    /// Uploads node batches into the import session for `graph_name`.
    pub async fn upload_nodes<F>(
        &self,
        graph_name: &str,
        batches: Vec<RecordBatch>,
        batch_size: usize,
        progress: F,
    ) -> Result<()>
    where
        F: FnMut(usize),
    {
        self.upload_entity(graph_name, "node", batches, batch_size, progress)
            .await
    }

    /// Uploads relationship batches into the import session for `graph_name`.
    pub async fn upload_relationships<F>(
        &self,
        graph_name: &str,
        batches: Vec<RecordBatch>,
        batch_size: usize,
        progress: F,
    ) -> Result<()>
    where
        F: FnMut(usize),
    {
        self.upload_entity(graph_name, "relationship", batches, batch_size, progress)
            .await
    }

    /// Uploads (source, target, type) triplet batches.
    pub async fn upload_triplets<F>(
        &self,
        graph_name: &str,
        batches: Vec<RecordBatch>,
        batch_size: usize,
        progress: F,
    ) -> Result<()>
    where
        F: FnMut(usize),
    {
        self.upload_entity(graph_name, "triplet", batches, batch_size, progress)
            .await
    }

    async fn upload_entity<F>(
        &self,
        graph_name: &str,
        entity_type: &str,
        batches: Vec<RecordBatch>,
        batch_size: usize,
        mut progress: F,
    ) -> Result<()>
    where
        F: FnMut(usize),
    {
        let envelope = put_command_envelope(&json!({
            "name": graph_name,
            "entity_type": entity_type,
        }));
        let descriptor = FlightDescriptor::new_cmd(Bytes::from(serde_json::to_vec(&envelope)?));

        let chunks = rechunk(&batches, batch_size);
        debug!(
            "Uploading {} {entity_type} batches to `{graph_name}`",
            chunks.len()
        );

        for chunk in chunks {
            let rows = chunk.num_rows();
            let client = self.raw_client();

            retry_with_backoff(self.retry_policy(), "do_put", || {
                let descriptor = descriptor.clone();
                let chunk = chunk.clone();
                let client = client.clone();
                async move {
                    let stream = FlightDataEncoderBuilder::new()
                        .with_flight_descriptor(Some(descriptor))
                        .build(stream::iter([Ok(chunk)]));

                    let mut client = client.lock().await;
                    let response = client.do_put(stream).await.map_err(map_flight_error)?;
                    response
                        .try_collect::<Vec<_>>()
                        .await
                        .map_err(map_flight_error)?;
                    Ok(())
                }
            })
            .await?;

            progress(rows);
        }

        Ok(())
    }
}

/// Re-slices batches so no shipped batch exceeds `batch_size` rows.
fn rechunk(batches: &[RecordBatch], batch_size: usize) -> Vec<RecordBatch> {
    let batch_size = batch_size.max(1);
    let mut chunks = Vec::new();

    for batch in batches {
        let mut offset = 0;
        while offset < batch.num_rows() {
            let length = batch_size.min(batch.num_rows() - offset);
            chunks.push(batch.slice(offset, length));
            offset += length;
        }
    }

    chunks
}
