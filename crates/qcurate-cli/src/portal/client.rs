use super::models::{
    DatasetEntry, DatasetInfo, DatasetQueryBody, DatasetRecordItem, DatasetRecordsFetchBody,
    EntriesFetchBody, IdsFetchBody, OptimizationRecordData, PortalMolecule,
    TorsionDriveRecordData,
};
use super::retrieve::ArchiveSource;
use crate::error::{CliError, Result};
use async_trait::async_trait;
use qcurate::core::models::collection::CollectionKind;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Ids or names sent per bulk request.
const BATCH_SIZE: usize = 250;

/// A client for the QCFractal v1 REST API.
pub struct PortalClient {
    address: String,
    http: reqwest::Client,
}

impl PortalClient {
    pub fn new(address: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("qcurate/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            address: address.to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.address.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!("GET {}", url);
        Ok(self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.url(path);
        debug!("POST {}", url);
        Ok(self
            .http
            .post(&url)
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    async fn fetch_by_ids<T: DeserializeOwned>(&self, path: &str, ids: &[u64]) -> Result<Vec<T>> {
        let mut fetched = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(BATCH_SIZE) {
            let body = IdsFetchBody {
                ids: chunk,
                missing_ok: false,
            };
            let batch: Vec<T> = self.post_json(path, &body).await?;
            fetched.extend(batch);
        }
        Ok(fetched)
    }
}

#[async_trait]
impl ArchiveSource for PortalClient {
    fn address(&self) -> &str {
        &self.address
    }

    #[instrument(skip(self), name = "find_dataset")]
    async fn find_dataset(&self, kind: CollectionKind, name: &str) -> Result<DatasetInfo> {
        let body = DatasetQueryBody {
            dataset_type: kind.archive_type(),
            dataset_name: name,
        };
        let found: Vec<DatasetInfo> = self.post_json("api/v1/datasets/query", &body).await?;
        found.into_iter().next().ok_or_else(|| {
            CliError::Archive(format!(
                "No {} dataset named '{}' on {}",
                kind, name, self.address
            ))
        })
    }

    async fn entries(&self, dataset: &DatasetInfo) -> Result<Vec<DatasetEntry>> {
        let base = format!("api/v1/datasets/{}/{}", dataset.dataset_type, dataset.id);
        let names: Vec<String> = self.get_json(&format!("{base}/entry_names")).await?;
        let mut entries = Vec::with_capacity(names.len());
        for chunk in names.chunks(BATCH_SIZE) {
            let body = EntriesFetchBody {
                names: chunk,
                missing_ok: false,
            };
            let batch: Vec<DatasetEntry> = self
                .post_json(&format!("{base}/entries/bulkFetch"), &body)
                .await?;
            entries.extend(batch);
        }
        Ok(entries)
    }

    async fn record_items(
        &self,
        dataset: &DatasetInfo,
        entry_names: &[String],
        spec_name: &str,
    ) -> Result<Vec<DatasetRecordItem>> {
        let path = format!(
            "api/v1/datasets/{}/{}/records/bulkFetch",
            dataset.dataset_type, dataset.id
        );
        let mut items = Vec::with_capacity(entry_names.len());
        for chunk in entry_names.chunks(BATCH_SIZE) {
            let body = DatasetRecordsFetchBody {
                entry_names: chunk,
                specification_names: [spec_name],
            };
            let batch: Vec<DatasetRecordItem> = self.post_json(&path, &body).await?;
            items.extend(batch);
        }
        Ok(items)
    }

    async fn optimization_records(&self, ids: &[u64]) -> Result<Vec<OptimizationRecordData>> {
        self.fetch_by_ids("api/v1/records/optimization/bulkFetch", ids)
            .await
    }

    async fn torsiondrive_records(&self, ids: &[u64]) -> Result<Vec<TorsionDriveRecordData>> {
        self.fetch_by_ids("api/v1/records/torsiondrive/bulkFetch", ids)
            .await
    }

    async fn minimum_optimizations(
        &self,
        torsiondrive_id: u64,
    ) -> Result<BTreeMap<String, OptimizationRecordData>> {
        self.get_json(&format!(
            "api/v1/records/torsiondrive/{torsiondrive_id}/minimum_optimizations"
        ))
        .await
    }

    async fn molecules(&self, ids: &[u64]) -> Result<Vec<PortalMolecule>> {
        self.fetch_by_ids("api/v1/molecules/bulkFetch", ids).await
    }
}
