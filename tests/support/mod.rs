//! In-memory vulnerability source with fault injection

#![allow(dead_code)]

use async_trait::async_trait;
use cnnvd_harvester::fetcher::{
    DetailRequest, FetcherError, FetcherResult, ListPage, ListRequest, LookupKind, VulnSource,
};
use cnnvd_harvester::{Taxonomy, VulnDetail, VulnSummary};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Fake CNNVD keyed by window keyword (`CNNVD-YYYYMM`)
#[derive(Default)]
pub struct FakeSource {
    windows: HashMap<String, Vec<VulnSummary>>,
    list_failures: AtomicU32,
    detail_failures: AtomicU32,
    pub list_calls: AtomicU32,
    pub detail_calls: AtomicU32,
    pub lookup_calls: AtomicU32,
    pub pages_requested: Mutex<Vec<(String, u32)>>,
}

/// Summary as the listing endpoint would return it
pub fn summary(code: &str) -> VulnSummary {
    serde_json::from_value(json!({
        "id": format!("id-{code}"),
        "vulName": format!("Vulnerability {code}"),
        "cnnvdCode": code,
        "hazardLevel": 2,
        "vulType": "0",
    }))
    .unwrap()
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `codes` for the window `keyword` (e.g. "CNNVD-202304")
    pub fn with_window(mut self, keyword: &str, codes: &[&str]) -> Self {
        self.windows
            .insert(keyword.to_string(), codes.iter().map(|c| summary(c)).collect());
        self
    }

    /// Fail the next `n` list calls with a network error
    pub fn fail_list_first(self, n: u32) -> Self {
        self.list_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Fail the next `n` detail calls with a server error
    pub fn fail_detail_first(self, n: u32) -> Self {
        self.detail_failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self) -> u32 {
        self.detail_calls.load(Ordering::SeqCst)
    }

    pub fn lookup_calls(&self) -> u32 {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn pages_requested(&self) -> Vec<(String, u32)> {
        self.pages_requested.lock().unwrap().clone()
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl VulnSource for FakeSource {
    async fn list(&self, request: &ListRequest) -> FetcherResult<ListPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.list_failures) {
            return Err(FetcherError::NetworkError("connection reset".to_string()));
        }
        self.pages_requested
            .lock()
            .unwrap()
            .push((request.keyword.clone(), request.page_index));

        let all = self.windows.get(&request.keyword).cloned().unwrap_or_default();
        let size = request.page_size.max(1) as usize;
        let start = (request.page_index.saturating_sub(1) as usize) * size;
        let records = all.iter().skip(start).take(size).cloned().collect();
        Ok(ListPage {
            total: all.len() as u64,
            records,
        })
    }

    async fn detail(&self, request: &DetailRequest) -> FetcherResult<VulnDetail> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.detail_failures) {
            return Err(FetcherError::HttpError("Server error: 502".to_string()));
        }
        Ok(serde_json::from_value(json!({
            "id": request.id,
            "cnnvdCode": request.cnnvd_code,
            "vulType": request.vul_type,
            "vulDesc": format!("detail of {}", request.cnnvd_code),
            "hazardLevel": 2,
        }))
        .unwrap())
    }

    async fn lookup(
        &self,
        kind: LookupKind,
        _keyword: Option<&str>,
    ) -> FetcherResult<Vec<Taxonomy>> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        let entry = json!({
            "label": kind.to_string(),
            "value": 1,
            "sourceId": format!("{kind}-1"),
        });
        Ok(vec![serde_json::from_value(entry).unwrap()])
    }
}
