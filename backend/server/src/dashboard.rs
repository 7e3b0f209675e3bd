use std::str::FromStr;

use bank::{CategoryWithAggregates, compute_dashboard, group_dashboard_rows};
use thiserror::Error;

use crate::store::{Store, StoreError, VoteFilter};

/// Where dashboard aggregation happens.
///
/// - `Client`: read the three tables concurrently and count here
/// - `Remote`: let the store group and count, then rebuild the same shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardStrategy {
    Client,
    Remote,
}

impl FromStr for DashboardStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Self::Client),
            "remote" => Ok(Self::Remote),
            other => Err(format!(
                "unknown dashboard strategy '{other}', expected client or remote"
            )),
        }
    }
}

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("{0}")]
    Malformed(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for DashboardError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::MalformedAggregation(reason) => DashboardError::Malformed(reason),
            other => DashboardError::Store(other),
        }
    }
}

pub async fn fetch_dashboard(
    store: &dyn Store,
    strategy: DashboardStrategy,
) -> Result<Vec<CategoryWithAggregates>, DashboardError> {
    match strategy {
        DashboardStrategy::Client => {
            let all_votes = VoteFilter::default();
            let (categories, items, votes) = tokio::try_join!(
                store.categories(),
                store.items(None),
                store.votes(&all_votes)
            )?;

            Ok(compute_dashboard(&categories, &items, &votes))
        }
        DashboardStrategy::Remote => Ok(group_dashboard_rows(store.dashboard_rows().await?)),
    }
}
