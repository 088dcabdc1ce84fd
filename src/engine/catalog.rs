use std::sync::Arc;
use tracing::debug;

use super::{Missing, QueryError};
use crate::domain::{ProviderRef, TariffPlan};
use crate::repo::TariffStore;

/// Lookup of tariff plans by reference
#[derive(Clone)]
pub struct TariffCatalog {
    store: Arc<dyn TariffStore>,
}

impl TariffCatalog {
    pub fn new(store: Arc<dyn TariffStore>) -> Self {
        Self { store }
    }

    /// `None` when no plan matches; `Current` with no current plan is `None` too.
    pub async fn resolve(&self, provider: ProviderRef) -> Result<Option<TariffPlan>, QueryError> {
        let plan = match provider {
            ProviderRef::Current => self.store.current_plan().await?,
            ProviderRef::Id(id) => self.store.plan_by_id(id).await?,
        };
        debug!(%provider, found = plan.is_some(), "tariff lookup");
        Ok(plan)
    }

    pub async fn get(&self, provider: ProviderRef) -> Result<TariffPlan, QueryError> {
        self.resolve(provider)
            .await?
            .ok_or(QueryError::NotFound(Missing::Provider(provider)))
    }

    pub async fn list(&self) -> Result<Vec<TariffPlan>, QueryError> {
        let plans = self.store.list_plans().await?;
        if plans.is_empty() {
            return Err(Missing::Providers.into());
        }
        Ok(plans)
    }
}
