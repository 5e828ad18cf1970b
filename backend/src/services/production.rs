//! Production order reads and the start transition

use serde::Serialize;
use shared::models::{ProductionLog, ProductionOrder, ProductionOrderDetail, StageProgress};
use sqlx::PgPool;
use uuid::Uuid;

use super::progress::ProgressTracker;
use super::resolver::{RequirementLine, ResolverService};
use super::warehouse::WarehouseDirectory;
use crate::error::AppResult;

/// A detail with its stage counters
#[derive(Debug, Clone, Serialize)]
pub struct DetailView {
    #[serde(flatten)]
    pub detail: ProductionOrderDetail,
    pub stages: Vec<StageProgress>,
}

/// A production order with details and progress
#[derive(Debug, Clone, Serialize)]
pub struct ProductionOrderView {
    #[serde(flatten)]
    pub order: ProductionOrder,
    pub details: Vec<DetailView>,
}

/// Production order service
#[derive(Clone)]
pub struct ProductionService {
    db: PgPool,
}

impl ProductionService {
    /// Create a new ProductionService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<ProductionOrderView> {
        let mut conn = self.db.acquire().await?;
        let order = ProgressTracker::find_order(&mut conn, id).await?;
        let details = ProgressTracker::details(&mut conn, id).await?;
        let progress = ProgressTracker::order_progress(&mut conn, id).await?;

        let details = details
            .into_iter()
            .map(|detail| {
                let stages = progress
                    .iter()
                    .filter(|p| p.detail_id == detail.id)
                    .cloned()
                    .collect();
                DetailView { detail, stages }
            })
            .collect();

        Ok(ProductionOrderView { order, details })
    }

    /// Move a draft order to `on_progress`. Started or finished orders are
    /// returned as they are.
    #[tracing::instrument(skip(self))]
    pub async fn start(&self, id: Uuid) -> AppResult<ProductionOrder> {
        let mut tx = self.db.begin().await?;
        let mut order = ProgressTracker::lock_order(&mut tx, id).await?;
        order.status = ProgressTracker::mark_on_progress(&mut tx, &order).await?;
        tx.commit().await?;
        Ok(order)
    }

    pub async fn requirements(&self, warehouses: &WarehouseDirectory, id: Uuid) -> AppResult<Vec<RequirementLine>> {
        let mut conn = self.db.acquire().await?;
        ProgressTracker::find_order(&mut conn, id).await?;
        drop(conn);

        ResolverService::new(self.db.clone())
            .production_requirements(warehouses, id)
            .await
    }

    pub async fn logs(&self, id: Uuid) -> AppResult<Vec<ProductionLog>> {
        let mut conn = self.db.acquire().await?;
        ProgressTracker::find_order(&mut conn, id).await?;
        ProgressTracker::logs(&mut conn, id).await
    }
}
