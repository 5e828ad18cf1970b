//! Stage processor: moves or transforms stock for one production stage
//!
//! A run is a single transaction. The order row is locked first, then lots
//! in consumption order. Any failure rolls back every lot, ledger and
//! progress change made so far.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::engine::{bottleneck, merge_usage, BottleneckReport, ComponentNeed, ComponentStock, SourceUsage};
use shared::models::{
    Item, ItemScope, ProductionLogKind, ProductionOrder, ProductionOrderDetail, ProductionOrderStatus, Stage,
    StageKind, StageRoute, TransactionType, WarehouseCode, WarehouseStock,
};
use shared::validation::{validate_quantity, validate_stage_quantity};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;
use validator::Validate;

use super::allocator::Allocator;
use super::item::ItemRepository;
use super::ledger::Reference;
use super::lot_store::LotStore;
use super::progress::{NewProductionLog, ProgressTracker};
use super::resolver::ResolverService;
use super::warehouse::WarehouseDirectory;
use crate::error::{AppError, AppResult};

/// Input for processing a stage
#[derive(Debug, Deserialize, Validate)]
pub struct ProcessStageInput {
    pub production_order_detail_id: Uuid,
    pub quantity: Decimal,
    /// Restrict the run to one of the stage's source warehouses
    pub source_warehouse_id: Option<Uuid>,
    /// Component or material processed; required by non-finished stages
    pub item_id: Option<Uuid>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Input for rejecting assembling components
#[derive(Debug, Deserialize, Validate)]
pub struct RejectInput {
    pub production_order_detail_id: Uuid,
    pub component_item_id: Uuid,
    pub quantity: Decimal,
    pub source_warehouse_id: Option<Uuid>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Outcome of a stage run
#[derive(Debug, Clone, Serialize)]
pub struct StageResult {
    pub stage: Stage,
    pub item_id: Uuid,
    pub quantity_moved: Decimal,
    pub sources_used: Vec<SourceUsage>,
    pub destination_warehouse_id: Uuid,
    pub status: ProductionOrderStatus,
}

/// Outcome of a reject
#[derive(Debug, Clone, Serialize)]
pub struct RejectResult {
    pub component_item_id: Uuid,
    pub quantity_rejected: Decimal,
    pub sources_used: Vec<SourceUsage>,
}

/// Stock of one consumed item against what a stage still needs
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityLine {
    pub detail_id: Uuid,
    pub item_id: Uuid,
    pub item_name: String,
    pub required: Decimal,
    pub available: Decimal,
    pub sufficient: bool,
    pub warehouses: Vec<WarehouseStock>,
}

/// Bottleneck report of one detail
#[derive(Debug, Clone, Serialize)]
pub struct BottleneckView {
    pub detail_id: Uuid,
    pub item_id: Uuid,
    #[serde(flatten)]
    pub report: BottleneckReport,
}

/// The item a run is about and the bound on its stage counter
struct Target {
    item: Item,
    planned: Decimal,
}

/// Stage processing service
#[derive(Clone)]
pub struct StageService {
    db: PgPool,
    warehouses: Arc<WarehouseDirectory>,
    lock_timeout_ms: u64,
}

impl StageService {
    /// Create a new StageService instance
    pub fn new(db: PgPool, warehouses: Arc<WarehouseDirectory>, lock_timeout_ms: u64) -> Self {
        Self {
            db,
            warehouses,
            lock_timeout_ms,
        }
    }

    async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        super::begin_locked(&self.db, self.lock_timeout_ms).await
    }

    /// Process `quantity` through a stage for one production order detail
    #[tracing::instrument(skip(self, input), fields(detail = %input.production_order_detail_id, quantity = %input.quantity))]
    pub async fn process(&self, stage: Stage, input: ProcessStageInput, actor: Uuid) -> AppResult<StageResult> {
        input.validate()?;
        let route = stage.route();
        validate_stage_quantity(route.scope, input.quantity)
            .map_err(|msg| AppError::validation("quantity", msg, "Jumlah tidak valid"))?;

        let quantity = input.quantity;

        let mut tx = self.begin().await?;

        let (order, detail) = ProgressTracker::lock_detail(&mut tx, input.production_order_detail_id).await?;
        if order.status.is_completed() {
            return Err(AppError::InvalidStateTransition(format!(
                "Production order {} is already completed",
                order.number
            )));
        }
        let status = ProgressTracker::mark_on_progress(&mut tx, &order).await?;

        let sources = self.sources(route, input.source_warehouse_id)?;
        let target = Self::target(&mut tx, route.scope, &detail, input.item_id).await?;
        let reference = Self::reference(&order, &detail, actor, input.notes.clone());

        let (input_item_id, input_quantity, sources_used, destination_warehouse_id) = match route.kind {
            StageKind::Transfer => {
                let result = Allocator::allocate(
                    &mut tx,
                    &self.warehouses,
                    &target.item,
                    quantity,
                    &sources,
                    route.destination,
                    &reference,
                )
                .await?;
                (Some(target.item.id), Some(quantity), result.sources, result.destination_warehouse_id)
            }
            StageKind::Bom => {
                let needs = ResolverService::requirements(&mut tx, detail.item_id, quantity).await?;
                self.check_components(&mut tx, &needs, &sources, quantity, order.id).await?;

                let mut usage = Vec::new();
                for need in &needs {
                    let component = ItemRepository::get(&mut tx, need.component_item_id).await?;
                    let used = Allocator::consume(
                        &mut tx,
                        &self.warehouses,
                        &component,
                        need.gross_need,
                        &sources,
                        &reference,
                        TransactionType::Usage,
                    )
                    .await?;
                    usage.extend(used);
                }

                let result = Allocator::receive(
                    &mut tx,
                    &self.warehouses,
                    detail.item_id,
                    quantity,
                    route.destination,
                    &reference,
                    TransactionType::Production,
                )
                .await?;
                ProgressTracker::record_finished(&mut tx, detail.id, quantity).await?;

                (None, None, merge_usage(usage), result.destination_warehouse_id)
            }
            StageKind::Recipe => {
                let need = ResolverService::material_for(&mut tx, target.item.id, quantity).await?;
                let material = ItemRepository::get(&mut tx, need.material_item_id).await?;
                let used = Allocator::consume(
                    &mut tx,
                    &self.warehouses,
                    &material,
                    need.quantity,
                    &sources,
                    &reference,
                    TransactionType::Usage,
                )
                .await?;
                let result = Allocator::receive(
                    &mut tx,
                    &self.warehouses,
                    target.item.id,
                    quantity,
                    route.destination,
                    &reference,
                    TransactionType::Production,
                )
                .await?;
                (Some(material.id), Some(need.quantity), used, result.destination_warehouse_id)
            }
        };

        ProgressTracker::record_stage(&mut tx, detail.id, stage, target.item.id, target.planned, quantity).await?;

        ProgressTracker::append_log(
            &mut tx,
            NewProductionLog {
                production_order_id: order.id,
                detail_id: detail.id,
                stage,
                kind: ProductionLogKind::Process,
                input_item_id,
                input_quantity,
                output_item_id: Some(target.item.id),
                output_quantity: quantity,
                sources: sources_used.clone(),
                notes: input.notes,
                created_by: Some(actor),
            },
        )
        .await?;

        let status = if route.scope == ItemScope::Finished {
            ProgressTracker::check_completion(&mut tx, &self.warehouses, &order, status, stage).await?
        } else {
            status
        };

        tx.commit().await?;

        tracing::info!(
            order = %order.number,
            %stage,
            item = %target.item.code,
            %quantity,
            %status,
            "Stage processed"
        );

        Ok(StageResult {
            stage,
            item_id: target.item.id,
            quantity_moved: quantity,
            sources_used,
            destination_warehouse_id,
            status,
        })
    }

    /// Write off damaged assembling components. Nothing is credited and the
    /// detail's produced quantity is untouched.
    #[tracing::instrument(skip(self, input), fields(detail = %input.production_order_detail_id))]
    pub async fn reject(&self, input: RejectInput, actor: Uuid) -> AppResult<RejectResult> {
        input.validate()?;
        validate_quantity(input.quantity)
            .map_err(|msg| AppError::validation("quantity", msg, "Jumlah tidak valid"))?;

        let stage = Stage::Assembling;
        let route = stage.route();

        let mut tx = self.begin().await?;

        let (order, detail) = ProgressTracker::lock_detail(&mut tx, input.production_order_detail_id).await?;
        if order.status.is_completed() {
            return Err(AppError::InvalidStateTransition(format!(
                "Production order {} is already completed",
                order.number
            )));
        }

        let sources = self.sources(route, input.source_warehouse_id)?;
        let target =
            Self::target(&mut tx, ItemScope::Component, &detail, Some(input.component_item_id)).await?;
        let reference = Self::reference(&order, &detail, actor, input.notes.clone());

        let sources_used = Allocator::consume(
            &mut tx,
            &self.warehouses,
            &target.item,
            input.quantity,
            &sources,
            &reference,
            TransactionType::Waste,
        )
        .await?;

        ProgressTracker::append_log(
            &mut tx,
            NewProductionLog {
                production_order_id: order.id,
                detail_id: detail.id,
                stage,
                kind: ProductionLogKind::Reject,
                input_item_id: Some(target.item.id),
                input_quantity: Some(input.quantity),
                output_item_id: None,
                output_quantity: Decimal::ZERO,
                sources: sources_used.clone(),
                notes: input.notes,
                created_by: Some(actor),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(order = %order.number, item = %target.item.code, quantity = %input.quantity, "Components rejected");

        Ok(RejectResult {
            component_item_id: target.item.id,
            quantity_rejected: input.quantity,
            sources_used,
        })
    }

    /// What each detail of an order still needs at a stage against the
    /// stock in the stage's source warehouses
    pub async fn availability(&self, stage: Stage, production_order_id: Uuid) -> AppResult<Vec<AvailabilityLine>> {
        let route = stage.route();
        let mut conn = self.db.acquire().await?;

        ProgressTracker::find_order(&mut conn, production_order_id).await?;
        let details = ProgressTracker::details(&mut conn, production_order_id).await?;

        let mut lines = Vec::new();
        for detail in &details {
            for (item_id, required) in Self::remaining_inputs(&mut conn, stage, detail).await? {
                let item = ItemRepository::get(&mut conn, item_id).await?;

                let mut warehouses = Vec::with_capacity(route.sources.len());
                for code in route.sources {
                    let warehouse_id = self.warehouses.id(*code)?;
                    let quantity =
                        LotStore::sum_available(&mut conn, warehouse_id, item_id, Some(production_order_id)).await?;
                    warehouses.push(WarehouseStock {
                        warehouse_id,
                        warehouse_code: *code,
                        quantity,
                    });
                }
                let available: Decimal = warehouses.iter().map(|w| w.quantity).sum();

                lines.push(AvailabilityLine {
                    detail_id: detail.id,
                    item_id,
                    item_name: item.name,
                    required,
                    available,
                    sufficient: available >= required,
                    warehouses,
                });
            }
        }

        Ok(lines)
    }

    /// Per-component sufficiency for assembling a detail, without locking
    pub async fn bottleneck(&self, detail_id: Uuid, quantity: Option<Decimal>) -> AppResult<BottleneckView> {
        if let Some(quantity) = quantity {
            validate_quantity(quantity)
                .map_err(|msg| AppError::validation("quantity", msg, "Jumlah tidak valid"))?;
        }

        let mut conn = self.db.acquire().await?;
        let detail = ProgressTracker::detail(&mut conn, detail_id).await?;
        let needs = ResolverService::requirements(&mut conn, detail.item_id, Decimal::ONE).await?;
        let stock = self
            .component_stock(&mut conn, &needs, Stage::Assembling.route().sources, detail.production_order_id)
            .await?;

        Ok(BottleneckView {
            detail_id,
            item_id: detail.item_id,
            report: bottleneck(&stock, quantity),
        })
    }

    /// Stage sources, or the single pinned one if it is permitted
    fn sources(&self, route: &StageRoute, pinned: Option<Uuid>) -> AppResult<Vec<WarehouseCode>> {
        let Some(warehouse_id) = pinned else {
            return Ok(route.sources.to_vec());
        };

        match self.warehouses.code_of(warehouse_id) {
            Some(code) if route.permits_source(code) => Ok(vec![code]),
            _ => Err(AppError::validation(
                "source_warehouse_id",
                format!("Warehouse is not a source of stage {}", route.stage),
                format!("Gudang bukan sumber untuk tahap {}", route.stage),
            )),
        }
    }

    fn reference(
        order: &ProductionOrder,
        detail: &ProductionOrderDetail,
        actor: Uuid,
        notes: Option<String>,
    ) -> Reference {
        Reference {
            reference_type: "production_order".to_string(),
            reference_id: Some(order.id),
            reference_number: Some(order.number.clone()),
            production_order_id: Some(order.id),
            product_id: Some(detail.item_id),
            actor: Some(actor),
            notes,
        }
    }

    /// Resolve the processed item for a stage scope and its counter bound
    async fn target(
        conn: &mut PgConnection,
        scope: ItemScope,
        detail: &ProductionOrderDetail,
        item_id: Option<Uuid>,
    ) -> AppResult<Target> {
        match scope {
            ItemScope::Finished => {
                if item_id.is_some_and(|id| id != detail.item_id) {
                    return Err(AppError::validation(
                        "item_id",
                        "Item does not match the production order detail",
                        "Barang tidak sesuai dengan detail perintah produksi",
                    ));
                }
                Ok(Target {
                    item: ItemRepository::get(conn, detail.item_id).await?,
                    planned: detail.quantity_planned,
                })
            }
            ItemScope::Component => {
                let item_id = Self::required_item(item_id)?;
                let needs = ResolverService::requirements(&mut *conn, detail.item_id, detail.quantity_planned).await?;
                let need = needs
                    .iter()
                    .find(|n| n.component_item_id == item_id)
                    .ok_or_else(|| {
                        AppError::validation(
                            "item_id",
                            "Item is not a component of this product",
                            "Barang bukan komponen dari produk ini",
                        )
                    })?;
                Ok(Target {
                    item: ItemRepository::get(conn, item_id).await?,
                    planned: need.gross_need,
                })
            }
            ItemScope::Material => {
                let item_id = Self::required_item(item_id)?;
                let plan = ResolverService::material_plan(&mut *conn, detail.item_id, detail.quantity_planned).await?;
                let total = plan
                    .iter()
                    .find(|m| m.material_item_id == item_id)
                    .ok_or_else(|| {
                        AppError::validation(
                            "item_id",
                            "Item is not a material of this product",
                            "Barang bukan bahan baku dari produk ini",
                        )
                    })?;
                Ok(Target {
                    item: ItemRepository::get(conn, item_id).await?,
                    planned: total.quantity,
                })
            }
        }
    }

    fn required_item(item_id: Option<Uuid>) -> AppResult<Uuid> {
        item_id.ok_or_else(|| {
            AppError::validation("item_id", "Item is required for this stage", "Barang wajib diisi untuk tahap ini")
        })
    }

    /// Stock an order may draw for each component, summed over `sources`
    async fn component_stock(
        &self,
        conn: &mut PgConnection,
        needs: &[ComponentNeed],
        sources: &[WarehouseCode],
        production_order_id: Uuid,
    ) -> AppResult<Vec<ComponentStock>> {
        let mut stock = Vec::with_capacity(needs.len());
        for need in needs {
            let mut available = Decimal::ZERO;
            for code in sources {
                available += LotStore::sum_available(
                    &mut *conn,
                    self.warehouses.id(*code)?,
                    need.component_item_id,
                    Some(production_order_id),
                )
                .await?;
            }
            stock.push(ComponentStock {
                component_item_id: need.component_item_id,
                quantity_per_unit: need.quantity_per_unit,
                available,
            });
        }
        Ok(stock)
    }

    /// Fail on the first component that cannot cover `quantity` before any
    /// lot is touched
    async fn check_components(
        &self,
        conn: &mut PgConnection,
        needs: &[ComponentNeed],
        sources: &[WarehouseCode],
        quantity: Decimal,
        production_order_id: Uuid,
    ) -> AppResult<()> {
        let stock = self.component_stock(&mut *conn, needs, sources, production_order_id).await?;
        let report = bottleneck(&stock, Some(quantity));
        if let Some(short) = report.first_insufficient() {
            let item = ItemRepository::get(conn, short.component_item_id).await?;
            tracing::info!(component = %item.name, available = %short.available, "Assembling blocked by component");
            return Err(AppError::InsufficientStock {
                item_id: item.id,
                item_name: item.name,
                required: short.required.unwrap_or(quantity * short.quantity_per_unit),
                available: short.available,
            });
        }
        Ok(())
    }

    /// Items a stage still has to consume for a detail, with quantities
    async fn remaining_inputs(
        conn: &mut PgConnection,
        stage: Stage,
        detail: &ProductionOrderDetail,
    ) -> AppResult<Vec<(Uuid, Decimal)>> {
        let route = stage.route();
        let produced: HashMap<Uuid, Decimal> = ProgressTracker::stage_counters(&mut *conn, detail.id, stage)
            .await?
            .into_iter()
            .map(|p| (p.item_id, p.quantity_produced))
            .collect();
        let left = |item_id: Uuid, planned: Decimal| {
            (planned - produced.get(&item_id).copied().unwrap_or_default()).max(Decimal::ZERO)
        };

        let inputs = match (route.kind, route.scope) {
            (StageKind::Bom, _) => {
                let remaining = detail.remaining();
                if remaining.is_zero() {
                    Vec::new()
                } else {
                    ResolverService::requirements(&mut *conn, detail.item_id, remaining)
                        .await?
                        .into_iter()
                        .map(|n| (n.component_item_id, n.gross_need))
                        .collect()
                }
            }
            (StageKind::Recipe, _) => {
                let needs = ResolverService::requirements(&mut *conn, detail.item_id, detail.quantity_planned).await?;
                let mut by_material: Vec<(Uuid, Decimal)> = Vec::new();
                for need in needs {
                    let target = left(need.component_item_id, need.gross_need);
                    if target.is_zero() {
                        continue;
                    }
                    let material = ResolverService::material_for(&mut *conn, need.component_item_id, target).await?;
                    match by_material.iter_mut().find(|(id, _)| *id == material.material_item_id) {
                        Some((_, qty)) => *qty += material.quantity,
                        None => by_material.push((material.material_item_id, material.quantity)),
                    }
                }
                by_material
            }
            (StageKind::Transfer, ItemScope::Material) => {
                ResolverService::material_plan(&mut *conn, detail.item_id, detail.quantity_planned)
                    .await?
                    .into_iter()
                    .map(|m| (m.material_item_id, left(m.material_item_id, m.quantity)))
                    .collect()
            }
            (StageKind::Transfer, _) => vec![(detail.item_id, left(detail.item_id, detail.quantity_planned))],
        };

        Ok(inputs)
    }
}
