//! Stage processing against PostgreSQL
//!
//! Each test gets a fresh database with the migrations applied. They need a
//! PostgreSQL 15+ server in `DATABASE_URL` and are ignored otherwise:
//!
//! ```sh
//! DATABASE_URL=postgres://localhost/woodflow cargo test -p woodflow-backend -- --ignored
//! ```

use std::sync::Arc;

use rust_decimal::Decimal;
use shared::models::{ProductionOrderStatus, Stage, WarehouseCode};
use sqlx::PgPool;
use uuid::Uuid;
use woodflow_backend::error::AppError;
use woodflow_backend::services::bom::{BomLineInput, BomService, SetBomLinesInput};
use woodflow_backend::services::inventory::{AdjustmentInput, InventoryService};
use woodflow_backend::services::stage::{ProcessStageInput, RejectInput, StageService};
use woodflow_backend::services::{ProductionService, WarehouseDirectory};

fn dec(n: i64) -> Decimal {
    Decimal::from(n)
}

// ============================================================================
// Fixtures
// ============================================================================

struct Plant {
    pool: PgPool,
    warehouses: Arc<WarehouseDirectory>,
    actor: Uuid,
}

impl Plant {
    async fn new(pool: PgPool) -> Self {
        let warehouses = WarehouseDirectory::load(&pool).await.unwrap();
        assert!(warehouses.is_complete());
        Self {
            pool,
            warehouses: Arc::new(warehouses),
            actor: Uuid::new_v4(),
        }
    }

    fn stages(&self) -> StageService {
        StageService::new(self.pool.clone(), self.warehouses.clone(), 2000)
    }

    fn warehouse(&self, code: WarehouseCode) -> Uuid {
        self.warehouses.id(code).unwrap()
    }

    async fn item(&self, code: &str, kind: &str) -> Uuid {
        sqlx::query_scalar("INSERT INTO items (code, name, kind) VALUES ($1, $1, $2) RETURNING id")
            .bind(code)
            .bind(kind)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    async fn bom(&self, item_id: Uuid, lines: &[(Uuid, i64)]) {
        let bom_id: Uuid = sqlx::query_scalar("INSERT INTO boms (item_id) VALUES ($1) RETURNING id")
            .bind(item_id)
            .fetch_one(&self.pool)
            .await
            .unwrap();
        for (component, quantity) in lines {
            sqlx::query("INSERT INTO bom_lines (bom_id, component_item_id, quantity) VALUES ($1, $2, $3)")
                .bind(bom_id)
                .bind(component)
                .bind(dec(*quantity))
                .execute(&self.pool)
                .await
                .unwrap();
        }
    }

    async fn recipe(&self, component: Uuid, material: Uuid, per_unit: Decimal) {
        sqlx::query(
            "INSERT INTO component_recipes (component_item_id, material_item_id, quantity_per_unit) VALUES ($1, $2, $3)",
        )
        .bind(component)
        .bind(material)
        .bind(per_unit)
        .execute(&self.pool)
        .await
        .unwrap();
    }

    /// Returns (order id, detail id)
    async fn order(&self, number: &str, item_id: Uuid, planned: i64) -> (Uuid, Uuid) {
        let order_id: Uuid = sqlx::query_scalar("INSERT INTO production_orders (number) VALUES ($1) RETURNING id")
            .bind(number)
            .fetch_one(&self.pool)
            .await
            .unwrap();
        let detail_id: Uuid = sqlx::query_scalar(
            "INSERT INTO production_order_details (production_order_id, item_id, quantity_planned) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(order_id)
        .bind(item_id)
        .bind(dec(planned))
        .fetch_one(&self.pool)
        .await
        .unwrap();
        (order_id, detail_id)
    }

    async fn stock(&self, item_id: Uuid, code: WarehouseCode, quantity: i64) {
        InventoryService::new(self.pool.clone(), self.warehouses.clone(), 2000)
            .adjust(
                AdjustmentInput {
                    item_id,
                    warehouse_code: code.to_string(),
                    quantity: dec(quantity),
                    lot_id: None,
                    reference_number: Some("OPENING".to_string()),
                    notes: None,
                },
                self.actor,
            )
            .await
            .unwrap();
    }

    async fn on_hand(&self, item_id: Uuid, code: WarehouseCode) -> Decimal {
        sqlx::query_scalar("SELECT COALESCE(SUM(qty), 0) FROM lots WHERE item_id = $1 AND warehouse_id = $2")
            .bind(item_id)
            .bind(self.warehouse(code))
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    async fn status(&self, order_id: Uuid) -> String {
        sqlx::query_scalar("SELECT status FROM production_orders WHERE id = $1")
            .bind(order_id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    async fn snapshot(&self) -> (Vec<(Uuid, Decimal)>, i64) {
        let lots = sqlx::query_as("SELECT id, qty FROM lots ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .unwrap();
        let entries = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_logs")
            .fetch_one(&self.pool)
            .await
            .unwrap();
        (lots, entries)
    }

    async fn process(
        &self,
        stage: Stage,
        detail_id: Uuid,
        quantity: i64,
        item_id: Option<Uuid>,
    ) -> Result<woodflow_backend::services::stage::StageResult, AppError> {
        self.stages()
            .process(
                stage,
                ProcessStageInput {
                    production_order_detail_id: detail_id,
                    quantity: dec(quantity),
                    source_warehouse_id: None,
                    item_id,
                    notes: None,
                },
                self.actor,
            )
            .await
    }
}

// ============================================================================
// Assembling
// ============================================================================

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_assembling_runs_until_components_run_out(pool: PgPool) {
    let plant = Plant::new(pool).await;
    let chair = plant.item("CHR-01", "white_body").await;
    let leg = plant.item("LEG-01", "wood_component").await;
    plant.bom(chair, &[(leg, 2)]).await;
    let (order_id, detail_id) = plant.order("PO-0001", chair, 100).await;
    plant.stock(leg, WarehouseCode::Mesin, 150).await;

    let view = plant.stages().bottleneck(detail_id, None).await.unwrap();
    assert_eq!(view.report.producible, dec(75));

    let result = plant.process(Stage::Assembling, detail_id, 75, None).await.unwrap();
    assert_eq!(result.quantity_moved, dec(75));
    assert_eq!(result.sources_used.len(), 1);
    assert_eq!(result.sources_used[0].warehouse_code, WarehouseCode::Mesin);
    assert_eq!(result.sources_used[0].quantity, dec(150));
    assert_eq!(result.status, ProductionOrderStatus::OnProgress);

    assert_eq!(plant.on_hand(leg, WarehouseCode::Mesin).await, Decimal::ZERO);
    assert_eq!(plant.on_hand(chair, WarehouseCode::Assembling).await, dec(75));

    let order = ProductionService::new(plant.pool.clone()).get(order_id).await.unwrap();
    assert_eq!(order.details[0].detail.quantity_produced, dec(75));

    let before = plant.snapshot().await;
    let err = plant.process(Stage::Assembling, detail_id, 30, None).await.unwrap_err();
    match err {
        AppError::InsufficientStock {
            item_id,
            required,
            available,
            ..
        } => {
            assert_eq!(item_id, leg);
            assert_eq!(required, dec(60));
            assert_eq!(available, Decimal::ZERO);
        }
        other => panic!("expected insufficient stock, got {:?}", other),
    }
    assert_eq!(plant.snapshot().await, before);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_production_never_exceeds_the_plan(pool: PgPool) {
    let plant = Plant::new(pool).await;
    let chair = plant.item("CHR-02", "white_body").await;
    let leg = plant.item("LEG-02", "wood_component").await;
    plant.bom(chair, &[(leg, 2)]).await;
    let (_, detail_id) = plant.order("PO-0002", chair, 10).await;
    plant.stock(leg, WarehouseCode::Mesin, 40).await;

    plant.process(Stage::Assembling, detail_id, 10, None).await.unwrap();

    let before = plant.snapshot().await;
    let err = plant.process(Stage::Assembling, detail_id, 1, None).await.unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }), "got {:?}", err);
    assert_eq!(plant.snapshot().await, before);
    assert_eq!(plant.on_hand(leg, WarehouseCode::Mesin).await, dec(20));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_reject_writes_off_without_producing(pool: PgPool) {
    let plant = Plant::new(pool).await;
    let chair = plant.item("CHR-03", "white_body").await;
    let leg = plant.item("LEG-03", "wood_component").await;
    plant.bom(chair, &[(leg, 2)]).await;
    let (order_id, detail_id) = plant.order("PO-0003", chair, 5).await;
    plant.stock(leg, WarehouseCode::Mesin, 10).await;

    let result = plant
        .stages()
        .reject(
            RejectInput {
                production_order_detail_id: detail_id,
                component_item_id: leg,
                quantity: dec(3),
                source_warehouse_id: None,
                notes: Some("split grain".to_string()),
            },
            plant.actor,
        )
        .await
        .unwrap();
    assert_eq!(result.quantity_rejected, dec(3));
    assert_eq!(plant.on_hand(leg, WarehouseCode::Mesin).await, dec(7));

    let waste: Decimal = sqlx::query_scalar(
        "SELECT COALESCE(SUM(quantity), 0) FROM inventory_logs WHERE transaction_type = 'waste' AND production_order_id = $1",
    )
    .bind(order_id)
    .fetch_one(&plant.pool)
    .await
    .unwrap();
    assert_eq!(waste, dec(3));

    let order = ProductionService::new(plant.pool.clone()).get(order_id).await.unwrap();
    assert_eq!(order.details[0].detail.quantity_produced, Decimal::ZERO);

    let logs = ProductionService::new(plant.pool.clone()).logs(order_id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].output_item_id, None);
}

// ============================================================================
// Transfers
// ============================================================================

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_transfer_drains_oldest_lot_first(pool: PgPool) {
    let plant = Plant::new(pool).await;
    let table = plant.item("TBL-01", "white_body").await;
    let (order_id, detail_id) = plant.order("PO-0004", table, 10).await;
    let assembling = plant.warehouse(WarehouseCode::Assembling);

    let older: Uuid = sqlx::query_scalar(
        "INSERT INTO lots (warehouse_id, item_id, qty, created_at) VALUES ($1, $2, 5, NOW() - INTERVAL '2 hours') RETURNING id",
    )
    .bind(assembling)
    .bind(table)
    .fetch_one(&plant.pool)
    .await
    .unwrap();
    let newer: Uuid = sqlx::query_scalar(
        "INSERT INTO lots (warehouse_id, item_id, production_order_id, product_id, qty, created_at) VALUES ($1, $2, $3, $2, 5, NOW() - INTERVAL '1 hour') RETURNING id",
    )
    .bind(assembling)
    .bind(table)
    .bind(order_id)
    .fetch_one(&plant.pool)
    .await
    .unwrap();

    let result = plant.process(Stage::Sanding, detail_id, 7, None).await.unwrap();
    assert_eq!(result.sources_used[0].quantity, dec(7));

    let qty = |id: Uuid| {
        let pool = plant.pool.clone();
        async move {
            sqlx::query_scalar::<_, Decimal>("SELECT qty FROM lots WHERE id = $1")
                .bind(id)
                .fetch_one(&pool)
                .await
                .unwrap()
        }
    };
    assert_eq!(qty(older).await, Decimal::ZERO);
    assert_eq!(qty(newer).await, dec(3));
    assert_eq!(plant.on_hand(table, WarehouseCode::Sanding).await, dec(7));

    let outs: Vec<Decimal> = sqlx::query_scalar(
        "SELECT quantity FROM inventory_logs WHERE direction = 'out' AND production_order_id = $1 ORDER BY created_at, quantity DESC",
    )
    .bind(order_id)
    .fetch_all(&plant.pool)
    .await
    .unwrap();
    assert_eq!(outs, vec![dec(5), dec(2)]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_finishing_exhausts_higher_priority_warehouse_first(pool: PgPool) {
    let plant = Plant::new(pool).await;
    let table = plant.item("TBL-02", "white_body").await;
    let (_, detail_id) = plant.order("PO-0005", table, 20).await;
    plant.stock(table, WarehouseCode::Sanding, 10).await;
    plant.stock(table, WarehouseCode::Assembling, 3).await;

    let result = plant.process(Stage::Finishing, detail_id, 8, None).await.unwrap();
    let used: Vec<_> = result
        .sources_used
        .iter()
        .map(|s| (s.warehouse_code, s.quantity))
        .collect();
    assert_eq!(
        used,
        vec![(WarehouseCode::Assembling, dec(3)), (WarehouseCode::Sanding, dec(5))]
    );

    let result = plant.process(Stage::Finishing, detail_id, 2, None).await.unwrap();
    assert_eq!(result.sources_used.len(), 1);
    assert_eq!(result.sources_used[0].warehouse_code, WarehouseCode::Sanding);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_shortfall_changes_nothing(pool: PgPool) {
    let plant = Plant::new(pool).await;
    let table = plant.item("TBL-03", "white_body").await;
    let (order_id, detail_id) = plant.order("PO-0006", table, 20).await;
    plant.stock(table, WarehouseCode::Assembling, 5).await;

    let before = plant.snapshot().await;
    let err = plant.process(Stage::Sanding, detail_id, 8, None).await.unwrap_err();
    assert!(
        matches!(err, AppError::InsufficientStock { required, available, .. } if required == dec(8) && available == dec(5))
    );
    assert_eq!(plant.snapshot().await, before);
    assert_eq!(plant.status(order_id).await, "draft");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_pinned_source_must_belong_to_the_stage(pool: PgPool) {
    let plant = Plant::new(pool).await;
    let table = plant.item("TBL-04", "white_body").await;
    let (_, detail_id) = plant.order("PO-0007", table, 5).await;
    plant.stock(table, WarehouseCode::Packing, 5).await;

    let err = plant
        .stages()
        .process(
            Stage::Finishing,
            ProcessStageInput {
                production_order_detail_id: detail_id,
                quantity: dec(1),
                source_warehouse_id: Some(plant.warehouse(WarehouseCode::Packing)),
                item_id: None,
                notes: None,
            },
            plant.actor,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "source_warehouse_id"));
}

// ============================================================================
// Recipes
// ============================================================================

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_moulding_consumes_recipe_material(pool: PgPool) {
    let plant = Plant::new(pool).await;
    let chair = plant.item("CHR-04", "white_body").await;
    let top = plant.item("TOP-04", "wood_component").await;
    let leg = plant.item("LEG-04", "wood_component").await;
    let board = plant.item("S4S-04", "s4s_board").await;
    plant.bom(chair, &[(top, 1), (leg, 4)]).await;
    plant.recipe(top, board, Decimal::new(5, 2)).await;
    let (order_id, detail_id) = plant.order("PO-0008", chair, 20).await;
    plant.stock(board, WarehouseCode::S4s, 10).await;

    let result = plant.process(Stage::Moulding, detail_id, 20, Some(top)).await.unwrap();
    assert_eq!(result.sources_used[0].quantity, Decimal::ONE);
    assert_eq!(plant.on_hand(board, WarehouseCode::S4s).await, dec(9));
    assert_eq!(plant.on_hand(top, WarehouseCode::Moulding).await, dec(20));
    assert_eq!(plant.status(order_id).await, "on_progress");

    // Legs have no recipe
    let before = plant.snapshot().await;
    let err = plant
        .process(Stage::OperatorMesin, detail_id, 4, Some(leg))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::RecipeMissing { component_item_id, .. } if component_item_id == leg));
    assert_eq!(plant.snapshot().await, before);

    // Tops are capped at the BOM need
    let err = plant.process(Stage::Moulding, detail_id, 1, Some(top)).await.unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }), "got {:?}", err);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_candy_moves_volume_at_six_places(pool: PgPool) {
    let plant = Plant::new(pool).await;
    let chair = plant.item("CHR-09", "white_body").await;
    let leg = plant.item("LEG-09", "wood_component").await;
    let timber = plant.item("RST-09", "sawn_timber").await;
    plant.bom(chair, &[(leg, 1)]).await;
    plant.recipe(leg, timber, Decimal::new(125, 6)).await;
    let (_, detail_id) = plant.order("PO-0013", chair, 1).await;
    plant.stock(timber, WarehouseCode::Rst, 1).await;

    let result = plant
        .stages()
        .process(
            Stage::Candy,
            ProcessStageInput {
                production_order_detail_id: detail_id,
                quantity: Decimal::new(125, 6),
                source_warehouse_id: None,
                item_id: Some(timber),
                notes: None,
            },
            plant.actor,
        )
        .await
        .unwrap();

    assert_eq!(result.quantity_moved, Decimal::new(125, 6));
    assert_eq!(plant.on_hand(timber, WarehouseCode::Kd).await, Decimal::new(125, 6));
    assert_eq!(plant.on_hand(timber, WarehouseCode::Rst).await, Decimal::new(999_875, 6));
}

// ============================================================================
// Pipeline
// ============================================================================

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_order_completes_at_packing(pool: PgPool) {
    let plant = Plant::new(pool).await;
    let chair = plant.item("CHR-05", "white_body").await;
    let leg = plant.item("LEG-05", "wood_component").await;
    plant.bom(chair, &[(leg, 2)]).await;
    let (order_id, detail_id) = plant.order("PO-0009", chair, 10).await;
    plant.stock(leg, WarehouseCode::Mesin, 20).await;

    let expected = [
        (Stage::Assembling, "completed_assembling"),
        (Stage::Sanding, "completed_sanding"),
        (Stage::Finishing, "completed_finishing"),
        (Stage::Packing, "completed"),
    ];
    for (stage, status) in expected {
        let result = plant.process(stage, detail_id, 10, None).await.unwrap();
        assert_eq!(result.status.as_string(), status, "after {}", stage);
        assert_eq!(plant.status(order_id).await, status);
    }

    assert_eq!(plant.on_hand(chair, WarehouseCode::Packing).await, dec(10));

    let err = plant.process(Stage::Packing, detail_id, 1, None).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidStateTransition(_)));

    let logs = ProductionService::new(plant.pool.clone()).logs(order_id).await.unwrap();
    assert_eq!(logs.len(), 4);
    // Assembling consumes several components, so no single input is logged
    let assembling = logs.iter().find(|l| l.stage == Stage::Assembling).unwrap();
    assert_eq!(assembling.input_item_id, None);
    assert_eq!(assembling.input_quantity, None);
    assert_eq!(assembling.sources[0].quantity, dec(20));
    let sanding = logs.iter().find(|l| l.stage == Stage::Sanding).unwrap();
    assert_eq!(sanding.input_item_id, Some(chair));
    assert_eq!(sanding.input_quantity, Some(dec(10)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_starting_twice_changes_nothing_more(pool: PgPool) {
    let plant = Plant::new(pool).await;
    let chair = plant.item("CHR-06", "white_body").await;
    let (order_id, _) = plant.order("PO-0011", chair, 5).await;
    let production = ProductionService::new(plant.pool.clone());

    let before = plant.snapshot().await;
    let first = production.start(order_id).await.unwrap();
    assert_eq!(first.status, ProductionOrderStatus::OnProgress);

    let second = production.start(order_id).await.unwrap();
    assert_eq!(second.status, ProductionOrderStatus::OnProgress);
    assert_eq!(plant.status(order_id).await, "on_progress");
    assert_eq!(plant.snapshot().await, before);
}

// ============================================================================
// Concurrency
// ============================================================================

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_overlapping_assembling_runs_keep_counters_in_step(pool: PgPool) {
    let plant = Plant::new(pool).await;
    let chair = plant.item("CHR-07", "white_body").await;
    let leg = plant.item("LEG-07", "wood_component").await;
    plant.bom(chair, &[(leg, 1)]).await;
    let (order_id, detail_id) = plant.order("PO-0012", chair, 100).await;
    plant.stock(leg, WarehouseCode::Mesin, 100).await;

    // Hold the order row so both runs queue behind it and start together
    let mut gate = plant.pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM production_orders WHERE id = $1 FOR UPDATE")
        .bind(order_id)
        .execute(&mut *gate)
        .await
        .unwrap();

    let runs: Vec<_> = [50, 30]
        .into_iter()
        .map(|quantity| {
            let stages = plant.stages();
            let actor = plant.actor;
            tokio::spawn(async move {
                stages
                    .process(
                        Stage::Assembling,
                        ProcessStageInput {
                            production_order_detail_id: detail_id,
                            quantity: dec(quantity),
                            source_warehouse_id: None,
                            item_id: None,
                            notes: None,
                        },
                        actor,
                    )
                    .await
            })
        })
        .collect();

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    gate.commit().await.unwrap();

    for run in runs {
        run.await.unwrap().unwrap();
    }

    let produced: Decimal =
        sqlx::query_scalar("SELECT quantity_produced FROM production_order_details WHERE id = $1")
            .bind(detail_id)
            .fetch_one(&plant.pool)
            .await
            .unwrap();
    let counter: Decimal = sqlx::query_scalar(
        "SELECT quantity_produced FROM production_stage_progress WHERE detail_id = $1 AND stage = 'assembling'",
    )
    .bind(detail_id)
    .fetch_one(&plant.pool)
    .await
    .unwrap();

    assert_eq!(produced, dec(80));
    assert_eq!(counter, produced);
    assert_eq!(plant.on_hand(chair, WarehouseCode::Assembling).await, dec(80));
    assert_eq!(plant.on_hand(leg, WarehouseCode::Mesin).await, dec(20));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_concurrent_bom_replacement_leaves_one_active_version(pool: PgPool) {
    let plant = Plant::new(pool).await;
    let chair = plant.item("CHR-08", "white_body").await;
    let leg = plant.item("LEG-08", "wood_component").await;
    let seat = plant.item("SEAT-08", "wood_component").await;

    let runs: Vec<_> = [leg, seat]
        .into_iter()
        .map(|component| {
            let boms = BomService::new(plant.pool.clone());
            tokio::spawn(async move {
                boms.set_lines(
                    chair,
                    SetBomLinesInput {
                        lines: vec![BomLineInput {
                            component_item_id: component,
                            quantity: dec(4),
                        }],
                    },
                )
                .await
            })
        })
        .collect();

    for run in runs {
        run.await.unwrap().unwrap();
    }

    let (versions, active): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_active) FROM boms WHERE item_id = $1",
    )
    .bind(chair)
    .fetch_one(&plant.pool)
    .await
    .unwrap();
    assert_eq!(versions, 2);
    assert_eq!(active, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_availability_reports_each_source(pool: PgPool) {
    let plant = Plant::new(pool).await;
    let table = plant.item("TBL-05", "white_body").await;
    let (order_id, _) = plant.order("PO-0010", table, 12).await;
    plant.stock(table, WarehouseCode::Assembling, 4).await;
    plant.stock(table, WarehouseCode::Rustik, 6).await;

    let lines = plant.stages().availability(Stage::Finishing, order_id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].required, dec(12));
    assert_eq!(lines[0].available, dec(10));
    assert!(!lines[0].sufficient);
    let codes: Vec<_> = lines[0].warehouses.iter().map(|w| w.warehouse_code).collect();
    assert_eq!(
        codes,
        vec![WarehouseCode::Assembling, WarehouseCode::Sanding, WarehouseCode::Rustik]
    );
}
