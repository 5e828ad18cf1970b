//! FIFO planning over a prioritized pool of lots

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Shortfall;
use crate::models::WarehouseCode;

/// A lot offered to the planner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateLot {
    pub lot_id: Uuid,
    pub warehouse_id: Uuid,
    pub warehouse_code: WarehouseCode,
    /// Creation sequence; lower is older
    pub seq: i64,
    pub quantity: Decimal,
}

/// Quantity taken from one lot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Draw {
    pub lot_id: Uuid,
    pub warehouse_id: Uuid,
    pub warehouse_code: WarehouseCode,
    pub quantity: Decimal,
}

/// Quantity drawn from one source warehouse
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceUsage {
    pub warehouse_id: Uuid,
    pub warehouse_code: WarehouseCode,
    pub quantity: Decimal,
}

/// Ordered draws covering exactly the required quantity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationPlan {
    pub required: Decimal,
    pub draws: Vec<Draw>,
}

impl AllocationPlan {
    pub fn total(&self) -> Decimal {
        self.draws.iter().map(|d| d.quantity).sum()
    }

    /// Per-warehouse totals in the order warehouses were first drawn from
    pub fn usage_by_warehouse(&self) -> Vec<SourceUsage> {
        merge_usage(self.draws.iter().map(|d| SourceUsage {
            warehouse_id: d.warehouse_id,
            warehouse_code: d.warehouse_code,
            quantity: d.quantity,
        }))
    }
}

/// Fold usage rows by warehouse, keeping first-seen order
pub fn merge_usage(rows: impl IntoIterator<Item = SourceUsage>) -> Vec<SourceUsage> {
    let mut merged: Vec<SourceUsage> = Vec::new();
    for row in rows {
        match merged.iter_mut().find(|u| u.warehouse_id == row.warehouse_id) {
            Some(existing) => existing.quantity += row.quantity,
            None => merged.push(row),
        }
    }
    merged
}

/// Total positive quantity in a pool
pub fn available_total(pool: &[CandidateLot]) -> Decimal {
    pool.iter()
        .map(|lot| lot.quantity.max(Decimal::ZERO))
        .sum()
}

/// Arrange lots the way the allocator walks them: warehouses in `priority`
/// order, oldest lot first within a warehouse. Lots from warehouses outside
/// `priority` are dropped.
pub fn order_pool(priority: &[WarehouseCode], mut lots: Vec<CandidateLot>) -> Vec<CandidateLot> {
    lots.retain(|lot| priority.contains(&lot.warehouse_code));
    lots.sort_by_key(|lot| {
        let rank = priority
            .iter()
            .position(|code| *code == lot.warehouse_code)
            .unwrap_or(usize::MAX);
        (rank, lot.seq)
    });
    lots
}

/// Walk an ordered pool and take `min(remaining, lot)` from each lot until
/// `required` is covered.
///
/// The pool must already be in consumption order (see [`order_pool`]).
/// When the pool cannot cover `required` nothing is planned and the
/// shortfall is returned.
pub fn plan_fifo(required: Decimal, pool: &[CandidateLot]) -> Result<AllocationPlan, Shortfall> {
    let available = available_total(pool);
    if available < required {
        return Err(Shortfall {
            required,
            available,
        });
    }

    let mut remaining = required;
    let mut draws = Vec::new();
    for lot in pool {
        if remaining <= Decimal::ZERO {
            break;
        }
        if lot.quantity <= Decimal::ZERO {
            continue;
        }
        let take = remaining.min(lot.quantity);
        draws.push(Draw {
            lot_id: lot.lot_id,
            warehouse_id: lot.warehouse_id,
            warehouse_code: lot.warehouse_code,
            quantity: take,
        });
        remaining -= take;
    }

    Ok(AllocationPlan { required, draws })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Stage;

    fn lot(code: WarehouseCode, warehouse_id: Uuid, seq: i64, qty: i64) -> CandidateLot {
        CandidateLot {
            lot_id: Uuid::new_v4(),
            warehouse_id,
            warehouse_code: code,
            seq,
            quantity: Decimal::from(qty),
        }
    }

    #[test]
    fn test_oldest_lot_is_drained_first() {
        let wh = Uuid::new_v4();
        let l1 = lot(WarehouseCode::Assembling, wh, 1, 5);
        let l2 = lot(WarehouseCode::Assembling, wh, 2, 5);
        let plan = plan_fifo(Decimal::from(7), &[l1.clone(), l2.clone()]).unwrap();

        assert_eq!(plan.draws.len(), 2);
        assert_eq!(plan.draws[0].lot_id, l1.lot_id);
        assert_eq!(plan.draws[0].quantity, Decimal::from(5));
        assert_eq!(plan.draws[1].lot_id, l2.lot_id);
        assert_eq!(plan.draws[1].quantity, Decimal::from(2));
    }

    #[test]
    fn test_priority_warehouse_is_exhausted_before_the_next() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let pool = vec![
            lot(WarehouseCode::Assembling, a, 9, 3),
            lot(WarehouseCode::Sanding, b, 1, 10),
        ];

        let plan = plan_fifo(Decimal::from(8), &pool).unwrap();
        let usage = plan.usage_by_warehouse();
        assert_eq!(usage.len(), 2);
        assert_eq!((usage[0].warehouse_id, usage[0].quantity), (a, Decimal::from(3)));
        assert_eq!((usage[1].warehouse_id, usage[1].quantity), (b, Decimal::from(5)));

        let small = plan_fifo(Decimal::from(2), &pool).unwrap();
        let usage = small.usage_by_warehouse();
        assert_eq!(usage.len(), 1);
        assert_eq!((usage[0].warehouse_id, usage[0].quantity), (a, Decimal::from(2)));
    }

    #[test]
    fn test_shortfall_plans_nothing() {
        let wh = Uuid::new_v4();
        let pool = vec![
            lot(WarehouseCode::Finishing, wh, 1, 4),
            lot(WarehouseCode::Finishing, wh, 2, 6),
        ];
        let err = plan_fifo(Decimal::from(11), &pool).unwrap_err();
        assert_eq!(err.required, Decimal::from(11));
        assert_eq!(err.available, Decimal::from(10));
        assert_eq!(err.missing(), Decimal::ONE);
    }

    #[test]
    fn test_exact_cover_uses_every_lot() {
        let wh = Uuid::new_v4();
        let pool = vec![lot(WarehouseCode::Mesin, wh, 1, 4), lot(WarehouseCode::Mesin, wh, 2, 6)];
        let plan = plan_fifo(Decimal::from(10), &pool).unwrap();
        assert_eq!(plan.draws.len(), 2);
        assert_eq!(plan.total(), Decimal::from(10));
    }

    #[test]
    fn test_empty_lots_are_skipped() {
        let wh = Uuid::new_v4();
        let empty = lot(WarehouseCode::Mesin, wh, 1, 0);
        let full = lot(WarehouseCode::Mesin, wh, 2, 3);
        let plan = plan_fifo(Decimal::from(2), &[empty, full.clone()]).unwrap();
        assert_eq!(plan.draws.len(), 1);
        assert_eq!(plan.draws[0].lot_id, full.lot_id);
    }

    #[test]
    fn test_order_pool_sorts_by_priority_then_age() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let lots = vec![
            lot(WarehouseCode::Rustik, c, 1, 1),
            lot(WarehouseCode::Sanding, b, 5, 1),
            lot(WarehouseCode::Assembling, a, 7, 1),
            lot(WarehouseCode::Sanding, b, 2, 1),
            lot(WarehouseCode::Packing, Uuid::new_v4(), 0, 1),
        ];
        let ordered = order_pool(Stage::Finishing.route().sources, lots);
        let keys: Vec<_> = ordered.iter().map(|l| (l.warehouse_code, l.seq)).collect();
        assert_eq!(
            keys,
            vec![
                (WarehouseCode::Assembling, 7),
                (WarehouseCode::Sanding, 2),
                (WarehouseCode::Sanding, 5),
                (WarehouseCode::Rustik, 1),
            ]
        );
    }
}
