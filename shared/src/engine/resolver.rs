//! BOM explosion, recipe math and bottleneck computation

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{BomLine, ComponentRecipe, ProductBom, WoodLine};
use crate::types::{cubic_mm_per_cubic_m, round_consumption, round_volume};

/// Gross requirement of one component
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentNeed {
    pub component_item_id: Uuid,
    pub quantity_per_unit: Decimal,
    pub gross_need: Decimal,
}

/// Multiply every BOM line by the planned quantity. Needs are rounded up to
/// the stored precision so the check and the consumption see one figure.
pub fn explode(lines: &[BomLine], planned: Decimal) -> Vec<ComponentNeed> {
    lines
        .iter()
        .map(|line| ComponentNeed {
            component_item_id: line.component_item_id,
            quantity_per_unit: line.quantity,
            gross_need: round_consumption(line.quantity * planned),
        })
        .collect()
}

/// Same as [`explode`] over parent/child rows, keeping only `parent`'s children
pub fn explode_product_bom(rows: &[ProductBom], parent: Uuid, quantity: Decimal) -> Vec<ComponentNeed> {
    rows.iter()
        .filter(|row| row.parent_item_id == parent)
        .map(|row| ComponentNeed {
            component_item_id: row.child_item_id,
            quantity_per_unit: row.quantity,
            gross_need: round_consumption(row.quantity * quantity),
        })
        .collect()
}

/// `max(gross − stock, 0)`
pub fn net_need(gross: Decimal, stock: Decimal) -> Decimal {
    (gross - stock).max(Decimal::ZERO)
}

/// Raw material consumed to make `target` units of a component.
///
/// A component without a recipe halts processing; no default ratio is
/// ever substituted.
pub fn material_need(
    recipe: Option<&ComponentRecipe>,
    component_item_id: Uuid,
    component_name: &str,
    target: Decimal,
) -> Result<Decimal, EngineError> {
    let recipe = recipe.ok_or_else(|| EngineError::RecipeMissing {
        component_item_id,
        component_name: component_name.to_string(),
    })?;
    Ok(round_consumption(target * recipe.quantity_per_unit))
}

/// Total raw material of one kind across a set of components
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialTotal {
    pub material_item_id: Uuid,
    pub quantity: Decimal,
}

/// Material needed for every component that has a recipe, summed per
/// material in first-seen order. Components without a recipe add nothing.
pub fn material_plan(needs: &[ComponentNeed], recipes: &[ComponentRecipe]) -> Vec<MaterialTotal> {
    let mut totals: Vec<MaterialTotal> = Vec::new();
    for need in needs {
        let Some(recipe) = recipes
            .iter()
            .find(|r| r.component_item_id == need.component_item_id)
        else {
            continue;
        };
        let quantity = round_consumption(need.gross_need * recipe.quantity_per_unit);
        match totals
            .iter_mut()
            .find(|t| t.material_item_id == recipe.material_item_id)
        {
            Some(total) => total.quantity += quantity,
            None => totals.push(MaterialTotal {
                material_item_id: recipe.material_item_id,
                quantity,
            }),
        }
    }
    totals
}

/// Wood volume of one unit, summed over raw-wood lines with known dimensions
pub fn wood_volume(lines: &[WoodLine]) -> Decimal {
    let total: Decimal = lines
        .iter()
        .filter(|line| line.kind.is_raw_wood())
        .filter_map(|line| {
            let g = &line.geometry;
            let (l, w, t) = (g.length_mm?, g.width_mm?, g.thickness_mm?);
            Some(l * w * t / cubic_mm_per_cubic_m() * line.quantity)
        })
        .sum();
    round_volume(total)
}

/// Stock of one component offered to the bottleneck check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentStock {
    pub component_item_id: Uuid,
    pub quantity_per_unit: Decimal,
    pub available: Decimal,
}

/// Sufficiency of one component
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentAvailability {
    pub component_item_id: Uuid,
    pub quantity_per_unit: Decimal,
    pub available: Decimal,
    /// Whole units this component alone allows
    pub producible: Decimal,
    /// Needed for the requested quantity, when one was given
    pub required: Option<Decimal>,
    pub sufficient: bool,
}

/// Outcome of a bottleneck check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BottleneckReport {
    pub components: Vec<ComponentAvailability>,
    /// Minimum producible quantity across all components
    pub producible: Decimal,
    pub requested: Option<Decimal>,
    pub sufficient: bool,
}

impl BottleneckReport {
    pub fn first_insufficient(&self) -> Option<&ComponentAvailability> {
        self.components.iter().find(|c| !c.sufficient)
    }
}

/// Per component `floor(available / per_unit)` (0 when `per_unit <= 0`),
/// overall the minimum across components.
///
/// With `requested`, each component is flagged sufficient when its stock
/// covers `requested × per_unit`, rounded up like [`explode`]. Without it, a component is sufficient
/// when it allows at least one unit. No components means nothing can be
/// produced.
pub fn bottleneck(stock: &[ComponentStock], requested: Option<Decimal>) -> BottleneckReport {
    let components: Vec<ComponentAvailability> = stock
        .iter()
        .map(|c| {
            let producible = if c.quantity_per_unit <= Decimal::ZERO {
                Decimal::ZERO
            } else {
                (c.available / c.quantity_per_unit).floor()
            };
            let required = requested.map(|q| round_consumption(q * c.quantity_per_unit));
            let sufficient = match required {
                Some(req) => c.quantity_per_unit > Decimal::ZERO && c.available >= req,
                None => producible >= Decimal::ONE,
            };
            ComponentAvailability {
                component_item_id: c.component_item_id,
                quantity_per_unit: c.quantity_per_unit,
                available: c.available,
                producible,
                required,
                sufficient,
            }
        })
        .collect();

    let producible = components
        .iter()
        .map(|c| c.producible)
        .min()
        .unwrap_or(Decimal::ZERO);
    let sufficient = !components.is_empty() && components.iter().all(|c| c.sufficient);

    BottleneckReport {
        components,
        producible,
        requested,
        sufficient,
    }
}
