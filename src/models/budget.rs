//! Modelo de Presupuesto
//!
//! Un presupuesto pertenece a exactamente una OT. Los montos son pesos
//! chilenos enteros; el IVA se trunca.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::utils::errors::{validation_error, AppError, AppResult};

/// IVA chileno por defecto
pub const DEFAULT_TAX_PERCENT: i64 = 19;

/// Tipo de ítem: repuesto o mano de obra
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ItemKind {
    #[serde(rename = "REP")]
    Part,
    #[serde(rename = "MO")]
    Labor,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Part => "REP",
            ItemKind::Labor => "MO",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "REP" | "PART" => Ok(ItemKind::Part),
            "MO" | "LABOR" => Ok(ItemKind::Labor),
            other => Err(AppError::BadRequest(format!("Tipo de ítem desconocido: {}", other))),
        }
    }
}

/// Línea del presupuesto
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetItem {
    pub id: Uuid,
    pub kind: ItemKind,
    pub description: String,
    pub quantity: i64,
    pub unit_price: i64,
}

impl BudgetItem {
    pub fn new(kind: ItemKind, description: &str, quantity: i64, unit_price: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            description: description.to_string(),
            quantity,
            unit_price,
        }
    }

    pub fn total(&self) -> i64 {
        self.quantity.saturating_mul(self.unit_price)
    }

    pub fn checked_total(&self) -> Option<i64> {
        self.quantity.checked_mul(self.unit_price)
    }
}

/// Presupuesto de una OT
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Budget {
    pub order_id: Uuid,
    pub items: Vec<BudgetItem>,
    pub approved: bool,
    pub tax_percent: i64,
}

impl Budget {
    pub fn new(order_id: Uuid) -> Self {
        Self {
            order_id,
            items: Vec::new(),
            approved: false,
            tax_percent: DEFAULT_TAX_PERCENT,
        }
    }

    pub fn subtotal_of(&self, kind: ItemKind) -> i64 {
        self.items
            .iter()
            .filter(|item| item.kind == kind)
            .fold(0, |acc: i64, item| acc.saturating_add(item.total()))
    }

    pub fn subtotal_parts(&self) -> i64 {
        self.subtotal_of(ItemKind::Part)
    }

    pub fn subtotal_labor(&self) -> i64 {
        self.subtotal_of(ItemKind::Labor)
    }

    pub fn subtotal(&self) -> i64 {
        self.items.iter().fold(0, |acc: i64, item| acc.saturating_add(item.total()))
    }

    pub fn tax(&self) -> i64 {
        self.subtotal().saturating_mul(self.tax_percent) / 100
    }

    pub fn total(&self) -> i64 {
        self.subtotal().saturating_add(self.tax())
    }

    /// Total con IVA, o `None` si algún monto intermedio no cabe en un `i64`
    pub fn checked_total_of(items: &[BudgetItem], tax_percent: i64) -> Option<i64> {
        let subtotal = items
            .iter()
            .try_fold(0_i64, |acc, item| acc.checked_add(item.checked_total()?))?;
        let tax = subtotal.checked_mul(tax_percent)? / 100;
        subtotal.checked_add(tax)
    }

    /// Rechaza ítems cuyos montos desbordan antes de guardarlos
    pub fn ensure_amounts(items: &[BudgetItem], tax_percent: i64) -> AppResult<()> {
        match Self::checked_total_of(items, tax_percent) {
            Some(_) => Ok(()),
            None => Err(validation_error("items", "Los montos del presupuesto exceden el máximo")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_totals() {
        let mut budget = Budget::new(Uuid::new_v4());
        budget.items.push(BudgetItem::new(ItemKind::Labor, "Diagnóstico", 1, 15000));
        budget.items.push(BudgetItem::new(ItemKind::Part, "Bujías", 4, 8000));

        assert_eq!(budget.subtotal_labor(), 15000);
        assert_eq!(budget.subtotal_parts(), 32000);
        assert_eq!(budget.subtotal(), 47000);
        assert_eq!(budget.tax(), 8930);
        assert_eq!(budget.total(), 55930);
    }

    #[test]
    fn test_tax_truncates() {
        let mut budget = Budget::new(Uuid::new_v4());
        budget.items.push(BudgetItem::new(ItemKind::Part, "Tornillo", 1, 99));
        // 99 * 19 / 100 = 18.81
        assert_eq!(budget.tax(), 18);
        assert_eq!(budget.total(), 117);
    }

    #[test]
    fn test_empty_budget_defaults() {
        let budget = Budget::new(Uuid::new_v4());
        assert!(!budget.approved);
        assert_eq!(budget.tax_percent, 19);
        assert_eq!(budget.total(), 0);
    }

    #[test]
    fn test_amount_overflow_is_rejected() {
        let huge = BudgetItem::new(ItemKind::Part, "Motor", 1_000_000_000_000, 1_000_000_000);
        assert!(huge.checked_total().is_none());
        assert!(matches!(
            Budget::ensure_amounts(&[huge.clone()], DEFAULT_TAX_PERCENT),
            Err(AppError::Validation(_))
        ));

        // Cabe sin IVA pero no con él
        let edge = BudgetItem::new(ItemKind::Part, "Flota", 1, i64::MAX / 10);
        assert!(Budget::ensure_amounts(&[edge.clone()], 0).is_ok());
        assert!(Budget::ensure_amounts(&[edge], DEFAULT_TAX_PERCENT).is_err());

        let mut budget = Budget::new(Uuid::new_v4());
        budget.items.push(huge);
        assert_eq!(budget.total(), i64::MAX);
    }

    #[test]
    fn test_item_kind_wire_names() {
        assert_eq!(serde_json::to_value(ItemKind::Part).unwrap(), "REP");
        assert_eq!("mo".parse::<ItemKind>().unwrap(), ItemKind::Labor);
    }
}
