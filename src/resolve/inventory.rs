// src/resolve/inventory.rs
//
// Складской учёт для CODE39. Своей логики учёта у крейта нет: поставляется
// заглушка, которая честно сообщает «не реализовано».

use serde::{Deserialize, Serialize};

use crate::core::types::ValidatedBarcode;
use crate::error::ResolutionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryState {
    NotImplemented,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryStatus {
    pub barcode: String,
    pub state: InventoryState,
    pub message: String,
}

pub trait InventoryLookup: Send + Sync {
    fn lookup(&self, barcode: &ValidatedBarcode) -> Result<InventoryStatus, ResolutionError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct UnimplementedInventory;

impl InventoryLookup for UnimplementedInventory {
    fn lookup(&self, barcode: &ValidatedBarcode) -> Result<InventoryStatus, ResolutionError> {
        Ok(InventoryStatus {
            barcode: barcode.payload().to_owned(),
            state: InventoryState::NotImplemented,
            message: "inventory lookup is not implemented".to_owned(),
        })
    }
}
