#![forbid(unsafe_code)]

use std::num::ParseIntError;

use reclist_contracts::list_options::FieldLabel;
use reclist_contracts::record::{FieldBinding, Identified, RecordFactory, RecordId};
use serde::{Deserialize, Serialize};

pub const LINE_ITEM_NAMESPACE: &str = "lineItem";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub id: Option<RecordId>,
    pub description: String,
    /// `None` when left blank or when the typed text is not a count.
    #[serde(default)]
    pub quantity: Option<u32>,
}

impl Identified for LineItem {
    fn record_id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }
}

/// Raw submitted strings; parsing happens on extract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineItemBinding {
    pub id: String,
    pub description: String,
    pub quantity: String,
}

impl LineItemBinding {
    fn parsed_quantity(&self) -> Option<Result<u32, ParseIntError>> {
        if self.quantity.is_empty() {
            return None;
        }
        Some(self.quantity.parse())
    }

    /// Raw quantity text that does not parse as a count, if any.
    pub fn invalid_quantity(&self) -> Option<&str> {
        match self.parsed_quantity() {
            Some(Err(_)) => Some(self.quantity.as_str()),
            _ => None,
        }
    }
}

impl FieldBinding for LineItemBinding {
    fn assign_field(&mut self, field: &str, value: &str) {
        match field {
            "id" => self.id = value.trim().to_string(),
            "description" => self.description = value.to_string(),
            "quantity" => self.quantity = value.trim().to_string(),
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LineItemFactory;

impl RecordFactory for LineItemFactory {
    type Record = LineItem;
    type Binding = LineItemBinding;

    fn new_empty_record(&self) -> LineItemBinding {
        LineItemBinding::default()
    }

    fn extract_record(&self, binding: &LineItemBinding) -> LineItem {
        LineItem {
            id: RecordId::new(binding.id.as_str()).ok(),
            description: binding.description.clone(),
            quantity: binding.parsed_quantity().and_then(Result::ok),
        }
    }

    fn populate_binding(&self, binding: &mut LineItemBinding, record: &LineItem) {
        binding.id = record
            .id
            .as_ref()
            .map(|id| id.as_str().to_string())
            .unwrap_or_default();
        binding.description = record.description.clone();
        binding.quantity = record
            .quantity
            .map(|quantity| quantity.to_string())
            .unwrap_or_default();
    }
}

pub fn line_item_labels() -> Vec<FieldLabel> {
    vec![
        FieldLabel::new("description", "Description"),
        FieldLabel::new("quantity", "Quantity"),
    ]
}
