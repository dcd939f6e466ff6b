use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fulfilment status of a customer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Delivered,
    Cancel,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Delivered,
        OrderStatus::Cancel,
    ];

    /// Wire value sent to and received from the backend
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancel => "cancel",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Awaiting confirmation",
            OrderStatus::Processing => "Processing",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancel => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == lower)
            .or(match lower.as_str() {
                "cancelled" | "canceled" => Some(OrderStatus::Cancel),
                _ => None,
            })
            .ok_or_else(|| {
                format!(
                    "unknown order status '{}' (expected one of: pending, processing, delivered, cancel)",
                    s
                )
            })
    }
}

/// Body of an order status change request.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct StatusChange {
    #[serde(rename = "newStatus")]
    pub new_status: OrderStatus,
}
