use std::fmt;

use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};

/// Order lifecycle state.
///
/// Orders are created in `Accepted` and advance strictly along the chain
/// accepted → courier_accepted → ready_in_branch → on_way → finished.
/// The transition table lives here so the storage layer and test doubles
/// validate against the same source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSql, FromSql)]
#[serde(rename_all = "snake_case")]
#[postgres(name = "order_status")]
pub enum OrderStatus {
    #[postgres(name = "accepted")]
    Accepted,
    #[postgres(name = "courier_accepted")]
    CourierAccepted,
    #[postgres(name = "ready_in_branch")]
    ReadyInBranch,
    #[postgres(name = "on_way")]
    OnWay,
    #[postgres(name = "finished")]
    Finished,
}

impl OrderStatus {
    /// The status an order must currently hold for a transition into `self`
    /// to be valid. `Accepted` has no entry: nothing transitions back to it
    /// through the status machine (courier removal is a separate, tagged
    /// reassign operation).
    pub fn required_predecessor(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Accepted => None,
            OrderStatus::CourierAccepted => Some(OrderStatus::Accepted),
            OrderStatus::ReadyInBranch => Some(OrderStatus::CourierAccepted),
            OrderStatus::OnWay => Some(OrderStatus::ReadyInBranch),
            OrderStatus::Finished => Some(OrderStatus::OnWay),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Accepted => "accepted",
            OrderStatus::CourierAccepted => "courier_accepted",
            OrderStatus::ReadyInBranch => "ready_in_branch",
            OrderStatus::OnWay => "on_way",
            OrderStatus::Finished => "finished",
        }
    }

    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s {
            "accepted" => Some(OrderStatus::Accepted),
            "courier_accepted" => Some(OrderStatus::CourierAccepted),
            "ready_in_branch" => Some(OrderStatus::ReadyInBranch),
            "on_way" => Some(OrderStatus::OnWay),
            "finished" => Some(OrderStatus::Finished),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
