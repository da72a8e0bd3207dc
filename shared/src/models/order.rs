//! Order Model
//!
//! 结算生成的订单聚合。行项目是下单时刻的快照，之后商品的任何修改都不会影响订单。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order lifecycle status
///
/// ```text
/// pending -> processing -> shipped -> delivered -> completed
///    |            |            |
///    +------------+------------+--> cancelled
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        Self::Pending,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Completed,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// `completed` 与 `cancelled` 为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether the state machine allows `self -> next`
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Delivered, Completed)
                | (Pending | Processing | Shipped, Cancelled)
        )
    }

    /// Reviews open once the goods are delivered
    pub fn is_reviewable(&self) -> bool {
        matches!(self, Self::Delivered | Self::Completed)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown order status: {}", s))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// Payment method tag (no payment processing happens server side)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    Paypal,
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreditCard => "credit_card",
            Self::Paypal => "paypal",
            Self::BankTransfer => "bank_transfer",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit_card" => Ok(Self::CreditCard),
            "paypal" => Ok(Self::Paypal),
            "bank_transfer" => Ok(Self::BankTransfer),
            other => Err(format!("unknown payment method: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub address: String,
    pub city: String,
    pub country: String,
}

/// Order line snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: i64,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub seller_id: String,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// One entry of the status audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: OrderStatus,
    pub at: i64,
    /// Acting user id
    pub by: String,
}

/// Order aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    /// Human readable number, `ORD<ms><4 digits>`
    pub order_number: String,
    pub buyer_id: String,
    pub items: Vec<OrderItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub platform_fee: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub status_history: Vec<StatusChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    /// Whether `seller_id` owns at least one line
    pub fn has_seller(&self, seller_id: &str) -> bool {
        self.items.iter().any(|i| i.seller_id == seller_id)
    }

    /// Distinct seller ids, in line order
    pub fn seller_ids(&self) -> Vec<String> {
        let mut sellers: Vec<String> = Vec::new();
        for item in &self.items {
            if !sellers.contains(&item.seller_id) {
                sellers.push(item.seller_id.clone());
            }
        }
        sellers
    }

    pub fn item_for_product(&self, product_id: i64) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// 仅保留指定卖家的行项目（卖家视图）
    pub fn seller_view(&self, seller_id: &str) -> Order {
        let mut view = self.clone();
        view.items.retain(|i| i.seller_id == seller_id);
        view
    }

    /// Σ line totals owned by `seller_id`
    pub fn seller_revenue(&self, seller_id: &str) -> Decimal {
        self.items
            .iter()
            .filter(|i| i.seller_id == seller_id)
            .map(OrderItem::line_total)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(Delivered.can_transition_to(Completed));
    }

    #[test]
    fn test_completed_only_from_delivered() {
        for from in OrderStatus::ALL {
            let allowed = from.can_transition_to(OrderStatus::Completed);
            assert_eq!(allowed, from == OrderStatus::Delivered, "{} -> completed", from);
        }
    }

    #[test]
    fn test_cancel_sources() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Processing.can_transition_to(Cancelled));
        assert!(Shipped.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Cancelled));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for from in [OrderStatus::Completed, OrderStatus::Cancelled] {
            assert!(from.is_terminal());
            for to in OrderStatus::ALL {
                assert!(!from.can_transition_to(to), "{} -> {} must be rejected", from, to);
            }
        }
    }

    #[test]
    fn test_no_skipping_or_going_back() {
        use OrderStatus::*;
        assert!(!Pending.can_transition_to(Shipped));
        assert!(!Shipped.can_transition_to(Processing));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("shipped".parse::<OrderStatus>(), Ok(OrderStatus::Shipped));
        assert!("returned".parse::<OrderStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&OrderStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }

    #[test]
    fn test_payment_method_wire_names() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::BankTransfer).unwrap(),
            "\"bank_transfer\""
        );
        assert_eq!("paypal".parse::<PaymentMethod>(), Ok(PaymentMethod::Paypal));
        assert!("cash".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_seller_view_and_revenue() {
        let item = |product_id: i64, seller: &str, price: &str, qty: u32| OrderItem {
            product_id,
            name: format!("P{}", product_id),
            price: price.parse().unwrap(),
            quantity: qty,
            image: None,
            seller_id: seller.to_string(),
        };
        let order = Order {
            id: 1,
            order_number: "ORD1".into(),
            buyer_id: "buyer".into(),
            items: vec![item(1, "s1", "20", 2), item(2, "s2", "15", 1), item(3, "s1", "5", 1)],
            subtotal: "60".parse().unwrap(),
            platform_fee: "1".parse().unwrap(),
            total: "61".parse().unwrap(),
            shipping_address: ShippingAddress {
                first_name: "A".into(),
                last_name: "B".into(),
                email: "a@b.c".into(),
                phone: None,
                address: "1 St".into(),
                city: "X".into(),
                country: "Y".into(),
            },
            payment_method: PaymentMethod::Paypal,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            status_history: vec![],
            completed_at: None,
            created_at: 0,
            updated_at: 0,
        };

        assert!(order.has_seller("s1"));
        assert!(!order.has_seller("s3"));
        assert_eq!(order.seller_ids(), vec!["s1".to_string(), "s2".to_string()]);
        assert_eq!(order.seller_view("s1").items.len(), 2);
        assert_eq!(order.seller_revenue("s1"), "45".parse::<Decimal>().unwrap());
    }
}
