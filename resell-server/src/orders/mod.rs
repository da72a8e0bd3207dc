//! Order service
//!
//! Buyer side: history + detail. Seller side: orders containing the
//! seller's items, status transitions, stats. Orders are never deleted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{Order, OrderStatus, PageRequest, StatusChange};
use shared::{AppError, AppResult, ErrorCode};

use crate::security_log;
use crate::storage::{MarketStorage, StorageError};

/// One page of orders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_orders: u64,
}

impl OrderPage {
    fn new(orders: Vec<Order>, page: PageRequest, total: u64) -> Self {
        Self {
            orders,
            current_page: page.page,
            total_pages: page.total_pages(total),
            total_orders: total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusStat {
    pub status: OrderStatus,
    pub count: u64,
    /// Σ seller line totals for orders in this status
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerStats {
    pub status_stats: Vec<StatusStat>,
    pub total_orders: u64,
    /// Delivered + completed only
    #[serde(with = "rust_decimal::serde::float")]
    pub total_revenue: Decimal,
}

#[derive(Debug, Clone)]
pub struct OrderService {
    storage: MarketStorage,
}

impl OrderService {
    pub fn new(storage: MarketStorage) -> Self {
        Self { storage }
    }

    // ========== Buyer ==========

    /// Buyer's orders, newest first
    pub fn order_history(&self, buyer_id: &str, page: PageRequest) -> AppResult<OrderPage> {
        let (orders, total) =
            self.storage
                .buyer_orders(buyer_id, page.offset(), page.limit as usize)?;
        Ok(OrderPage::new(orders, page, total))
    }

    /// Full order; only its buyer may read it
    pub fn order_detail(&self, user_id: &str, order_id: i64) -> AppResult<Order> {
        let order = self
            .storage
            .get_order(order_id)?
            .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;

        if order.buyer_id != user_id {
            security_log!(
                "WARN",
                "order_access_denied",
                user_id = user_id,
                order_id = order_id
            );
            return Err(AppError::with_message(ErrorCode::NotResourceOwner, "Access denied"));
        }
        Ok(order)
    }

    // ========== Seller ==========

    /// Orders containing the seller's items (only those items shown), newest first
    pub fn seller_orders(
        &self,
        seller_id: &str,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> AppResult<OrderPage> {
        let matching: Vec<Order> = self
            .storage
            .seller_orders(seller_id)?
            .into_iter()
            .filter(|o| status.is_none_or(|s| o.status == s))
            .collect();

        let total = matching.len() as u64;
        let orders = matching
            .into_iter()
            .skip(page.offset())
            .take(page.limit as usize)
            .map(|o| o.seller_view(seller_id))
            .collect();
        Ok(OrderPage::new(orders, page, total))
    }

    pub fn seller_order_detail(&self, seller_id: &str, order_id: i64) -> AppResult<Order> {
        let order = self
            .storage
            .get_order(order_id)?
            .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
        ensure_seller(&order, seller_id)?;
        Ok(order.seller_view(seller_id))
    }

    /// Move an order along the state machine
    ///
    /// Only a seller with at least one line on the order may do this.
    pub fn update_status(
        &self,
        seller_id: &str,
        order_id: i64,
        next: OrderStatus,
    ) -> AppResult<Order> {
        let txn = self.storage.begin_write()?;
        let mut order = self
            .storage
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
        ensure_seller(&order, seller_id)?;

        let current = order.status;
        // completed 只能由 delivered 进入，终态也按非法转换处理
        if next == OrderStatus::Completed && current != OrderStatus::Delivered {
            return Err(invalid_transition(
                current,
                next,
                "Order can only be marked as completed if it is delivered.".to_string(),
            ));
        }
        if current.is_terminal() {
            return Err(AppError::new(ErrorCode::OrderAlreadyFinal)
                .with_detail("status", current.as_str()));
        }
        if !current.can_transition_to(next) {
            return Err(invalid_transition(
                current,
                next,
                format!("Cannot change order status from {current} to {next}"),
            ));
        }

        let now = shared::util::now_millis();
        order.status = next;
        order.updated_at = now;
        if next == OrderStatus::Completed {
            order.completed_at = Some(now);
        }
        order.status_history.push(StatusChange {
            status: next,
            at: now,
            by: seller_id.to_string(),
        });

        self.storage.put_order(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            order_id,
            from = %current,
            to = %next,
            seller_id = %seller_id,
            "Order status changed"
        );
        Ok(order)
    }

    /// delivered → completed, stamping `completed_at`
    pub fn complete_order(&self, seller_id: &str, order_id: i64) -> AppResult<Order> {
        self.update_status(seller_id, order_id, OrderStatus::Completed)
    }

    /// Per-status counts, total orders, revenue over delivered + completed
    pub fn seller_stats(&self, seller_id: &str) -> AppResult<SellerStats> {
        let orders = self.storage.seller_orders(seller_id)?;

        let status_stats = OrderStatus::ALL
            .iter()
            .map(|status| {
                let in_status = orders.iter().filter(|o| o.status == *status);
                StatusStat {
                    status: *status,
                    count: in_status.clone().count() as u64,
                    revenue: in_status.map(|o| o.seller_revenue(seller_id)).sum(),
                }
            })
            .collect();

        let total_revenue = orders
            .iter()
            .filter(|o| matches!(o.status, OrderStatus::Delivered | OrderStatus::Completed))
            .map(|o| o.seller_revenue(seller_id))
            .sum();

        Ok(SellerStats {
            status_stats,
            total_orders: orders.len() as u64,
            total_revenue,
        })
    }
}

fn invalid_transition(from: OrderStatus, to: OrderStatus, message: String) -> AppError {
    AppError::with_message(ErrorCode::InvalidTransition, message)
        .with_detail("from", from.as_str())
        .with_detail("to", to.as_str())
}

fn ensure_seller(order: &Order, seller_id: &str) -> AppResult<()> {
    if order.has_seller(seller_id) {
        return Ok(());
    }
    security_log!(
        "WARN",
        "order_status_denied",
        user_id = seller_id,
        order_id = order.id
    );
    Err(AppError::with_message(
        ErrorCode::NotResourceOwner,
        "No items found for this seller in the order",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{OrderItem, PaymentMethod, PaymentStatus, ShippingAddress};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn order(id: i64, buyer: &str, lines: &[(&str, &str, u32)]) -> Order {
        let items: Vec<OrderItem> = lines
            .iter()
            .enumerate()
            .map(|(i, (seller, price, qty))| OrderItem {
                product_id: i as i64 + 1,
                name: format!("item-{i}"),
                price: dec(price),
                quantity: *qty,
                image: None,
                seller_id: seller.to_string(),
            })
            .collect();
        let subtotal = items.iter().map(OrderItem::line_total).sum();
        Order {
            id,
            order_number: format!("ORD{id}"),
            buyer_id: buyer.into(),
            items,
            subtotal,
            platform_fee: Decimal::ONE,
            total: subtotal + Decimal::ONE,
            shipping_address: ShippingAddress {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: "ada@example.com".into(),
                phone: None,
                address: "1 Analytical St".into(),
                city: "London".into(),
                country: "UK".into(),
            },
            payment_method: PaymentMethod::BankTransfer,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            status_history: vec![],
            completed_at: None,
            created_at: id,
            updated_at: id,
        }
    }

    fn setup(orders: &[Order]) -> OrderService {
        let storage = MarketStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        for o in orders {
            storage.put_order(&txn, o).unwrap();
        }
        txn.commit().unwrap();
        OrderService::new(storage)
    }

    fn advance(service: &OrderService, seller: &str, id: i64, path: &[OrderStatus]) {
        for status in path {
            service.update_status(seller, id, *status).unwrap();
        }
    }

    #[test]
    fn test_history_pagination() {
        let orders: Vec<Order> = (1..=12).map(|i| order(i, "buyer", &[("s", "1.00", 1)])).collect();
        let service = setup(&orders);

        let page = service.order_history("buyer", PageRequest::new(Some(2), Some(5))).unwrap();
        assert_eq!(page.current_page, 2);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_orders, 12);
        assert_eq!(page.orders.first().unwrap().id, 7);

        let json = serde_json::to_value(&page).unwrap();
        assert!(json.get("totalOrders").is_some());
    }

    #[test]
    fn test_detail_is_buyer_only() {
        let service = setup(&[order(1, "buyer", &[("s", "1.00", 1)])]);
        assert!(service.order_detail("buyer", 1).is_ok());
        assert_eq!(
            service.order_detail("s", 1).unwrap_err().code,
            ErrorCode::NotResourceOwner
        );
        assert_eq!(
            service.order_detail("buyer", 2).unwrap_err().code,
            ErrorCode::OrderNotFound
        );
    }

    #[test]
    fn test_full_lifecycle_records_history() {
        let service = setup(&[order(1, "buyer", &[("s", "5.00", 1)])]);
        advance(
            &service,
            "s",
            1,
            &[OrderStatus::Processing, OrderStatus::Shipped, OrderStatus::Delivered],
        );
        let done = service.complete_order("s", 1).unwrap();

        assert_eq!(done.status, OrderStatus::Completed);
        assert!(done.completed_at.is_some());
        assert_eq!(done.status_history.len(), 4);
        assert_eq!(done.status_history.last().unwrap().by, "s");
    }

    #[test]
    fn test_complete_requires_delivered() {
        let service = setup(&[order(1, "buyer", &[("s", "5.00", 1)])]);
        advance(&service, "s", 1, &[OrderStatus::Processing, OrderStatus::Shipped]);

        let err = service.complete_order("s", 1).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);
        assert_eq!(err.message, "Order can only be marked as completed if it is delivered.");
    }

    #[test]
    fn test_terminal_and_skipping_rejected() {
        let service = setup(&[
            order(1, "buyer", &[("s", "5.00", 1)]),
            order(2, "buyer", &[("s", "5.00", 1)]),
        ]);

        assert_eq!(
            service.update_status("s", 1, OrderStatus::Shipped).unwrap_err().code,
            ErrorCode::InvalidTransition
        );

        service.update_status("s", 2, OrderStatus::Cancelled).unwrap();
        assert_eq!(
            service.update_status("s", 2, OrderStatus::Processing).unwrap_err().code,
            ErrorCode::OrderAlreadyFinal
        );
    }

    #[test]
    fn test_complete_from_final_state_is_invalid_transition() {
        let service = setup(&[
            order(1, "buyer", &[("s", "5.00", 1)]),
            order(2, "buyer", &[("s", "5.00", 1)]),
        ]);

        service.update_status("s", 1, OrderStatus::Cancelled).unwrap();
        let err = service.complete_order("s", 1).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);
        assert_eq!(err.message, "Order can only be marked as completed if it is delivered.");

        advance(
            &service,
            "s",
            2,
            &[
                OrderStatus::Processing,
                OrderStatus::Shipped,
                OrderStatus::Delivered,
                OrderStatus::Completed,
            ],
        );
        let err = service.complete_order("s", 2).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);

        // 其它目标仍按终态拒绝
        assert_eq!(
            service.update_status("s", 2, OrderStatus::Processing).unwrap_err().code,
            ErrorCode::OrderAlreadyFinal
        );
    }

    #[test]
    fn test_only_sellers_on_the_order_may_transition() {
        let service = setup(&[order(1, "buyer", &[("s", "5.00", 1)])]);

        for outsider in ["buyer", "stranger"] {
            let err = service
                .update_status(outsider, 1, OrderStatus::Processing)
                .unwrap_err();
            assert_eq!(err.code, ErrorCode::NotResourceOwner);
            assert_eq!(err.http_status(), http::StatusCode::FORBIDDEN);
        }
        assert_eq!(service.order_detail("buyer", 1).unwrap().status, OrderStatus::Pending);
    }

    #[test]
    fn test_seller_view_filters_items_and_status() {
        let service = setup(&[
            order(1, "buyer", &[("s1", "10.00", 1), ("s2", "3.00", 2)]),
            order(2, "buyer", &[("s1", "4.00", 1)]),
        ]);
        service.update_status("s1", 2, OrderStatus::Processing).unwrap();

        let page = service.seller_orders("s2", None, PageRequest::default()).unwrap();
        assert_eq!(page.total_orders, 1);
        assert_eq!(page.orders[0].items.len(), 1);
        assert_eq!(page.orders[0].items[0].seller_id, "s2");

        let pending = service
            .seller_orders("s1", Some(OrderStatus::Pending), PageRequest::default())
            .unwrap();
        assert_eq!(pending.total_orders, 1);
        assert_eq!(pending.orders[0].id, 1);

        let detail = service.seller_order_detail("s1", 1).unwrap();
        assert_eq!(detail.items.len(), 1);
        assert_eq!(
            service.seller_order_detail("s3", 1).unwrap_err().code,
            ErrorCode::NotResourceOwner
        );
    }

    #[test]
    fn test_seller_stats_revenue_counts_delivered_and_completed() {
        let service = setup(&[
            order(1, "b", &[("s", "10.00", 2), ("other", "99.00", 1)]),
            order(2, "b", &[("s", "5.00", 1)]),
            order(3, "b", &[("s", "7.00", 1)]),
        ]);
        let to_delivered = [OrderStatus::Processing, OrderStatus::Shipped, OrderStatus::Delivered];
        advance(&service, "s", 1, &to_delivered);
        advance(&service, "s", 2, &to_delivered);
        service.complete_order("s", 2).unwrap();

        let stats = service.seller_stats("s").unwrap();
        assert_eq!(stats.total_orders, 3);
        // 20 (order 1, own lines only) + 5 (order 2)
        assert_eq!(stats.total_revenue, dec("25.00"));

        let pending = stats
            .status_stats
            .iter()
            .find(|s| s.status == OrderStatus::Pending)
            .unwrap();
        assert_eq!(pending.count, 1);
        assert_eq!(pending.revenue, dec("7.00"));
    }
}
