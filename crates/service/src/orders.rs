//! Order lifecycle and pricing composition.
//!
//! Order creation coordinates three lookups (client discount, branch,
//! delivery tariff) before the single insert; lookup failure aborts the
//! flow with nothing persisted. The status-update path owns the
//! order-finish side effect on the client's aggregates, and the courier
//! flows re-use the status machine.

use async_trait::async_trait;
use model::{DeliveryTariff, NewOrder, Order, OrderFilter, OrderStatus};
use repository::{
    BranchesRepository, ClientsRepository, CouriersRepository, OrderPricing, OrdersRepository,
    TariffsRepository,
};
use serde::Serialize;
use tracing::{instrument, warn};

use crate::ServiceError;

/// How many alternative tariffs the bracket lookup pulls in one page.
const TARIFF_PAGE_LIMIT: i64 = 100;

/// Accepted and acceptable orders for a courier's dashboard.
#[derive(Debug, Serialize)]
pub struct CourierOrders {
    /// Orders the courier currently holds (courier_accepted, on_way).
    pub accepted: Vec<Order>,
    /// Unassigned orders the courier may pick up (accepted, ready_in_branch).
    pub acceptable: Vec<Order>,
}

/// Trait describing the order lifecycle operations exposed to the gateway.
#[async_trait]
pub trait OrderFlow: Send + Sync {
    /// Compute discount and delivery price for the request, then persist
    /// the order in the `accepted` state. Returns the generated order_uid.
    async fn create_order(&self, order: &NewOrder) -> Result<String, ServiceError>;

    async fn get_order(&self, order_uid: &str) -> Result<Order, ServiceError>;

    async fn list_orders(
        &self,
        filter: &OrderFilter,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Order>, i64), ServiceError>;

    async fn update_order(&self, order: &Order) -> Result<(), ServiceError>;

    async fn delete_order(&self, id: i32) -> Result<(), ServiceError>;

    /// Advance the order along the status chain. Moving into `finished`
    /// additionally bumps the client's order aggregates; that second write
    /// is independent and has no compensation if it fails.
    async fn advance_status(
        &self,
        order_uid: &str,
        target: OrderStatus,
    ) -> Result<(), ServiceError>;

    /// Courier takes an unassigned order: rejected when the order already
    /// has a courier or the courier is at their max in-flight count.
    async fn courier_accept(&self, order_uid: &str, courier_id: i32) -> Result<(), ServiceError>;

    /// Remove the courier from an order, returning it to the `accepted`
    /// pool. Deliberately bypasses the transition table.
    async fn remove_courier(&self, order_uid: &str) -> Result<(), ServiceError>;

    async fn courier_orders(&self, courier_id: i32) -> Result<CourierOrders, ServiceError>;
}

/// Async implementation of [`OrderFlow`] over the repository traits.
pub struct OrderFlowService<O, C, B, T, K> {
    orders: O,
    clients: C,
    branches: B,
    tariffs: T,
    couriers: K,
}

impl<O, C, B, T, K> OrderFlowService<O, C, B, T, K>
where
    O: OrdersRepository,
    C: ClientsRepository,
    B: BranchesRepository,
    T: TariffsRepository,
    K: CouriersRepository,
{
    pub fn new(orders: O, clients: C, branches: B, tariffs: T, couriers: K) -> Self {
        Self {
            orders,
            clients,
            branches,
            tariffs,
            couriers,
        }
    }

    fn validate_order(&self, order: &NewOrder) -> Result<(), ServiceError> {
        if order.client_id <= 0 {
            return Err(ServiceError::Validation("client_id is required".into()));
        }
        if order.branch_id <= 0 {
            return Err(ServiceError::Validation("branch_id is required".into()));
        }
        if order.price < 0.0 {
            return Err(ServiceError::Validation("price must not be negative".into()));
        }
        Ok(())
    }

    async fn delivery_price_for(
        &self,
        tariff: &DeliveryTariff,
        subtotal: f64,
    ) -> Result<f64, ServiceError> {
        match tariff.tariff_type.as_str() {
            "fixed" => Ok(tariff.base_price),
            "alternative" => {
                let (tariffs, _) = self
                    .tariffs
                    .list(Some("alternative"), 1, TARIFF_PAGE_LIMIT)
                    .await?;
                Ok(select_bracket_price(&tariffs, subtotal))
            }
            _ => Ok(0.0),
        }
    }
}

/// Discount owed to the client for an order subtotal. "percent" treats the
/// amount as a raw multiplier, "fixed" as an absolute amount; anything
/// else yields no discount.
fn compute_discount(discount_type: &str, discount_amount: f64, subtotal: f64) -> f64 {
    match discount_type {
        "percent" => subtotal * discount_amount,
        "fixed" => discount_amount,
        _ => 0.0,
    }
}

/// Delivery fee from the bracket whose range contains the subtotal.
/// Bounds are strict on both ends, so a subtotal exactly equal to a
/// boundary matches nothing and the fee is 0.
fn select_bracket_price(tariffs: &[DeliveryTariff], subtotal: f64) -> f64 {
    for tariff in tariffs {
        for bracket in &tariff.brackets {
            if bracket.from_price < subtotal && subtotal < bracket.to_price {
                return bracket.price;
            }
        }
    }
    0.0
}

#[async_trait]
impl<O, C, B, T, K> OrderFlow for OrderFlowService<O, C, B, T, K>
where
    O: OrdersRepository,
    C: ClientsRepository,
    B: BranchesRepository,
    T: TariffsRepository,
    K: CouriersRepository,
{
    #[instrument(skip(self, order))]
    async fn create_order(&self, order: &NewOrder) -> Result<String, ServiceError> {
        self.validate_order(order)?;

        let client = self.clients.get(order.client_id).await?;
        let discount = compute_discount(&client.discount_type, client.discount_amount, order.price);

        let branch = self.branches.get(order.branch_id).await?;
        let tariff = self.tariffs.get(branch.delivery_tariff_id).await?;
        let delivery_price = self.delivery_price_for(&tariff, order.price).await?;

        // The insert is the only mutation and runs last: a failed lookup
        // above leaves no partial state behind.
        let order_uid = self
            .orders
            .create(
                order,
                OrderPricing {
                    price: order.price - discount,
                    delivery_price,
                    discount,
                },
            )
            .await?;
        Ok(order_uid)
    }

    async fn get_order(&self, order_uid: &str) -> Result<Order, ServiceError> {
        Ok(self.orders.get(order_uid).await?)
    }

    async fn list_orders(
        &self,
        filter: &OrderFilter,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Order>, i64), ServiceError> {
        Ok(self.orders.list(filter, page, limit).await?)
    }

    async fn update_order(&self, order: &Order) -> Result<(), ServiceError> {
        Ok(self.orders.update(order).await?)
    }

    async fn delete_order(&self, id: i32) -> Result<(), ServiceError> {
        Ok(self.orders.delete(id).await?)
    }

    #[instrument(skip(self))]
    async fn advance_status(
        &self,
        order_uid: &str,
        target: OrderStatus,
    ) -> Result<(), ServiceError> {
        self.orders.advance_status(order_uid, target).await?;

        if target == OrderStatus::Finished {
            // Two independent writes: the order stays finished even if the
            // aggregate update fails.
            let order = self.orders.get(order_uid).await?;
            if let Err(err) = self
                .clients
                .apply_finished_order(order.client_id, order.price)
                .await
            {
                warn!(
                    order_uid,
                    client_id = order.client_id,
                    "order finished but client aggregate update failed: {err}"
                );
                return Err(err.into());
            }
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn courier_accept(&self, order_uid: &str, courier_id: i32) -> Result<(), ServiceError> {
        let courier = self.couriers.get(courier_id).await?;
        let order = self.orders.get(order_uid).await?;

        if order.courier_id != 0 {
            return Err(ServiceError::Validation("order already received".into()));
        }

        let in_flight = self.orders.list_accepted(courier_id).await?;
        if in_flight.len() as i32 >= courier.max_order_count {
            return Err(ServiceError::Validation(
                "courier has reached max order count".into(),
            ));
        }

        self.orders
            .advance_status(order_uid, OrderStatus::CourierAccepted)
            .await?;
        self.orders.assign_courier(order_uid, courier_id).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_courier(&self, order_uid: &str) -> Result<(), ServiceError> {
        // Ensure the order exists before the tagged reassign write.
        self.orders.get(order_uid).await?;
        Ok(self.orders.reassign(order_uid).await?)
    }

    async fn courier_orders(&self, courier_id: i32) -> Result<CourierOrders, ServiceError> {
        let courier = self.couriers.get(courier_id).await?;
        let accepted = self.orders.list_accepted(courier_id).await?;
        let acceptable = self.orders.list_acceptable(Some(courier.branch_id)).await?;
        Ok(CourierOrders {
            accepted,
            acceptable,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use model::{Branch, Client, Courier, TariffBracket};
    use repository::{BranchData, ClientData, CourierData, RepositoryError, TariffData};
    use std::collections::HashMap;
    use std::sync::Mutex;

    // In-memory fakes over the repository traits. The orders fake
    // validates transitions through the same OrderStatus table as the
    // Postgres store does.

    #[derive(Default)]
    struct FakeOrders {
        rows: Mutex<Vec<Order>>,
        deleted: Mutex<Vec<i32>>,
    }

    impl FakeOrders {
        fn live(&self) -> Vec<Order> {
            let deleted = self.deleted.lock().unwrap();
            self.rows
                .lock()
                .unwrap()
                .iter()
                .filter(|o| !deleted.contains(&o.id))
                .cloned()
                .collect()
        }

        fn snapshot(&self, order_uid: &str) -> Option<Order> {
            self.live().into_iter().find(|o| o.order_uid == order_uid)
        }
    }

    #[async_trait]
    impl OrdersRepository for FakeOrders {
        async fn create(
            &self,
            order: &NewOrder,
            pricing: OrderPricing,
        ) -> Result<String, RepositoryError> {
            let mut rows = self.rows.lock().unwrap();
            let id = rows.len() as i32 + 1;
            let order_uid = format!("uid-{id}");
            rows.push(Order {
                id,
                order_uid: order_uid.clone(),
                client_id: order.client_id,
                branch_id: order.branch_id,
                delivery_type: order.delivery_type.clone(),
                address: order.address.clone(),
                courier_id: 0,
                price: pricing.price,
                delivery_price: pricing.delivery_price,
                discount: pricing.discount,
                status: OrderStatus::Accepted,
                payment_type: order.payment_type.clone(),
                created_at: Utc::now(),
                updated_at: None,
            });
            Ok(order_uid)
        }

        async fn get(&self, order_uid: &str) -> Result<Order, RepositoryError> {
            self.snapshot(order_uid).ok_or(RepositoryError::NotFound)
        }

        async fn list(
            &self,
            filter: &OrderFilter,
            _page: i64,
            _limit: i64,
        ) -> Result<(Vec<Order>, i64), RepositoryError> {
            let rows: Vec<Order> = self
                .live()
                .into_iter()
                .filter(|o| filter.client_id.is_none_or(|c| o.client_id == c))
                .collect();
            let total = rows.len() as i64;
            Ok((rows, total))
        }

        async fn update(&self, order: &Order) -> Result<(), RepositoryError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|o| o.id == order.id && o.order_uid == order.order_uid)
                .ok_or(RepositoryError::NotFound)?;
            *row = order.clone();
            Ok(())
        }

        async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
            let exists = self.live().iter().any(|o| o.id == id);
            if !exists {
                return Err(RepositoryError::NotFound);
            }
            self.deleted.lock().unwrap().push(id);
            Ok(())
        }

        async fn get_status(&self, order_uid: &str) -> Result<OrderStatus, RepositoryError> {
            Ok(self.get(order_uid).await?.status)
        }

        async fn advance_status(
            &self,
            order_uid: &str,
            target: OrderStatus,
        ) -> Result<(), RepositoryError> {
            let current = self.get_status(order_uid).await?;
            if target.required_predecessor() != Some(current) {
                return Err(RepositoryError::InvalidTransition {
                    from: current,
                    to: target,
                });
            }
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|o| o.order_uid == order_uid)
                .ok_or(RepositoryError::NotFound)?;
            row.status = target;
            Ok(())
        }

        async fn reassign(&self, order_uid: &str) -> Result<(), RepositoryError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|o| o.order_uid == order_uid)
                .ok_or(RepositoryError::NotFound)?;
            row.courier_id = 0;
            row.status = OrderStatus::Accepted;
            Ok(())
        }

        async fn assign_courier(
            &self,
            order_uid: &str,
            courier_id: i32,
        ) -> Result<(), RepositoryError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|o| o.order_uid == order_uid)
                .ok_or(RepositoryError::NotFound)?;
            row.courier_id = courier_id;
            Ok(())
        }

        async fn list_acceptable(
            &self,
            branch_id: Option<i32>,
        ) -> Result<Vec<Order>, RepositoryError> {
            Ok(self
                .live()
                .into_iter()
                .filter(|o| {
                    o.courier_id == 0
                        && matches!(
                            o.status,
                            OrderStatus::Accepted | OrderStatus::ReadyInBranch
                        )
                        && branch_id.is_none_or(|b| o.branch_id == b)
                })
                .collect())
        }

        async fn list_accepted(&self, courier_id: i32) -> Result<Vec<Order>, RepositoryError> {
            Ok(self
                .live()
                .into_iter()
                .filter(|o| {
                    o.courier_id == courier_id
                        && matches!(o.status, OrderStatus::CourierAccepted | OrderStatus::OnWay)
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct FakeClients {
        rows: Mutex<HashMap<i32, Client>>,
    }

    impl FakeClients {
        fn with_client(discount_type: &str, discount_amount: f64) -> Self {
            let fake = Self::default();
            fake.rows.lock().unwrap().insert(
                5,
                Client {
                    id: 5,
                    first_name: "Aziz".to_string(),
                    last_name: "Karimov".to_string(),
                    phone: String::new(),
                    discount_type: discount_type.to_string(),
                    discount_amount,
                    total_orders_count: 0,
                    total_orders_sum: 0.0,
                    last_ordered_date: None,
                    created_at: Utc::now(),
                    updated_at: None,
                },
            );
            fake
        }
    }

    #[async_trait]
    impl ClientsRepository for FakeClients {
        async fn create(&self, _client: &ClientData) -> Result<i32, RepositoryError> {
            unimplemented!()
        }

        async fn get(&self, id: i32) -> Result<Client, RepositoryError> {
            self.rows
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .ok_or(RepositoryError::NotFound)
        }

        async fn list(
            &self,
            _page: i64,
            _limit: i64,
        ) -> Result<(Vec<Client>, i64), RepositoryError> {
            unimplemented!()
        }

        async fn update(&self, _id: i32, _client: &ClientData) -> Result<(), RepositoryError> {
            unimplemented!()
        }

        async fn delete(&self, _id: i32) -> Result<(), RepositoryError> {
            unimplemented!()
        }

        async fn apply_finished_order(&self, id: i32, price: f64) -> Result<(), RepositoryError> {
            let mut rows = self.rows.lock().unwrap();
            let client = rows.get_mut(&id).ok_or(RepositoryError::NotFound)?;
            client.total_orders_count += 1;
            client.total_orders_sum += price;
            client.last_ordered_date = Some(Utc::now());
            Ok(())
        }
    }

    struct FakeBranches {
        branch: Branch,
    }

    impl FakeBranches {
        fn with_tariff(tariff_id: i32) -> Self {
            Self {
                branch: Branch {
                    id: 2,
                    name: "Chilonzor".to_string(),
                    address: String::new(),
                    phone: String::new(),
                    work_hour_start: "09:00:00".to_string(),
                    work_hour_end: "23:00:00".to_string(),
                    delivery_tariff_id: tariff_id,
                    created_at: Utc::now(),
                    updated_at: None,
                },
            }
        }
    }

    #[async_trait]
    impl BranchesRepository for FakeBranches {
        async fn create(&self, _branch: &BranchData) -> Result<i32, RepositoryError> {
            unimplemented!()
        }

        async fn get(&self, id: i32) -> Result<Branch, RepositoryError> {
            if id == self.branch.id {
                Ok(self.branch.clone())
            } else {
                Err(RepositoryError::NotFound)
            }
        }

        async fn list(
            &self,
            _page: i64,
            _limit: i64,
        ) -> Result<(Vec<Branch>, i64), RepositoryError> {
            unimplemented!()
        }

        async fn update(&self, _id: i32, _branch: &BranchData) -> Result<(), RepositoryError> {
            unimplemented!()
        }

        async fn delete(&self, _id: i32) -> Result<(), RepositoryError> {
            unimplemented!()
        }

        async fn list_active(
            &self,
            _now: &str,
            _page: i64,
            _limit: i64,
        ) -> Result<(Vec<Branch>, i64), RepositoryError> {
            unimplemented!()
        }
    }

    struct FakeTariffs {
        rows: Vec<DeliveryTariff>,
    }

    impl FakeTariffs {
        fn fixed(base_price: f64) -> Self {
            Self {
                rows: vec![DeliveryTariff {
                    id: 3,
                    name: "flat".to_string(),
                    tariff_type: "fixed".to_string(),
                    base_price,
                    brackets: Vec::new(),
                    created_at: Utc::now(),
                    updated_at: None,
                }],
            }
        }

        fn alternative(brackets: Vec<TariffBracket>) -> Self {
            Self {
                rows: vec![DeliveryTariff {
                    id: 3,
                    name: "ranged".to_string(),
                    tariff_type: "alternative".to_string(),
                    base_price: 0.0,
                    brackets,
                    created_at: Utc::now(),
                    updated_at: None,
                }],
            }
        }
    }

    #[async_trait]
    impl TariffsRepository for FakeTariffs {
        async fn create(&self, _tariff: &TariffData) -> Result<i32, RepositoryError> {
            unimplemented!()
        }

        async fn get(&self, id: i32) -> Result<DeliveryTariff, RepositoryError> {
            self.rows
                .iter()
                .find(|t| t.id == id)
                .cloned()
                .ok_or(RepositoryError::NotFound)
        }

        async fn list(
            &self,
            tariff_type: Option<&str>,
            _page: i64,
            _limit: i64,
        ) -> Result<(Vec<DeliveryTariff>, i64), RepositoryError> {
            let rows: Vec<DeliveryTariff> = self
                .rows
                .iter()
                .filter(|t| tariff_type.is_none_or(|ty| t.tariff_type == ty))
                .cloned()
                .collect();
            let total = rows.len() as i64;
            Ok((rows, total))
        }

        async fn update(&self, _id: i32, _tariff: &TariffData) -> Result<(), RepositoryError> {
            unimplemented!()
        }

        async fn delete(&self, _id: i32) -> Result<(), RepositoryError> {
            unimplemented!()
        }
    }

    struct FakeCouriers {
        courier: Courier,
    }

    impl FakeCouriers {
        fn with_max(max_order_count: i32) -> Self {
            Self {
                courier: Courier {
                    id: 9,
                    first_name: "Bek".to_string(),
                    last_name: "Tashkentov".to_string(),
                    branch_id: 2,
                    phone: String::new(),
                    login: "bek".to_string(),
                    password_hash: String::new(),
                    max_order_count,
                    created_at: Utc::now(),
                    updated_at: None,
                },
            }
        }
    }

    #[async_trait]
    impl CouriersRepository for FakeCouriers {
        async fn create(&self, _courier: &CourierData) -> Result<i32, RepositoryError> {
            unimplemented!()
        }

        async fn get(&self, id: i32) -> Result<Courier, RepositoryError> {
            if id == self.courier.id {
                Ok(self.courier.clone())
            } else {
                Err(RepositoryError::NotFound)
            }
        }

        async fn get_by_login(&self, _login: &str) -> Result<Courier, RepositoryError> {
            unimplemented!()
        }

        async fn list(
            &self,
            _page: i64,
            _limit: i64,
        ) -> Result<(Vec<Courier>, i64), RepositoryError> {
            unimplemented!()
        }

        async fn update(&self, _id: i32, _courier: &CourierData) -> Result<(), RepositoryError> {
            unimplemented!()
        }

        async fn delete(&self, _id: i32) -> Result<(), RepositoryError> {
            unimplemented!()
        }
    }

    type Flow = OrderFlowService<FakeOrders, FakeClients, FakeBranches, FakeTariffs, FakeCouriers>;

    fn flow_with(clients: FakeClients, tariffs: FakeTariffs, couriers: FakeCouriers) -> Flow {
        OrderFlowService::new(
            FakeOrders::default(),
            clients,
            FakeBranches::with_tariff(3),
            tariffs,
            couriers,
        )
    }

    fn new_order(price: f64) -> NewOrder {
        NewOrder {
            client_id: 5,
            branch_id: 2,
            delivery_type: "delivery".to_string(),
            address: "Amir Temur 15".to_string(),
            price,
            payment_type: "cash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_percent_discount_applied_on_create() {
        let flow = flow_with(
            FakeClients::with_client("percent", 0.1),
            FakeTariffs::fixed(15.0),
            FakeCouriers::with_max(5),
        );
        let uid = flow.create_order(&new_order(100.0)).await.unwrap();
        let order = flow.get_order(&uid).await.unwrap();
        assert_eq!(order.discount, 10.0);
        assert_eq!(order.price, 90.0);
        assert_eq!(order.status, OrderStatus::Accepted);
    }

    #[tokio::test]
    async fn test_fixed_tariff_delivery_price() {
        let flow = flow_with(
            FakeClients::with_client("", 0.0),
            FakeTariffs::fixed(15.0),
            FakeCouriers::with_max(5),
        );
        let uid = flow.create_order(&new_order(999.0)).await.unwrap();
        let order = flow.get_order(&uid).await.unwrap();
        assert_eq!(order.delivery_price, 15.0);
    }

    #[tokio::test]
    async fn test_alternative_tariff_bracket_selection() {
        let brackets = vec![TariffBracket {
            from_price: 50.0,
            to_price: 150.0,
            price: 20.0,
        }];
        let flow = flow_with(
            FakeClients::with_client("", 0.0),
            FakeTariffs::alternative(brackets),
            FakeCouriers::with_max(5),
        );
        let uid = flow.create_order(&new_order(100.0)).await.unwrap();
        assert_eq!(flow.get_order(&uid).await.unwrap().delivery_price, 20.0);

        // Boundary value is excluded on both ends.
        let uid = flow.create_order(&new_order(150.0)).await.unwrap();
        assert_eq!(flow.get_order(&uid).await.unwrap().delivery_price, 0.0);
    }

    #[tokio::test]
    async fn test_create_fails_without_client() {
        let flow = flow_with(
            FakeClients::default(),
            FakeTariffs::fixed(15.0),
            FakeCouriers::with_max(5),
        );
        let err = flow.create_order(&new_order(100.0)).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound));
    }

    #[tokio::test]
    async fn test_status_chain_and_finish_side_effect() {
        let flow = flow_with(
            FakeClients::with_client("percent", 0.1),
            FakeTariffs::fixed(15.0),
            FakeCouriers::with_max(5),
        );
        let uid = flow.create_order(&new_order(100.0)).await.unwrap();

        for target in [
            OrderStatus::CourierAccepted,
            OrderStatus::ReadyInBranch,
            OrderStatus::OnWay,
            OrderStatus::Finished,
        ] {
            flow.advance_status(&uid, target).await.unwrap();
            assert_eq!(flow.get_order(&uid).await.unwrap().status, target);
        }

        let client = flow.clients.get(5).await.unwrap();
        assert_eq!(client.total_orders_count, 1);
        assert_eq!(client.total_orders_sum, 90.0);
        assert!(client.last_ordered_date.is_some());
    }

    #[tokio::test]
    async fn test_skipping_a_status_is_rejected() {
        let flow = flow_with(
            FakeClients::with_client("", 0.0),
            FakeTariffs::fixed(15.0),
            FakeCouriers::with_max(5),
        );
        let uid = flow.create_order(&new_order(100.0)).await.unwrap();

        let err = flow
            .advance_status(&uid, OrderStatus::OnWay)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::InvalidTransition {
                from: OrderStatus::Accepted,
                to: OrderStatus::OnWay
            }
        ));
        // Status must be left unchanged by the failed transition.
        assert_eq!(
            flow.get_order(&uid).await.unwrap().status,
            OrderStatus::Accepted
        );
    }

    #[tokio::test]
    async fn test_reverting_to_accepted_is_rejected() {
        let flow = flow_with(
            FakeClients::with_client("", 0.0),
            FakeTariffs::fixed(15.0),
            FakeCouriers::with_max(5),
        );
        let uid = flow.create_order(&new_order(100.0)).await.unwrap();
        flow.advance_status(&uid, OrderStatus::CourierAccepted)
            .await
            .unwrap();

        let err = flow
            .advance_status(&uid, OrderStatus::Accepted)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_courier_accept_assigns_order() {
        let flow = flow_with(
            FakeClients::with_client("", 0.0),
            FakeTariffs::fixed(15.0),
            FakeCouriers::with_max(5),
        );
        let uid = flow.create_order(&new_order(100.0)).await.unwrap();
        flow.courier_accept(&uid, 9).await.unwrap();

        let order = flow.get_order(&uid).await.unwrap();
        assert_eq!(order.status, OrderStatus::CourierAccepted);
        assert_eq!(order.courier_id, 9);
    }

    #[tokio::test]
    async fn test_courier_accept_rejects_taken_order() {
        let flow = flow_with(
            FakeClients::with_client("", 0.0),
            FakeTariffs::fixed(15.0),
            FakeCouriers::with_max(5),
        );
        let uid = flow.create_order(&new_order(100.0)).await.unwrap();
        flow.courier_accept(&uid, 9).await.unwrap();

        let err = flow.courier_accept(&uid, 9).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_courier_accept_honors_max_order_count() {
        let flow = flow_with(
            FakeClients::with_client("", 0.0),
            FakeTariffs::fixed(15.0),
            FakeCouriers::with_max(1),
        );
        let first = flow.create_order(&new_order(100.0)).await.unwrap();
        let second = flow.create_order(&new_order(100.0)).await.unwrap();

        flow.courier_accept(&first, 9).await.unwrap();
        let err = flow.courier_accept(&second, 9).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_remove_courier_returns_order_to_pool() {
        let flow = flow_with(
            FakeClients::with_client("", 0.0),
            FakeTariffs::fixed(15.0),
            FakeCouriers::with_max(5),
        );
        let uid = flow.create_order(&new_order(100.0)).await.unwrap();
        flow.courier_accept(&uid, 9).await.unwrap();

        flow.remove_courier(&uid).await.unwrap();
        let order = flow.get_order(&uid).await.unwrap();
        assert_eq!(order.courier_id, 0);
        assert_eq!(order.status, OrderStatus::Accepted);

        // Back in the acceptable pool, so it can be taken again.
        let board = flow.courier_orders(9).await.unwrap();
        assert_eq!(board.acceptable.len(), 1);
        assert!(board.accepted.is_empty());
    }

    #[tokio::test]
    async fn test_deleted_order_is_not_found() {
        let flow = flow_with(
            FakeClients::with_client("", 0.0),
            FakeTariffs::fixed(15.0),
            FakeCouriers::with_max(5),
        );
        let uid = flow.create_order(&new_order(100.0)).await.unwrap();
        let order = flow.get_order(&uid).await.unwrap();

        flow.delete_order(order.id).await.unwrap();
        assert!(matches!(
            flow.get_order(&uid).await.unwrap_err(),
            ServiceError::NotFound
        ));
        // Double delete is also NotFound.
        assert!(matches!(
            flow.delete_order(order.id).await.unwrap_err(),
            ServiceError::NotFound
        ));
    }
}
