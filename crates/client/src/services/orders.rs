//! Delivery order operations: checkout, history, cancellation, pickup
//! verification.

use std::collections::HashMap;

use tracing::{info, instrument};

use prepbox_core::OrderId;

use crate::cache::{OfflineCache, Partition};
use crate::endpoints;
use crate::error::{ApiError, ApiResult};
use crate::events::{AppEvent, EventBus};
use crate::http::{ApiClient, Page, Pagination};
use crate::models::{NewOrder, Order, OrderAddOn, OrderMeal, VerificationDetails};
use crate::stores::{CartStore, OrdersStore, SubscriptionStore};

#[derive(Clone)]
pub struct OrderService {
    api: ApiClient,
    cache: OfflineCache,
    bus: EventBus,
    cart: CartStore,
    orders: OrdersStore,
    subscription: SubscriptionStore,
    page_size: u32,
}

impl OrderService {
    #[must_use]
    pub fn new(
        api: ApiClient,
        cache: OfflineCache,
        bus: EventBus,
        cart: CartStore,
        orders: OrdersStore,
        subscription: SubscriptionStore,
        page_size: u32,
    ) -> Self {
        Self {
            api,
            cache,
            bus,
            cart,
            orders,
            subscription,
            page_size,
        }
    }

    /// Fetch one page of order history, refreshing the store and cache.
    /// Offline, the first page falls back to the cached history.
    ///
    /// # Errors
    /// See [`ApiError`].
    #[instrument(skip(self))]
    pub async fn list_orders(&self, page: u32) -> ApiResult<Page<Order>> {
        match self
            .api
            .get_paged::<Order>(endpoints::DELIVERIES, page, self.page_size)
            .await
        {
            Ok(orders) => {
                if page == 1 {
                    self.cache.clear(Partition::Orders);
                    self.orders.set_orders(orders.items.clone());
                } else {
                    for order in &orders.items {
                        self.orders.upsert(order.clone());
                    }
                }
                self.cache.put_many(Partition::Orders, &orders.items);
                Ok(orders)
            }
            Err(ApiError::Network(e)) if page == 1 => {
                let cached: Vec<Order> = self.cache.get_all(Partition::Orders);
                if cached.is_empty() {
                    return Err(ApiError::Network(e));
                }
                self.orders.set_orders(cached.clone());
                Ok(Page {
                    items: cached,
                    pagination: Pagination::default(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Place the weekly order built up in the cart.
    ///
    /// The cart must pass its own validation and an active subscription must
    /// exist; both are checked before anything leaves the device. On success
    /// the cart is emptied and the new order lands in the store.
    ///
    /// # Errors
    /// [`ApiError::Validation`] when the cart is not ready, otherwise see
    /// [`ApiError`].
    #[instrument(skip(self))]
    pub async fn place_order(&self) -> ApiResult<Order> {
        let cart_problems = self.cart.validation_errors();
        if !cart_problems.is_empty() {
            return Err(cart_validation_error(cart_problems));
        }
        let Some(subscription) = self.subscription.current() else {
            return Err(ApiError::Validation {
                message: "An active subscription is required to order".to_owned(),
                fields: HashMap::new(),
            });
        };
        // Checked by validation_errors already; kept for the type system.
        let Some(address_id) = self.cart.delivery_address_id() else {
            return Err(cart_validation_error(vec![
                "Choose a delivery address".to_owned(),
            ]));
        };

        let request = NewOrder {
            subscription_id: subscription.id,
            delivery_address_id: address_id,
            meals: self
                .cart
                .items()
                .into_iter()
                .map(|item| OrderMeal {
                    meal_id: item.meal.id,
                    quantity: item.quantity,
                })
                .collect(),
            add_ons: self
                .cart
                .add_ons()
                .into_iter()
                .map(|line| OrderAddOn {
                    add_on_id: line.add_on.id,
                    quantity: line.quantity,
                })
                .collect(),
            discount_code: self
                .cart
                .discount()
                .filter(|d| d.valid)
                .map(|d| d.code),
            notes: self.cart.notes().unwrap_or_default(),
        };

        let order: Order = self.api.post(endpoints::DELIVERIES, &request).await?;
        info!(order = %order.id, "order placed");

        self.cart.clear();
        self.cache.put_entity(Partition::Orders, &order);
        self.orders.upsert(order.clone());
        self.bus.emit(&AppEvent::OrderCreated(order.clone()));
        Ok(order)
    }

    /// # Errors
    /// See [`ApiError`].
    pub async fn get_order(&self, id: &OrderId) -> ApiResult<Order> {
        match self.api.get::<Order>(&endpoints::delivery(id)).await {
            Ok(order) => {
                self.cache.put_entity(Partition::Orders, &order);
                self.orders.upsert(order.clone());
                Ok(order)
            }
            Err(ApiError::Network(e)) => self
                .cache
                .get::<Order>(Partition::Orders, id.as_str())
                .ok_or(ApiError::Network(e)),
            Err(e) => Err(e),
        }
    }

    /// Confirm receipt of a delivered order.
    ///
    /// # Errors
    /// See [`ApiError`].
    #[instrument(skip(self))]
    pub async fn confirm_order(&self, id: &OrderId) -> ApiResult<Order> {
        let order: Order = self.api.post_empty(&endpoints::delivery_confirm(id)).await?;
        self.cache.put_entity(Partition::Orders, &order);
        self.orders.upsert(order.clone());
        self.bus.emit(&AppEvent::OrderConfirmed(order.clone()));
        Ok(order)
    }

    /// Change an upcoming order's contents before the kitchen locks it.
    ///
    /// # Errors
    /// See [`ApiError`].
    #[instrument(skip(self, request))]
    pub async fn update_order(&self, id: &OrderId, request: &NewOrder) -> ApiResult<Order> {
        let order: Order = self.api.patch(&endpoints::delivery(id), request).await?;
        self.cache.put_entity(Partition::Orders, &order);
        self.orders.upsert(order.clone());
        Ok(order)
    }

    /// Cancel an upcoming order.
    ///
    /// # Errors
    /// See [`ApiError`].
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, id: &OrderId) -> ApiResult<Order> {
        let order: Order = self.api.post_empty(&endpoints::delivery_cancel(id)).await?;
        info!(order = %order.id, "order cancelled");

        self.cache.put_entity(Partition::Orders, &order);
        self.orders.upsert(order.clone());
        self.bus.emit(&AppEvent::OrderCancelled(order.clone()));
        Ok(order)
    }

    /// Fetch the QR payload the courier scans at handoff.
    ///
    /// # Errors
    /// See [`ApiError`].
    pub async fn verification_details(&self, id: &OrderId) -> ApiResult<VerificationDetails> {
        self.api.get(&endpoints::delivery_verification(id)).await
    }
}

fn cart_validation_error(problems: Vec<String>) -> ApiError {
    let fields = problems
        .iter()
        .enumerate()
        .map(|(i, p)| (format!("cart[{i}]"), p.clone()))
        .collect();
    ApiError::Validation {
        message: problems.join("; "),
        fields,
    }
}
