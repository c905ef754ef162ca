//! Startup orchestration for the dashboard screen.
//!
//! One entry point restores the session and loads everything the dashboard
//! renders, concurrently. Individual fetches may fail without sinking the
//! whole screen; whatever loaded is shown and failures are logged.

use futures::join;
use tracing::{info, instrument, warn};

use crate::error::ApiResult;
use crate::session::SessionManager;

use super::{
    AuthService, MealService, NotificationService, OrderService, SubscriptionService,
};

/// What the dashboard managed to load.
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardLoad {
    pub authenticated: bool,
    pub profile: bool,
    pub meals: bool,
    pub menu: bool,
    pub orders: bool,
    pub subscription: bool,
    pub notifications: bool,
}

#[derive(Clone)]
pub struct DashboardService {
    session: SessionManager,
    auth: AuthService,
    meals: MealService,
    orders: OrderService,
    subscriptions: SubscriptionService,
    notifications: NotificationService,
}

impl DashboardService {
    #[must_use]
    pub fn new(
        session: SessionManager,
        auth: AuthService,
        meals: MealService,
        orders: OrderService,
        subscriptions: SubscriptionService,
        notifications: NotificationService,
    ) -> Self {
        Self {
            session,
            auth,
            meals,
            orders,
            subscriptions,
            notifications,
        }
    }

    /// Restore the session and load the dashboard.
    ///
    /// Unauthenticated startups still load the public catalog so the menu
    /// renders behind the sign-in prompt. Authenticated startups load
    /// account data concurrently and open the notification stream.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> DashboardLoad {
        let authenticated = self.session.init().await;

        if !authenticated {
            let (meals, menu) = join!(self.meals.list_meals(), self.meals.current_menu());
            return DashboardLoad {
                authenticated: false,
                meals: note("meals", meals),
                menu: note("menu", menu),
                ..DashboardLoad::default()
            };
        }

        let (profile, meals, menu, orders, subscription, notifications) = join!(
            self.auth.fetch_profile(),
            self.meals.list_meals(),
            self.meals.current_menu(),
            self.orders.list_orders(1),
            self.subscriptions.fetch_current(),
            self.notifications.fetch(),
        );

        let load = DashboardLoad {
            authenticated: true,
            profile: note("profile", profile),
            meals: note("meals", meals),
            menu: note("menu", menu),
            orders: note("orders", orders),
            subscription: note("subscription", subscription),
            notifications: note("notifications", notifications),
        };

        self.notifications.start_stream();
        info!(?load, "dashboard initialized");
        load
    }
}

fn note<T>(what: &'static str, result: ApiResult<T>) -> bool {
    match result {
        Ok(_) => true,
        Err(e) => {
            warn!(what, error = %e, "dashboard load step failed");
            false
        }
    }
}
