//! The per-store data bundle and the operations staff perform on it.
//!
//! A `StoreData` is loaded, edited and saved as one document. Every
//! operation here is synchronous and takes the current time as an
//! argument so it can be replayed in tests.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::customers::{self, CustomerNote, CustomerProfile};
use crate::error::DomainError;
use crate::fees::{self, CollectionsReport, FeeBreakdown, FeeInput};
use crate::settlement;
use crate::types::{
    CallOutcome, EmployeeId, EmployeeStatus, OrderId, OrderSource, OrderStatus, Permission,
    Phone, ProductId, StoreId,
};

use super::order::{CallLogEntry, NewOrder, Order, OrderItem};
use super::settings::{Employee, StoreSettings};
use super::user::LoyaltyData;
use super::wallet::{Transaction, Wallet};

/// A line in the storefront cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Customer details entered at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutDetails {
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    #[serde(default)]
    pub governorate: String,
    #[serde(default)]
    pub notes: String,
}

/// What a status change did besides moving the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOutcome {
    pub order: Order,
    pub fees: FeeBreakdown,
    pub postings: Vec<Transaction>,
    /// Loyalty points earned; applied to the global blob by the caller.
    pub loyalty_points: i64,
}

/// An order waiting for a confirmation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub order: Order,
    pub fees: FeeBreakdown,
    pub attempts: usize,
    pub blocked_customer: bool,
}

/// Order filter for listings and reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub phone: Option<String>,
}

impl OrderFilter {
    #[must_use]
    pub fn matches(&self, order: &Order) -> bool {
        self.status.is_none_or(|s| order.status == s)
            && self.from.is_none_or(|from| order.created_at >= from)
            && self.to.is_none_or(|to| order.created_at < to)
            && self.phone.as_deref().is_none_or(|raw| {
                order.customer_phone.as_str() == crate::types::normalize_phone(raw)
            })
    }
}

/// Everything persisted for one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StoreData {
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub settings: StoreSettings,
    #[serde(default)]
    pub wallet: Wallet,
    #[serde(default)]
    pub cart: Vec<CartLine>,
    #[serde(default)]
    pub customers: Vec<CustomerNote>,
    /// Bumped on every successful save; stale writes are rejected.
    #[serde(default)]
    pub version: u64,
}

impl StoreData {
    #[must_use]
    pub fn new(settings: StoreSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    // ---------------------------------------------------------------------
    // Orders
    // ---------------------------------------------------------------------

    #[must_use]
    pub fn order(&self, id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| &o.id == id)
    }

    fn order_mut(&mut self, id: &OrderId) -> Result<&mut Order, DomainError> {
        self.orders
            .iter_mut()
            .find(|o| &o.id == id)
            .ok_or_else(|| DomainError::OrderNotFound(id.to_string()))
    }

    /// Orders matching `filter`, newest first.
    #[must_use]
    pub fn list_orders(&self, filter: &OrderFilter) -> Vec<&Order> {
        let mut orders: Vec<&Order> = self.orders.iter().filter(|o| filter.matches(o)).collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.number.cmp(&a.number)));
        orders
    }

    #[must_use]
    pub fn next_order_number(&self) -> u64 {
        self.orders.iter().map(|o| o.number).max().unwrap_or(1000) + 1
    }

    /// Fee breakdown of an order with its courier's configuration.
    #[must_use]
    pub fn fees_for(&self, order: &Order) -> FeeBreakdown {
        let config = self.settings.fees_for(order.shipping_company_id.as_ref());
        fees::calculate(&FeeInput::from(order), &config)
    }

    /// Create an order in `pending_call`, reserving catalog stock.
    ///
    /// # Errors
    ///
    /// Returns an error if the phone is invalid, there are no items, a
    /// quantity is zero, an amount is negative, the courier is unknown,
    /// or stock is short.
    pub fn create_order(
        &mut self,
        new: NewOrder,
        source: OrderSource,
        at: DateTime<Utc>,
    ) -> Result<&Order, DomainError> {
        let phone = Phone::parse(&new.customer_phone)?;
        if new.customer_name.trim().is_empty() {
            return Err(DomainError::Invalid("customer name is required".to_string()));
        }
        if new.items.is_empty() {
            return Err(DomainError::NoItems);
        }
        if new.items.iter().any(|i| i.quantity == 0) {
            return Err(DomainError::Invalid("item quantity must be at least 1".to_string()));
        }
        if let Some(amount) = [new.discount, new.shipping_fee]
            .into_iter()
            .chain(new.items.iter().flat_map(|i| [i.unit_price, i.unit_cost]))
            .find(|amount| *amount < Decimal::ZERO)
        {
            return Err(DomainError::InvalidAmount(amount));
        }
        if let Some(id) = &new.shipping_company_id {
            if self.settings.shipping_company(id).is_none() {
                return Err(DomainError::ShippingCompanyNotFound(id.clone()));
            }
        }

        let items = self.reserve_stock(new.items)?;
        let order = Order {
            id: OrderId::generate(),
            number: self.next_order_number(),
            created_at: at,
            customer_name: new.customer_name.trim().to_owned(),
            customer_phone: phone,
            customer_address: new.customer_address,
            governorate: new.governorate,
            items,
            discount: new.discount,
            shipping_fee: new.shipping_fee,
            shipping_company_id: new.shipping_company_id,
            insured: new.insured,
            inspection_paid_by_customer: new.inspection_paid_by_customer,
            status: OrderStatus::PendingCall,
            status_history: Vec::new(),
            call_log: Vec::new(),
            notes: new.notes,
            source,
        };
        self.orders.push(order);
        self.orders
            .last()
            .ok_or_else(|| DomainError::Invalid("order was not stored".to_string()))
    }

    /// Check and decrement stock for catalog items, filling in catalog
    /// cost where the line has none.
    fn reserve_stock(&mut self, mut items: Vec<OrderItem>) -> Result<Vec<OrderItem>, DomainError> {
        for item in &items {
            let Some(id) = &item.product_id else { continue };
            let product = self
                .settings
                .product(id)
                .ok_or_else(|| DomainError::ProductNotFound(id.clone()))?;
            let requested = items
                .iter()
                .filter(|i| i.product_id.as_ref() == Some(id))
                .try_fold(0_u32, |total, i| total.checked_add(i.quantity));
            match requested {
                Some(requested) if requested <= product.stock => {}
                requested => {
                    return Err(DomainError::OutOfStock {
                        product: product.name.clone(),
                        available: product.stock,
                        requested: requested.unwrap_or(u32::MAX),
                    });
                }
            }
        }

        for item in &mut items {
            let Some(id) = &item.product_id else { continue };
            if let Some(product) = self.settings.product_mut(id) {
                product.stock -= item.quantity;
                if item.unit_cost.is_zero() {
                    item.unit_cost = product.cost;
                }
            }
        }
        Ok(items)
    }

    /// Stock levels after returning `items` to the catalog.
    fn restocked_levels(&self, items: &[OrderItem]) -> Result<HashMap<ProductId, u32>, DomainError> {
        let mut levels: HashMap<ProductId, u32> = HashMap::new();
        for item in items {
            let Some(id) = &item.product_id else { continue };
            let Some(product) = self.settings.product(id) else { continue };
            let level = levels.entry(id.clone()).or_insert(product.stock);
            *level = level.checked_add(item.quantity).ok_or_else(|| {
                DomainError::Invalid(format!("stock of {} would overflow", product.name))
            })?;
        }
        Ok(levels)
    }

    /// Move an order to `next`, posting settlement entries to the wallet
    /// and returning stock for canceled or returned orders.
    ///
    /// Every posting, the loyalty award and the stock levels are checked
    /// before anything changes, so an error leaves the store as it was.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is missing, the move is not allowed,
    /// a posting amount is negative, or loyalty or stock would overflow.
    pub fn transition_order(
        &mut self,
        id: &OrderId,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<TransitionOutcome, DomainError> {
        let mut order = self
            .order(id)
            .cloned()
            .ok_or_else(|| DomainError::OrderNotFound(id.to_string()))?;
        order.transition(next, at)?;

        let fees = self.fees_for(&order);
        let pending = settlement::postings_for(order.number, next, &fees);
        if let Some(posting) = pending.iter().find(|p| p.amount < Decimal::ZERO) {
            return Err(DomainError::InvalidAmount(posting.amount));
        }
        let loyalty_points = if next == OrderStatus::Collected {
            self.settings.loyalty.points_for(fees.price)?
        } else {
            0
        };
        let restocked = if matches!(next, OrderStatus::Canceled | OrderStatus::Returned) {
            self.restocked_levels(&order.items)?
        } else {
            HashMap::new()
        };

        *self.order_mut(id)? = order.clone();
        for (product_id, stock) in restocked {
            if let Some(product) = self.settings.product_mut(&product_id) {
                product.stock = stock;
            }
        }
        let mut postings = Vec::new();
        for posting in pending {
            if let Some(txn) = self.wallet.post(posting, Some(order.id.clone()), at)? {
                postings.push(txn.clone());
            }
        }

        Ok(TransitionOutcome {
            order,
            fees,
            postings,
            loyalty_points,
        })
    }

    /// Log a confirmation call and apply its outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is missing or not in the queue.
    pub fn record_call(
        &mut self,
        id: &OrderId,
        outcome: CallOutcome,
        note: String,
        by: Option<Phone>,
        at: DateTime<Utc>,
    ) -> Result<&Order, DomainError> {
        let current = self
            .order(id)
            .ok_or_else(|| DomainError::OrderNotFound(id.to_string()))?;
        if !current.status.awaits_confirmation() {
            return Err(DomainError::Invalid(format!(
                "order #{} is not waiting for confirmation",
                current.number
            )));
        }
        let status = current.status;
        if let Some(next) = outcome.resulting_status().filter(|next| *next != status) {
            // Confirmation moves never post to the wallet.
            self.transition_order(id, next, at)?;
        }
        let order = self.order_mut(id)?;
        order.call_log.push(CallLogEntry {
            at,
            outcome,
            note,
            by,
        });
        Ok(order)
    }

    /// Orders waiting for a call, oldest first.
    #[must_use]
    pub fn confirmation_queue(&self) -> Vec<QueueEntry> {
        let mut entries: Vec<QueueEntry> = self
            .orders
            .iter()
            .filter(|o| o.status.awaits_confirmation())
            .map(|o| QueueEntry {
                order: o.clone(),
                fees: self.fees_for(o),
                attempts: o.call_log.len(),
                blocked_customer: self
                    .customers
                    .iter()
                    .any(|c| c.phone == o.customer_phone && c.blocked),
            })
            .collect();
        entries.sort_by_key(|e| (e.order.created_at, e.order.number));
        entries
    }

    #[must_use]
    pub fn collections_report(&self, filter: &OrderFilter) -> CollectionsReport {
        let configs: Vec<(&Order, crate::fees::FeeConfig)> = self
            .list_orders(filter)
            .into_iter()
            .map(|o| (o, self.settings.fees_for(o.shipping_company_id.as_ref())))
            .collect();
        CollectionsReport::build(configs.iter().map(|(o, c)| (*o, c)))
    }

    // ---------------------------------------------------------------------
    // Customers
    // ---------------------------------------------------------------------

    #[must_use]
    pub fn customer_profiles(
        &self,
        loyalty: Option<&LoyaltyData>,
        store: &StoreId,
    ) -> Vec<CustomerProfile> {
        customers::aggregate(
            &self.orders,
            &self.customers,
            loyalty.and_then(|l| l.for_store(store)),
        )
    }

    /// Create or replace the staff note on a customer.
    pub fn set_customer_note(&mut self, note: CustomerNote) {
        match self.customers.iter_mut().find(|c| c.phone == note.phone) {
            Some(existing) => *existing = note,
            None => self.customers.push(note),
        }
    }

    // ---------------------------------------------------------------------
    // Storefront cart
    // ---------------------------------------------------------------------

    /// Add `quantity` of a product to the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is unknown, inactive, or the cart
    /// would exceed stock.
    pub fn add_to_cart(&mut self, product_id: &ProductId, quantity: u32) -> Result<(), DomainError> {
        let in_cart = self
            .cart
            .iter()
            .find(|l| &l.product_id == product_id)
            .map_or(0, |l| l.quantity);
        let total = in_cart
            .checked_add(quantity)
            .ok_or_else(|| DomainError::Invalid("cart quantity is too large".to_string()))?;
        self.set_cart_quantity(product_id, total)
    }

    /// Set a cart line's quantity; zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is unknown, inactive, or short.
    pub fn set_cart_quantity(&mut self, product_id: &ProductId, quantity: u32) -> Result<(), DomainError> {
        if quantity == 0 {
            self.cart.retain(|l| &l.product_id != product_id);
            return Ok(());
        }
        let product = self
            .settings
            .product(product_id)
            .filter(|p| p.active)
            .ok_or_else(|| DomainError::ProductNotFound(product_id.clone()))?;
        if quantity > product.stock {
            return Err(DomainError::OutOfStock {
                product: product.name.clone(),
                available: product.stock,
                requested: quantity,
            });
        }
        match self.cart.iter_mut().find(|l| &l.product_id == product_id) {
            Some(line) => line.quantity = quantity,
            None => self.cart.push(CartLine {
                product_id: product_id.clone(),
                quantity,
            }),
        }
        Ok(())
    }

    /// Turn the cart into a storefront order and empty it.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart is empty, a product disappeared, or
    /// stock ran out since it was added.
    pub fn checkout(&mut self, details: CheckoutDetails, at: DateTime<Utc>) -> Result<Order, DomainError> {
        if self.cart.is_empty() {
            return Err(DomainError::EmptyCart);
        }
        let items = self
            .cart
            .iter()
            .map(|line| {
                let product = self
                    .settings
                    .product(&line.product_id)
                    .filter(|p| p.active)
                    .ok_or_else(|| DomainError::ProductNotFound(line.product_id.clone()))?;
                Ok(OrderItem {
                    product_id: Some(product.id.clone()),
                    name: product.name.clone(),
                    quantity: line.quantity,
                    unit_price: product.price,
                    unit_cost: product.cost,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        let new = NewOrder {
            customer_name: details.customer_name,
            customer_phone: details.customer_phone,
            customer_address: details.customer_address,
            governorate: details.governorate,
            items,
            discount: Decimal::ZERO,
            shipping_fee: Decimal::ZERO,
            shipping_company_id: None,
            insured: false,
            inspection_paid_by_customer: false,
            notes: details.notes,
        };
        let order = self.create_order(new, OrderSource::Storefront, at)?.clone();
        self.cart.clear();
        Ok(order)
    }

    // ---------------------------------------------------------------------
    // Employees
    // ---------------------------------------------------------------------

    /// Invite a user by phone.
    ///
    /// # Errors
    ///
    /// Returns an error if the phone is invalid or already a member.
    pub fn invite_employee(
        &mut self,
        phone: &str,
        name: String,
        permissions: BTreeSet<Permission>,
        at: DateTime<Utc>,
    ) -> Result<&Employee, DomainError> {
        let phone = Phone::parse(phone)?;
        if self.settings.membership(&phone).is_some() {
            return Err(DomainError::AlreadyMember(phone.to_string()));
        }
        self.settings.employees.push(Employee {
            id: EmployeeId::generate(),
            phone,
            name,
            permissions,
            status: EmployeeStatus::Invited,
            invited_at: at,
        });
        self.settings
            .employees
            .last()
            .ok_or_else(|| DomainError::Invalid("employee was not stored".to_string()))
    }

    /// Accept the pending invitation for `phone`.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no pending invitation.
    pub fn accept_invitation(&mut self, phone: &Phone) -> Result<&Employee, DomainError> {
        let employee = self
            .settings
            .employees
            .iter_mut()
            .find(|e| &e.phone == phone && e.status == EmployeeStatus::Invited)
            .ok_or_else(|| DomainError::EmployeeNotFound(phone.to_string()))?;
        employee.transition(EmployeeStatus::Active)?;
        Ok(employee)
    }

    /// Remove an invited or active employee.
    ///
    /// # Errors
    ///
    /// Returns an error if the employee is missing or already removed.
    pub fn remove_employee(&mut self, id: &EmployeeId) -> Result<&Employee, DomainError> {
        let employee = self
            .settings
            .employee_mut(id)
            .ok_or_else(|| DomainError::EmployeeNotFound(id.to_string()))?;
        employee.transition(EmployeeStatus::Removed)?;
        Ok(employee)
    }

    /// Replace an employee's permissions.
    ///
    /// # Errors
    ///
    /// Returns an error if the employee is missing or removed.
    pub fn set_employee_permissions(
        &mut self,
        id: &EmployeeId,
        permissions: BTreeSet<Permission>,
    ) -> Result<&Employee, DomainError> {
        let employee = self
            .settings
            .employee_mut(id)
            .filter(|e| e.status != EmployeeStatus::Removed)
            .ok_or_else(|| DomainError::EmployeeNotFound(id.to_string()))?;
        employee.permissions = permissions;
        Ok(employee)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fees::{CodFeeConfig, FeeConfig, InsuranceConfig};
    use crate::model::order::tests::d;
    use crate::model::settings::{Product, ShippingCompany};
    use crate::types::{ShippingCompanyId, TransactionCategory};

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn store() -> StoreData {
        let mut settings = StoreSettings::default();
        settings.shipping_companies.push(ShippingCompany {
            id: ShippingCompanyId::new("ship_bosta"),
            name: "Bosta".to_string(),
            fees: FeeConfig {
                cod: CodFeeConfig {
                    enabled: true,
                    threshold: d("500"),
                    rate: d("0.01"),
                    tax_rate: d("0.14"),
                },
                insurance: InsuranceConfig {
                    enabled: true,
                    rate: d("0.01"),
                },
                inspection_fee: d("20"),
            },
        });
        settings.products.push(Product {
            id: ProductId::new("prd_bag"),
            name: "Leather bag".to_string(),
            price: d("1000"),
            cost: d("600"),
            stock: 3,
            active: true,
        });
        settings.loyalty.enabled = true;
        StoreData::new(settings)
    }

    fn bag_order(quantity: u32) -> NewOrder {
        NewOrder {
            customer_name: "Mona".to_string(),
            customer_phone: "01012345678".to_string(),
            customer_address: "12 Tahrir St".to_string(),
            governorate: "Cairo".to_string(),
            items: vec![OrderItem {
                product_id: Some(ProductId::new("prd_bag")),
                name: "Leather bag".to_string(),
                quantity,
                unit_price: d("1000"),
                unit_cost: Decimal::ZERO,
            }],
            discount: Decimal::ZERO,
            shipping_fee: d("50"),
            shipping_company_id: Some(ShippingCompanyId::new("ship_bosta")),
            insured: true,
            inspection_paid_by_customer: false,
            notes: String::new(),
        }
    }

    #[test]
    fn test_create_order_reserves_stock_and_fills_cost() {
        let mut data = store();
        let order = data.create_order(bag_order(2), OrderSource::Manual, now()).unwrap();
        assert_eq!(order.number, 1001);
        assert_eq!(order.cost(), d("1200"));
        assert_eq!(data.settings.products[0].stock, 1);
    }

    #[test]
    fn test_create_order_out_of_stock() {
        let mut data = store();
        let err = data
            .create_order(bag_order(4), OrderSource::Manual, now())
            .unwrap_err();
        assert!(matches!(err, DomainError::OutOfStock { available: 3, requested: 4, .. }));
        assert_eq!(data.settings.products[0].stock, 3);
        assert!(data.orders.is_empty());
    }

    #[test]
    fn test_full_lifecycle_posts_to_wallet_and_awards_points() {
        let mut data = store();
        let id = data
            .create_order(bag_order(1), OrderSource::Manual, now())
            .unwrap()
            .id
            .clone();

        data.record_call(&id, CallOutcome::Confirmed, String::new(), None, now())
            .unwrap();
        let shipped = data.transition_order(&id, OrderStatus::Shipped, now()).unwrap();
        assert_eq!(shipped.postings.len(), 3);
        data.transition_order(&id, OrderStatus::Delivered, now()).unwrap();
        let collected = data.transition_order(&id, OrderStatus::Collected, now()).unwrap();

        assert_eq!(collected.fees.net_profit, d("363.23"));
        assert_eq!(collected.loyalty_points, 100);
        // 1050 collected − 50 shipping − 10.5 insurance − 20 inspection − 6.27 COD
        assert_eq!(data.wallet.balance(), d("963.23"));
        let summary = data.wallet.summary();
        assert_eq!(summary.by_category[&TransactionCategory::CodFee].withdrawals, d("6.27"));
    }

    #[test]
    fn test_cancel_restocks() {
        let mut data = store();
        let id = data
            .create_order(bag_order(2), OrderSource::Manual, now())
            .unwrap()
            .id
            .clone();
        data.transition_order(&id, OrderStatus::Canceled, now()).unwrap();
        assert_eq!(data.settings.products[0].stock, 3);
        assert!(data.wallet.transactions.is_empty());
    }

    #[test]
    fn test_call_outcomes_drive_queue() {
        let mut data = store();
        let id = data
            .create_order(bag_order(1), OrderSource::Manual, now())
            .unwrap()
            .id
            .clone();

        data.record_call(&id, CallOutcome::NoAnswer, "busy".to_string(), None, now())
            .unwrap();
        data.record_call(&id, CallOutcome::NoAnswer, String::new(), None, now())
            .unwrap();
        let queue = data.confirmation_queue();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].attempts, 2);
        assert_eq!(queue[0].order.status, OrderStatus::NoAnswer);
        assert_eq!(queue[0].fees.cod_fee, d("6.27"));

        let order = data
            .record_call(&id, CallOutcome::Rejected, String::new(), None, now())
            .unwrap();
        assert_eq!(order.status, OrderStatus::Canceled);
        assert!(data.confirmation_queue().is_empty());
        assert!(
            data.record_call(&id, CallOutcome::Confirmed, String::new(), None, now())
                .is_err()
        );
    }

    #[test]
    fn test_checkout_creates_storefront_order() {
        let mut data = store();
        let bag = ProductId::new("prd_bag");
        data.add_to_cart(&bag, 1).unwrap();
        data.add_to_cart(&bag, 1).unwrap();
        assert!(data.add_to_cart(&bag, 2).is_err());

        let order = data
            .checkout(
                CheckoutDetails {
                    customer_name: "Omar".to_string(),
                    customer_phone: "01198765432".to_string(),
                    customer_address: "Nasr City".to_string(),
                    governorate: "Cairo".to_string(),
                    notes: String::new(),
                },
                now(),
            )
            .unwrap();
        assert_eq!(order.source, OrderSource::Storefront);
        assert_eq!(order.price(), d("2000"));
        assert!(data.cart.is_empty());
        assert_eq!(data.settings.products[0].stock, 1);
        assert_eq!(
            data.checkout(
                CheckoutDetails {
                    customer_name: "Omar".to_string(),
                    customer_phone: "01198765432".to_string(),
                    customer_address: String::new(),
                    governorate: String::new(),
                    notes: String::new(),
                },
                now()
            )
            .unwrap_err(),
            DomainError::EmptyCart
        );
    }

    #[test]
    fn test_employee_lifecycle() {
        let mut data = store();
        let perms: BTreeSet<Permission> = [Permission::Orders].into_iter().collect();
        let id = data
            .invite_employee("01055555555", "Hany".to_string(), perms.clone(), now())
            .unwrap()
            .id
            .clone();
        assert!(matches!(
            data.invite_employee("01055555555", "Hany".to_string(), perms, now()),
            Err(DomainError::AlreadyMember(_))
        ));

        let phone = Phone::parse("01055555555").unwrap();
        assert_eq!(
            data.accept_invitation(&phone).unwrap().status,
            EmployeeStatus::Active
        );
        assert!(data.accept_invitation(&phone).is_err());
        assert_eq!(data.remove_employee(&id).unwrap().status, EmployeeStatus::Removed);
        assert!(data.remove_employee(&id).is_err());
        assert!(data.settings.membership(&phone).is_none());
    }

    #[test]
    fn test_collections_report_filters_by_status() {
        let mut data = store();
        let id = data
            .create_order(bag_order(1), OrderSource::Manual, now())
            .unwrap()
            .id
            .clone();
        data.create_order(bag_order(1), OrderSource::Manual, now()).unwrap();
        data.transition_order(&id, OrderStatus::InReview, now()).unwrap();

        let filter = OrderFilter {
            status: Some(OrderStatus::InReview),
            ..OrderFilter::default()
        };
        let report = data.collections_report(&filter);
        assert_eq!(report.lines.len(), 1);
        assert_eq!(report.total_net_profit, d("363.23"));
        assert_eq!(data.collections_report(&OrderFilter::default()).lines.len(), 2);
    }

    #[test]
    fn test_customer_profiles_use_store_loyalty() {
        let mut data = store();
        data.create_order(bag_order(1), OrderSource::Manual, now()).unwrap();
        let store_id = StoreId::new("store_1");
        let mut loyalty = LoyaltyData::default();
        loyalty.award(&store_id, &Phone::parse("01012345678").unwrap(), 7);
        let profiles = data.customer_profiles(Some(&loyalty), &store_id);
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].loyalty_points, 7);
    }

    #[test]
    fn test_negative_amounts_are_rejected_on_create() {
        let mut data = store();
        let mut new = bag_order(1);
        new.shipping_fee = d("-50");
        assert_eq!(
            data.create_order(new, OrderSource::Manual, now()).unwrap_err(),
            DomainError::InvalidAmount(d("-50"))
        );

        let mut new = bag_order(1);
        new.items[0].unit_price = d("-1");
        assert!(matches!(
            data.create_order(new, OrderSource::Manual, now()),
            Err(DomainError::InvalidAmount(_))
        ));
        assert!(data.orders.is_empty());
        assert_eq!(data.settings.products[0].stock, 3);
    }

    #[test]
    fn test_rejected_posting_leaves_order_unchanged() {
        let mut data = store();
        let id = data
            .create_order(bag_order(1), OrderSource::Manual, now())
            .unwrap()
            .id
            .clone();
        data.transition_order(&id, OrderStatus::InReview, now()).unwrap();
        // Documents saved before amounts were validated can still carry this.
        data.orders[0].shipping_fee = d("-50");

        let err = data
            .transition_order(&id, OrderStatus::Shipped, now())
            .unwrap_err();
        assert_eq!(err, DomainError::InvalidAmount(d("-50")));
        let order = data.order(&id).unwrap();
        assert_eq!(order.status, OrderStatus::InReview);
        assert_eq!(order.status_history.len(), 1);
        assert!(data.wallet.transactions.is_empty());
    }

    #[test]
    fn test_loyalty_overflow_leaves_order_uncollected() {
        let mut data = store();
        let id = data
            .create_order(bag_order(1), OrderSource::Manual, now())
            .unwrap()
            .id
            .clone();
        for next in [OrderStatus::InReview, OrderStatus::Shipped, OrderStatus::Delivered] {
            data.transition_order(&id, next, now()).unwrap();
        }
        data.settings.loyalty.units_per_point = Decimal::new(1, 28);

        assert!(data.transition_order(&id, OrderStatus::Collected, now()).is_err());
        assert_eq!(data.order(&id).unwrap().status, OrderStatus::Delivered);
        assert_eq!(data.wallet.transactions.len(), 3);
    }

    #[test]
    fn test_huge_duplicate_lines_do_not_overflow() {
        let mut data = store();
        let mut new = bag_order(u32::MAX);
        let mut extra = new.items[0].clone();
        extra.quantity = 1;
        new.items.push(extra);

        let err = data.create_order(new, OrderSource::Manual, now()).unwrap_err();
        assert!(matches!(
            err,
            DomainError::OutOfStock {
                available: 3,
                requested: u32::MAX,
                ..
            }
        ));
        assert_eq!(data.settings.products[0].stock, 3);
    }

    #[test]
    fn test_cart_quantity_overflow_is_rejected() {
        let mut data = store();
        let bag = ProductId::new("prd_bag");
        data.add_to_cart(&bag, 1).unwrap();
        assert!(matches!(
            data.add_to_cart(&bag, u32::MAX),
            Err(DomainError::Invalid(_))
        ));
        assert_eq!(data.cart[0].quantity, 1);
    }

    #[test]
    fn test_restock_overflow_keeps_order_open() {
        let mut data = store();
        let id = data
            .create_order(bag_order(2), OrderSource::Manual, now())
            .unwrap()
            .id
            .clone();
        data.settings.products[0].stock = u32::MAX;

        assert!(data.transition_order(&id, OrderStatus::Canceled, now()).is_err());
        assert_eq!(data.order(&id).unwrap().status, OrderStatus::PendingCall);
        assert_eq!(data.settings.products[0].stock, u32::MAX);
    }
}
