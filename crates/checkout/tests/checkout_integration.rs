//! End-to-end workflow tests over the in-memory store and gateway.

use std::sync::Arc;

use checkout::{
    CartService, CheckoutError, InMemoryGateway, OrderPipeline, PaymentReconciler, PlaceOrder,
    WalletService,
};
use common::{AddressId, PaymentMethodId, Sku, UserId};
use domain::{
    CatalogProduct, Coupon, CouponError, DiscountRule, Money, OrderStatus, PaymentStatus,
};
use store::{InventoryStore, MemoryStore, PaymentStore};

struct Harness {
    store: Arc<MemoryStore>,
    gateway: InMemoryGateway,
    cart: CartService<MemoryStore>,
    pipeline: OrderPipeline<MemoryStore>,
    payments: PaymentReconciler<MemoryStore, InMemoryGateway>,
    wallet: WalletService<MemoryStore>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let gateway = InMemoryGateway::new();
    Harness {
        cart: CartService::new(store.clone()),
        pipeline: OrderPipeline::new(store.clone()),
        payments: PaymentReconciler::new(store.clone(), gateway.clone()),
        wallet: WalletService::new(store.clone()),
        store,
        gateway,
    }
}

fn product(sku: &str, price_cents: i64) -> CatalogProduct {
    CatalogProduct {
        sku: Sku::new(sku),
        name: format!("{sku} name"),
        brand: "acme".to_string(),
        category: "widgets".to_string(),
        price: Money::from_cents(price_cents),
    }
}

fn place_cmd(user: UserId) -> PlaceOrder {
    PlaceOrder {
        user,
        address_id: AddressId::new(1),
        payment_method_id: PaymentMethodId::new(1),
        coupon_code: None,
    }
}

async fn seed_two_products(h: &Harness) {
    h.store.seed_product(product("SKU-A", 2_500), 10).await;
    h.store.seed_product(product("SKU-B", 1_000), 5).await;
}

#[tokio::test]
async fn test_place_capture_happy_path() {
    let h = harness();
    seed_two_products(&h).await;
    let user = UserId::new();

    h.cart.add_item(user, &Sku::new("SKU-A"), 2).await.unwrap();
    h.cart.add_item(user, &Sku::new("SKU-B"), 3).await.unwrap();

    let order = h.pipeline.place_order(place_cmd(user)).await.unwrap();
    assert_eq!(order.status, OrderStatus::Placed);
    assert_eq!(order.payment_status, PaymentStatus::NotPaid);
    assert_eq!(order.subtotal, Money::from_cents(8_000));
    assert_eq!(order.final_price, Money::from_cents(8_000));
    assert_eq!(order.lines.len(), 2);

    // Placement clears the cart but does not touch stock.
    let snapshot = h.cart.snapshot(user).await.unwrap();
    assert!(snapshot.is_empty());
    assert_eq!(h.store.stock(&Sku::new("SKU-A")).await.unwrap(), 10);

    let session = h.payments.initiate_capture(order.id, user).await.unwrap();
    assert_eq!(
        h.gateway.session_amount(&session.session_id),
        Some(Money::from_cents(8_000))
    );

    let paid = h
        .payments
        .confirm_capture(order.id, &session.session_id, "pay_001")
        .await
        .unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);

    // Stock is decremented exactly at capture.
    assert_eq!(h.store.stock(&Sku::new("SKU-A")).await.unwrap(), 8);
    assert_eq!(h.store.stock(&Sku::new("SKU-B")).await.unwrap(), 2);
}

#[tokio::test]
async fn test_place_order_empty_cart_rejected() {
    let h = harness();
    let user = UserId::new();
    let err = h.pipeline.place_order(place_cmd(user)).await.unwrap_err();
    assert!(matches!(err, CheckoutError::EmptyCart));
    assert_eq!(h.store.order_count().await, 0);
}

#[tokio::test]
async fn test_duplicate_cart_item_rejected() {
    let h = harness();
    seed_two_products(&h).await;
    let user = UserId::new();

    h.cart.add_item(user, &Sku::new("SKU-A"), 1).await.unwrap();
    let err = h
        .cart
        .add_item(user, &Sku::new("SKU-A"), 2)
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::DuplicateItem { .. }));

    // The original line is untouched.
    let snapshot = h.cart.snapshot(user).await.unwrap();
    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(snapshot.items[0].quantity, 1);
}

#[tokio::test]
async fn test_update_quantity_beyond_stock_rejected() {
    let h = harness();
    seed_two_products(&h).await;
    let user = UserId::new();

    h.cart.add_item(user, &Sku::new("SKU-B"), 2).await.unwrap();

    // SKU-B has 5 in stock; asking for 6 fails and leaves the line alone.
    let err = h
        .cart
        .update_quantity(user, &Sku::new("SKU-B"), 6)
        .await
        .unwrap_err();
    match err {
        CheckoutError::OutOfStock {
            sku,
            requested,
            available,
        } => {
            assert_eq!(sku, Sku::new("SKU-B"));
            assert_eq!(requested, 6);
            assert_eq!(available, 5);
        }
        other => panic!("expected OutOfStock, got {other:?}"),
    }
    let snapshot = h.cart.snapshot(user).await.unwrap();
    assert_eq!(snapshot.items[0].quantity, 2);

    // Up to the full stock is fine.
    h.cart
        .update_quantity(user, &Sku::new("SKU-B"), 5)
        .await
        .unwrap();
    let snapshot = h.cart.snapshot(user).await.unwrap();
    assert_eq!(snapshot.items[0].quantity, 5);
}

#[tokio::test]
async fn test_remove_item_with_stale_catalog_reference() {
    let h = harness();
    seed_two_products(&h).await;
    let user = UserId::new();

    h.cart.add_item(user, &Sku::new("SKU-B"), 1).await.unwrap();
    h.store.remove_product(&Sku::new("SKU-B")).await;

    let err = h
        .cart
        .remove_item(user, &Sku::new("SKU-B"))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::NotFound(_)));
}

#[tokio::test]
async fn test_oversized_quantity_rejected_as_invalid() {
    let h = harness();
    seed_two_products(&h).await;
    let user = UserId::new();

    let err = h
        .cart
        .add_item(user, &Sku::new("SKU-A"), u32::MAX)
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::InvalidArgument(_)));

    h.cart.add_item(user, &Sku::new("SKU-A"), 1).await.unwrap();
    let err = h
        .cart
        .update_quantity(user, &Sku::new("SKU-A"), u32::MAX)
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_place_order_out_of_stock_rejected() {
    let h = harness();
    seed_two_products(&h).await;
    let user = UserId::new();

    h.cart.add_item(user, &Sku::new("SKU-B"), 5).await.unwrap();
    h.store
        .decrement_stock(&Sku::new("SKU-B"), 3)
        .await
        .unwrap();

    let err = h.pipeline.place_order(place_cmd(user)).await.unwrap_err();
    match err {
        CheckoutError::OutOfStock {
            sku,
            requested,
            available,
        } => {
            assert_eq!(sku, Sku::new("SKU-B"));
            assert_eq!(requested, 5);
            assert_eq!(available, 2);
        }
        other => panic!("expected OutOfStock, got {other:?}"),
    }
    // The cart survives a rejected placement.
    assert!(!h.cart.snapshot(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_order_freezes_prices_at_placement() {
    let h = harness();
    seed_two_products(&h).await;
    let user = UserId::new();

    h.cart.add_item(user, &Sku::new("SKU-A"), 1).await.unwrap();
    let order = h.pipeline.place_order(place_cmd(user)).await.unwrap();

    // Catalog price changes after placement.
    h.store.seed_product(product("SKU-A", 9_900), 10).await;

    let session = h.payments.initiate_capture(order.id, user).await.unwrap();
    assert_eq!(
        h.gateway.session_amount(&session.session_id),
        Some(Money::from_cents(2_500))
    );
    let reloaded = h.pipeline.order_for_user(order.id, user).await.unwrap();
    assert_eq!(reloaded.lines[0].unit_price, Money::from_cents(2_500));
}

#[tokio::test]
async fn test_percent_coupon_applied_and_single_use() {
    let h = harness();
    seed_two_products(&h).await;
    h.store
        .seed_coupon(Coupon {
            id: 1,
            code: "SAVE20".to_string(),
            rule: DiscountRule::Percent(20),
            min_order_value: Money::from_cents(4_000),
            expires_at: None,
        })
        .await;
    let user = UserId::new();

    h.cart.add_item(user, &Sku::new("SKU-A"), 2).await.unwrap();
    let mut cmd = place_cmd(user);
    cmd.coupon_code = Some("SAVE20".to_string());
    let order = h.pipeline.place_order(cmd).await.unwrap();

    assert_eq!(order.subtotal, Money::from_cents(5_000));
    assert_eq!(order.discount, Money::from_cents(1_000));
    assert_eq!(order.final_price, Money::from_cents(4_000));
    assert_eq!(order.coupon_code.as_deref(), Some("SAVE20"));

    // Second use by the same user is rejected.
    h.cart.add_item(user, &Sku::new("SKU-A"), 2).await.unwrap();
    let mut cmd = place_cmd(user);
    cmd.coupon_code = Some("SAVE20".to_string());
    let err = h.pipeline.place_order(cmd).await.unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::Coupon(CouponError::AlreadyUsed)
    ));
}

#[tokio::test]
async fn test_racing_single_use_coupon_leaves_no_stray_order() {
    // The redemption is recorded before the order is written, so the
    // loser of two simultaneous placements fails without persisting a
    // discounted order. Repeated to give the interleaving a chance.
    for _ in 0..25 {
        let h = harness();
        seed_two_products(&h).await;
        h.store
            .seed_coupon(Coupon {
                id: 7,
                code: "ONCE".to_string(),
                rule: DiscountRule::Percent(10),
                min_order_value: Money::zero(),
                expires_at: None,
            })
            .await;
        let user = UserId::new();
        h.cart.add_item(user, &Sku::new("SKU-A"), 2).await.unwrap();

        let mut cmd = place_cmd(user);
        cmd.coupon_code = Some("ONCE".to_string());

        let first = tokio::spawn({
            let store = h.store.clone();
            let cmd = cmd.clone();
            async move { OrderPipeline::new(store).place_order(cmd).await }
        });
        let second = tokio::spawn({
            let store = h.store.clone();
            let cmd = cmd.clone();
            async move { OrderPipeline::new(store).place_order(cmd).await }
        });
        let results = [first.await.unwrap(), second.await.unwrap()];

        let successes = results.iter().filter(|result| result.is_ok()).count();
        assert!(successes >= 1);
        // Every persisted order corresponds to a reported success.
        assert_eq!(h.store.order_count().await, successes);
        for result in results {
            if let Err(err) = result {
                assert!(matches!(
                    err,
                    CheckoutError::Coupon(CouponError::AlreadyUsed) | CheckoutError::EmptyCart
                ));
            }
        }
    }
}

#[tokio::test]
async fn test_coupon_below_minimum_rejected() {
    let h = harness();
    seed_two_products(&h).await;
    h.store
        .seed_coupon(Coupon {
            id: 1,
            code: "BIG".to_string(),
            rule: DiscountRule::Percent(50),
            min_order_value: Money::from_cents(10_000),
            expires_at: None,
        })
        .await;
    let user = UserId::new();

    h.cart.add_item(user, &Sku::new("SKU-B"), 1).await.unwrap();
    let mut cmd = place_cmd(user);
    cmd.coupon_code = Some("BIG".to_string());
    let err = h.pipeline.place_order(cmd).await.unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::Coupon(CouponError::BelowMinimum { .. })
    ));
}

#[tokio::test]
async fn test_flat_coupon_never_drives_price_negative() {
    let h = harness();
    seed_two_products(&h).await;
    h.store
        .seed_coupon(Coupon {
            id: 2,
            code: "FLAT5000".to_string(),
            rule: DiscountRule::Flat(Money::from_cents(5_000)),
            min_order_value: Money::zero(),
            expires_at: None,
        })
        .await;
    let user = UserId::new();

    h.cart.add_item(user, &Sku::new("SKU-B"), 1).await.unwrap();
    let mut cmd = place_cmd(user);
    cmd.coupon_code = Some("FLAT5000".to_string());
    let order = h.pipeline.place_order(cmd).await.unwrap();

    assert_eq!(order.subtotal, Money::from_cents(1_000));
    assert_eq!(order.discount, Money::from_cents(1_000));
    assert!(order.final_price.is_zero());
}

#[tokio::test]
async fn test_confirm_capture_is_idempotent() {
    let h = harness();
    seed_two_products(&h).await;
    let user = UserId::new();

    h.cart.add_item(user, &Sku::new("SKU-A"), 2).await.unwrap();
    let order = h.pipeline.place_order(place_cmd(user)).await.unwrap();
    let session = h.payments.initiate_capture(order.id, user).await.unwrap();

    h.payments
        .confirm_capture(order.id, &session.session_id, "pay_001")
        .await
        .unwrap();
    let err = h
        .payments
        .confirm_capture(order.id, &session.session_id, "pay_001")
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::AlreadyPaid(id) if id == order.id));

    // Redelivery decrements nothing.
    assert_eq!(h.store.stock(&Sku::new("SKU-A")).await.unwrap(), 8);
}

#[tokio::test]
async fn test_cancel_unpaid_order_leaves_stock_and_wallet() {
    let h = harness();
    seed_two_products(&h).await;
    let user = UserId::new();

    h.cart.add_item(user, &Sku::new("SKU-A"), 2).await.unwrap();
    let order = h.pipeline.place_order(place_cmd(user)).await.unwrap();

    let canceled = h.pipeline.cancel_order(order.id, user).await.unwrap();
    assert_eq!(canceled.status, OrderStatus::Canceled);
    assert_eq!(h.store.stock(&Sku::new("SKU-A")).await.unwrap(), 10);
    assert!(h.wallet.balance(user).await.unwrap().is_zero());
}

#[tokio::test]
async fn test_cancel_paid_order_refunds_and_restocks() {
    let h = harness();
    seed_two_products(&h).await;
    let user = UserId::new();

    h.cart.add_item(user, &Sku::new("SKU-A"), 2).await.unwrap();
    let order = h.pipeline.place_order(place_cmd(user)).await.unwrap();
    let session = h.payments.initiate_capture(order.id, user).await.unwrap();
    h.payments
        .confirm_capture(order.id, &session.session_id, "pay_001")
        .await
        .unwrap();
    assert_eq!(h.store.stock(&Sku::new("SKU-A")).await.unwrap(), 8);

    let canceled = h.pipeline.cancel_order(order.id, user).await.unwrap();
    assert_eq!(canceled.status, OrderStatus::Canceled);
    assert_eq!(h.store.stock(&Sku::new("SKU-A")).await.unwrap(), 10);
    assert_eq!(
        h.wallet.balance(user).await.unwrap(),
        Money::from_cents(5_000)
    );
}

#[tokio::test]
async fn test_cancel_shipped_order_rejected() {
    let h = harness();
    seed_two_products(&h).await;
    let user = UserId::new();

    h.cart.add_item(user, &Sku::new("SKU-A"), 1).await.unwrap();
    let order = h.pipeline.place_order(place_cmd(user)).await.unwrap();
    h.pipeline
        .approve_order(order.id, OrderStatus::Processing)
        .await
        .unwrap();
    h.pipeline
        .approve_order(order.id, OrderStatus::Shipped)
        .await
        .unwrap();

    let err = h.pipeline.cancel_order(order.id, user).await.unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::InvalidState {
            status: OrderStatus::Shipped,
            ..
        }
    ));
}

#[tokio::test]
async fn test_confirm_capture_after_cancel_rejected() {
    let h = harness();
    seed_two_products(&h).await;
    let user = UserId::new();

    h.cart.add_item(user, &Sku::new("SKU-A"), 2).await.unwrap();
    let order = h.pipeline.place_order(place_cmd(user)).await.unwrap();
    let session = h.payments.initiate_capture(order.id, user).await.unwrap();

    h.pipeline.cancel_order(order.id, user).await.unwrap();

    let err = h
        .payments
        .confirm_capture(order.id, &session.session_id, "pay_001")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::InvalidState {
            status: OrderStatus::Canceled,
            ..
        }
    ));
    // The losing capture leaves stock untouched.
    assert_eq!(h.store.stock(&Sku::new("SKU-A")).await.unwrap(), 10);
}

#[tokio::test]
async fn test_full_return_flow_refunds_on_approval() {
    let h = harness();
    seed_two_products(&h).await;
    let user = UserId::new();

    h.cart.add_item(user, &Sku::new("SKU-B"), 2).await.unwrap();
    let order = h.pipeline.place_order(place_cmd(user)).await.unwrap();
    let session = h.payments.initiate_capture(order.id, user).await.unwrap();
    h.payments
        .confirm_capture(order.id, &session.session_id, "pay_001")
        .await
        .unwrap();

    for status in [
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Completed,
    ] {
        h.pipeline.approve_order(order.id, status).await.unwrap();
    }

    let requested = h.pipeline.return_order(order.id, user).await.unwrap();
    assert_eq!(requested.status, OrderStatus::ReturnRequested);
    // Nothing is reconciled until the return is confirmed.
    assert_eq!(h.store.stock(&Sku::new("SKU-B")).await.unwrap(), 3);
    assert!(h.wallet.balance(user).await.unwrap().is_zero());

    let returned = h
        .pipeline
        .approve_order(order.id, OrderStatus::Returned)
        .await
        .unwrap();
    assert_eq!(returned.status, OrderStatus::Returned);
    assert_eq!(h.store.stock(&Sku::new("SKU-B")).await.unwrap(), 5);
    assert_eq!(
        h.wallet.balance(user).await.unwrap(),
        Money::from_cents(2_000)
    );
}

#[tokio::test]
async fn test_return_requires_completed_status() {
    let h = harness();
    seed_two_products(&h).await;
    let user = UserId::new();

    h.cart.add_item(user, &Sku::new("SKU-A"), 1).await.unwrap();
    let order = h.pipeline.place_order(place_cmd(user)).await.unwrap();

    let err = h.pipeline.return_order(order.id, user).await.unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::InvalidState {
            status: OrderStatus::Placed,
            ..
        }
    ));
}

#[tokio::test]
async fn test_approve_order_rejects_illegal_transition() {
    let h = harness();
    seed_two_products(&h).await;
    let user = UserId::new();

    h.cart.add_item(user, &Sku::new("SKU-A"), 1).await.unwrap();
    let order = h.pipeline.place_order(place_cmd(user)).await.unwrap();

    let err = h
        .pipeline
        .approve_order(order.id, OrderStatus::Completed)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::InvalidTransition {
            from: OrderStatus::Placed,
            to: OrderStatus::Completed,
        }
    ));
}

#[tokio::test]
async fn test_second_capture_loses_last_unit() {
    let h = harness();
    h.store.seed_product(product("SKU-RARE", 7_000), 1).await;
    let alice = UserId::new();
    let bob = UserId::new();

    // Both orders pass the placement-time validation read while the
    // single unit is still unclaimed.
    h.cart
        .add_item(alice, &Sku::new("SKU-RARE"), 1)
        .await
        .unwrap();
    h.cart
        .add_item(bob, &Sku::new("SKU-RARE"), 1)
        .await
        .unwrap();
    let order_a = h.pipeline.place_order(place_cmd(alice)).await.unwrap();
    let order_b = h.pipeline.place_order(place_cmd(bob)).await.unwrap();

    let session_a = h.payments.initiate_capture(order_a.id, alice).await.unwrap();
    let session_b = h.payments.initiate_capture(order_b.id, bob).await.unwrap();

    h.payments
        .confirm_capture(order_a.id, &session_a.session_id, "pay_a")
        .await
        .unwrap();
    let err = h
        .payments
        .confirm_capture(order_b.id, &session_b.session_id, "pay_b")
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::StockExhausted { .. }));

    let loser = h.pipeline.order_for_user(order_b.id, bob).await.unwrap();
    assert_eq!(loser.payment_status, PaymentStatus::NotPaid);
    assert_eq!(h.store.stock(&Sku::new("SKU-RARE")).await.unwrap(), 0);
}

#[tokio::test]
async fn test_ownership_enforced_on_cancel_and_capture() {
    let h = harness();
    seed_two_products(&h).await;
    let owner = UserId::new();
    let intruder = UserId::new();

    h.cart
        .add_item(owner, &Sku::new("SKU-A"), 1)
        .await
        .unwrap();
    let order = h.pipeline.place_order(place_cmd(owner)).await.unwrap();

    let err = h.pipeline.cancel_order(order.id, intruder).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Forbidden(_)));
    let err = h
        .payments
        .initiate_capture(order.id, intruder)
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::Forbidden(_)));
}

#[tokio::test]
async fn test_gateway_failure_leaves_no_payment_record() {
    let h = harness();
    seed_two_products(&h).await;
    let user = UserId::new();

    h.cart.add_item(user, &Sku::new("SKU-A"), 1).await.unwrap();
    let order = h.pipeline.place_order(place_cmd(user)).await.unwrap();

    h.gateway.set_fail_on_create(true);
    let err = h.payments.initiate_capture(order.id, user).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Gateway(_)));
    assert!(h.store.payment(order.id).await.unwrap().is_none());

    // Retrying after the gateway recovers succeeds.
    h.gateway.set_fail_on_create(false);
    let session = h.payments.initiate_capture(order.id, user).await.unwrap();
    assert!(h.gateway.session_amount(&session.session_id).is_some());
}

#[tokio::test]
async fn test_reinitiate_replaces_session() {
    let h = harness();
    seed_two_products(&h).await;
    let user = UserId::new();

    h.cart.add_item(user, &Sku::new("SKU-A"), 1).await.unwrap();
    let order = h.pipeline.place_order(place_cmd(user)).await.unwrap();

    let first = h.payments.initiate_capture(order.id, user).await.unwrap();
    let second = h.payments.initiate_capture(order.id, user).await.unwrap();
    assert_ne!(first.session_id, second.session_id);

    // The stale session can no longer confirm.
    let err = h
        .payments
        .confirm_capture(order.id, &first.session_id, "pay_001")
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::NotFound(_)));

    h.payments
        .confirm_capture(order.id, &second.session_id, "pay_002")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_orders_for_user_newest_first() {
    let h = harness();
    seed_two_products(&h).await;
    let user = UserId::new();

    let mut placed = Vec::new();
    for _ in 0..3 {
        h.cart.add_item(user, &Sku::new("SKU-A"), 1).await.unwrap();
        placed.push(h.pipeline.place_order(place_cmd(user)).await.unwrap());
    }

    let listed = h.pipeline.orders_for_user(user).await.unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0].id, placed[2].id);
    assert_eq!(listed[2].id, placed[0].id);
}

#[tokio::test]
async fn test_wallet_debit_guards_balance() {
    let h = harness();
    let user = UserId::new();

    h.wallet
        .credit(user, Money::from_cents(1_000))
        .await
        .unwrap();
    let err = h
        .wallet
        .debit(user, Money::from_cents(1_500))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::InsufficientFunds { .. }));

    let balance = h.wallet.debit(user, Money::from_cents(400)).await.unwrap();
    assert_eq!(balance, Money::from_cents(600));
}
