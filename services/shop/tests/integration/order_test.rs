use rust_decimal_macros::dec;
use uuid::Uuid;

use lisa_domain::order::{OrderPaymentStatus, OrderStatus};
use lisa_domain::pagination::PageRequest;
use lisa_shop::domain::types::{Actor, CartLine};
use lisa_shop::error::ShopError;
use lisa_shop::usecase::order::{
    AdminChangeStatusUseCase, AdminListOrdersUseCase, CancelOrderUseCase, CreateOrderUseCase,
    GetOrderUseCase, ListOrdersUseCase,
};

use crate::helpers::{MemoryStore, admin, customer, line, test_product};

// ── CreateOrderUseCase ───────────────────────────────────────────────────────

#[tokio::test]
async fn should_create_order_with_total_and_reserve_stock() {
    let a = test_product("Hammer", dec!(10.00), 5);
    let b = test_product("Nails", dec!(5.00), 3);
    let store = MemoryStore::with_products(vec![a.clone(), b.clone()]);
    let actor = customer();

    let usecase = CreateOrderUseCase {
        orders: store.clone(),
    };
    let order = usecase
        .execute(actor, vec![line(&a, 2), line(&b, 1)])
        .await
        .unwrap();

    assert_eq!(order.total_amount, dec!(25.00));
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, OrderPaymentStatus::Pending);
    assert_eq!(order.user_id, actor.user_id);
    assert_eq!(store.stock_of(a.id), 3);
    assert_eq!(store.stock_of(b.id), 2);
}

#[tokio::test]
async fn should_merge_duplicate_cart_lines() {
    let a = test_product("Hammer", dec!(10.00), 5);
    let store = MemoryStore::with_products(vec![a.clone()]);

    let usecase = CreateOrderUseCase {
        orders: store.clone(),
    };
    let order = usecase
        .execute(customer(), vec![line(&a, 1), line(&a, 2)])
        .await
        .unwrap();

    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 3);
    assert_eq!(order.total_amount, dec!(30.00));
    assert_eq!(store.stock_of(a.id), 2);
}

#[tokio::test]
async fn should_reject_quantity_above_stock_without_side_effects() {
    let a = test_product("Hammer", dec!(10.00), 1);
    let store = MemoryStore::with_products(vec![a.clone()]);

    let usecase = CreateOrderUseCase {
        orders: store.clone(),
    };
    let result = usecase.execute(customer(), vec![line(&a, 2)]).await;

    match result {
        Err(ShopError::InsufficientStock {
            product_id,
            available,
            requested,
        }) => {
            assert_eq!(product_id, a.id);
            assert_eq!(available, 1);
            assert_eq!(requested, 2);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(store.stock_of(a.id), 1);
}

#[tokio::test]
async fn should_leave_every_stock_untouched_when_one_line_fails() {
    let a = test_product("Hammer", dec!(10.00), 5);
    let b = test_product("Nails", dec!(5.00), 0);
    let store = MemoryStore::with_products(vec![a.clone(), b.clone()]);

    let usecase = CreateOrderUseCase {
        orders: store.clone(),
    };
    let result = usecase
        .execute(customer(), vec![line(&a, 2), line(&b, 1)])
        .await;

    assert!(
        matches!(result, Err(ShopError::InsufficientStock { .. })),
        "expected InsufficientStock, got {result:?}"
    );
    assert_eq!(store.stock_of(a.id), 5);
    assert_eq!(store.stock_of(b.id), 0);
}

#[tokio::test]
async fn should_reject_unknown_or_inactive_product() {
    let mut hidden = test_product("Retired", dec!(1.00), 10);
    hidden.is_active = false;
    let store = MemoryStore::with_products(vec![hidden.clone()]);
    let usecase = CreateOrderUseCase {
        orders: store.clone(),
    };

    let result = usecase.execute(customer(), vec![line(&hidden, 1)]).await;
    assert!(
        matches!(result, Err(ShopError::ProductNotFound)),
        "expected ProductNotFound, got {result:?}"
    );

    let missing = CartLine {
        product_id: Uuid::now_v7(),
        quantity: 1,
    };
    let result = usecase.execute(customer(), vec![missing]).await;
    assert!(
        matches!(result, Err(ShopError::ProductNotFound)),
        "expected ProductNotFound, got {result:?}"
    );
    assert_eq!(store.stock_of(hidden.id), 10);
}

#[tokio::test]
async fn should_reject_empty_cart_and_non_positive_quantity() {
    let a = test_product("Hammer", dec!(10.00), 5);
    let store = MemoryStore::with_products(vec![a.clone()]);
    let usecase = CreateOrderUseCase {
        orders: store.clone(),
    };

    let result = usecase.execute(customer(), vec![]).await;
    assert!(
        matches!(result, Err(ShopError::Validation(_))),
        "expected Validation, got {result:?}"
    );

    let result = usecase.execute(customer(), vec![line(&a, 0)]).await;
    assert!(
        matches!(result, Err(ShopError::Validation(_))),
        "expected Validation, got {result:?}"
    );
    assert_eq!(store.stock_of(a.id), 5);
}

// ── GetOrderUseCase / ListOrdersUseCase ──────────────────────────────────────

#[tokio::test]
async fn should_hide_order_from_other_customers_but_not_admins() {
    let a = test_product("Hammer", dec!(10.00), 5);
    let store = MemoryStore::with_products(vec![a.clone()]);
    let owner = customer();
    let order = CreateOrderUseCase {
        orders: store.clone(),
    }
    .execute(owner, vec![line(&a, 1)])
    .await
    .unwrap();

    let usecase = GetOrderUseCase {
        orders: store.clone(),
        payments: store.clone(),
    };

    let result = usecase.execute(customer(), order.id).await;
    assert!(
        matches!(result, Err(ShopError::Forbidden)),
        "expected Forbidden, got {result:?}"
    );

    let details = usecase.execute(admin(), order.id).await.unwrap();
    assert_eq!(details.order.id, order.id);
    assert!(details.payments.is_empty());

    let details = usecase.execute(owner, order.id).await.unwrap();
    assert_eq!(details.order.items[0].product_name.as_deref(), Some("Hammer"));

    let result = usecase.execute(owner, Uuid::now_v7()).await;
    assert!(
        matches!(result, Err(ShopError::OrderNotFound)),
        "expected OrderNotFound, got {result:?}"
    );
}

#[tokio::test]
async fn should_list_only_own_orders_oldest_first() {
    let a = test_product("Hammer", dec!(10.00), 10);
    let store = MemoryStore::with_products(vec![a.clone()]);
    let me = customer();
    let create = CreateOrderUseCase {
        orders: store.clone(),
    };
    let first = create.execute(me, vec![line(&a, 1)]).await.unwrap();
    create.execute(customer(), vec![line(&a, 1)]).await.unwrap();
    let second = create.execute(me, vec![line(&a, 2)]).await.unwrap();

    let orders = ListOrdersUseCase {
        orders: store.clone(),
    }
    .execute(me)
    .await
    .unwrap();

    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);
}

// ── CancelOrderUseCase ───────────────────────────────────────────────────────

#[tokio::test]
async fn should_restore_stock_exactly_on_cancel() {
    let a = test_product("Hammer", dec!(10.00), 5);
    let b = test_product("Nails", dec!(5.00), 3);
    let store = MemoryStore::with_products(vec![a.clone(), b.clone()]);
    let owner = customer();
    let order = CreateOrderUseCase {
        orders: store.clone(),
    }
    .execute(owner, vec![line(&a, 2), line(&b, 3)])
    .await
    .unwrap();
    assert_eq!(store.stock_of(b.id), 0);

    let usecase = CancelOrderUseCase {
        orders: store.clone(),
    };
    let cancelled = usecase.execute(owner, order.id).await.unwrap();

    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(store.stock_of(a.id), 5);
    assert_eq!(store.stock_of(b.id), 3);
}

#[tokio::test]
async fn should_reject_second_cancel_without_touching_stock() {
    let a = test_product("Hammer", dec!(10.00), 5);
    let store = MemoryStore::with_products(vec![a.clone()]);
    let owner = customer();
    let order = CreateOrderUseCase {
        orders: store.clone(),
    }
    .execute(owner, vec![line(&a, 2)])
    .await
    .unwrap();
    let usecase = CancelOrderUseCase {
        orders: store.clone(),
    };
    usecase.execute(owner, order.id).await.unwrap();

    let result = usecase.execute(owner, order.id).await;

    match result {
        Err(ShopError::InvalidTransition { from, to }) => {
            assert_eq!(from, "cancelled");
            assert_eq!(to, "cancelled");
        }
        other => panic!("expected InvalidTransition, got {other:?}"),
    }
    assert_eq!(store.stock_of(a.id), 5);
}

#[tokio::test]
async fn should_not_cancel_completed_order() {
    let a = test_product("Hammer", dec!(10.00), 5);
    let store = MemoryStore::with_products(vec![a.clone()]);
    let owner = customer();
    let order = CreateOrderUseCase {
        orders: store.clone(),
    }
    .execute(owner, vec![line(&a, 1)])
    .await
    .unwrap();
    AdminChangeStatusUseCase {
        orders: store.clone(),
    }
    .execute(admin(), order.id, OrderStatus::Completed)
    .await
    .unwrap();

    let result = CancelOrderUseCase {
        orders: store.clone(),
    }
    .execute(owner, order.id)
    .await;

    assert!(
        matches!(result, Err(ShopError::InvalidTransition { .. })),
        "expected InvalidTransition, got {result:?}"
    );
    assert_eq!(store.stock_of(a.id), 4);
}

#[tokio::test]
async fn should_forbid_cancelling_someone_elses_order() {
    let a = test_product("Hammer", dec!(10.00), 5);
    let store = MemoryStore::with_products(vec![a.clone()]);
    let order = CreateOrderUseCase {
        orders: store.clone(),
    }
    .execute(customer(), vec![line(&a, 1)])
    .await
    .unwrap();

    let result = CancelOrderUseCase {
        orders: store.clone(),
    }
    .execute(customer(), order.id)
    .await;

    assert!(
        matches!(result, Err(ShopError::Forbidden)),
        "expected Forbidden, got {result:?}"
    );
    assert_eq!(store.order(order.id).status, OrderStatus::Pending);
}

// ── Admin ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_let_admin_override_status_without_stock_changes() {
    let a = test_product("Hammer", dec!(10.00), 5);
    let store = MemoryStore::with_products(vec![a.clone()]);
    let order = CreateOrderUseCase {
        orders: store.clone(),
    }
    .execute(customer(), vec![line(&a, 2)])
    .await
    .unwrap();
    let usecase = AdminChangeStatusUseCase {
        orders: store.clone(),
    };

    usecase
        .execute(admin(), order.id, OrderStatus::Cancelled)
        .await
        .unwrap();
    let reopened = usecase
        .execute(admin(), order.id, OrderStatus::Pending)
        .await
        .unwrap();

    assert_eq!(reopened.status, OrderStatus::Pending);
    assert_eq!(store.stock_of(a.id), 3);
}

#[tokio::test]
async fn should_require_admin_for_admin_order_operations() {
    let store = MemoryStore::new();
    let actor: Actor = customer();

    let result = AdminListOrdersUseCase {
        orders: store.clone(),
    }
    .execute(actor, PageRequest::default())
    .await;
    assert!(
        matches!(result, Err(ShopError::Forbidden)),
        "expected Forbidden, got {result:?}"
    );

    let result = AdminChangeStatusUseCase {
        orders: store.clone(),
    }
    .execute(actor, Uuid::now_v7(), OrderStatus::Completed)
    .await;
    assert!(
        matches!(result, Err(ShopError::Forbidden)),
        "expected Forbidden, got {result:?}"
    );
}

#[tokio::test]
async fn should_report_missing_order_on_admin_override() {
    let result = AdminChangeStatusUseCase {
        orders: MemoryStore::new(),
    }
    .execute(admin(), Uuid::now_v7(), OrderStatus::Completed)
    .await;

    assert!(
        matches!(result, Err(ShopError::OrderNotFound)),
        "expected OrderNotFound, got {result:?}"
    );
}

#[tokio::test]
async fn should_list_all_orders_newest_first_for_admin() {
    let a = test_product("Hammer", dec!(10.00), 10);
    let store = MemoryStore::with_products(vec![a.clone()]);
    let create = CreateOrderUseCase {
        orders: store.clone(),
    };
    let first = create.execute(customer(), vec![line(&a, 1)]).await.unwrap();
    let second = create.execute(customer(), vec![line(&a, 1)]).await.unwrap();

    let orders = AdminListOrdersUseCase {
        orders: store.clone(),
    }
    .execute(admin(), PageRequest::default())
    .await
    .unwrap();

    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}
