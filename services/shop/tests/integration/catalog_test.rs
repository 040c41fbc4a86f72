use rust_decimal_macros::dec;

use lisa_domain::pagination::PageRequest;
use lisa_shop::domain::types::ProductPatch;
use lisa_shop::error::ShopError;
use lisa_shop::usecase::catalog::{
    CreateProductInput, CreateProductUseCase, DeleteProductUseCase, GetProductUseCase,
    ListProductsUseCase, UpdateProductUseCase, UploadProductImageUseCase,
};
use lisa_shop::usecase::order::CreateOrderUseCase;

use crate::helpers::{MemoryStorage, MemoryStore, admin, customer, line, test_product};

fn hammer_input() -> CreateProductInput {
    CreateProductInput {
        name: "  Hammer ".to_owned(),
        price: dec!(10.00),
        category: "tools".to_owned(),
        stock_quantity: 5,
        is_active: true,
    }
}

// ── CreateProductUseCase ─────────────────────────────────────────────────────

#[tokio::test]
async fn should_create_product_as_admin() {
    let store = MemoryStore::new();
    let actor = admin();

    let product = CreateProductUseCase {
        products: store.clone(),
    }
    .execute(actor, hammer_input())
    .await
    .unwrap();

    assert_eq!(product.name, "Hammer");
    assert_eq!(product.price, dec!(10.00));
    assert_eq!(product.created_by, Some(actor.user_id));
    assert_eq!(store.stock_of(product.id), 5);
}

#[tokio::test]
async fn should_forbid_customers_from_creating_products() {
    let store = MemoryStore::new();

    let result = CreateProductUseCase {
        products: store.clone(),
    }
    .execute(customer(), hammer_input())
    .await;

    assert!(
        matches!(result, Err(ShopError::Forbidden)),
        "expected Forbidden, got {result:?}"
    );
}

#[tokio::test]
async fn should_validate_new_product_fields() {
    let store = MemoryStore::new();
    let usecase = CreateProductUseCase {
        products: store.clone(),
    };
    let invalid = [
        CreateProductInput {
            name: " ".to_owned(),
            ..hammer_input()
        },
        CreateProductInput {
            price: dec!(-1),
            ..hammer_input()
        },
        CreateProductInput {
            price: dec!(9.999),
            ..hammer_input()
        },
        CreateProductInput {
            stock_quantity: -1,
            ..hammer_input()
        },
        CreateProductInput {
            category: String::new(),
            ..hammer_input()
        },
    ];

    for input in invalid {
        let result = usecase.execute(admin(), input).await;
        assert!(
            matches!(result, Err(ShopError::Validation(_))),
            "expected Validation, got {result:?}"
        );
    }
    assert!(store.data.lock().unwrap().products.is_empty());
}

// ── List / Get ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_hide_inactive_products_from_customers() {
    let mut retired = test_product("Saw", dec!(7.00), 1);
    retired.is_active = false;
    let active = test_product("Hammer", dec!(10.00), 5);
    let store = MemoryStore::with_products(vec![active.clone(), retired.clone()]);
    let list = ListProductsUseCase {
        products: store.clone(),
    };
    let get = GetProductUseCase {
        products: store.clone(),
    };

    let visible = list
        .execute(Some(customer()), None, true, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, active.id);

    let all = list
        .execute(Some(admin()), None, true, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let result = get.execute(None, retired.id).await;
    assert!(
        matches!(result, Err(ShopError::ProductNotFound)),
        "expected ProductNotFound, got {result:?}"
    );
    assert!(get.execute(Some(admin()), retired.id).await.is_ok());
}

#[tokio::test]
async fn should_filter_products_by_category() {
    let mut glue = test_product("Glue", dec!(3.00), 10);
    glue.category = "supplies".to_owned();
    let store = MemoryStore::with_products(vec![test_product("Hammer", dec!(10.00), 5), glue]);

    let found = ListProductsUseCase {
        products: store.clone(),
    }
    .execute(None, Some("supplies".to_owned()), false, PageRequest::default())
    .await
    .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Glue");
}

// ── UpdateProductUseCase ─────────────────────────────────────────────────────

#[tokio::test]
async fn should_apply_only_patched_fields() {
    let product = test_product("Hammer", dec!(10.00), 5);
    let store = MemoryStore::with_products(vec![product.clone()]);

    let updated = UpdateProductUseCase {
        products: store.clone(),
    }
    .execute(
        admin(),
        product.id,
        ProductPatch {
            price: Some(dec!(12.50)),
            is_active: Some(false),
            ..ProductPatch::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(updated.price, dec!(12.50));
    assert!(!updated.is_active);
    assert_eq!(updated.name, "Hammer");
    assert_eq!(updated.stock_quantity, 5);
}

#[tokio::test]
async fn should_reject_empty_or_unknown_update() {
    let product = test_product("Hammer", dec!(10.00), 5);
    let store = MemoryStore::with_products(vec![product.clone()]);
    let usecase = UpdateProductUseCase {
        products: store.clone(),
    };

    let result = usecase
        .execute(admin(), product.id, ProductPatch::default())
        .await;
    assert!(
        matches!(result, Err(ShopError::Validation(_))),
        "expected Validation, got {result:?}"
    );

    let result = usecase
        .execute(
            admin(),
            uuid::Uuid::now_v7(),
            ProductPatch {
                stock_quantity: Some(1),
                ..ProductPatch::default()
            },
        )
        .await;
    assert!(
        matches!(result, Err(ShopError::ProductNotFound)),
        "expected ProductNotFound, got {result:?}"
    );
}

// ── DeleteProductUseCase ─────────────────────────────────────────────────────

#[tokio::test]
async fn should_refuse_deleting_ordered_product() {
    let ordered = test_product("Hammer", dec!(10.00), 5);
    let spare = test_product("Saw", dec!(7.00), 1);
    let store = MemoryStore::with_products(vec![ordered.clone(), spare.clone()]);
    CreateOrderUseCase {
        orders: store.clone(),
    }
    .execute(customer(), vec![line(&ordered, 1)])
    .await
    .unwrap();
    let usecase = DeleteProductUseCase {
        products: store.clone(),
    };

    let result = usecase.execute(admin(), ordered.id).await;
    assert!(
        matches!(result, Err(ShopError::ProductInUse)),
        "expected ProductInUse, got {result:?}"
    );

    usecase.execute(admin(), spare.id).await.unwrap();
    let result = usecase.execute(admin(), spare.id).await;
    assert!(
        matches!(result, Err(ShopError::ProductNotFound)),
        "expected ProductNotFound, got {result:?}"
    );
}

// ── UploadProductImageUseCase ────────────────────────────────────────────────

#[tokio::test]
async fn should_store_image_and_point_product_at_it() {
    let product = test_product("Hammer", dec!(10.00), 5);
    let store = MemoryStore::with_products(vec![product.clone()]);
    let storage = MemoryStorage::default();

    let updated = UploadProductImageUseCase {
        products: store.clone(),
        storage: storage.clone(),
    }
    .execute(admin(), product.id, "image/png", b"\x89PNG\r\n")
    .await
    .unwrap();

    let url = updated.image_url.expect("image url set");
    assert!(url.starts_with("/static/uploads/products/"));
    assert!(url.ends_with(".png"));
    let files = storage.files.lock().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].0, url);
}

#[tokio::test]
async fn should_reject_unsupported_or_empty_upload() {
    let product = test_product("Hammer", dec!(10.00), 5);
    let store = MemoryStore::with_products(vec![product.clone()]);
    let storage = MemoryStorage::default();
    let usecase = UploadProductImageUseCase {
        products: store.clone(),
        storage: storage.clone(),
    };

    let result = usecase
        .execute(admin(), product.id, "application/pdf", b"%PDF")
        .await;
    assert!(
        matches!(result, Err(ShopError::Validation(_))),
        "expected Validation, got {result:?}"
    );

    let result = usecase.execute(admin(), product.id, "image/png", b"").await;
    assert!(
        matches!(result, Err(ShopError::Validation(_))),
        "expected Validation, got {result:?}"
    );

    let result = usecase
        .execute(customer(), product.id, "image/png", b"\x89PNG")
        .await;
    assert!(
        matches!(result, Err(ShopError::Forbidden)),
        "expected Forbidden, got {result:?}"
    );
    assert!(storage.files.lock().unwrap().is_empty());
}
