//! End-to-end tests for the repositories and the sale workflow against an
//! in-memory database: stock invariants, paging behavior, dynamic filter
//! fallbacks, revenue analysis, and the documented consistency gap.

use chrono::{Duration, NaiveDate, Utc};

use venda_core::error::CoreError;
use venda_core::paging::PaginationParameters;
use venda_core::types::{Customer, ItemSale, PaymentMethod, Product, Sale, SaleStatus};
use venda_db::{
    Database, DbConfig, DbError, NewSale, NewSaleItem, ProductInclude, SaleInclude, WorkflowError,
};

// =============================================================================
// Fixtures
// =============================================================================

async fn test_db() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

async fn seed_product(db: &Database, code: &str, price_cents: i64, stock: i64) -> Product {
    db.products()
        .create(Product {
            id: String::new(),
            name: format!("Product {code}"),
            description: String::new(),
            price_cents,
            quantity_stock: stock,
            code: code.to_string(),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            item_sales: Vec::new(),
        })
        .await
        .expect("seed product")
}

async fn seed_customer(db: &Database, email: &str, cpf: &str) -> Customer {
    db.customers()
        .create(Customer {
            id: String::new(),
            name: "Cliente Teste".to_string(),
            email: email.to_string(),
            cpf: cpf.to_string(),
            phone: "+55 11 90000-0000".to_string(),
            address: "Rua Teste 1".to_string(),
            user_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await
        .expect("seed customer")
}

fn one_line(product: &Product, quantity: i64) -> NewSale {
    NewSale {
        customer_id: String::new(), // filled by callers
        items: vec![NewSaleItem {
            product_id: product.id.clone(),
            quantity,
        }],
        payment_method: PaymentMethod::Pix,
        observations: String::new(),
    }
}

async fn current_stock(db: &Database, product_id: &str) -> i64 {
    db.products()
        .get_by_id(product_id, &[])
        .await
        .expect("get product")
        .expect("product exists")
        .quantity_stock
}

// =============================================================================
// Sale Creation
// =============================================================================

#[tokio::test]
async fn create_sale_decrements_stock_and_derives_total() {
    let db = test_db().await;
    let customer = seed_customer(&db, "a@example.com", "11122233344").await;
    let product = seed_product(&db, "P-1", 2500, 10).await;

    let mut request = one_line(&product, 4);
    request.customer_id = customer.id.clone();
    let sale = db.sale_workflow().create_sale(request).await.expect("sale");

    assert_eq!(sale.status, SaleStatus::Pending);
    assert_eq!(sale.items.len(), 1);
    assert_eq!(sale.items[0].unit_price_cents, 2500);
    assert_eq!(sale.total_cents(), 4 * 2500);
    assert_eq!(current_stock(&db, &product.id).await, 6);

    // Round-trip through the repository keeps the same sale shape.
    let fetched = db
        .sales()
        .get_with_items(&sale.id)
        .await
        .unwrap()
        .expect("sale persisted");
    assert_eq!(fetched.id, sale.id);
    assert_eq!(fetched.customer_id, customer.id);
    assert_eq!(fetched.items.len(), 1);
    assert_eq!(fetched.total_cents(), sale.total_cents());
}

#[tokio::test]
async fn unit_price_is_snapshotted_at_sale_time() {
    let db = test_db().await;
    let customer = seed_customer(&db, "a@example.com", "11122233344").await;
    let product = seed_product(&db, "P-1", 1000, 10).await;

    let mut request = one_line(&product, 1);
    request.customer_id = customer.id.clone();
    let sale = db.sale_workflow().create_sale(request).await.unwrap();

    // Reprice the product after the sale.
    let mut changes = product.clone();
    changes.price_cents = 9999;
    db.products()
        .update_by_id(&product.id, changes)
        .await
        .unwrap();

    let fetched = db.sales().get_with_items(&sale.id).await.unwrap().unwrap();
    assert_eq!(fetched.items[0].unit_price_cents, 1000);
    assert_eq!(fetched.total_cents(), 1000);
}

#[tokio::test]
async fn create_sale_rejects_missing_product_before_any_mutation() {
    let db = test_db().await;
    let customer = seed_customer(&db, "a@example.com", "11122233344").await;
    let product = seed_product(&db, "P-1", 1000, 10).await;

    let request = NewSale {
        customer_id: customer.id.clone(),
        items: vec![
            NewSaleItem {
                product_id: product.id.clone(),
                quantity: 2,
            },
            NewSaleItem {
                product_id: "missing-product".to_string(),
                quantity: 1,
            },
        ],
        payment_method: PaymentMethod::Cash,
        observations: String::new(),
    };

    let result = db.sale_workflow().create_sale(request).await;
    match result {
        Err(WorkflowError::Domain(CoreError::ProductNotFound(id))) => {
            assert_eq!(id, "missing-product");
        }
        other => panic!("expected ProductNotFound, got {other:?}"),
    }

    // Eager validation: nothing was persisted or decremented.
    assert_eq!(current_stock(&db, &product.id).await, 10);
    let sales = db
        .sales()
        .get_paged(&PaginationParameters::default(), None, &[])
        .await
        .unwrap();
    assert_eq!(sales.total_count, 0);
}

#[tokio::test]
async fn create_sale_reports_shortfall_on_insufficient_stock() {
    let db = test_db().await;
    let customer = seed_customer(&db, "a@example.com", "11122233344").await;
    let product = seed_product(&db, "P-1", 1000, 3).await;

    let mut request = one_line(&product, 5);
    request.customer_id = customer.id.clone();

    match db.sale_workflow().create_sale(request).await {
        Err(WorkflowError::Domain(err @ CoreError::InsufficientStock { .. })) => {
            assert_eq!(err.shortfall(), 2);
            match err {
                CoreError::InsufficientStock {
                    product_id,
                    available,
                    requested,
                    ..
                } => {
                    assert_eq!(product_id, product.id);
                    assert_eq!(available, 3);
                    assert_eq!(requested, 5);
                }
                _ => unreachable!(),
            }
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(current_stock(&db, &product.id).await, 3);
}

#[tokio::test]
async fn create_sale_rejects_bad_requests() {
    let db = test_db().await;
    let customer = seed_customer(&db, "a@example.com", "11122233344").await;
    let product = seed_product(&db, "P-1", 1000, 10).await;
    let workflow = db.sale_workflow();

    // Empty items list
    let empty = NewSale {
        customer_id: customer.id.clone(),
        items: Vec::new(),
        payment_method: PaymentMethod::Cash,
        observations: String::new(),
    };
    assert!(matches!(
        workflow.create_sale(empty).await,
        Err(WorkflowError::Domain(CoreError::Validation(_)))
    ));

    // Non-positive quantity
    let mut zero_quantity = one_line(&product, 0);
    zero_quantity.customer_id = customer.id.clone();
    assert!(matches!(
        workflow.create_sale(zero_quantity).await,
        Err(WorkflowError::Domain(CoreError::Validation(_)))
    ));

    // Unknown customer
    let mut no_customer = one_line(&product, 1);
    no_customer.customer_id = "missing-customer".to_string();
    assert!(matches!(
        workflow.create_sale(no_customer).await,
        Err(WorkflowError::Domain(CoreError::CustomerNotFound(_)))
    ));

    assert_eq!(current_stock(&db, &product.id).await, 10);
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn cancel_restores_stock_and_removes_sale_with_items() {
    let db = test_db().await;
    let customer = seed_customer(&db, "a@example.com", "11122233344").await;
    let product = seed_product(&db, "P-1", 1500, 8).await;
    let workflow = db.sale_workflow();

    let mut request = one_line(&product, 3);
    request.customer_id = customer.id.clone();
    let sale = workflow.create_sale(request).await.unwrap();
    assert_eq!(current_stock(&db, &product.id).await, 5);

    workflow.cancel_sale(&sale.id).await.expect("cancel");

    assert_eq!(current_stock(&db, &product.id).await, 8);
    assert!(db.sales().get_with_items(&sale.id).await.unwrap().is_none());

    // Cascade removed the owned items.
    let items = db
        .sale_items()
        .get_paged(&PaginationParameters::default(), None, &[])
        .await
        .unwrap();
    assert_eq!(items.total_count, 0);
}

#[tokio::test]
async fn cancel_missing_sale_reports_not_found() {
    let db = test_db().await;
    let result = db.sale_workflow().cancel_sale("missing-sale").await;
    assert!(matches!(
        result,
        Err(WorkflowError::Domain(CoreError::SaleNotFound(_)))
    ));
}

#[tokio::test]
async fn cancel_is_refused_once_shipped() {
    let db = test_db().await;
    let customer = seed_customer(&db, "a@example.com", "11122233344").await;
    let product = seed_product(&db, "P-1", 1000, 5).await;
    let workflow = db.sale_workflow();

    let mut request = one_line(&product, 1);
    request.customer_id = customer.id.clone();
    let sale = workflow.create_sale(request).await.unwrap();

    workflow
        .advance_status(&sale.id, SaleStatus::Approved)
        .await
        .unwrap();
    workflow
        .advance_status(&sale.id, SaleStatus::Sent)
        .await
        .unwrap();

    assert!(matches!(
        workflow.cancel_sale(&sale.id).await,
        Err(WorkflowError::Domain(
            CoreError::InvalidStatusTransition { .. }
        ))
    ));
    // Nothing was restored or deleted.
    assert_eq!(current_stock(&db, &product.id).await, 4);
    assert!(db.sales().get_with_items(&sale.id).await.unwrap().is_some());
}

// =============================================================================
// Status & Observations
// =============================================================================

#[tokio::test]
async fn status_advances_along_the_machine_only() {
    let db = test_db().await;
    let customer = seed_customer(&db, "a@example.com", "11122233344").await;
    let product = seed_product(&db, "P-1", 1000, 5).await;
    let workflow = db.sale_workflow();

    let mut request = one_line(&product, 1);
    request.customer_id = customer.id.clone();
    let sale = workflow.create_sale(request).await.unwrap();

    // Pending → Sent is not a legal single step.
    assert!(matches!(
        workflow.advance_status(&sale.id, SaleStatus::Sent).await,
        Err(WorkflowError::Domain(
            CoreError::InvalidStatusTransition { .. }
        ))
    ));

    // Cancelled is only reachable through cancel_sale.
    assert!(matches!(
        workflow
            .advance_status(&sale.id, SaleStatus::Cancelled)
            .await,
        Err(WorkflowError::Domain(CoreError::Validation(_)))
    ));

    let sale = workflow
        .advance_status(&sale.id, SaleStatus::Approved)
        .await
        .unwrap();
    assert_eq!(sale.status, SaleStatus::Approved);

    let fetched = db.sales().get_with_items(&sale.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, SaleStatus::Approved);
}

#[tokio::test]
async fn update_observations_touches_only_the_narrative_field() {
    let db = test_db().await;
    let customer = seed_customer(&db, "a@example.com", "11122233344").await;
    let product = seed_product(&db, "P-1", 1000, 5).await;
    let workflow = db.sale_workflow();

    let mut request = one_line(&product, 2);
    request.customer_id = customer.id.clone();
    request.observations = "original".to_string();
    let sale = workflow.create_sale(request).await.unwrap();

    let updated = workflow
        .update_observations(&sale.id, "entregar na portaria")
        .await
        .unwrap();
    assert_eq!(updated.observations, "entregar na portaria");
    assert_eq!(updated.status, SaleStatus::Pending);
    assert_eq!(updated.total_cents(), sale.total_cents());

    assert!(matches!(
        workflow.update_observations("missing", "x").await,
        Err(WorkflowError::Domain(CoreError::SaleNotFound(_)))
    ));
}

// =============================================================================
// Paging & Dynamic Queries
// =============================================================================

async fn seed_catalog(db: &Database, count: i64) {
    for index in 0..count {
        seed_product(db, &format!("P-{index:03}"), 100 + index, 5).await;
    }
}

#[tokio::test]
async fn paging_25_records_with_page_size_10() {
    let db = test_db().await;
    seed_catalog(&db, 25).await;

    let page = db
        .products()
        .get_paged(&PaginationParameters::new(3, 10), None, &[])
        .await
        .unwrap();

    assert_eq!(page.total_count, 25);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.items.len(), 5);
    assert!(page.has_previous);
    assert!(!page.has_next);
}

#[tokio::test]
async fn page_beyond_range_is_empty_with_accurate_totals() {
    let db = test_db().await;
    seed_catalog(&db, 25).await;

    let page = db
        .products()
        .get_paged(&PaginationParameters::new(4, 10), None, &[])
        .await
        .unwrap();

    assert!(page.items.is_empty());
    assert_eq!(page.total_count, 25);
    assert_eq!(page.total_pages, 3);
    assert!(page.has_previous);
    assert!(!page.has_next);
}

#[tokio::test]
async fn invalid_filter_and_order_fall_back_instead_of_failing() {
    let db = test_db().await;
    seed_catalog(&db, 12).await;

    // Unknown field in the filter: unfiltered result set.
    let params = PaginationParameters::new(1, 50).with_filter("no_such_field > 10");
    let page = db.products().get_paged(&params, None, &[]).await.unwrap();
    assert_eq!(page.total_count, 12);

    // Malformed order expression: falls back to id ascending.
    let params = PaginationParameters::new(1, 50).with_order_by("name sideways");
    let page = db.products().get_paged(&params, None, &[]).await.unwrap();
    assert_eq!(page.items.len(), 12);
    let ids: Vec<String> = page.items.iter().map(|p| p.id.clone()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);

    // Malformed filter syntax: also unfiltered.
    let params = PaginationParameters::new(1, 50).with_filter("price_cents >");
    let page = db.products().get_paged(&params, None, &[]).await.unwrap();
    assert_eq!(page.total_count, 12);
}

#[tokio::test]
async fn valid_filter_and_order_apply() {
    let db = test_db().await;
    seed_catalog(&db, 10).await; // prices 100..=109

    let params = PaginationParameters::new(1, 50)
        .with_filter("price_cents >= 105")
        .with_order_by("price_cents desc");
    let page = db.products().get_paged(&params, None, &[]).await.unwrap();

    assert_eq!(page.total_count, 5);
    let prices: Vec<i64> = page.items.iter().map(|p| p.price_cents).collect();
    assert_eq!(prices, vec![109, 108, 107, 106, 105]);
}

#[tokio::test]
async fn structural_predicate_composes_with_dynamic_filter() {
    let db = test_db().await;
    let customer_a = seed_customer(&db, "a@example.com", "11122233344").await;
    let customer_b = seed_customer(&db, "b@example.com", "55566677788").await;
    let product = seed_product(&db, "P-1", 1000, 50).await;
    let workflow = db.sale_workflow();

    for customer in [&customer_a, &customer_b] {
        for _ in 0..2 {
            let mut request = one_line(&product, 1);
            request.customer_id = customer.id.clone();
            workflow.create_sale(request).await.unwrap();
        }
    }

    // Structural predicate scopes to one customer, dynamic filter narrows
    // by status; includes load the items for the page.
    let predicate = Sale::fields().eq("customer_id", customer_a.id.as_str()).unwrap();
    let params = PaginationParameters::new(1, 10).with_filter("status = \"pending\"");
    let page = db
        .sales()
        .get_paged(&params, Some(&predicate), &[SaleInclude::Items])
        .await
        .unwrap();

    assert_eq!(page.total_count, 2);
    assert!(page.items.iter().all(|s| s.customer_id == customer_a.id));
    assert!(page.items.iter().all(|s| s.items.len() == 1));
}

#[tokio::test]
async fn product_include_loads_reverse_item_lookup() {
    let db = test_db().await;
    let customer = seed_customer(&db, "a@example.com", "11122233344").await;
    let product = seed_product(&db, "P-1", 1000, 10).await;
    let workflow = db.sale_workflow();

    let mut request = one_line(&product, 2);
    request.customer_id = customer.id.clone();
    workflow.create_sale(request).await.unwrap();

    let loaded = db
        .products()
        .get_by_id(&product.id, &[ProductInclude::ItemSales])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.item_sales.len(), 1);
    assert_eq!(loaded.item_sales[0].quantity, 2);

    // Without the include the collection stays empty.
    let bare = db.products().get_by_id(&product.id, &[]).await.unwrap().unwrap();
    assert!(bare.item_sales.is_empty());
}

// =============================================================================
// Generic Repository Semantics
// =============================================================================

#[tokio::test]
async fn customer_round_trip_preserves_fields() {
    let db = test_db().await;
    let created = seed_customer(&db, "round@example.com", "11122233344").await;
    assert!(!created.id.is_empty());

    let fetched = db
        .customers()
        .get_by_id(&created.id)
        .await
        .unwrap()
        .expect("customer exists");

    // Field-for-field equal apart from server-assigned id/timestamps.
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.name, created.name);
    assert_eq!(fetched.email, created.email);
    assert_eq!(fetched.cpf, created.cpf);
    assert_eq!(fetched.phone, created.phone);
    assert_eq!(fetched.address, created.address);
    assert_eq!(fetched.user_id, created.user_id);
}

#[tokio::test]
async fn duplicate_email_and_cpf_surface_as_unique_violations() {
    let db = test_db().await;
    seed_customer(&db, "dup@example.com", "11122233344").await;

    let same_email = db
        .customers()
        .create(Customer {
            id: String::new(),
            name: "Outro".to_string(),
            email: "dup@example.com".to_string(),
            cpf: "99988877766".to_string(),
            phone: String::new(),
            address: String::new(),
            user_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await;
    assert!(matches!(same_email, Err(DbError::UniqueViolation { .. })));

    let same_cpf = db
        .customers()
        .create(Customer {
            id: String::new(),
            name: "Outro".to_string(),
            email: "other@example.com".to_string(),
            cpf: "11122233344".to_string(),
            phone: String::new(),
            address: String::new(),
            user_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await;
    assert!(matches!(same_cpf, Err(DbError::UniqueViolation { .. })));
}

#[tokio::test]
async fn blind_update_of_detached_entity_is_silent_but_update_by_id_reports() {
    let db = test_db().await;

    // Generic update of a never-persisted entity: zero rows, no error.
    let mut ghost = Product {
        id: "never-persisted".to_string(),
        name: "Ghost".to_string(),
        description: String::new(),
        price_cents: 100,
        quantity_stock: 1,
        code: "GHOST".to_string(),
        active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        item_sales: Vec::new(),
    };
    db.products().base().update(&mut ghost).await.unwrap();

    // The guarded variant loads first and reports not-found.
    let result = db
        .products()
        .update_by_id("never-persisted", ghost.clone())
        .await;
    assert!(matches!(result, Err(DbError::NotFound { .. })));
}

#[tokio::test]
async fn update_by_id_replaces_values_and_keeps_identity() {
    let db = test_db().await;
    let product = seed_product(&db, "P-1", 1000, 5).await;

    let mut changes = product.clone();
    changes.name = "Novo Nome".to_string();
    changes.price_cents = 2000;

    let updated = db
        .products()
        .update_by_id(&product.id, changes)
        .await
        .unwrap();
    assert_eq!(updated.id, product.id);
    assert_eq!(updated.created_at, product.created_at);

    let fetched = db.products().get_by_id(&product.id, &[]).await.unwrap().unwrap();
    assert_eq!(fetched.name, "Novo Nome");
    assert_eq!(fetched.price_cents, 2000);
}

#[tokio::test]
async fn delete_removes_the_record() {
    let db = test_db().await;
    let product = seed_product(&db, "DEL-1", 100, 1).await;
    let customer = seed_customer(&db, "del@example.com", "11122233344").await;

    // Generic delete by entity.
    db.products().base().delete(&product).await.unwrap();
    assert!(db.products().get_by_id(&product.id, &[]).await.unwrap().is_none());

    // Delete by identifier reports whether anything was removed.
    assert!(db.customers().delete_by_id(&customer.id).await.unwrap());
    assert!(!db.customers().delete_by_id(&customer.id).await.unwrap());
    assert!(!db.products().delete_by_id("missing").await.unwrap());
}

#[tokio::test]
async fn lookups_by_unique_keys() {
    let db = test_db().await;
    let customer = seed_customer(&db, "key@example.com", "11122233344").await;
    let product = seed_product(&db, "UNIQ-1", 500, 1).await;

    let by_email = db
        .customers()
        .get_by_email("key@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_email.id, customer.id);

    let by_cpf = db.customers().get_by_cpf("11122233344").await.unwrap().unwrap();
    assert_eq!(by_cpf.id, customer.id);

    let by_code = db.products().get_by_code("UNIQ-1").await.unwrap().unwrap();
    assert_eq!(by_code.id, product.id);

    assert!(db.products().get_by_code("NOPE").await.unwrap().is_none());
}

// =============================================================================
// Sales Analysis
// =============================================================================

#[tokio::test]
async fn analysis_counts_revenue_and_per_product_breakdown() {
    let db = test_db().await;
    let customer = seed_customer(&db, "a@example.com", "11122233344").await;
    let product_a = seed_product(&db, "P-A", 1000, 50).await; // $10.00
    let product_b = seed_product(&db, "P-B", 2000, 50).await; // $20.00
    let product_c = seed_product(&db, "P-C", 500, 50).await; // $5.00
    let workflow = db.sale_workflow();

    // Sale A: two items ($10 + $20), Sale B: one item ($5).
    workflow
        .create_sale(NewSale {
            customer_id: customer.id.clone(),
            items: vec![
                NewSaleItem {
                    product_id: product_a.id.clone(),
                    quantity: 1,
                },
                NewSaleItem {
                    product_id: product_b.id.clone(),
                    quantity: 1,
                },
            ],
            payment_method: PaymentMethod::CreditCard,
            observations: String::new(),
        })
        .await
        .unwrap();
    let mut request = one_line(&product_c, 1);
    request.customer_id = customer.id.clone();
    workflow.create_sale(request).await.unwrap();

    let today = Utc::now().date_naive();
    let analysis = workflow.sales_analysis(today, today).await.unwrap();

    assert_eq!(analysis.total_sales_count, 2);
    assert_eq!(analysis.total_revenue_cents, 3500);
    assert_eq!(analysis.product_revenues.len(), 3);
    let breakdown_sum: i64 = analysis
        .product_revenues
        .iter()
        .map(|r| r.revenue_cents)
        .sum();
    assert_eq!(breakdown_sum, 3500);

    // A window before the sales sees nothing.
    let last_week = today - Duration::days(7);
    let empty = workflow
        .sales_analysis(last_week, last_week)
        .await
        .unwrap();
    assert_eq!(empty.total_sales_count, 0);
    assert_eq!(empty.total_revenue_cents, 0);
    assert!(empty.product_revenues.is_empty());
}

#[tokio::test]
async fn analysis_end_date_extends_through_end_of_day() {
    let db = test_db().await;
    let customer = seed_customer(&db, "a@example.com", "11122233344").await;
    let product = seed_product(&db, "P-1", 1000, 50).await;

    let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
    let in_window = end.and_hms_opt(23, 59, 59).unwrap().and_utc();
    let after_window = NaiveDate::from_ymd_opt(2024, 2, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc();

    // Create the sales directly so the sale dates land on the edges.
    for (sale_date, code) in [(in_window, "edge"), (after_window, "outside")] {
        db.sales()
            .create_with_items(Sale {
                id: String::new(),
                customer_id: customer.id.clone(),
                status: SaleStatus::Pending,
                sale_date,
                payment_method: PaymentMethod::Cash,
                observations: code.to_string(),
                created_at: sale_date,
                updated_at: sale_date,
                items: vec![ItemSale {
                    id: String::new(),
                    sale_id: String::new(),
                    product_id: product.id.clone(),
                    quantity: 1,
                    unit_price_cents: 1000,
                    created_at: sale_date,
                    updated_at: sale_date,
                }],
            })
            .await
            .unwrap();
    }

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let analysis = db.sales().sales_analysis(start, end).await.unwrap();
    assert_eq!(analysis.total_sales_count, 1);
    assert_eq!(analysis.total_revenue_cents, 1000);
}

#[tokio::test]
async fn analysis_rejects_inverted_range() {
    let db = test_db().await;
    let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    let result = db.sale_workflow().sales_analysis(start, end).await;
    assert!(matches!(
        result,
        Err(WorkflowError::Domain(CoreError::InvalidDateRange { .. }))
    ));
}

// =============================================================================
// Concurrency & The Documented Gap
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_sales_for_full_stock_cannot_both_succeed() {
    let db = test_db().await;
    let customer = seed_customer(&db, "a@example.com", "11122233344").await;
    let product = seed_product(&db, "P-1", 1000, 5).await;

    let make_request = |customer_id: String, product_id: String| NewSale {
        customer_id,
        items: vec![NewSaleItem {
            product_id,
            quantity: 5, // the full current stock
        }],
        payment_method: PaymentMethod::Pix,
        observations: String::new(),
    };

    let workflow_a = db.sale_workflow();
    let workflow_b = db.sale_workflow();
    let request_a = make_request(customer.id.clone(), product.id.clone());
    let request_b = make_request(customer.id.clone(), product.id.clone());

    let task_a = tokio::spawn(async move { workflow_a.create_sale(request_a).await });
    let task_b = tokio::spawn(async move { workflow_b.create_sale(request_b).await });
    let results = [task_a.await.unwrap(), task_b.await.unwrap()];

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one sale may win the stock");
    for result in &results {
        if let Err(err) = result {
            assert!(
                matches!(
                    err,
                    WorkflowError::Domain(CoreError::InsufficientStock { .. })
                ),
                "the loser observes a conflict, got {err:?}"
            );
        }
    }

    // The invariant holds: stock hit the floor and never went below it.
    assert_eq!(current_stock(&db, &product.id).await, 0);
}

#[tokio::test]
async fn failed_decrement_leaves_sale_persisted_and_stock_partial() {
    let db = test_db().await;
    let customer = seed_customer(&db, "a@example.com", "11122233344").await;
    let product = seed_product(&db, "P-1", 1000, 4).await;

    // Two lines of the same product pass per-line validation against the
    // same stale stock (4 ≥ 3 twice), but only the first decrement fits.
    let request = NewSale {
        customer_id: customer.id.clone(),
        items: vec![
            NewSaleItem {
                product_id: product.id.clone(),
                quantity: 3,
            },
            NewSaleItem {
                product_id: product.id.clone(),
                quantity: 3,
            },
        ],
        payment_method: PaymentMethod::Cash,
        observations: String::new(),
    };

    let result = db.sale_workflow().create_sale(request).await;
    assert!(matches!(
        result,
        Err(WorkflowError::Domain(CoreError::InsufficientStock { .. }))
    ));

    // The sale was durably created before the decrement loop, and the
    // first line's decrement stuck: the documented partial state.
    let sales = db
        .sales()
        .get_paged(&PaginationParameters::default(), None, &[SaleInclude::Items])
        .await
        .unwrap();
    assert_eq!(sales.total_count, 1);
    assert_eq!(sales.items[0].items.len(), 2);

    let stock = current_stock(&db, &product.id).await;
    assert_eq!(stock, 1, "first decrement applied, second refused");
    assert!(stock >= 0, "floor never breached");
}

#[tokio::test]
async fn stock_never_negative_across_create_cancel_sequences() {
    let db = test_db().await;
    let customer = seed_customer(&db, "a@example.com", "11122233344").await;
    let product = seed_product(&db, "P-1", 700, 6).await;
    let workflow = db.sale_workflow();

    let mut sale_ids = Vec::new();
    for quantity in [2, 1, 3] {
        let mut request = one_line(&product, quantity);
        request.customer_id = customer.id.clone();
        let sale = workflow.create_sale(request).await.unwrap();
        assert!(current_stock(&db, &product.id).await >= 0);
        sale_ids.push(sale.id);
    }
    assert_eq!(current_stock(&db, &product.id).await, 0);

    // Any further sale is a conflict, not a negative balance.
    let mut request = one_line(&product, 1);
    request.customer_id = customer.id.clone();
    assert!(workflow.create_sale(request).await.is_err());

    for sale_id in &sale_ids {
        workflow.cancel_sale(sale_id).await.unwrap();
        assert!(current_stock(&db, &product.id).await >= 0);
    }
    assert_eq!(current_stock(&db, &product.id).await, 6);
}
