use std::hint::black_box;

use common::{CustomerId, ProductId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::offer::{coupon, margin};
use domain::{
    CouponContext, CreateOffer, Customer, InMemoryCouponRegistry, InMemoryProductCatalog, Money,
    OfferService, Product, notification_channel,
};
use event_store::InMemoryEventStore;
use rust_decimal_macros::dec;

const PRODUCT_ID: &str = "64f1a2b3c4d5";

fn bench_evaluate(c: &mut Criterion) {
    c.bench_function("offer/evaluate_margin", |b| {
        b.iter(|| {
            margin::evaluate(
                black_box(Money::from_cents(129_900)),
                black_box(Money::from_cents(104_500)),
                black_box(dec!(20)),
            )
            .unwrap()
        });
    });
}

fn bench_generate(c: &mut Criterion) {
    let product_id = ProductId::new(PRODUCT_ID);
    let registered = Customer::registered(CustomerId::new(), "ana@example.com", None);
    let guest = Customer::guest("luis@example.com", None);

    c.bench_function("offer/generate_registered_code", |b| {
        b.iter(|| {
            coupon::generate(
                &product_id,
                Some("RD19"),
                black_box(&registered),
                &CouponContext::first(),
            )
        });
    });

    c.bench_function("offer/generate_guest_code", |b| {
        b.iter(|| coupon::generate(&product_id, None, black_box(&guest), &CouponContext::first()));
    });
}

fn bench_create_and_redeem(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("offer/create_and_redeem", |b| {
        b.iter(|| {
            rt.block_on(async {
                let catalog = InMemoryProductCatalog::new();
                catalog
                    .insert(Product::new(
                        PRODUCT_ID,
                        "Roadster 2019",
                        Money::from_cents(10000),
                        None,
                    ))
                    .await;
                let (queue, _worker) = notification_channel();
                let service = OfferService::new(
                    InMemoryEventStore::new(),
                    InMemoryCouponRegistry::new(),
                    catalog,
                    queue,
                );

                let cmd = CreateOffer::new(
                    PRODUCT_ID,
                    Money::from_cents(9000),
                    Customer::guest("luis@example.com", None),
                    "600123123",
                );
                let created = service.create_offer(cmd, dec!(20)).await.unwrap();
                let code = created.aggregate.coupon_code().unwrap().to_string();
                service.redeem_coupon(&code).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_evaluate,
    bench_generate,
    bench_create_and_redeem,
);
criterion_main!(benches);
