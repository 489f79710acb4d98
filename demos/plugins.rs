//! # Example: plugins
//!
//! Three plugins composed onto one host through its [`Lifecycle`].
//!
//! - **transport** binds a socket; `listening` also waits for its bind timer
//!   (one-shot bridge via `cb`).
//! - **catalog** warms a cache during `ready` and exposes `lookup`, a
//!   synchronous function gated on the warm-up.
//! - **pricing** exposes `quote`, an async function gated on `lookup` being
//!   callable; it is called several times before anything is ready.
//!
//! ## Flow
//! ```text
//! initialize ─► listening (transport bind + host notify) ─► ready (catalog warm-up)
//!                                                             └─► lookup callable ─► quote calls serviced
//! close ─► closing (catalog flush + original close) ─► closed
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example plugins --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use readyvisor::{
    Completion, DuringOptions, Lifecycle, LifecycleConfig, LogWriter, ReadyError, Subscribe,
    SyncFn,
};
use tracing_subscriber::EnvFilter;

fn transport(lc: &Lifecycle) {
    let bound = lc.cb(lc.listening());
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        println!("[transport] socket bound");
        bound.ok();
    });
}

fn price_of(sku: &str) -> Option<u32> {
    match sku {
        "apple" => Some(3),
        "pear" => Some(5),
        _ => None,
    }
}

fn catalog(lc: &Lifecycle) -> Arc<SyncFn<fn(&str) -> Option<u32>>> {
    let warm = lc.during(lc.ready(), DuringOptions::default().named("catalog-warm"));
    lc.handle_async(&warm, || async {
        println!("[catalog] warming cache");
        tokio::time::sleep(Duration::from_millis(100)).await;
        println!("[catalog] cache warm");
        Ok::<(), ReadyError>(())
    });
    lc.handle(lc.closing(), |done: Completion| {
        println!("[catalog] flushing");
        done.ok();
    });
    Arc::new(lc.sync_fn("lookup", &warm, price_of as fn(&str) -> Option<u32>))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let lc = Lifecycle::builder(LifecycleConfig::named("shop"))
        .with_subscribers(subs)
        .build();

    // ---- plugins register while the host is constructed ----
    transport(&lc);
    let lookup = catalog(&lc);
    let quote = {
        let lookup_fn = Arc::clone(&lookup);
        Arc::new(lc.async_fn("quote", lookup.ready(), move |(sku, qty): (String, u32)| {
            let price = lookup_fn.call(sku.as_str());
            async move {
                match price {
                    Ok(Some(p)) => Ok(p * qty),
                    Ok(None) => Err(ReadyError::fail(format!("unknown sku {sku}"))),
                    Err(err) => Err(err),
                }
            }
        }))
    };
    lc.setup(|| {
        println!("[host] setup");
        Ok::<(), ReadyError>(())
    });

    println!("[host] lookup before ready: {:?}", lookup.call("apple"));

    // Early calls: queued until `lookup` is callable.
    let mut calls = Vec::new();
    for (sku, qty) in [("apple", 2u32), ("pear", 1), ("plum", 4)] {
        let quote = Arc::clone(&quote);
        calls.push(tokio::spawn(async move {
            let res = quote.call((sku.to_string(), qty)).await;
            println!("[pricing] quote {sku} x{qty}: {res:?}");
        }));
    }

    // ---- host construction finished ----
    // Setups run on the next turn; a setup fault panics here.
    lc.initialized().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    println!("[host] listening");
    lc.notify_listening(Ok::<(), ReadyError>(()));

    lc.ready().wait().await?;
    println!("[host] status={} lookup(apple)={:?}", lc.status(), lookup.call("apple"));

    for call in calls {
        call.await?;
    }

    let closed = lc.close(|done: Completion| {
        println!("[host] original close");
        done.ok();
    });
    closed.wait().await?;
    println!("[host] status={}", lc.status());
    Ok(())
}
