#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use oscar_protocol::core::flap::{FlapPacket, FrameKind, FLAP_VERSION};
use oscar_protocol::core::tlv::{self, Tlv};
use oscar_protocol::protocol::foodgroup::tag;
use oscar_protocol::protocol::{oservice, Services};
use oscar_protocol::session::{BosCookie, SessionContext, SessionRegistry};
use oscar_protocol::{AccountIdentity, MemoryAccountStore};
use tokio::sync::Barrier;
use tokio::task::JoinSet;

fn authenticated(uin: u32) -> SessionContext {
    let mut ctx = SessionContext::with_sequence(0);
    ctx.authenticate(
        AccountIdentity {
            uin,
            display_name: format!("user{uin}"),
            email: format!("user{uin}@example.com"),
            password: "pw".to_string(),
        },
        BosCookie::generate().unwrap(),
    );
    ctx
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_claims_on_one_cookie_have_one_winner() {
    for _ in 0..50 {
        let registry = SessionRegistry::default();
        let ctx = authenticated(1);
        let cookie = ctx.bos_cookie().unwrap().as_bytes().to_vec();
        registry.publish(ctx).await.unwrap();

        let contenders = 8;
        let barrier = Arc::new(Barrier::new(contenders));
        let winners = Arc::new(AtomicUsize::new(0));

        let mut tasks = JoinSet::new();
        for _ in 0..contenders {
            let registry = registry.clone();
            let cookie = cookie.clone();
            let barrier = barrier.clone();
            let winners = winners.clone();
            tasks.spawn(async move {
                barrier.wait().await;
                if registry.claim(&cookie).await.is_some() {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            });
        }

        while let Some(res) = tasks.join_next().await {
            res.unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty().await);
        assert_eq!(registry.stats().await.total_claimed, 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_bos_sign_ons_claim_once() {
    let services = Services::new(
        Arc::new(MemoryAccountStore::new()),
        Default::default(),
        SessionRegistry::default(),
    );
    let ctx = authenticated(7);
    let cookie = ctx.bos_cookie().unwrap().as_bytes().to_vec();
    services.registry.publish(ctx).await.unwrap();

    let mut data = FLAP_VERSION.to_vec();
    data.extend(tlv::encode(&Tlv::new(tag::BOS_COOKIE, cookie)).unwrap());
    let frame = FlapPacket::new(FrameKind::SignOn, 1, data);

    let mut tasks = JoinSet::new();
    for _ in 0..2 {
        let services = services.clone();
        let frame = frame.clone();
        tasks.spawn(async move {
            let mut local = SessionContext::new();
            oservice::claim_session(&mut local, &services, &frame)
                .await
                .is_ok()
        });
    }

    let mut claimed = 0;
    while let Some(res) = tasks.join_next().await {
        if res.unwrap() {
            claimed += 1;
        }
    }

    assert_eq!(claimed, 1);
    let snapshot = services.metrics.snapshot();
    assert_eq!(snapshot.sessions_claimed, 1);
    assert_eq!(snapshot.registry_misses, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_publish_and_claim_many_sessions() {
    let registry = SessionRegistry::default();
    let mut tasks = JoinSet::new();

    for uin in 0..200u32 {
        let registry = registry.clone();
        tasks.spawn(async move {
            let ctx = authenticated(uin);
            let cookie = ctx.bos_cookie().unwrap().as_bytes().to_vec();
            registry.publish(ctx).await.unwrap();
            tokio::task::yield_now().await;
            let claimed = registry.claim(&cookie).await.expect("own cookie present");
            assert_eq!(claimed.account().unwrap().uin, uin);
        });
    }

    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }

    let stats = registry.stats().await;
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.total_published, 200);
    assert_eq!(stats.total_claimed, 200);
}
