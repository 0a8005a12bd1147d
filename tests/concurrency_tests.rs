//! 동시성 테스트
//!
//! 같은 계정/플랜/출금 요청에 대한 동시 요청이 직렬화되어
//! 잔고가 음수가 되거나 중복 적립/환불되지 않는지 확인합니다.

mod common;

use std::sync::Arc;

use chrono::Duration;
use futures::future::join_all;
use rust_decimal_macros::dec;

use common::harness;
use yield_ledger::ledger::{BonusType, WithdrawalInput};
use yield_ledger::LedgerError;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_claims_credit_exactly_once() {
    let h = Arc::new(harness().await);
    h.funded_account("alice", dec!(0)).await;
    let plan = h.active_plan("alice", dec!(5)).await;
    h.clock.advance(Duration::hours(24));

    let attempts = (0..8).map(|_| {
        let h = h.clone();
        let plan_id = plan.id.clone();
        tokio::spawn(async move { h.ledger.accrual.claim("alice", &plan_id).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let credited = results.iter().filter(|r| r.is_ok()).count();
    let refused = results
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::ClaimNotYetAvailable { .. })))
        .count();
    assert_eq!(credited, 1);
    assert_eq!(refused, 7);

    assert_eq!(h.ledger.accounts.balance("alice").await.unwrap(), dec!(5));
    h.assert_consistent("alice").await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals_never_overdraw() {
    let h = Arc::new(harness().await);
    h.funded_account("alice", dec!(100)).await;

    let attempts = (0..6).map(|_| {
        let h = h.clone();
        tokio::spawn(async move {
            h.ledger
                .withdrawals
                .create(
                    "alice",
                    WithdrawalInput {
                        amount: dec!(30),
                        network: "TRC20".into(),
                        wallet_address: "TXyz123".into(),
                    },
                )
                .await
        })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let created = results.iter().filter(|r| r.is_ok()).count();
    let insufficient = results
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::InsufficientBalance { .. })))
        .count();
    assert_eq!(created, 3);
    assert_eq!(insufficient, 3);

    assert_eq!(h.ledger.accounts.balance("alice").await.unwrap(), dec!(10));
    assert_eq!(h.ledger.withdrawals.list(None).await.unwrap().len(), 3);
    h.assert_consistent("alice").await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reject_refunds_once() {
    let h = Arc::new(harness().await);
    h.funded_account("alice", dec!(40)).await;
    let request = h
        .ledger
        .withdrawals
        .create(
            "alice",
            WithdrawalInput {
                amount: dec!(25),
                network: "ERC20".into(),
                wallet_address: "0xabc".into(),
            },
        )
        .await
        .unwrap();

    let attempts = (0..5).map(|i| {
        let h = h.clone();
        let id = request.id.clone();
        tokio::spawn(async move {
            if i % 2 == 0 {
                h.ledger.withdrawals.reject(&id).await
            } else {
                h.ledger.withdrawals.approve(&id).await
            }
        })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    let losers = results
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::InvalidStateTransition { .. })))
        .count();
    assert_eq!(losers, 4);

    let expected = if winners[0].status == yield_ledger::ledger::WithdrawalStatus::Rejected {
        dec!(40)
    } else {
        dec!(15)
    };
    assert_eq!(h.ledger.accounts.balance("alice").await.unwrap(), expected);
    h.assert_consistent("alice").await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_conversions_respect_bonus_total() {
    let h = Arc::new(harness().await);
    h.funded_account("alice", dec!(0)).await;
    h.award("alice", BonusType::Referral, dec!(30)).await;
    h.award("alice", BonusType::Referral, dec!(20)).await;

    let attempts = (0..4).map(|_| {
        let h = h.clone();
        tokio::spawn(async move {
            h.ledger
                .bonuses
                .convert("alice", BonusType::Referral, dec!(20))
                .await
        })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 2);
    assert_eq!(h.ledger.accounts.balance("alice").await.unwrap(), dec!(40));
    assert_eq!(
        h.ledger.bonuses.available("alice", BonusType::Referral).await.unwrap(),
        dec!(10)
    );
    h.assert_consistent("alice").await;
}
