use alloy_primitives::U256;
use dca_profit::engine::{locked_rate, EventProcessor, SampleKind};
use dca_profit::{
    ChainId, Decimal, EngineError, MockPriceSource, PositionContext, PositionEvent,
    PositionHistory, ProfitEngine, Timestamp, Token, TokenId,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const FROM: &str = "0x0000000000000000000000000000000000000001";
const TO: &str = "0x0000000000000000000000000000000000000002";

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn u(n: u64) -> U256 {
    U256::from(n)
}

fn ts(secs: i64) -> Timestamp {
    Timestamp::new(secs)
}

fn context() -> PositionContext {
    PositionContext::new(
        ChainId::new(10),
        Token::new(TokenId::new(FROM), 2),
        Token::new(TokenId::new(TO), 2),
    )
}

/// From token at $1, to token at $2 unless overridden per timestamp.
fn prices() -> MockPriceSource {
    MockPriceSource::new()
        .with_price(TokenId::new(FROM), d("1"))
        .with_price(TokenId::new(TO), d("2"))
}

fn created(at: i64, rate: u64, swaps: u32) -> PositionEvent {
    PositionEvent::Created {
        timestamp: ts(at),
        rate: u(rate),
        remaining_swaps: swaps,
    }
}

fn modified(at: i64, old: (u64, u32), new: (u64, u32)) -> PositionEvent {
    PositionEvent::modified(ts(at), u(old.0), old.1, u(new.0), new.1).unwrap()
}

fn swapped(at: i64, rate: u64, out: u64) -> PositionEvent {
    PositionEvent::Swapped {
        timestamp: ts(at),
        rate: u(rate),
        swapped: u(out),
    }
}

#[tokio::test]
async fn test_single_swap_against_lump_sum() {
    let engine = ProfitEngine::new(Arc::new(prices()));
    let events = vec![created(100, 100, 2), swapped(200, 100, 45)];

    let series = engine.replay(&context(), &events).await.unwrap();

    assert!(series.has_swap_history());
    assert_eq!(series.len(), 2);

    let origin = &series.points()[0];
    assert_eq!(origin.timestamp, ts(100));
    assert_eq!(origin.swapped_if_dca, Decimal::zero());
    assert_eq!(origin.percentage, Decimal::zero());

    // one lot of 200 locked at 0.50 to per from; spending 100 of it is worth 50
    let swap = &series.points()[1];
    assert_eq!(swap.timestamp, ts(200));
    assert_eq!(swap.swapped_if_lump_sum, d("0.5"));
    assert_eq!(swap.swapped_if_dca, d("0.45"));
    assert_eq!(swap.ratio, d("0.9"));
    assert_eq!(swap.percentage, d("-10"));
}

#[tokio::test]
async fn test_no_swaps_yields_origin_only() {
    let engine = ProfitEngine::new(Arc::new(prices()));
    let events = vec![created(100, 100, 2), modified(150, (100, 2), (100, 1))];

    let series = engine.replay(&context(), &events).await.unwrap();

    assert_eq!(series.len(), 1);
    assert!(!series.has_swap_history());
    assert_eq!(series.points()[0].timestamp, ts(100));
}

#[tokio::test]
async fn test_increase_locks_new_capital_at_its_own_price() {
    let mock = prices().with_price_at(TokenId::new(FROM), ts(150), d("2"));
    let engine = ProfitEngine::new(Arc::new(mock));
    let events = vec![
        created(100, 100, 2),
        modified(150, (100, 2), (150, 2)),
        swapped(200, 150, 120),
    ];

    let series = engine.replay(&context(), &events).await.unwrap();

    // lots: 200 @ 50 and 100 @ 100; a 150 spend is worth 50 + 50
    let swap = series.last().unwrap();
    assert_eq!(swap.swapped_if_lump_sum, d("1"));
    assert_eq!(swap.swapped_if_dca, d("1.2"));
    assert_eq!(swap.percentage, d("20"));
}

#[test]
fn test_increase_appends_exactly_one_lot() {
    let mut processor = EventProcessor::new(context()).unwrap();
    let first_rate = locked_rate(d("1"), d("2"), 2).unwrap();
    let second_rate = locked_rate(d("3"), d("2"), 2).unwrap();

    processor.apply(&created(100, 100, 2), Some(first_rate)).unwrap();
    let before = processor.ledger().lots()[0];

    let increase = modified(150, (100, 2), (100, 5));
    assert!(processor.requires_price(&increase).unwrap());
    processor.apply(&increase, Some(second_rate)).unwrap();

    let lots = processor.ledger().lots();
    assert_eq!(lots.len(), 2);
    assert_eq!(lots[0], before);
    assert_eq!(lots[1].remaining, u(300));
    assert_eq!(lots[1].locked_rate, u(150));
}

#[tokio::test]
async fn test_reduction_withdraws_newest_capital_first() {
    let mock = prices().with_price_at(TokenId::new(FROM), ts(150), d("2"));
    let engine = ProfitEngine::new(Arc::new(mock));
    let events = vec![
        created(100, 100, 3),
        modified(150, (100, 3), (200, 3)),
        // takes back exactly the lot added at 150
        modified(160, (200, 3), (100, 3)),
        swapped(200, 100, 50),
    ];

    let series = engine.replay(&context(), &events).await.unwrap();

    let swap = series.last().unwrap();
    assert_eq!(swap.swapped_if_lump_sum, d("0.5"));
    assert_eq!(swap.percentage, Decimal::zero());
}

#[tokio::test]
async fn test_swap_after_full_withdrawal_only_counts_dca() {
    let engine = ProfitEngine::new(Arc::new(prices()));
    let events = vec![
        created(100, 100, 1),
        modified(150, (100, 1), (0, 0)),
        swapped(200, 100, 10),
    ];

    let series = engine.replay(&context(), &events).await.unwrap();

    let swap = series.last().unwrap();
    assert_eq!(swap.swapped_if_lump_sum, Decimal::zero());
    assert_eq!(swap.swapped_if_dca, d("0.1"));
    assert_eq!(swap.percentage, Decimal::zero());
    assert!(series.has_swap_history());
}

#[tokio::test]
async fn test_terminated_position_has_no_open_capital() {
    let engine = ProfitEngine::new(Arc::new(prices()));
    let events = vec![
        created(100, 100, 4),
        swapped(200, 100, 45),
        PositionEvent::Terminated { timestamp: ts(300) },
        swapped(400, 100, 45),
    ];

    let series = engine.replay(&context(), &events).await.unwrap();

    assert_eq!(series.len(), 3);
    assert_eq!(series.points()[1].swapped_if_lump_sum, d("0.5"));
    assert_eq!(series.points()[2].swapped_if_lump_sum, d("0.5"));
    assert_eq!(series.points()[2].swapped_if_dca, d("0.9"));
}

#[tokio::test]
async fn test_missing_price_on_created_aborts_replay() {
    let engine = ProfitEngine::new(Arc::new(MockPriceSource::new()));
    let events = vec![created(100, 100, 2), swapped(200, 100, 45)];

    let result = engine.replay(&context(), &events).await;

    assert!(matches!(
        result,
        Err(EngineError::PriceUnavailable { ref token, timestamp, .. })
            if timestamp == ts(100) && *token == TokenId::new(FROM)
    ));
}

#[tokio::test]
async fn test_lookup_failure_aborts_replay() {
    let mock = prices().with_failure_at(ts(150));
    let engine = ProfitEngine::new(Arc::new(mock));
    let events = vec![
        created(100, 100, 2),
        modified(150, (100, 2), (100, 3)),
        swapped(200, 100, 45),
    ];

    let result = engine.replay(&context(), &events).await;

    let err = result.unwrap_err();
    assert!(matches!(
        err,
        EngineError::PriceUnavailable { ref token, timestamp, .. }
            if timestamp == ts(150) && *token == TokenId::new(FROM)
    ));
    assert!(err.to_string().contains(FROM));
}

#[tokio::test]
async fn test_zero_output_price_is_unavailable() {
    let mock = prices().with_price_at(TokenId::new(TO), ts(100), Decimal::zero());
    let engine = ProfitEngine::new(Arc::new(mock));

    let result = engine.replay(&context(), &[created(100, 100, 2)]).await;

    assert!(matches!(
        result,
        Err(EngineError::PriceUnavailable { ref token, .. }) if *token == TokenId::new(TO)
    ));
}

#[tokio::test]
async fn test_out_of_order_fails_before_lookup() {
    let mock = Arc::new(prices());
    let engine = ProfitEngine::new(mock.clone());
    let events = vec![created(200, 100, 2), modified(100, (100, 2), (100, 3))];

    let result = engine.replay(&context(), &events).await;

    assert!(matches!(result, Err(EngineError::OutOfOrderEvents { .. })));
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_replay_is_deterministic() {
    let events = vec![
        created(100, 333, 3),
        swapped(200, 333, 150),
        modified(250, (333, 2), (500, 4)),
        swapped(300, 500, 260),
        swapped(400, 500, 240),
    ];

    let first = ProfitEngine::new(Arc::new(prices()))
        .replay(&context(), &events)
        .await
        .unwrap();
    let second = ProfitEngine::new(Arc::new(prices()))
        .replay(&context(), &events)
        .await
        .unwrap();

    assert_eq!(first, second);
    let timestamps: Vec<_> = first.points().iter().map(|p| p.timestamp).collect();
    assert_eq!(timestamps, vec![ts(100), ts(200), ts(300), ts(400)]);
}

#[tokio::test]
async fn test_replay_many_keeps_positions_independent() {
    let engine = ProfitEngine::new(Arc::new(prices()));
    let positions = vec![
        PositionHistory::new(context(), vec![created(100, 100, 2), swapped(200, 100, 45)]),
        PositionHistory::new(context(), vec![created(100, 100, 2)]),
        PositionHistory::new(context(), vec![swapped(200, 1, 1), created(100, 1, 1)]),
    ];

    let results = engine.replay_many(&positions).await;

    assert_eq!(results.len(), 3);
    let first = results[0].as_ref().unwrap();
    assert_eq!(first.last().unwrap().swapped_if_dca, d("0.45"));
    assert!(!results[1].as_ref().unwrap().has_swap_history());
    assert!(matches!(results[2], Err(EngineError::OutOfOrderEvents { .. })));
}

#[tokio::test]
async fn test_cancelled_token_issues_no_lookups() {
    let mock = Arc::new(prices());
    let engine = ProfitEngine::new(mock.clone());
    let token = CancellationToken::new();
    token.cancel();

    let result = engine
        .replay_cancellable(&context(), &[created(100, 100, 2)], &token)
        .await;

    assert!(matches!(result, Err(EngineError::Cancelled)));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_cancel_interrupts_pending_lookup() {
    let mock = Arc::new(prices().with_latency(Duration::from_secs(60)));
    let engine = ProfitEngine::new(mock.clone());
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let result = engine
        .replay_cancellable(&context(), &[created(100, 100, 2)], &token)
        .await;

    assert!(matches!(result, Err(EngineError::Cancelled)));
    assert_eq!(mock.call_count(), 1);
}

#[test]
fn test_sample_kinds_follow_event_kinds() {
    let mut processor = EventProcessor::new(context()).unwrap();
    processor.apply(&created(100, 100, 2), Some(u(50))).unwrap();
    processor.apply(&swapped(200, 100, 45), None).unwrap();

    let kinds: Vec<_> = processor.finish().iter().map(|s| s.kind).collect();
    assert_eq!(kinds, vec![SampleKind::Origin, SampleKind::Swap]);
}
