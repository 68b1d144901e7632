//! End-to-end demo: run a small simulated day on a ledger, persist the
//! transaction log to sled, then rebuild an identical ledger from disk.
//!
//!     cargo run --example replay

use ledger_kernel::{
    Amount, Event, EventHandler, HandlerOutcome, Ledger, LedgerConfig, LedgerView,
    LifecycleEngine, LogStore, Move, PendingTransactionBuilder, Prices, TimeStamp, Unit,
    UnitState, SYSTEM_WALLET,
};
use ledger_kernel::{store, utils};

struct CouponHandler;

impl EventHandler for CouponHandler {
    fn handle(
        &self,
        event: &Event,
        view: &dyn LedgerView,
        _prices: &Prices,
    ) -> anyhow::Result<HandlerOutcome> {
        // pay every current holder a flat coupon
        let mut builder = PendingTransactionBuilder::new("coupon_handler")
            .proposed_at(view.current_time());
        for (wallet, _) in view.get_positions(event.symbol()) {
            let mv = Move::new("25".parse()?, "USD", SYSTEM_WALLET, &wallet)?;
            builder = builder.add_move(mv);
        }
        Ok(HandlerOutcome::transact(builder.finalise()?))
    }
}

fn main() -> anyhow::Result<()> {
    let open = TimeStamp::new_with(2024, 3, 1, 9, 0, 0);
    let mut ledger = Ledger::new(LedgerConfig::new("demo", open))?;

    let alice = utils::new_wallet_address("wallet")?;
    let bob = utils::new_wallet_address("wallet")?;
    ledger.register_wallet(&alice)?;
    ledger.register_wallet(&bob)?;

    let cash = Unit::new(
        "USD",
        "US Dollar",
        "CASH",
        "-1000000000000".parse()?,
        "1000000000000".parse()?,
    )?
    .with_decimal_places(2);
    let bond = Unit::new("BOND-1", "Demo Bond", "BOND", Amount::zero(), "1000".parse()?)?;

    // register both units and issue opening positions in one atomic
    // transaction, so the whole genesis lives in the log and replays
    let issue = PendingTransactionBuilder::new("demo")
        .create_unit(cash)
        .create_unit(bond)
        .add_move(Move::new("1000".parse()?, "USD", SYSTEM_WALLET, &alice)?)
        .add_move(Move::new("10".parse()?, "BOND-1", SYSTEM_WALLET, &alice)?)
        .proposed_at(open)
        .finalise()?;
    ledger.execute(&issue);

    let transfer = PendingTransactionBuilder::new("demo")
        .add_move(Move::new("250".parse()?, "USD", &alice, &bob)?)
        .proposed_at(TimeStamp::new_with(2024, 3, 1, 10, 0, 0))
        .finalise()?;
    ledger.execute(&transfer);

    // one lifecycle step with a scheduled coupon
    let coupon_time = TimeStamp::new_with(2024, 3, 1, 16, 0, 0);
    let mut engine = LifecycleEngine::new();
    engine.register_handler("coupon", Box::new(CouponHandler));
    engine
        .scheduler()
        .schedule(Event::new("coupon", "BOND-1", coupon_time, 0, UnitState::new())?);
    let executed = engine.step(&mut ledger, coupon_time, &Prices::new())?;
    println!("lifecycle step executed {} transaction(s)", executed.len());

    println!(
        "alice: {} USD, bob: {} USD, supply check: {}",
        ledger.get_balance(&alice, "USD"),
        ledger.get_balance(&bob, "USD"),
        ledger.total_supply("USD"),
    );

    // persist the full log, then rebuild from disk
    let dir = std::env::temp_dir().join("ledger-kernel-demo");
    let db_store = LogStore::open(&dir)?;
    db_store.clear()?;
    db_store.append_all(ledger.log_iter())?;

    let loaded = db_store.load_log()?;
    println!("store verified {} log entries", loaded.len());

    let mut rebuilt = Ledger::new(LedgerConfig::new("demo", open))?;
    store::replay(&mut rebuilt, &loaded)?;

    assert_eq!(rebuilt.balances(), ledger.balances());
    assert_eq!(rebuilt.units(), ledger.units());
    println!("replayed ledger matches the live one");

    Ok(())
}
