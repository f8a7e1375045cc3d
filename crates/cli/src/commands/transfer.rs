//! `rolecast transfer`: run the money-transfer demo through the engine.

use rolecast_config::AppConfig;
use rolecast_core::{Bindings, PlayerRef};
use tracing::debug;

use crate::bank::{self, Amount, CheckingAccount};

/// Command-line overrides for the demo parameters.
#[derive(Debug, Default)]
pub struct TransferArgs {
    pub times: Option<u32>,
    pub amount: Option<String>,
    pub source: Option<String>,
    pub target: Option<String>,
}

pub fn run(config: &AppConfig, args: TransferArgs) -> Result<(), Box<dyn std::error::Error>> {
    let demo = &config.demo;
    let currency = demo.currency.as_str();

    let source = match &args.source {
        Some(balance) => CheckingAccount::open(1, balance)?,
        None => CheckingAccount::new(1, demo.source_balance, currency),
    };
    let target = match &args.target {
        Some(balance) => CheckingAccount::open(2, balance)?,
        None => CheckingAccount::new(2, demo.target_balance, currency),
    };
    let amount = match &args.amount {
        Some(amount) => Amount::parse(amount)?,
        None => Amount::new(demo.amount, currency),
    };
    let times = args.times.unwrap_or(demo.repetitions);

    let label = amount.to_string();
    let source = PlayerRef::new(source);
    let target = PlayerRef::new(target);
    let amount = PlayerRef::new(amount);

    let transfer = bank::money_transfer(config.runtime.reentrancy)?;
    debug!(reentrancy = %transfer.reentrancy(), times, "Running money transfer demo");

    for round in 1..=times {
        let context = transfer.instantiate(
            Bindings::new()
                .bind("source_account", &source)
                .bind("target_account", &target)
                .bind("amount", &amount),
        )?;

        println!("\nMoney Transfer #{round} of {label} between Account(#1) and Account(#2)");
        println!("\tBalances Before: {}", bank::describe_balances(&[&source, &target])?);

        match context.run(&[]) {
            Ok(after) => {
                println!("\tBalances After:  {}", after.as_str().unwrap_or_default());
            }
            Err(e) => {
                println!("\t❌ Transfer failed: {e}");
                return Err(e.into());
            }
        }
    }

    Ok(())
}
