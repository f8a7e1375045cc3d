//! Money-transfer demo domain: plain accounts and amounts, plus the context
//! that lets two accounts transfer money between them.

use rolecast_core::{ContextType, ReentrancyMode, RoleMethods, RoleScope, Value};
use std::fmt;
use tracing::info;

/// A checking account. Knows nothing about transfers.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckingAccount {
    pub account_id: u32,
    pub balance: i64,
    pub currency: String,
}

impl CheckingAccount {
    pub fn new(account_id: u32, balance: i64, currency: impl Into<String>) -> Self {
        Self {
            account_id,
            balance,
            currency: currency.into(),
        }
    }

    /// Parse an opening balance such as `"1000 €"`.
    pub fn open(account_id: u32, initial_balance: &str) -> Result<Self, BankError> {
        let (balance, currency) = parse_money(initial_balance)?;
        Ok(Self::new(account_id, balance, currency))
    }
}

/// A quantity of money in a currency.
#[derive(Debug, Clone, PartialEq)]
pub struct Amount {
    pub quantity: i64,
    pub currency: String,
}

impl Amount {
    pub fn new(quantity: i64, currency: impl Into<String>) -> Self {
        Self {
            quantity,
            currency: currency.into(),
        }
    }

    /// Parse an amount such as `"200 €"`.
    pub fn parse(data: &str) -> Result<Self, BankError> {
        let (quantity, currency) = parse_money(data)?;
        Ok(Self::new(quantity, currency))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.quantity, self.currency)
    }
}

fn parse_money(data: &str) -> Result<(i64, String), BankError> {
    let mut parts = data.split_whitespace();
    let (Some(quantity), Some(currency), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(BankError::InvalidMoney(data.to_string()));
    };
    let quantity = quantity
        .parse()
        .map_err(|_| BankError::InvalidMoney(data.to_string()))?;
    Ok((quantity, currency.to_string()))
}

/// Domain errors raised by the transfer roles.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BankError {
    #[error("Invalid money value: '{0}'")]
    InvalidMoney(String),

    #[error("Account #{account_id} has {balance} and cannot send {requested}")]
    InsufficientFunds {
        account_id: u32,
        balance: i64,
        requested: String,
    },

    #[error("Account #{account_id} holds {account} but the amount is in {amount}")]
    CurrencyMismatch {
        account_id: u32,
        account: String,
        amount: String,
    },
}

/// The amount bound to the `amount` role.
fn transfer_amount(scope: &RoleScope) -> anyhow::Result<Amount> {
    let amount = scope.mate_player("amount")?;
    Ok(amount.with(|a: &Amount| a.clone())?)
}

fn mate_account_id(scope: &RoleScope, key: &str) -> anyhow::Result<u32> {
    Ok(scope
        .mate_player(key)?
        .with(|a: &CheckingAccount| a.account_id)?)
}

fn check_currency(account: &CheckingAccount, amount: &Amount) -> Result<(), BankError> {
    if account.currency != amount.currency {
        return Err(BankError::CurrencyMismatch {
            account_id: account.account_id,
            account: account.currency.clone(),
            amount: amount.currency.clone(),
        });
    }
    Ok(())
}

fn withdraw(scope: &RoleScope, _args: &[Value]) -> anyhow::Result<Value> {
    let amount = transfer_amount(scope)?;
    let target_id = mate_account_id(scope, "target_account")?;

    let account_id = scope.me().with_mut(|account: &mut CheckingAccount| -> Result<u32, BankError> {
        check_currency(account, &amount)?;
        if account.balance < amount.quantity {
            return Err(BankError::InsufficientFunds {
                account_id: account.account_id,
                balance: account.balance,
                requested: amount.to_string(),
            });
        }
        account.balance -= amount.quantity;
        Ok(account.account_id)
    })??;

    info!("Account(#{account_id}) sent {amount} to Account(#{target_id})");
    Ok(Value::Unit)
}

fn deposit(scope: &RoleScope, _args: &[Value]) -> anyhow::Result<Value> {
    let amount = transfer_amount(scope)?;
    let source_id = mate_account_id(scope, "source_account")?;

    let account_id = scope.me().with_mut(|account: &mut CheckingAccount| -> Result<u32, BankError> {
        check_currency(account, &amount)?;
        account.balance += amount.quantity;
        Ok(account.account_id)
    })??;

    info!("Account(#{account_id}) received {amount} from Account(#{source_id})");
    Ok(Value::Unit)
}

/// Balances of both accounts as `"800€ - 200€"`.
pub fn describe_balances(
    accounts: &[&rolecast_core::PlayerRef],
) -> Result<String, rolecast_core::DciError> {
    let parts = accounts
        .iter()
        .map(|player| player.with(|a: &CheckingAccount| format!("{}{}", a.balance, a.currency)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join(" - "))
}

/// The money-transfer context: `source_account` pays `amount` to
/// `target_account`.
pub fn money_transfer(reentrancy: ReentrancyMode) -> rolecast_core::Result<ContextType> {
    Ok(ContextType::builder("MoneyTransfer")
        .role(
            "source_account",
            RoleMethods::new().public("run_transfer", withdraw),
        )?
        .role(
            "target_account",
            RoleMethods::new().public("run_transfer", deposit),
        )?
        .role("amount", RoleMethods::new())?
        .interaction("run", |scene, _| {
            let source = scene.player("source_account")?;
            let target = scene.player("target_account")?;

            source.send("run_transfer", &[])?;
            target.send("run_transfer", &[])?;

            let balances = describe_balances(&[&source, &target])?;
            Ok(Value::from(balances))
        })?
        .interaction("balances", |scene, _| {
            let source = scene.player("source_account")?;
            let target = scene.player("target_account")?;
            Ok(Value::from(describe_balances(&[&source, &target])?))
        })?
        .reentrancy(reentrancy)
        .build())
}
