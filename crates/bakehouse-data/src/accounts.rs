//! Double-entry ledger

use crate::{AccountBalance, DateRange, LedgerEntry, insert_returning_id, require_text};
use bakehouse_core::{BakehouseError, ProcedureName, Result};
use bakehouse_gateway::{ProcedureGateway, procedure_params};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;

const INSERT_LEDGER_ENTRY: ProcedureName = ProcedureName::new("dbo.InsertLedgerEntry");
const GET_LEDGER_ENTRIES: ProcedureName = ProcedureName::new("dbo.GetLedgerEntries");
const GET_ACCOUNT_BALANCE: ProcedureName = ProcedureName::new("dbo.GetAccountBalance");

#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub entry_date: NaiveDate,
    pub account: String,
    pub description: String,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
}

procedure_params!(NewLedgerEntry {
    entry_date => "EntryDate",
    account => "Account",
    description => "Description",
    debit => "Debit",
    credit => "Credit",
});

impl NewLedgerEntry {
    pub fn debit(
        entry_date: NaiveDate,
        account: impl Into<String>,
        description: impl Into<String>,
        amount: BigDecimal,
    ) -> Self {
        Self {
            entry_date,
            account: account.into(),
            description: description.into(),
            debit: amount,
            credit: BigDecimal::from(0),
        }
    }

    pub fn credit(
        entry_date: NaiveDate,
        account: impl Into<String>,
        description: impl Into<String>,
        amount: BigDecimal,
    ) -> Self {
        Self {
            entry_date,
            account: account.into(),
            description: description.into(),
            debit: BigDecimal::from(0),
            credit: amount,
        }
    }
}

struct AccountKey<'a> {
    account: &'a str,
}

procedure_params!(AccountKey<'_> { account => "Account" });

#[derive(Debug, Clone)]
pub struct AccountData {
    gateway: ProcedureGateway,
}

impl AccountData {
    pub fn new(gateway: ProcedureGateway) -> Self {
        Self { gateway }
    }

    pub async fn insert(&self, entry: &NewLedgerEntry) -> Result<i64> {
        require_text("account", &entry.account)?;
        let zero = BigDecimal::from(0);
        if entry.debit < zero || entry.credit < zero {
            return Err(BakehouseError::InvalidInput(
                "debit and credit must not be negative".into(),
            ));
        }
        insert_returning_id(&self.gateway, INSERT_LEDGER_ENTRY, entry).await
    }

    /// Entries dated within `range`, both ends included
    pub async fn entries(&self, range: DateRange) -> Result<Vec<LedgerEntry>> {
        self.gateway.load_many(GET_LEDGER_ENTRIES, &range).await
    }

    /// Debits minus credits; an account without entries balances at zero
    pub async fn balance(&self, account: &str) -> Result<AccountBalance> {
        let mut balance: AccountBalance = self
            .gateway
            .load_first_or_default(GET_ACCOUNT_BALANCE, &AccountKey { account })
            .await?;
        if balance.account.is_empty() {
            balance.account = account.to_string();
        }
        Ok(balance)
    }
}
