use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::transactions::dto::{NewTransaction, TransactionType};
use crate::transactions::repo::Transaction;
use crate::users::repo::User;

/// The ledger arithmetic: credits always apply, debits must be covered by the
/// current balance. Returns the balance after the transaction.
pub fn balance_transition(
    balance_before: Decimal,
    transaction_type: TransactionType,
    amount: Decimal,
) -> Result<Decimal, ApiError> {
    match transaction_type {
        TransactionType::Credit => Ok(balance_before + amount),
        TransactionType::Debit => {
            if balance_before < amount {
                Err(ApiError::InsufficientFunds)
            } else {
                Ok(balance_before - amount)
            }
        }
    }
}

/// Creates a transaction and moves the user's balance in one unit of work.
///
/// The `FOR UPDATE` read serializes concurrent creations for the same user,
/// so two racing debits can never both pass the funds check. The insert and
/// the balance update commit together or not at all; `InsufficientFunds`
/// aborts before either write.
pub async fn create_transaction(
    db: &PgPool,
    user_id: Uuid,
    new: NewTransaction,
) -> Result<(Transaction, Decimal), ApiError> {
    let mut tx = db.begin().await?;

    let user = User::lock_for_update(&mut tx, user_id)
        .await?
        .ok_or(ApiError::UserNotFound)?;
    if !user.is_account_active {
        return Err(ApiError::AccountDeactivated);
    }

    let balance_before = user.current_balance;
    let balance_after = balance_transition(balance_before, new.transaction_type, new.amount)?;

    let record = Transaction::insert(&mut tx, user_id, &new, balance_before, balance_after).await?;
    User::set_balance(&mut tx, user_id, balance_after).await?;

    tx.commit().await?;

    info!(
        user_id = %user_id,
        transaction_id = %record.id,
        transaction_type = new.transaction_type.as_str(),
        amount = %new.amount,
        balance = %balance_after,
        "transaction created"
    );
    Ok((record, balance_after))
}
