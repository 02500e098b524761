//! Suspend-and-load orchestration.
//!
//! [`suspend_and_load`] runs a caller's load routine inside one transaction
//! with referential integrity suspended, then resets identity generators:
//!
//! 1. Begin the transaction.
//! 2. Disable integrity. On failure roll back and go to step 6.
//! 3. Run the load routine.
//! 4. Re-enable integrity. After a failed step 3 this only happens for
//!    session-level suspensions; a transactional one is undone by the
//!    rollback, since the transaction may already be aborted.
//! 5. Commit if steps 3 and 4 succeeded, otherwise roll back.
//! 6. Unless disabled, reset identity generators outside the transaction.
//!
//! Error precedence: a failed re-enable beats a failed load routine, and
//! anything from steps 1-5 beats a failed sequence reset. Superseded errors
//! are logged at `warn`.

mod transaction;

pub use transaction::LoadTransaction;

use tracing::{debug, info, warn};

use crate::config::AdapterConfig;
use crate::core::traits::{Connection, Dialect, LoadRoutine};
use crate::error::{FixtureError, IntegrityAction, Result};

/// Run `routine` with referential integrity suspended, then reset sequences.
pub async fn suspend_and_load<D, C, L>(
    dialect: &D,
    tables: &[String],
    config: &AdapterConfig,
    conn: &mut C,
    routine: &mut L,
) -> Result<()>
where
    D: Dialect + ?Sized,
    C: Connection,
    L: LoadRoutine + ?Sized,
{
    let loaded = load_in_transaction(dialect, tables, conn, routine).await;
    if loaded.is_ok() {
        info!("Loaded fixtures into {} tables ({})", tables.len(), dialect.name());
    }

    if config.skip_reset_sequences {
        return loaded;
    }

    let reset = reset_sequences(dialect, tables, config.effective_reset_floor(), conn).await;
    first_error(loaded, reset)
}

/// Steps 1-5.
async fn load_in_transaction<D, C, L>(
    dialect: &D,
    tables: &[String],
    conn: &mut C,
    routine: &mut L,
) -> Result<()>
where
    D: Dialect + ?Sized,
    C: Connection,
    L: LoadRoutine + ?Sized,
{
    let mut tx = LoadTransaction::begin(conn).await?;

    let restore = match dialect.disable_integrity(&mut tx, tables).await {
        Ok(restore) => restore,
        Err(e) => {
            let err = integrity_error(IntegrityAction::Disable, e);
            return rollback_with(tx, err).await;
        }
    };
    debug!("Referential integrity suspended ({})", dialect.name());

    let loaded = match routine.load(&mut tx).await {
        Ok(()) => Ok(()),
        Err(e) if restore.transactional => {
            debug!("Load failed; rollback restores referential integrity ({})", dialect.name());
            return rollback_with(tx, FixtureError::LoadRoutine(e)).await;
        }
        Err(e) => Err(FixtureError::LoadRoutine(e)),
    };

    let restored = dialect
        .enable_integrity(&mut tx, &restore)
        .await
        .map_err(|e| integrity_error(IntegrityAction::Enable, e));
    if restored.is_ok() {
        debug!("Referential integrity restored ({})", dialect.name());
    }

    match restore_wins(loaded, restored) {
        Ok(()) => tx.commit().await,
        Err(e) => rollback_with(tx, e).await,
    }
}

/// Step 6. Stops at the first table that fails.
async fn reset_sequences<D, C>(dialect: &D, tables: &[String], floor: i64, conn: &mut C) -> Result<()>
where
    D: Dialect + ?Sized,
    C: Connection,
{
    for table in tables {
        dialect
            .reset_sequence(&mut *conn, table, floor)
            .await
            .map_err(|e| match e {
                e @ FixtureError::SequenceReset { .. } => e,
                other => FixtureError::sequence_reset(table.as_str(), other),
            })?;
    }
    debug!("Reset identity generators of {} tables to {}", tables.len(), floor);
    Ok(())
}

async fn rollback_with<C: Connection>(tx: LoadTransaction<'_, C>, err: FixtureError) -> Result<()> {
    if let Err(rollback_err) = tx.rollback().await {
        warn!("Rollback failed after '{}': {}", err, rollback_err);
    }
    Err(err)
}

fn integrity_error(action: IntegrityAction, err: FixtureError) -> FixtureError {
    match err {
        e @ FixtureError::IntegrityToggle { .. } => e,
        other => FixtureError::integrity(action, other),
    }
}

/// A failed re-enable supersedes the load routine's result.
fn restore_wins(loaded: Result<()>, restored: Result<()>) -> Result<()> {
    match (loaded, restored) {
        (Err(load_err), Err(restore_err)) => {
            warn!("Load routine error superseded by integrity restore failure: {}", load_err);
            Err(restore_err)
        }
        (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
        (Ok(()), Ok(())) => Ok(()),
    }
}

/// The earlier step's error wins over a cleanup error.
fn first_error(primary: Result<()>, cleanup: Result<()>) -> Result<()> {
    match (primary, cleanup) {
        (Err(e), Err(cleanup_err)) => {
            warn!("Ignoring sequence reset error after earlier failure: {}", cleanup_err);
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(()), cleanup) => cleanup,
    }
}
