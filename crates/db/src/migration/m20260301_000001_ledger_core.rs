//! Ledger schema.
//!
//! Creates the enum types, the four ledger tables, their integrity
//! constraints, and the triggers that make entries and reconciliation
//! records append-only.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: TABLES
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(OPERATIONS_SQL).await?;
        db.execute_unprepared(ENTRIES_SQL).await?;
        db.execute_unprepared(RECONCILIATION_RECORDS_SQL).await?;

        // ============================================================
        // PART 3: IMMUTABILITY
        // ============================================================
        db.execute_unprepared(IMMUTABILITY_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE account_kind AS ENUM ('user', 'system', 'transit');

CREATE TYPE operation_kind AS ENUM ('deposit', 'withdrawal', 'transfer');

CREATE TYPE operation_status AS ENUM ('processing', 'processed', 'ignored', 'failed');

CREATE TYPE entry_direction AS ENUM ('debit', 'credit');

CREATE TYPE entry_type AS ENUM (
    'deposit',
    'withdrawal',
    'transfer_out',
    'transfer_in',
    'deposit_settlement',
    'withdrawal_settlement'
);

CREATE TYPE reconciliation_status AS ENUM ('match', 'mismatch');
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    kind account_kind NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const OPERATIONS_SQL: &str = r"
CREATE TABLE operations (
    id UUID PRIMARY KEY,
    idempotency_key VARCHAR(255) NOT NULL,
    kind operation_kind NOT NULL,
    status operation_status NOT NULL DEFAULT 'processing',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    processed_at TIMESTAMPTZ,
    failure_reason TEXT,
    CONSTRAINT uq_operations_idempotency_key UNIQUE (idempotency_key),
    CONSTRAINT chk_idempotency_key_format CHECK (idempotency_key ~ '^[A-Za-z0-9_-]+$'),
    CONSTRAINT chk_processed_at CHECK (
        (status = 'processing' AND processed_at IS NULL)
        OR (status <> 'processing' AND processed_at IS NOT NULL)
    )
);
";

const ENTRIES_SQL: &str = r"
CREATE TABLE entries (
    id UUID PRIMARY KEY,
    operation_id UUID NOT NULL REFERENCES operations(id) ON DELETE RESTRICT,
    account_id UUID NOT NULL REFERENCES accounts(id) ON DELETE RESTRICT,
    amount NUMERIC(19, 4) NOT NULL,
    currency CHAR(3) NOT NULL,
    direction entry_direction NOT NULL,
    entry_type entry_type NOT NULL,
    source TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_entry_amount_non_zero CHECK (amount <> 0),
    CONSTRAINT chk_entry_sign_matches_direction CHECK (
        (direction = 'credit' AND amount > 0) OR (direction = 'debit' AND amount < 0)
    )
);

CREATE INDEX idx_entries_account_created ON entries(account_id, created_at, id);
CREATE INDEX idx_entries_operation ON entries(operation_id);
";

const RECONCILIATION_RECORDS_SQL: &str = r"
CREATE TABLE reconciliation_records (
    id UUID PRIMARY KEY,
    account_id UUID NOT NULL REFERENCES accounts(id) ON DELETE RESTRICT,
    reconciliation_date TIMESTAMPTZ NOT NULL,
    expected_balance NUMERIC(19, 4) NOT NULL,
    calculated_balance NUMERIC(19, 4) NOT NULL,
    difference NUMERIC(19, 4) NOT NULL,
    currency CHAR(3) NOT NULL,
    status reconciliation_status NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_reconciliation_difference CHECK (
        difference = expected_balance - calculated_balance
    ),
    CONSTRAINT chk_reconciliation_status CHECK ((status = 'match') = (difference = 0))
);

CREATE INDEX idx_reconciliation_account_created
    ON reconciliation_records(account_id, created_at DESC);
";

const IMMUTABILITY_SQL: &str = r"
CREATE OR REPLACE FUNCTION reject_ledger_mutation()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION '% rows are append-only', TG_TABLE_NAME;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_entries_immutable
    BEFORE UPDATE OR DELETE ON entries
    FOR EACH ROW EXECUTE FUNCTION reject_ledger_mutation();

CREATE TRIGGER trg_reconciliation_records_immutable
    BEFORE UPDATE OR DELETE ON reconciliation_records
    FOR EACH ROW EXECUTE FUNCTION reject_ledger_mutation();
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS reconciliation_records;
DROP TABLE IF EXISTS entries;
DROP TABLE IF EXISTS operations;
DROP TABLE IF EXISTS accounts;

DROP FUNCTION IF EXISTS reject_ledger_mutation();

DROP TYPE IF EXISTS reconciliation_status;
DROP TYPE IF EXISTS entry_type;
DROP TYPE IF EXISTS entry_direction;
DROP TYPE IF EXISTS operation_status;
DROP TYPE IF EXISTS operation_kind;
DROP TYPE IF EXISTS account_kind;
";
