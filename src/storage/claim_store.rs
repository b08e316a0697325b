//! SQLite-backed store for claims, edition requests, proofs, and the
//! advisory device cache
//!
//! Each service (coordinator and device orchestrator) opens its own
//! database file; the two never share a connection. Idempotency leans on
//! the schema's unique constraints rather than application-level locking.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::storage::models::{
    ClaimRecord, DeviceRecord, EditionRequest, EditionUpdate, NewClaim, PendingEdition,
    ProofRecord,
};
use crate::types::{ClaimStatus, EditionStatus, VerificationStatus};

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Claim already exists: {0}")]
    ClaimExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("State conflict: {0}")]
    StateConflict(String),
}

fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

fn parse_claim_status(s: &str) -> Result<ClaimStatus, StoreError> {
    ClaimStatus::parse(s)
        .ok_or_else(|| StoreError::InvalidData(format!("Invalid claim status: {}", s)))
}

// SQLite integers are signed 64-bit; a token id past i64::MAX cannot be
// stored faithfully and is rejected rather than wrapped.
fn token_to_db(token_id: Option<u64>) -> Result<Option<i64>, StoreError> {
    token_id
        .map(|t| {
            i64::try_from(t)
                .map_err(|_| StoreError::InvalidData(format!("token id {} out of range", t)))
        })
        .transpose()
}

/// Durable store for the claim lifecycle
pub struct ClaimStore {
    conn: Connection,
}

impl ClaimStore {
    /// Open (or create) the claims database inside `data_dir`
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db_path = data_dir.as_ref().join("shutter_claims.db");

        log::info!("Opening claims database: {}", db_path.display());

        let conn = Connection::open(&db_path)?;
        Self::init_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Initialize database schema
    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS claims (
                claim_id TEXT PRIMARY KEY,
                cid TEXT NOT NULL,
                metadata_cid TEXT,
                device_id TEXT,
                camera_id TEXT,
                image_hash TEXT,
                signature TEXT,
                device_address TEXT,
                status TEXT NOT NULL CHECK(status IN ('pending', 'open', 'claimed', 'completed')),
                recipient_address TEXT,
                token_id INTEGER,
                tx_hash TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS edition_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                claim_id TEXT NOT NULL REFERENCES claims(claim_id),
                wallet_address TEXT NOT NULL,
                status TEXT NOT NULL CHECK(status IN ('pending', 'processing', 'completed', 'failed')),
                tx_hash TEXT,
                token_id INTEGER,
                error_message TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS proofs (
                claim_id TEXT PRIMARY KEY,
                token_id INTEGER,
                zk_proof TEXT,
                journal_data TEXT,
                proof_tx_hash TEXT,
                verification_status TEXT NOT NULL
                    CHECK(verification_status IN ('pending', 'verified', 'failed')),
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS devices (
                device_address TEXT PRIMARY KEY,
                device_id TEXT,
                camera_id TEXT,
                registered INTEGER NOT NULL DEFAULT 0,
                active INTEGER NOT NULL DEFAULT 0,
                registration_tx TEXT,
                activation_tx TEXT,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        // Indexes for the hot queries (status polling, pending-edition join)
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_claims_status ON claims(status)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_edition_requests_status ON edition_requests(status)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_edition_requests_claim ON edition_requests(claim_id)",
            [],
        )?;

        log::debug!("✓ Database schema initialized");

        Ok(())
    }

    // ========================================================================
    // Claims
    // ========================================================================

    /// Insert a new claim with status `pending`
    ///
    /// Fails with `ClaimExists` (no mutation) if the id is already present,
    /// so a client retrying after a timeout can tell "already created" from
    /// "created now".
    pub fn create_claim(&mut self, new: NewClaim) -> Result<ClaimRecord, StoreError> {
        let now = now_ts();

        let result = self.conn.execute(
            "INSERT INTO claims (claim_id, cid, metadata_cid, device_id, camera_id,
             image_hash, signature, device_address, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                &new.claim_id,
                &new.cid,
                &new.metadata_cid,
                &new.device_id,
                &new.camera_id,
                &new.image_hash,
                &new.signature,
                &new.device_address,
                ClaimStatus::Pending.as_str(),
                now,
                now,
            ],
        );

        match result {
            Ok(_) => {
                log::debug!("✓ Created claim {}", new.claim_id);
                self.get_claim(&new.claim_id)
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::ClaimExists(new.claim_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read a claim by id
    pub fn get_claim(&self, claim_id: &str) -> Result<ClaimRecord, StoreError> {
        self.conn
            .query_row(
                "SELECT claim_id, cid, metadata_cid, device_id, camera_id, image_hash,
                 signature, device_address, status, recipient_address, token_id, tx_hash,
                 created_at, updated_at
                 FROM claims WHERE claim_id = ?1",
                params![claim_id],
                Self::map_claim_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("claim {}", claim_id)))
    }

    /// Overwrite a claim's status (trusted device-backend path)
    ///
    /// No optimistic-lock check; a regression against the lifecycle order is
    /// applied but logged. token_id and tx_hash are only written when given.
    pub fn update_claim_status(
        &mut self,
        claim_id: &str,
        status: ClaimStatus,
        token_id: Option<u64>,
        tx_hash: Option<&str>,
    ) -> Result<ClaimRecord, StoreError> {
        let current = self.get_claim(claim_id)?;
        if status.rank() < current.status.rank() {
            log::warn!(
                "Claim {} status regressing {} -> {} (trusted overwrite)",
                claim_id,
                current.status,
                status
            );
        }

        self.conn.execute(
            "UPDATE claims SET status = ?1,
                 token_id = COALESCE(?2, token_id),
                 tx_hash = COALESCE(?3, tx_hash),
                 updated_at = ?4
             WHERE claim_id = ?5",
            params![
                status.as_str(),
                token_to_db(token_id)?,
                tx_hash,
                now_ts(),
                claim_id,
            ],
        )?;

        log::debug!("✓ Claim {} -> {}", claim_id, status);
        self.get_claim(claim_id)
    }

    // ========================================================================
    // Edition requests
    // ========================================================================

    /// Record a user's wallet submission against an open claim
    ///
    /// Validates the claim state transactionally: the claim must be `open`
    /// with a minted original. On success inserts a pending EditionRequest,
    /// records the recipient address, and advances the claim to `claimed`.
    pub fn submit_edition(
        &mut self,
        claim_id: &str,
        wallet_address: &str,
    ) -> Result<EditionRequest, StoreError> {
        let now = now_ts();
        let tx = self.conn.transaction()?;

        let claim = tx
            .query_row(
                "SELECT status, token_id FROM claims WHERE claim_id = ?1",
                params![claim_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<i64>>(1)?,
                    ))
                },
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("claim {}", claim_id)))?;

        let status = parse_claim_status(&claim.0)?;
        if status != ClaimStatus::Open || claim.1.is_none() {
            return Err(StoreError::StateConflict(format!(
                "claim {} is not open for editions (status={}, token_id={:?})",
                claim_id, status, claim.1
            )));
        }

        tx.execute(
            "INSERT INTO edition_requests (claim_id, wallet_address, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                claim_id,
                wallet_address,
                EditionStatus::Pending.as_str(),
                now,
                now,
            ],
        )?;
        let request_id = tx.last_insert_rowid();

        tx.execute(
            "UPDATE claims SET recipient_address = ?1, status = ?2, updated_at = ?3
             WHERE claim_id = ?4",
            params![
                wallet_address,
                ClaimStatus::Claimed.as_str(),
                now,
                claim_id,
            ],
        )?;

        tx.commit()?;

        log::info!(
            "✓ Edition request {} queued for claim {} -> {}",
            request_id,
            claim_id,
            wallet_address
        );

        self.get_edition_request(request_id)
    }

    /// Read an edition request by id
    pub fn get_edition_request(&self, id: i64) -> Result<EditionRequest, StoreError> {
        self.conn
            .query_row(
                "SELECT id, claim_id, wallet_address, status, tx_hash, token_id,
                 error_message, created_at, updated_at
                 FROM edition_requests WHERE id = ?1",
                params![id],
                Self::map_edition_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("edition request {}", id)))
    }

    /// Pending edition requests joined to their open parent claims
    ///
    /// The join excludes requests whose claim regressed or lost its token:
    /// those stay queued but are never handed to the processor.
    pub fn pending_editions(&self, limit: u32) -> Result<Vec<PendingEdition>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.claim_id, r.wallet_address, c.token_id
             FROM edition_requests r
             JOIN claims c ON c.claim_id = r.claim_id
             WHERE r.status = 'pending'
               AND c.status IN ('open', 'claimed')
               AND c.token_id IS NOT NULL
             ORDER BY r.created_at ASC, r.id ASC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit], |row| {
            Ok(PendingEdition {
                request_id: row.get(0)?,
                claim_id: row.get(1)?,
                wallet_address: row.get(2)?,
                original_token_id: row.get::<_, i64>(3)? as u64,
            })
        })?;

        let result: Result<Vec<_>, _> = rows.collect();
        Ok(result?)
    }

    /// Partial update of an edition request
    ///
    /// Terminal rows still accept writes; callers are expected to treat
    /// updates to them as no-ops. A request moving to `completed` advances
    /// its parent claim from claimed to completed.
    pub fn update_edition_request(
        &mut self,
        id: i64,
        update: EditionUpdate,
    ) -> Result<EditionRequest, StoreError> {
        let existing = self.get_edition_request(id)?;
        if existing.status.is_terminal() {
            log::debug!(
                "Edition request {} already {}, update is a no-op for callers",
                id,
                existing.status
            );
        }

        let token_id = token_to_db(update.token_id)?;
        let now = now_ts();
        let tx = self.conn.transaction()?;

        tx.execute(
            "UPDATE edition_requests SET
                 status = COALESCE(?1, status),
                 tx_hash = COALESCE(?2, tx_hash),
                 token_id = COALESCE(?3, token_id),
                 error_message = COALESCE(?4, error_message),
                 updated_at = ?5
             WHERE id = ?6",
            params![
                update.status.map(|s| s.as_str()),
                update.tx_hash,
                token_id,
                update.error_message,
                now,
                id,
            ],
        )?;

        if update.status == Some(EditionStatus::Completed) {
            // Close the loop on the claim lifecycle
            let changed = tx.execute(
                "UPDATE claims SET status = 'completed', updated_at = ?1
                 WHERE claim_id = ?2 AND status = 'claimed'",
                params![now, &existing.claim_id],
            )?;
            if changed > 0 {
                log::info!("✓ Claim {} completed", existing.claim_id);
            }
        }

        tx.commit()?;

        self.get_edition_request(id)
    }

    // ========================================================================
    // Proofs
    // ========================================================================

    /// Store the generated proof payload for a claim (upsert)
    pub fn save_proof_payload(
        &mut self,
        claim_id: &str,
        token_id: Option<u64>,
        zk_proof: &str,
        journal_data: &str,
    ) -> Result<ProofRecord, StoreError> {
        let now = now_ts();
        self.conn.execute(
            "INSERT INTO proofs (claim_id, token_id, zk_proof, journal_data,
                 verification_status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?5)
             ON CONFLICT(claim_id) DO UPDATE SET
                 token_id = COALESCE(excluded.token_id, token_id),
                 zk_proof = excluded.zk_proof,
                 journal_data = excluded.journal_data,
                 updated_at = excluded.updated_at",
            params![claim_id, token_to_db(token_id)?, zk_proof, journal_data, now],
        )?;

        log::debug!("✓ Proof payload stored for claim {}", claim_id);
        self.get_proof(claim_id)
    }

    /// Upsert a claim's proof verification status
    ///
    /// Exactly one row per claim_id: repeated calls update in place. A
    /// `None` status leaves the existing status alone (new rows start
    /// pending).
    pub fn upsert_proof_status(
        &mut self,
        claim_id: &str,
        token_id: Option<u64>,
        status: Option<VerificationStatus>,
        proof_tx_hash: Option<&str>,
    ) -> Result<ProofRecord, StoreError> {
        let now = now_ts();
        self.conn.execute(
            "INSERT INTO proofs (claim_id, token_id, proof_tx_hash,
                 verification_status, created_at, updated_at)
             VALUES (?1, ?2, ?3, COALESCE(?4, 'pending'), ?5, ?5)
             ON CONFLICT(claim_id) DO UPDATE SET
                 token_id = COALESCE(excluded.token_id, token_id),
                 proof_tx_hash = COALESCE(excluded.proof_tx_hash, proof_tx_hash),
                 verification_status = COALESCE(?4, verification_status),
                 updated_at = excluded.updated_at",
            params![
                claim_id,
                token_to_db(token_id)?,
                proof_tx_hash,
                status.map(|s| s.as_str()),
                now,
            ],
        )?;

        log::debug!(
            "✓ Proof status for claim {} -> {}",
            claim_id,
            status.map(|s| s.as_str()).unwrap_or("(unchanged)")
        );
        self.get_proof(claim_id)
    }

    /// Read a claim's proof record
    pub fn get_proof(&self, claim_id: &str) -> Result<ProofRecord, StoreError> {
        self.conn
            .query_row(
                "SELECT claim_id, token_id, zk_proof, journal_data, proof_tx_hash,
                 verification_status, created_at, updated_at
                 FROM proofs WHERE claim_id = ?1",
                params![claim_id],
                Self::map_proof_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("proof for claim {}", claim_id)))
    }

    /// Number of proof rows for a claim (for invariant checks)
    pub fn count_proof_rows(&self, claim_id: &str) -> Result<i64, StoreError> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM proofs WHERE claim_id = ?1",
            params![claim_id],
            |row| row.get(0),
        )?)
    }

    // ========================================================================
    // Device cache
    // ========================================================================

    /// Write-through the advisory device cache
    pub fn upsert_device(&mut self, device: &DeviceRecord) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO devices (device_address, device_id, camera_id, registered,
                 active, registration_tx, activation_tx, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(device_address) DO UPDATE SET
                 device_id = COALESCE(excluded.device_id, device_id),
                 camera_id = COALESCE(excluded.camera_id, camera_id),
                 registered = excluded.registered,
                 active = excluded.active,
                 registration_tx = COALESCE(excluded.registration_tx, registration_tx),
                 activation_tx = COALESCE(excluded.activation_tx, activation_tx),
                 updated_at = excluded.updated_at",
            params![
                &device.device_address,
                &device.device_id,
                &device.camera_id,
                device.registered,
                device.active,
                &device.registration_tx,
                &device.activation_tx,
                now_ts(),
            ],
        )?;
        Ok(())
    }

    /// Read the cached registration state (advisory only)
    pub fn get_device(&self, device_address: &str) -> Result<Option<DeviceRecord>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT device_address, device_id, camera_id, registered, active,
                 registration_tx, activation_tx, updated_at
                 FROM devices WHERE device_address = ?1",
                params![device_address],
                |row| {
                    Ok(DeviceRecord {
                        device_address: row.get(0)?,
                        device_id: row.get(1)?,
                        camera_id: row.get(2)?,
                        registered: row.get(3)?,
                        active: row.get(4)?,
                        registration_tx: row.get(5)?,
                        activation_tx: row.get(6)?,
                        updated_at: row.get(7)?,
                    })
                },
            )
            .optional()?)
    }

    // ========================================================================
    // Row mapping
    // ========================================================================

    fn map_claim_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ClaimRecord> {
        Ok(ClaimRecord {
            claim_id: row.get(0)?,
            cid: row.get(1)?,
            metadata_cid: row.get(2)?,
            device_id: row.get(3)?,
            camera_id: row.get(4)?,
            image_hash: row.get(5)?,
            signature: row.get(6)?,
            device_address: row.get(7)?,
            status: ClaimStatus::parse(&row.get::<_, String>(8)?).ok_or_else(|| {
                rusqlite::Error::InvalidColumnType(8, "status".into(), rusqlite::types::Type::Text)
            })?,
            recipient_address: row.get(9)?,
            token_id: row.get::<_, Option<i64>>(10)?.map(|t| t as u64),
            tx_hash: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }

    fn map_edition_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EditionRequest> {
        Ok(EditionRequest {
            id: Some(row.get(0)?),
            claim_id: row.get(1)?,
            wallet_address: row.get(2)?,
            status: EditionStatus::parse(&row.get::<_, String>(3)?).ok_or_else(|| {
                rusqlite::Error::InvalidColumnType(3, "status".into(), rusqlite::types::Type::Text)
            })?,
            tx_hash: row.get(4)?,
            token_id: row.get::<_, Option<i64>>(5)?.map(|t| t as u64),
            error_message: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn map_proof_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProofRecord> {
        Ok(ProofRecord {
            claim_id: row.get(0)?,
            token_id: row.get::<_, Option<i64>>(1)?.map(|t| t as u64),
            zk_proof: row.get(2)?,
            journal_data: row.get(3)?,
            proof_tx_hash: row.get(4)?,
            verification_status: VerificationStatus::parse(&row.get::<_, String>(5)?)
                .ok_or_else(|| {
                    rusqlite::Error::InvalidColumnType(
                        5,
                        "verification_status".into(),
                        rusqlite::types::Type::Text,
                    )
                })?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}
