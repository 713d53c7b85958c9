use std::collections::HashMap;

use cod_ledger_engine::{
    db_types::{CourierId, OrderId},
    events::EventProducers,
    test_utils::prepare_env::{create_database, random_db_path, run_migrations},
    traits::CollectionOutcome,
    CashLedgerApi,
    CashLedgerError,
    DeliveryFlowApi,
    ReportingApi,
    SqliteDatabase,
};
use cucumber::World;
use log::*;

#[derive(Default, Debug, World)]
pub struct LedgerWorld {
    pub system: Option<LedgerSystem>,
    pub last_error: Option<CashLedgerError>,
    pub last_outcome: Option<CollectionOutcome>,
}

#[derive(Debug)]
pub struct LedgerSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub delivery: DeliveryFlowApi<SqliteDatabase>,
    pub ledger: CashLedgerApi<SqliteDatabase>,
    pub reporting: ReportingApi<SqliteDatabase>,
    pub couriers: HashMap<String, CourierId>,
    pub orders: HashMap<String, OrderId>,
}

impl LedgerWorld {
    pub fn system(&self) -> &LedgerSystem {
        self.system.as_ref().expect("Ledger system not initialised")
    }

    pub fn system_mut(&mut self) -> &mut LedgerSystem {
        self.system.as_mut().expect("Ledger system not initialised")
    }

    pub fn courier(&self, name: &str) -> CourierId {
        *self.system().couriers.get(name).unwrap_or_else(|| panic!("Unknown courier {name}"))
    }

    pub fn order(&self, number: &str) -> OrderId {
        *self.system().orders.get(number).unwrap_or_else(|| panic!("Unknown order {number}"))
    }

    /// Remembers the outcome of a request that is allowed to fail.
    pub fn record<T>(&mut self, result: Result<T, CashLedgerError>) -> Option<T> {
        match result {
            Ok(v) => {
                self.last_error = None;
                Some(v)
            },
            Err(e) => {
                debug!("🚀️ Request failed: {e}");
                self.last_error = Some(e);
                None
            },
        }
    }
}

impl LedgerSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let delivery = DeliveryFlowApi::new(db.clone(), EventProducers::default());
        let ledger = CashLedgerApi::new(db.clone(), EventProducers::default());
        let reporting = ReportingApi::new(db.clone());
        Self { db_path: url, db, delivery, ledger, reporting, couriers: HashMap::new(), orders: HashMap::new() }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
