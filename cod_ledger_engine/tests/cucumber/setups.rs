use cod_ledger_engine::{db_types::NewCourier, CashLedgerDatabase};
use cucumber::given;

use crate::cucumber::{LedgerSystem, LedgerWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut LedgerWorld) {
    let system = LedgerSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "courier {word}")]
async fn add_courier(world: &mut LedgerWorld, name: String) {
    let system = world.system_mut();
    let courier = system.db.insert_courier(NewCourier::new(name.as_str())).await.expect("Error creating courier");
    system.couriers.insert(name, courier.id);
}
