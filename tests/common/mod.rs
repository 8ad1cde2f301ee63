// ==============================================
// RENTAL FLEET FIXTURE (shared by integration tests)
// ==============================================
//
// A rental agency manufactures cars on demand and keeps returned cars idle in
// its fleet for the next customer. Tires are the cache weight: every car has
// four, and the fleet may only hold so many.
//
// - "Smoking" cars are never shared, and never handed out again once driven.
// - "Lemon" cars fail their quality check: the car is scrapped, then the
//   construction fails.
// - "Escape Pod" cars borrow a "Mini" from the same fleet while being built.
// - Cars driven past MAX_MILEAGE are stale.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use parking_lot::Mutex;
use pincache::prelude::*;
use thiserror::Error;

pub const MAX_TIRES: u64 = 1000;
pub const MAX_MILEAGE: u32 = 10_000;
pub const TIRES_PER_CAR: u64 = 4;

pub type Fleet = ObjectCache<String, RentalCar>;

/// Counts every car built and scrapped, across all agencies sharing it.
#[derive(Debug, Default)]
pub struct Ledger {
    created: AtomicUsize,
    destroyed: AtomicUsize,
    scrapped: Mutex<Vec<String>>,
}

impl Ledger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Descriptions of scrapped cars, in scrapping order.
    pub fn scrapped(&self) -> Vec<String> {
        self.scrapped.lock().clone()
    }
}

#[derive(Debug)]
pub struct RentalCar {
    description: String,
    mileage: AtomicU32,
    driving: AtomicBool,
    ledger: Arc<Ledger>,
}

impl RentalCar {
    pub fn new(description: &str, ledger: &Arc<Ledger>) -> Self {
        ledger.created.fetch_add(1, Ordering::SeqCst);
        Self {
            description: description.to_string(),
            mileage: AtomicU32::new(0),
            driving: AtomicBool::new(false),
            ledger: Arc::clone(ledger),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn mileage(&self) -> u32 {
        self.mileage.load(Ordering::SeqCst)
    }

    /// Drives alone: panics if someone else is behind the wheel.
    pub fn drive_alone(&self, miles: u32) {
        assert!(
            !self.driving.swap(true, Ordering::SeqCst),
            "two drivers in {}",
            self.description
        );
        self.mileage.fetch_add(miles, Ordering::SeqCst);
        std::thread::yield_now();
        self.driving.store(false, Ordering::SeqCst);
    }

    /// Drives with other passengers allowed.
    pub fn drive(&self, miles: u32) {
        self.mileage.fetch_add(miles, Ordering::SeqCst);
    }

    pub fn is_smoking(&self) -> bool {
        self.description.contains("Smoking")
    }

    pub fn is_old(&self) -> bool {
        self.mileage() > MAX_MILEAGE
    }

    pub fn is_too_old(&self) -> bool {
        self.mileage() > 2 * MAX_MILEAGE
    }

    fn has_escape_pod(&self) -> bool {
        self.description.contains("Escape Pod")
    }

    fn assure_quality(self) -> Result<Self, RentalError> {
        if self.description.contains("Lemon") {
            // Scrapped on the spot.
            drop(self);
            return Err(RentalError::Lemon);
        }
        Ok(self)
    }
}

impl Drop for RentalCar {
    fn drop(&mut self) {
        self.ledger.destroyed.fetch_add(1, Ordering::SeqCst);
        self.ledger.scrapped.lock().push(self.description.clone());
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RentalError {
    #[error("hoopty")]
    Lemon,
    #[error("vehicle recall database unreachable")]
    RecallCheck,
}

/// Builds cars for a fleet. Holds the fleet itself so that escape pods can
/// borrow a Mini while being manufactured.
pub struct RentalAgency<'f> {
    pub fleet: &'f Fleet,
    pub ledger: Arc<Ledger>,
    pub exclusive: bool,
}

impl<'f> RentalAgency<'f> {
    pub fn new(fleet: &'f Fleet, exclusive: bool) -> Self {
        Self {
            fleet,
            ledger: Ledger::new(),
            exclusive,
        }
    }

    pub fn rent(
        &self,
        description: &str,
    ) -> Result<Lease<'f, String, RentalCar>, PinError<RentalError>> {
        self.fleet.pin(description.to_string(), self, self.exclusive)
    }

    pub fn tires_in_fleet(&self) -> u64 {
        self.fleet.bytes_cached()
    }

    /// Scraps every idle car and checks the fleet books balance.
    pub fn shut_down(&self) {
        self.fleet.discard_all();
        assert_eq!(self.tires_in_fleet(), 0);
        assert_eq!(self.ledger.created(), self.ledger.destroyed());
        self.fleet.check_invariants().unwrap();
    }
}

impl CachedObjectFactory<String, RentalCar> for RentalAgency<'_> {
    type Error = RentalError;

    fn initialize_entry(
        &self,
        description: &String,
        entry: UninitializedEntry<RentalCar>,
    ) -> Result<InitializedEntry<RentalCar>, RentalError> {
        let car = RentalCar::new(description, &self.ledger);
        if car.has_escape_pod() {
            let mini = self.rent("Mini").map_err(PinError::into_inner)?;
            mini.drive(10);
        }
        let car = car.assure_quality()?;
        let sharable = !car.is_smoking();
        Ok(entry.initialize(car, TIRES_PER_CAR, sharable))
    }

    fn is_stale(&self, car: &RentalCar) -> Result<bool, RentalError> {
        if car.description.contains("Recalled") {
            return Err(RentalError::RecallCheck);
        }
        Ok(car.is_old() || (car.is_smoking() && car.mileage() > 0))
    }
}
