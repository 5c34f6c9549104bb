use async_trait::async_trait;
use std::collections::HashMap;
use tourline_core::catalog::{AddOnRate, TourRate, VehicleRate};
use tourline_core::repository::CatalogRepository;
use tourline_core::BoxError;
use uuid::Uuid;

/// In-memory catalog, seeded at startup. Serves local runs and tests; the
/// Postgres catalog repository is used everywhere else.
#[derive(Debug, Default, Clone)]
pub struct StaticCatalog {
    vehicles: HashMap<Uuid, VehicleRate>,
    tours: HashMap<Uuid, TourRate>,
    add_ons: HashMap<Uuid, AddOnRate>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vehicle(mut self, rate: VehicleRate) -> Self {
        self.vehicles.insert(rate.vehicle_id, rate);
        self
    }

    pub fn with_tour(mut self, rate: TourRate) -> Self {
        self.tours.insert(rate.tour_id, rate);
        self
    }

    pub fn with_add_on(mut self, rate: AddOnRate) -> Self {
        self.add_ons.insert(rate.add_on_id, rate);
        self
    }
}

#[async_trait]
impl CatalogRepository for StaticCatalog {
    async fn get_vehicle_rate(&self, id: Uuid) -> Result<Option<VehicleRate>, BoxError> {
        Ok(self.vehicles.get(&id).cloned())
    }

    async fn get_tour_rate(&self, id: Uuid) -> Result<Option<TourRate>, BoxError> {
        Ok(self.tours.get(&id).cloned())
    }

    async fn get_add_on(&self, id: Uuid) -> Result<Option<AddOnRate>, BoxError> {
        Ok(self.add_ons.get(&id).cloned())
    }
}
