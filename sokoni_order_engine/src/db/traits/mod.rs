mod dispute_management;
mod marketplace_database;
mod order_management;
mod shipment_management;

mod data_objects;

pub use data_objects::{InsertOrderResult, NewShipment, ShipmentStatusUpdate, TrackingHistory};
pub use dispute_management::{DisputeError, DisputeManagement};
pub use marketplace_database::{MarketplaceDatabase, MarketplaceError};
pub use order_management::OrderManagement;
pub use shipment_management::{ShipmentError, ShipmentManagement};
