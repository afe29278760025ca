use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sok_common::Cents;
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(pub String);

//--------------------------------------       OrderId        ---------------------------------------------------------
/// The public, human-shareable identifier for an order. Internal row ids never
/// leave the engine; this is what buyers, sellers and the payment collaborator
/// use to refer to an order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------      Location        ---------------------------------------------------------
/// A physical address with the coordinates used for routing and distance
/// calculations. City names are compared case-insensitively when deciding
/// whether a route is local or intercity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub street: String,
    pub city: String,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub fn new<S1: Into<String>, S2: Into<String>>(street: S1, city: S2, lat: f64, lng: f64) -> Self {
        Self { street: street.into(), city: city.into(), lat, lng }
    }

    pub fn same_city_as(&self, other: &Location) -> bool {
        self.city.trim().eq_ignore_ascii_case(other.city.trim())
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.street, self.city)
    }
}

//--------------------------------------   OrderStatusType    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// Newly created. No payment has been captured yet.
    Pending,
    /// Payment captured and held in escrow. Waiting for the seller to dispatch.
    Confirmed,
    /// A shipment has been assigned and is on its way.
    Shipped,
    /// The courier has delivered the goods. Escrow release is still buyer-gated.
    Delivered,
    /// Cancelled before dispatch. Terminal.
    Cancelled,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Delivered | OrderStatusType::Cancelled)
    }

    /// Cancellation is only permitted before the goods start moving.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, OrderStatusType::Pending | OrderStatusType::Confirmed)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Confirmed => write!(f, "Confirmed"),
            OrderStatusType::Shipped => write!(f, "Shipped"),
            OrderStatusType::Delivered => write!(f, "Delivered"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Confirmed" => Ok(Self::Confirmed),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------    PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Refunded,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Unpaid => write!(f, "Unpaid"),
            PaymentStatus::Paid => write!(f, "Paid"),
            PaymentStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Unpaid" => Ok(Self::Unpaid),
            "Paid" => Ok(Self::Paid),
            "Refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------    PaymentMethod     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentMethod {
    Card,
    MobileMoney,
    BankTransfer,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Card => write!(f, "Card"),
            PaymentMethod::MobileMoney => write!(f, "MobileMoney"),
            PaymentMethod::BankTransfer => write!(f, "BankTransfer"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Card" => Ok(Self::Card),
            "MobileMoney" => Ok(Self::MobileMoney),
            "BankTransfer" => Ok(Self::BankTransfer),
            s => Err(ConversionError(format!("Invalid payment method: {s}"))),
        }
    }
}

//--------------------------------------        Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub buyer_id: String,
    pub seller_id: String,
    pub listing_id: i64,
    pub quantity: i64,
    pub unit_price: Cents,
    pub shipping_cost: Cents,
    pub total_amount: Cents,
    pub status: OrderStatusType,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub ship_to_street: String,
    pub ship_to_city: String,
    pub ship_to_lat: f64,
    pub ship_to_lng: f64,
    pub tracking_number: Option<String>,
    pub escrow_released: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn shipping_address(&self) -> Location {
        Location::new(
            self.ship_to_street.clone(),
            self.ship_to_city.clone(),
            self.ship_to_lat,
            self.ship_to_lng,
        )
    }
}

//--------------------------------------      NewOrder        ---------------------------------------------------------
/// A fully validated order, ready for insertion. Only the order flow API
/// constructs these; the pricing fields are authoritative by the time this
/// struct exists.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub buyer_id: String,
    pub seller_id: String,
    pub listing_id: i64,
    pub quantity: i64,
    pub unit_price: Cents,
    pub shipping_cost: Cents,
    pub payment_method: PaymentMethod,
    pub ship_to: Location,
}

impl NewOrder {
    /// The order total. `total_amount == unit_price * quantity + shipping_cost`
    /// holds at creation time and is never recomputed afterwards.
    pub fn total_amount(&self) -> Cents {
        self.unit_price * self.quantity + self.shipping_cost
    }
}

//--------------------------------------    EscrowStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum EscrowStatus {
    /// Funds captured from the buyer, withheld from the seller.
    Held,
    /// Funds released to the seller. Terminal.
    Released,
    /// Funds returned to the buyer. Terminal.
    Refunded,
}

impl Display for EscrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EscrowStatus::Held => write!(f, "Held"),
            EscrowStatus::Released => write!(f, "Released"),
            EscrowStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

impl FromStr for EscrowStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Held" => Ok(Self::Held),
            "Released" => Ok(Self::Released),
            "Refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid escrow status: {s}"))),
        }
    }
}

//--------------------------------------  EscrowTransaction   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct EscrowTransaction {
    pub id: i64,
    pub order_id: OrderId,
    pub amount: Cents,
    pub status: EscrowStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    ShipmentType      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ShipmentType {
    /// Same-city delivery, handled by motorbike couriers.
    Local,
    /// Cross-city delivery, handled by carriers with registered routes.
    Intercity,
}

impl Display for ShipmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShipmentType::Local => write!(f, "Local"),
            ShipmentType::Intercity => write!(f, "Intercity"),
        }
    }
}

impl FromStr for ShipmentType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Local" => Ok(Self::Local),
            "Intercity" => Ok(Self::Intercity),
            s => Err(ConversionError(format!("Invalid shipment type: {s}"))),
        }
    }
}

//--------------------------------------   ShipmentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ShipmentStatus {
    Assigned,
    PickedUp,
    InTransit,
    Delivered,
    Failed,
}

impl ShipmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ShipmentStatus::Delivered | ShipmentStatus::Failed)
    }

    /// Position in the forward-only progression. `Failed` has no rank; it is
    /// reachable from any non-terminal state instead.
    fn rank(&self) -> Option<u8> {
        match self {
            ShipmentStatus::Assigned => Some(0),
            ShipmentStatus::PickedUp => Some(1),
            ShipmentStatus::InTransit => Some(2),
            ShipmentStatus::Delivered => Some(3),
            ShipmentStatus::Failed => None,
        }
    }

    /// Whether a shipment in this state may move to `next`. The progression is
    /// strictly forward, one step at a time; `Failed` is a valid exit from any
    /// non-terminal state.
    pub fn can_advance_to(&self, next: ShipmentStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next.rank() {
            None => true, // -> Failed
            Some(next_rank) => self.rank().map(|r| next_rank == r + 1).unwrap_or(false),
        }
    }
}

impl Display for ShipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShipmentStatus::Assigned => write!(f, "Assigned"),
            ShipmentStatus::PickedUp => write!(f, "PickedUp"),
            ShipmentStatus::InTransit => write!(f, "InTransit"),
            ShipmentStatus::Delivered => write!(f, "Delivered"),
            ShipmentStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for ShipmentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Assigned" => Ok(Self::Assigned),
            "PickedUp" => Ok(Self::PickedUp),
            "InTransit" => Ok(Self::InTransit),
            "Delivered" => Ok(Self::Delivered),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid shipment status: {s}"))),
        }
    }
}

//--------------------------------------      Shipment        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Shipment {
    pub id: i64,
    pub order_id: OrderId,
    pub partner_id: i64,
    pub shipment_type: ShipmentType,
    pub pickup_street: String,
    pub pickup_city: String,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub delivery_street: String,
    pub delivery_city: String,
    pub delivery_lat: f64,
    pub delivery_lng: f64,
    pub tracking_number: String,
    pub status: ShipmentStatus,
    pub distance_km: f64,
    pub cost: Cents,
    pub scheduled_pickup_at: DateTime<Utc>,
    pub eta_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shipment {
    pub fn pickup(&self) -> Location {
        Location::new(self.pickup_street.clone(), self.pickup_city.clone(), self.pickup_lat, self.pickup_lng)
    }

    pub fn delivery(&self) -> Location {
        Location::new(
            self.delivery_street.clone(),
            self.delivery_city.clone(),
            self.delivery_lat,
            self.delivery_lng,
        )
    }
}

//--------------------------------------    TrackingEvent     ---------------------------------------------------------
/// One immutable entry in a shipment's history. Rows are append-only; the
/// engine never updates or deletes them.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TrackingEvent {
    pub id: i64,
    pub shipment_id: i64,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub location: String,
    pub status: ShipmentStatus,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

//--------------------------------------    DisputeStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum DisputeStatus {
    Open,
    InProgress,
    Resolved,
}

impl DisputeStatus {
    /// While a dispute is open or under review, escrow release is blocked.
    pub fn blocks_release(&self) -> bool {
        matches!(self, DisputeStatus::Open | DisputeStatus::InProgress)
    }
}

impl Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisputeStatus::Open => write!(f, "Open"),
            DisputeStatus::InProgress => write!(f, "InProgress"),
            DisputeStatus::Resolved => write!(f, "Resolved"),
        }
    }
}

impl FromStr for DisputeStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Open" => Ok(Self::Open),
            "InProgress" => Ok(Self::InProgress),
            "Resolved" => Ok(Self::Resolved),
            s => Err(ConversionError(format!("Invalid dispute status: {s}"))),
        }
    }
}

//--------------------------------------   DisputeOutcome     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum DisputeOutcome {
    /// No outcome yet. The only valid outcome for an unresolved dispute.
    None,
    /// Escrow refunded to the buyer.
    Refund,
    /// Escrow released to the seller (admin override of the buyer gate).
    Release,
}

impl Display for DisputeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisputeOutcome::None => write!(f, "None"),
            DisputeOutcome::Refund => write!(f, "Refund"),
            DisputeOutcome::Release => write!(f, "Release"),
        }
    }
}

impl FromStr for DisputeOutcome {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "None" => Ok(Self::None),
            "Refund" => Ok(Self::Refund),
            "Release" => Ok(Self::Release),
            s => Err(ConversionError(format!("Invalid dispute outcome: {s}"))),
        }
    }
}

//--------------------------------------       Dispute        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Dispute {
    pub id: i64,
    pub order_id: OrderId,
    pub raised_by: String,
    pub reason: String,
    pub status: DisputeStatus,
    pub outcome: DisputeOutcome,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

//--------------------------------------     PartnerType      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PartnerType {
    /// Local motorbike courier. Serves individual cities.
    Biker,
    /// Intercity bus or freight carrier. Serves registered city pairs.
    Carrier,
}

impl Display for PartnerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartnerType::Biker => write!(f, "Biker"),
            PartnerType::Carrier => write!(f, "Carrier"),
        }
    }
}

impl FromStr for PartnerType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Biker" => Ok(Self::Biker),
            "Carrier" => Ok(Self::Carrier),
            s => Err(ConversionError(format!("Invalid partner type: {s}"))),
        }
    }
}

//--------------------------------------   DeliveryPartner    ---------------------------------------------------------
/// A courier. Onboarding and vetting happen outside this engine; from the
/// engine's perspective the record is read-only except for the delivery
/// counter and earnings accrual on completed shipments.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DeliveryPartner {
    pub id: i64,
    pub name: String,
    pub partner_type: PartnerType,
    pub base_rate: Cents,
    pub per_km_rate: Cents,
    pub rating: f64,
    pub total_deliveries: i64,
    pub earnings: Cents,
    pub verified: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    ListingType       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ListingType {
    FixedPrice,
    Auction,
}

impl Display for ListingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListingType::FixedPrice => write!(f, "FixedPrice"),
            ListingType::Auction => write!(f, "Auction"),
        }
    }
}

impl FromStr for ListingType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FixedPrice" => Ok(Self::FixedPrice),
            "Auction" => Ok(Self::Auction),
            s => Err(ConversionError(format!("Invalid listing type: {s}"))),
        }
    }
}

//--------------------------------------       Listing        ---------------------------------------------------------
/// A product listing. Catalog management lives in the storefront; the engine
/// reads listings for order validation and pricing only.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Listing {
    pub id: i64,
    pub seller_id: String,
    pub title: String,
    pub price: Cents,
    pub listing_type: ListingType,
    pub active: bool,
    pub pickup_street: String,
    pub pickup_city: String,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    pub fn pickup(&self) -> Location {
        Location::new(self.pickup_street.clone(), self.pickup_city.clone(), self.pickup_lat, self.pickup_lng)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn shipment_status_forward_only() {
        use ShipmentStatus::*;
        assert!(Assigned.can_advance_to(PickedUp));
        assert!(PickedUp.can_advance_to(InTransit));
        assert!(InTransit.can_advance_to(Delivered));
        // No skipping, no regression
        assert!(!Assigned.can_advance_to(InTransit));
        assert!(!InTransit.can_advance_to(PickedUp));
        assert!(!Delivered.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(PickedUp));
        // Failed is reachable from any non-terminal state
        assert!(Assigned.can_advance_to(Failed));
        assert!(InTransit.can_advance_to(Failed));
    }

    #[test]
    fn order_status_rules() {
        assert!(OrderStatusType::Pending.is_cancellable());
        assert!(OrderStatusType::Confirmed.is_cancellable());
        assert!(!OrderStatusType::Shipped.is_cancellable());
        assert!(OrderStatusType::Delivered.is_terminal());
    }

    #[test]
    fn status_round_trips() {
        for s in ["Pending", "Confirmed", "Shipped", "Delivered", "Cancelled"] {
            assert_eq!(s.parse::<OrderStatusType>().unwrap().to_string(), s);
        }
        for s in ["Assigned", "PickedUp", "InTransit", "Delivered", "Failed"] {
            assert_eq!(s.parse::<ShipmentStatus>().unwrap().to_string(), s);
        }
        assert!("Teleported".parse::<ShipmentStatus>().is_err());
    }

    #[test]
    fn new_order_total() {
        let order = NewOrder {
            order_id: OrderId::from("SO-TEST01".to_string()),
            buyer_id: "buyer-1".into(),
            seller_id: "seller-1".into(),
            listing_id: 1,
            quantity: 2,
            unit_price: Cents::from_whole(100),
            shipping_cost: Cents::from_whole(50),
            payment_method: PaymentMethod::MobileMoney,
            ship_to: Location::new("12 Biashara St", "Nairobi", -1.2864, 36.8172),
        };
        assert_eq!(order.total_amount(), Cents::from(25_000));
    }
}
