use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use sokoni_order_engine::{
    DeliveryApiError, DisputeApiError, DisputeError, EscrowApiError, MarketplaceError, OrderFlowError, ShipmentError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Webhook signature invalid or not provided")]
    InvalidWebhookSignature,
    #[error("{0}")]
    OrderFlow(#[from] OrderFlowError),
    #[error("{0}")]
    Escrow(#[from] EscrowApiError),
    #[error("{0}")]
    Delivery(#[from] DeliveryApiError),
    #[error("{0}")]
    Dispute(#[from] DisputeApiError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) | Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InitializeError(_) |
            Self::BackendError(_) |
            Self::IOError(_) |
            Self::ConfigurationError(_) |
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::InvalidWebhookSignature => StatusCode::UNAUTHORIZED,
            Self::OrderFlow(e) => match e {
                OrderFlowError::InvalidQuantity(_) |
                OrderFlowError::ProductUnavailable(_) |
                OrderFlowError::SelfPurchaseDenied => StatusCode::BAD_REQUEST,
                OrderFlowError::Backend(m) => marketplace_status(m),
            },
            Self::Escrow(e) => match e {
                EscrowApiError::NotBuyer => StatusCode::FORBIDDEN,
                EscrowApiError::Backend(m) => marketplace_status(m),
            },
            Self::Delivery(e) => match e {
                DeliveryApiError::NoCoverageAvailable { .. } => StatusCode::NOT_FOUND,
                DeliveryApiError::Backend(s) => shipment_status(s),
                DeliveryApiError::OrderBackend(m) => marketplace_status(m),
            },
            Self::Dispute(e) => match e {
                DisputeApiError::NotBuyer => StatusCode::FORBIDDEN,
                DisputeApiError::Backend(d) => dispute_status(d),
                DisputeApiError::OrderBackend(m) => marketplace_status(m),
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

/// Validation errors map to 400/403, state conflicts to 409, missing records
/// to 404, backend faults to 500.
fn marketplace_status(e: &MarketplaceError) -> StatusCode {
    match e {
        MarketplaceError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        MarketplaceError::OrderNotFound(_) |
        MarketplaceError::ListingNotFound(_) |
        MarketplaceError::EscrowNotFound(_) => StatusCode::NOT_FOUND,
        MarketplaceError::OrderAlreadyExists(_) |
        MarketplaceError::EscrowAlreadyExists(_) |
        MarketplaceError::EscrowNotHeld(_) |
        MarketplaceError::OrderNotDelivered(_) |
        MarketplaceError::DisputeOpen(_) |
        MarketplaceError::CannotCancel { .. } |
        MarketplaceError::OrderNotPayable(_) => StatusCode::CONFLICT,
    }
}

fn shipment_status(e: &ShipmentError) -> StatusCode {
    match e {
        ShipmentError::DatabaseError(_) | ShipmentError::TrackingNumberExhausted => StatusCode::INTERNAL_SERVER_ERROR,
        ShipmentError::ShipmentNotFound(_) |
        ShipmentError::TrackingNumberNotFound(_) |
        ShipmentError::PartnerNotFound(_) => StatusCode::NOT_FOUND,
        ShipmentError::InvalidStatusTransition { .. } |
        ShipmentError::OrderNotReadyForDispatch(_) |
        ShipmentError::ShipmentAlreadyExists(_) => StatusCode::CONFLICT,
        ShipmentError::OrderError(m) => marketplace_status(m),
    }
}

fn dispute_status(e: &DisputeError) -> StatusCode {
    match e {
        DisputeError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        DisputeError::DisputeNotFound(_) => StatusCode::NOT_FOUND,
        DisputeError::DisputeAlreadyResolved(_) | DisputeError::DisputeAlreadyOpen(_) => StatusCode::CONFLICT,
        DisputeError::OutcomeRequired => StatusCode::BAD_REQUEST,
        DisputeError::OrderError(m) => marketplace_status(m),
    }
}
