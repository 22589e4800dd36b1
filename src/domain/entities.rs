use serde::{Deserialize, Serialize};

/// Carrier code reported on tracking records.
pub const TRACK_CARRIER_CODE: &str = "Parcify";
/// Title reported on tracking records.
pub const TRACK_TITLE: &str = "Parcel";

/// Customer shipping address as held by the host order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    /// Street lines, first line first.
    #[serde(default)]
    pub street: Vec<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// ISO 3166-1 alpha-2 country code.
    #[serde(default)]
    pub country_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telephone: Option<String>,
}

impl Address {
    /// All non-blank street lines joined with a single space.
    pub fn street_full(&self) -> String {
        self.street
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Store shipping origin, used as the pickup leg when no override is set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreOrigin {
    #[serde(default)]
    pub street_line1: Option<String>,
    #[serde(default)]
    pub street_line2: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub increment_id: String,
    /// Selected shipping method, e.g. `parcify_carrier_free_shipping`.
    #[serde(default)]
    pub shipping_method: String,
    #[serde(default)]
    pub shipping_address: Option<Address>,
}

impl Order {
    /// Whether the order ships with the carrier identified by `token`.
    pub fn ships_with(&self, token: &str) -> bool {
        self.shipping_method.contains(token)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackingRecord {
    pub number: String,
    pub carrier_code: String,
    pub title: String,
}

impl TrackingRecord {
    pub fn parcel(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            carrier_code: TRACK_CARRIER_CODE.to_string(),
            title: TRACK_TITLE.to_string(),
        }
    }
}

/// The in-flight shipment the host is about to persist.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    /// Host shipment id; unset until the host has assigned one.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    tracks: Vec<TrackingRecord>,
}

impl Shipment {
    pub fn new(order_id: impl Into<String>) -> Self {
        Self {
            id: None,
            order_id: Some(order_id.into()),
            tracks: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn add_track(&mut self, track: TrackingRecord) {
        self.tracks.push(track);
    }

    pub fn tracks(&self) -> &[TrackingRecord] {
        &self.tracks
    }
}
