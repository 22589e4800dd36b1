//! Carrier domain logic: rates, addresses and parcel payloads.

pub mod address;
pub mod entities;
pub mod parcel;
pub mod rates;

pub use address::{format_delivery_address, format_pickup_address, BuiltinCountryNames, CountryNames};
pub use entities::{Address, Order, Shipment, StoreOrigin, TrackingRecord};
pub use parcel::{build_parcel, Delivery, Package, Parcel, Pickup, Receiver, Sender};
pub use rates::{
    Carrier, RateOffer, RateResult, ShippingRequest, CARRIER_CODE, CARRIER_TOKEN,
};
