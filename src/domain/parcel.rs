use serde::{Deserialize, Serialize};

use super::address::{format_delivery_address, format_pickup_address, CountryNames};
use super::entities::{Address, Order, StoreOrigin};
use crate::util::settings::CarrierConfig;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Sender {
    pub id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pickup {
    pub sender: Sender,
    pub address: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receiver {
    pub email: String,
    pub mobile_number: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub receiver: Receiver,
    pub address: String,
}

/// Registration payload posted to the Parcify API.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Parcel {
    pub package: Package,
    pub pickup: Pickup,
    pub delivery: Delivery,
}

impl Parcel {
    /// Flattened `(field, value)` pairs in declaration order.
    pub fn fields(&self) -> Vec<(String, String)> {
        let optional = |value: &Option<String>| value.clone().unwrap_or_default();
        vec![
            ("package.name".into(), self.package.name.clone()),
            ("package.imageId".into(), optional(&self.package.image_id)),
            ("package.instructions".into(), optional(&self.package.instructions)),
            ("pickup.sender.id".into(), self.pickup.sender.id.clone()),
            ("pickup.address".into(), self.pickup.address.clone()),
            ("delivery.receiver.email".into(), self.delivery.receiver.email.clone()),
            (
                "delivery.receiver.mobileNumber".into(),
                self.delivery.receiver.mobile_number.clone(),
            ),
            ("delivery.address".into(), self.delivery.address.clone()),
        ]
    }
}

pub fn build_parcel(
    order: &Order,
    shipping_address: &Address,
    config: &CarrierConfig,
    origin: &StoreOrigin,
    countries: &dyn CountryNames,
) -> Parcel {
    let pickup_address = if config.pickup_address.trim().is_empty() {
        format_pickup_address(origin, countries)
    } else {
        config.pickup_address.clone()
    };

    Parcel {
        package: Package {
            name: format!("{}{}", config.parcel_name, order.increment_id),
            image_id: None,
            instructions: None,
        },
        pickup: Pickup {
            sender: Sender {
                id: config.user_id.clone(),
            },
            address: pickup_address,
        },
        delivery: Delivery {
            receiver: Receiver {
                email: shipping_address.email.clone().unwrap_or_default(),
                mobile_number: shipping_address.telephone.clone().unwrap_or_default(),
            },
            address: format_delivery_address(shipping_address, countries),
        },
    }
}
