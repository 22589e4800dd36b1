//! Rate quoting for the Parcify carrier.
//!
//! - Only destinations inside the Antwerp service area get an offer.
//! - Free-shipping requests and subtotals above the configured threshold are
//!   quoted at zero, everything else at the configured flat price.

use serde::Serialize;

use crate::util::settings::CarrierConfig;

pub const CARRIER_CODE: &str = "parcify_carrier";
/// Token looked for in an order's shipping method.
pub const CARRIER_TOKEN: &str = "parcify";

/// Both tiers report this method id and title.
pub const METHOD_CODE: &str = "free_shipping";
pub const METHOD_TITLE: &str = "Personal delivery";

/// Antwerp postal codes served by personal delivery.
pub const SERVICE_AREA_POSTCODES: [&str; 9] = [
    "2000", "2020", "2050", "2060", "2018", "2600", "2610", "2140", "2100",
];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShippingRequest {
    pub dest_postcode: Option<String>,
    pub free_shipping: bool,
    pub base_subtotal_incl_tax: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RateOffer {
    pub carrier: String,
    pub carrier_title: String,
    pub method: String,
    pub method_title: String,
    pub price: f64,
    pub cost: f64,
}

/// Offers returned to checkout for one request.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RateResult {
    rates: Vec<RateOffer>,
}

impl RateResult {
    pub fn append(&mut self, offer: RateOffer) {
        self.rates.push(offer);
    }

    pub fn rates(&self) -> &[RateOffer] {
        &self.rates
    }
}

pub fn is_in_service_area(postcode: &str) -> bool {
    SERVICE_AREA_POSTCODES.contains(&postcode)
}

#[derive(Clone, Debug)]
pub struct Carrier {
    config: CarrierConfig,
}

impl Carrier {
    pub fn new(config: CarrierConfig) -> Self {
        Self { config }
    }

    pub fn carrier_code(&self) -> &'static str {
        CARRIER_CODE
    }

    pub fn allowed_methods(&self) -> [(&'static str, &'static str); 2] {
        [("standard", "Standard"), ("free_shipping", "Free Shipping")]
    }

    /// Returns `None` when the carrier does not apply to this request.
    pub fn collect_rates(&self, request: &ShippingRequest) -> Option<RateResult> {
        if !self.config.active {
            return None;
        }

        let postcode = request.dest_postcode.as_deref()?;
        if !is_in_service_area(postcode) {
            tracing::debug!(postcode, "Destination outside Parcify service area");
            return None;
        }

        let mut result = RateResult::default();
        if request.free_shipping
            || request.base_subtotal_incl_tax >= self.config.free_shipping_subtotal
        {
            result.append(self.free_rate());
        } else {
            result.append(self.standard_rate());
        }
        Some(result)
    }

    fn free_rate(&self) -> RateOffer {
        self.offer(0.0)
    }

    fn standard_rate(&self) -> RateOffer {
        self.offer(self.config.price)
    }

    fn offer(&self, price: f64) -> RateOffer {
        RateOffer {
            carrier: CARRIER_CODE.to_string(),
            carrier_title: self.config.title.clone(),
            method: METHOD_CODE.to_string(),
            method_title: METHOD_TITLE.to_string(),
            price,
            cost: 0.0,
        }
    }
}
